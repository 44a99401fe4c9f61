//! Sealed-bid auction house.
//!
//! ## Lifecycle
//!
//! 1. **Start**: seller units move into custody, deadlines are fixed
//! 2. **Bid**: bidders commit `SHA-256(price, nonce, address)` with a deposit
//! 3. **Reveal**: bidders disclose `(price, nonce)`; shortfalls are topped up,
//!    surpluses credited to the claim vault, `price * quantity` stays escrowed
//! 4. **Finalize**: anyone, once; clearing allocates pay-your-bid, units go
//!    to winners, everything else is credited as claims
//!
//! Every operation validates and computes its complete effect before
//! mutating anything, and returns the events it produced.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, Utc};
use editionmart_clearing::{UniformQuote, allocate, allocation_digest_hex, uniform_price_quote};
use editionmart_escrow::{ClaimVault, Custody, Ledger, Lot};
use editionmart_types::{
    Address, Amount, Auction, AuctionId, AuctionState, Bid, BidId, Call, CommitHash, MarketError,
    MarketEvent, Nonce, Result, TokenId, amount, verify_commitment,
};
use rust_decimal::Decimal;

use crate::event_log::transfer_event;
use crate::settings::validate_fee;

/// Seller-chosen parameters of a new auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuctionTerms {
    pub quantity: u64,
    pub reserve_price_per_unit: Amount,
    /// Replaces the registry's auction fee for this auction only.
    pub fee_override: Option<u8>,
    pub bid_window_secs: u64,
    pub reveal_window_secs: u64,
}

/// All auctions, keyed by token. Auction ids are per token, starting at 1.
#[derive(Debug)]
pub struct AuctionHouse {
    auctions: HashMap<TokenId, Vec<Auction>>,
    min_deposit_per_unit: Amount,
    max_bids_per_auction: usize,
}

fn window(secs: u64, name: &str) -> Result<Duration> {
    if secs == 0 {
        return Err(MarketError::InvalidDeadlines {
            reason: format!("{name} window must be non-zero"),
        });
    }
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .ok_or_else(|| MarketError::InvalidDeadlines {
            reason: format!("{name} window of {secs}s is out of range"),
        })
}

fn deadline(from: DateTime<Utc>, span: Duration) -> Result<DateTime<Utc>> {
    from.checked_add_signed(span)
        .ok_or_else(|| MarketError::InvalidDeadlines {
            reason: "deadline out of range".into(),
        })
}

fn index(id: AuctionId) -> Option<usize> {
    usize::try_from(id.0).ok()?.checked_sub(1)
}

impl AuctionHouse {
    #[must_use]
    pub fn new(min_deposit_per_unit: Amount, max_bids_per_auction: usize) -> Self {
        Self {
            auctions: HashMap::new(),
            min_deposit_per_unit,
            max_bids_per_auction,
        }
    }

    /// Look up an auction.
    pub fn auction(&self, token_id: TokenId, auction_id: AuctionId) -> Result<&Auction> {
        self.auctions
            .get(&token_id)
            .and_then(|list| list.get(index(auction_id)?))
            .ok_or(MarketError::AuctionNotFound {
                token_id,
                auction_id,
            })
    }

    fn auction_mut(&mut self, token_id: TokenId, auction_id: AuctionId) -> Result<&mut Auction> {
        self.auctions
            .get_mut(&token_id)
            .and_then(|list| list.get_mut(index(auction_id)?))
            .ok_or(MarketError::AuctionNotFound {
                token_id,
                auction_id,
            })
    }

    /// Ids of every auction ever started on `token_id`, in creation order.
    #[must_use]
    pub fn all_auctions_on_token(&self, token_id: TokenId) -> Vec<AuctionId> {
        self.auctions
            .get(&token_id)
            .map(|list| list.iter().map(|a| a.auction_id).collect())
            .unwrap_or_default()
    }

    /// Currency currently held against bids, across all auctions.
    pub fn escrowed_funds(&self) -> Result<Amount> {
        self.auctions
            .values()
            .flatten()
            .try_fold(Decimal::ZERO, |acc, a| {
                amount::checked_add(acc, a.escrowed_funds()?, "escrowed funds")
            })
    }

    /// Number of auctions not yet finalized.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.auctions
            .values()
            .flatten()
            .filter(|a| a.state != AuctionState::Finalized)
            .count()
    }

    /// Informational uniform price for an auction's revealed bids.
    pub fn uniform_price_quote(
        &self,
        token_id: TokenId,
        auction_id: AuctionId,
    ) -> Result<Option<UniformQuote>> {
        let auction = self.auction(token_id, auction_id)?;
        uniform_price_quote(
            &auction.bids,
            auction.quantity_offered,
            auction.reserve_price_per_unit,
        )
    }

    /// Open an auction and escrow the seller's units.
    ///
    /// # Errors
    /// `InvalidQuantity`, `InvalidAmount`, `InvalidFee`, `InvalidDeadlines`,
    /// `InsufficientBalance`.
    pub fn start_auction(
        &mut self,
        call: &Call,
        token_id: TokenId,
        terms: &AuctionTerms,
        default_fee_percent: u8,
        ledger: &mut Ledger,
        custody: &mut Custody,
    ) -> Result<(AuctionId, Vec<MarketEvent>)> {
        call.ensure_no_value()?;
        if terms.quantity == 0 {
            return Err(MarketError::InvalidQuantity {
                reason: "auction of zero units".into(),
            });
        }
        let reserve = amount::ensure_whole(terms.reserve_price_per_unit)?;
        let fee_percent = match terms.fee_override {
            Some(fee) => {
                validate_fee(fee)?;
                fee
            }
            None => default_fee_percent,
        };
        let bid_deadline = deadline(call.now, window(terms.bid_window_secs, "bid")?)?;
        let reveal_deadline = deadline(bid_deadline, window(terms.reveal_window_secs, "reveal")?)?;

        let list = self.auctions.entry(token_id).or_default();
        let auction_id = AuctionId(list.len() as u64 + 1);

        let mv = custody.lock(
            ledger,
            Lot::Auction(token_id, auction_id),
            call.caller,
            terms.quantity,
        )?;

        list.push(Auction {
            token_id,
            auction_id,
            seller: call.caller,
            quantity_offered: terms.quantity,
            reserve_price_per_unit: reserve,
            owner_fee_percent: fee_percent,
            min_deposit_per_unit: self.min_deposit_per_unit,
            created_at: call.now,
            bid_deadline,
            reveal_deadline,
            state: AuctionState::BiddingOpen,
            bids: Vec::new(),
            quantity_allocated: 0,
            reveals: 0,
        });

        tracing::info!(
            token = %token_id,
            auction = %auction_id,
            seller = %call.caller,
            quantity = terms.quantity,
            reserve = %reserve,
            fee_percent,
            bid_deadline = %bid_deadline,
            reveal_deadline = %reveal_deadline,
            "Auction started"
        );

        Ok((
            auction_id,
            vec![
                transfer_event(custody.address(), &mv),
                MarketEvent::AuctionCreated {
                    token_id,
                    auction_id,
                    seller: call.caller,
                    quantity: terms.quantity,
                    reserve_price_per_unit: reserve,
                    owner_fee_percent: fee_percent,
                    bid_deadline,
                    reveal_deadline,
                },
            ],
        ))
    }

    /// Commit a sealed bid with the call's value as deposit.
    ///
    /// # Errors
    /// `AuctionNotFound`, `AuctionClosed`, `InvalidQuantity`, `TooManyBids`,
    /// `InvalidAmount`, `InsufficientFunds`.
    pub fn bid(
        &mut self,
        call: &Call,
        token_id: TokenId,
        auction_id: AuctionId,
        quantity: u64,
        commit_hash: CommitHash,
    ) -> Result<(BidId, Vec<MarketEvent>)> {
        let limit = self.max_bids_per_auction;
        let auction = self.auction_mut(token_id, auction_id)?;
        auction.ensure_bidding(call.now)?;
        if quantity == 0 || quantity > auction.quantity_offered {
            return Err(MarketError::InvalidQuantity {
                reason: format!(
                    "bid for {quantity} units on an auction of {}",
                    auction.quantity_offered
                ),
            });
        }
        if auction.bids.len() >= limit {
            return Err(MarketError::TooManyBids { limit });
        }
        let deposit = call.funds()?;
        let required = auction.required_deposit(quantity)?;
        if deposit < required {
            return Err(MarketError::InsufficientFunds {
                needed: required,
                supplied: deposit,
            });
        }

        let bid_id = auction.next_bid_id();
        auction.bids.push(Bid {
            id: bid_id,
            bidder: call.caller,
            quantity_requested: quantity,
            commit_hash,
            deposit,
            escrowed: deposit,
            revealed_price_per_unit: None,
            reveal_sequence: None,
            allocated: 0,
        });
        auction.advance(call.now);

        tracing::debug!(
            token = %token_id,
            auction = %auction_id,
            bid = %bid_id,
            bidder = %call.caller,
            quantity,
            deposit = %deposit,
            "Bid committed"
        );

        Ok((
            bid_id,
            vec![MarketEvent::BidPlacedForAuction {
                token_id,
                auction_id,
                bid_id,
                bidder: call.caller,
                quantity,
                deposit,
            }],
        ))
    }

    /// Reveal a committed bid; the call's value tops up the deposit.
    ///
    /// # Errors
    /// `AuctionNotFound`, `DeadlineNotReached`, `AuctionClosed`,
    /// `BidNotFound`, `AlreadyRevealed`, `CommitMismatch`, `InvalidAmount`,
    /// `InsufficientFunds`, `ArithmeticOverflow`.
    #[allow(clippy::too_many_arguments)]
    pub fn reveal(
        &mut self,
        call: &Call,
        token_id: TokenId,
        auction_id: AuctionId,
        bid_id: BidId,
        price_per_unit: Amount,
        nonce: &Nonce,
        claims: &mut ClaimVault,
    ) -> Result<Vec<MarketEvent>> {
        let auction = self.auction_mut(token_id, auction_id)?;
        auction.ensure_revealing(call.now)?;
        let bid = auction.bid(bid_id)?;
        if bid.is_revealed() {
            return Err(MarketError::AlreadyRevealed(bid_id));
        }
        // A price that cannot be encoded cannot match any commitment.
        if !matches!(
            verify_commitment(&bid.commit_hash, price_per_unit, nonce, call.caller),
            Ok(true)
        ) {
            tracing::warn!(
                token = %token_id,
                auction = %auction_id,
                bid = %bid_id,
                caller = %call.caller,
                "Reveal rejected: commitment mismatch"
            );
            return Err(MarketError::CommitMismatch(bid_id));
        }

        let top_up = call.funds()?;
        let available = amount::checked_add(bid.deposit, top_up, "reveal funds")?;
        let cost = amount::checked_total(price_per_unit, bid.quantity_requested)?;
        if available < cost {
            return Err(MarketError::InsufficientFunds {
                needed: cost,
                supplied: available,
            });
        }
        let surplus = amount::checked_sub(available, cost, "reveal surplus")?;
        let bidder = bid.bidder;

        let credited = claims.credit(bidder, surplus)?;

        let sequence = auction.reveals;
        auction.reveals += 1;
        auction.advance(call.now);
        let bid = auction.bid_mut(bid_id)?;
        bid.revealed_price_per_unit = Some(price_per_unit);
        bid.reveal_sequence = Some(sequence);
        bid.escrowed = cost;

        tracing::debug!(
            token = %token_id,
            auction = %auction_id,
            bid = %bid_id,
            bidder = %bidder,
            price = %price_per_unit,
            surplus = %surplus,
            sequence,
            "Bid revealed"
        );

        let mut events = vec![MarketEvent::BidRevealedForAuction {
            token_id,
            auction_id,
            bid_id,
            bidder,
            price_per_unit,
        }];
        if !credited.is_zero() {
            events.push(MarketEvent::ClaimIncreased {
                claimant: bidder,
                increase_amount: credited,
            });
        }
        Ok(events)
    }

    /// Settle an auction once its reveal window has closed.
    ///
    /// # Errors
    /// `AuctionNotFound`, `DeadlineNotReached`, `AlreadyFinalized`,
    /// `ArithmeticOverflow`, `ConservationViolation`.
    #[allow(clippy::too_many_arguments)]
    pub fn finalize(
        &mut self,
        call: &Call,
        token_id: TokenId,
        auction_id: AuctionId,
        operator: Address,
        ledger: &mut Ledger,
        custody: &mut Custody,
        claims: &mut ClaimVault,
    ) -> Result<Vec<MarketEvent>> {
        call.ensure_no_value()?;
        let auction = self.auction(token_id, auction_id)?;
        auction.ensure_finalizable(call.now)?;

        let allocation = allocate(
            &auction.bids,
            auction.quantity_offered,
            auction.reserve_price_per_unit,
        )?;

        // Per-bid (units won, charge), indexed by bid id.
        let mut won = vec![(0u64, Decimal::ZERO); auction.bids.len()];
        for line in &allocation.lines {
            let slot = usize::try_from(line.bid_id.0)
                .ok()
                .and_then(|i| won.get_mut(i))
                .ok_or(MarketError::BidNotFound(line.bid_id))?;
            *slot = (line.allocated, line.charge);
        }

        let mut credits: BTreeMap<Address, Amount> = BTreeMap::new();
        let mut units: BTreeMap<Address, u64> = BTreeMap::new();
        for (bid, (allocated, charge)) in auction.bids.iter().zip(&won) {
            let refund = amount::checked_sub(bid.escrowed, *charge, "bid refund")?;
            let entry = credits.entry(bid.bidder).or_insert(Decimal::ZERO);
            *entry = amount::checked_add(*entry, refund, "bid refund")?;
            if *allocated > 0 {
                *units.entry(bid.bidder).or_insert(0) += allocated;
            }
        }

        let (seller_share, fee) = amount::split_fee(allocation.proceeds, auction.owner_fee_percent)?;
        for (party, value) in [(auction.seller, seller_share), (operator, fee)] {
            let entry = credits.entry(party).or_insert(Decimal::ZERO);
            *entry = amount::checked_add(*entry, value, "auction proceeds")?;
        }

        let unallocated = allocation.unallocated(auction.quantity_offered);
        if unallocated > 0 {
            *units.entry(auction.seller).or_insert(0) += unallocated;
        }

        let digest = allocation_digest_hex(token_id, auction_id, &allocation.lines);
        let credits: Vec<(Address, Amount)> = credits.into_iter().collect();
        let recipients: Vec<(Address, u64)> = units.into_iter().collect();

        let plan = claims.plan(&credits)?;
        let moves = custody.release(ledger, Lot::Auction(token_id, auction_id), &recipients)?;
        let applied = claims.commit(plan);

        let auction = self.auction_mut(token_id, auction_id)?;
        auction.state = AuctionState::Finalized;
        auction.quantity_allocated = allocation.quantity_allocated;
        for (bid, (allocated, _)) in auction.bids.iter_mut().zip(&won) {
            bid.allocated = *allocated;
            bid.escrowed = Decimal::ZERO;
        }

        tracing::info!(
            token = %token_id,
            auction = %auction_id,
            bids = auction.bids.len(),
            allocated = allocation.quantity_allocated,
            unallocated,
            proceeds = %allocation.proceeds,
            fee = %fee,
            digest = %digest,
            "Auction finalized"
        );

        let mut events: Vec<MarketEvent> = moves
            .iter()
            .map(|mv| transfer_event(custody.address(), mv))
            .collect();
        events.extend(
            applied
                .into_iter()
                .map(|(claimant, increase_amount)| MarketEvent::ClaimIncreased {
                    claimant,
                    increase_amount,
                }),
        );
        events.push(MarketEvent::AuctionFinalized {
            token_id,
            auction_id,
            quantity_allocated: allocation.quantity_allocated,
            proceeds: allocation.proceeds,
            allocation_digest: digest,
        });
        Ok(events)
    }
}
