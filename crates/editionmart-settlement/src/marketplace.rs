//! The marketplace facade: one state store behind every external operation.
//!
//! Each operation runs to completion or fails with no state change. On
//! success its events are appended to the log in emission order, and any
//! currency attached to the call is counted as received.

use std::sync::{Arc, Mutex};

use editionmart_clearing::UniformQuote;
use editionmart_escrow::{ClaimVault, Custody, Ledger};
use editionmart_types::{
    Address, Amount, Auction, AuctionId, BidId, Call, CommitHash, LogRecord, MarketConfig,
    MarketError, MarketEvent, Nonce, Offer, OfferId, Result, TokenId,
};

use crate::auction_house::{AuctionHouse, AuctionTerms};
use crate::conservation::{self, Conservation};
use crate::event_log::{EventLog, transfer_event};
use crate::offer_book::OfferBook;
use crate::settings::SettingsRegistry;

/// Complete engine state.
#[derive(Debug)]
pub struct Marketplace {
    settings: SettingsRegistry,
    ledger: Ledger,
    custody: Custody,
    claims: ClaimVault,
    auctions: AuctionHouse,
    offers: OfferBook,
    conservation: Conservation,
    log: EventLog,
}

impl Marketplace {
    /// Build an empty marketplace from a validated configuration.
    ///
    /// # Errors
    /// Whatever [`MarketConfig::validate`] rejects.
    pub fn new(config: MarketConfig) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            operator = %config.operator,
            custody = %config.custody,
            auction_fee_percent = config.auction_fee_percent,
            offer_fee_percent = config.offer_fee_percent,
            min_deposit_per_unit = %config.min_deposit_per_unit,
            max_bids_per_auction = config.max_bids_per_auction,
            "Marketplace initialized"
        );
        Ok(Self {
            settings: SettingsRegistry::from_config(&config),
            ledger: Ledger::new(),
            custody: Custody::new(config.custody),
            claims: ClaimVault::new(),
            auctions: AuctionHouse::new(config.min_deposit_per_unit, config.max_bids_per_auction),
            offers: OfferBook::new(),
            conservation: Conservation::new(),
            log: EventLog::new(),
        })
    }

    fn record(&mut self, events: Vec<MarketEvent>) {
        self.log.append_all(events);
    }

    // ------------------------------------------------------------------
    // Auctions
    // ------------------------------------------------------------------

    /// Open a sealed-bid auction of the caller's units.
    pub fn start_auction(
        &mut self,
        call: &Call,
        token_id: TokenId,
        terms: &AuctionTerms,
    ) -> Result<AuctionId> {
        let (auction_id, events) = self.auctions.start_auction(
            call,
            token_id,
            terms,
            self.settings.owner_fee_percent_for_auction(),
            &mut self.ledger,
            &mut self.custody,
        )?;
        self.record(events);
        Ok(auction_id)
    }

    /// Commit a sealed bid; the call's value is the deposit.
    pub fn bid_on_auction(
        &mut self,
        call: &Call,
        token_id: TokenId,
        auction_id: AuctionId,
        quantity: u64,
        commit_hash: CommitHash,
    ) -> Result<BidId> {
        let received = self.conservation.preview_receive(call.funds()?)?;
        let (bid_id, events) = self
            .auctions
            .bid(call, token_id, auction_id, quantity, commit_hash)?;
        self.conservation.commit_receive(received);
        self.record(events);
        Ok(bid_id)
    }

    /// Reveal a bid; the call's value tops up the deposit.
    pub fn reveal_bid_on_auction(
        &mut self,
        call: &Call,
        token_id: TokenId,
        auction_id: AuctionId,
        bid_id: BidId,
        price_per_unit: Amount,
        nonce: &Nonce,
    ) -> Result<()> {
        let received = self.conservation.preview_receive(call.funds()?)?;
        let events = self.auctions.reveal(
            call,
            token_id,
            auction_id,
            bid_id,
            price_per_unit,
            nonce,
            &mut self.claims,
        )?;
        self.conservation.commit_receive(received);
        self.record(events);
        Ok(())
    }

    /// Settle an auction after its reveal window. Callable by anyone, once.
    pub fn finalize_auction(
        &mut self,
        call: &Call,
        token_id: TokenId,
        auction_id: AuctionId,
    ) -> Result<()> {
        let events = self.auctions.finalize(
            call,
            token_id,
            auction_id,
            self.settings.operator(),
            &mut self.ledger,
            &mut self.custody,
            &mut self.claims,
        )?;
        self.record(events);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Offers
    // ------------------------------------------------------------------

    /// List units at a fixed price. The current offer fee is captured.
    pub fn offer(
        &mut self,
        call: &Call,
        token_id: TokenId,
        quantity: u64,
        price_per_unit: Amount,
    ) -> Result<OfferId> {
        let (offer_id, events) = self.offers.offer(
            call,
            token_id,
            quantity,
            price_per_unit,
            self.settings.owner_fee_percent_for_offer(),
            &mut self.ledger,
            &mut self.custody,
        )?;
        self.record(events);
        Ok(offer_id)
    }

    /// Buy a whole offer; the call's value is the payment.
    pub fn accept_offer(
        &mut self,
        call: &Call,
        token_id: TokenId,
        offer_id: OfferId,
    ) -> Result<()> {
        let received = self.conservation.preview_receive(call.funds()?)?;
        let events = self.offers.accept_offer(
            call,
            token_id,
            offer_id,
            self.settings.operator(),
            &mut self.ledger,
            &mut self.custody,
            &mut self.claims,
        )?;
        self.conservation.commit_receive(received);
        self.record(events);
        Ok(())
    }

    /// Seller cancels an open offer.
    pub fn withdraw_offer(
        &mut self,
        call: &Call,
        token_id: TokenId,
        offer_id: OfferId,
    ) -> Result<()> {
        let events =
            self.offers
                .withdraw_offer(call, token_id, offer_id, &mut self.ledger, &mut self.custody)?;
        self.record(events);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Claims
    // ------------------------------------------------------------------

    /// Pay out the caller's whole claim balance.
    ///
    /// # Errors
    /// `NothingToClaim` when the balance is zero.
    pub fn claim_withdrawal(&mut self, call: &Call) -> Result<Amount> {
        call.ensure_no_value()?;
        let paid = self.claims.withdraw(call.caller)?;
        tracing::info!(claimant = %call.caller, amount = %paid, "Claim withdrawn");
        self.record(vec![MarketEvent::ClaimWithdrawn {
            claimant: call.caller,
            withdrawal_amount: paid,
        }]);
        Ok(paid)
    }

    // ------------------------------------------------------------------
    // Administration
    // ------------------------------------------------------------------

    /// Create `quantity` new units of `token_id` for `to`. Operator only.
    pub fn mint(
        &mut self,
        call: &Call,
        to: Address,
        token_id: TokenId,
        quantity: u64,
    ) -> Result<()> {
        self.settings.ensure_operator(call.caller)?;
        call.ensure_no_value()?;
        let mv = self.ledger.mint(to, token_id, quantity)?;
        tracing::info!(token = %token_id, to = %to, quantity, "Minted");
        self.record(vec![transfer_event(call.caller, &mv)]);
        Ok(())
    }

    pub fn set_auction_fee_percent(&mut self, call: &Call, percent: u8) -> Result<()> {
        call.ensure_no_value()?;
        self.settings.set_auction_fee_percent(call.caller, percent)
    }

    pub fn set_offer_fee_percent(&mut self, call: &Call, percent: u8) -> Result<()> {
        call.ensure_no_value()?;
        self.settings.set_offer_fee_percent(call.caller, percent)
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    #[must_use]
    pub fn balance_of(&self, owner: Address, token_id: TokenId) -> u64 {
        self.ledger.balance_of(owner, token_id)
    }

    #[must_use]
    pub fn total_supply(&self, token_id: TokenId) -> u64 {
        self.ledger.total_supply(token_id)
    }

    #[must_use]
    pub fn claim_balance(&self, claimant: Address) -> Amount {
        self.claims.balance(claimant)
    }

    pub fn auction(&self, token_id: TokenId, auction_id: AuctionId) -> Result<&Auction> {
        self.auctions.auction(token_id, auction_id)
    }

    #[must_use]
    pub fn all_auctions_on_token(&self, token_id: TokenId) -> Vec<AuctionId> {
        self.auctions.all_auctions_on_token(token_id)
    }

    /// Read-only uniform price quote over the revealed bids.
    pub fn uniform_price_quote(
        &self,
        token_id: TokenId,
        auction_id: AuctionId,
    ) -> Result<Option<UniformQuote>> {
        self.auctions.uniform_price_quote(token_id, auction_id)
    }

    pub fn offer_details(&self, token_id: TokenId, offer_id: OfferId) -> Result<&Offer> {
        self.offers.get(token_id, offer_id)
    }

    #[must_use]
    pub fn all_offers_on_token(&self, token_id: TokenId) -> Vec<OfferId> {
        self.offers.all_offers_on_token(token_id)
    }

    #[must_use]
    pub fn owner_fee_percent_for_auction(&self) -> u8 {
        self.settings.owner_fee_percent_for_auction()
    }

    #[must_use]
    pub fn owner_fee_percent_for_offer(&self) -> u8 {
        self.settings.owner_fee_percent_for_offer()
    }

    #[must_use]
    pub fn operator(&self) -> Address {
        self.settings.operator()
    }

    #[must_use]
    pub fn custody_address(&self) -> Address {
        self.custody.address()
    }

    /// Log records from `offset` onwards.
    #[must_use]
    pub fn events_since(&self, offset: u64) -> &[LogRecord] {
        self.log.since(offset)
    }

    #[must_use]
    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    /// Lifetime currency attached to successful calls.
    #[must_use]
    pub fn currency_received(&self) -> Amount {
        self.conservation.received()
    }

    /// Check currency and token conservation across the whole state.
    ///
    /// # Errors
    /// `ConservationViolation`, `ArithmeticOverflow`.
    pub fn verify_conservation(&self) -> Result<()> {
        self.conservation.verify_currency(
            self.claims.outstanding(),
            self.auctions.escrowed_funds()?,
            self.claims.total_withdrawn(),
        )?;
        conservation::verify_tokens(&self.ledger, &self.custody)?;
        tracing::debug!(
            received = %self.conservation.received(),
            open_auctions = self.auctions.open_count(),
            open_offers = self.offers.open_count(),
            "Conservation verified"
        );
        Ok(())
    }
}

/// A [`Marketplace`] behind a single global lock, for multi-threaded hosts.
#[derive(Debug, Clone)]
pub struct SharedMarketplace(Arc<Mutex<Marketplace>>);

impl SharedMarketplace {
    #[must_use]
    pub fn new(market: Marketplace) -> Self {
        Self(Arc::new(Mutex::new(market)))
    }

    /// Run `f` with exclusive access. Operations are serialized.
    ///
    /// # Errors
    /// `Internal` if a previous holder panicked, otherwise whatever `f` returns.
    pub fn with<T>(&self, f: impl FnOnce(&mut Marketplace) -> Result<T>) -> Result<T> {
        let mut guard = self
            .0
            .lock()
            .map_err(|_| MarketError::Internal("marketplace lock poisoned".into()))?;
        f(&mut *guard)
    }
}
