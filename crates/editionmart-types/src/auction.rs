//! # Sealed-bid multi-unit auction model
//!
//! ## State Machine
//!
//! ```text
//!   ┌─────────┐ start ┌─────────────┐ bid_deadline ┌────────────┐ finalize ┌───────────┐
//!   │ CREATED ├──────▶│ BIDDING_OPEN├─────────────▶│ REVEAL_OPEN├─────────▶│ FINALIZED │
//!   └─────────┘       └─────────────┘              └────────────┘          └───────────┘
//! ```
//!
//! Transitions are **monotonic** and evaluated lazily: there is no timer.
//! Every operation compares the supplied clock with the stored deadlines.
//! Once `reveal_deadline` has passed the auction stays in `REVEAL_OPEN`
//! (reveals refused) until somebody finalizes it.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    Address, Amount, AuctionId, BidId, CommitHash, MarketError, Result, TokenId, amount,
};

/// Lifecycle state of an auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AuctionState {
    /// Initial value only. Auctions are stored already `BiddingOpen` and
    /// [`Auction::phase_at`] never reports this state.
    Created,
    BiddingOpen,
    RevealOpen,
    Finalized,
}

impl fmt::Display for AuctionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "CREATED"),
            Self::BiddingOpen => write!(f, "BIDDING_OPEN"),
            Self::RevealOpen => write!(f, "REVEAL_OPEN"),
            Self::Finalized => write!(f, "FINALIZED"),
        }
    }
}

/// A sealed bid. Created at commit time, mutated once at reveal and once at
/// finalize, never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bid {
    pub id: BidId,
    pub bidder: Address,
    pub quantity_requested: u64,
    pub commit_hash: CommitHash,
    /// Collateral attached at commit time.
    pub deposit: Amount,
    /// Currency the engine currently holds for this bid.
    pub escrowed: Amount,
    pub revealed_price_per_unit: Option<Amount>,
    /// Position in the auction's reveal order; breaks price ties.
    pub reveal_sequence: Option<u64>,
    /// Units won. Zero until finalize.
    pub allocated: u64,
}

impl Bid {
    #[must_use]
    pub fn is_revealed(&self) -> bool {
        self.revealed_price_per_unit.is_some()
    }
}

/// An auction of `quantity_offered` units of one token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Auction {
    pub token_id: TokenId,
    pub auction_id: AuctionId,
    pub seller: Address,
    pub quantity_offered: u64,
    pub reserve_price_per_unit: Amount,
    pub owner_fee_percent: u8,
    pub min_deposit_per_unit: Amount,
    pub created_at: DateTime<Utc>,
    pub bid_deadline: DateTime<Utc>,
    pub reveal_deadline: DateTime<Utc>,
    pub state: AuctionState,
    pub bids: Vec<Bid>,
    pub quantity_allocated: u64,
    /// Number of reveals so far (next reveal sequence).
    pub reveals: u64,
}

impl Auction {
    /// The phase the auction is in at `now`, without mutating it.
    #[must_use]
    pub fn phase_at(&self, now: DateTime<Utc>) -> AuctionState {
        if self.state == AuctionState::Finalized {
            AuctionState::Finalized
        } else if now < self.bid_deadline {
            AuctionState::BiddingOpen
        } else {
            AuctionState::RevealOpen
        }
    }

    /// Move the stored state forward to the phase observed at `now`.
    pub fn advance(&mut self, now: DateTime<Utc>) {
        let observed = self.phase_at(now);
        if observed > self.state {
            self.state = observed;
        }
    }

    /// Bidding is allowed strictly before `bid_deadline`.
    pub fn ensure_bidding(&self, now: DateTime<Utc>) -> Result<()> {
        if self.phase_at(now) != AuctionState::BiddingOpen {
            return Err(MarketError::AuctionClosed { operation: "bid" });
        }
        Ok(())
    }

    /// Reveals are allowed in `[bid_deadline, reveal_deadline)`.
    pub fn ensure_revealing(&self, now: DateTime<Utc>) -> Result<()> {
        match self.phase_at(now) {
            AuctionState::BiddingOpen => Err(MarketError::DeadlineNotReached { operation: "reveal" }),
            AuctionState::RevealOpen if now < self.reveal_deadline => Ok(()),
            _ => Err(MarketError::AuctionClosed { operation: "reveal" }),
        }
    }

    /// Finalize is allowed once, at or after `reveal_deadline`.
    pub fn ensure_finalizable(&self, now: DateTime<Utc>) -> Result<()> {
        if self.state == AuctionState::Finalized {
            return Err(MarketError::AlreadyFinalized(self.auction_id));
        }
        if now < self.reveal_deadline {
            return Err(MarketError::DeadlineNotReached {
                operation: "finalize",
            });
        }
        Ok(())
    }

    /// Look up a bid by index.
    pub fn bid(&self, id: BidId) -> Result<&Bid> {
        usize::try_from(id.0)
            .ok()
            .and_then(|idx| self.bids.get(idx))
            .ok_or(MarketError::BidNotFound(id))
    }

    /// Mutable bid lookup.
    pub fn bid_mut(&mut self, id: BidId) -> Result<&mut Bid> {
        usize::try_from(id.0)
            .ok()
            .and_then(|idx| self.bids.get_mut(idx))
            .ok_or(MarketError::BidNotFound(id))
    }

    /// Id the next bid will receive.
    #[must_use]
    pub fn next_bid_id(&self) -> BidId {
        BidId(self.bids.len() as u64)
    }

    /// Minimum deposit for a bid requesting `quantity` units.
    pub fn required_deposit(&self, quantity: u64) -> Result<Amount> {
        amount::checked_total(self.min_deposit_per_unit, quantity)
    }

    /// Total currency held against this auction's bids.
    pub fn escrowed_funds(&self) -> Result<Amount> {
        self.bids.iter().try_fold(Decimal::ZERO, |acc, bid| {
            amount::checked_add(acc, bid.escrowed, "auction escrow total")
        })
    }

    /// Revealed bids in bid order.
    pub fn revealed_bids(&self) -> impl Iterator<Item = &Bid> {
        self.bids.iter().filter(|b| b.is_revealed())
    }
}
