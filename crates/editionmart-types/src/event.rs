//! Notification stream types.
//!
//! Every state transition produces one or more [`MarketEvent`]s, appended to
//! the event log as [`LogRecord`]s with a gap-free sequence number. The log is
//! the durable history: an observer that replays it from offset 0 can
//! rebuild every token balance and claim balance.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, Amount, AuctionId, BidId, OfferId, TokenId};

/// A single notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum MarketEvent {
    AuctionCreated {
        token_id: TokenId,
        auction_id: AuctionId,
        seller: Address,
        quantity: u64,
        reserve_price_per_unit: Amount,
        owner_fee_percent: u8,
        bid_deadline: DateTime<Utc>,
        reveal_deadline: DateTime<Utc>,
    },
    BidPlacedForAuction {
        token_id: TokenId,
        auction_id: AuctionId,
        bid_id: BidId,
        bidder: Address,
        quantity: u64,
        deposit: Amount,
    },
    BidRevealedForAuction {
        token_id: TokenId,
        auction_id: AuctionId,
        bid_id: BidId,
        bidder: Address,
        price_per_unit: Amount,
    },
    AuctionFinalized {
        token_id: TokenId,
        auction_id: AuctionId,
        quantity_allocated: u64,
        proceeds: Amount,
        /// Hex SHA-256 over the allocation lines.
        allocation_digest: String,
    },
    OfferCreated {
        token_id: TokenId,
        offer_id: OfferId,
        seller: Address,
        quantity: u64,
        price_per_unit: Amount,
    },
    OfferFilled {
        token_id: TokenId,
        offer_id: OfferId,
        buyer: Address,
    },
    OfferWithdrawn {
        token_id: TokenId,
        offer_id: OfferId,
    },
    ClaimIncreased {
        claimant: Address,
        increase_amount: Amount,
    },
    ClaimWithdrawn {
        claimant: Address,
        withdrawal_amount: Amount,
    },
    TransferSingle {
        operator: Address,
        from: Address,
        to: Address,
        id: TokenId,
        value: u64,
    },
}

impl MarketEvent {
    /// Short event name, matching the serialized tag.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::AuctionCreated { .. } => "AuctionCreated",
            Self::BidPlacedForAuction { .. } => "BidPlacedForAuction",
            Self::BidRevealedForAuction { .. } => "BidRevealedForAuction",
            Self::AuctionFinalized { .. } => "AuctionFinalized",
            Self::OfferCreated { .. } => "OfferCreated",
            Self::OfferFilled { .. } => "OfferFilled",
            Self::OfferWithdrawn { .. } => "OfferWithdrawn",
            Self::ClaimIncreased { .. } => "ClaimIncreased",
            Self::ClaimWithdrawn { .. } => "ClaimWithdrawn",
            Self::TransferSingle { .. } => "TransferSingle",
        }
    }
}

impl fmt::Display for MarketEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An event with its position in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub sequence: u64,
    #[serde(flatten)]
    pub event: MarketEvent,
}
