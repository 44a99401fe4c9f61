//! Fixed-price offer model.
//!
//! ```text
//!   ┌──────┐ accept  ┌────────┐
//!   │ OPEN ├────────▶│ FILLED │
//!   └──┬───┘         └────────┘
//!      │ withdraw
//!      ▼
//!   ┌───────────┐
//!   │ WITHDRAWN │
//!   └───────────┘
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, Amount, MarketError, OfferId, Result, TokenId, amount};

/// Lifecycle state of an offer. Both terminal states are final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OfferState {
    Open,
    Filled,
    Withdrawn,
}

impl fmt::Display for OfferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::Filled => write!(f, "FILLED"),
            Self::Withdrawn => write!(f, "WITHDRAWN"),
        }
    }
}

/// A fixed-price listing of `quantity` units held in custody.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Offer {
    pub offer_id: OfferId,
    pub token_id: TokenId,
    pub seller: Address,
    pub quantity: u64,
    pub price_per_unit: Amount,
    /// Fee percent captured when the offer was listed.
    pub fee_percent: u8,
    pub state: OfferState,
    pub created_at: DateTime<Utc>,
    pub buyer: Option<Address>,
}

impl Offer {
    pub fn ensure_open(&self) -> Result<()> {
        if self.state != OfferState::Open {
            return Err(MarketError::OfferNotOpen(self.offer_id));
        }
        Ok(())
    }

    /// Full price of the lot.
    pub fn cost(&self) -> Result<Amount> {
        amount::checked_total(self.price_per_unit, self.quantity)
    }
}
