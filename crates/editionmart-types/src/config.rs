//! Marketplace configuration.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Address, Amount, MarketError, Result, amount, constants};

/// Global marketplace parameters.
///
/// Loaded once at construction; the fee percentages can later be changed
/// by the operator through the settings registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Marketplace operator. Receives fees, may mint and change settings.
    pub operator: Address,
    /// Address that holds escrowed tokens in the transfer stream.
    pub custody: Address,
    /// Fee taken from auction proceeds, percent.
    pub auction_fee_percent: u8,
    /// Fee taken from offer sales, percent.
    pub offer_fee_percent: u8,
    /// Minimum deposit per requested unit when committing a bid.
    pub min_deposit_per_unit: Amount,
    /// Upper bound on bids per auction.
    pub max_bids_per_auction: usize,
}

impl MarketConfig {
    /// Default config for the given operator and custody addresses.
    #[must_use]
    pub fn new(operator: Address, custody: Address) -> Self {
        Self {
            operator,
            custody,
            auction_fee_percent: constants::DEFAULT_AUCTION_FEE_PERCENT,
            offer_fee_percent: constants::DEFAULT_OFFER_FEE_PERCENT,
            min_deposit_per_unit: Decimal::new(constants::DEFAULT_MIN_DEPOSIT_PER_UNIT, 0),
            max_bids_per_auction: constants::DEFAULT_MAX_BIDS_PER_AUCTION,
        }
    }

    /// Parse and validate a JSON config document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        for fee in [self.auction_fee_percent, self.offer_fee_percent] {
            if fee > constants::MAX_FEE_PERCENT {
                return Err(MarketError::InvalidFee(fee));
            }
        }
        amount::ensure_whole(self.min_deposit_per_unit)?;
        if self.custody == self.operator || self.custody.is_zero() {
            return Err(MarketError::Internal(
                "custody address must be non-zero and distinct from the operator".into(),
            ));
        }
        if self.max_bids_per_auction == 0 {
            return Err(MarketError::InvalidQuantity {
                reason: "max_bids_per_auction must be > 0".into(),
            });
        }
        Ok(())
    }
}
