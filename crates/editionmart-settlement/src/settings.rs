//! Settings registry: operator identity and fee percentages.
//!
//! Fees are read at the moment an auction or offer is created and stored on
//! it, so later changes never affect open lots.

use editionmart_types::{Address, MarketConfig, MarketError, Result, constants};

/// Operator-owned marketplace settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsRegistry {
    operator: Address,
    auction_fee_percent: u8,
    offer_fee_percent: u8,
}

impl SettingsRegistry {
    /// Seed from configuration.
    #[must_use]
    pub fn from_config(config: &MarketConfig) -> Self {
        Self {
            operator: config.operator,
            auction_fee_percent: config.auction_fee_percent,
            offer_fee_percent: config.offer_fee_percent,
        }
    }

    #[must_use]
    pub fn operator(&self) -> Address {
        self.operator
    }

    /// Fee taken from auction proceeds, percent.
    #[must_use]
    pub fn owner_fee_percent_for_auction(&self) -> u8 {
        self.auction_fee_percent
    }

    /// Fee taken from offer sales, percent.
    #[must_use]
    pub fn owner_fee_percent_for_offer(&self) -> u8 {
        self.offer_fee_percent
    }

    /// Fail unless `caller` is the operator.
    pub fn ensure_operator(&self, caller: Address) -> Result<()> {
        if caller != self.operator {
            return Err(MarketError::Unauthorized(caller));
        }
        Ok(())
    }

    /// # Errors
    /// `Unauthorized` for non-operators, `InvalidFee` above 100.
    pub fn set_auction_fee_percent(&mut self, caller: Address, percent: u8) -> Result<()> {
        self.ensure_operator(caller)?;
        validate_fee(percent)?;
        self.auction_fee_percent = percent;
        tracing::info!(percent, "Auction fee updated");
        Ok(())
    }

    /// # Errors
    /// `Unauthorized` for non-operators, `InvalidFee` above 100.
    pub fn set_offer_fee_percent(&mut self, caller: Address, percent: u8) -> Result<()> {
        self.ensure_operator(caller)?;
        validate_fee(percent)?;
        self.offer_fee_percent = percent;
        tracing::info!(percent, "Offer fee updated");
        Ok(())
    }
}

/// Fee percentages are capped at 100.
pub fn validate_fee(percent: u8) -> Result<()> {
    if percent > constants::MAX_FEE_PERCENT {
        return Err(MarketError::InvalidFee(percent));
    }
    Ok(())
}
