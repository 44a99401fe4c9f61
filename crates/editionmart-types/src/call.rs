//! Call context for externally invoked operations.
//!
//! Every operation receives who is calling, what time the engine should use
//! for deadline checks, and how much currency is attached. Nothing is read
//! from ambient globals.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::{Address, Amount, MarketError, Result, amount};

/// Caller identity, clock reading, and attached funds for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Call {
    pub caller: Address,
    pub now: DateTime<Utc>,
    pub value: Amount,
}

impl Call {
    /// A call with no funds attached.
    #[must_use]
    pub fn new(caller: Address, now: DateTime<Utc>) -> Self {
        Self {
            caller,
            now,
            value: Decimal::ZERO,
        }
    }

    /// Attach currency to the call.
    #[must_use]
    pub fn with_value(mut self, value: Amount) -> Self {
        self.value = value;
        self
    }

    /// The attached value, validated as non-negative whole units.
    pub fn funds(&self) -> Result<Amount> {
        amount::ensure_whole(self.value)
    }

    /// Reject attached currency on operations that take none.
    pub fn ensure_no_value(&self) -> Result<()> {
        if !self.value.is_zero() {
            return Err(MarketError::InvalidAmount {
                amount: self.value,
                reason: "operation does not accept funds".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_call_has_no_value() {
        let call = Call::new(Address::from_low_u64(1), Utc::now());
        assert_eq!(call.funds().unwrap(), Decimal::ZERO);
    }

    #[test]
    fn value_on_unpaid_operation_rejected() {
        let call = Call::new(Address::from_low_u64(1), Utc::now());
        assert!(call.ensure_no_value().is_ok());
        assert!(matches!(
            call.with_value(Decimal::ONE).ensure_no_value(),
            Err(MarketError::InvalidAmount { .. })
        ));
    }

    #[test]
    fn fractional_value_rejected() {
        let call = Call::new(Address::from_low_u64(1), Utc::now()).with_value(Decimal::new(5, 1));
        assert!(matches!(
            call.funds(),
            Err(MarketError::InvalidAmount { .. })
        ));
    }
}
