//! Currency amounts and checked value arithmetic.
//!
//! Currency is carried as [`Decimal`] but restricted to non-negative whole
//! units. Every multiplication and addition on values goes through a checked
//! helper here; overflow surfaces as [`MarketError::ArithmeticOverflow`]
//! instead of wrapping.

use rust_decimal::{Decimal, prelude::ToPrimitive};

use crate::{MarketError, Result, constants};

/// A currency amount in whole units.
pub type Amount = Decimal;

/// Validate a caller-supplied amount: non-negative and integral.
///
/// # Errors
/// Returns `InvalidAmount` for negative or fractional values.
pub fn ensure_whole(amount: Amount) -> Result<Amount> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(MarketError::InvalidAmount {
            amount,
            reason: "negative".into(),
        });
    }
    if !amount.fract().is_zero() {
        return Err(MarketError::InvalidAmount {
            amount,
            reason: "fractional currency units".into(),
        });
    }
    Ok(amount.trunc())
}

/// `price * quantity`, checked.
pub fn checked_total(price: Amount, quantity: u64) -> Result<Amount> {
    price
        .checked_mul(Decimal::from(quantity))
        .ok_or_else(|| MarketError::overflow("price * quantity"))
}

/// `a + b`, checked.
pub fn checked_add(a: Amount, b: Amount, context: &'static str) -> Result<Amount> {
    a.checked_add(b).ok_or_else(|| MarketError::overflow(context))
}

/// `a - b`, failing when the result would be negative.
pub fn checked_sub(a: Amount, b: Amount, context: &'static str) -> Result<Amount> {
    if b > a {
        return Err(MarketError::overflow(context));
    }
    a.checked_sub(b).ok_or_else(|| MarketError::overflow(context))
}

/// Split `proceeds` into `(seller_share, operator_fee)`.
///
/// The seller receives `floor(proceeds * (100 - fee) / 100)`; the operator
/// receives the remainder, so the two always sum to `proceeds`.
pub fn split_fee(proceeds: Amount, fee_percent: u8) -> Result<(Amount, Amount)> {
    if fee_percent > constants::MAX_FEE_PERCENT {
        return Err(MarketError::InvalidFee(fee_percent));
    }
    let keep = Decimal::from(constants::MAX_FEE_PERCENT - fee_percent);
    let seller = proceeds
        .checked_mul(keep)
        .ok_or_else(|| MarketError::overflow("fee split"))?
        .checked_div(Decimal::ONE_HUNDRED)
        .ok_or_else(|| MarketError::overflow("fee split"))?
        .floor();
    let fee = checked_sub(proceeds, seller, "fee split")?;
    Ok((seller, fee))
}

/// Encode a whole amount as a 32-byte big-endian integer.
pub fn to_be_bytes32(amount: Amount) -> Result<[u8; 32]> {
    let whole = ensure_whole(amount)?;
    let value = whole
        .to_u128()
        .ok_or_else(|| MarketError::overflow("amount encoding"))?;
    let mut out = [0u8; 32];
    out[16..].copy_from_slice(&value.to_be_bytes());
    Ok(out)
}
