//! # Commit-reveal binding
//!
//! A sealed bid stores only a [`CommitHash`]. At reveal time the bidder
//! discloses `(price, nonce)` and the engine recomputes
//!
//! ```text
//! commit = SHA-256( price_be32 || nonce_32 || bidder_address_20 )
//! ```
//!
//! Both price and nonce are fixed width, so the concatenation is
//! unambiguous, and the bidder's own address is bound in: nobody can reveal
//! someone else's commitment, and copying a commitment gains nothing.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{Address, Amount, MarketError, Result, amount};

/// Hash binding a bidder to a hidden price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CommitHash(pub [u8; 32]);

impl fmt::Display for CommitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl From<CommitHash> for String {
    fn from(h: CommitHash) -> Self {
        h.to_string()
    }
}

impl TryFrom<String> for CommitHash {
    type Error = MarketError;

    fn try_from(s: String) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(&s);
        let raw = hex::decode(digits).map_err(|e| MarketError::Serialization(e.to_string()))?;
        let bytes: [u8; 32] = raw
            .try_into()
            .map_err(|_| MarketError::Serialization(format!("commit hash {s}: want 32 bytes")))?;
        Ok(Self(bytes))
    }
}

/// 32-byte secret salt chosen by the bidder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Nonce(pub [u8; 32]);

impl Nonce {
    /// Nonce holding `n` as a 32-byte big-endian integer.
    #[must_use]
    pub fn from_u64(n: u64) -> Self {
        let mut bytes = [0u8; 32];
        bytes[24..].copy_from_slice(&n.to_be_bytes());
        Self(bytes)
    }

    /// Random nonce for tests.
    #[cfg(feature = "test-helpers")]
    #[must_use]
    pub fn random() -> Self {
        Self(rand::random())
    }
}

/// Compute the commitment for `(price_per_unit, nonce, bidder)`.
///
/// # Errors
/// `InvalidAmount` if the price is negative or fractional.
pub fn compute_commitment(
    price_per_unit: Amount,
    nonce: &Nonce,
    bidder: Address,
) -> Result<CommitHash> {
    let price = amount::to_be_bytes32(price_per_unit)?;
    let mut hasher = Sha256::new();
    hasher.update(price);
    hasher.update(nonce.0);
    hasher.update(bidder.as_bytes());
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    Ok(CommitHash(out))
}

/// Check a reveal against a stored commitment.
pub fn verify_commitment(
    expected: &CommitHash,
    price_per_unit: Amount,
    nonce: &Nonce,
    bidder: Address,
) -> Result<bool> {
    Ok(compute_commitment(price_per_unit, nonce, bidder)? == *expected)
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn commitment_is_deterministic() {
        let bidder = Address::from_low_u64(1);
        let a = compute_commitment(Decimal::new(20, 0), &Nonce::from_u64(1), bidder).unwrap();
        let b = compute_commitment(Decimal::new(20, 0), &Nonce::from_u64(1), bidder).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn commitment_binds_every_field() {
        let bidder = Address::from_low_u64(1);
        let base = compute_commitment(Decimal::new(20, 0), &Nonce::from_u64(1), bidder).unwrap();
        let other_price =
            compute_commitment(Decimal::new(21, 0), &Nonce::from_u64(1), bidder).unwrap();
        let other_nonce =
            compute_commitment(Decimal::new(20, 0), &Nonce::from_u64(2), bidder).unwrap();
        let other_bidder = compute_commitment(
            Decimal::new(20, 0),
            &Nonce::from_u64(1),
            Address::from_low_u64(2),
        )
        .unwrap();
        assert_ne!(base, other_price);
        assert_ne!(base, other_nonce);
        assert_ne!(base, other_bidder);
    }

    #[test]
    fn fixed_width_prevents_swapping_price_and_nonce() {
        let bidder = Address::from_low_u64(9);
        let a = compute_commitment(Decimal::new(5, 0), &Nonce::from_u64(7), bidder).unwrap();
        let b = compute_commitment(Decimal::new(7, 0), &Nonce::from_u64(5), bidder).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn matches_manual_preimage() {
        let bidder = Address::from_low_u64(3);
        let mut preimage = Vec::with_capacity(84);
        let mut price = [0u8; 32];
        price[31] = 11;
        preimage.extend_from_slice(&price);
        preimage.extend_from_slice(&Nonce::from_u64(4).0);
        preimage.extend_from_slice(bidder.as_bytes());
        let expected: [u8; 32] = Sha256::digest(&preimage).into();

        let got = compute_commitment(Decimal::new(11, 0), &Nonce::from_u64(4), bidder).unwrap();
        assert_eq!(got.0, expected);
    }

    #[test]
    fn verify_roundtrip() {
        let bidder = Address::from_low_u64(5);
        let nonce = Nonce::from_u64(99);
        let hash = compute_commitment(Decimal::new(42, 0), &nonce, bidder).unwrap();
        assert!(verify_commitment(&hash, Decimal::new(42, 0), &nonce, bidder).unwrap());
        assert!(!verify_commitment(&hash, Decimal::new(43, 0), &nonce, bidder).unwrap());
    }

    #[test]
    fn fractional_price_cannot_be_committed() {
        let err = compute_commitment(Decimal::new(15, 1), &Nonce::from_u64(1), Address::ZERO)
            .unwrap_err();
        assert!(matches!(err, MarketError::InvalidAmount { .. }));
    }

    #[test]
    fn commit_hash_serde_roundtrip() {
        let hash = compute_commitment(Decimal::ONE, &Nonce::from_u64(1), Address::ZERO).unwrap();
        let json = serde_json::to_string(&hash).unwrap();
        let back: CommitHash = serde_json::from_str(&json).unwrap();
        assert_eq!(hash, back);
    }
}
