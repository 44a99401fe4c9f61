//! Replay mirror: balances rebuilt from the event log alone.
//!
//! This is what an external indexer keeps. Folding every record from
//! offset 0 must reproduce the engine's token and claim balances exactly.

use std::collections::HashMap;

use editionmart_types::{Address, Amount, LogRecord, MarketError, MarketEvent, Result, TokenId, amount};
use rust_decimal::Decimal;

/// Token and claim balances derived from `TransferSingle`, `ClaimIncreased`
/// and `ClaimWithdrawn` records.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StateMirror {
    balances: HashMap<(Address, TokenId), u64>,
    supply: HashMap<TokenId, u64>,
    claims: HashMap<Address, Amount>,
    next_sequence: u64,
}

impl StateMirror {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold a full log.
    ///
    /// # Errors
    /// See [`StateMirror::apply`].
    pub fn replay(records: &[LogRecord]) -> Result<Self> {
        let mut mirror = Self::new();
        for record in records {
            mirror.apply(record)?;
        }
        Ok(mirror)
    }

    /// Fold one record. Records must arrive in sequence order without gaps.
    ///
    /// # Errors
    /// `Internal` on a sequence gap or a transfer the mirror cannot fund,
    /// `ArithmeticOverflow`.
    pub fn apply(&mut self, record: &LogRecord) -> Result<()> {
        if record.sequence != self.next_sequence {
            return Err(MarketError::Internal(format!(
                "log gap: expected sequence {}, got {}",
                self.next_sequence, record.sequence
            )));
        }

        match &record.event {
            MarketEvent::TransferSingle {
                from, to, id, value, ..
            } => {
                if from.is_zero() {
                    let supply = self.supply.entry(*id).or_insert(0);
                    *supply = supply
                        .checked_add(*value)
                        .ok_or_else(|| MarketError::overflow("mirrored supply"))?;
                } else {
                    let held = self.balances.entry((*from, *id)).or_insert(0);
                    *held = held.checked_sub(*value).ok_or_else(|| {
                        MarketError::Internal(format!(
                            "record {}: {from} sends {value} of {id} it does not hold",
                            record.sequence
                        ))
                    })?;
                }
                let credited = self.balances.entry((*to, *id)).or_insert(0);
                *credited = credited
                    .checked_add(*value)
                    .ok_or_else(|| MarketError::overflow("mirrored balance"))?;
            }
            MarketEvent::ClaimIncreased {
                claimant,
                increase_amount,
            } => {
                let claim = self.claims.entry(*claimant).or_insert(Decimal::ZERO);
                *claim = amount::checked_add(*claim, *increase_amount, "mirrored claim")?;
            }
            MarketEvent::ClaimWithdrawn {
                claimant,
                withdrawal_amount,
            } => {
                let claim = self.claims.entry(*claimant).or_insert(Decimal::ZERO);
                *claim = amount::checked_sub(*claim, *withdrawal_amount, "mirrored withdrawal")?;
            }
            _ => {}
        }

        self.next_sequence += 1;
        Ok(())
    }

    #[must_use]
    pub fn balance_of(&self, owner: Address, token_id: TokenId) -> u64 {
        self.balances.get(&(owner, token_id)).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn total_supply(&self, token_id: TokenId) -> u64 {
        self.supply.get(&token_id).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn claim_balance(&self, claimant: Address) -> Amount {
        self.claims.get(&claimant).copied().unwrap_or(Decimal::ZERO)
    }

    /// Sequence number the mirror expects next; also the number of records
    /// folded so far.
    #[must_use]
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }
}
