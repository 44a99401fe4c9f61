//! Token custody: locks and releases escrowed lots.
//!
//! When a seller lists an offer or opens an auction, the units move from
//! the seller to the custody address in the [`Ledger`] and a [`Lot`] records
//! who put them there. A lot is released exactly once; the release must
//! distribute every unit it holds, which is what keeps token conservation
//! exact across settlement.

use std::{collections::HashMap, fmt};

use editionmart_types::{Address, AuctionId, MarketError, OfferId, Result, TokenId};

use crate::ledger::{Ledger, TokenMove};

/// What a block of escrowed units belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lot {
    Auction(TokenId, AuctionId),
    Offer(TokenId, OfferId),
}

impl Lot {
    #[must_use]
    pub fn token_id(&self) -> TokenId {
        match self {
            Self::Auction(t, _) | Self::Offer(t, _) => *t,
        }
    }
}

impl fmt::Display for Lot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auction(t, a) => write!(f, "{t}/{a}"),
            Self::Offer(t, o) => write!(f, "{t}/{o}"),
        }
    }
}

/// Lifecycle of a lot: `Held → Released`, never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LotState {
    Held,
    Released,
}

/// Bookkeeping for one lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LotEntry {
    pub depositor: Address,
    pub quantity: u64,
    pub state: LotState,
}

/// Holds escrowed lots on behalf of the marketplace.
#[derive(Debug)]
pub struct Custody {
    /// Address whose ledger balance backs all held lots.
    address: Address,
    lots: HashMap<Lot, LotEntry>,
}

impl Custody {
    /// Create a custody account backed by `address`.
    #[must_use]
    pub fn new(address: Address) -> Self {
        Self {
            address,
            lots: HashMap::new(),
        }
    }

    /// The custody address.
    #[must_use]
    pub fn address(&self) -> Address {
        self.address
    }

    /// Move `quantity` units from `depositor` into custody under `lot`.
    ///
    /// If the ledger move fails (insufficient balance), no lot is recorded.
    ///
    /// # Errors
    /// - `Unauthorized` if the depositor is the custody address or zero
    /// - `InvalidQuantity` for zero
    /// - `InsufficientBalance` if the depositor lacks the units
    /// - `Internal` if the lot id is already in use
    pub fn lock(
        &mut self,
        ledger: &mut Ledger,
        lot: Lot,
        depositor: Address,
        quantity: u64,
    ) -> Result<TokenMove> {
        // Units already in custody belong to other lots.
        if depositor == self.address || depositor.is_zero() {
            return Err(MarketError::Unauthorized(depositor));
        }
        if quantity == 0 {
            return Err(MarketError::InvalidQuantity {
                reason: "cannot escrow zero units".into(),
            });
        }
        if self.lots.contains_key(&lot) {
            return Err(MarketError::Internal(format!("lot {lot} already exists")));
        }

        let mv = ledger.transfer(depositor, self.address, lot.token_id(), quantity)?;
        tracing::debug!(lot = %lot, depositor = %depositor, quantity, "Lot locked");
        self.lots.insert(
            lot,
            LotEntry {
                depositor,
                quantity,
                state: LotState::Held,
            },
        );
        Ok(mv)
    }

    /// Release a held lot to `recipients`, which must account for every unit.
    ///
    /// Zero-quantity entries are skipped. Returns the ledger moves performed,
    /// in recipient order.
    ///
    /// # Errors
    /// - `Internal` if the lot is unknown or already released
    /// - `ConservationViolation` if the distribution does not sum to the lot
    pub fn release(
        &mut self,
        ledger: &mut Ledger,
        lot: Lot,
        recipients: &[(Address, u64)],
    ) -> Result<Vec<TokenMove>> {
        let entry = self
            .lots
            .get(&lot)
            .ok_or_else(|| MarketError::Internal(format!("lot {lot} not found")))?;
        if entry.state != LotState::Held {
            return Err(MarketError::Internal(format!("lot {lot} already released")));
        }

        let distributed: u128 = recipients.iter().map(|(_, q)| u128::from(*q)).sum();
        if distributed != u128::from(entry.quantity) {
            return Err(MarketError::ConservationViolation {
                reason: format!(
                    "lot {lot}: distributing {distributed} of {} escrowed units",
                    entry.quantity
                ),
            });
        }

        let moves: Vec<TokenMove> = recipients
            .iter()
            .filter(|(_, q)| *q > 0)
            .map(|(to, q)| TokenMove {
                from: self.address,
                to: *to,
                token_id: lot.token_id(),
                value: *q,
            })
            .collect();
        ledger.apply_batch(&moves)?;

        if let Some(entry) = self.lots.get_mut(&lot) {
            entry.state = LotState::Released;
        }
        tracing::debug!(lot = %lot, recipients = moves.len(), "Lot released");
        Ok(moves)
    }

    /// Look up a lot.
    #[must_use]
    pub fn get(&self, lot: &Lot) -> Option<&LotEntry> {
        self.lots.get(lot)
    }

    /// Units of `token_id` currently held across all lots.
    #[must_use]
    pub fn held_quantity(&self, token_id: TokenId) -> u128 {
        self.lots
            .iter()
            .filter(|(lot, e)| lot.token_id() == token_id && e.state == LotState::Held)
            .map(|(_, e)| u128::from(e.quantity))
            .sum()
    }

    /// Number of lots still held.
    #[must_use]
    pub fn held_count(&self) -> usize {
        self.lots
            .values()
            .filter(|e| e.state == LotState::Held)
            .count()
    }
}
