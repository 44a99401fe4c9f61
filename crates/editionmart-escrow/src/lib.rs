//! # editionmart-escrow
//!
//! **Custody plane**: token balances, escrowed lots, and withdrawable
//! currency claims.
//!
//! ## Architecture
//!
//! 1. **Ledger**: authoritative `(owner, token) -> quantity` balances
//! 2. **Custody**: locks seller units into a custody address per lot and
//!    releases each lot exactly once, distributing every unit
//! 3. **ClaimVault**: per-address currency the engine owes, pulled by the
//!    owner with a withdrawal
//!
//! ```text
//! seller ─lock─▶ Custody ─release─▶ winners / buyer / seller
//! refunds, proceeds, fees ─credit─▶ ClaimVault ─withdraw─▶ owner
//! ```
//!
//! Every mutation here is all-or-nothing.

pub mod claim_vault;
pub mod custody;
pub mod ledger;

pub use claim_vault::{ClaimVault, CreditPlan};
pub use custody::{Custody, Lot, LotEntry, LotState};
pub use ledger::{Ledger, TokenMove};
