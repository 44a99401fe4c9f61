//! # editionmart-clearing
//!
//! **Pure deterministic auction clearing for Edition Market.**
//!
//! Clearing is the compute plane: it takes an auction's bids and produces
//! the allocation that settlement then executes. It has:
//!
//! - **Zero side effects**: no balance moves, no claim credits
//! - **Deterministic output**: same bids -> same lines -> same digest
//! - **Pay-your-bid settlement**: every won unit is charged at its bid price
//! - **Uniform quote**: an informational revenue-maximizing single price

pub mod allocation;
pub mod determinism;
pub mod pricing;

pub use allocation::{Allocation, AllocationLine, allocate, priority_order};
pub use determinism::{allocation_digest_hex, compute_allocation_digest, verify_allocation_digest};
pub use pricing::{UniformQuote, uniform_price_quote};
