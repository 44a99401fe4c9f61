//! # editionmart-types
//!
//! Shared types, errors, and configuration for the **Edition Market**
//! settlement engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`Address`], [`TokenId`], [`AuctionId`], [`BidId`], [`OfferId`]
//! - **Currency**: [`Amount`] and the checked arithmetic helpers in [`amount`]
//! - **Commit-reveal**: [`CommitHash`], [`Nonce`], [`compute_commitment`]
//! - **Auction model**: [`Auction`], [`Bid`], [`AuctionState`]
//! - **Offer model**: [`Offer`], [`OfferState`]
//! - **Notifications**: [`MarketEvent`], [`LogRecord`]
//! - **Call context**: [`Call`] (caller identity, clock, attached funds)
//! - **Configuration**: [`MarketConfig`]
//! - **Errors**: [`MarketError`] with `EM_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod amount;
pub mod auction;
pub mod call;
pub mod commitment;
pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod offer;

pub use amount::Amount;
pub use auction::*;
pub use call::*;
pub use commitment::*;
pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use offer::*;

// Constants are accessed via `editionmart_types::constants::FOO`
// and the arithmetic helpers via `editionmart_types::amount::*`.
