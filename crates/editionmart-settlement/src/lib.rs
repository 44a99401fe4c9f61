//! # editionmart-settlement
//!
//! **Settlement plane**: the operations participants call, the state they
//! mutate, and the notification stream they produce.
//!
//! ## Architecture
//!
//! [`Marketplace`] owns every store and routes each operation:
//! 1. [`AuctionHouse`]: start, commit, reveal and finalize sealed-bid
//!    multi-unit auctions
//! 2. [`OfferBook`]: list, accept and withdraw fixed-price offers
//! 3. [`SettingsRegistry`]: operator identity and fee percentages
//! 4. [`EventLog`]: append-only, offset-tailed notification log
//! 5. [`Conservation`]: currency and token conservation checks
//!
//! Token custody and claims live in `editionmart-escrow`; allocation in
//! `editionmart-clearing`. [`StateMirror`] rebuilds balances from the log
//! the way an external indexer would.

pub mod auction_house;
pub mod conservation;
pub mod event_log;
pub mod marketplace;
pub mod offer_book;
pub mod replay;
pub mod settings;

pub use auction_house::{AuctionHouse, AuctionTerms};
pub use conservation::{Conservation, verify_tokens};
pub use event_log::EventLog;
pub use marketplace::{Marketplace, SharedMarketplace};
pub use offer_book::OfferBook;
pub use replay::StateMirror;
pub use settings::SettingsRegistry;
