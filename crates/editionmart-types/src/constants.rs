//! System-wide constants for the Edition Market engine.

/// Fee percentages are expressed out of this value.
pub const MAX_FEE_PERCENT: u8 = 100;

/// Default marketplace fee taken from auction proceeds (percent).
pub const DEFAULT_AUCTION_FEE_PERCENT: u8 = 10;

/// Default marketplace fee taken from offer sales (percent).
pub const DEFAULT_OFFER_FEE_PERCENT: u8 = 10;

/// Default collateral a bidder must deposit per requested unit at commit time.
pub const DEFAULT_MIN_DEPOSIT_PER_UNIT: i64 = 10;

/// Maximum bids accepted by a single auction.
pub const DEFAULT_MAX_BIDS_PER_AUCTION: usize = 10_000;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "EditionMarket";
