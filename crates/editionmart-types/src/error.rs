//! Error types for the Edition Market engine.
//!
//! All errors use the `EM_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Input validation errors
//! - 2xx: Balance / funds errors
//! - 3xx: Auction errors
//! - 4xx: Offer errors
//! - 5xx: Authorization errors
//! - 6xx: Arithmetic / invariant errors
//! - 9xx: General / internal errors
//!
//! Every variant is a business-rule violation that aborts the whole
//! operation with no state change.

use thiserror::Error;

use crate::{Address, Amount, AuctionId, BidId, OfferId, TokenId};

/// Central error enum for all Edition Market operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MarketError {
    // =================================================================
    // Input Validation Errors (1xx)
    // =================================================================
    /// Quantity is zero or larger than the lot allows.
    #[error("EM_ERR_100: Invalid quantity: {reason}")]
    InvalidQuantity { reason: String },

    /// A currency amount is negative, fractional, or otherwise unusable.
    #[error("EM_ERR_101: Invalid amount {amount}: {reason}")]
    InvalidAmount { amount: Amount, reason: String },

    /// Fee percentage above 100.
    #[error("EM_ERR_102: Invalid fee percent: {0}")]
    InvalidFee(u8),

    /// Bid or reveal window is empty.
    #[error("EM_ERR_103: Invalid deadlines: {reason}")]
    InvalidDeadlines { reason: String },

    // =================================================================
    // Balance / Funds Errors (2xx)
    // =================================================================
    /// Not enough token units to escrow or transfer.
    #[error("EM_ERR_200: Insufficient token balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u64, available: u64 },

    /// Attached currency does not cover what the operation requires.
    #[error("EM_ERR_201: Insufficient funds: need {needed}, supplied {supplied}")]
    InsufficientFunds { needed: Amount, supplied: Amount },

    /// Claim withdrawal with a zero balance.
    #[error("EM_ERR_202: Nothing to claim for {0}")]
    NothingToClaim(Address),

    // =================================================================
    // Auction Errors (3xx)
    // =================================================================
    /// No auction with this id on this token.
    #[error("EM_ERR_300: Auction not found: token {token_id} auction {auction_id}")]
    AuctionNotFound {
        token_id: TokenId,
        auction_id: AuctionId,
    },

    /// No bid at this index in the auction.
    #[error("EM_ERR_301: Bid not found: {0}")]
    BidNotFound(BidId),

    /// The auction is not in the phase this operation needs.
    #[error("EM_ERR_302: Auction closed for {operation}")]
    AuctionClosed { operation: &'static str },

    /// A deadline that gates this operation has not passed yet.
    #[error("EM_ERR_303: Deadline not reached for {operation}")]
    DeadlineNotReached { operation: &'static str },

    /// Revealed (price, nonce) does not hash to the stored commitment.
    #[error("EM_ERR_304: Commitment mismatch for {0}")]
    CommitMismatch(BidId),

    /// The bid was revealed before.
    #[error("EM_ERR_305: Bid already revealed: {0}")]
    AlreadyRevealed(BidId),

    /// Finalize was already executed for this auction.
    #[error("EM_ERR_306: Auction already finalized: {0}")]
    AlreadyFinalized(AuctionId),

    /// The per-auction bid cap is reached.
    #[error("EM_ERR_307: Too many bids on auction (limit {limit})")]
    TooManyBids { limit: usize },

    // =================================================================
    // Offer Errors (4xx)
    // =================================================================
    /// No offer with this id on this token.
    #[error("EM_ERR_400: Offer not found: token {token_id} offer {offer_id}")]
    OfferNotFound { token_id: TokenId, offer_id: OfferId },

    /// The offer was already filled or withdrawn.
    #[error("EM_ERR_401: Offer not open: {0}")]
    OfferNotOpen(OfferId),

    /// Only the seller may withdraw an offer.
    #[error("EM_ERR_402: Caller {0} is not the seller")]
    NotSeller(Address),

    // =================================================================
    // Authorization Errors (5xx)
    // =================================================================
    /// Operator-only operation invoked by someone else.
    #[error("EM_ERR_500: Unauthorized caller {0}")]
    Unauthorized(Address),

    // =================================================================
    // Arithmetic / Invariant Errors (6xx)
    // =================================================================
    /// Checked arithmetic overflowed or underflowed.
    #[error("EM_ERR_600: Arithmetic overflow in {context}")]
    ArithmeticOverflow { context: &'static str },

    /// Token or currency conservation broken. Critical safety alert.
    #[error("EM_ERR_601: Conservation violation: {reason}")]
    ConservationViolation { reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Unrecoverable internal error.
    #[error("EM_ERR_900: Internal error: {0}")]
    Internal(String),

    /// Serialization / deserialization error.
    #[error("EM_ERR_901: Serialization error: {0}")]
    Serialization(String),
}

impl MarketError {
    /// Shorthand for [`MarketError::ArithmeticOverflow`].
    #[must_use]
    pub fn overflow(context: &'static str) -> Self {
        Self::ArithmeticOverflow { context }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, MarketError>;

impl From<serde_json::Error> for MarketError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
