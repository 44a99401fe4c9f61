//! Allocation digests for independent verification.
//!
//! Anyone holding the revealed bids can recompute an auction's allocation
//! and compare the digest with the one recorded in `AuctionFinalized`
//! instead of diffing every line.

use editionmart_types::{AuctionId, TokenId};
use sha2::{Digest, Sha256};

use crate::allocation::AllocationLine;

/// Hash an auction's allocation lines.
///
/// Depends on the auction identity and, for every line in priority order,
/// the bid index, bidder, price, allocated units and charge. Line order
/// is part of the digest.
#[must_use]
pub fn compute_allocation_digest(
    token_id: TokenId,
    auction_id: AuctionId,
    lines: &[AllocationLine],
) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"editionmart:allocation:v1:");
    hasher.update(token_id.0.to_le_bytes());
    hasher.update(auction_id.0.to_le_bytes());
    hasher.update((lines.len() as u64).to_le_bytes());

    for line in lines {
        hasher.update(line.bid_id.0.to_le_bytes());
        hasher.update(line.bidder.as_bytes());
        hasher.update(line.price_per_unit.normalize().to_string().as_bytes());
        hasher.update(line.allocated.to_le_bytes());
        hasher.update(line.charge.normalize().to_string().as_bytes());
    }

    let result = hasher.finalize();
    let mut digest = [0u8; 32];
    digest.copy_from_slice(&result);
    digest
}

/// Hex form used in the event stream.
#[must_use]
pub fn allocation_digest_hex(
    token_id: TokenId,
    auction_id: AuctionId,
    lines: &[AllocationLine],
) -> String {
    hex::encode(compute_allocation_digest(token_id, auction_id, lines))
}

/// Recompute and compare.
#[must_use]
pub fn verify_allocation_digest(
    token_id: TokenId,
    auction_id: AuctionId,
    lines: &[AllocationLine],
    expected_hex: &str,
) -> bool {
    allocation_digest_hex(token_id, auction_id, lines) == expected_hex
}
