//! Discriminatory (pay-your-bid) multi-unit allocation.
//!
//! ```text
//! allocate(bids, quantity_offered, reserve) -> Allocation
//! ```
//!
//! ## Algorithm
//!
//! 1. Keep revealed bids priced at or above the reserve
//! 2. Sort by price descending, ties by reveal sequence ascending
//! 3. Fill each request in full while capacity remains; the bid at the
//!    boundary receives exactly the remaining capacity
//! 4. Charge every allocated unit at the bidder's own price
//!
//! Unrevealed and below-reserve bids produce no line; the caller refunds
//! them in full. The function is pure: the same bids always produce the
//! same lines in the same order.

use std::cmp::Ordering;

use editionmart_types::{Address, Amount, Bid, BidId, Result, amount};
use rust_decimal::Decimal;

/// One eligible bid's outcome, in priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationLine {
    pub bid_id: BidId,
    pub bidder: Address,
    pub price_per_unit: Amount,
    pub quantity_requested: u64,
    /// Units won; zero for bids below the cut-off.
    pub allocated: u64,
    /// `price_per_unit * allocated`.
    pub charge: Amount,
}

/// Result of clearing one auction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub lines: Vec<AllocationLine>,
    pub quantity_allocated: u64,
    /// Sum of all charges.
    pub proceeds: Amount,
}

impl Allocation {
    /// The line for `bid_id`, if the bid was eligible.
    #[must_use]
    pub fn line(&self, bid_id: BidId) -> Option<&AllocationLine> {
        self.lines.iter().find(|l| l.bid_id == bid_id)
    }

    /// Units left over for the seller.
    #[must_use]
    pub fn unallocated(&self, quantity_offered: u64) -> u64 {
        quantity_offered.saturating_sub(self.quantity_allocated)
    }
}

/// Revealed bids at or above `reserve`, in priority order.
#[must_use]
pub fn priority_order<'a>(bids: &'a [Bid], reserve: Amount) -> Vec<(&'a Bid, Amount)> {
    let mut eligible: Vec<(&Bid, Amount)> = bids
        .iter()
        .filter_map(|b| b.revealed_price_per_unit.map(|p| (b, p)))
        .filter(|(_, price)| *price >= reserve)
        .collect();
    eligible.sort_by(|(a, pa), (b, pb)| match pb.cmp(pa) {
        Ordering::Equal => a.reveal_sequence.cmp(&b.reveal_sequence),
        other => other,
    });
    eligible
}

/// Compute the allocation for one auction.
///
/// # Errors
/// `ArithmeticOverflow` if a charge or the proceeds overflow.
pub fn allocate(bids: &[Bid], quantity_offered: u64, reserve: Amount) -> Result<Allocation> {
    let mut remaining = quantity_offered;
    let mut proceeds = Decimal::ZERO;
    let mut lines = Vec::new();

    for (bid, price) in priority_order(bids, reserve) {
        let allocated = bid.quantity_requested.min(remaining);
        remaining -= allocated;

        let charge = amount::checked_total(price, allocated)?;
        proceeds = amount::checked_add(proceeds, charge, "auction proceeds")?;

        tracing::debug!(
            bid = %bid.id,
            bidder = %bid.bidder,
            price = %price,
            requested = bid.quantity_requested,
            allocated,
            "Allocation line"
        );

        lines.push(AllocationLine {
            bid_id: bid.id,
            bidder: bid.bidder,
            price_per_unit: price,
            quantity_requested: bid.quantity_requested,
            allocated,
            charge,
        });
    }

    Ok(Allocation {
        lines,
        quantity_allocated: quantity_offered - remaining,
        proceeds,
    })
}
