//! Uniform revenue-maximizing price quote.
//!
//! Informational only: settlement is always pay-your-bid (see
//! [`crate::allocation`]). The quote answers "what single per-unit price
//! would have earned the seller the most, treating each bid as a budget of
//! `price * quantity`?"
//!
//! ## Algorithm
//!
//! Walk the eligible bids in priority order. For bid `i` the candidate
//! price is the next bid's price, or the reserve after the last bid. At
//! that price each of the first `i + 1` budgets buys `floor(budget / p)`
//! units, capped at the offered quantity. The candidate with the greatest
//! revenue wins; the first one wins on ties. The walk stops early once the
//! cap is hit.

use editionmart_types::{Amount, Bid, BidId, MarketError, Result, amount};
use rust_decimal::{Decimal, prelude::ToPrimitive};

use crate::allocation::priority_order;

/// A uniform price and the units each bid would receive at it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformQuote {
    pub price_per_unit: Amount,
    pub units: u64,
    pub revenue: Amount,
    /// `(bid, units)` in priority order; bids receiving nothing are omitted.
    pub assignments: Vec<(BidId, u64)>,
}

/// Units a budget buys at `price`, floored.
fn units_for_budget(budget: Amount, price: Amount) -> Result<u64> {
    let units = budget
        .checked_div(price)
        .ok_or_else(|| MarketError::overflow("budget / price"))?
        .floor();
    Ok(units.to_u64().unwrap_or(u64::MAX))
}

/// Quote the revenue-maximizing uniform price for an auction's bids.
///
/// Returns `None` when no candidate price is positive (no eligible bids,
/// or only a zero reserve to fall back on).
///
/// # Errors
/// `ArithmeticOverflow` on budget computation.
pub fn uniform_price_quote(
    bids: &[Bid],
    quantity_offered: u64,
    reserve: Amount,
) -> Result<Option<UniformQuote>> {
    let ordered = priority_order(bids, reserve);
    let budgets: Vec<Amount> = ordered
        .iter()
        .map(|(bid, price)| amount::checked_total(*price, bid.quantity_requested))
        .collect::<Result<_>>()?;

    let mut best: Option<(Amount, Amount)> = None;
    for i in 0..ordered.len() {
        let candidate = ordered.get(i + 1).map_or(reserve, |(_, p)| *p);
        if candidate <= Decimal::ZERO {
            continue;
        }

        let mut sold: u64 = 0;
        for budget in &budgets[..=i] {
            sold = sold.saturating_add(units_for_budget(*budget, candidate)?);
            if sold >= quantity_offered {
                sold = quantity_offered;
                break;
            }
        }

        let revenue = amount::checked_total(candidate, sold)?;
        if best.is_none_or(|(_, top)| revenue > top) {
            best = Some((candidate, revenue));
        }
        if sold == quantity_offered {
            break;
        }
    }

    let Some((price, _)) = best else {
        return Ok(None);
    };

    let mut remaining = quantity_offered;
    let mut assignments = Vec::new();
    for ((bid, bid_price), budget) in ordered.iter().zip(&budgets) {
        if remaining == 0 || *bid_price < price {
            break;
        }
        let units = units_for_budget(*budget, price)?.min(remaining);
        if units > 0 {
            assignments.push((bid.id, units));
            remaining -= units;
        }
    }

    let units = quantity_offered - remaining;
    Ok(Some(UniformQuote {
        price_per_unit: price,
        units,
        revenue: amount::checked_total(price, units)?,
        assignments,
    }))
}
