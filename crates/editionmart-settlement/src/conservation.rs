//! Conservation invariant checker.
//!
//! Invariants checked after every state-changing operation in tests and on
//! demand in production:
//! ```text
//! currency: Σ(received) == Σ(claims outstanding) + Σ(bid escrow) + Σ(withdrawn)
//! tokens:   ∀ token: Σ(balances) == total_supply
//!           ∀ token: balance_of(custody) == Σ(held lots)
//! ```
//!
//! A violation means value was created or destroyed somewhere; it is logged
//! at `warn` and surfaced as `ConservationViolation`.

use editionmart_escrow::{Custody, Ledger};
use editionmart_types::{Amount, MarketError, Result, amount};
use rust_decimal::Decimal;

/// Tracks currency received by the engine since genesis.
#[derive(Debug)]
pub struct Conservation {
    received: Amount,
}

impl Conservation {
    #[must_use]
    pub fn new() -> Self {
        Self {
            received: Decimal::ZERO,
        }
    }

    /// Lifetime currency attached to successful calls.
    #[must_use]
    pub fn received(&self) -> Amount {
        self.received
    }

    /// Total after receiving `value`, without recording it.
    ///
    /// # Errors
    /// `ArithmeticOverflow`.
    pub fn preview_receive(&self, value: Amount) -> Result<Amount> {
        amount::checked_add(self.received, value, "currency received")
    }

    /// Record a total computed by [`Conservation::preview_receive`].
    pub fn commit_receive(&mut self, total: Amount) {
        self.received = total;
    }

    /// Verify that all currency received is accounted for.
    ///
    /// # Errors
    /// `ConservationViolation` on mismatch, `ArithmeticOverflow`.
    pub fn verify_currency(
        &self,
        outstanding: Amount,
        escrowed: Amount,
        withdrawn: Amount,
    ) -> Result<()> {
        let held = amount::checked_add(outstanding, escrowed, "currency held")?;
        let accounted = amount::checked_add(held, withdrawn, "currency accounted")?;
        if accounted != self.received {
            tracing::warn!(
                received = %self.received,
                outstanding = %outstanding,
                escrowed = %escrowed,
                withdrawn = %withdrawn,
                "Currency conservation violated"
            );
            return Err(MarketError::ConservationViolation {
                reason: format!(
                    "received {} != claims {outstanding} + escrow {escrowed} + withdrawn {withdrawn}",
                    self.received
                ),
            });
        }
        Ok(())
    }
}

impl Default for Conservation {
    fn default() -> Self {
        Self::new()
    }
}

/// Verify token conservation for every minted token.
///
/// # Errors
/// `ConservationViolation` naming the first token that fails.
pub fn verify_tokens(ledger: &Ledger, custody: &Custody) -> Result<()> {
    for token_id in ledger.tokens() {
        let supply = u128::from(ledger.total_supply(token_id));
        let balances = ledger.sum_of_balances(token_id);
        if balances != supply {
            tracing::warn!(token = %token_id, supply, balances, "Token supply violated");
            return Err(MarketError::ConservationViolation {
                reason: format!("{token_id}: balances {balances} != supply {supply}"),
            });
        }

        let in_custody = u128::from(ledger.balance_of(custody.address(), token_id));
        let held = custody.held_quantity(token_id);
        if in_custody != held {
            tracing::warn!(token = %token_id, in_custody, held, "Custody balance violated");
            return Err(MarketError::ConservationViolation {
                reason: format!("{token_id}: custody holds {in_custody}, lots account for {held}"),
            });
        }
    }
    Ok(())
}
