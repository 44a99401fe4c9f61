//! Claim vault: per-address withdrawable currency.
//!
//! Refunds, overpayments, sale proceeds and fees are never pushed to
//! participants. They are credited here and each owner pulls them with a
//! withdrawal. Balances only grow through credits and only shrink through
//! the owner's own withdrawal; entries are never removed.

use std::collections::HashMap;

use editionmart_types::{Address, Amount, MarketError, Result, amount};
use rust_decimal::Decimal;

/// A validated batch of credits. See [`ClaimVault::plan`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct CreditPlan {
    applied: Vec<(Address, Amount)>,
    balances: Vec<(Address, Amount)>,
    total_credited: Amount,
}

impl CreditPlan {
    /// The credits this plan will apply.
    #[must_use]
    pub fn credits(&self) -> &[(Address, Amount)] {
        &self.applied
    }
}

/// Withdrawable balances plus lifetime totals for conservation checks.
#[derive(Debug)]
pub struct ClaimVault {
    balances: HashMap<Address, Amount>,
    total_credited: Amount,
    total_withdrawn: Amount,
}

impl ClaimVault {
    /// Create an empty vault.
    #[must_use]
    pub fn new() -> Self {
        Self {
            balances: HashMap::new(),
            total_credited: Decimal::ZERO,
            total_withdrawn: Decimal::ZERO,
        }
    }

    /// Current claim balance of `claimant`.
    #[must_use]
    pub fn balance(&self, claimant: Address) -> Amount {
        self.balances
            .get(&claimant)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Validate a batch of credits without applying it.
    ///
    /// Zero amounts are ignored and repeated claimants are aggregated in
    /// first-seen order. Every resulting balance is computed with checked
    /// arithmetic, so [`ClaimVault::commit`] cannot fail. The plan must be
    /// committed before the vault is touched again.
    ///
    /// # Errors
    /// `InvalidAmount` for negative/fractional credits, `ArithmeticOverflow`.
    pub fn plan(&self, credits: &[(Address, Amount)]) -> Result<CreditPlan> {
        let mut applied: Vec<(Address, Amount)> = Vec::new();
        for (claimant, value) in credits {
            let value = amount::ensure_whole(*value)?;
            if value.is_zero() {
                continue;
            }
            match applied.iter_mut().find(|(a, _)| a == claimant) {
                Some((_, sum)) => *sum = amount::checked_add(*sum, value, "claim credit")?,
                None => applied.push((*claimant, value)),
            }
        }

        let mut balances = Vec::with_capacity(applied.len());
        let mut total_credited = self.total_credited;
        for (claimant, value) in &applied {
            let next = amount::checked_add(self.balance(*claimant), *value, "claim balance")?;
            balances.push((*claimant, next));
            total_credited = amount::checked_add(total_credited, *value, "claim total")?;
        }

        Ok(CreditPlan {
            applied,
            balances,
            total_credited,
        })
    }

    /// Apply a plan produced by [`ClaimVault::plan`]. Returns the credits
    /// applied, one per claimant.
    pub fn commit(&mut self, plan: CreditPlan) -> Vec<(Address, Amount)> {
        self.balances.extend(plan.balances);
        self.total_credited = plan.total_credited;
        plan.applied
    }

    /// Credit several claimants atomically: an overflow anywhere leaves the
    /// vault untouched.
    ///
    /// # Errors
    /// See [`ClaimVault::plan`].
    pub fn credit_all(&mut self, credits: &[(Address, Amount)]) -> Result<Vec<(Address, Amount)>> {
        let plan = self.plan(credits)?;
        Ok(self.commit(plan))
    }

    /// Credit a single claimant.
    pub fn credit(&mut self, claimant: Address, value: Amount) -> Result<Amount> {
        let applied = self.credit_all(&[(claimant, value)])?;
        Ok(applied.first().map_or(Decimal::ZERO, |(_, v)| *v))
    }

    /// Withdraw the caller's whole balance.
    ///
    /// The balance is zeroed before the amount is handed back, so the value
    /// is never observable in two places at once.
    ///
    /// # Errors
    /// `NothingToClaim` if the balance is zero.
    pub fn withdraw(&mut self, claimant: Address) -> Result<Amount> {
        let owed = self.balance(claimant);
        if owed.is_zero() {
            return Err(MarketError::NothingToClaim(claimant));
        }
        let withdrawn = amount::checked_add(self.total_withdrawn, owed, "claim withdrawals")?;

        self.balances.insert(claimant, Decimal::ZERO);
        self.total_withdrawn = withdrawn;
        Ok(owed)
    }

    /// Sum of all outstanding claim balances.
    #[must_use]
    pub fn outstanding(&self) -> Amount {
        self.balances.values().copied().sum()
    }

    /// Lifetime credits.
    #[must_use]
    pub fn total_credited(&self) -> Amount {
        self.total_credited
    }

    /// Lifetime withdrawals.
    #[must_use]
    pub fn total_withdrawn(&self) -> Amount {
        self.total_withdrawn
    }
}

impl Default for ClaimVault {
    fn default() -> Self {
        Self::new()
    }
}
