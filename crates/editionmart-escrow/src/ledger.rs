//! Token ledger: authoritative `(owner, token) -> quantity` mapping.
//!
//! Balances never go negative and every move is conserved: only
//! [`Ledger::mint`] changes a token's total supply. All mutations are
//! atomic: either the whole operation (or batch) succeeds or the ledger is
//! unchanged.

use std::collections::HashMap;

use editionmart_types::{Address, MarketError, Result, TokenId};

/// One conserved movement of token units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenMove {
    pub from: Address,
    pub to: Address,
    pub token_id: TokenId,
    pub value: u64,
}

/// Per-(owner, token) balances plus per-token supply.
#[derive(Debug, Default)]
pub struct Ledger {
    balances: HashMap<(Address, TokenId), u64>,
    supply: HashMap<TokenId, u64>,
}

impl Ledger {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Units of `token_id` held by `owner`.
    #[must_use]
    pub fn balance_of(&self, owner: Address, token_id: TokenId) -> u64 {
        self.balances.get(&(owner, token_id)).copied().unwrap_or(0)
    }

    /// Total units of `token_id` in existence.
    #[must_use]
    pub fn total_supply(&self, token_id: TokenId) -> u64 {
        self.supply.get(&token_id).copied().unwrap_or(0)
    }

    /// Create new units. The move's `from` is the zero address.
    ///
    /// # Errors
    /// `Unauthorized` for the zero recipient, `InvalidQuantity` for zero,
    /// `ArithmeticOverflow` if supply would overflow.
    pub fn mint(&mut self, to: Address, token_id: TokenId, value: u64) -> Result<TokenMove> {
        // A move out of the zero address reads as a mint on replay.
        if to.is_zero() {
            return Err(MarketError::Unauthorized(to));
        }
        if value == 0 {
            return Err(MarketError::InvalidQuantity {
                reason: "mint of zero units".into(),
            });
        }
        let supply = self
            .total_supply(token_id)
            .checked_add(value)
            .ok_or_else(|| MarketError::overflow("token supply"))?;
        let balance = self
            .balance_of(to, token_id)
            .checked_add(value)
            .ok_or_else(|| MarketError::overflow("token balance"))?;

        self.supply.insert(token_id, supply);
        self.balances.insert((to, token_id), balance);
        Ok(TokenMove {
            from: Address::ZERO,
            to,
            token_id,
            value,
        })
    }

    /// Move `value` units from `from` to `to`.
    ///
    /// # Errors
    /// `InsufficientBalance` if `from` holds fewer than `value` units.
    pub fn transfer(
        &mut self,
        from: Address,
        to: Address,
        token_id: TokenId,
        value: u64,
    ) -> Result<TokenMove> {
        let mv = TokenMove {
            from,
            to,
            token_id,
            value,
        };
        self.apply_batch(&[mv])?;
        Ok(mv)
    }

    /// Apply several moves atomically.
    ///
    /// Every resulting balance is computed on a staging map first; the
    /// ledger is only written once the whole batch is known to be valid.
    ///
    /// # Errors
    /// `InsufficientBalance` or `ArithmeticOverflow`; the ledger is unchanged.
    pub fn apply_batch(&mut self, moves: &[TokenMove]) -> Result<()> {
        let mut staged: HashMap<(Address, TokenId), u64> = HashMap::new();

        for mv in moves {
            let from_key = (mv.from, mv.token_id);
            let available = staged
                .get(&from_key)
                .copied()
                .unwrap_or_else(|| self.balance_of(mv.from, mv.token_id));
            if available < mv.value {
                return Err(MarketError::InsufficientBalance {
                    needed: mv.value,
                    available,
                });
            }
            staged.insert(from_key, available - mv.value);

            let to_key = (mv.to, mv.token_id);
            let current = staged
                .get(&to_key)
                .copied()
                .unwrap_or_else(|| self.balance_of(mv.to, mv.token_id));
            let credited = current
                .checked_add(mv.value)
                .ok_or_else(|| MarketError::overflow("token balance"))?;
            staged.insert(to_key, credited);
        }

        self.balances.extend(staged);
        Ok(())
    }

    /// Sum of all balances of a token. Must always equal `total_supply`.
    #[must_use]
    pub fn sum_of_balances(&self, token_id: TokenId) -> u128 {
        self.balances
            .iter()
            .filter(|((_, t), _)| *t == token_id)
            .map(|(_, qty)| u128::from(*qty))
            .sum()
    }

    /// Every token id that has ever been minted.
    #[must_use]
    pub fn tokens(&self) -> Vec<TokenId> {
        let mut ids: Vec<TokenId> = self.supply.keys().copied().collect();
        ids.sort();
        ids
    }
}
