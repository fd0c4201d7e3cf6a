//! In-memory balance ledger.
//!
//! Tracks per-(user, currency) balances. Debits burn and credits mint; every
//! mutation is recorded in a [`SupplyConservation`] tracker so callers can
//! verify that no balance appeared or vanished outside those two paths.
//! All mutations are atomic: either the full operation succeeds or the
//! balance is unchanged.

use std::collections::HashMap;

use synthex_types::{BalanceLedger, CurrencyKey, Fixed18, Result, SynthexError, UserId};

use crate::supply_conservation::SupplyConservation;

/// Balance ledger backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct BalanceBook {
    balances: HashMap<(UserId, CurrencyKey), Fixed18>,
    supply: SupplyConservation,
}

impl BalanceBook {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue funds to a user from outside the exchange (e.g. collateral minting).
    pub fn deposit(&mut self, user: UserId, currency: &CurrencyKey, amount: Fixed18) -> Result<()> {
        self.credit(user, currency, amount)
    }

    /// Remove funds from a user to outside the exchange.
    pub fn withdraw(&mut self, user: UserId, currency: &CurrencyKey, amount: Fixed18) -> Result<()> {
        self.debit(user, currency, amount)
    }

    /// Move funds between two users. Supply is unchanged.
    ///
    /// # Errors
    /// `InsufficientBalance` if `from` holds less than `amount`.
    pub fn transfer(
        &mut self,
        from: UserId,
        to: UserId,
        currency: &CurrencyKey,
        amount: Fixed18,
    ) -> Result<()> {
        let available = self.balance_of(from, currency);
        if available < amount {
            return Err(SynthexError::InsufficientBalance {
                currency: currency.clone(),
                needed: amount,
                available,
            });
        }
        let to_balance = self.balance_of(to, currency).checked_add(amount)?;
        if from != to {
            self.balances
                .insert((from, currency.clone()), available.saturating_sub(amount));
            self.balances.insert((to, currency.clone()), to_balance);
        }
        Ok(())
    }

    /// Total supply of a currency (sum of all users' balances).
    pub fn total_supply(&self, currency: &CurrencyKey) -> Result<Fixed18> {
        self.balances
            .iter()
            .filter(|((_, c), _)| c == currency)
            .try_fold(Fixed18::ZERO, |acc, (_, amount)| acc.checked_add(*amount))
    }

    /// Verify minted - burned == circulating for one currency.
    pub fn verify_supply(&self, currency: &CurrencyKey) -> Result<()> {
        self.supply.verify(currency, self.total_supply(currency)?)
    }

    /// Verify the supply invariant for every currency ever touched.
    pub fn verify_all_supply(&self) -> Result<()> {
        for currency in self.supply.tracked_currencies() {
            self.verify_supply(&currency)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn supply(&self) -> &SupplyConservation {
        &self.supply
    }
}

impl BalanceLedger for BalanceBook {
    fn balance_of(&self, user: UserId, currency: &CurrencyKey) -> Fixed18 {
        self.balances
            .get(&(user, currency.clone()))
            .copied()
            .unwrap_or_default()
    }

    fn debit(&mut self, user: UserId, currency: &CurrencyKey, amount: Fixed18) -> Result<()> {
        let available = self.balance_of(user, currency);
        if available < amount {
            return Err(SynthexError::InsufficientBalance {
                currency: currency.clone(),
                needed: amount,
                available,
            });
        }
        self.supply.record_burn(currency, amount)?;
        self.balances
            .insert((user, currency.clone()), available.saturating_sub(amount));
        Ok(())
    }

    fn credit(&mut self, user: UserId, currency: &CurrencyKey, amount: Fixed18) -> Result<()> {
        let updated = self.balance_of(user, currency).checked_add(amount)?;
        self.supply.record_mint(currency, amount)?;
        self.balances.insert((user, currency.clone()), updated);
        Ok(())
    }
}
