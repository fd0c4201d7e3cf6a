//! Supply conservation invariant checker.
//!
//! Invariant checked after every exchange and settlement:
//! ```text
//! ∀ currency: Σ(balances) == Σ(minted) - Σ(burned)
//! ```
//!
//! Exchanges burn source and mint destination; settlements burn reclaims and
//! mint rebates. Balances must never appear or vanish outside those paths.

use std::collections::{HashMap, HashSet};

use synthex_types::{CurrencyKey, Fixed18, Result, SynthexError};

/// Tracks per-currency mint/burn totals.
#[derive(Debug, Default)]
pub struct SupplyConservation {
    minted: HashMap<CurrencyKey, Fixed18>,
    burned: HashMap<CurrencyKey, Fixed18>,
}

impl SupplyConservation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record newly issued supply.
    pub fn record_mint(&mut self, currency: &CurrencyKey, amount: Fixed18) -> Result<()> {
        let total = self.minted.entry(currency.clone()).or_default();
        *total = total.checked_add(amount)?;
        Ok(())
    }

    /// Record destroyed supply.
    pub fn record_burn(&mut self, currency: &CurrencyKey, amount: Fixed18) -> Result<()> {
        let total = self.burned.entry(currency.clone()).or_default();
        *total = total.checked_add(amount)?;
        Ok(())
    }

    #[must_use]
    pub fn total_minted(&self, currency: &CurrencyKey) -> Fixed18 {
        self.minted.get(currency).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn total_burned(&self, currency: &CurrencyKey) -> Fixed18 {
        self.burned.get(currency).copied().unwrap_or_default()
    }

    /// Expected circulating supply: minted - burned.
    ///
    /// # Errors
    /// `SupplyInvariantViolation` if more was burned than minted.
    pub fn expected_supply(&self, currency: &CurrencyKey) -> Result<Fixed18> {
        self.total_minted(currency)
            .checked_sub(self.total_burned(currency))
            .map_err(|_| {
                SynthexError::SupplyInvariantViolation {
                    reason: format!(
                        "{currency}: burned {} exceeds minted {}",
                        self.total_burned(currency),
                        self.total_minted(currency)
                    ),
                }
            })
    }

    /// Verify that the actual supply matches minted - burned.
    pub fn verify(&self, currency: &CurrencyKey, actual_supply: Fixed18) -> Result<()> {
        let expected = self.expected_supply(currency)?;
        if actual_supply != expected {
            return Err(SynthexError::SupplyInvariantViolation {
                reason: format!(
                    "{currency}: actual supply {actual_supply} != expected {expected} \
                     (minted={}, burned={})",
                    self.total_minted(currency),
                    self.total_burned(currency),
                ),
            });
        }
        Ok(())
    }

    /// All currencies that have ever been minted or burned.
    #[must_use]
    pub fn tracked_currencies(&self) -> Vec<CurrencyKey> {
        let mut keys: HashSet<CurrencyKey> = self.minted.keys().cloned().collect();
        keys.extend(self.burned.keys().cloned());
        let mut keys: Vec<_> = keys.into_iter().collect();
        keys.sort();
        keys
    }
}
