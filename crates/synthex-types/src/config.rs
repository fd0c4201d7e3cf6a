//! Engine configuration.
//!
//! The trading gate and waiting period are held by the engine instance and
//! only mutated through admin-checked setters. They are not snapshotted per
//! entry: a changed waiting period applies to in-flight books immediately.

use serde::{Deserialize, Serialize};

use crate::{CurrencyKey, Result, SynthexError, UserId, constants};

/// Configuration for one exchange engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// The only caller allowed to change this configuration.
    pub admin: UserId,
    /// Trading gate; when false every exchange fails.
    pub exchange_enabled: bool,
    /// Seconds after a trade during which its outcome may be reclaimed/rebated.
    pub waiting_period_secs: u64,
    /// The stable unit all rates are quoted against.
    pub stable_currency: CurrencyKey,
    /// Account credited with exchange fees (in the stable unit).
    pub fee_pool: UserId,
}

impl ExchangeConfig {
    /// Default configuration administered by `admin`, with a fresh fee pool account.
    ///
    /// # Panics
    /// Never: the default stable currency key is valid.
    #[must_use]
    pub fn new(admin: UserId) -> Self {
        Self {
            admin,
            exchange_enabled: true,
            waiting_period_secs: constants::DEFAULT_WAITING_PERIOD_SECS,
            stable_currency: CurrencyKey::new(constants::DEFAULT_STABLE_CURRENCY)
                .expect("default stable currency is a valid key"),
            fee_pool: UserId::new(),
        }
    }

    #[must_use]
    pub fn with_waiting_period_secs(mut self, secs: u64) -> Self {
        self.waiting_period_secs = secs;
        self
    }

    #[must_use]
    pub fn with_exchange_enabled(mut self, enabled: bool) -> Self {
        self.exchange_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_stable_currency(mut self, currency: CurrencyKey) -> Self {
        self.stable_currency = currency;
        self
    }

    #[must_use]
    pub fn with_fee_pool(mut self, fee_pool: UserId) -> Self {
        self.fee_pool = fee_pool;
        self
    }

    /// Check that `caller` may mutate this configuration.
    ///
    /// # Errors
    /// Returns `Unauthorized` for anyone but the admin.
    pub fn authorize(&self, caller: UserId) -> Result<()> {
        if caller == self.admin {
            Ok(())
        } else {
            Err(SynthexError::Unauthorized(caller))
        }
    }

    /// Sanity-check the configuration.
    ///
    /// # Errors
    /// Returns `Configuration` if the fee pool is the admin account.
    pub fn validate(&self) -> Result<()> {
        if self.fee_pool == self.admin {
            return Err(SynthexError::Configuration(
                "fee pool must not be the admin account".to_string(),
            ));
        }
        Ok(())
    }
}
