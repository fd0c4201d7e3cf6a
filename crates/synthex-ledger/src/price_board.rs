//! In-memory price oracle with a staleness window.
//!
//! Every price is stored with the time it was posted. A price older than
//! `stale_after_secs` is reported with `is_stale = true`; the engine, not the
//! board, decides to reject the triggering operation. The stable unit is
//! always priced at exactly one and never goes stale.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use synthex_types::{
    Clock, CurrencyKey, Fixed18, PriceOracle, RateReading, Result, SynthexError, constants,
};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct PostedRate {
    price: Fixed18,
    updated_at: u64,
}

/// Price board shared between the engine and whatever posts prices.
pub struct PriceBoard {
    stable_currency: CurrencyKey,
    rates: RwLock<HashMap<CurrencyKey, PostedRate>>,
    stale_after_secs: u64,
    clock: Arc<dyn Clock>,
}

impl PriceBoard {
    /// Create a board with the default staleness window.
    #[must_use]
    pub fn new(stable_currency: CurrencyKey, clock: Arc<dyn Clock>) -> Self {
        Self::with_stale_period(
            stable_currency,
            clock,
            constants::DEFAULT_RATE_STALE_PERIOD_SECS,
        )
    }

    #[must_use]
    pub fn with_stale_period(
        stable_currency: CurrencyKey,
        clock: Arc<dyn Clock>,
        stale_after_secs: u64,
    ) -> Self {
        Self {
            stable_currency,
            rates: RwLock::new(HashMap::new()),
            stale_after_secs,
            clock,
        }
    }

    /// Post a price at the current clock time.
    ///
    /// # Errors
    /// `ZeroRate` for a zero price; `Configuration` when trying to re-price
    /// the stable unit.
    pub fn set_rate(&self, currency: &CurrencyKey, price: Fixed18) -> Result<()> {
        self.set_rate_at(currency, price, self.clock.now())
    }

    /// Post a price observed at `updated_at`.
    pub fn set_rate_at(&self, currency: &CurrencyKey, price: Fixed18, updated_at: u64) -> Result<()> {
        if *currency == self.stable_currency {
            return Err(SynthexError::Configuration(format!(
                "{currency} is the stable unit and is always priced at 1"
            )));
        }
        if price.is_zero() {
            return Err(SynthexError::ZeroRate(currency.clone()));
        }
        debug!(currency = %currency, price = %price, updated_at, "Rate posted");
        self.rates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(currency.clone(), PostedRate { price, updated_at });
        Ok(())
    }

    /// Forget a currency's price.
    pub fn remove_rate(&self, currency: &CurrencyKey) {
        self.rates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(currency);
    }

    #[must_use]
    pub fn stale_after_secs(&self) -> u64 {
        self.stale_after_secs
    }

    /// Time the price was posted, if any.
    #[must_use]
    pub fn updated_at(&self, currency: &CurrencyKey) -> Option<u64> {
        self.rates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(currency)
            .map(|r| r.updated_at)
    }
}

impl PriceOracle for PriceBoard {
    fn rate(&self, currency: &CurrencyKey) -> Result<RateReading> {
        if *currency == self.stable_currency {
            return Ok(RateReading {
                price: Fixed18::ONE,
                is_stale: false,
            });
        }
        let posted = self
            .rates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(currency)
            .copied()
            .ok_or_else(|| SynthexError::UnknownCurrency(currency.clone()))?;

        let age = self.clock.now().saturating_sub(posted.updated_at);
        Ok(RateReading {
            price: posted.price,
            is_stale: age > self.stale_after_secs,
        })
    }
}
