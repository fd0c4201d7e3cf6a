//! Admin-settable base exchange fee.

use std::sync::{PoisonError, RwLock};

use synthex_types::{FeeConfig, Fixed18, Result, SynthexError, UserId, constants};
use tracing::info;

/// Fee configuration store holding the base exchange fee rate.
pub struct FeeSchedule {
    admin: UserId,
    base_rate: RwLock<Fixed18>,
}

impl FeeSchedule {
    /// Schedule with the default base rate.
    #[must_use]
    pub fn new(admin: UserId) -> Self {
        Self::with_rate(
            admin,
            Fixed18::from_raw(constants::DEFAULT_EXCHANGE_FEE_RATE_RAW),
        )
    }

    #[must_use]
    pub fn with_rate(admin: UserId, base_rate: Fixed18) -> Self {
        Self {
            admin,
            base_rate: RwLock::new(base_rate),
        }
    }

    /// Change the base exchange fee rate.
    ///
    /// # Errors
    /// `Unauthorized` unless `caller` is the admin; `InvalidAmount` if the
    /// rate is 0.5 or more (an inverse/long pair would then charge 100%).
    pub fn set_base_exchange_fee_rate(&self, caller: UserId, rate: Fixed18) -> Result<()> {
        if caller != self.admin {
            return Err(SynthexError::Unauthorized(caller));
        }
        if rate.checked_add(rate)? >= Fixed18::ONE {
            return Err(SynthexError::InvalidAmount {
                reason: format!("base exchange fee rate {rate} must be below 0.5"),
            });
        }
        info!(rate = %rate, "Base exchange fee rate updated");
        *self.base_rate.write().unwrap_or_else(PoisonError::into_inner) = rate;
        Ok(())
    }
}

impl FeeConfig for FeeSchedule {
    fn base_exchange_fee_rate(&self) -> Fixed18 {
        *self.base_rate.read().unwrap_or_else(PoisonError::into_inner)
    }
}
