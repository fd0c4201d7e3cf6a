//! Exchange fee policy.
//!
//! The effective fee rate for a trade depends on how the two currencies are
//! priced relative to their underlying asset:
//!
//! | source \ dest | Stable | Long      | Inverse   |
//! |---------------|--------|-----------|-----------|
//! | Stable        | base   | base      | base      |
//! | Long          | base   | base      | 2 × base  |
//! | Inverse       | base   | 2 × base  | base      |

use std::sync::Arc;

use synthex_types::{CurrencyClass, CurrencyClassifier, CurrencyKey, FeeConfig, Fixed18, Result};

/// Computes effective fee rates from the configured base rate and the
/// currency classification.
#[derive(Clone)]
pub struct FeePolicy {
    fees: Arc<dyn FeeConfig>,
    classifier: Arc<dyn CurrencyClassifier>,
}

impl FeePolicy {
    #[must_use]
    pub fn new(fees: Arc<dyn FeeConfig>, classifier: Arc<dyn CurrencyClassifier>) -> Self {
        Self { fees, classifier }
    }

    /// The configured base exchange fee rate.
    #[must_use]
    pub fn base_rate(&self) -> Fixed18 {
        self.fees.base_exchange_fee_rate()
    }

    /// Effective fee rate for exchanging `source` into `dest`.
    ///
    /// # Errors
    /// `UnknownCurrency` if either side is not classified.
    pub fn fee_rate_for_exchange(&self, source: &CurrencyKey, dest: &CurrencyKey) -> Result<Fixed18> {
        let base = self.base_rate();
        let source_class = self.classifier.classify(source)?;
        let dest_class = self.classifier.classify(dest)?;
        if is_inverse_long_pair(source_class, dest_class) {
            base.checked_add(base)
        } else {
            Ok(base)
        }
    }

    /// Split `amount` into `(amount_after_fee, fee)` at `rate`.
    ///
    /// The net amount is truncated, so the fee absorbs the rounding dust and
    /// the two parts always sum back to `amount`.
    ///
    /// # Errors
    /// `InvalidAmount` if `rate` exceeds one.
    pub fn fee_for_amount(amount: Fixed18, rate: Fixed18) -> Result<(Fixed18, Fixed18)> {
        let after = amount.mul_trunc(rate.complement()?)?;
        Ok((after, amount.saturating_sub(after)))
    }
}

/// Whether one side is inverse-priced and the other is a long synth.
#[must_use]
pub fn is_inverse_long_pair(a: CurrencyClass, b: CurrencyClass) -> bool {
    matches!(
        (a, b),
        (CurrencyClass::Inverse, CurrencyClass::Long) | (CurrencyClass::Long, CurrencyClass::Inverse)
    )
}
