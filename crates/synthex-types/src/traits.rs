//! Collaborator interfaces consumed by the exchange engine.
//!
//! The engine never looks collaborators up by name: it holds these traits
//! directly. In-memory implementations live in `synthex-ledger`.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CurrencyKey, Fixed18, Result, UserId};

/// How a currency's price relates to its underlying asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurrencyClass {
    /// The base stable unit all rates are quoted against.
    Stable,
    /// Price moves with the underlying asset.
    Long,
    /// Price moves opposite to the underlying asset.
    Inverse,
}

impl fmt::Display for CurrencyClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stable => write!(f, "STABLE"),
            Self::Long => write!(f, "LONG"),
            Self::Inverse => write!(f, "INVERSE"),
        }
    }
}

/// A price observation from the oracle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateReading {
    /// Price in stable-unit terms.
    pub price: Fixed18,
    /// Whether the oracle considers this price too old to trade on.
    pub is_stale: bool,
}

/// Price lookup.
pub trait PriceOracle: Send + Sync {
    /// Current price of `currency`.
    ///
    /// # Errors
    /// `UnknownCurrency` if the oracle has never priced `currency`.
    fn rate(&self, currency: &CurrencyKey) -> Result<RateReading>;
}

/// Currency classification lookup.
pub trait CurrencyClassifier: Send + Sync {
    /// # Errors
    /// `UnknownCurrency` if `currency` is not registered.
    fn classify(&self, currency: &CurrencyKey) -> Result<CurrencyClass>;

    fn is_inverse(&self, currency: &CurrencyKey) -> Result<bool> {
        Ok(self.classify(currency)? == CurrencyClass::Inverse)
    }

    fn is_stable(&self, currency: &CurrencyKey) -> Result<bool> {
        Ok(self.classify(currency)? == CurrencyClass::Stable)
    }
}

/// Source of the configured base exchange fee rate.
pub trait FeeConfig: Send + Sync {
    fn base_exchange_fee_rate(&self) -> Fixed18;
}

/// The balance ledger that actually holds currency.
pub trait BalanceLedger {
    fn balance_of(&self, user: UserId, currency: &CurrencyKey) -> Fixed18;

    /// Remove `amount` from the user's balance (burn).
    ///
    /// # Errors
    /// `InsufficientBalance` if the balance is lower than `amount`; the
    /// balance is left unchanged.
    fn debit(&mut self, user: UserId, currency: &CurrencyKey, amount: Fixed18) -> Result<()>;

    /// Add `amount` to the user's balance (mint).
    ///
    /// # Errors
    /// `ArithmeticOverflow` if the balance would exceed the representable range.
    fn credit(&mut self, user: UserId, currency: &CurrencyKey, amount: Fixed18) -> Result<()>;
}

/// Wall-clock source, in whole seconds since the UNIX epoch.
pub trait Clock: Send + Sync {
    fn now(&self) -> u64;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SynthexError;

    struct Fixed(CurrencyClass);

    impl CurrencyClassifier for Fixed {
        fn classify(&self, currency: &CurrencyKey) -> Result<CurrencyClass> {
            if currency.as_str() == "nope" {
                return Err(SynthexError::UnknownCurrency(currency.clone()));
            }
            Ok(self.0)
        }
    }

    #[test]
    fn provided_predicates_follow_classify() {
        let key = CurrencyKey::new("iETH").unwrap();
        assert!(Fixed(CurrencyClass::Inverse).is_inverse(&key).unwrap());
        assert!(!Fixed(CurrencyClass::Inverse).is_stable(&key).unwrap());
        assert!(Fixed(CurrencyClass::Stable).is_stable(&key).unwrap());
        assert!(!Fixed(CurrencyClass::Long).is_inverse(&key).unwrap());
    }

    #[test]
    fn predicates_propagate_unknown_currency() {
        let key = CurrencyKey::new("nope").unwrap();
        assert!(matches!(
            Fixed(CurrencyClass::Long).is_inverse(&key),
            Err(SynthexError::UnknownCurrency(_))
        ));
    }

    #[test]
    fn class_display() {
        assert_eq!(CurrencyClass::Inverse.to_string(), "INVERSE");
        assert_eq!(CurrencyClass::Stable.to_string(), "STABLE");
    }
}
