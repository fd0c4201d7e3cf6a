//! Currency classification registry.
//!
//! Maps each synthetic currency to its [`CurrencyClass`]. Registration is
//! admin-only; lookups are open to everyone.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use synthex_types::{CurrencyClass, CurrencyClassifier, CurrencyKey, Result, SynthexError, UserId};
use tracing::info;

pub struct CurrencyRegistry {
    admin: UserId,
    classes: RwLock<HashMap<CurrencyKey, CurrencyClass>>,
}

impl CurrencyRegistry {
    /// Create a registry containing only the stable unit.
    #[must_use]
    pub fn new(admin: UserId, stable_currency: CurrencyKey) -> Self {
        let mut classes = HashMap::new();
        classes.insert(stable_currency, CurrencyClass::Stable);
        Self {
            admin,
            classes: RwLock::new(classes),
        }
    }

    /// Register or reclassify a currency.
    ///
    /// # Errors
    /// `Unauthorized` unless `caller` is the admin.
    pub fn register(&self, caller: UserId, currency: CurrencyKey, class: CurrencyClass) -> Result<()> {
        if caller != self.admin {
            return Err(SynthexError::Unauthorized(caller));
        }
        info!(currency = %currency, class = %class, "Currency registered");
        self.classes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(currency, class);
        Ok(())
    }

    /// Remove a currency.
    pub fn deregister(&self, caller: UserId, currency: &CurrencyKey) -> Result<()> {
        if caller != self.admin {
            return Err(SynthexError::Unauthorized(caller));
        }
        self.classes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(currency);
        Ok(())
    }

    /// Registered currencies, sorted.
    #[must_use]
    pub fn currencies(&self) -> Vec<CurrencyKey> {
        let mut keys: Vec<_> = self
            .classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

impl CurrencyClassifier for CurrencyRegistry {
    fn classify(&self, currency: &CurrencyKey) -> Result<CurrencyClass> {
        self.classes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(currency)
            .copied()
            .ok_or_else(|| SynthexError::UnknownCurrency(currency.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: &str) -> CurrencyKey {
        CurrencyKey::new(code).unwrap()
    }

    #[test]
    fn stable_unit_is_preregistered() {
        let registry = CurrencyRegistry::new(UserId::new(), key("sUSD"));
        assert!(registry.is_stable(&key("sUSD")).unwrap());
    }

    #[test]
    fn register_and_classify() {
        let admin = UserId::new();
        let registry = CurrencyRegistry::new(admin, key("sUSD"));
        registry
            .register(admin, key("iETH"), CurrencyClass::Inverse)
            .unwrap();
        registry
            .register(admin, key("sETH"), CurrencyClass::Long)
            .unwrap();
        assert!(registry.is_inverse(&key("iETH")).unwrap());
        assert_eq!(registry.classify(&key("sETH")).unwrap(), CurrencyClass::Long);
        assert_eq!(
            registry.currencies(),
            vec![key("iETH"), key("sETH"), key("sUSD")]
        );
    }

    #[test]
    fn register_requires_admin() {
        let registry = CurrencyRegistry::new(UserId::new(), key("sUSD"));
        let intruder = UserId::new();
        assert_eq!(
            registry
                .register(intruder, key("sBTC"), CurrencyClass::Long)
                .unwrap_err(),
            SynthexError::Unauthorized(intruder)
        );
    }

    #[test]
    fn unknown_and_deregistered() {
        let admin = UserId::new();
        let registry = CurrencyRegistry::new(admin, key("sUSD"));
        assert!(matches!(
            registry.classify(&key("sBTC")),
            Err(SynthexError::UnknownCurrency(_))
        ));
        registry
            .register(admin, key("sBTC"), CurrencyClass::Long)
            .unwrap();
        registry.deregister(admin, &key("sBTC")).unwrap();
        assert!(registry.classify(&key("sBTC")).is_err());
    }
}
