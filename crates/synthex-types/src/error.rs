//! Error types for the Synthex exchange engine.
//!
//! All errors use the `SX_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Exchange request errors
//! - 2xx: Balance errors
//! - 3xx: Oracle / currency errors
//! - 4xx: Authorization errors
//! - 5xx: Arithmetic errors
//! - 6xx: Settlement bookkeeping errors
//! - 9xx: General / configuration errors

use thiserror::Error;

use crate::{CurrencyKey, Fixed18, UserId};

/// Central error enum for all Synthex operations.
///
/// Every error aborts the triggering operation as a whole: no entry is ever
/// half-written and no book is ever partially cleared.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SynthexError {
    // =================================================================
    // Exchange Errors (1xx)
    // =================================================================
    /// The trading gate is closed.
    #[error("SX_ERR_100: Exchange is disabled")]
    ExchangeDisabled,

    /// A trade was requested for a zero source amount.
    #[error("SX_ERR_101: Exchange amount must be greater than zero")]
    ZeroAmount,

    /// Source and destination currency are the same.
    #[error("SX_ERR_102: Cannot exchange {0} into itself")]
    SameCurrency(CurrencyKey),

    // =================================================================
    // Balance Errors (2xx)
    // =================================================================
    /// A debit would underflow the user's balance.
    #[error("SX_ERR_200: Insufficient balance of {currency}: need {needed}, have {available}")]
    InsufficientBalance {
        currency: CurrencyKey,
        needed: Fixed18,
        available: Fixed18,
    },

    // =================================================================
    // Oracle / Currency Errors (3xx)
    // =================================================================
    /// The oracle price for a required currency is too old.
    #[error("SX_ERR_300: Rate for {0} is stale")]
    StaleRate(CurrencyKey),

    /// The currency is not known to the oracle or classification registry.
    #[error("SX_ERR_301: Unknown currency: {0}")]
    UnknownCurrency(CurrencyKey),

    /// The oracle reported a zero price, which cannot be divided by.
    #[error("SX_ERR_302: Rate for {0} is zero")]
    ZeroRate(CurrencyKey),

    // =================================================================
    // Authorization Errors (4xx)
    // =================================================================
    /// A restricted setter was invoked by someone other than the admin.
    #[error("SX_ERR_400: Caller {0} is not authorized")]
    Unauthorized(UserId),

    // =================================================================
    // Arithmetic Errors (5xx)
    // =================================================================
    /// A fixed-point operation exceeded the representable range.
    #[error("SX_ERR_500: Arithmetic overflow in {op}")]
    ArithmeticOverflow { op: &'static str },

    /// A textual or decimal amount could not be represented.
    #[error("SX_ERR_501: Invalid amount: {reason}")]
    InvalidAmount { reason: String },

    /// Fixed-point division by zero.
    #[error("SX_ERR_502: Division by zero")]
    DivisionByZero,

    // =================================================================
    // Settlement Bookkeeping Errors (6xx)
    // =================================================================
    /// An entry was pushed onto a book keyed by a different (user, currency).
    #[error("SX_ERR_600: Entry for {user}/{currency} does not belong to this book")]
    BookMismatch { user: UserId, currency: CurrencyKey },

    /// Circulating supply no longer equals minted minus burned.
    #[error("SX_ERR_601: Supply invariant violation: {reason}")]
    SupplyInvariantViolation { reason: String },

    // =================================================================
    // General (9xx)
    // =================================================================
    /// A currency key failed validation.
    #[error("SX_ERR_900: Invalid currency key: {reason}")]
    InvalidCurrencyKey { reason: String },

    /// Configuration error.
    #[error("SX_ERR_901: Configuration error: {0}")]
    Configuration(String),
}

impl SynthexError {
    /// Short machine-readable code, e.g. `"SX_ERR_300"`.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ExchangeDisabled => "SX_ERR_100",
            Self::ZeroAmount => "SX_ERR_101",
            Self::SameCurrency(_) => "SX_ERR_102",
            Self::InsufficientBalance { .. } => "SX_ERR_200",
            Self::StaleRate(_) => "SX_ERR_300",
            Self::UnknownCurrency(_) => "SX_ERR_301",
            Self::ZeroRate(_) => "SX_ERR_302",
            Self::Unauthorized(_) => "SX_ERR_400",
            Self::ArithmeticOverflow { .. } => "SX_ERR_500",
            Self::InvalidAmount { .. } => "SX_ERR_501",
            Self::DivisionByZero => "SX_ERR_502",
            Self::BookMismatch { .. } => "SX_ERR_600",
            Self::SupplyInvariantViolation { .. } => "SX_ERR_601",
            Self::InvalidCurrencyKey { .. } => "SX_ERR_900",
            Self::Configuration(_) => "SX_ERR_901",
        }
    }

    /// Whether re-submitting the same request later may succeed without any
    /// change on the caller's side (e.g. once the oracle updates).
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StaleRate(_) | Self::ExchangeDisabled)
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, SynthexError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = SynthexError::StaleRate(CurrencyKey::new("sETH").unwrap());
        let msg = format!("{err}");
        assert!(msg.starts_with("SX_ERR_300"), "Got: {msg}");
        assert!(msg.contains("sETH"));
    }

    #[test]
    fn insufficient_balance_display() {
        let err = SynthexError::InsufficientBalance {
            currency: CurrencyKey::new("sUSD").unwrap(),
            needed: Fixed18::from_int(100),
            available: Fixed18::from_int(50),
        };
        let msg = format!("{err}");
        assert!(msg.contains("SX_ERR_200"));
        assert!(msg.contains("100"));
        assert!(msg.contains("50"));
    }

    #[test]
    fn code_matches_display_prefix() {
        let errors = vec![
            SynthexError::ExchangeDisabled,
            SynthexError::ZeroAmount,
            SynthexError::Unauthorized(UserId::new()),
            SynthexError::ArithmeticOverflow { op: "mul" },
            SynthexError::DivisionByZero,
            SynthexError::Configuration("bad".into()),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with(err.code()),
                "code {} does not prefix message {msg}",
                err.code()
            );
        }
    }

    #[test]
    fn only_stale_and_disabled_are_transient() {
        assert!(SynthexError::StaleRate(CurrencyKey::new("sBTC").unwrap()).is_transient());
        assert!(SynthexError::ExchangeDisabled.is_transient());
        assert!(!SynthexError::ZeroAmount.is_transient());
        assert!(!SynthexError::DivisionByZero.is_transient());
    }
}
