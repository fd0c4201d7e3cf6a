//! System-wide constants for the Synthex exchange engine.

/// Number of fractional decimal digits carried by every amount and rate.
pub const FIXED_DECIMALS: u32 = 18;

/// `10^FIXED_DECIMALS`: the raw representation of one whole unit.
pub const FIXED_SCALE: u128 = 1_000_000_000_000_000_000;

/// Default waiting period after an exchange, in seconds.
pub const DEFAULT_WAITING_PERIOD_SECS: u64 = 180;

/// Default base exchange fee rate, as a raw [`crate::Fixed18`] (0.3%).
pub const DEFAULT_EXCHANGE_FEE_RATE_RAW: u128 = 3_000_000_000_000_000;

/// Default age after which an oracle price is considered stale.
pub const DEFAULT_RATE_STALE_PERIOD_SECS: u64 = 3600;

/// Default stable unit that all rates are quoted against.
pub const DEFAULT_STABLE_CURRENCY: &str = "sUSD";

/// Maximum length of a currency key, in bytes.
pub const MAX_CURRENCY_KEY_LEN: usize = 32;

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "Synthex";
