//! Identifiers used throughout Synthex.
//!
//! Accounts use UUIDv7 for time-ordered sorting. Exchange entries get a
//! deterministic [`EntryId`] derived from their book key and sequence number,
//! so replaying the same trades yields the same identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::MAX_CURRENCY_KEY_LEN;
use crate::{Result, SynthexError};

// ---------------------------------------------------------------------------
// UserId
// ---------------------------------------------------------------------------

/// Unique identifier for a user account (also used for the admin and the fee pool).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    #[must_use]
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CurrencyKey
// ---------------------------------------------------------------------------

/// Opaque symbolic code of a synthetic currency (e.g. `sUSD`, `sETH`, `iETH`).
///
/// Keys are case-sensitive: `sETH` and `SETH` are different currencies.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyKey(String);

impl CurrencyKey {
    /// Validate and wrap a currency code.
    ///
    /// # Errors
    /// Returns `InvalidCurrencyKey` if the code is empty, longer than
    /// [`MAX_CURRENCY_KEY_LEN`] bytes, or contains non-alphanumeric characters.
    pub fn new(code: impl Into<String>) -> Result<Self> {
        let code = code.into();
        if code.is_empty() {
            return Err(SynthexError::InvalidCurrencyKey {
                reason: "empty".to_string(),
            });
        }
        if code.len() > MAX_CURRENCY_KEY_LEN {
            return Err(SynthexError::InvalidCurrencyKey {
                reason: format!("{code:?} exceeds {MAX_CURRENCY_KEY_LEN} bytes"),
            });
        }
        if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(SynthexError::InvalidCurrencyKey {
                reason: format!("{code:?} contains non-alphanumeric characters"),
            });
        }
        Ok(Self(code))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CurrencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CurrencyKey {
    type Error = SynthexError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<CurrencyKey> for String {
    fn from(key: CurrencyKey) -> Self {
        key.0
    }
}

// ---------------------------------------------------------------------------
// EntryId
// ---------------------------------------------------------------------------

/// Identifier of one exchange entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct EntryId(pub Uuid);

impl EntryId {
    /// Deterministic `EntryId` from the book key and the engine-wide entry
    /// sequence number.
    #[must_use]
    pub fn deterministic(user: UserId, dest: &CurrencyKey, sequence: u64) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(b"synthex:entry_id:v1:");
        hasher.update(user.0.as_bytes());
        hasher.update(dest.as_str().as_bytes());
        hasher.update(sequence.to_le_bytes());
        let hash = hasher.finalize();
        let bytes: [u8; 16] = hash[..16].try_into().expect("SHA-256 produces 32 bytes");
        Self(Uuid::from_bytes(bytes))
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entry:{}", self.0)
    }
}
