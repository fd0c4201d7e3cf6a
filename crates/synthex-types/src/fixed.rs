//! Fixed-point decimal arithmetic scaled by 10^18.
//!
//! Every amount and rate handled by the engine is a [`Fixed18`]: an unsigned
//! count of 10^-18 units stored in a `u128`. Multiplication and division
//! truncate toward zero. Intermediate products are decomposed so that they
//! never wrap; a result that does not fit is reported as
//! [`SynthexError::ArithmeticOverflow`] instead.
//!
//! ```text
//! mul_trunc(a, b) = floor(a * b / 10^18)
//! div_trunc(a, b) = floor(a * 10^18 / b)
//! ```

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::constants::{FIXED_DECIMALS, FIXED_SCALE};
use crate::{Result, SynthexError};

/// Unsigned fixed-point number with 18 fractional digits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fixed18(u128);

impl Fixed18 {
    pub const ZERO: Self = Self(0);
    pub const ONE: Self = Self(FIXED_SCALE);
    pub const MAX: Self = Self(u128::MAX);

    /// Wrap a raw count of 10^-18 units.
    #[must_use]
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// The raw count of 10^-18 units.
    #[must_use]
    pub const fn raw(self) -> u128 {
        self.0
    }

    /// A whole number of units.
    #[must_use]
    pub fn from_int(units: u64) -> Self {
        // u64::MAX * 10^18 < u128::MAX
        Self(u128::from(units) * FIXED_SCALE)
    }

    /// Convert an exact decimal. Fails on negative values and on values with
    /// more than 18 significant fractional digits.
    pub fn from_decimal(value: Decimal) -> Result<Self> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(SynthexError::InvalidAmount {
                reason: format!("{value} is negative"),
            });
        }
        let value = value.normalize();
        let scale = value.scale();
        if scale > FIXED_DECIMALS {
            return Err(SynthexError::InvalidAmount {
                reason: format!("{value} has more than {FIXED_DECIMALS} fractional digits"),
            });
        }
        let mantissa = value.mantissa().unsigned_abs();
        let factor = 10u128.pow(FIXED_DECIMALS - scale);
        mantissa
            .checked_mul(factor)
            .map(Self)
            .ok_or(SynthexError::ArithmeticOverflow { op: "from_decimal" })
    }

    /// Whether this value is exactly zero.
    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, rhs: Self) -> Result<Self> {
        self.0
            .checked_add(rhs.0)
            .map(Self)
            .ok_or(SynthexError::ArithmeticOverflow { op: "add" })
    }

    pub fn checked_sub(self, rhs: Self) -> Result<Self> {
        self.0
            .checked_sub(rhs.0)
            .map(Self)
            .ok_or(SynthexError::ArithmeticOverflow { op: "sub" })
    }

    #[must_use]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    #[must_use]
    pub const fn abs_diff(self, rhs: Self) -> Self {
        Self(self.0.abs_diff(rhs.0))
    }

    /// `floor(self * rhs / 10^18)`.
    pub fn mul_trunc(self, rhs: Self) -> Result<Self> {
        // a * b / S = a_int * b + a_frac * b_int + floor(a_frac * b_frac / S)
        let overflow = SynthexError::ArithmeticOverflow { op: "mul" };
        let (a_int, a_frac) = (self.0 / FIXED_SCALE, self.0 % FIXED_SCALE);
        let (b_int, b_frac) = (rhs.0 / FIXED_SCALE, rhs.0 % FIXED_SCALE);

        let whole = a_int.checked_mul(rhs.0).ok_or(overflow.clone())?;
        let cross = a_frac.checked_mul(b_int).ok_or(overflow.clone())?;
        // Both fractions are < 10^18 so their product is < 10^36.
        let low = a_frac * b_frac / FIXED_SCALE;

        whole
            .checked_add(cross)
            .and_then(|v| v.checked_add(low))
            .map(Self)
            .ok_or(overflow)
    }

    /// `floor(self * 10^18 / rhs)`.
    pub fn div_trunc(self, rhs: Self) -> Result<Self> {
        if rhs.is_zero() {
            return Err(SynthexError::DivisionByZero);
        }
        // a * S / b = (a / b) * S + floor((a % b) * S / b)
        let quotient = self.0 / rhs.0;
        let frac = scaled_fraction(self.0 % rhs.0, rhs.0);

        quotient
            .checked_mul(FIXED_SCALE)
            .and_then(|v| v.checked_add(frac))
            .map(Self)
            .ok_or(SynthexError::ArithmeticOverflow { op: "div" })
    }

    /// `1 - self`; fails if `self` exceeds one.
    pub fn complement(self) -> Result<Self> {
        Self::ONE
            .checked_sub(self)
            .map_err(|_| SynthexError::InvalidAmount {
                reason: format!("{self} is greater than one"),
            })
    }
}

/// `floor(remainder * 10^18 / divisor)` for `remainder < divisor`.
///
/// The 256-bit product is divided bit by bit, so any `u128` divisor works.
/// The result is below 10^18.
fn scaled_fraction(remainder: u128, divisor: u128) -> u128 {
    const LOW_MASK: u128 = (1 << 64) - 1;
    // 10^18 < 2^64, so both partial products fit in 124 bits.
    let lo_part = (remainder & LOW_MASK) * FIXED_SCALE;
    let hi_part = (remainder >> 64) * FIXED_SCALE;
    let (lo, carry) = lo_part.overflowing_add(hi_part << 64);
    let hi = (hi_part >> 64) + u128::from(carry);

    let mut rem: u128 = 0;
    let mut quotient: u128 = 0;
    for bit_index in (0..256u32).rev() {
        let bit = if bit_index >= 128 {
            (hi >> (bit_index - 128)) & 1
        } else {
            (lo >> bit_index) & 1
        };
        // rem < divisor, so a shifted-out top bit means rem * 2 >= divisor.
        let top = rem >> 127;
        rem = (rem << 1) | bit;
        quotient <<= 1;
        if top == 1 || rem >= divisor {
            rem = rem.wrapping_sub(divisor);
            quotient |= 1;
        }
    }
    quotient
}

impl fmt::Display for Fixed18 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / FIXED_SCALE;
        let frac = self.0 % FIXED_SCALE;
        if frac == 0 {
            return write!(f, "{whole}");
        }
        let digits = format!("{frac:018}");
        write!(f, "{whole}.{}", digits.trim_end_matches('0'))
    }
}

impl FromStr for Fixed18 {
    type Err = SynthexError;

    fn from_str(s: &str) -> Result<Self> {
        let value = Decimal::from_str_exact(s.trim()).map_err(|e| SynthexError::InvalidAmount {
            reason: format!("{s:?}: {e}"),
        })?;
        Self::from_decimal(value)
    }
}

impl TryFrom<Decimal> for Fixed18 {
    type Error = SynthexError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::from_decimal(value)
    }
}

// Serialized as a decimal string so that JSON consumers never lose precision.
impl Serialize for Fixed18 {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Fixed18 {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
