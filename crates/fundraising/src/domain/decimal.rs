//! Fixed-point decimal with 18 fractional digits.
//!
//! Prices and vesting weights are carried as scaled integers so that every
//! replica computes bit-identical results. Multiplications and divisions go
//! through a 256-bit intermediate and never touch floating point.

use primitive_types::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of fractional digits.
pub const DEC_PRECISION: u32 = 18;

const ONE_RAW: u128 = 1_000_000_000_000_000_000;

/// Non-negative fixed-point number (`raw / 10^18`).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Dec(u128);

/// Failure to parse a decimal string.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DecParseError {
    #[error("empty decimal string")]
    Empty,
    #[error("invalid decimal string: {0}")]
    Invalid(String),
    #[error("too many fractional digits: {0} > 18")]
    TooPrecise(usize),
    #[error("decimal out of range")]
    Overflow,
}

impl Dec {
    pub const ZERO: Dec = Dec(0);
    pub const ONE: Dec = Dec(ONE_RAW);

    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u128 {
        self.0
    }

    /// Whole number `n`, or `None` if it does not fit.
    pub fn from_int(n: u128) -> Option<Self> {
        n.checked_mul(ONE_RAW).map(Self)
    }

    /// `numerator / denominator`, truncated.
    pub fn from_ratio(numerator: u128, denominator: u128) -> Option<Self> {
        if denominator == 0 {
            return None;
        }
        let raw = U256::from(numerator) * U256::from(ONE_RAW) / U256::from(denominator);
        narrow(raw).map(Self)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Dec) -> Option<Dec> {
        self.0.checked_add(other.0).map(Dec)
    }

    pub fn checked_sub(self, other: Dec) -> Option<Dec> {
        self.0.checked_sub(other.0).map(Dec)
    }

    /// `floor(amount * self)`.
    pub fn mul_floor(self, amount: u128) -> Option<u128> {
        narrow(U256::from(amount) * U256::from(self.0) / U256::from(ONE_RAW))
    }

    /// `ceil(amount * self)`.
    pub fn mul_ceil(self, amount: u128) -> Option<u128> {
        let product = U256::from(amount) * U256::from(self.0);
        let one = U256::from(ONE_RAW);
        narrow((product + one - U256::one()) / one)
    }

    /// `floor(amount / self)`; `None` when `self` is zero.
    pub fn quo_floor(self, amount: u128) -> Option<u128> {
        if self.is_zero() {
            return None;
        }
        narrow(U256::from(amount) * U256::from(ONE_RAW) / U256::from(self.0))
    }
}

fn narrow(value: U256) -> Option<u128> {
    if value > U256::from(u128::MAX) {
        None
    } else {
        Some(value.low_u128())
    }
}

impl FromStr for Dec {
    type Err = DecParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DecParseError::Empty);
        }

        let (int_part, frac_part) = match s.split_once('.') {
            Some((i, f)) => (i, f),
            None => (s, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(DecParseError::Invalid(s.to_string()));
        }
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if !all_digits(int_part) || !all_digits(frac_part) {
            return Err(DecParseError::Invalid(s.to_string()));
        }
        if frac_part.len() > DEC_PRECISION as usize {
            return Err(DecParseError::TooPrecise(frac_part.len()));
        }

        let int_value: u128 = if int_part.is_empty() {
            0
        } else {
            int_part.parse().map_err(|_| DecParseError::Overflow)?
        };
        let mut frac_value: u128 = if frac_part.is_empty() {
            0
        } else {
            frac_part.parse().map_err(|_| DecParseError::Overflow)?
        };
        frac_value *= 10u128.pow(DEC_PRECISION - frac_part.len() as u32);

        int_value
            .checked_mul(ONE_RAW)
            .and_then(|v| v.checked_add(frac_value))
            .map(Dec)
            .ok_or(DecParseError::Overflow)
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:018}", self.0 / ONE_RAW, self.0 % ONE_RAW)
    }
}
