//! Exact decimal scalar for field values.
//!
//! Amounts are stored as fixed-point micro-units (1_000_000 = 1.0) in an
//! `i128`, so field arithmetic stays exact and reproducible across
//! platforms. Conversion to `f64` happens once, at the geometry boundary,
//! when a state vector is built from field cells.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One whole unit in micro-units.
const MICROS_PER_UNIT: i128 = 1_000_000;

/// Fractional digits carried by the fixed-point representation.
const FRAC_DIGITS: u32 = 6;

// ---------------------------------------------------------------------------
// DecimalValue
// ---------------------------------------------------------------------------

/// An exact decimal in micro-units.
///
/// The inner value counts millionths, so `DecimalValue::from_int(3)` holds
/// `3_000_000` and `"0.5".parse()` holds `500_000`. Ordering and equality
/// are exact integer comparisons.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct DecimalValue(i128);

impl DecimalValue {
    /// Exact zero.
    pub const ZERO: Self = Self(0);

    /// Construct from a whole number of units.
    pub fn from_int(units: i64) -> Self {
        Self(i128::from(units) * MICROS_PER_UNIT)
    }

    /// Construct from a raw micro-unit count.
    pub fn from_micros(micros: i128) -> Self {
        Self(micros)
    }

    /// Construct from a double, rounding to the nearest micro-unit.
    ///
    /// Non-finite inputs collapse to zero (the saturating cast), which is
    /// acceptable here: the only caller is state-vector decoding, where a
    /// non-finite coordinate has already violated every bound law.
    pub fn from_f64(value: f64) -> Self {
        Self((value * MICROS_PER_UNIT as f64).round() as i128)
    }

    /// The raw micro-unit count.
    pub fn as_micros(self) -> i128 {
        self.0
    }

    /// Lossy conversion for geometry.
    pub fn to_f64(self) -> f64 {
        self.0 as f64 / MICROS_PER_UNIT as f64
    }

    /// Checked addition in micro-units.
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Checked subtraction in micro-units.
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// True when the value is strictly below zero.
    pub fn is_negative(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for DecimalValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        let units = magnitude / MICROS_PER_UNIT.unsigned_abs();
        let fraction = magnitude % MICROS_PER_UNIT.unsigned_abs();
        if fraction == 0 {
            write!(f, "{sign}{units}")
        } else {
            let digits = format!("{fraction:06}");
            write!(f, "{sign}{units}.{}", digits.trim_end_matches('0'))
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Why a decimal literal was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum DecimalParseError {
    /// The input held no digits.
    #[error("empty decimal literal")]
    Empty,
    /// A character outside `[-0-9.]` (or a second point) was found.
    #[error("unexpected character '{character}' in decimal literal")]
    UnexpectedCharacter { character: char },
    /// More fractional digits than the representation carries.
    #[error("more than {FRAC_DIGITS} fractional digits")]
    TooManyFractionDigits,
    /// The magnitude does not fit in the fixed-point range.
    #[error("decimal literal out of range")]
    OutOfRange,
}

impl FromStr for DecimalValue {
    type Err = DecimalParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let (negative, digits) = match trimmed.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, trimmed),
        };
        let mut mantissa: i128 = 0;
        let mut in_fraction = false;
        let mut fraction_digits: u32 = 0;
        let mut seen_digit = false;
        for character in digits.chars() {
            match character {
                '.' if !in_fraction => in_fraction = true,
                '0'..='9' => {
                    seen_digit = true;
                    if in_fraction {
                        fraction_digits += 1;
                        if fraction_digits > FRAC_DIGITS {
                            return Err(DecimalParseError::TooManyFractionDigits);
                        }
                    }
                    mantissa = mantissa
                        .checked_mul(10)
                        .and_then(|v| v.checked_add(i128::from(character as u8 - b'0')))
                        .ok_or(DecimalParseError::OutOfRange)?;
                }
                other => return Err(DecimalParseError::UnexpectedCharacter { character: other }),
            }
        }
        if !seen_digit {
            return Err(DecimalParseError::Empty);
        }
        let scale = 10i128.pow(FRAC_DIGITS - fraction_digits);
        let micros = mantissa
            .checked_mul(scale)
            .ok_or(DecimalParseError::OutOfRange)?;
        Ok(Self(if negative { -micros } else { micros }))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
