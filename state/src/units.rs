//! Exact decimal amounts and their integer base-unit scaling.
//!
//! Amounts are kept as digit strings so that scaling by `10^decimals` is a
//! string shift, never a floating-point multiply.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, StateError};

/// Decimals of the chain's native currency (wei per ether).
pub const NATIVE_DECIMALS: u8 = 18;

/// Non-negative decimal as typed by the operator, e.g. `"1.5"`.
///
/// Normalised on parse: no leading zeros in the integer part, no trailing
/// zeros in the fractional part.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct DecimalAmount {
    integer: String,
    fraction: String,
}

impl DecimalAmount {
    pub fn zero() -> Self {
        Self {
            integer: "0".to_string(),
            fraction: String::new(),
        }
    }

    /// Number of significant fractional digits.
    pub fn scale(&self) -> usize {
        self.fraction.len()
    }

    pub fn is_zero(&self) -> bool {
        self.integer == "0" && self.fraction.is_empty()
    }

    /// Scale into integer base units (`self * 10^decimals`).
    ///
    /// Fails rather than rounds when the amount is finer than one base unit.
    pub fn to_base_units(&self, decimals: u8) -> Result<BaseUnits> {
        let decimals = decimals as usize;
        if self.fraction.len() > decimals {
            return Err(StateError::ExcessPrecision {
                amount: self.to_string(),
                decimals: decimals as u8,
            });
        }

        let mut digits = String::with_capacity(self.integer.len() + decimals);
        digits.push_str(&self.integer);
        digits.push_str(&self.fraction);
        digits.extend(std::iter::repeat('0').take(decimals - self.fraction.len()));

        Ok(BaseUnits::from_digits(&digits))
    }
}

impl Default for DecimalAmount {
    fn default() -> Self {
        Self::zero()
    }
}

impl FromStr for DecimalAmount {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self> {
        let raw = s.trim();
        let invalid = || StateError::InvalidDecimal(s.to_string());

        let (integer, fraction) = match raw.split_once('.') {
            Some((i, f)) => (i, f),
            None => (raw, ""),
        };

        if integer.is_empty() && fraction.is_empty() {
            return Err(invalid());
        }
        if !integer.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let integer = integer.trim_start_matches('0');
        let fraction = fraction.trim_end_matches('0');

        Ok(Self {
            integer: if integer.is_empty() {
                "0".to_string()
            } else {
                integer.to_string()
            },
            fraction: fraction.to_string(),
        })
    }
}

impl fmt::Display for DecimalAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.fraction.is_empty() {
            f.write_str(&self.integer)
        } else {
            write!(f, "{}.{}", self.integer, self.fraction)
        }
    }
}

impl fmt::Debug for DecimalAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DecimalAmount({})", self)
    }
}

impl Serialize for DecimalAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DecimalAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        // Form inputs arrive either as strings or as JSON numbers. Numbers
        // keep their literal digits (serde_json `arbitrary_precision`).
        let value = serde_json::Value::deserialize(deserializer)?;
        let raw = match value {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => {
                let text = n.to_string();
                expand_exponent(&text).unwrap_or(text)
            },
            other => {
                return Err(serde::de::Error::custom(format!(
                    "expected decimal string, found {}",
                    other
                )))
            },
        };
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Rewrite number text such as `1e+21` or `1.5E-7` as plain digits.
fn expand_exponent(raw: &str) -> Option<String> {
    const MAX_EXPONENT: i64 = 1024;

    let (mantissa, exponent) = raw.split_once(['e', 'E'])?;
    let exponent: i64 = exponent.parse().ok()?;
    if exponent.abs() > MAX_EXPONENT {
        return None;
    }
    let (integer, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    let digits = format!("{}{}", integer, fraction);
    let point = integer.len() as i64 + exponent;

    Some(if point <= 0 {
        format!("0.{}{}", "0".repeat(point.unsigned_abs() as usize), digits)
    } else if point as usize >= digits.len() {
        format!("{}{}", digits, "0".repeat(point as usize - digits.len()))
    } else {
        let (head, tail) = digits.split_at(point as usize);
        format!("{}.{}", head, tail)
    })
}

/// Unsigned integer amount in the smallest unit, as a decimal digit string.
#[derive(Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct BaseUnits(String);

impl BaseUnits {
    fn from_digits(digits: &str) -> Self {
        let trimmed = digits.trim_start_matches('0');
        if trimmed.is_empty() {
            Self("0".to_string())
        } else {
            Self(trimmed.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Inverse of [`DecimalAmount::to_base_units`].
    pub fn to_decimal(&self, decimals: u8) -> DecimalAmount {
        let decimals = decimals as usize;
        let padded = if self.0.len() <= decimals {
            format!("{}{}", "0".repeat(decimals + 1 - self.0.len()), self.0)
        } else {
            self.0.clone()
        };
        let (integer, fraction) = padded.split_at(padded.len() - decimals);
        let fraction = fraction.trim_end_matches('0');
        let integer = integer.trim_start_matches('0');
        DecimalAmount {
            integer: if integer.is_empty() {
                "0".to_string()
            } else {
                integer.to_string()
            },
            fraction: fraction.to_string(),
        }
    }
}

impl Default for BaseUnits {
    fn default() -> Self {
        Self("0".to_string())
    }
}

impl fmt::Display for BaseUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for BaseUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BaseUnits({})", self.0)
    }
}
