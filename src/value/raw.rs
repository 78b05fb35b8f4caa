//! Untyped wire values.
//!
//! Everything arriving from the simulator link is one of three shapes:
//! a number (UDP always delivers floats), a string, or raw bytes.
//! Typed coercion happens lazily on read, never on ingest.

use core::fmt;

/// A raw value as received from the simulator or computed locally.
/// Absence is expressed as `Option<RawValue>::None` by the owner,
/// never as a variant here.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Bytes(Vec<u8>),
}

impl RawValue {
    /// Numeric view, if this value is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Round a numeric value to `digits` decimal places.
    /// Non-numeric values are returned unchanged (rounding only ever
    /// applies to numbers).
    pub fn rounded(&self, digits: i32) -> Self {
        match self {
            Self::Number(n) => {
                let factor = 10f64.powi(digits);
                Self::Number((n * factor).round() / factor)
            }
            other => other.clone(),
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
        }
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<i64> for RawValue {
    fn from(v: i64) -> Self {
        Self::Number(v as f64)
    }
}

impl From<&str> for RawValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for RawValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<Vec<u8>> for RawValue {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

/// A value after explicit type coercion via `Dataref::value_typed`.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Float(f64),
    Int(i64),
    Str(String),
    Bytes(Vec<u8>),
}
