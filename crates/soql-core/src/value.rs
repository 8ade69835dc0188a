//! Typed scalar values
//!
//! Values flow out of literals, bound parameters and host properties, and
//! are the result type of in-memory evaluation.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A scalar value known to the query language
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Null/missing value
    Null,

    /// Boolean value
    Boolean(bool),

    /// 8-bit signed integer
    Int8(i8),

    /// 16-bit signed integer
    Int16(i16),

    /// 32-bit signed integer
    Int32(i32),

    /// 64-bit signed integer
    Int64(i64),

    /// Exact decimal number
    Decimal(Decimal),

    /// 32-bit floating point
    Float(f32),

    /// 64-bit floating point
    Double(f64),

    /// UTF-8 string
    String(String),

    /// Date and time without a time zone
    DateTime(NaiveDateTime),
}

/// Rungs of the numeric promotion ladder, lowest first.
///
/// When two numbers meet in an operator, both are widened to the higher of
/// their two ranks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NumericRank {
    Int8,
    Int16,
    Int32,
    Int64,
    Decimal,
    Float,
    Double,
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y%m%d %H:%M:%S",
];

impl Value {
    /// Returns true if the value is null
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true if the value is a boolean
    pub fn is_boolean(&self) -> bool {
        matches!(self, Value::Boolean(_))
    }

    /// Returns true for any rung of the numeric ladder
    pub fn is_numeric(&self) -> bool {
        self.numeric_rank().is_some()
    }

    /// Returns true if the value is a string
    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    /// Returns true if the value is a date/time
    pub fn is_datetime(&self) -> bool {
        matches!(self, Value::DateTime(_))
    }

    /// Try to get as boolean
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get any integer rung as i64
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int8(v) => Some(*v as i64),
            Value::Int16(v) => Some(*v as i64),
            Value::Int32(v) => Some(*v as i64),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Try to get any numeric rung as f64
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Decimal(d) => d.to_f64(),
            Value::Float(f) => Some(*f as f64),
            Value::Double(f) => Some(*f),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Try to get as string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get as date/time
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            _ => None,
        }
    }

    /// Position of this value on the numeric ladder
    pub fn numeric_rank(&self) -> Option<NumericRank> {
        match self {
            Value::Int8(_) => Some(NumericRank::Int8),
            Value::Int16(_) => Some(NumericRank::Int16),
            Value::Int32(_) => Some(NumericRank::Int32),
            Value::Int64(_) => Some(NumericRank::Int64),
            Value::Decimal(_) => Some(NumericRank::Decimal),
            Value::Float(_) => Some(NumericRank::Float),
            Value::Double(_) => Some(NumericRank::Double),
            _ => None,
        }
    }

    /// Widen a numeric value to `rank`.
    ///
    /// Returns `None` for non-numeric values and for narrowing conversions.
    pub fn widen_to(&self, rank: NumericRank) -> Option<Value> {
        let current = self.numeric_rank()?;
        if current > rank {
            return None;
        }
        if current == rank {
            return Some(self.clone());
        }
        match rank {
            NumericRank::Int8 => None,
            NumericRank::Int16 => match self {
                Value::Int8(v) => Some(Value::Int16(*v as i16)),
                _ => None,
            },
            NumericRank::Int32 => self.as_i64().map(|v| Value::Int32(v as i32)),
            NumericRank::Int64 => self.as_i64().map(Value::Int64),
            NumericRank::Decimal => self.as_i64().map(|v| Value::Decimal(Decimal::from(v))),
            NumericRank::Float => match self {
                Value::Decimal(d) => d.to_f32().map(Value::Float),
                other => other.as_i64().map(|v| Value::Float(v as f32)),
            },
            NumericRank::Double => self.as_f64().map(Value::Double),
        }
    }

    /// Parse a textual date/time in one of the accepted layouts
    pub fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        for format in DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
                return Some(dt);
            }
        }
        NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Int8(_) => "int8",
            Value::Int16(_) => "int16",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Decimal(_) => "decimal",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::DateTime(_) => "datetime",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Int8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Float(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::String(s) => write!(f, "{}", s),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

// Convenience From implementations
impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::Int8(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::Int16(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Value::Decimal(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::DateTime(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
