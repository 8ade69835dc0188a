//! Operators on values
//!
//! Shared by the evaluator and by constant folding in the simplifier, so
//! both agree on every result.

use crate::ast::{ArithmeticOp, RelationalOp};
use chrono::NaiveDateTime;
use regex::Regex;
use rust_decimal::Decimal;
use soql_core::{Error, Result, Value};
use std::cmp::Ordering;

/// Both operands after promotion to a common type
enum Promoted {
    Null,
    Boolean(bool, bool),
    Number(Value, Value),
    Text(String, String),
    DateTime(NaiveDateTime, NaiveDateTime),
}

fn to_datetime(value: &Value) -> Option<NaiveDateTime> {
    match value {
        Value::DateTime(dt) => Some(*dt),
        Value::String(s) => Value::parse_datetime(s),
        _ => None,
    }
}

fn to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Boolean(b) => Some(b.to_string()),
        v if v.is_numeric() => Some(v.to_string()),
        _ => None,
    }
}

/// Bring two operands to a common type.
///
/// Date/time wins over string, string wins over numbers, and numbers widen
/// to the higher rung of the ladder.
fn promote(op: &str, left: &Value, right: &Value) -> Result<Promoted> {
    if left.is_null() || right.is_null() {
        return Ok(Promoted::Null);
    }
    let mismatch = || Error::type_mismatch(op, left.type_name(), right.type_name());

    if left.is_datetime() || right.is_datetime() {
        return match (to_datetime(left), to_datetime(right)) {
            (Some(l), Some(r)) => Ok(Promoted::DateTime(l, r)),
            _ => Err(mismatch()),
        };
    }

    if left.is_string() || right.is_string() {
        return match (to_text(left), to_text(right)) {
            (Some(l), Some(r)) => Ok(Promoted::Text(l, r)),
            _ => Err(mismatch()),
        };
    }

    if let (Some(lr), Some(rr)) = (left.numeric_rank(), right.numeric_rank()) {
        let rank = lr.max(rr);
        return match (left.widen_to(rank), right.widen_to(rank)) {
            (Some(l), Some(r)) => Ok(Promoted::Number(l, r)),
            _ => Err(mismatch()),
        };
    }

    if let (Some(l), Some(r)) = (left.as_boolean(), right.as_boolean()) {
        return Ok(Promoted::Boolean(l, r));
    }

    Err(mismatch())
}

fn overflow(op: ArithmeticOp) -> Error {
    Error::Arithmetic(format!("overflow in '{}'", op.symbol()))
}

fn division_by_zero() -> Error {
    Error::Arithmetic("division by zero".to_string())
}

macro_rules! checked_arithmetic {
    ($op:expr, $a:expr, $b:expr, $zero:expr, $variant:path) => {{
        let (a, b) = ($a, $b);
        let result = match $op {
            ArithmeticOp::Add => a.checked_add(b),
            ArithmeticOp::Subtract => a.checked_sub(b),
            ArithmeticOp::Multiply => a.checked_mul(b),
            ArithmeticOp::Divide | ArithmeticOp::Modulo if b == $zero => {
                return Err(division_by_zero());
            }
            ArithmeticOp::Divide => a.checked_div(b),
            ArithmeticOp::Modulo => a.checked_rem(b),
        };
        result.map($variant).ok_or_else(|| overflow($op))
    }};
}

macro_rules! float_arithmetic {
    ($op:expr, $a:expr, $b:expr, $variant:path) => {{
        let (a, b) = ($a, $b);
        Ok($variant(match $op {
            ArithmeticOp::Add => a + b,
            ArithmeticOp::Subtract => a - b,
            ArithmeticOp::Multiply => a * b,
            ArithmeticOp::Divide => a / b,
            ArithmeticOp::Modulo => a % b,
        }))
    }};
}

/// Arithmetic on two numbers of the same rung
fn numeric_arithmetic(op: ArithmeticOp, left: &Value, right: &Value) -> Result<Value> {
    match (left, right) {
        (Value::Int8(a), Value::Int8(b)) => checked_arithmetic!(op, *a, *b, 0, Value::Int8),
        (Value::Int16(a), Value::Int16(b)) => checked_arithmetic!(op, *a, *b, 0, Value::Int16),
        (Value::Int32(a), Value::Int32(b)) => checked_arithmetic!(op, *a, *b, 0, Value::Int32),
        (Value::Int64(a), Value::Int64(b)) => checked_arithmetic!(op, *a, *b, 0, Value::Int64),
        (Value::Decimal(a), Value::Decimal(b)) => {
            checked_arithmetic!(op, *a, *b, Decimal::ZERO, Value::Decimal)
        }
        (Value::Float(a), Value::Float(b)) => float_arithmetic!(op, *a, *b, Value::Float),
        (Value::Double(a), Value::Double(b)) => float_arithmetic!(op, *a, *b, Value::Double),
        _ => Err(Error::type_mismatch(
            op.symbol(),
            left.type_name(),
            right.type_name(),
        )),
    }
}

/// Apply a binary arithmetic operator.
///
/// A null operand gives null. `+` on strings concatenates.
pub fn arithmetic(op: ArithmeticOp, left: &Value, right: &Value) -> Result<Value> {
    match promote(op.symbol(), left, right)? {
        Promoted::Null => Ok(Value::Null),
        Promoted::Number(l, r) => numeric_arithmetic(op, &l, &r),
        Promoted::Text(l, r) if op == ArithmeticOp::Add => Ok(Value::String(l + &r)),
        _ => Err(Error::type_mismatch(
            op.symbol(),
            left.type_name(),
            right.type_name(),
        )),
    }
}

/// Unary minus on any numeric rung
pub fn negate(value: &Value) -> Result<Value> {
    let overflow = || Error::Arithmetic("overflow in unary '-'".to_string());
    match value {
        Value::Null => Ok(Value::Null),
        Value::Int8(v) => v.checked_neg().map(Value::Int8).ok_or_else(overflow),
        Value::Int16(v) => v.checked_neg().map(Value::Int16).ok_or_else(overflow),
        Value::Int32(v) => v.checked_neg().map(Value::Int32).ok_or_else(overflow),
        Value::Int64(v) => v.checked_neg().map(Value::Int64).ok_or_else(overflow),
        Value::Decimal(d) => Ok(Value::Decimal(-*d)),
        Value::Float(f) => Ok(Value::Float(-*f)),
        Value::Double(f) => Ok(Value::Double(-*f)),
        other => Err(Error::Type(format!(
            "unary '-' cannot be applied to {}",
            other.type_name()
        ))),
    }
}

fn numeric_ordering(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Decimal(a), Value::Decimal(b)) => Some(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
        (a, b) => Some(a.as_i64()?.cmp(&b.as_i64()?)),
    }
}

/// `true = 1` style comparisons: the number becomes a boolean
fn boolean_number_equality(op: RelationalOp, left: &Value, right: &Value) -> Option<bool> {
    if !matches!(op, RelationalOp::Equal | RelationalOp::NotEqual) {
        return None;
    }
    let (flag, number) = match (left, right) {
        (Value::Boolean(b), n) | (n, Value::Boolean(b)) if n.is_numeric() => (*b, n),
        _ => return None,
    };
    let truthy = number.as_f64()? != 0.0;
    Some((flag == truthy) == (op == RelationalOp::Equal))
}

/// Apply a relational operator; `None` means unknown (a null operand)
pub fn compare(op: RelationalOp, left: &Value, right: &Value) -> Result<Option<bool>> {
    if op == RelationalOp::Like {
        return like_values(left, right);
    }
    if let Some(result) = boolean_number_equality(op, left, right) {
        return Ok(Some(result));
    }

    let ordering = match promote(op.symbol(), left, right)? {
        Promoted::Null => None,
        Promoted::Boolean(l, r) => Some(l.cmp(&r)),
        Promoted::Number(l, r) => numeric_ordering(&l, &r),
        Promoted::Text(l, r) => Some(l.cmp(&r)),
        Promoted::DateTime(l, r) => Some(l.cmp(&r)),
    };

    Ok(ordering.map(|ordering| match op {
        RelationalOp::Equal => ordering == Ordering::Equal,
        RelationalOp::NotEqual => ordering != Ordering::Equal,
        RelationalOp::Less => ordering == Ordering::Less,
        RelationalOp::LessOrEqual => ordering != Ordering::Greater,
        RelationalOp::Greater => ordering == Ordering::Greater,
        RelationalOp::GreaterOrEqual => ordering != Ordering::Less,
        RelationalOp::Like => false,
    }))
}

fn like_values(left: &Value, right: &Value) -> Result<Option<bool>> {
    if left.is_null() || right.is_null() {
        return Ok(None);
    }
    let text = to_text(left).or_else(|| left.as_datetime().map(|_| left.to_string()));
    match (text, to_text(right)) {
        (Some(text), Some(pattern)) => like(&text, &pattern).map(Some),
        _ => Err(Error::type_mismatch(
            "like",
            left.type_name(),
            right.type_name(),
        )),
    }
}

/// SQL `LIKE`: `%` matches any run, `_` any single character.
/// Case-sensitive and anchored at both ends.
pub fn like(text: &str, pattern: &str) -> Result<bool> {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push_str("(?s)^");
    for ch in pattern.chars() {
        match ch {
            '%' => source.push_str(".*"),
            '_' => source.push('.'),
            c => source.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    source.push('$');

    let regex = Regex::new(&source)
        .map_err(|e| Error::Type(format!("invalid like pattern '{}': {}", pattern, e)))?;
    Ok(regex.is_match(text))
}

/// Interpret a value as a three-valued boolean
pub fn truth(value: &Value) -> Result<Option<bool>> {
    match value {
        Value::Null => Ok(None),
        Value::Boolean(b) => Ok(Some(*b)),
        other => Err(Error::Type(format!(
            "expected boolean, found {}",
            other.type_name()
        ))),
    }
}

/// Value form of a three-valued boolean
pub fn from_truth(truth: Option<bool>) -> Value {
    truth.map(Value::Boolean).unwrap_or(Value::Null)
}
