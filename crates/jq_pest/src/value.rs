//! Operations on JSON values following jq's rules for truthiness, ordering,
//! indexing and arithmetic.

use std::cmp::Ordering;

use itertools::Itertools;
use serde_json::{Map, Number, Value};

use crate::{ast::ArithmeticOperator, errors::JQError};

/// Largest integer an `f64` holds exactly, 2^53.
const MAX_EXACT_INT: f64 = 9_007_199_254_740_992.0;

/// Longest string, in bytes, that string repetition may build.
const MAX_STRING_LEN: usize = i32::MAX as usize;

pub fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Type name and a short rendering of `value`, for error messages.
pub fn describe(value: &Value) -> String {
    let rendered = value.to_string();
    if rendered.chars().count() > 11 {
        let short: String = rendered.chars().take(10).collect();
        format!("{} ({}...)", type_name(value), short)
    } else {
        format!("{} ({})", type_name(value), rendered)
    }
}

pub fn is_truthy(value: &Value) -> bool {
    !matches!(value, Value::Null | Value::Bool(false))
}

pub fn as_f64(number: &Number) -> f64 {
    number.as_f64().unwrap_or(f64::NAN)
}

/// A JSON number for `n`, using an integer representation when `n` is integral.
pub fn number(n: f64) -> Value {
    if n.fract() == 0.0 && n.abs() <= MAX_EXACT_INT {
        Value::from(n as i64)
    } else {
        Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
    }
}

fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(false) => 1,
        Value::Bool(true) => 2,
        Value::Number(_) => 3,
        Value::String(_) => 4,
        Value::Array(_) => 5,
        Value::Object(_) => 6,
    }
}

/// jq's total order: null < false < true < numbers < strings < arrays < objects.
pub fn compare(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => as_f64(l)
            .partial_cmp(&as_f64(r))
            .unwrap_or(Ordering::Equal),
        (Value::String(l), Value::String(r)) => l.cmp(r),
        (Value::Array(l), Value::Array(r)) => l
            .iter()
            .zip(r.iter())
            .map(|(a, b)| compare(a, b))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or_else(|| l.len().cmp(&r.len())),
        (Value::Object(l), Value::Object(r)) => {
            let left_keys: Vec<&String> = l.keys().sorted().collect();
            let right_keys: Vec<&String> = r.keys().sorted().collect();
            left_keys.cmp(&right_keys).then_with(|| {
                left_keys
                    .iter()
                    .map(|k| compare(&l[k.as_str()], &r[k.as_str()]))
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            })
        }
        _ => rank(left).cmp(&rank(right)),
    }
}

pub fn equals(left: &Value, right: &Value) -> bool {
    compare(left, right) == Ordering::Equal
}

/// Normalize a possibly negative array index, returning `None` when out of range.
fn norm_index(index: f64, length: usize) -> Option<usize> {
    let index = index.floor();
    let index = if index < 0.0 {
        length as f64 + index
    } else {
        index
    };

    if index < 0.0 || index >= length as f64 {
        None
    } else {
        Some(index as usize)
    }
}

/// `.[key]`
pub fn index(value: &Value, key: &Value) -> Result<Value, JQError> {
    match (value, key) {
        (Value::Object(obj), Value::String(name)) => {
            Ok(obj.get(name).cloned().unwrap_or(Value::Null))
        }
        (Value::Array(arr), Value::Number(n)) => Ok(norm_index(as_f64(n), arr.len())
            .map(|i| arr[i].clone())
            .unwrap_or(Value::Null)),
        (Value::Null, Value::String(_) | Value::Number(_) | Value::Null) => Ok(Value::Null),
        (_, Value::String(name)) => Err(JQError::message(format!(
            "Cannot index {} with \"{}\"",
            type_name(value),
            name
        ))),
        _ => Err(JQError::message(format!(
            "Cannot index {} with {}",
            type_name(value),
            type_name(key)
        ))),
    }
}

fn slice_bound(bound: &Value, length: usize, default: usize) -> Result<usize, JQError> {
    match bound {
        Value::Null => Ok(default),
        Value::Number(n) => {
            let n = as_f64(n).floor();
            let n = if n < 0.0 { length as f64 + n } else { n };
            Ok(n.clamp(0.0, length as f64) as usize)
        }
        other => Err(JQError::message(format!(
            "Start and end indices of an array slice must be numbers, not {}",
            type_name(other)
        ))),
    }
}

/// `.[from:to]` on arrays and strings. String offsets count code points.
pub fn slice(value: &Value, from: &Value, to: &Value) -> Result<Value, JQError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Array(arr) => {
            let start = slice_bound(from, arr.len(), 0)?;
            let stop = slice_bound(to, arr.len(), arr.len())?;
            if start >= stop {
                Ok(Value::Array(Vec::new()))
            } else {
                Ok(Value::Array(arr[start..stop].to_vec()))
            }
        }
        Value::String(s) => {
            let length = s.chars().count();
            let start = slice_bound(from, length, 0)?;
            let stop = slice_bound(to, length, length)?;
            Ok(Value::String(
                s.chars()
                    .skip(start)
                    .take(stop.saturating_sub(start))
                    .collect(),
            ))
        }
        other => Err(JQError::message(format!(
            "Cannot index {} with object",
            type_name(other)
        ))),
    }
}

pub fn negate(value: Value) -> Result<Value, JQError> {
    match value {
        Value::Number(n) => Ok(number(-as_f64(&n))),
        other => Err(JQError::message(format!(
            "{} cannot be negated",
            describe(&other)
        ))),
    }
}

/// Split `s` on `separator`. An empty separator splits into characters.
pub fn split(s: &str, separator: &str) -> Value {
    if s.is_empty() {
        Value::Array(Vec::new())
    } else if separator.is_empty() {
        s.chars().map(|c| Value::String(c.to_string())).collect()
    } else {
        s.split(separator).map(Value::from).collect()
    }
}

fn deep_merge(mut left: Map<String, Value>, right: Map<String, Value>) -> Map<String, Value> {
    for (key, value) in right {
        let merged = match (left.remove(&key), value) {
            (Some(Value::Object(l)), Value::Object(r)) => Value::Object(deep_merge(l, r)),
            (_, value) => value,
        };
        left.insert(key, merged);
    }
    left
}

pub fn arithmetic(
    operator: ArithmeticOperator,
    left: Value,
    right: Value,
) -> Result<Value, JQError> {
    use ArithmeticOperator::*;

    match (operator, left, right) {
        (Add, Value::Null, r) => Ok(r),
        (Add, l, Value::Null) => Ok(l),
        (Add, Value::Number(l), Value::Number(r)) => Ok(number(as_f64(&l) + as_f64(&r))),
        (Add, Value::String(l), Value::String(r)) => Ok(Value::String(l + &r)),
        (Add, Value::Array(mut l), Value::Array(r)) => {
            l.extend(r);
            Ok(Value::Array(l))
        }
        (Add, Value::Object(mut l), Value::Object(r)) => {
            l.extend(r);
            Ok(Value::Object(l))
        }
        (Sub, Value::Number(l), Value::Number(r)) => Ok(number(as_f64(&l) - as_f64(&r))),
        (Sub, Value::Array(l), Value::Array(r)) => Ok(Value::Array(
            l.into_iter()
                .filter(|item| !r.iter().any(|other| equals(item, other)))
                .collect(),
        )),
        (Mul, Value::Number(l), Value::Number(r)) => Ok(number(as_f64(&l) * as_f64(&r))),
        (Mul, Value::Object(l), Value::Object(r)) => Ok(Value::Object(deep_merge(l, r))),
        (Mul, Value::String(s), Value::Number(n)) | (Mul, Value::Number(n), Value::String(s)) => {
            let times = as_f64(&n);
            if times <= 0.0 {
                return Ok(Value::Null);
            }

            // Saturates for huge repeat counts, which the length check rejects.
            let times = times.ceil() as usize;
            match s.len().checked_mul(times) {
                Some(len) if len <= MAX_STRING_LEN => Ok(Value::String(s.repeat(times))),
                _ => Err(JQError::message(String::from(
                    "Repeat string result too long",
                ))),
            }
        }
        (Div, Value::Number(l), Value::Number(r)) => {
            let divisor = as_f64(&r);
            if divisor == 0.0 {
                Err(JQError::message(format!(
                    "{} and {} cannot be divided because the divisor is zero",
                    describe(&Value::Number(l)),
                    describe(&Value::Number(r))
                )))
            } else {
                Ok(number(as_f64(&l) / divisor))
            }
        }
        (Div, Value::String(l), Value::String(r)) => Ok(split(&l, &r)),
        (Mod, Value::Number(l), Value::Number(r)) => {
            let divisor = as_f64(&r).trunc() as i64;
            if divisor == 0 {
                Err(JQError::message(format!(
                    "{} and {} cannot be divided because the divisor is zero",
                    describe(&Value::Number(l)),
                    describe(&Value::Number(r))
                )))
            } else {
                let dividend = as_f64(&l).trunc() as i64;
                Ok(Value::from(dividend.wrapping_rem(divisor.wrapping_abs())))
            }
        }
        (operator, l, r) => Err(JQError::message(format!(
            "{} and {} cannot be {}",
            describe(&l),
            describe(&r),
            match operator {
                Add => "added",
                Sub => "subtracted",
                Mul => "multiplied",
                Div | Mod => "divided",
            }
        ))),
    }
}
