//! Functions available to every program without a definition.

use std::{collections::HashMap, iter};

use lazy_static::lazy_static;
use serde_json::{Map, Value};

use crate::{
    ast::{ArithmeticOperator, Expr},
    errors::JQError,
    eval::{self, collect, defer, empty, eval, fail, iterate, map, once, then, Ctx, Outputs},
    value::{self, compare, describe, equals, is_truthy, type_name},
};

const SIGNATURES: &[(&str, usize)] = &[
    ("empty", 0),
    ("error", 0),
    ("error", 1),
    ("not", 0),
    ("length", 0),
    ("keys", 0),
    ("keys_unsorted", 0),
    ("has", 1),
    ("type", 0),
    ("tostring", 0),
    ("tonumber", 0),
    ("tojson", 0),
    ("fromjson", 0),
    ("add", 0),
    ("any", 0),
    ("all", 0),
    ("range", 1),
    ("range", 2),
    ("select", 1),
    ("map", 1),
    ("recurse", 0),
    ("recurse", 1),
    ("first", 0),
    ("last", 0),
    ("first", 1),
    ("last", 1),
    ("limit", 2),
    ("sort", 0),
    ("sort_by", 1),
    ("unique", 0),
    ("reverse", 0),
    ("min", 0),
    ("max", 0),
    ("floor", 0),
    ("sqrt", 0),
    ("to_entries", 0),
    ("from_entries", 0),
    ("with_entries", 1),
    ("join", 1),
    ("split", 1),
    ("startswith", 1),
    ("endswith", 1),
    ("ascii_downcase", 0),
    ("ascii_upcase", 0),
    ("debug", 0),
];

lazy_static! {
    static ref BUILTINS: HashMap<&'static str, Vec<usize>> = {
        let mut table: HashMap<&'static str, Vec<usize>> = HashMap::new();
        for (name, arity) in SIGNATURES {
            table.entry(*name).or_default().push(*arity);
        }
        table
    };
}

pub fn is_builtin(name: &str, arity: usize) -> bool {
    BUILTINS
        .get(name)
        .is_some_and(|arities| arities.contains(&arity))
}

fn result<'a>(result: Result<Value, JQError>) -> Outputs<'a> {
    Box::new(iter::once(result))
}

/// Call builtin `name` with `args`. Arguments of functions taking values are
/// evaluated against `input`; filter arguments are evaluated per element.
pub fn call<'a>(name: &'a str, args: &'a [Expr], ctx: Ctx<'a>, input: Value) -> Outputs<'a> {
    match (name, args) {
        ("empty", []) => empty(),
        ("error", []) => fail(JQError::runtime(input)),
        ("error", [message]) => then(eval(message, ctx, input), |message| {
            fail(JQError::runtime(message))
        }),
        ("not", []) => once(Value::Bool(!is_truthy(&input))),
        ("length", []) => result(length(&input)),
        ("keys", []) | ("keys_unsorted", []) => result(keys(&input)),
        ("has", [key]) => map(eval(key, ctx, input.clone()), move |key| has(&input, &key)),
        ("type", []) => once(Value::String(type_name(&input).to_owned())),
        ("tostring", []) => once(tostring(input)),
        ("tonumber", []) => result(tonumber(input)),
        ("tojson", []) => once(Value::String(input.to_string())),
        ("fromjson", []) => result(fromjson(input)),
        ("add", []) => result(add(input)),
        ("any", []) => result(elements(input).map(|v| Value::Bool(v.iter().any(is_truthy)))),
        ("all", []) => result(elements(input).map(|v| Value::Bool(v.iter().all(is_truthy)))),
        ("range", [upto]) => then(eval(upto, ctx, input), |upto| range(Value::from(0), upto)),
        ("range", [from, upto]) => then(eval(from, ctx.clone(), input.clone()), move |from| {
            then(eval(upto, ctx.clone(), input.clone()), move |upto| {
                range(from.clone(), upto)
            })
        }),
        ("select", [cond]) => then(eval(cond, ctx, input.clone()), move |c| {
            if is_truthy(&c) {
                once(input.clone())
            } else {
                empty()
            }
        }),
        ("map", [f]) => defer(move || {
            let mapped = then(iterate(input), move |item| eval(f, ctx.clone(), item));
            match collect(mapped) {
                Ok(values) => once(Value::Array(values)),
                Err(err) => fail(err),
            }
        }),
        ("recurse", []) => eval::recurse(input),
        ("recurse", [f]) => eval::recurse_with(f, ctx, input),
        ("first", []) => result(value::index(&input, &Value::from(0))),
        ("last", []) => result(value::index(&input, &Value::from(-1))),
        ("first", [f]) => Box::new(eval(f, ctx, input).take(1)),
        ("last", [f]) => defer(move || {
            let mut last = None;
            for item in eval(f, ctx, input) {
                match item {
                    Ok(value) => last = Some(value),
                    Err(err) => return fail(err),
                }
            }
            match last {
                Some(value) => once(value),
                None => empty(),
            }
        }),
        ("limit", [n, f]) => then(eval(n, ctx.clone(), input.clone()), move |n| match n {
            Value::Number(n) => {
                let n = value::as_f64(&n);
                if n <= 0.0 {
                    empty()
                } else {
                    Box::new(eval(f, ctx.clone(), input.clone()).take(n.ceil() as usize))
                }
            }
            other => fail(JQError::message(format!(
                "Invalid limit {}, a number is required",
                describe(&other)
            ))),
        }),
        ("sort", []) => result(sort(input)),
        ("sort_by", [f]) => defer(move || result(sort_by(f, ctx, input))),
        ("unique", []) => result(sort(input).map(|sorted| match sorted {
            Value::Array(mut arr) => {
                arr.dedup_by(|a, b| equals(a, b));
                Value::Array(arr)
            }
            other => other,
        })),
        ("reverse", []) => result(reverse(input)),
        ("min", []) => result(elements(input).map(|v| {
            v.into_iter()
                .min_by(|a, b| compare(a, b))
                .unwrap_or(Value::Null)
        })),
        ("max", []) => result(elements(input).map(|v| {
            v.into_iter()
                .max_by(|a, b| compare(a, b))
                .unwrap_or(Value::Null)
        })),
        ("floor", []) => result(math(input, "floor", f64::floor)),
        ("sqrt", []) => result(math(input, "sqrt", f64::sqrt)),
        ("to_entries", []) => result(to_entries(input)),
        ("from_entries", []) => result(from_entries(input)),
        ("with_entries", [f]) => defer(move || {
            let entries = match to_entries(input) {
                Ok(entries) => entries,
                Err(err) => return fail(err),
            };
            let mapped = then(iterate(entries), move |entry| eval(f, ctx.clone(), entry));
            result(collect(mapped).and_then(|entries| from_entries(Value::Array(entries))))
        }),
        ("join", [separator]) => map(eval(separator, ctx, input.clone()), move |separator| {
            join(&input, &separator)
        }),
        ("split", [separator]) => map(eval(separator, ctx, input.clone()), move |separator| {
            match (&input, &separator) {
                (Value::String(s), Value::String(sep)) => Ok(value::split(s, sep)),
                _ => Err(JQError::message(
                    "split input and separator must be strings".to_owned(),
                )),
            }
        }),
        ("startswith", [prefix]) => map(eval(prefix, ctx, input.clone()), move |prefix| {
            match (&input, &prefix) {
                (Value::String(s), Value::String(p)) => Ok(Value::Bool(s.starts_with(p.as_str()))),
                _ => Err(JQError::message(
                    "startswith() requires string inputs".to_owned(),
                )),
            }
        }),
        ("endswith", [suffix]) => map(eval(suffix, ctx, input.clone()), move |suffix| {
            match (&input, &suffix) {
                (Value::String(s), Value::String(p)) => Ok(Value::Bool(s.ends_with(p.as_str()))),
                _ => Err(JQError::message("endswith() requires string inputs".to_owned())),
            }
        }),
        ("ascii_downcase", []) => result(ascii_case(input, str::to_ascii_lowercase)),
        ("ascii_upcase", []) => result(ascii_case(input, str::to_ascii_uppercase)),
        ("debug", []) => {
            tracing::debug!("[\"DEBUG:\",{}]", input);
            once(input)
        }
        _ => fail(JQError::message(format!(
            "{}/{} is not defined",
            name,
            args.len()
        ))),
    }
}

fn length(value: &Value) -> Result<Value, JQError> {
    match value {
        Value::Null => Ok(Value::from(0)),
        Value::Bool(_) => Err(JQError::message(format!(
            "{} has no length",
            describe(value)
        ))),
        Value::Number(n) => Ok(value::number(value::as_f64(n).abs())),
        Value::String(s) => Ok(Value::from(s.chars().count())),
        Value::Array(arr) => Ok(Value::from(arr.len())),
        Value::Object(obj) => Ok(Value::from(obj.len())),
    }
}

fn keys(value: &Value) -> Result<Value, JQError> {
    match value {
        Value::Object(obj) => {
            let mut keys: Vec<&String> = obj.keys().collect();
            keys.sort();
            Ok(keys.into_iter().cloned().collect())
        }
        Value::Array(arr) => Ok((0..arr.len()).collect()),
        other => Err(JQError::message(format!(
            "{} has no keys",
            describe(other)
        ))),
    }
}

fn has(value: &Value, key: &Value) -> Result<Value, JQError> {
    match (value, key) {
        (Value::Object(obj), Value::String(name)) => Ok(Value::Bool(obj.contains_key(name))),
        (Value::Array(arr), Value::Number(n)) => {
            let n = value::as_f64(n);
            Ok(Value::Bool(n >= 0.0 && n < arr.len() as f64))
        }
        _ => Err(JQError::message(format!(
            "Cannot check whether {} has a {} key",
            type_name(value),
            type_name(key)
        ))),
    }
}

fn tostring(value: Value) -> Value {
    match value {
        Value::String(_) => value,
        other => Value::String(other.to_string()),
    }
}

fn tonumber(value: Value) -> Result<Value, JQError> {
    match value {
        Value::Number(_) => Ok(value),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| n.is_finite())
            .map(value::number)
            .ok_or_else(|| JQError::message(format!("Cannot parse '{s}' as a number"))),
        other => Err(JQError::message(format!(
            "{} cannot be parsed as a number",
            describe(&other)
        ))),
    }
}

fn fromjson(value: Value) -> Result<Value, JQError> {
    match value {
        Value::String(s) => serde_json::from_str(&s)
            .map_err(|err| JQError::message(format!("{err} (while parsing '{s}')"))),
        other => Err(JQError::message(format!(
            "{} cannot be parsed as JSON",
            describe(&other)
        ))),
    }
}

/// The elements of an array or the values of an object.
fn elements(value: Value) -> Result<Vec<Value>, JQError> {
    match value {
        Value::Array(arr) => Ok(arr),
        Value::Object(obj) => Ok(obj.into_iter().map(|(_, v)| v).collect()),
        other => Err(JQError::message(format!(
            "Cannot iterate over {}",
            describe(&other)
        ))),
    }
}

fn add(value: Value) -> Result<Value, JQError> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    elements(value)?
        .into_iter()
        .try_fold(Value::Null, |acc, item| {
            value::arithmetic(ArithmeticOperator::Add, acc, item)
        })
}

fn range<'a>(from: Value, upto: Value) -> Outputs<'a> {
    match (from, upto) {
        (Value::Number(from), Value::Number(upto)) => {
            let upto = value::as_f64(&upto);
            Box::new(
                iter::successors(Some(value::as_f64(&from)), |n| Some(n + 1.0))
                    .take_while(move |n| *n < upto)
                    .map(|n| Ok(value::number(n))),
            )
        }
        _ => fail(JQError::message("Range bounds must be numeric".to_owned())),
    }
}

fn sort(value: Value) -> Result<Value, JQError> {
    match value {
        Value::Array(mut arr) => {
            arr.sort_by(compare);
            Ok(Value::Array(arr))
        }
        other => Err(JQError::message(format!(
            "{} cannot be sorted, as it is not an array",
            describe(&other)
        ))),
    }
}

fn sort_by<'a>(f: &'a Expr, ctx: Ctx<'a>, value: Value) -> Result<Value, JQError> {
    let arr = match value {
        Value::Array(arr) => arr,
        other => {
            return Err(JQError::message(format!(
                "{} cannot be sorted, as it is not an array",
                describe(&other)
            )))
        }
    };

    let mut keyed = Vec::with_capacity(arr.len());
    for item in arr {
        let key = Value::Array(collect(eval(f, ctx.clone(), item.clone()))?);
        keyed.push((key, item));
    }

    keyed.sort_by(|(a, _), (b, _)| compare(a, b));
    Ok(keyed.into_iter().map(|(_, item)| item).collect())
}

fn reverse(value: Value) -> Result<Value, JQError> {
    match value {
        Value::Null => Ok(Value::Array(Vec::new())),
        Value::String(s) => Ok(Value::String(s.chars().rev().collect())),
        Value::Array(mut arr) => {
            arr.reverse();
            Ok(Value::Array(arr))
        }
        other => Err(JQError::message(format!(
            "Cannot reverse {}",
            describe(&other)
        ))),
    }
}

fn math(value: Value, name: &str, f: fn(f64) -> f64) -> Result<Value, JQError> {
    match value {
        Value::Number(n) => Ok(value::number(f(value::as_f64(&n)))),
        other => Err(JQError::message(format!(
            "{} number required for {}",
            describe(&other),
            name
        ))),
    }
}

fn to_entries(value: Value) -> Result<Value, JQError> {
    match value {
        Value::Object(obj) => Ok(obj
            .into_iter()
            .map(|(key, value)| {
                let mut entry = Map::new();
                entry.insert("key".to_owned(), Value::String(key));
                entry.insert("value".to_owned(), value);
                Value::Object(entry)
            })
            .collect()),
        other => Err(JQError::message(format!(
            "{} has no keys",
            describe(&other)
        ))),
    }
}

fn from_entries(value: Value) -> Result<Value, JQError> {
    let mut obj = Map::new();

    for entry in elements(value)? {
        let entry = match entry {
            Value::Object(entry) => entry,
            other => {
                return Err(JQError::message(format!(
                    "Cannot use {} as an object entry",
                    describe(&other)
                )))
            }
        };

        let key = ["key", "k", "name", "Name", "Key", "K"]
            .iter()
            .find_map(|k| entry.get(*k).filter(|v| !v.is_null()))
            .cloned()
            .unwrap_or(Value::Null);

        let key = match key {
            Value::String(key) => key,
            Value::Null | Value::Bool(_) | Value::Number(_) => key.to_string(),
            other => {
                return Err(JQError::message(format!(
                    "Cannot use {} as object key",
                    describe(&other)
                )))
            }
        };

        let value = ["value", "v", "Value", "V"]
            .iter()
            .find_map(|k| entry.get(*k))
            .cloned()
            .unwrap_or(Value::Null);

        obj.insert(key, value);
    }

    Ok(Value::Object(obj))
}

fn join(value: &Value, separator: &Value) -> Result<Value, JQError> {
    let Value::String(separator) = separator else {
        return Err(JQError::message(format!(
            "{} is not a valid separator",
            describe(separator)
        )));
    };

    let Value::Array(items) = value else {
        return Err(JQError::message(format!(
            "Cannot iterate over {}",
            describe(value)
        )));
    };

    let mut parts = Vec::with_capacity(items.len());
    for item in items {
        parts.push(match item {
            Value::Null => String::new(),
            Value::String(s) => s.to_owned(),
            Value::Bool(_) | Value::Number(_) => item.to_string(),
            other => {
                return Err(JQError::message(format!(
                    "Cannot join with {}",
                    type_name(other)
                )))
            }
        });
    }

    Ok(Value::String(parts.join(separator)))
}

fn ascii_case(value: Value, f: fn(&str) -> String) -> Result<Value, JQError> {
    match value {
        Value::String(s) => Ok(Value::String(f(&s))),
        other => Err(JQError::message(format!(
            "{} cannot be case converted, as it is not a string",
            describe(&other)
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn every_signature_is_a_builtin() {
        for (name, arity) in SIGNATURES {
            assert!(is_builtin(name, *arity), "{name}/{arity}");
        }
        assert!(!is_builtin("map", 0));
        assert!(!is_builtin("nosuchthing", 0));
    }

    #[test]
    fn from_entries_accepts_alternative_key_names() {
        let entries = json!([{"k": "a", "v": 1}, {"name": "b", "value": 2}, {"key": 3}]);
        assert_eq!(
            from_entries(entries).unwrap(),
            json!({"a": 1, "b": 2, "3": null})
        );
    }

    #[test]
    fn join_converts_scalars() {
        assert_eq!(
            join(&json!(["a", 1, null, true]), &json!("-")).unwrap(),
            json!("a-1--true")
        );
    }

    #[test]
    fn add_folds_with_plus() {
        assert_eq!(add(json!([1, 2, 3])).unwrap(), json!(6));
        assert_eq!(add(json!(["a", "b"])).unwrap(), json!("ab"));
        assert_eq!(add(json!([])).unwrap(), json!(null));
    }

    #[test]
    fn length_of_bool_fails() {
        assert_eq!(
            length(&json!(true)).unwrap_err().msg,
            "boolean (true) has no length"
        );
    }
}
