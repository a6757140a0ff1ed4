use serde_json::Value;

use crate::{errors::QueryError, fetch::Fetcher};

/// Fail unless at most one of `value` and `location` is given. Any value
/// counts as given, including `null`.
pub fn ensure_exclusive(value: Option<&Value>, location: Option<&str>) -> Result<(), QueryError> {
    if value.is_some() && location.is_some() {
        return Err(QueryError::invalid_argument(String::from(
            "'value' and 'location' cannot both be specified",
        )));
    }
    Ok(())
}

/// The value a query runs against: `value` itself, or the document fetched
/// from `location`. With neither, the input is `null`.
pub fn resolve_input(
    value: Option<Value>,
    location: Option<&str>,
    fetcher: &dyn Fetcher,
) -> Result<Value, QueryError> {
    ensure_exclusive(value.as_ref(), location)?;

    match (value, location) {
        (None, Some(location)) => fetcher.fetch(location),
        (value, _) => Ok(value.unwrap_or(Value::Null)),
    }
}
