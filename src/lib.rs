//! Run jq-style scripts against JSON values.
//!
//! A script is compiled once into a [`Query`], which can then be evaluated
//! against any number of inputs. Input is either a [`serde_json::Value`]
//! supplied by the caller or a JSON document fetched from a URL.
//!
//! ## One-shot evaluation
//!
//! [`all`], [`first`] and [`one`] compile a script and evaluate it in a
//! single call.
//!
//! ```
//! use rust_jq::{errors::QueryError, Options};
//! use serde_json::json;
//!
//! fn main() -> Result<(), QueryError> {
//!     let data = json!({"a": [1, 2, 3]});
//!
//!     assert_eq!(rust_jq::all(".a[]", Options::from(data.clone()))?, vec![json!(1), json!(2), json!(3)]);
//!     assert_eq!(rust_jq::first(".a[]", json!(0), Options::from(data.clone()))?, json!(1));
//!     assert_eq!(rust_jq::one(".a | length", Options::from(data))?, json!(3));
//!     Ok(())
//! }
//! ```
//!
//! ## Compiled queries
//!
//! Bindings are referenced from the script as `$name`, and library paths are
//! searched for modules named by `include` and `import` directives.
//!
//! ```
//! use rust_jq::errors::QueryError;
//! use serde_json::{json, Map};
//!
//! fn main() -> Result<(), QueryError> {
//!     let mut bindings = Map::new();
//!     bindings.insert("limit".to_owned(), json!(2));
//!
//!     let q = rust_jq::compile("map(select(. > $limit))", bindings, &[])?;
//!
//!     assert_eq!(q.one(json!([1, 2, 3, 4]))?, json!([3, 4]));
//!     assert_eq!(q.one(json!([0, 5]))?, json!([5]));
//!     Ok(())
//! }
//! ```
//!
//! ## Remote input
//!
//! With [`Options::location`], the input document is fetched with a blocking
//! HTTP `GET`. The response body is decoded using the charset named in its
//! `Content-Type` header, or UTF-8 if there isn't one. Use
//! [`Environment::with_fetcher`] or [`Options::fetcher`] to fetch documents
//! some other way.
//!
//! ```no_run
//! use rust_jq::Options;
//! use serde_json::json;
//!
//! let names = rust_jq::all(
//!     ".[].name",
//!     Options::new().location("https://example.com/people.json"),
//! );
//! ```
use std::path::PathBuf;

use serde_json::{Map, Value};

pub mod compile;
pub mod engine;
pub mod env;
pub mod errors;
pub mod execute;
pub mod fetch;
pub mod input;
pub mod options;
pub mod query;

pub use engine::{CompiledQuery, Engine, PestEngine};
pub use env::Environment;
pub use errors::{QueryError, QueryErrorType};
pub use execute::{Evaluation, Status};
pub use fetch::{Fetcher, HttpFetcher};
pub use options::Options;
pub use query::Query;

/// Compile `script` with the default engine.
pub fn compile<S: AsRef<[u8]>>(
    script: S,
    bindings: Map<String, Value>,
    library_paths: &[PathBuf],
) -> Result<Query, QueryError> {
    compile::compile(&PestEngine, script, bindings, library_paths)
}

/// Every result of `script`, in order.
pub fn all<S: AsRef<[u8]>>(script: S, options: Options) -> Result<Vec<Value>, QueryError> {
    Environment::new().all(script, options)
}

/// Same as [`all`].
pub fn apply<S: AsRef<[u8]>>(script: S, options: Options) -> Result<Vec<Value>, QueryError> {
    Environment::new().apply(script, options)
}

/// The first result of `script`, or `default` if there are none. Results
/// after the first are never computed.
pub fn first<S: AsRef<[u8]>>(
    script: S,
    default: Value,
    options: Options,
) -> Result<Value, QueryError> {
    Environment::new().first(script, default, options)
}

/// The only result of `script`. Zero results, or more than one, is a
/// [`QueryErrorType::CardinalityError`].
pub fn one<S: AsRef<[u8]>>(script: S, options: Options) -> Result<Value, QueryError> {
    Environment::new().one(script, options)
}
