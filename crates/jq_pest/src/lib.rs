//! A small jq engine built on [pest].
//!
//! ```
//! use jq_pest::Program;
//! use serde_json::json;
//!
//! let program = Program::standard("[.[] | select(. > 1)]").unwrap();
//! let results: Result<Vec<_>, _> = program.run(json!([1, 2, 3])).collect();
//!
//! assert_eq!(results.unwrap(), vec![json!([2, 3])]);
//! ```
//!
//! Evaluation is lazy. Pulling the first value of `range(1e9)` does not
//! compute the rest.
//!
//! [pest]: https://pest.rs/

pub mod ast;
pub mod builtins;
pub mod check;
pub mod errors;
pub mod eval;
pub mod module;
pub mod parser;
pub mod program;
pub mod unescape;
pub mod value;

pub use errors::JQError;
pub use errors::JQErrorType;
pub use eval::Outputs;
pub use parser::JQParser;
pub use program::Program;
