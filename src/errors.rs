use std::fmt;

use jq_pest::JQError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryErrorType {
    /// Conflicting or malformed caller arguments, detected before any work.
    InvalidArgument,
    /// Script bytes that are not valid UTF-8.
    EncodingError,
    CompileError,
    FetchError,
    DecodeError,
    ScriptRuntimeError,
    /// `one` found zero results, or more than one.
    CardinalityError,
}

#[derive(Debug, Clone)]
pub struct QueryError {
    pub kind: QueryErrorType,
    pub msg: String,
}

impl QueryError {
    pub fn new(kind: QueryErrorType, msg: String) -> Self {
        Self { kind, msg }
    }

    pub fn invalid_argument(msg: String) -> Self {
        Self::new(QueryErrorType::InvalidArgument, msg)
    }

    pub fn encoding(msg: String) -> Self {
        Self::new(QueryErrorType::EncodingError, msg)
    }

    pub fn compile(msg: String) -> Self {
        Self::new(QueryErrorType::CompileError, msg)
    }

    pub fn fetch(msg: String) -> Self {
        Self::new(QueryErrorType::FetchError, msg)
    }

    pub fn decode(msg: String) -> Self {
        Self::new(QueryErrorType::DecodeError, msg)
    }

    pub fn runtime(msg: String) -> Self {
        Self::new(QueryErrorType::ScriptRuntimeError, msg)
    }

    pub fn cardinality(msg: String) -> Self {
        Self::new(QueryErrorType::CardinalityError, msg)
    }
}

impl fmt::Display for QueryErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryErrorType::InvalidArgument => f.write_str("invalid argument:"),
            QueryErrorType::EncodingError => f.write_str("encoding error:"),
            QueryErrorType::CompileError => f.write_str("compile error:"),
            QueryErrorType::FetchError => f.write_str("fetch error:"),
            QueryErrorType::DecodeError => f.write_str("decode error:"),
            QueryErrorType::ScriptRuntimeError => f.write_str("runtime error:"),
            QueryErrorType::CardinalityError => f.write_str("cardinality error:"),
        }
    }
}

impl std::error::Error for QueryError {}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.msg)
    }
}

/// Engine errors raised while evaluating become runtime errors; everything
/// else the engine reports happens at compile time.
impl From<JQError> for QueryError {
    fn from(err: JQError) -> Self {
        if err.is_runtime() {
            QueryError::runtime(err.msg)
        } else {
            QueryError::compile(err.to_string())
        }
    }
}
