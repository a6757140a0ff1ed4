use std::fmt;

use serde_json::{Map, Value};

use crate::{
    compile::compile,
    engine::{CompiledQuery, PestEngine},
    errors::QueryError,
    execute::{self, Evaluation},
};

/// A compiled script, ready to be evaluated against any number of inputs.
///
/// A `Query` holds no state from one evaluation to the next.
pub struct Query {
    compiled: Box<dyn CompiledQuery>,
}

impl Query {
    pub fn new(compiled: Box<dyn CompiledQuery>) -> Self {
        Query { compiled }
    }

    /// Compile `script` with the default engine, without bindings or library
    /// paths.
    pub fn standard(script: &str) -> Result<Self, QueryError> {
        compile(&PestEngine, script, Map::new(), &[])
    }

    /// A lazy cursor over the results of evaluating this query against
    /// `input`.
    pub fn evaluate(&self, input: Value) -> Evaluation<'_> {
        Evaluation::new(self.compiled.as_ref(), input)
    }

    pub fn all(&self, input: Value) -> Result<Vec<Value>, QueryError> {
        execute::all(self.compiled.as_ref(), input)
    }

    pub fn apply(&self, input: Value) -> Result<Vec<Value>, QueryError> {
        execute::apply(self.compiled.as_ref(), input)
    }

    pub fn first(&self, input: Value, default: Value) -> Result<Value, QueryError> {
        execute::first(self.compiled.as_ref(), input, default)
    }

    pub fn one(&self, input: Value) -> Result<Value, QueryError> {
        execute::one(self.compiled.as_ref(), input)
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query").finish_non_exhaustive()
    }
}
