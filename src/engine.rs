//! The boundary between query orchestration and the engine that actually
//! understands the query language.
//!
//! An [`Engine`] turns a script into a [`CompiledQuery`]. A compiled query
//! evaluates to a lazy sequence of results. Nothing else in this crate knows
//! how scripts are parsed or run, so any engine implementing these two traits
//! can be swapped in with [`Environment::with_engine`](crate::Environment::with_engine).

use std::path::PathBuf;

use jq_pest::Program;
use serde_json::{Map, Value};

use crate::errors::QueryError;

/// A lazy sequence of query results, borrowing the query that produced it.
pub type Outputs<'q> = Box<dyn Iterator<Item = Result<Value, QueryError>> + 'q>;

pub trait CompiledQuery {
    /// Start evaluating against `input`. Implementations must not compute
    /// results until they are pulled, and must not keep state between calls.
    fn evaluate<'q>(&'q self, input: Value) -> Outputs<'q>;
}

pub trait Engine {
    fn compile(
        &self,
        script: &str,
        bindings: Map<String, Value>,
        library_paths: &[PathBuf],
    ) -> Result<Box<dyn CompiledQuery>, QueryError>;
}

/// The default engine, backed by [`jq_pest`].
#[derive(Debug, Default, Clone, Copy)]
pub struct PestEngine;

impl Engine for PestEngine {
    fn compile(
        &self,
        script: &str,
        bindings: Map<String, Value>,
        library_paths: &[PathBuf],
    ) -> Result<Box<dyn CompiledQuery>, QueryError> {
        let program = Program::compile(script, bindings, library_paths)?;
        tracing::trace!("compiled program {}", program);
        Ok(Box::new(program))
    }
}

impl CompiledQuery for Program {
    fn evaluate<'q>(&'q self, input: Value) -> Outputs<'q> {
        Box::new(self.run(input).map(|rv| rv.map_err(QueryError::from)))
    }
}
