//! An engine and a fetcher bound together.

use std::path::PathBuf;

use serde_json::{Map, Value};

use crate::{
    compile,
    engine::{Engine, PestEngine},
    errors::QueryError,
    fetch::{Fetcher, HttpFetcher},
    input::{ensure_exclusive, resolve_input},
    options::Options,
    query::Query,
};

/// Compiles scripts with its [`Engine`] and fetches remote input with its
/// [`Fetcher`].
///
/// The default environment uses [`PestEngine`] and [`HttpFetcher`].
pub struct Environment {
    engine: Box<dyn Engine>,
    fetcher: Box<dyn Fetcher>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            engine: Box::new(PestEngine),
            fetcher: Box::new(HttpFetcher::new()),
        }
    }

    pub fn with_engine<E: Engine + 'static>(mut self, engine: E) -> Self {
        self.engine = Box::new(engine);
        self
    }

    pub fn with_fetcher<F: Fetcher + 'static>(mut self, fetcher: F) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    pub fn compile<S: AsRef<[u8]>>(
        &self,
        script: S,
        bindings: Map<String, Value>,
        library_paths: &[PathBuf],
    ) -> Result<Query, QueryError> {
        compile::compile(self.engine.as_ref(), script, bindings, library_paths)
    }

    pub fn all<S: AsRef<[u8]>>(&self, script: S, options: Options) -> Result<Vec<Value>, QueryError> {
        let (query, input) = self.prepare(script, options)?;
        query.all(input)
    }

    pub fn apply<S: AsRef<[u8]>>(
        &self,
        script: S,
        options: Options,
    ) -> Result<Vec<Value>, QueryError> {
        let (query, input) = self.prepare(script, options)?;
        query.apply(input)
    }

    pub fn first<S: AsRef<[u8]>>(
        &self,
        script: S,
        default: Value,
        options: Options,
    ) -> Result<Value, QueryError> {
        let (query, input) = self.prepare(script, options)?;
        query.first(input, default)
    }

    pub fn one<S: AsRef<[u8]>>(&self, script: S, options: Options) -> Result<Value, QueryError> {
        let (query, input) = self.prepare(script, options)?;
        query.one(input)
    }

    /// Reject conflicting input options, then compile, then resolve the
    /// input. Nothing is fetched for a script that fails to compile.
    fn prepare<S: AsRef<[u8]>>(
        &self,
        script: S,
        options: Options,
    ) -> Result<(Query, Value), QueryError> {
        let Options {
            value,
            location,
            bindings,
            library_paths,
            fetcher,
        } = options;

        ensure_exclusive(value.as_ref(), location.as_deref())?;

        let query = self.compile(script, bindings, &library_paths)?;
        let fetcher = fetcher.as_deref().unwrap_or(self.fetcher.as_ref());
        let input = resolve_input(value, location.as_deref(), fetcher)?;

        Ok((query, input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::QueryErrorType;
    use serde_json::json;
    use std::{cell::Cell, rc::Rc};

    fn counting_fetcher(calls: Rc<Cell<usize>>) -> impl Fn(&str) -> Result<Value, QueryError> {
        move |_: &str| {
            calls.set(calls.get() + 1);
            Ok(json!({"a": 41}))
        }
    }

    #[test]
    fn environment_fetcher_is_used_for_locations() {
        let calls = Rc::new(Cell::new(0));
        let env = Environment::new().with_fetcher(counting_fetcher(calls.clone()));

        let rv = env
            .one(".a + 1", Options::new().location("https://example.com/doc.json"))
            .unwrap();

        assert_eq!(rv, json!(42));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn options_fetcher_overrides_environment_fetcher() {
        let env_calls = Rc::new(Cell::new(0));
        let call_calls = Rc::new(Cell::new(0));
        let env = Environment::new().with_fetcher(counting_fetcher(env_calls.clone()));

        let options = Options::new()
            .location("https://example.com/doc.json")
            .fetcher(counting_fetcher(call_calls.clone()));

        assert_eq!(env.all(".a", options).unwrap(), vec![json!(41)]);
        assert_eq!(env_calls.get(), 0);
        assert_eq!(call_calls.get(), 1);
    }

    #[test]
    fn compile_errors_skip_the_fetch() {
        let calls = Rc::new(Cell::new(0));
        let env = Environment::new().with_fetcher(counting_fetcher(calls.clone()));

        let err = env
            .all(".a +", Options::new().location("https://example.com/doc.json"))
            .unwrap_err();

        assert_eq!(err.kind, QueryErrorType::CompileError);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn conflicting_input_skips_compile_and_fetch() {
        let calls = Rc::new(Cell::new(0));
        let env = Environment::new().with_fetcher(counting_fetcher(calls.clone()));

        let options = Options::new()
            .value(json!(1))
            .location("https://example.com/doc.json");

        // An uncompilable script still reports the conflict.
        let err = env.all(".a +", options).unwrap_err();
        assert_eq!(err.kind, QueryErrorType::InvalidArgument);
        assert_eq!(calls.get(), 0);
    }
}
