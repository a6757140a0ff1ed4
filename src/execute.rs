//! Consumption of a compiled query's results.
//!
//! [`Evaluation`] is the cursor over one evaluation. The engine is not asked
//! for anything until the first value is pulled, and once the sequence ends
//! or fails the cursor stays finished. [`all`], [`first`] and [`one`] are
//! built on it and differ only in how many values they pull.

use std::{iter::FusedIterator, mem};

use serde_json::Value;

use crate::{
    engine::{CompiledQuery, Outputs},
    errors::{QueryError, QueryErrorType},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    NotStarted,
    Producing,
    Exhausted,
    Failed,
}

enum State<'q> {
    NotStarted {
        query: &'q dyn CompiledQuery,
        input: Value,
    },
    Producing(Outputs<'q>),
    Exhausted,
    Failed,
}

/// A single pass over the results of evaluating a query against one input.
pub struct Evaluation<'q> {
    state: State<'q>,
    produced: usize,
}

impl<'q> Evaluation<'q> {
    pub fn new(query: &'q dyn CompiledQuery, input: Value) -> Self {
        Self {
            state: State::NotStarted { query, input },
            produced: 0,
        }
    }

    pub fn status(&self) -> Status {
        match self.state {
            State::NotStarted { .. } => Status::NotStarted,
            State::Producing(_) => Status::Producing,
            State::Exhausted => Status::Exhausted,
            State::Failed => Status::Failed,
        }
    }

    /// The number of values pulled so far.
    pub fn produced(&self) -> usize {
        self.produced
    }

    fn start(&mut self) {
        if let State::NotStarted { query, input } = mem::replace(&mut self.state, State::Exhausted)
        {
            self.state = State::Producing(query.evaluate(input));
        }
    }
}

impl<'q> Iterator for Evaluation<'q> {
    type Item = Result<Value, QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if let State::NotStarted { .. } = self.state {
            self.start();
        }

        let State::Producing(outputs) = &mut self.state else {
            return None;
        };

        match outputs.next() {
            Some(Ok(value)) => {
                self.produced += 1;
                Some(Ok(value))
            }
            Some(Err(err)) => {
                self.state = State::Failed;
                tracing::debug!(
                    "evaluation failed after {} value(s): {}",
                    self.produced,
                    err
                );
                Some(Err(match err.kind {
                    QueryErrorType::ScriptRuntimeError => err,
                    _ => QueryError::runtime(err.msg),
                }))
            }
            None => {
                self.state = State::Exhausted;
                None
            }
        }
    }
}

impl FusedIterator for Evaluation<'_> {}

/// Every result, in order. If evaluation fails, values produced before the
/// failure are discarded and the error is returned.
pub fn all(query: &dyn CompiledQuery, input: Value) -> Result<Vec<Value>, QueryError> {
    let mut evaluation = Evaluation::new(query, input);
    let rv: Result<Vec<Value>, QueryError> = evaluation.by_ref().collect();

    if rv.is_err() {
        tracing::debug!(
            "discarding {} partial result(s)",
            evaluation.produced()
        );
    }

    rv
}

/// An alias of [`all`].
pub fn apply(query: &dyn CompiledQuery, input: Value) -> Result<Vec<Value>, QueryError> {
    all(query, input)
}

/// The first result, or `default` if there are none. Never pulls a second
/// value.
pub fn first(query: &dyn CompiledQuery, input: Value, default: Value) -> Result<Value, QueryError> {
    match Evaluation::new(query, input).next() {
        Some(rv) => rv,
        None => Ok(default),
    }
}

/// The only result. Pulls at most two values.
pub fn one(query: &dyn CompiledQuery, input: Value) -> Result<Value, QueryError> {
    let mut evaluation = Evaluation::new(query, input);

    let value = match evaluation.next() {
        Some(rv) => rv?,
        None => {
            return Err(QueryError::cardinality(String::from(
                "expected exactly one result, got none",
            )))
        }
    };

    match evaluation.next() {
        None => Ok(value),
        Some(Err(err)) => Err(err),
        Some(Ok(_)) => Err(QueryError::cardinality(String::from(
            "expected exactly one result, got more than one",
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::cell::Cell;

    /// A query that replays a fixed sequence and counts how it is used.
    struct Scripted {
        items: Vec<Result<Value, QueryError>>,
        evaluations: Cell<usize>,
        pulls: Cell<usize>,
    }

    impl Scripted {
        fn new(items: Vec<Result<Value, QueryError>>) -> Self {
            Self {
                items,
                evaluations: Cell::new(0),
                pulls: Cell::new(0),
            }
        }
    }

    impl CompiledQuery for Scripted {
        fn evaluate<'q>(&'q self, _input: Value) -> Outputs<'q> {
            self.evaluations.set(self.evaluations.get() + 1);
            Box::new(
                self.items
                    .iter()
                    .cloned()
                    .inspect(move |_| self.pulls.set(self.pulls.get() + 1)),
            )
        }
    }

    fn boom() -> Result<Value, QueryError> {
        Err(QueryError::runtime(String::from("boom")))
    }

    #[test]
    fn evaluation_starts_on_first_pull() {
        let query = Scripted::new(vec![Ok(json!(1))]);
        let mut evaluation = Evaluation::new(&query, json!(null));

        assert_eq!(evaluation.status(), Status::NotStarted);
        assert_eq!(query.evaluations.get(), 0);

        assert_eq!(evaluation.next().unwrap().unwrap(), json!(1));
        assert_eq!(evaluation.status(), Status::Producing);
        assert_eq!(query.evaluations.get(), 1);
    }

    #[test]
    fn exhausted_evaluation_stays_exhausted() {
        let query = Scripted::new(vec![Ok(json!(1))]);
        let mut evaluation = Evaluation::new(&query, json!(null));

        assert!(evaluation.next().is_some());
        assert!(evaluation.next().is_none());
        assert_eq!(evaluation.status(), Status::Exhausted);
        assert!(evaluation.next().is_none());
        assert_eq!(query.evaluations.get(), 1);
    }

    #[test]
    fn failed_evaluation_stops_pulling() {
        let query = Scripted::new(vec![Ok(json!(1)), boom(), Ok(json!(3))]);
        let mut evaluation = Evaluation::new(&query, json!(null));

        assert!(evaluation.next().unwrap().is_ok());
        assert!(evaluation.next().unwrap().is_err());
        assert_eq!(evaluation.status(), Status::Failed);
        assert!(evaluation.next().is_none());
        assert_eq!(query.pulls.get(), 2);
        assert_eq!(evaluation.produced(), 1);
    }

    #[test]
    fn engine_errors_are_runtime_errors() {
        let query = Scripted::new(vec![Err(QueryError::decode(String::from("bad")))]);
        let err = all(&query, json!(null)).unwrap_err();
        assert_eq!(err.kind, QueryErrorType::ScriptRuntimeError);
        assert_eq!(err.msg, "bad");
    }

    #[test]
    fn all_collects_in_order() {
        let query = Scripted::new(vec![Ok(json!(1)), Ok(json!(2))]);
        assert_eq!(all(&query, json!(null)).unwrap(), vec![json!(1), json!(2)]);
        assert_eq!(apply(&query, json!(null)).unwrap(), vec![json!(1), json!(2)]);
    }

    #[test]
    fn all_discards_partial_results() {
        let query = Scripted::new(vec![Ok(json!(1)), boom()]);
        let err = all(&query, json!(null)).unwrap_err();
        assert_eq!(err.kind, QueryErrorType::ScriptRuntimeError);
        assert_eq!(err.msg, "boom");
    }

    #[test]
    fn first_pulls_one_value() {
        let query = Scripted::new(vec![Ok(json!(1)), boom()]);
        assert_eq!(first(&query, json!(null), json!(0)).unwrap(), json!(1));
        assert_eq!(query.pulls.get(), 1);
    }

    #[test]
    fn first_of_nothing_is_the_default() {
        let query = Scripted::new(Vec::new());
        assert_eq!(
            first(&query, json!(null), json!("none")).unwrap(),
            json!("none")
        );
    }

    #[test]
    fn first_reports_an_immediate_failure() {
        let query = Scripted::new(vec![boom()]);
        let err = first(&query, json!(null), json!(0)).unwrap_err();
        assert_eq!(err.kind, QueryErrorType::ScriptRuntimeError);
    }

    #[test]
    fn one_of_one() {
        let query = Scripted::new(vec![Ok(json!(3))]);
        assert_eq!(one(&query, json!(null)).unwrap(), json!(3));
    }

    #[test]
    fn one_of_none() {
        let query = Scripted::new(Vec::new());
        let err = one(&query, json!(null)).unwrap_err();
        assert_eq!(err.kind, QueryErrorType::CardinalityError);
        assert_eq!(err.msg, "expected exactly one result, got none");
    }

    #[test]
    fn one_of_many_pulls_two_values() {
        let query = Scripted::new(vec![Ok(json!(1)), Ok(json!(2)), Ok(json!(3)), boom()]);
        let err = one(&query, json!(null)).unwrap_err();
        assert_eq!(err.kind, QueryErrorType::CardinalityError);
        assert_eq!(err.msg, "expected exactly one result, got more than one");
        assert_eq!(query.pulls.get(), 2);
    }

    #[test]
    fn one_reports_failure_of_second_value() {
        let query = Scripted::new(vec![Ok(json!(1)), boom()]);
        let err = one(&query, json!(null)).unwrap_err();
        assert_eq!(err.kind, QueryErrorType::ScriptRuntimeError);
    }
}
