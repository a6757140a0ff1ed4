use std::{fmt, path::PathBuf};

use serde_json::{Map, Value};

use crate::fetch::Fetcher;

/// Per-call configuration for [`all`](crate::all), [`first`](crate::first),
/// [`one`](crate::one) and their [`Environment`](crate::Environment)
/// counterparts.
///
/// At most one of `value` and `location` may be set. With neither, the query
/// runs against `null`.
#[derive(Default)]
pub struct Options {
    pub value: Option<Value>,
    pub location: Option<String>,
    pub bindings: Map<String, Value>,
    pub library_paths: Vec<PathBuf>,
    /// Overrides the environment's fetcher for this call.
    pub fetcher: Option<Box<dyn Fetcher>>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Bind `$name` to `value`, replacing any earlier binding of the same name.
    pub fn binding(mut self, name: impl Into<String>, value: Value) -> Self {
        self.bindings.insert(name.into(), value);
        self
    }

    pub fn bindings(mut self, bindings: Map<String, Value>) -> Self {
        self.bindings = bindings;
        self
    }

    /// Append a directory to the module search path.
    pub fn library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.library_paths.push(path.into());
        self
    }

    pub fn library_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.library_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn fetcher<F: Fetcher + 'static>(mut self, fetcher: F) -> Self {
        self.fetcher = Some(Box::new(fetcher));
        self
    }
}

impl From<Value> for Options {
    fn from(value: Value) -> Self {
        Self::new().value(value)
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("value", &self.value)
            .field("location", &self.location)
            .field("bindings", &self.bindings)
            .field("library_paths", &self.library_paths)
            .field("fetcher", &self.fetcher.as_ref().map(|_| ".."))
            .finish()
    }
}
