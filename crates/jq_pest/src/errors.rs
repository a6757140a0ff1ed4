use std::fmt;

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JQErrorType {
    SyntaxError,
    NameError,
    ModuleError,
    RuntimeError,
}

/// An error raised while compiling or running a jq program.
///
/// Runtime errors carry the value given to `error`, which is what a `catch`
/// handler receives. For every other kind `value` is the message as a string.
#[derive(Debug, Clone)]
pub struct JQError {
    pub kind: JQErrorType,
    pub msg: String,
    pub value: Value,
}

impl JQError {
    pub fn new(kind: JQErrorType, msg: String) -> Self {
        Self {
            kind,
            value: Value::String(msg.clone()),
            msg,
        }
    }

    pub fn syntax(msg: String) -> Self {
        Self::new(JQErrorType::SyntaxError, msg)
    }

    pub fn name(msg: String) -> Self {
        Self::new(JQErrorType::NameError, msg)
    }

    pub fn module(msg: String) -> Self {
        Self::new(JQErrorType::ModuleError, msg)
    }

    /// A runtime error with a plain message, as raised by builtins.
    pub fn message(msg: String) -> Self {
        Self::new(JQErrorType::RuntimeError, msg)
    }

    /// A runtime error raised by `error(value)`.
    pub fn runtime(value: Value) -> Self {
        let msg = match &value {
            Value::String(s) => s.to_owned(),
            other => format!("{} (not a string)", other),
        };

        Self {
            kind: JQErrorType::RuntimeError,
            msg,
            value,
        }
    }

    pub fn is_runtime(&self) -> bool {
        self.kind == JQErrorType::RuntimeError
    }

    pub fn into_value(self) -> Value {
        self.value
    }
}

impl fmt::Display for JQErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JQErrorType::SyntaxError => f.write_str("syntax error:"),
            JQErrorType::NameError => f.write_str("name error:"),
            JQErrorType::ModuleError => f.write_str("module error:"),
            JQErrorType::RuntimeError => f.write_str("runtime error:"),
        }
    }
}

impl std::error::Error for JQError {}

impl fmt::Display for JQError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind, self.msg)
    }
}
