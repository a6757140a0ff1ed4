use std::{fmt, path::PathBuf};

use lazy_static::lazy_static;
use serde_json::{Map, Value};

use crate::{
    ast::{Expr, FuncDef},
    check::check_program,
    errors::JQError,
    eval::{eval, Outputs, Scope},
    module::ModuleLoader,
    parser::JQParser,
};

lazy_static! {
    static ref PARSER: JQParser = JQParser::new();
}

/// A compiled jq program: its syntax tree, the definitions brought in by its
/// modules, and the values bound to its global variables.
///
/// A `Program` is immutable. Each call to [`Program::run`] starts from a
/// fresh scope, so runs never observe each other.
#[derive(Debug, Clone)]
pub struct Program {
    pub defs: Vec<FuncDef>,
    pub body: Expr,
    pub bindings: Map<String, Value>,
}

impl Program {
    /// Parse `script`, load its modules from `library_paths` and check that
    /// every name it uses is defined.
    pub fn compile(
        script: &str,
        bindings: Map<String, Value>,
        library_paths: &[PathBuf],
    ) -> Result<Self, JQError> {
        let parsed = PARSER.parse(script)?;
        let defs = ModuleLoader::new(library_paths).load(&parsed.directives)?;
        check_program(&defs, &parsed.body, &bindings)?;

        Ok(Program {
            defs,
            body: parsed.body,
            bindings,
        })
    }

    /// Compile `script` with no bindings and no library paths.
    pub fn standard(script: &str) -> Result<Self, JQError> {
        Self::compile(script, Map::new(), &[])
    }

    /// Evaluate the program against `input`. Values are produced on demand.
    pub fn run(&self, input: Value) -> Outputs<'_> {
        let ctx = self
            .defs
            .iter()
            .fold(Scope::global(&self.bindings), |ctx, def| {
                Scope::with_def(&ctx, def)
            });

        eval(&self.body, ctx, input)
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.body)
    }
}
