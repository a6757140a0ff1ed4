//! Compile time name resolution. Every `$name` must be bound and every call
//! must resolve to a definition or a builtin with a matching arity.

use serde_json::{Map, Value};

use crate::{
    ast::{Expr, FuncDef},
    builtins::is_builtin,
    errors::JQError,
};

#[derive(Debug, Default)]
struct Scope<'e> {
    vars: Vec<&'e str>,
    defs: Vec<(&'e str, usize)>,
}

impl<'e> Scope<'e> {
    fn has_var(&self, name: &str) -> bool {
        self.vars.iter().any(|v| *v == name)
    }

    fn has_def(&self, name: &str, arity: usize) -> bool {
        self.defs.iter().any(|(n, a)| *n == name && *a == arity)
    }
}

/// Check `body`, preceded by top level `defs`, with `globals` bound as
/// variables.
pub fn check_program(
    defs: &[FuncDef],
    body: &Expr,
    globals: &Map<String, Value>,
) -> Result<(), JQError> {
    let mut scope = Scope {
        vars: globals.keys().map(String::as_str).collect(),
        defs: Vec::new(),
    };

    for def in defs {
        check_def(def, &mut scope)?;
    }

    check(body, &mut scope)
}

/// Check a definition and leave it in scope. A function is visible to its
/// own body.
fn check_def<'e>(def: &'e FuncDef, scope: &mut Scope<'e>) -> Result<(), JQError> {
    scope.defs.push((def.name.as_str(), def.arity()));

    let depth = scope.vars.len();
    scope.vars.extend(def.params.iter().map(String::as_str));
    let rv = check(&def.body, scope);
    scope.vars.truncate(depth);

    rv
}

fn check<'e>(expr: &'e Expr, scope: &mut Scope<'e>) -> Result<(), JQError> {
    match expr {
        Expr::Var { name } => {
            if scope.has_var(name) {
                Ok(())
            } else {
                Err(JQError::name(format!("${name} is not defined")))
            }
        }
        Expr::Call { name, args } => {
            for arg in args {
                check(arg, scope)?;
            }

            if scope.has_def(name, args.len()) || is_builtin(name, args.len()) {
                Ok(())
            } else {
                Err(JQError::name(format!("{}/{} is not defined", name, args.len())))
            }
        }
        Expr::Bind { source, name, body } => {
            check(source, scope)?;
            scope.vars.push(name);
            let rv = check(body, scope);
            scope.vars.pop();
            rv
        }
        Expr::Reduce {
            source,
            name,
            init,
            update,
        } => {
            check(source, scope)?;
            check(init, scope)?;
            scope.vars.push(name);
            let rv = check(update, scope);
            scope.vars.pop();
            rv
        }
        Expr::Def { def, rest } => {
            let depth = scope.defs.len();
            let rv = check_def(def, scope).and_then(|_| check(rest, scope));
            scope.defs.truncate(depth);
            rv
        }
        _ => expr
            .children()
            .into_iter()
            .try_for_each(|child| check(child, scope)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::JQErrorType, parser::JQParser};
    use serde_json::json;

    fn check_script(script: &str, globals: Map<String, Value>) -> Result<(), JQError> {
        let program = JQParser::new().parse(script)?;
        check_program(&[], &program.body, &globals)
    }

    #[test]
    fn bound_variables_are_visible_in_body() {
        assert!(check_script(". as $x | $x", Map::new()).is_ok());
        assert!(check_script("reduce .[] as $x (0; . + $x)", Map::new()).is_ok());
    }

    #[test]
    fn bound_variables_do_not_leak() {
        let err = check_script("(. as $x | $x), $x", Map::new()).unwrap_err();
        assert_eq!(err.kind, JQErrorType::NameError);
        assert_eq!(err.msg, "$x is not defined");
    }

    #[test]
    fn reduce_variable_is_not_visible_in_init() {
        let err = check_script("reduce .[] as $x ($x; .)", Map::new()).unwrap_err();
        assert_eq!(err.msg, "$x is not defined");
    }

    #[test]
    fn globals_are_visible() {
        let globals = Map::from_iter([("name".to_owned(), json!("x"))]);
        assert!(check_script("$name", globals).is_ok());
    }

    #[test]
    fn recursive_definitions_resolve() {
        let script = "def f($n): if $n > 0 then f($n - 1) else . end; f(3)";
        assert!(check_script(script, Map::new()).is_ok());
    }

    #[test]
    fn arity_must_match() {
        let err = check_script("def f($a): $a; f", Map::new()).unwrap_err();
        assert_eq!(err.msg, "f/0 is not defined");
    }

    #[test]
    fn definitions_are_scoped_to_their_pipe() {
        let err = check_script("(def f: 1; f), f", Map::new()).unwrap_err();
        assert_eq!(err.msg, "f/0 is not defined");
    }
}
