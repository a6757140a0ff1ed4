//! A lazy evaluator for the jq syntax tree.
//!
//! Every expression evaluates to an [`Outputs`] iterator. Nothing is computed
//! until a value is pulled, so consumers that stop early never force the rest
//! of a sequence, including any error it would have raised.

use std::{iter, rc::Rc};

use serde_json::{Map, Value};

use crate::{
    ast::{ComparisonOperator, Expr, FuncDef, LogicalOperator, ObjectKey},
    builtins,
    errors::JQError,
    value::{self, compare, is_truthy, type_name},
};

pub type ValueResult = Result<Value, JQError>;
pub type Outputs<'a> = Box<dyn Iterator<Item = ValueResult> + 'a>;
pub type Ctx<'a> = Rc<Scope<'a>>;

/// Calls to user defined functions nest no deeper than this.
pub const MAX_CALL_DEPTH: usize = 256;

/// One link in the chain of lexical scopes. Lookups walk towards the root,
/// which holds the program's global variable bindings.
pub enum Scope<'a> {
    Global {
        bindings: &'a Map<String, Value>,
    },
    Var {
        name: &'a str,
        value: Value,
        parent: Ctx<'a>,
    },
    Def {
        def: &'a FuncDef,
        parent: Ctx<'a>,
    },
    /// Marks the body of a function call, `depth` calls deep.
    Frame {
        depth: usize,
        parent: Ctx<'a>,
    },
}

impl<'a> Scope<'a> {
    pub fn global(bindings: &'a Map<String, Value>) -> Ctx<'a> {
        Rc::new(Scope::Global { bindings })
    }

    pub fn with_var(parent: &Ctx<'a>, name: &'a str, value: Value) -> Ctx<'a> {
        Rc::new(Scope::Var {
            name,
            value,
            parent: parent.clone(),
        })
    }

    pub fn with_def(parent: &Ctx<'a>, def: &'a FuncDef) -> Ctx<'a> {
        Rc::new(Scope::Def {
            def,
            parent: parent.clone(),
        })
    }

    pub fn frame(parent: &Ctx<'a>, depth: usize) -> Ctx<'a> {
        Rc::new(Scope::Frame {
            depth,
            parent: parent.clone(),
        })
    }
}

/// The depth of the innermost function call enclosing `ctx`.
fn call_depth(ctx: &Ctx<'_>) -> usize {
    let mut scope = ctx.clone();
    loop {
        let next = match &*scope {
            Scope::Frame { depth, .. } => return *depth,
            Scope::Var { parent, .. } | Scope::Def { parent, .. } => parent.clone(),
            Scope::Global { .. } => return 0,
        };
        scope = next;
    }
}

fn lookup_var(ctx: &Ctx<'_>, name: &str) -> Option<Value> {
    let mut scope = ctx.clone();
    loop {
        let next = match &*scope {
            Scope::Var {
                name: n, value, ..
            } if *n == name => return Some(value.clone()),
            Scope::Var { parent, .. } | Scope::Def { parent, .. } | Scope::Frame { parent, .. } => {
                parent.clone()
            }
            Scope::Global { bindings } => return bindings.get(name).cloned(),
        };
        scope = next;
    }
}

/// Find the innermost definition of `name/arity`, along with the scope it was
/// defined in.
fn lookup_def<'a>(ctx: &Ctx<'a>, name: &str, arity: usize) -> Option<(&'a FuncDef, Ctx<'a>)> {
    let mut scope = ctx.clone();
    loop {
        let next = match &*scope {
            Scope::Def { def, .. } if def.name == name && def.arity() == arity => {
                return Some((*def, scope.clone()))
            }
            Scope::Var { parent, .. } | Scope::Def { parent, .. } | Scope::Frame { parent, .. } => {
                parent.clone()
            }
            Scope::Global { .. } => return None,
        };
        scope = next;
    }
}

pub fn once<'a>(value: Value) -> Outputs<'a> {
    Box::new(iter::once(Ok(value)))
}

pub fn fail<'a>(err: JQError) -> Outputs<'a> {
    Box::new(iter::once(Err(err)))
}

pub fn empty<'a>() -> Outputs<'a> {
    Box::new(iter::empty())
}

/// Postpone building an output sequence until its first value is pulled.
pub fn defer<'a, F>(f: F) -> Outputs<'a>
where
    F: FnOnce() -> Outputs<'a> + 'a,
{
    Box::new(iter::once_with(f).flatten())
}

/// Feed every value of `outputs` to `f`, concatenating the results. Errors
/// pass through unchanged.
pub fn then<'a, F>(outputs: Outputs<'a>, mut f: F) -> Outputs<'a>
where
    F: FnMut(Value) -> Outputs<'a> + 'a,
{
    Box::new(outputs.flat_map(move |result| match result {
        Ok(value) => f(value),
        Err(err) => fail(err),
    }))
}

pub fn map<'a, F>(outputs: Outputs<'a>, mut f: F) -> Outputs<'a>
where
    F: FnMut(Value) -> ValueResult + 'a,
{
    Box::new(outputs.map(move |result| result.and_then(&mut f)))
}

/// Collect a sequence eagerly, stopping at the first error.
pub fn collect(outputs: Outputs<'_>) -> Result<Vec<Value>, JQError> {
    outputs.collect()
}

pub fn eval<'a>(expr: &'a Expr, ctx: Ctx<'a>, input: Value) -> Outputs<'a> {
    match expr {
        Expr::Identity => once(input),
        Expr::RecurseDefault => recurse(input),
        Expr::Literal { value } => once(value.clone()),
        Expr::Index { target, key } => {
            let keys = eval(key, ctx.clone(), input.clone());
            then(keys, move |key| {
                map(eval(target, ctx.clone(), input.clone()), move |value| {
                    value::index(&value, &key)
                })
            })
        }
        Expr::Slice { target, from, to } => {
            let bound = |slot: &'a Option<Box<Expr>>, ctx: &Ctx<'a>, input: &Value| match slot {
                Some(expr) => eval(expr, ctx.clone(), input.clone()),
                None => once(Value::Null),
            };

            then(bound(to, &ctx, &input), move |to_value| {
                let ctx = ctx.clone();
                let input = input.clone();
                then(bound(from, &ctx, &input), move |from_value| {
                    let to_value = to_value.clone();
                    map(eval(target, ctx.clone(), input.clone()), move |value| {
                        value::slice(&value, &from_value, &to_value)
                    })
                })
            })
        }
        Expr::Iterate { target } => then(eval(target, ctx, input), iterate),
        Expr::Optional { expr } => {
            Box::new(TryCatch::new(eval(expr, ctx.clone(), input), None, ctx))
        }
        Expr::Array { expr: None } => once(Value::Array(Vec::new())),
        Expr::Array { expr: Some(expr) } => defer(move || match collect(eval(expr, ctx, input)) {
            Ok(values) => once(Value::Array(values)),
            Err(err) => fail(err),
        }),
        Expr::Object { entries } => build_object(entries, ctx, input, Map::new()),
        Expr::Negate { expr } => map(eval(expr, ctx, input), value::negate),
        Expr::Pipe { left, right } => then(eval(left, ctx.clone(), input), move |value| {
            eval(right, ctx.clone(), value)
        }),
        Expr::Comma { left, right } => Box::new(
            eval(left, ctx.clone(), input.clone()).chain(defer(move || eval(right, ctx, input))),
        ),
        Expr::Arithmetic {
            left,
            operator,
            right,
        } => {
            let operator = *operator;
            then(eval(right, ctx.clone(), input.clone()), move |r| {
                map(eval(left, ctx.clone(), input.clone()), move |l| {
                    value::arithmetic(operator, l, r.clone())
                })
            })
        }
        Expr::Comparison {
            left,
            operator,
            right,
        } => {
            let operator = *operator;
            then(eval(right, ctx.clone(), input.clone()), move |r| {
                map(eval(left, ctx.clone(), input.clone()), move |l| {
                    Ok(Value::Bool(compare_with(operator, &l, &r)))
                })
            })
        }
        Expr::Logical {
            left,
            operator,
            right,
        } => {
            let operator = *operator;
            then(eval(left, ctx.clone(), input.clone()), move |l| {
                match (operator, is_truthy(&l)) {
                    (LogicalOperator::And, false) => once(Value::Bool(false)),
                    (LogicalOperator::Or, true) => once(Value::Bool(true)),
                    _ => map(eval(right, ctx.clone(), input.clone()), |r| {
                        Ok(Value::Bool(is_truthy(&r)))
                    }),
                }
            })
        }
        Expr::Alternative { left, right } => Box::new(Alternative {
            left: eval(left, ctx.clone(), input.clone()),
            right: right.as_ref(),
            ctx,
            input: Some(input),
            found: false,
            fallback: None,
        }),
        Expr::If {
            cond,
            then: consequence,
            otherwise,
        } => then(eval(cond, ctx.clone(), input.clone()), move |c| {
            if is_truthy(&c) {
                eval(consequence, ctx.clone(), input.clone())
            } else {
                match otherwise {
                    Some(otherwise) => eval(otherwise, ctx.clone(), input.clone()),
                    None => once(input.clone()),
                }
            }
        }),
        Expr::Try { body, catch } => Box::new(TryCatch::new(
            eval(body, ctx.clone(), input),
            catch.as_deref(),
            ctx,
        )),
        Expr::Reduce {
            source,
            name,
            init,
            update,
        } => then(eval(init, ctx.clone(), input.clone()), move |acc| {
            let ctx = ctx.clone();
            let input = input.clone();
            defer(move || reduce(source, name, update, ctx, input, acc))
        }),
        Expr::Bind { source, name, body } => {
            then(eval(source, ctx.clone(), input.clone()), move |value| {
                eval(body, Scope::with_var(&ctx, name, value), input.clone())
            })
        }
        Expr::Var { name } => match lookup_var(&ctx, name) {
            Some(value) => once(value),
            None => fail(JQError::message(format!("${name} is not defined"))),
        },
        Expr::Call { name, args } => match lookup_def(&ctx, name, args.len()) {
            Some((def, scope)) => defer(move || call_def(def, scope, args, ctx, input)),
            None => builtins::call(name, args, ctx, input),
        },
        Expr::Def { def, rest } => eval(rest, Scope::with_def(&ctx, def), input),
    }
}

fn compare_with(operator: ComparisonOperator, left: &Value, right: &Value) -> bool {
    let ordering = compare(left, right);
    match operator {
        ComparisonOperator::Eq => ordering.is_eq(),
        ComparisonOperator::Ne => ordering.is_ne(),
        ComparisonOperator::Lt => ordering.is_lt(),
        ComparisonOperator::Le => ordering.is_le(),
        ComparisonOperator::Gt => ordering.is_gt(),
        ComparisonOperator::Ge => ordering.is_ge(),
    }
}

/// `.[]`
pub fn iterate<'a>(value: Value) -> Outputs<'a> {
    match value {
        Value::Array(arr) => Box::new(arr.into_iter().map(Ok)),
        Value::Object(obj) => Box::new(obj.into_iter().map(|(_, v)| Ok(v))),
        other => fail(JQError::message(format!(
            "Cannot iterate over {}",
            value::describe(&other)
        ))),
    }
}

fn build_object<'a>(
    entries: &'a [(ObjectKey, Expr)],
    ctx: Ctx<'a>,
    input: Value,
    partial: Map<String, Value>,
) -> Outputs<'a> {
    let Some(((key, value), rest)) = entries.split_first() else {
        return once(Value::Object(partial));
    };

    let keys = match key {
        ObjectKey::Name { name } => once(Value::String(name.to_owned())),
        ObjectKey::Expr { expr } => eval(expr, ctx.clone(), input.clone()),
    };

    then(keys, move |key| {
        let key = match key {
            Value::String(key) => key,
            other => {
                return fail(JQError::message(format!(
                    "Object keys must be strings, not {}",
                    type_name(&other)
                )))
            }
        };

        let ctx = ctx.clone();
        let input = input.clone();
        let partial = partial.clone();

        then(eval(value, ctx.clone(), input.clone()), move |value| {
            let mut obj = partial.clone();
            obj.insert(key.clone(), value);
            build_object(rest, ctx.clone(), input.clone(), obj)
        })
    })
}

fn reduce<'a>(
    source: &'a Expr,
    name: &'a str,
    update: &'a Expr,
    ctx: Ctx<'a>,
    input: Value,
    init: Value,
) -> Outputs<'a> {
    let mut acc = init;

    for item in eval(source, ctx.clone(), input) {
        let item = match item {
            Ok(item) => item,
            Err(err) => return fail(err),
        };

        let mut last = Value::Null;
        for result in eval(update, Scope::with_var(&ctx, name, item), acc) {
            match result {
                Ok(value) => last = value,
                Err(err) => return fail(err),
            }
        }
        acc = last;
    }

    once(acc)
}

/// Call a user defined function. Arguments are evaluated in the caller's
/// scope against the caller's input; each combination of argument values
/// produces one invocation of the body.
fn call_def<'a>(
    def: &'a FuncDef,
    scope: Ctx<'a>,
    args: &'a [Expr],
    caller: Ctx<'a>,
    input: Value,
) -> Outputs<'a> {
    let depth = call_depth(&caller) + 1;
    if depth > MAX_CALL_DEPTH {
        return fail(JQError::message(format!(
            "maximum recursion depth exceeded calling {}/{}",
            def.name,
            def.arity()
        )));
    }

    bind_params(def, Scope::frame(&scope, depth), args, 0, caller, input)
}

fn bind_params<'a>(
    def: &'a FuncDef,
    scope: Ctx<'a>,
    args: &'a [Expr],
    position: usize,
    caller: Ctx<'a>,
    input: Value,
) -> Outputs<'a> {
    if position == args.len() {
        return eval(&def.body, scope, input);
    }

    then(
        eval(&args[position], caller.clone(), input.clone()),
        move |arg| {
            let scope = Scope::with_var(&scope, &def.params[position], arg);
            bind_params(def, scope, args, position + 1, caller.clone(), input.clone())
        },
    )
}

/// `a // b` yields the truthy values of `a`, or the values of `b` if there
/// are none. Errors raised by `a` are suppressed.
struct Alternative<'a> {
    left: Outputs<'a>,
    right: &'a Expr,
    ctx: Ctx<'a>,
    input: Option<Value>,
    found: bool,
    fallback: Option<Outputs<'a>>,
}

impl<'a> Iterator for Alternative<'a> {
    type Item = ValueResult;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(fallback) = self.fallback.as_mut() {
            return fallback.next();
        }

        if self.input.is_none() {
            return None;
        }

        for result in self.left.by_ref() {
            match result {
                Ok(value) if is_truthy(&value) => {
                    self.found = true;
                    return Some(Ok(value));
                }
                _ => continue,
            }
        }

        let input = self.input.take()?;
        if self.found {
            return None;
        }

        let mut fallback = eval(self.right, self.ctx.clone(), input);
        let next = fallback.next();
        self.fallback = Some(fallback);
        next
    }
}

/// `try body catch handler` and `body?`. Output stops at the first error
/// raised by `body`; the handler, if any, receives the error's value.
struct TryCatch<'a> {
    body: Outputs<'a>,
    handler: Option<&'a Expr>,
    ctx: Ctx<'a>,
    done: bool,
    catching: Option<Outputs<'a>>,
}

impl<'a> TryCatch<'a> {
    fn new(body: Outputs<'a>, handler: Option<&'a Expr>, ctx: Ctx<'a>) -> Self {
        Self {
            body,
            handler,
            ctx,
            done: false,
            catching: None,
        }
    }
}

impl<'a> Iterator for TryCatch<'a> {
    type Item = ValueResult;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(catching) = self.catching.as_mut() {
            return catching.next();
        }

        if self.done {
            return None;
        }

        match self.body.next() {
            Some(Ok(value)) => Some(Ok(value)),
            Some(Err(err)) => {
                self.done = true;
                let handler = self.handler?;
                let mut catching = eval(handler, self.ctx.clone(), err.into_value());
                let next = catching.next();
                self.catching = Some(catching);
                next
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}

/// `..`, a pre-order walk over a value and everything it contains.
struct Recurse {
    stack: Vec<Value>,
}

impl Recurse {
    fn new(root: Value) -> Self {
        Self { stack: vec![root] }
    }
}

impl Iterator for Recurse {
    type Item = ValueResult;

    fn next(&mut self) -> Option<Self::Item> {
        let value = self.stack.pop()?;

        match &value {
            Value::Array(arr) => self.stack.extend(arr.iter().rev().cloned()),
            Value::Object(obj) => self.stack.extend(obj.values().rev().cloned()),
            _ => (),
        }

        Some(Ok(value))
    }
}

pub fn recurse<'a>(root: Value) -> Outputs<'a> {
    Box::new(Recurse::new(root))
}

/// `recurse(f)`: the input, then `f` applied recursively to each output, in
/// pre-order. Pending levels are kept on `stack` rather than nested inside
/// each other.
struct RecurseWith<'a> {
    f: &'a Expr,
    ctx: Ctx<'a>,
    stack: Vec<Outputs<'a>>,
}

impl<'a> Iterator for RecurseWith<'a> {
    type Item = ValueResult;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(Ok(value)) => {
                    self.stack
                        .push(eval(self.f, self.ctx.clone(), value.clone()));
                    return Some(Ok(value));
                }
                Some(Err(err)) => return Some(Err(err)),
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

pub fn recurse_with<'a>(f: &'a Expr, ctx: Ctx<'a>, input: Value) -> Outputs<'a> {
    Box::new(RecurseWith {
        f,
        ctx,
        stack: vec![once(input)],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn recurse_is_pre_order() {
        let values: Vec<Value> = Recurse::new(json!({"a": [1, {"b": 2}]}))
            .map(Result::unwrap)
            .collect();

        assert_eq!(
            values,
            vec![
                json!({"a": [1, {"b": 2}]}),
                json!([1, {"b": 2}]),
                json!(1),
                json!({"b": 2}),
                json!(2),
            ]
        );
    }

    #[test]
    fn deferred_sequences_are_not_built_until_pulled() {
        let built = std::cell::Cell::new(false);
        let mut outputs = defer(|| {
            built.set(true);
            once(json!(1))
        });

        assert!(!built.get());
        assert_eq!(outputs.next().unwrap().unwrap(), json!(1));
        assert!(built.get());
    }

    #[test]
    fn recurse_with_does_not_nest_per_level() {
        let f = crate::parser::JQParser::new()
            .parse("if . < 5000 then . + 1 else empty end")
            .unwrap()
            .body;

        let bindings = Map::new();
        let values = recurse_with(&f, Scope::global(&bindings), json!(0));
        assert_eq!(values.last().unwrap().unwrap(), json!(5000));
    }

    #[test]
    fn call_depth_is_the_innermost_frame() {
        let bindings = Map::new();
        let root = Scope::global(&bindings);
        assert_eq!(call_depth(&root), 0);

        let frame = Scope::frame(&root, 3);
        let inner = Scope::with_var(&frame, "x", json!(1));
        assert_eq!(call_depth(&inner), 3);
        assert_eq!(lookup_var(&inner, "x"), Some(json!(1)));
    }

    #[test]
    fn variables_resolve_innermost_first() {
        let bindings = Map::from_iter([("x".to_owned(), json!("global"))]);
        let root = Scope::global(&bindings);
        let inner = Scope::with_var(&root, "x", json!("local"));

        assert_eq!(lookup_var(&inner, "x"), Some(json!("local")));
        assert_eq!(lookup_var(&root, "x"), Some(json!("global")));
        assert_eq!(lookup_var(&root, "y"), None);
    }
}
