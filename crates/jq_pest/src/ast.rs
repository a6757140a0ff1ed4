//! The syntax tree produced by [`JQParser`](crate::parser::JQParser).
//!
//! Every node has a canonical string form. Binary operators, pipes, commas,
//! bindings and definitions are always parenthesized when displayed, so the
//! canonical form of a program shows how it was grouped by the parser.

use std::fmt::{self, Write};

use itertools::Itertools;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOperator {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl fmt::Display for ArithmeticOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArithmeticOperator::Add => f.write_char('+'),
            ArithmeticOperator::Sub => f.write_char('-'),
            ArithmeticOperator::Mul => f.write_char('*'),
            ArithmeticOperator::Div => f.write_char('/'),
            ArithmeticOperator::Mod => f.write_char('%'),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Eq,
    Ne,
    Ge,
    Gt,
    Le,
    Lt,
}

impl fmt::Display for ComparisonOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComparisonOperator::Eq => f.write_str("=="),
            ComparisonOperator::Ne => f.write_str("!="),
            ComparisonOperator::Ge => f.write_str(">="),
            ComparisonOperator::Gt => f.write_str(">"),
            ComparisonOperator::Le => f.write_str("<="),
            ComparisonOperator::Lt => f.write_str("<"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalOperator::And => f.write_str("and"),
            LogicalOperator::Or => f.write_str("or"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ObjectKey {
    Name { name: String },
    Expr { expr: Box<Expr> },
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectKey::Name { name } => write!(f, "{}", Value::String(name.to_owned())),
            ObjectKey::Expr { expr } => write!(f, "({expr})"),
        }
    }
}

/// A function definition, `def name($a; $b): body;`.
#[derive(Debug, Clone)]
pub struct FuncDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Expr,
}

impl FuncDef {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for FuncDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.params.is_empty() {
            write!(f, "def {}: {};", self.name, self.body)
        } else {
            write!(
                f,
                "def {}({}): {};",
                self.name,
                self.params.iter().map(|p| format!("${p}")).join("; "),
                self.body
            )
        }
    }
}

#[derive(Debug, Clone)]
pub enum Expr {
    Identity,
    RecurseDefault,
    Literal {
        value: Value,
    },
    Index {
        target: Box<Expr>,
        key: Box<Expr>,
    },
    Slice {
        target: Box<Expr>,
        from: Option<Box<Expr>>,
        to: Option<Box<Expr>>,
    },
    Iterate {
        target: Box<Expr>,
    },
    Optional {
        expr: Box<Expr>,
    },
    Array {
        expr: Option<Box<Expr>>,
    },
    Object {
        entries: Vec<(ObjectKey, Expr)>,
    },
    Negate {
        expr: Box<Expr>,
    },
    Pipe {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Comma {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Arithmetic {
        left: Box<Expr>,
        operator: ArithmeticOperator,
        right: Box<Expr>,
    },
    Comparison {
        left: Box<Expr>,
        operator: ComparisonOperator,
        right: Box<Expr>,
    },
    Logical {
        left: Box<Expr>,
        operator: LogicalOperator,
        right: Box<Expr>,
    },
    Alternative {
        left: Box<Expr>,
        right: Box<Expr>,
    },
    If {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Option<Box<Expr>>,
    },
    Try {
        body: Box<Expr>,
        catch: Option<Box<Expr>>,
    },
    Reduce {
        source: Box<Expr>,
        name: String,
        init: Box<Expr>,
        update: Box<Expr>,
    },
    Bind {
        source: Box<Expr>,
        name: String,
        body: Box<Expr>,
    },
    Var {
        name: String,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
    Def {
        def: Box<FuncDef>,
        rest: Box<Expr>,
    },
}

impl Expr {
    pub fn literal(value: Value) -> Self {
        Expr::Literal { value }
    }

    /// `.name`
    pub fn field(name: &str) -> Self {
        Expr::Index {
            target: Box::new(Expr::Identity),
            key: Box::new(Expr::literal(Value::String(name.to_owned()))),
        }
    }

    /// Every direct sub-expression, in source order.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Identity | Expr::RecurseDefault | Expr::Literal { .. } | Expr::Var { .. } => {
                Vec::new()
            }
            Expr::Index { target, key } => vec![&**target, &**key],
            Expr::Slice { target, from, to } => {
                let mut children = vec![&**target];
                children.extend(from.as_deref());
                children.extend(to.as_deref());
                children
            }
            Expr::Iterate { target } => vec![&**target],
            Expr::Optional { expr } | Expr::Negate { expr } => vec![&**expr],
            Expr::Array { expr } => expr.as_deref().into_iter().collect(),
            Expr::Object { entries } => entries
                .iter()
                .flat_map(|(key, value)| {
                    let mut children: Vec<&Expr> = Vec::new();
                    if let ObjectKey::Expr { expr } = key {
                        children.push(expr);
                    }
                    children.push(value);
                    children
                })
                .collect(),
            Expr::Pipe { left, right }
            | Expr::Comma { left, right }
            | Expr::Arithmetic { left, right, .. }
            | Expr::Comparison { left, right, .. }
            | Expr::Logical { left, right, .. }
            | Expr::Alternative { left, right } => vec![&**left, &**right],
            Expr::If {
                cond,
                then,
                otherwise,
            } => {
                let mut children = vec![&**cond, &**then];
                children.extend(otherwise.as_deref());
                children
            }
            Expr::Try { body, catch } => {
                let mut children = vec![&**body];
                children.extend(catch.as_deref());
                children
            }
            Expr::Reduce {
                source,
                init,
                update,
                ..
            } => vec![&**source, &**init, &**update],
            Expr::Bind { source, body, .. } => vec![&**source, &**body],
            Expr::Call { args, .. } => args.iter().collect(),
            Expr::Def { def, rest } => vec![&def.body, &**rest],
        }
    }

    /// Mutable references to every direct sub-expression.
    pub fn children_mut(&mut self) -> Vec<&mut Expr> {
        match self {
            Expr::Identity | Expr::RecurseDefault | Expr::Literal { .. } | Expr::Var { .. } => {
                Vec::new()
            }
            Expr::Index { target, key } => vec![&mut **target, &mut **key],
            Expr::Slice { target, from, to } => {
                let mut children = vec![&mut **target];
                children.extend(from.as_deref_mut());
                children.extend(to.as_deref_mut());
                children
            }
            Expr::Iterate { target } => vec![&mut **target],
            Expr::Optional { expr } | Expr::Negate { expr } => vec![&mut **expr],
            Expr::Array { expr } => expr.as_deref_mut().into_iter().collect(),
            Expr::Object { entries } => entries
                .iter_mut()
                .flat_map(|(key, value)| {
                    let mut children = Vec::new();
                    if let ObjectKey::Expr { expr } = key {
                        children.push(&mut **expr);
                    }
                    children.push(value);
                    children
                })
                .collect(),
            Expr::Pipe { left, right }
            | Expr::Comma { left, right }
            | Expr::Arithmetic { left, right, .. }
            | Expr::Comparison { left, right, .. }
            | Expr::Logical { left, right, .. }
            | Expr::Alternative { left, right } => vec![&mut **left, &mut **right],
            Expr::If {
                cond,
                then,
                otherwise,
            } => {
                let mut children = vec![&mut **cond, &mut **then];
                children.extend(otherwise.as_deref_mut());
                children
            }
            Expr::Try { body, catch } => {
                let mut children = vec![&mut **body];
                children.extend(catch.as_deref_mut());
                children
            }
            Expr::Reduce {
                source,
                init,
                update,
                ..
            } => vec![&mut **source, &mut **init, &mut **update],
            Expr::Bind { source, body, .. } => vec![&mut **source, &mut **body],
            Expr::Call { args, .. } => args.iter_mut().collect(),
            Expr::Def { def, rest } => vec![&mut def.body, &mut **rest],
        }
    }

    fn is_postfix_safe(&self) -> bool {
        match self {
            Expr::RecurseDefault | Expr::Negate { .. } | Expr::Try { .. } => false,
            Expr::Literal {
                value: Value::Number(n),
            } => !n.to_string().starts_with('-'),
            _ => true,
        }
    }
}

/// Displays an expression in a position where postfix suffixes may follow.
struct Operand<'e>(&'e Expr);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_postfix_safe() {
            write!(f, "{}", self.0)
        } else {
            write!(f, "({})", self.0)
        }
    }
}

fn optional(expr: &Option<Box<Expr>>) -> String {
    expr.as_ref().map(|e| e.to_string()).unwrap_or_default()
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Identity => f.write_char('.'),
            Expr::RecurseDefault => f.write_str(".."),
            Expr::Literal { value } => write!(f, "{value}"),
            Expr::Index { target, key } => write!(f, "{}[{}]", Operand(target), key),
            Expr::Slice { target, from, to } => write!(
                f,
                "{}[{}:{}]",
                Operand(target),
                optional(from),
                optional(to)
            ),
            Expr::Iterate { target } => write!(f, "{}[]", Operand(target)),
            Expr::Optional { expr } => write!(f, "{}?", Operand(expr)),
            Expr::Array { expr: None } => f.write_str("[]"),
            Expr::Array { expr: Some(expr) } => write!(f, "[{expr}]"),
            Expr::Object { entries } => write!(
                f,
                "{{{}}}",
                entries
                    .iter()
                    .map(|(key, value)| format!("{}: {}", key, Operand(value)))
                    .join(", ")
            ),
            Expr::Negate { expr } => write!(f, "-{}", Operand(expr)),
            Expr::Pipe { left, right } => write!(f, "({left} | {right})"),
            Expr::Comma { left, right } => write!(f, "({left}, {right})"),
            Expr::Arithmetic {
                left,
                operator,
                right,
            } => write!(f, "({left} {operator} {right})"),
            Expr::Comparison {
                left,
                operator,
                right,
            } => write!(f, "({left} {operator} {right})"),
            Expr::Logical {
                left,
                operator,
                right,
            } => write!(f, "({left} {operator} {right})"),
            Expr::Alternative { left, right } => write!(f, "({left} // {right})"),
            Expr::If {
                cond,
                then,
                otherwise: Some(otherwise),
            } => write!(f, "if {cond} then {then} else {otherwise} end"),
            Expr::If {
                cond,
                then,
                otherwise: None,
            } => write!(f, "if {cond} then {then} end"),
            Expr::Try {
                body,
                catch: Some(catch),
            } => write!(f, "try {} catch {}", Operand(body), Operand(catch)),
            Expr::Try { body, catch: None } => write!(f, "try {}", Operand(body)),
            Expr::Reduce {
                source,
                name,
                init,
                update,
            } => write!(
                f,
                "reduce {} as ${name} ({init}; {update})",
                Operand(source)
            ),
            Expr::Bind { source, name, body } => {
                write!(f, "({} as ${name} | {body})", Operand(source))
            }
            Expr::Var { name } => write!(f, "${name}"),
            Expr::Call { name, args } if args.is_empty() => f.write_str(name),
            Expr::Call { name, args } => write!(f, "{}({})", name, args.iter().join("; ")),
            Expr::Def { def, rest } => write!(f, "({def} {rest})"),
        }
    }
}
