//! A jq parser using [pest].
//!
//! Refer to `jq.pest` and the [pest book]
//!
//! [pest]: https://pest.rs/
//! [pest book]: https://pest.rs/book/

use pest::{iterators::Pair, Parser};
use pest_derive::Parser;
use serde_json::Value;

use crate::{
    ast::{
        ArithmeticOperator, ComparisonOperator, Expr, FuncDef, LogicalOperator, ObjectKey,
    },
    errors::JQError,
    unescape::unescape,
    value,
};

#[derive(Parser)]
#[grammar = "jq.pest"]
struct JQ;

/// An `include` or `import` at the top of a program or module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Include { path: String },
    Import { path: String, alias: String },
}

#[derive(Debug, Clone)]
pub struct ParsedProgram {
    pub directives: Vec<Directive>,
    pub body: Expr,
}

#[derive(Debug, Clone)]
pub struct ParsedModule {
    pub directives: Vec<Directive>,
    pub defs: Vec<FuncDef>,
}

#[derive(Debug, Default)]
pub struct JQParser;

fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::def_kw
            | Rule::if_kw
            | Rule::then_kw
            | Rule::elif_kw
            | Rule::else_kw
            | Rule::end_kw
            | Rule::as_kw
            | Rule::reduce_kw
            | Rule::try_kw
            | Rule::catch_kw
            | Rule::and_kw
            | Rule::or_kw
            | Rule::include_kw
            | Rule::import_kw
    )
}

/// Inner pairs of `pair`, without keyword tokens.
fn inner(pair: Pair<Rule>) -> impl Iterator<Item = Pair<Rule>> {
    pair.into_inner().filter(|p| !is_keyword(p.as_rule()))
}

fn var_name(pair: &Pair<Rule>) -> String {
    pair.as_str()[1..].to_owned()
}

fn negate(expr: Expr) -> Expr {
    match expr {
        Expr::Literal {
            value: Value::Number(n),
        } => Expr::literal(value::number(-value::as_f64(&n))),
        expr => Expr::Negate {
            expr: Box::new(expr),
        },
    }
}

impl JQParser {
    pub fn new() -> Self {
        JQParser
    }

    /// Parse a complete program. An empty program is the identity filter.
    pub fn parse(&self, script: &str) -> Result<ParsedProgram, JQError> {
        let program = JQ::parse(Rule::program, script)
            .map_err(|err| JQError::syntax(err.to_string()))?
            .next()
            .unwrap();

        let mut directives = Vec::new();
        let mut body = Expr::Identity;

        for pair in program.into_inner() {
            match pair.as_rule() {
                Rule::include | Rule::import => directives.push(self.parse_directive(pair)?),
                Rule::pipe => body = self.parse_pipe(pair)?,
                Rule::EOI => (),
                _ => unreachable!(),
            }
        }

        Ok(ParsedProgram { directives, body })
    }

    /// Parse a library module, which may only contain directives and definitions.
    pub fn parse_module(&self, source: &str) -> Result<ParsedModule, JQError> {
        let module = JQ::parse(Rule::module, source)
            .map_err(|err| JQError::syntax(err.to_string()))?
            .next()
            .unwrap();

        let mut directives = Vec::new();
        let mut defs = Vec::new();

        for pair in module.into_inner() {
            match pair.as_rule() {
                Rule::include | Rule::import => directives.push(self.parse_directive(pair)?),
                Rule::func_def => defs.push(self.parse_func_def(pair)?),
                Rule::EOI => (),
                _ => unreachable!(),
            }
        }

        Ok(ParsedModule { directives, defs })
    }

    fn parse_directive(&self, directive: Pair<Rule>) -> Result<Directive, JQError> {
        let rule = directive.as_rule();
        let mut it = inner(directive);
        let path = self.parse_string(it.next().unwrap())?;

        Ok(match rule {
            Rule::include => Directive::Include { path },
            Rule::import => Directive::Import {
                path,
                alias: it.next().unwrap().as_str().to_owned(),
            },
            _ => unreachable!(),
        })
    }

    fn parse_func_def(&self, def: Pair<Rule>) -> Result<FuncDef, JQError> {
        let mut name = String::new();
        let mut params = Vec::new();
        let mut body = Expr::Identity;

        for pair in inner(def) {
            match pair.as_rule() {
                Rule::ident => name = pair.as_str().to_owned(),
                Rule::params => {
                    for param in pair.into_inner() {
                        let param = var_name(&param);
                        if params.contains(&param) {
                            return Err(JQError::syntax(format!(
                                "duplicate parameter ${param} in definition of {name}"
                            )));
                        }
                        params.push(param);
                    }
                }
                Rule::pipe => body = self.parse_pipe(pair)?,
                _ => unreachable!(),
            }
        }

        Ok(FuncDef { name, params, body })
    }

    fn parse_pipe(&self, pipe: Pair<Rule>) -> Result<Expr, JQError> {
        let mut defs = Vec::new();
        let mut expr = Expr::Identity;

        for pair in pipe.into_inner() {
            match pair.as_rule() {
                Rule::func_def => defs.push(self.parse_func_def(pair)?),
                Rule::comma => expr = self.parse_comma(pair)?,
                Rule::pipe => {
                    expr = Expr::Pipe {
                        left: Box::new(expr),
                        right: Box::new(self.parse_pipe(pair)?),
                    }
                }
                _ => unreachable!(),
            }
        }

        Ok(defs.into_iter().rev().fold(expr, |rest, def| Expr::Def {
            def: Box::new(def),
            rest: Box::new(rest),
        }))
    }

    fn parse_comma(&self, comma: Pair<Rule>) -> Result<Expr, JQError> {
        let mut it = comma.into_inner();
        let mut expr = self.parse_alternative(it.next().unwrap())?;

        for pair in it {
            expr = Expr::Comma {
                left: Box::new(expr),
                right: Box::new(self.parse_alternative(pair)?),
            };
        }

        Ok(expr)
    }

    fn parse_alternative(&self, alternative: Pair<Rule>) -> Result<Expr, JQError> {
        let mut it = alternative.into_inner();
        let left = self.parse_or(it.next().unwrap())?;

        match it.next() {
            Some(right) => Ok(Expr::Alternative {
                left: Box::new(left),
                right: Box::new(self.parse_alternative(right)?),
            }),
            None => Ok(left),
        }
    }

    fn parse_or(&self, expr: Pair<Rule>) -> Result<Expr, JQError> {
        let mut it = inner(expr);
        let mut or_expr = self.parse_and(it.next().unwrap())?;

        for pair in it {
            or_expr = Expr::Logical {
                left: Box::new(or_expr),
                operator: LogicalOperator::Or,
                right: Box::new(self.parse_and(pair)?),
            };
        }

        Ok(or_expr)
    }

    fn parse_and(&self, expr: Pair<Rule>) -> Result<Expr, JQError> {
        let mut it = inner(expr);
        let mut and_expr = self.parse_comparison(it.next().unwrap())?;

        for pair in it {
            and_expr = Expr::Logical {
                left: Box::new(and_expr),
                operator: LogicalOperator::And,
                right: Box::new(self.parse_comparison(pair)?),
            };
        }

        Ok(and_expr)
    }

    fn parse_comparison(&self, expr: Pair<Rule>) -> Result<Expr, JQError> {
        let mut it = expr.into_inner();
        let left = self.parse_additive(it.next().unwrap())?;

        let Some(op) = it.next() else {
            return Ok(left);
        };

        let operator = match op.as_str() {
            "==" => ComparisonOperator::Eq,
            "!=" => ComparisonOperator::Ne,
            "<=" => ComparisonOperator::Le,
            ">=" => ComparisonOperator::Ge,
            "<" => ComparisonOperator::Lt,
            ">" => ComparisonOperator::Gt,
            _ => unreachable!(),
        };

        Ok(Expr::Comparison {
            left: Box::new(left),
            operator,
            right: Box::new(self.parse_additive(it.next().unwrap())?),
        })
    }

    fn parse_additive(&self, expr: Pair<Rule>) -> Result<Expr, JQError> {
        let mut it = expr.into_inner();
        let mut left = self.parse_multiplicative(it.next().unwrap())?;

        while let Some(op) = it.next() {
            let operator = match op.as_str() {
                "+" => ArithmeticOperator::Add,
                "-" => ArithmeticOperator::Sub,
                _ => unreachable!(),
            };

            left = Expr::Arithmetic {
                left: Box::new(left),
                operator,
                right: Box::new(self.parse_multiplicative(it.next().unwrap())?),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&self, expr: Pair<Rule>) -> Result<Expr, JQError> {
        let mut it = expr.into_inner();
        let mut left = self.parse_unary(it.next().unwrap())?;

        while let Some(op) = it.next() {
            let operator = match op.as_str() {
                "*" => ArithmeticOperator::Mul,
                "/" => ArithmeticOperator::Div,
                "%" => ArithmeticOperator::Mod,
                _ => unreachable!(),
            };

            left = Expr::Arithmetic {
                left: Box::new(left),
                operator,
                right: Box::new(self.parse_unary(it.next().unwrap())?),
            };
        }

        Ok(left)
    }

    fn parse_unary(&self, expr: Pair<Rule>) -> Result<Expr, JQError> {
        let mut it = inner(expr);
        let mut pair = it.next().unwrap();
        let negated = pair.as_rule() == Rule::negation;

        if negated {
            pair = it.next().unwrap();
        }

        let mut expr = self.parse_postfix(pair)?;

        if negated {
            expr = negate(expr);
        }

        if let Some(variable) = it.next() {
            expr = Expr::Bind {
                source: Box::new(expr),
                name: var_name(&variable),
                body: Box::new(self.parse_pipe(it.next().unwrap())?),
            };
        }

        Ok(expr)
    }

    fn parse_postfix(&self, expr: Pair<Rule>) -> Result<Expr, JQError> {
        let mut it = expr.into_inner();
        let mut expr = self.parse_term(it.next().unwrap())?;

        for suffix in it {
            expr = match suffix.as_rule() {
                Rule::optional_suffix => Expr::Optional {
                    expr: Box::new(expr),
                },
                Rule::iterate_suffix => Expr::Iterate {
                    target: Box::new(expr),
                },
                Rule::index_suffix => Expr::Index {
                    target: Box::new(expr),
                    key: Box::new(self.parse_pipe(suffix.into_inner().next().unwrap())?),
                },
                Rule::field_suffix => Expr::Index {
                    target: Box::new(expr),
                    key: Box::new(Expr::literal(Value::String(
                        self.parse_name(suffix.into_inner().next().unwrap())?,
                    ))),
                },
                Rule::slice_suffix => {
                    let mut from = None;
                    let mut to = None;

                    for bound in suffix.into_inner() {
                        let rule = bound.as_rule();
                        let bound = Some(Box::new(
                            self.parse_pipe(bound.into_inner().next().unwrap())?,
                        ));
                        match rule {
                            Rule::slice_from => from = bound,
                            Rule::slice_to => to = bound,
                            _ => unreachable!(),
                        }
                    }

                    Expr::Slice {
                        target: Box::new(expr),
                        from,
                        to,
                    }
                }
                _ => unreachable!(),
            };
        }

        Ok(expr)
    }

    fn parse_term(&self, term: Pair<Rule>) -> Result<Expr, JQError> {
        Ok(match term.as_rule() {
            Rule::number => Expr::literal(self.parse_number(term.as_str())?),
            Rule::string => Expr::literal(Value::String(self.parse_string(term)?)),
            Rule::literal => Expr::literal(match term.as_str() {
                "null" => Value::Null,
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                _ => unreachable!(),
            }),
            Rule::recurse_default => Expr::RecurseDefault,
            Rule::identity => Expr::Identity,
            Rule::field => Expr::field(&self.parse_name(term.into_inner().next().unwrap())?),
            Rule::array => Expr::Array {
                expr: match term.into_inner().next() {
                    Some(pipe) => Some(Box::new(self.parse_pipe(pipe)?)),
                    None => None,
                },
            },
            Rule::object => self.parse_object(term)?,
            Rule::paren => self.parse_pipe(term.into_inner().next().unwrap())?,
            Rule::if_expr => self.parse_if(term)?,
            Rule::try_expr => {
                let mut it = inner(term);
                let body = self.parse_postfix(it.next().unwrap())?;
                let catch = match it.next() {
                    Some(clause) => Some(Box::new(
                        self.parse_postfix(inner(clause).next().unwrap())?,
                    )),
                    None => None,
                };

                Expr::Try {
                    body: Box::new(body),
                    catch,
                }
            }
            Rule::reduce_expr => {
                let mut it = inner(term);
                let source = self.parse_postfix(it.next().unwrap())?;
                let name = var_name(&it.next().unwrap());
                let init = self.parse_pipe(it.next().unwrap())?;
                let update = self.parse_pipe(it.next().unwrap())?;

                Expr::Reduce {
                    source: Box::new(source),
                    name,
                    init: Box::new(init),
                    update: Box::new(update),
                }
            }
            Rule::variable => Expr::Var {
                name: var_name(&term),
            },
            Rule::call => {
                let mut it = term.into_inner();
                let name = it.next().unwrap().as_str().to_owned();
                let args: Result<Vec<_>, _> = it.map(|arg| self.parse_pipe(arg)).collect();
                Expr::Call { name, args: args? }
            }
            _ => unreachable!(),
        })
    }

    fn parse_if(&self, expr: Pair<Rule>) -> Result<Expr, JQError> {
        let mut branches = Vec::new();
        let mut otherwise = None;
        let mut it = inner(expr);

        let cond = self.parse_pipe(it.next().unwrap())?;
        let then = self.parse_pipe(it.next().unwrap())?;
        branches.push((cond, then));

        for clause in it {
            match clause.as_rule() {
                Rule::elif_clause => {
                    let mut parts = inner(clause);
                    let cond = self.parse_pipe(parts.next().unwrap())?;
                    let then = self.parse_pipe(parts.next().unwrap())?;
                    branches.push((cond, then));
                }
                Rule::else_clause => {
                    otherwise = Some(Box::new(self.parse_pipe(inner(clause).next().unwrap())?))
                }
                _ => unreachable!(),
            }
        }

        // elif chains become nested conditionals in the else branch
        let mut expr = otherwise;
        for (cond, then) in branches.into_iter().rev() {
            expr = Some(Box::new(Expr::If {
                cond: Box::new(cond),
                then: Box::new(then),
                otherwise: expr,
            }));
        }

        Ok(*expr.unwrap())
    }

    fn parse_object(&self, object: Pair<Rule>) -> Result<Expr, JQError> {
        let mut entries = Vec::new();

        for entry in object.into_inner() {
            let mut it = entry.into_inner();
            let key = it.next().unwrap();
            let value = match it.next() {
                Some(value) => Some(self.parse_object_value(value)?),
                None => None,
            };

            entries.push(match (key.as_rule(), value) {
                (Rule::variable, None) => {
                    let name = var_name(&key);
                    (
                        ObjectKey::Name {
                            name: name.to_owned(),
                        },
                        Expr::Var { name },
                    )
                }
                (Rule::variable, Some(value)) => (
                    ObjectKey::Expr {
                        expr: Box::new(Expr::Var {
                            name: var_name(&key),
                        }),
                    },
                    value,
                ),
                (Rule::field_name | Rule::string, value) => {
                    let name = self.parse_name(key)?;
                    let value = value.unwrap_or_else(|| Expr::field(&name));
                    (ObjectKey::Name { name }, value)
                }
                (Rule::paren, Some(value)) => (
                    ObjectKey::Expr {
                        expr: Box::new(self.parse_pipe(key.into_inner().next().unwrap())?),
                    },
                    value,
                ),
                (Rule::paren, None) => {
                    return Err(JQError::syntax(format!(
                        "object key {} must be followed by a value",
                        key.as_str()
                    )))
                }
                _ => unreachable!(),
            });
        }

        Ok(Expr::Object { entries })
    }

    fn parse_object_value(&self, value: Pair<Rule>) -> Result<Expr, JQError> {
        let parts: Result<Vec<_>, _> = value
            .into_inner()
            .map(|unary| self.parse_unary(unary))
            .collect();

        Ok(parts?
            .into_iter()
            .rev()
            .reduce(|right, left| Expr::Pipe {
                left: Box::new(left),
                right: Box::new(right),
            })
            .unwrap())
    }

    fn parse_name(&self, pair: Pair<Rule>) -> Result<String, JQError> {
        match pair.as_rule() {
            Rule::field_name => Ok(pair.as_str().to_owned()),
            Rule::string => self.parse_string(pair),
            _ => unreachable!(),
        }
    }

    fn parse_string(&self, string: Pair<Rule>) -> Result<String, JQError> {
        unescape(string.into_inner().next().unwrap().as_str())
    }

    fn parse_number(&self, literal: &str) -> Result<Value, JQError> {
        if let Ok(n) = literal.parse::<i64>() {
            return Ok(Value::from(n));
        }

        let n = literal
            .parse::<f64>()
            .map_err(|_| JQError::syntax(format!("invalid number literal {literal}")))?;

        if !n.is_finite() {
            return Err(JQError::syntax(format!("number literal {literal} is too large")));
        }

        Ok(value::number(n))
    }
}
