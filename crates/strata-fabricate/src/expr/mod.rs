//! Expression language for declarative pipelines.
//!
//! Expressions are vectorized: every node evaluates to a column, and binary
//! operations recycle the shorter operand when its length evenly divides
//! the longer one. Identifiers resolve through the level's scope chain.

mod builtins;
mod eval;
mod lexer;
mod parser;

use std::collections::BTreeSet;

use thiserror::Error;

use strata_core::{Column, Value};

use crate::errors::EvalError;
use crate::level::{EvalContext, Expression};

pub use builtins::{Builtin, Param, Signature};
pub use lexer::{Span, Token, TokenKind, tokenize};

/// Syntax error in an expression source string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at column {column}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
    /// 1-based character column of the span start.
    pub column: usize,
}

impl ParseError {
    pub(crate) fn new(input: &str, span: Span, message: impl Into<String>) -> Self {
        let start = span.start.min(input.len());
        let column = input
            .get(..start)
            .map(|prefix| prefix.chars().count())
            .unwrap_or(start)
            + 1;
        Self {
            message: message.into(),
            span,
            column,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Pow => "^",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

/// Builtin call with arguments bound to the builtin's parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub builtin: Builtin,
    /// Extra positional arguments of variadic builtins.
    pub rest: Vec<Expr>,
    /// One slot per declared parameter, in signature order.
    pub args: Vec<Option<Expr>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Vector(Vec<Expr>),
    Ident(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Call),
}

impl Expr {
    fn collect_idents<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Ident(name) => {
                out.insert(name.as_str());
            }
            Expr::Vector(items) => items.iter().for_each(|item| item.collect_idents(out)),
            Expr::Unary(_, inner) => inner.collect_idents(out),
            Expr::Binary(_, lhs, rhs) => {
                lhs.collect_idents(out);
                rhs.collect_idents(out);
            }
            Expr::Call(call) => {
                call.rest.iter().for_each(|arg| arg.collect_idents(out));
                call.args
                    .iter()
                    .flatten()
                    .for_each(|arg| arg.collect_idents(out));
            }
        }
    }
}

/// Parsed expression together with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr {
    source: String,
    ast: Expr,
}

impl CompiledExpr {
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn ast(&self) -> &Expr {
        &self.ast
    }

    /// Identifiers the expression reads, sorted and deduplicated.
    pub fn references(&self) -> Vec<&str> {
        let mut names = BTreeSet::new();
        self.ast.collect_idents(&mut names);
        names.into_iter().collect()
    }
}

impl Expression for CompiledExpr {
    fn evaluate(&self, ctx: &mut EvalContext<'_>) -> Result<Column, EvalError> {
        eval::eval(&self.ast, ctx)
    }
}

/// Parse an expression source string.
pub fn parse_expression(source: &str) -> Result<CompiledExpr, ParseError> {
    let tokens = tokenize(source)?;
    let ast = parser::Parser::new(source, &tokens).parse()?;
    Ok(CompiledExpr {
        source: source.to_string(),
        ast,
    })
}
