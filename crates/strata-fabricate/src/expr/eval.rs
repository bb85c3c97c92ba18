use std::cmp::Ordering;

use strata_core::{Column, Value};

use super::builtins;
use super::{BinaryOp, Expr, UnaryOp};
use crate::errors::EvalError;
use crate::level::EvalContext;

pub(crate) fn eval(expr: &Expr, ctx: &mut EvalContext<'_>) -> Result<Column, EvalError> {
    match expr {
        Expr::Literal(value) => Ok(vec![value.clone()]),
        Expr::Ident(name) => Ok(ctx.get(name)?.into_owned()),
        Expr::Vector(items) => {
            let mut out = Vec::new();
            for item in items {
                out.extend(eval(item, ctx)?);
            }
            Ok(out)
        }
        Expr::Unary(op, inner) => {
            let values = eval(inner, ctx)?;
            values.iter().map(|value| unary(*op, value)).collect()
        }
        Expr::Binary(op, lhs, rhs) => {
            let lhs = eval(lhs, ctx)?;
            let rhs = eval(rhs, ctx)?;
            zip_with(&lhs, &rhs, |a, b| binary(*op, a, b))
        }
        Expr::Call(call) => builtins::call(call, ctx),
    }
}

/// Length of an element-wise result over operands of the given lengths.
///
/// The longer length must be a multiple of the shorter one; a zero-length
/// operand yields an empty result.
pub(crate) fn common_len(lens: &[usize]) -> Result<usize, EvalError> {
    let longest = lens.iter().copied().max().unwrap_or(0);
    if lens.contains(&0) {
        return Ok(0);
    }
    for len in lens {
        if longest % len != 0 {
            return Err(EvalError::Recycling {
                len: *len,
                target: longest,
            });
        }
    }
    Ok(longest)
}

pub(crate) fn zip_with<F>(lhs: &[Value], rhs: &[Value], mut f: F) -> Result<Column, EvalError>
where
    F: FnMut(&Value, &Value) -> Result<Value, EvalError>,
{
    let len = common_len(&[lhs.len(), rhs.len()])?;
    (0..len)
        .map(|i| f(&lhs[i % lhs.len()], &rhs[i % rhs.len()]))
        .collect()
}

/// Condition view of a value: bools as-is, numbers compared to zero.
pub(crate) fn truthy(value: &Value) -> Result<Option<bool>, EvalError> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(value) => Ok(Some(*value)),
        Value::Int(value) => Ok(Some(*value != 0)),
        Value::Float(value) => Ok(Some(*value != 0.0)),
        Value::Text(text) => Err(EvalError::Type(format!(
            "text value '{text}' used as a condition"
        ))),
    }
}

enum Num {
    Int(i64),
    Float(f64),
}

fn number(op: &str, value: &Value) -> Result<Option<Num>, EvalError> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(value) => Ok(Some(Num::Int(i64::from(*value)))),
        Value::Int(value) => Ok(Some(Num::Int(*value))),
        Value::Float(value) => Ok(Some(Num::Float(*value))),
        Value::Text(_) => Err(EvalError::Type(format!(
            "operator '{op}' cannot be applied to text"
        ))),
    }
}

impl Num {
    fn float(&self) -> f64 {
        match self {
            Num::Int(value) => *value as f64,
            Num::Float(value) => *value,
        }
    }
}

fn unary(op: UnaryOp, value: &Value) -> Result<Value, EvalError> {
    match op {
        UnaryOp::Neg => Ok(match number("-", value)? {
            None => Value::Null,
            Some(Num::Int(value)) => value
                .checked_neg()
                .map(Value::Int)
                .unwrap_or(Value::Float(-(value as f64))),
            Some(Num::Float(value)) => Value::Float(-value),
        }),
        UnaryOp::Not => Ok(truthy(value)?.map(|b| Value::Bool(!b)).unwrap_or(Value::Null)),
    }
}

fn binary(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::And => {
            let (a, b) = (truthy(lhs)?, truthy(rhs)?);
            Ok(match (a, b) {
                (Some(false), _) | (_, Some(false)) => Value::Bool(false),
                (Some(true), Some(true)) => Value::Bool(true),
                _ => Value::Null,
            })
        }
        BinaryOp::Or => {
            let (a, b) = (truthy(lhs)?, truthy(rhs)?);
            Ok(match (a, b) {
                (Some(true), _) | (_, Some(true)) => Value::Bool(true),
                (Some(false), Some(false)) => Value::Bool(false),
                _ => Value::Null,
            })
        }
        BinaryOp::Eq
        | BinaryOp::Ne
        | BinaryOp::Lt
        | BinaryOp::Le
        | BinaryOp::Gt
        | BinaryOp::Ge => compare(op, lhs, rhs),
        _ => arithmetic(op, lhs, rhs),
    }
}

fn compare(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    let ordering = match (lhs, rhs) {
        (Value::Null, _) | (_, Value::Null) => return Ok(Value::Null),
        (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
        (Value::Text(_), other) | (other, Value::Text(_)) => {
            return Err(EvalError::Type(format!(
                "cannot compare text with {} using '{}'",
                other.kind(),
                op.symbol()
            )));
        }
        _ => {
            let symbol = op.symbol();
            match (number(symbol, lhs)?, number(symbol, rhs)?) {
                (Some(Num::Int(a)), Some(Num::Int(b))) => Some(a.cmp(&b)),
                (Some(a), Some(b)) => a.float().partial_cmp(&b.float()),
                _ => return Ok(Value::Null),
            }
        }
    };
    // NaN compares as missing.
    let Some(ordering) = ordering else {
        return Ok(Value::Null);
    };
    let result = match op {
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::Ne => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    };
    Ok(Value::Bool(result))
}

fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Result<Value, EvalError> {
    let symbol = op.symbol();
    let (Some(a), Some(b)) = (number(symbol, lhs)?, number(symbol, rhs)?) else {
        return Ok(Value::Null);
    };

    if let (Num::Int(a), Num::Int(b)) = (&a, &b) {
        let (a, b) = (*a, *b);
        let checked = match op {
            BinaryOp::Add => Some(a.checked_add(b)),
            BinaryOp::Sub => Some(a.checked_sub(b)),
            BinaryOp::Mul => Some(a.checked_mul(b)),
            BinaryOp::Rem if b == 0 => return Ok(Value::Null),
            BinaryOp::Rem => Some(a.checked_rem_euclid(b)),
            _ => None,
        };
        if let Some(Some(value)) = checked {
            return Ok(Value::Int(value));
        }
    }

    let (a, b) = (a.float(), b.float());
    let value = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => a / b,
        BinaryOp::Rem => a.rem_euclid(b),
        _ => a.powf(b),
    };
    Ok(Value::Float(value))
}
