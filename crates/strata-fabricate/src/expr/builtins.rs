//! Builtin functions callable from expressions.
//!
//! Arguments are bound to parameters at parse time, so a call that names an
//! unknown parameter or omits a required one never reaches evaluation.

use strata_core::{Column, Value};

use super::eval::{common_len, eval, truthy, zip_with};
use super::lexer::Span;
use super::parser::RawArg;
use super::{Call, Expr};
use crate::distributions::{self, DistributionError, Link};
use crate::errors::EvalError;
use crate::level::EvalContext;

/// One declared parameter of a builtin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub name: &'static str,
    pub required: bool,
}

const fn req(name: &'static str) -> Param {
    Param {
        name,
        required: true,
    }
}

const fn opt(name: &'static str) -> Param {
    Param {
        name,
        required: false,
    }
}

/// Parameter list of a builtin. Variadic builtins collect extra positional
/// arguments instead of binding them to parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub params: &'static [Param],
    pub variadic: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    IfElse,
    Rep,
    RepEach,
    Seq,
    Round,
    Abs,
    Exp,
    Log,
    Sqrt,
    Pmin,
    Pmax,
    Paste,
    AsInt,
    AsFloat,
    IsNull,
    DrawBinary,
    DrawBinomial,
    DrawCount,
    DrawCategorical,
    DrawOrdered,
    DrawNormal,
    DrawUniform,
}

const ALL: &[Builtin] = &[
    Builtin::IfElse,
    Builtin::Rep,
    Builtin::RepEach,
    Builtin::Seq,
    Builtin::Round,
    Builtin::Abs,
    Builtin::Exp,
    Builtin::Log,
    Builtin::Sqrt,
    Builtin::Pmin,
    Builtin::Pmax,
    Builtin::Paste,
    Builtin::AsInt,
    Builtin::AsFloat,
    Builtin::IsNull,
    Builtin::DrawBinary,
    Builtin::DrawBinomial,
    Builtin::DrawCount,
    Builtin::DrawCategorical,
    Builtin::DrawOrdered,
    Builtin::DrawNormal,
    Builtin::DrawUniform,
];

impl Builtin {
    pub fn lookup(name: &str) -> Option<Self> {
        ALL.iter().copied().find(|builtin| builtin.name() == name)
    }

    pub fn all() -> &'static [Builtin] {
        ALL
    }

    pub fn name(self) -> &'static str {
        match self {
            Builtin::IfElse => "if_else",
            Builtin::Rep => "rep",
            Builtin::RepEach => "rep_each",
            Builtin::Seq => "seq",
            Builtin::Round => "round",
            Builtin::Abs => "abs",
            Builtin::Exp => "exp",
            Builtin::Log => "log",
            Builtin::Sqrt => "sqrt",
            Builtin::Pmin => "pmin",
            Builtin::Pmax => "pmax",
            Builtin::Paste => "paste",
            Builtin::AsInt => "as_int",
            Builtin::AsFloat => "as_float",
            Builtin::IsNull => "is_null",
            Builtin::DrawBinary => "draw_binary",
            Builtin::DrawBinomial => "draw_binomial",
            Builtin::DrawCount => "draw_count",
            Builtin::DrawCategorical => "draw_categorical",
            Builtin::DrawOrdered => "draw_ordered",
            Builtin::DrawNormal => "draw_normal",
            Builtin::DrawUniform => "draw_uniform",
        }
    }

    pub fn signature(self) -> Signature {
        const X: &[Param] = &[req("x")];
        let (params, variadic): (&'static [Param], bool) = match self {
            Builtin::IfElse => (
                const { &[req("condition"), req("true_value"), req("false_value")] },
                false,
            ),
            Builtin::Rep => (const { &[req("x"), req("times")] }, false),
            Builtin::RepEach => (const { &[req("x"), req("each")] }, false),
            Builtin::Seq => (const { &[req("from"), req("to"), opt("by")] }, false),
            Builtin::Round => (const { &[req("x"), opt("digits")] }, false),
            Builtin::Abs
            | Builtin::Exp
            | Builtin::Log
            | Builtin::Sqrt
            | Builtin::AsInt
            | Builtin::AsFloat
            | Builtin::IsNull => (X, false),
            Builtin::Pmin | Builtin::Pmax => (const { &[req("a"), req("b")] }, false),
            Builtin::Paste => (const { &[opt("sep")] }, true),
            Builtin::DrawBinary => (const { &[req("prob"), opt("N"), opt("link")] }, false),
            Builtin::DrawBinomial => (
                const { &[req("prob"), req("trials"), opt("N"), opt("link")] },
                false,
            ),
            Builtin::DrawCount => (const { &[req("mean"), opt("N")] }, false),
            Builtin::DrawCategorical => (
                const { &[req("prob"), opt("N"), opt("categories")] },
                false,
            ),
            Builtin::DrawOrdered => (
                const { &[req("x"), req("breaks"), opt("labels")] },
                false,
            ),
            Builtin::DrawNormal => (const { &[opt("mean"), opt("sd"), opt("N")] }, false),
            Builtin::DrawUniform => (const { &[opt("min"), opt("max"), opt("N")] }, false),
        };
        Signature { params, variadic }
    }
}

/// Bind call-site arguments to the builtin's parameters.
///
/// Named arguments are matched first; positional ones then fill the
/// remaining parameters in order (or the variadic tail).
pub(crate) fn bind_call(
    builtin: Builtin,
    args: Vec<RawArg>,
) -> Result<Call, (String, Option<Span>)> {
    let signature = builtin.signature();
    let name = builtin.name();
    let mut slots: Vec<Option<Expr>> = vec![None; signature.params.len()];
    let mut positional = Vec::new();

    for arg in args {
        let Some(arg_name) = arg.name.as_deref() else {
            positional.push(arg);
            continue;
        };
        let Some(idx) = signature.params.iter().position(|p| p.name == arg_name) else {
            return Err((
                format!("unknown argument '{arg_name}' for {name}()"),
                Some(arg.span),
            ));
        };
        if slots[idx].is_some() {
            return Err((
                format!("argument '{arg_name}' given twice in {name}()"),
                Some(arg.span),
            ));
        }
        slots[idx] = Some(arg.value);
    }

    let mut rest = Vec::new();
    if signature.variadic {
        rest = positional.into_iter().map(|arg| arg.value).collect();
    } else {
        let free: Vec<usize> = (0..slots.len()).filter(|idx| slots[*idx].is_none()).collect();
        let mut free = free.into_iter();
        for arg in positional {
            let Some(idx) = free.next() else {
                return Err((
                    format!(
                        "{name}() takes at most {} argument(s)",
                        signature.params.len()
                    ),
                    Some(arg.span),
                ));
            };
            slots[idx] = Some(arg.value);
        }
    }

    if let Some(missing) = signature
        .params
        .iter()
        .zip(&slots)
        .find(|(param, slot)| param.required && slot.is_none())
        .map(|(param, _)| param.name)
    {
        return Err((
            format!("missing required argument '{missing}' for {name}()"),
            None,
        ));
    }

    Ok(Call {
        builtin,
        rest,
        args: slots,
    })
}

/// Evaluate a bound builtin call.
pub(crate) fn call(call: &Call, ctx: &mut EvalContext<'_>) -> Result<Column, EvalError> {
    let mut args = Args { call, ctx };
    let name = call.builtin.name();
    match call.builtin {
        Builtin::IfElse => {
            let condition = args.required(0)?;
            let yes = args.required(1)?;
            let no = args.required(2)?;
            let len = common_len(&[condition.len(), yes.len(), no.len()])?;
            (0..len)
                .map(|i| {
                    Ok(match truthy(&condition[i % condition.len()])? {
                        None => Value::Null,
                        Some(true) => yes[i % yes.len()].clone(),
                        Some(false) => no[i % no.len()].clone(),
                    })
                })
                .collect()
        }
        Builtin::Rep => {
            let x = args.required(0)?;
            let times = args.count(1, "times")?;
            let len = args.ctx.check_len("rep()", x.len().checked_mul(times))?;
            Ok(x.iter().cycle().take(len).cloned().collect())
        }
        Builtin::RepEach => {
            let x = args.required(0)?;
            let each = args.count(1, "each")?;
            args.ctx.check_len("rep_each()", x.len().checked_mul(each))?;
            Ok(x.iter()
                .flat_map(|value| std::iter::repeat_n(value.clone(), each))
                .collect())
        }
        Builtin::Seq => seq(&mut args),
        Builtin::Round => {
            let x = args.required(0)?;
            let digits = match args.optional(1)? {
                Some(digits) => scalar(name, "digits", &digits)?
                    .as_i64()
                    .ok_or_else(|| EvalError::Type("round(): 'digits' must be an integer".to_string()))?,
                None => 0,
            };
            let factor = 10f64.powi(digits.clamp(-300, 300) as i32);
            x.iter()
                .map(|value| match value {
                    Value::Int(_) if digits >= 0 => Ok(value.clone()),
                    _ => Ok(float_of(name, value)?
                        .map(|v| Value::Float((v * factor).round() / factor))
                        .unwrap_or(Value::Null)),
                })
                .collect()
        }
        Builtin::Abs => {
            let x = args.required(0)?;
            x.iter()
                .map(|value| match value {
                    Value::Int(v) => Ok(v
                        .checked_abs()
                        .map(Value::Int)
                        .unwrap_or(Value::Float((*v as f64).abs()))),
                    Value::Bool(v) => Ok(Value::Int(i64::from(*v))),
                    other => Ok(float_of(name, other)?
                        .map(|v| Value::Float(v.abs()))
                        .unwrap_or(Value::Null)),
                })
                .collect()
        }
        Builtin::Exp => unary_float(&mut args, f64::exp),
        Builtin::Log => unary_float(&mut args, f64::ln),
        Builtin::Sqrt => unary_float(&mut args, f64::sqrt),
        Builtin::Pmin | Builtin::Pmax => {
            let a = args.required(0)?;
            let b = args.required(1)?;
            let pick_min = call.builtin == Builtin::Pmin;
            zip_with(&a, &b, |a, b| {
                if a.is_null() || b.is_null() {
                    return Ok(Value::Null);
                }
                let (Some(x), Some(y)) = (float_of(name, a)?, float_of(name, b)?) else {
                    return Ok(Value::Null);
                };
                let take_a = if pick_min { x <= y } else { x >= y };
                Ok(if take_a { a.clone() } else { b.clone() })
            })
        }
        Builtin::Paste => {
            let sep = match args.optional(0)? {
                Some(sep) => scalar(name, "sep", &sep)?.to_string(),
                None => String::new(),
            };
            let mut parts = Vec::with_capacity(call.rest.len());
            for expr in &call.rest {
                parts.push(eval(expr, args.ctx)?);
            }
            if parts.is_empty() {
                return Ok(Vec::new());
            }
            let len = common_len(&parts.iter().map(Vec::len).collect::<Vec<_>>())?;
            Ok((0..len)
                .map(|i| {
                    let pieces: Vec<String> = parts
                        .iter()
                        .map(|part| part[i % part.len()].to_string())
                        .collect();
                    Value::Text(pieces.join(&sep))
                })
                .collect())
        }
        Builtin::AsInt => {
            let x = args.required(0)?;
            let mut out = Vec::with_capacity(x.len());
            let mut failed = 0usize;
            for value in &x {
                out.push(match value {
                    Value::Null => Value::Null,
                    Value::Bool(v) => Value::Int(i64::from(*v)),
                    Value::Int(v) => Value::Int(*v),
                    Value::Float(v) if v.is_finite() => Value::Int(v.trunc() as i64),
                    Value::Float(_) => {
                        failed += 1;
                        Value::Null
                    }
                    Value::Text(text) => match text.trim().parse::<i64>() {
                        Ok(v) => Value::Int(v),
                        Err(_) => {
                            failed += 1;
                            Value::Null
                        }
                    },
                });
            }
            if failed > 0 {
                args.ctx.warn(
                    "coercion_to_null",
                    format!("as_int(): {failed} value(s) could not be converted"),
                );
            }
            Ok(out)
        }
        Builtin::AsFloat => {
            let x = args.required(0)?;
            let mut out = Vec::with_capacity(x.len());
            let mut failed = 0usize;
            for value in &x {
                out.push(match value {
                    Value::Null => Value::Null,
                    Value::Bool(v) => Value::Float(f64::from(u8::from(*v))),
                    Value::Int(v) => Value::Float(*v as f64),
                    Value::Float(v) => Value::Float(*v),
                    Value::Text(text) => match text.trim().parse::<f64>() {
                        Ok(v) => Value::Float(v),
                        Err(_) => {
                            failed += 1;
                            Value::Null
                        }
                    },
                });
            }
            if failed > 0 {
                args.ctx.warn(
                    "coercion_to_null",
                    format!("as_float(): {failed} value(s) could not be converted"),
                );
            }
            Ok(out)
        }
        Builtin::IsNull => {
            let x = args.required(0)?;
            Ok(x.iter().map(|value| Value::Bool(value.is_null())).collect())
        }
        Builtin::DrawBinary => {
            let prob = args.params(0, "prob")?;
            let n = args.n(1)?;
            let link = args.link(2)?;
            Ok(distributions::draw_binary(&prob, n, link, args.ctx.rng())?)
        }
        Builtin::DrawBinomial => {
            let prob = args.params(0, "prob")?;
            let trials = args.params(1, "trials")?;
            let n = args.n(2)?;
            let link = args.link(3)?;
            Ok(distributions::draw_binomial(
                &prob,
                &trials,
                n,
                link,
                args.ctx.rng(),
            )?)
        }
        Builtin::DrawCount => {
            let mean = args.params(0, "mean")?;
            let n = args.n(1)?;
            Ok(distributions::draw_count(&mean, n, args.ctx.rng())?)
        }
        Builtin::DrawCategorical => {
            let prob = args.complete_params(0, "prob")?;
            let n = args.n(1)?;
            let categories = args.labels(2)?;
            Ok(distributions::draw_categorical(
                &prob,
                n,
                categories.as_deref(),
                args.ctx.rng(),
            )?)
        }
        Builtin::DrawOrdered => {
            let x = args.params(0, "x")?;
            let breaks = args.complete_params(1, "breaks")?;
            let labels = args.labels(2)?;
            Ok(distributions::draw_ordered(&x, &breaks, labels.as_deref())?)
        }
        Builtin::DrawNormal => {
            let mean = args.params_or(0, "mean", 0.0)?;
            let sd = args.params_or(1, "sd", 1.0)?;
            let n = args.n(2)?;
            Ok(distributions::draw_normal(&mean, &sd, n, args.ctx.rng())?)
        }
        Builtin::DrawUniform => {
            let min = args.params_or(0, "min", 0.0)?;
            let max = args.params_or(1, "max", 1.0)?;
            let n = args.n(2)?;
            Ok(distributions::draw_uniform(&min, &max, n, args.ctx.rng())?)
        }
    }
}

struct Args<'c, 'e, 'a> {
    call: &'c Call,
    ctx: &'e mut EvalContext<'a>,
}

impl Args<'_, '_, '_> {
    fn name(&self) -> &'static str {
        self.call.builtin.name()
    }

    fn optional(&mut self, idx: usize) -> Result<Option<Column>, EvalError> {
        match self.call.args.get(idx) {
            Some(Some(expr)) => eval(expr, self.ctx).map(Some),
            _ => Ok(None),
        }
    }

    fn required(&mut self, idx: usize) -> Result<Column, EvalError> {
        self.optional(idx)?.ok_or_else(|| {
            EvalError::Type(format!("{}(): missing argument #{}", self.name(), idx + 1))
        })
    }

    /// Non-negative integer scalar such as `times` or `each`.
    fn count(&mut self, idx: usize, param: &str) -> Result<usize, EvalError> {
        let name = self.name();
        let values = self.required(idx)?;
        scalar(name, param, &values)?
            .as_i64()
            .and_then(|value| usize::try_from(value).ok())
            .ok_or_else(|| {
                EvalError::Type(format!(
                    "{name}(): '{param}' must be a non-negative integer"
                ))
            })
    }

    /// Numeric parameter vector. Missing entries are kept as `None` and
    /// reported as a warning.
    fn params(&mut self, idx: usize, param: &str) -> Result<Vec<Option<f64>>, EvalError> {
        let name = self.name();
        let values = self.required(idx)?;
        let floats = values
            .iter()
            .map(|value| float_of(name, value))
            .collect::<Result<Vec<_>, _>>()?;
        let missing = floats.iter().filter(|value| value.is_none()).count();
        if missing > 0 {
            self.ctx.warn(
                "missing_parameter",
                format!(
                    "{name}(): '{param}' has {missing} missing value(s); affected draws are null"
                ),
            );
        }
        Ok(floats)
    }

    fn params_or(
        &mut self,
        idx: usize,
        param: &str,
        default: f64,
    ) -> Result<Vec<Option<f64>>, EvalError> {
        match self.call.args.get(idx) {
            Some(Some(_)) => self.params(idx, param),
            _ => Ok(vec![Some(default)]),
        }
    }

    /// Numeric parameter vector that must not contain missing values.
    fn complete_params(&mut self, idx: usize, param: &str) -> Result<Vec<f64>, EvalError> {
        let name = self.name();
        let values = self.required(idx)?;
        let mut out = Vec::with_capacity(values.len());
        for value in &values {
            match float_of(name, value)? {
                Some(value) => out.push(value),
                None => {
                    return Err(DistributionError::Invalid(format!(
                        "'{param}' must not contain missing values"
                    ))
                    .into());
                }
            }
        }
        Ok(out)
    }

    /// Draw count; defaults to the calling level's row count.
    fn n(&mut self, idx: usize) -> Result<usize, EvalError> {
        let Some(values) = self.optional(idx)? else {
            return Ok(self.ctx.rows());
        };
        let invalid = || DistributionError::Invalid("N must be a positive integer".to_string());
        if values.len() != 1 {
            return Err(invalid().into());
        }
        let n = values[0]
            .as_i64()
            .filter(|n| *n > 0)
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(invalid)?;
        if n > self.ctx.limit() {
            return Err(DistributionError::Invalid(format!(
                "N ({n}) exceeds the limit of {} draws",
                self.ctx.limit()
            ))
            .into());
        }
        Ok(n)
    }

    fn link(&mut self, idx: usize) -> Result<Link, EvalError> {
        let name = self.name();
        match self.optional(idx)? {
            None => Ok(Link::default()),
            Some(values) => match scalar(name, "link", &values)? {
                Value::Text(text) => Ok(text.parse::<Link>()?),
                other => Err(DistributionError::UnknownLink(other.to_string()).into()),
            },
        }
    }

    fn labels(&mut self, idx: usize) -> Result<Option<Vec<String>>, EvalError> {
        Ok(self
            .optional(idx)?
            .map(|values| values.iter().map(Value::to_string).collect()))
    }
}

fn scalar<'v>(builtin: &str, param: &str, values: &'v [Value]) -> Result<&'v Value, EvalError> {
    match values {
        [value] => Ok(value),
        _ => Err(EvalError::Type(format!(
            "{builtin}(): '{param}' must be a single value, got {}",
            values.len()
        ))),
    }
}

fn float_of(builtin: &str, value: &Value) -> Result<Option<f64>, EvalError> {
    match value {
        Value::Null => Ok(None),
        Value::Bool(v) => Ok(Some(f64::from(u8::from(*v)))),
        Value::Int(v) => Ok(Some(*v as f64)),
        Value::Float(v) => Ok(Some(*v)),
        Value::Text(text) => Err(EvalError::Type(format!(
            "{builtin}(): expected a number, got text '{text}'"
        ))),
    }
}

fn unary_float(args: &mut Args<'_, '_, '_>, f: fn(f64) -> f64) -> Result<Column, EvalError> {
    let name = args.name();
    let x = args.required(0)?;
    let mut produced_nan = false;
    let out = x
        .iter()
        .map(|value| {
            Ok(match float_of(name, value)? {
                None => Value::Null,
                Some(v) => {
                    let result = f(v);
                    if result.is_nan() {
                        produced_nan = true;
                        Value::Null
                    } else {
                        Value::Float(result)
                    }
                }
            })
        })
        .collect::<Result<Column, EvalError>>()?;
    if produced_nan {
        args.ctx
            .warn("nan_produced", format!("{name}(): undefined results set to null"));
    }
    Ok(out)
}

fn seq(args: &mut Args<'_, '_, '_>) -> Result<Column, EvalError> {
    let name = args.name();
    let from = args.required(0)?;
    let to = args.required(1)?;
    let by = args.optional(2)?;
    let from = scalar(name, "from", &from)?.clone();
    let to = scalar(name, "to", &to)?.clone();
    let by = match &by {
        Some(by) => scalar(name, "by", by)?.clone(),
        None => Value::Int(if matches!((from.as_f64(), to.as_f64()), (Some(a), Some(b)) if a > b) {
            -1
        } else {
            1
        }),
    };

    let (Some(start), Some(end), Some(step)) = (from.as_f64(), to.as_f64(), by.as_f64()) else {
        return Err(EvalError::Type(format!(
            "{name}(): 'from', 'to' and 'by' must be numbers"
        )));
    };
    if step == 0.0 || (end - start) * step < 0.0 {
        return Err(EvalError::Type(format!(
            "{name}(): 'by' has the wrong sign or is zero"
        )));
    }

    let steps = ((end - start) / step + 1e-10).floor();
    let count = if steps.is_finite() && steps < args.ctx.limit() as f64 {
        Some(steps as usize + 1)
    } else {
        None
    };
    let count = args.ctx.check_len(&format!("{name}()"), count)?;
    let integral = matches!(
        (&from, &by),
        (Value::Int(_), Value::Int(_))
    );
    Ok((0..count)
        .map(|i| {
            let value = start + step * i as f64;
            if integral {
                Value::Int(value as i64)
            } else {
                Value::Float(value)
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::super::parse_expression;
    use super::*;
    use crate::level::{EvalWarning, Expression};
    use crate::scope::{ScopeChain, VariableTable};

    fn run_with(source: &str, rows: usize) -> (Result<Column, EvalError>, Vec<EvalWarning>) {
        run_limited(source, rows, crate::model::DEFAULT_MAX_ROWS)
    }

    fn run_limited(
        source: &str,
        rows: usize,
        limit: usize,
    ) -> (Result<Column, EvalError>, Vec<EvalWarning>) {
        let mut table = VariableTable::new(rows);
        table.push(
            "p",
            (0..rows)
                .map(|i| if i == 0 { Value::Null } else { Value::Float(0.5) })
                .collect(),
        );
        let chain = ScopeChain::detached("units", rows);
        let scope = chain.scope(&table);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let mut warnings = Vec::new();
        let result = {
            let mut ctx = EvalContext::new(&scope, &mut rng, &mut warnings).with_limit(limit);
            parse_expression(source).expect("parse").evaluate(&mut ctx)
        };
        (result, warnings)
    }

    fn run(source: &str) -> Result<Column, EvalError> {
        run_with(source, 4).0
    }

    #[test]
    fn lookup_is_by_name() {
        for builtin in Builtin::all() {
            assert_eq!(Builtin::lookup(builtin.name()), Some(*builtin));
        }
        assert_eq!(Builtin::lookup("mean"), None);
    }

    #[test]
    fn if_else_selects_per_row() {
        assert_eq!(
            run("if_else([true, false, null], 'yes', ['a', 'b', 'c'])").unwrap(),
            vec![Value::from("yes"), Value::from("b"), Value::Null]
        );
    }

    #[test]
    fn repetition_and_sequences() {
        assert_eq!(
            run("rep([1, 2], 2)").unwrap(),
            vec![Value::Int(1), Value::Int(2), Value::Int(1), Value::Int(2)]
        );
        assert_eq!(
            run("rep_each(['a', 'b'], 2)").unwrap(),
            vec![
                Value::from("a"),
                Value::from("a"),
                Value::from("b"),
                Value::from("b"),
            ]
        );
        assert_eq!(
            run("seq(1, N)").unwrap(),
            vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)]
        );
        assert_eq!(
            run("seq(0, 1, by = 0.5)").unwrap(),
            vec![Value::Float(0.0), Value::Float(0.5), Value::Float(1.0)]
        );
        assert!(run("seq(1, 5, by = -1)").is_err());
    }

    #[test]
    fn built_vectors_respect_the_length_limit() {
        for source in [
            "rep([1, 2, 3], 9223372036854775807)",
            "rep_each([1, 2], 4611686018427387904)",
            "seq(0, 1e300)",
            "seq(0, 1e400)",
        ] {
            assert!(
                matches!(run(source), Err(EvalError::Type(_))),
                "{source} should fail"
            );
        }
        assert!(matches!(
            run("draw_normal(N = 1000000000000)"),
            Err(EvalError::Distribution(DistributionError::Invalid(_)))
        ));

        assert!(run_limited("rep([1, 2], 3)", 4, 5).0.is_err());
        assert!(run_limited("seq(1, 6)", 4, 5).0.is_err());
        assert!(run_limited("draw_count(mean = 1, N = 6)", 4, 5).0.is_err());
        assert_eq!(run_limited("rep([1, 2], 2)", 4, 4).0.unwrap().len(), 4);
        assert_eq!(run_limited("seq(1, 5)", 4, 5).0.unwrap().len(), 5);
    }

    #[test]
    fn numeric_helpers() {
        assert_eq!(run("round(3.14159, 2)").unwrap(), vec![Value::Float(3.14)]);
        assert_eq!(run("abs(-3)").unwrap(), vec![Value::Int(3)]);
        assert_eq!(
            run("pmax([1, 5], 3)").unwrap(),
            vec![Value::Int(3), Value::Int(5)]
        );
        assert_eq!(
            run("as_int(['7', 'x'])").unwrap(),
            vec![Value::Int(7), Value::Null]
        );
        assert_eq!(
            run("paste('unit', seq(1, 2), sep = '-')").unwrap(),
            vec![Value::from("unit-1"), Value::from("unit-2")]
        );
    }

    #[test]
    fn draws_default_to_level_rows() {
        let out = run("draw_binary(prob = 0.3)").unwrap();
        assert_eq!(out.len(), 4);
        assert!(out.iter().all(|v| matches!(v, Value::Int(0) | Value::Int(1))));

        assert_eq!(run("draw_normal(N = 2)").unwrap().len(), 2);
        assert_eq!(run("draw_count(mean = 3)").unwrap().len(), 4);
    }

    #[test]
    fn missing_probabilities_warn_and_yield_null() {
        let (result, warnings) = run_with("draw_binary(p)", 4);
        let out = result.unwrap();
        assert_eq!(out[0], Value::Null);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, "missing_parameter");
    }

    #[test]
    fn distribution_failures_surface_as_distribution_errors() {
        assert!(matches!(
            run("draw_binary(1.5)"),
            Err(EvalError::Distribution(DistributionError::OutOfRange { .. }))
        ));
        assert!(matches!(
            run("draw_binary(0.5, link = 'cloglog')"),
            Err(EvalError::Distribution(DistributionError::UnknownLink(_)))
        ));
        assert!(matches!(
            run("draw_binary([0.1, 0.2, 0.3])"),
            Err(EvalError::Distribution(DistributionError::LengthMismatch { .. }))
        ));
        assert!(matches!(
            run("draw_count(mean = 2, N = 0)"),
            Err(EvalError::Distribution(DistributionError::Invalid(_)))
        ));
    }

    #[test]
    fn ordered_draw_uses_labels() {
        assert_eq!(
            run("draw_ordered([0.1, 0.9], breaks = [0, 0.5, 1], labels = ['lo', 'hi'])").unwrap(),
            vec![Value::from("lo"), Value::from("hi")]
        );
    }
}
