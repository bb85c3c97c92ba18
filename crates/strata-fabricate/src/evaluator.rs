use std::time::Instant;

use rand::RngCore;
use tracing::debug;

use strata_core::{Value, recycle};

use crate::errors::{EvalError, FabricationError};
use crate::hierarchy::{HierarchyPlan, resolve_child_counts};
use crate::level::{EvalContext, EvalWarning, Level, SizeSpec};
use crate::model::FabricationIssue;
use crate::scope::{ScopeChain, VariableTable};

/// Context label used for errors raised by a size specifier.
pub const SIZE_CONTEXT: &str = "N";

/// Compute the per-parent child counts of the next level.
///
/// Size expressions are evaluated against the parent level (and its
/// ancestors); `N` there is the parent's row count. The root level's size is
/// evaluated in an empty scope.
pub fn resolve_level_size(
    level: &Level,
    plan: &HierarchyPlan,
    tables: &[VariableTable],
    rng: &mut dyn RngCore,
    issues: &mut Vec<FabricationIssue>,
    max_rows: usize,
) -> Result<Vec<usize>, FabricationError> {
    let name = level.name();
    let parent_rows = plan.depth().checked_sub(1).map(|parent| plan.rows(parent));

    let values: Vec<Value> = match level.size() {
        SizeSpec::Count(count) => vec![Value::Int(*count as i64)],
        SizeSpec::PerParent(counts) => counts.iter().map(|count| Value::Int(*count as i64)).collect(),
        SizeSpec::Computed(expr) => {
            let mut warnings = Vec::new();
            let result = match plan.depth().checked_sub(1) {
                None => {
                    let chain = ScopeChain::detached(name, 1);
                    let empty = VariableTable::new(1);
                    let scope = chain.scope(&empty);
                    let mut ctx =
                        EvalContext::new(&scope, rng, &mut warnings).with_limit(max_rows);
                    expr.evaluate(&mut ctx)
                }
                Some(parent) => {
                    let chain = ScopeChain::new(plan, tables, parent);
                    let scope = chain.scope(&tables[parent]);
                    let mut ctx =
                        EvalContext::new(&scope, rng, &mut warnings).with_limit(max_rows);
                    expr.evaluate(&mut ctx)
                }
            };
            collect_warnings(name, SIZE_CONTEXT, warnings, issues);
            result.map_err(|err| match err {
                EvalError::UndefinedVariable(_) => FabricationError::from_eval(name, SIZE_CONTEXT, err),
                other => FabricationError::configuration(name, format!("size expression failed: {other}")),
            })?
        }
    };

    resolve_child_counts(name, &values, parent_rows, max_rows)
}

/// Evaluate every variable of the level at `tables.len()`.
///
/// The level's rows must already be in `plan`. Variables run in declaration
/// order; each one sees the level's identifier column, the variables
/// declared before it, and every ancestor variable broadcast to this level.
/// No expression may build a vector longer than `max_rows`.
pub fn evaluate_level(
    level: &Level,
    plan: &HierarchyPlan,
    tables: &[VariableTable],
    rng: &mut dyn RngCore,
    issues: &mut Vec<FabricationIssue>,
    max_rows: usize,
) -> Result<VariableTable, FabricationError> {
    let depth = tables.len();
    if plan.depth() != depth + 1 || plan.name(depth) != level.name() {
        return Err(FabricationError::configuration(
            level.name(),
            "level size must be resolved before its variables are evaluated",
        ));
    }

    let rows = plan.rows(depth);
    let mut table = VariableTable::new(rows);
    table.push(
        level.name(),
        (1..=rows).map(|row| Value::Int(row as i64)).collect(),
    );

    let chain = ScopeChain::new(plan, tables, depth);
    for variable in level.variables() {
        let start = Instant::now();
        let mut warnings = Vec::new();
        let result = {
            let scope = chain.scope(&table);
            let mut ctx =
                EvalContext::new(&scope, rng, &mut warnings).with_limit(max_rows);
            variable.expression().evaluate(&mut ctx)
        };
        collect_warnings(level.name(), variable.name(), warnings, issues);

        let values = result.map_err(|err| FabricationError::from_eval(level.name(), variable.name(), err))?;
        let column = recycle(values, rows).map_err(|err| {
            FabricationError::from_eval(level.name(), variable.name(), EvalError::from(err))
        })?;

        debug!(
            level = %level.name(),
            variable = %variable.name(),
            rows,
            duration_us = start.elapsed().as_micros() as u64,
            "variable evaluated"
        );
        table.push(variable.name(), column);
    }

    Ok(table)
}

fn collect_warnings(
    level: &str,
    variable: &str,
    warnings: Vec<EvalWarning>,
    issues: &mut Vec<FabricationIssue>,
) {
    issues.extend(warnings.into_iter().map(|warning| FabricationIssue {
        code: warning.code.to_string(),
        level: level.to_string(),
        variable: Some(variable.to_string()),
        message: warning.message,
    }));
}
