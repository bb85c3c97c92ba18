use std::collections::HashSet;
use std::path::Path;

use jsonschema::JSONSchema;
use serde_json::Value;

use strata_core::ROW_COUNT_IDENT;

use crate::errors::{IssueSeverity, PlanError, ValidationIssue, ValidationReport};
use crate::model::{PipelinePlan, SizeDecl, VariableDecl};
use crate::schema::plan_json_schema_value;
use crate::{IMPLICIT_LEVEL, PLAN_VERSION};

/// Validated plan with accumulated warnings.
#[derive(Debug, Clone)]
pub struct ValidatedPlan {
    pub plan: PipelinePlan,
    pub warnings: Vec<ValidationIssue>,
}

/// Read a pipeline file into JSON. Files ending in `.toml` are parsed as
/// TOML, everything else as JSON.
pub fn load_plan_value(path: &Path) -> Result<Value, PlanError> {
    let contents = std::fs::read_to_string(path)?;
    let is_toml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
    if is_toml {
        Ok(toml::from_str::<Value>(&contents)?)
    } else {
        Ok(serde_json::from_str(&contents)?)
    }
}

/// Validate a pipeline JSON document against the pipeline JSON Schema.
pub fn validate_plan_json(
    plan_json: &Value,
    plan_schema: &Value,
) -> Result<ValidationReport, PlanError> {
    let compiled =
        JSONSchema::compile(plan_schema).map_err(|err| PlanError::Schema(err.to_string()))?;

    let mut report = ValidationReport::default();

    if let Err(errors) = compiled.validate(plan_json) {
        for error in errors {
            let path = normalized_json_pointer(&error.instance_path.to_string());
            report.push(ValidationIssue::error(
                "schema_violation",
                path,
                error.to_string(),
            ));
        }
    }

    Ok(report)
}

/// Validate the declarations of a parsed pipeline.
///
/// Checks that can be decided without evaluating expressions run here: level
/// and variable naming, literal sizes, and the shape of the hierarchy.
pub fn validate_plan_semantics(plan: &PipelinePlan) -> ValidationReport {
    let mut report = ValidationReport::default();

    if plan.plan_version != PLAN_VERSION {
        report.push(
            ValidationIssue::warning(
                "plan_version_mismatch",
                "/plan_version",
                format!(
                    "plan version '{}' differs from supported version '{PLAN_VERSION}'",
                    plan.plan_version
                ),
            )
            .with_hint(format!("set plan_version to \"{PLAN_VERSION}\"")),
        );
    }

    if plan.seed.is_none() {
        report.push(
            ValidationIssue::warning("missing_seed", "/seed", "plan has no seed")
                .with_hint("runs are only reproducible with a fixed seed"),
        );
    }

    let max_rows = plan.options.as_ref().and_then(|options| options.max_rows);
    let mut checker = LevelChecker::new(max_rows);

    if plan.levels.is_empty() {
        match &plan.n {
            Some(size) => checker.check_level(IMPLICIT_LEVEL, size, &plan.variables, "", &mut report),
            None => {
                let code = if plan.variables.is_empty() {
                    "empty_plan"
                } else {
                    "missing_size"
                };
                report.push(
                    ValidationIssue::error(code, "/n", "pipeline declares no levels and no size")
                        .with_hint("declare `levels` or a root `n`"),
                );
            }
        }
        return report;
    }

    if plan.n.is_some() || !plan.variables.is_empty() {
        let path = if plan.n.is_some() { "/n" } else { "/variables" };
        report.push(
            ValidationIssue::error(
                "mixed_root_and_levels",
                path,
                "root-level `n`/`variables` cannot be combined with `levels`",
            )
            .with_hint("move the root declarations into the first level"),
        );
    }

    checker.level_names = plan.levels.iter().map(|level| level.name.clone()).collect();
    for (idx, level) in plan.levels.iter().enumerate() {
        let path = format!("/levels/{idx}");
        checker.check_level(&level.name, &level.n, &level.variables, &path, &mut report);
    }

    report
}

/// Validate the plan end-to-end, returning structured issues on failure.
pub fn validate_plan(plan_json: &Value) -> Result<ValidatedPlan, ValidationReport> {
    let structural = plan_json_schema_value()
        .and_then(|schema| validate_plan_json(plan_json, &schema));
    let structural = match structural {
        Ok(report) => report,
        Err(err) => {
            let mut report = ValidationReport::default();
            report.push(ValidationIssue::error(
                "schema_validation_error",
                "/",
                err.to_string(),
            ));
            return Err(report);
        }
    };

    if !structural.is_ok() {
        return Err(structural);
    }

    let plan: PipelinePlan = match serde_json::from_value(plan_json.clone()) {
        Ok(plan) => plan,
        Err(err) => {
            let mut report = ValidationReport::default();
            report.push(ValidationIssue::error(
                "invalid_plan_json",
                "/",
                err.to_string(),
            ));
            return Err(report);
        }
    };

    let semantic = validate_plan_semantics(&plan);
    if !semantic.is_ok() {
        return Err(semantic);
    }

    Ok(ValidatedPlan {
        plan,
        warnings: semantic.warnings,
    })
}

struct LevelChecker {
    max_rows: Option<u64>,
    level_names: HashSet<String>,
    seen_levels: HashSet<String>,
    ancestor_variables: HashSet<String>,
    /// Row count of the previous level when every size so far was literal.
    parent_rows: Option<u64>,
    depth: usize,
}

impl LevelChecker {
    fn new(max_rows: Option<u64>) -> Self {
        Self {
            max_rows,
            level_names: HashSet::new(),
            seen_levels: HashSet::new(),
            ancestor_variables: HashSet::new(),
            parent_rows: None,
            depth: 0,
        }
    }

    fn check_level(
        &mut self,
        name: &str,
        size: &SizeDecl,
        variables: &[VariableDecl],
        path: &str,
        report: &mut ValidationReport,
    ) {
        if name.trim().is_empty() {
            report.push(ValidationIssue::error(
                "empty_name",
                format!("{path}/name"),
                "level name must not be empty",
            ));
        } else if name == ROW_COUNT_IDENT {
            report.push(ValidationIssue::error(
                "reserved_name",
                format!("{path}/name"),
                format!("'{ROW_COUNT_IDENT}' is reserved for the row count"),
            ));
        } else if !self.seen_levels.insert(name.to_string()) {
            report.push(ValidationIssue::error(
                "duplicate_level",
                format!("{path}/name"),
                format!("level '{name}' is declared more than once"),
            ));
        }

        let rows = self.check_size(name, size, &format!("{path}/n"), report);
        if let (Some(rows), Some(max_rows)) = (rows, self.max_rows) {
            if rows > max_rows {
                report.push(ValidationIssue::error(
                    "max_rows_exceeded",
                    format!("{path}/n"),
                    format!("level '{name}' would produce {rows} rows, limit is {max_rows}"),
                ));
            }
        }

        let mut declared = HashSet::new();
        for (idx, variable) in variables.iter().enumerate() {
            let var_path = format!("{path}/variables/{idx}");
            self.check_variable(name, variable, &var_path, &mut declared, report);
        }

        self.ancestor_variables.extend(declared);
        self.parent_rows = rows;
        self.depth += 1;
    }

    fn check_size(
        &self,
        level: &str,
        size: &SizeDecl,
        path: &str,
        report: &mut ValidationReport,
    ) -> Option<u64> {
        let is_root = self.depth == 0;
        match size {
            SizeDecl::Count(count) => {
                if *count <= 0 {
                    report.push(ValidationIssue::error(
                        "invalid_size",
                        path,
                        format!("level '{level}' size must be positive, got {count}"),
                    ));
                    return None;
                }
                let count = *count as u64;
                if is_root {
                    Some(count)
                } else {
                    self.parent_rows.map(|parent| parent.saturating_mul(count))
                }
            }
            SizeDecl::PerParent(counts) => {
                if is_root {
                    report.push(
                        ValidationIssue::error(
                            "root_size_not_scalar",
                            path,
                            format!("root level '{level}' needs a single row count"),
                        )
                        .with_hint("per-parent sizes are only valid below the root level"),
                    );
                    return None;
                }
                if let Some(bad) = counts.iter().find(|count| **count <= 0) {
                    report.push(ValidationIssue::error(
                        "invalid_size",
                        path,
                        format!("level '{level}' sizes must be positive, got {bad}"),
                    ));
                    return None;
                }
                if let Some(parent) = self.parent_rows {
                    if counts.len() as u64 != parent {
                        report.push(ValidationIssue::error(
                            "size_length_mismatch",
                            path,
                            format!(
                                "level '{level}' lists {} sizes for {parent} parent rows",
                                counts.len()
                            ),
                        ));
                        return None;
                    }
                }
                Some(counts.iter().map(|count| *count as u64).sum())
            }
            SizeDecl::Expr(source) => {
                if source.trim().is_empty() {
                    report.push(ValidationIssue::error(
                        "empty_expression",
                        path,
                        format!("level '{level}' has an empty size expression"),
                    ));
                }
                None
            }
        }
    }

    fn check_variable(
        &self,
        level: &str,
        variable: &VariableDecl,
        path: &str,
        declared: &mut HashSet<String>,
        report: &mut ValidationReport,
    ) {
        let name = variable.name.as_str();
        if name.trim().is_empty() {
            report.push(ValidationIssue::error(
                "empty_name",
                format!("{path}/name"),
                format!("variable in level '{level}' has no name"),
            ));
        } else if name == ROW_COUNT_IDENT {
            report.push(ValidationIssue::error(
                "reserved_name",
                format!("{path}/name"),
                format!("'{ROW_COUNT_IDENT}' is reserved for the row count"),
            ));
        } else if name == level || self.level_names.contains(name) {
            report.push(
                ValidationIssue::error(
                    "variable_shadows_level",
                    format!("{path}/name"),
                    format!("variable '{name}' collides with a level identifier"),
                )
                .with_hint("level identifier columns cannot be redefined"),
            );
        } else if !declared.insert(name.to_string()) {
            report.push(ValidationIssue::error(
                "duplicate_variable",
                format!("{path}/name"),
                format!("variable '{name}' is declared twice in level '{level}'"),
            ));
        } else if self.ancestor_variables.contains(name) {
            report.push(ValidationIssue::new(
                IssueSeverity::Warning,
                "shadowed_variable",
                format!("{path}/name"),
                format!("variable '{name}' in level '{level}' shadows an ancestor variable"),
                None,
            ));
        }

        if variable.expr.trim().is_empty() {
            report.push(ValidationIssue::error(
                "empty_expression",
                format!("{path}/expr"),
                format!("variable '{name}' has an empty expression"),
            ));
        }
    }
}

fn normalized_json_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}
