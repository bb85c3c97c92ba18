use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use strata_core::FlatTable;

use crate::assembler::assemble;
use crate::errors::FabricationError;
use crate::evaluator::{evaluate_level, resolve_level_size};
use crate::hierarchy::HierarchyPlan;
use crate::level::Fabrication;
use crate::model::{FabricateOptions, FabricationIssue, FabricationReport, LevelReport};
use crate::scope::VariableTable;

/// Result of a fabrication run.
#[derive(Debug, Clone)]
pub struct FabricationResult {
    pub table: FlatTable,
    pub plan: HierarchyPlan,
    pub report: FabricationReport,
}

/// Entry point for fabricating a hierarchical table.
#[derive(Debug, Clone, Default)]
pub struct FabricationEngine {
    options: FabricateOptions,
    run_id: Option<String>,
}

impl FabricationEngine {
    pub fn new(options: FabricateOptions) -> Self {
        Self {
            options,
            run_id: None,
        }
    }

    /// Use a caller-chosen run id instead of a fresh one.
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn options(&self) -> &FabricateOptions {
        &self.options
    }

    /// Fabricate one table. Any failure aborts the run and discards all
    /// partial state.
    pub fn run(&self, fabrication: &Fabrication) -> Result<FabricationResult, FabricationError> {
        let start = Instant::now();
        let run_id = self
            .run_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let mut report = FabricationReport::new(run_id.clone(), self.options.seed);

        let outcome = self.fabricate(fabrication, &run_id, &mut report);
        report.duration_ms = start.elapsed().as_millis() as u64;

        match outcome {
            Ok((table, plan)) => {
                report.rows = table.rows();
                report.columns = table.column_names().to_vec();
                info!(
                    run_id = %run_id,
                    rows = report.rows,
                    columns = report.columns.len(),
                    warnings = report.warnings.len(),
                    duration_ms = report.duration_ms,
                    "fabrication completed"
                );
                Ok(FabricationResult {
                    table,
                    plan,
                    report,
                })
            }
            Err(err) => {
                warn!(
                    run_id = %run_id,
                    level = err.level().unwrap_or_default(),
                    variable = err.variable().unwrap_or_default(),
                    error = %err,
                    "fabrication failed"
                );
                Err(err)
            }
        }
    }

    fn fabricate(
        &self,
        fabrication: &Fabrication,
        run_id: &str,
        report: &mut FabricationReport,
    ) -> Result<(FlatTable, HierarchyPlan), FabricationError> {
        let levels = fabrication.resolve_levels()?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.options.seed);
        let mut plan = HierarchyPlan::new();
        let mut tables: Vec<VariableTable> = Vec::with_capacity(levels.len());
        let mut issues: Vec<FabricationIssue> = Vec::new();

        info!(
            run_id = %run_id,
            levels = levels.len(),
            seed = self.options.seed,
            strict = self.options.strict,
            "fabrication started"
        );

        for level in levels.iter() {
            let level_start = Instant::now();
            let counts = resolve_level_size(
                level,
                &plan,
                &tables,
                &mut rng,
                &mut issues,
                self.options.max_rows,
            )?;
            plan.push_level(level.name(), counts)?;

            let table = evaluate_level(
                level,
                &plan,
                &tables,
                &mut rng,
                &mut issues,
                self.options.max_rows,
            )?;
            let depth = tables.len();
            let duration_ms = level_start.elapsed().as_millis() as u64;
            info!(
                level = %level.name(),
                rows = plan.rows(depth),
                variables = level.variables().len(),
                duration_ms,
                "level fabricated"
            );
            report.levels.push(LevelReport {
                name: level.name().to_string(),
                rows: plan.rows(depth),
                variables: level
                    .variables()
                    .iter()
                    .map(|variable| variable.name().to_string())
                    .collect(),
                duration_ms,
            });
            tables.push(table);
        }

        for issue in issues {
            warn!(
                code = %issue.code,
                level = %issue.level,
                variable = issue.variable.as_deref().unwrap_or_default(),
                message = %issue.message,
                "fabrication warning"
            );
            report.record_warning(issue);
        }
        if self.options.strict {
            if let Some(issue) = report.warnings.first() {
                return Err(FabricationError::configuration(
                    issue.level.clone(),
                    format!(
                        "strict mode: {} warning(s) recorded, first: {}",
                        report.warnings.len(),
                        issue.message
                    ),
                ));
            }
        }

        let table = assemble(&plan, &tables)?;
        Ok((table, plan))
    }
}
