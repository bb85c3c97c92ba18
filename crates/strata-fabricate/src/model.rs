use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use strata_plan::PipelinePlan;

/// Default upper bound on the rows of any single level.
pub const DEFAULT_MAX_ROWS: usize = 10_000_000;

/// Options for the fabrication engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FabricateOptions {
    /// Seed of the random source shared by every draw in a run.
    pub seed: u64,
    /// Maximum number of rows any level may produce.
    pub max_rows: usize,
    /// Fail the run when any warning was recorded.
    pub strict: bool,
}

impl Default for FabricateOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            max_rows: DEFAULT_MAX_ROWS,
            strict: false,
        }
    }
}

impl FabricateOptions {
    /// Overlay the seed and options declared by a pipeline file.
    pub fn with_plan(mut self, plan: &PipelinePlan) -> Self {
        if let Some(seed) = plan.seed {
            self.seed = seed;
        }
        if let Some(options) = &plan.options {
            if let Some(strict) = options.strict {
                self.strict = strict;
            }
            if let Some(max_rows) = options.max_rows {
                self.max_rows = usize::try_from(max_rows).unwrap_or(usize::MAX);
            }
        }
        self
    }
}

/// Summary of one fabricated level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LevelReport {
    pub name: String,
    pub rows: usize,
    pub variables: Vec<String>,
    pub duration_ms: u64,
}

/// Structured non-fatal issue raised during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FabricationIssue {
    pub code: String,
    pub level: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    pub message: String,
}

/// Report for a fabrication run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FabricationReport {
    pub run_id: String,
    pub seed: u64,
    pub rows: usize,
    pub columns: Vec<String>,
    pub levels: Vec<LevelReport>,
    pub warnings_by_code: BTreeMap<String, u64>,
    pub warnings: Vec<FabricationIssue>,
    pub duration_ms: u64,
}

impl FabricationReport {
    pub fn new(run_id: String, seed: u64) -> Self {
        Self {
            run_id,
            seed,
            rows: 0,
            columns: Vec::new(),
            levels: Vec::new(),
            warnings_by_code: BTreeMap::new(),
            warnings: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn record_warning(&mut self, issue: FabricationIssue) {
        *self.warnings_by_code.entry(issue.code.clone()).or_insert(0) += 1;
        self.warnings.push(issue);
    }
}
