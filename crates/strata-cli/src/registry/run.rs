use std::fs::{OpenOptions, create_dir_all};
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Serialize;

use strata_core::FlatTable;
use strata_fabricate::FabricationReport;
use strata_fabricate::output::{write_table_csv, write_table_json};
use strata_plan::PipelinePlan;

use super::{RegistryError, RegistryResult};

/// Table format of the run's data artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

/// Serializable options for runs.
#[derive(Debug, Clone, Serialize)]
pub struct RunOptions {
    pub seed: u64,
    pub strict: bool,
    pub max_rows: usize,
    pub format: OutputFormat,
}

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub plan_path: PathBuf,
    pub plan_version: String,
    pub run_dir: PathBuf,
    pub out: Option<PathBuf>,
    pub options: RunOptions,
}

/// JSON config written to each run directory.
#[derive(Debug, Serialize)]
pub struct RunConfig {
    pub run_id: String,
    pub started_at: String,
    pub plan_path: String,
    pub plan_version: String,
    pub options: RunOptions,
    pub git: GitInfo,
}

/// Git metadata for reproducibility.
#[derive(Debug, Serialize)]
pub struct GitInfo {
    pub commit: Option<String>,
    pub dirty: Option<bool>,
}

/// Paths for run artifacts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub data_path: PathBuf,
    pub plan_path: PathBuf,
    pub report_path: PathBuf,
    pub logs_path: PathBuf,
    pub format: OutputFormat,
}

/// Create `<run_dir>/<timestamp>__run_<id>/` and write its `config.json`.
pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let timestamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let root = ctx.run_dir.join(format!("{timestamp}__run_{}", ctx.run_id));

    create_dir_all(&root)?;

    let config_path = root.join("config.json");
    let logs_path = root.join("logs.ndjson");
    let format = ctx.options.format;

    let config = RunConfig {
        run_id: ctx.run_id.clone(),
        started_at: ctx.started_at.to_rfc3339(),
        plan_path: ctx.plan_path.display().to_string(),
        plan_version: ctx.plan_version.clone(),
        options: ctx.options.clone(),
        git: collect_git_info(),
    };

    write_json(&config_path, &config)?;

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&logs_path)?;

    Ok(RunPaths {
        data_path: root.join(format!("data.{}", format.extension())),
        plan_path: root.join("resolved_plan.json"),
        report_path: root.join("fabrication_report.json"),
        logs_path,
        format,
        root,
    })
}

pub fn write_resolved_plan(paths: &RunPaths, plan: &PipelinePlan) -> RegistryResult<()> {
    write_json(&paths.plan_path, plan)
}

pub fn write_report(paths: &RunPaths, report: &FabricationReport) -> RegistryResult<()> {
    write_json(&paths.report_path, report)
}

/// Write the fabricated table into the run directory and, when requested,
/// copy it to `out_path`. Returns the bytes written to the run directory.
pub fn write_table(
    paths: &RunPaths,
    table: &FlatTable,
    out_path: Option<&Path>,
) -> RegistryResult<u64> {
    match paths.format {
        OutputFormat::Csv => {
            write_table_csv(&paths.data_path, table).map_err(strata_fabricate::FabricationError::from)?;
        }
        OutputFormat::Json => write_table_json(&paths.data_path, table)?,
    }

    if let Some(out_path) = out_path {
        if let Some(parent) = out_path.parent() {
            if !parent.as_os_str().is_empty() {
                create_dir_all(parent)?;
            }
        }
        std::fs::copy(&paths.data_path, out_path)?;
    }

    Ok(std::fs::metadata(&paths.data_path)?.len())
}

pub fn collect_git_info() -> GitInfo {
    let commit = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            } else {
                None
            }
        })
        .filter(|value| !value.is_empty());

    let dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| !output.stdout.is_empty());

    GitInfo { commit, dirty }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> RegistryResult<()> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)?;
    serde_json::to_writer_pretty(file, value).map_err(RegistryError::from)
}
