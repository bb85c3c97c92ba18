mod registry;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use registry::{
    OutputFormat, RunContext, RunOptions, init_run_logging, start_run, write_report,
    write_resolved_plan, write_table,
};
use strata_fabricate::{FabricateOptions, FabricationEngine, FabricationError, compile_plan};
use strata_plan::{
    PlanError, ValidatedPlan, ValidationReport, load_plan_value, plan_json_schema_value,
    validate_plan,
};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("plan error: {0}")]
    Plan(#[from] PlanError),
    #[error("plan validation failed with {0} error(s)")]
    Validation(usize),
    #[error("fabrication error: {0}")]
    Fabrication(#[from] FabricationError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "strata", version, about = "Hierarchical synthetic data fabrication")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fabricate one table from a pipeline file.
    Fabricate(FabricateArgs),
    /// Validate a pipeline file without fabricating.
    Validate(ValidateArgs),
    /// Print the JSON Schema of pipeline files.
    Schema(SchemaArgs),
}

#[derive(Args, Debug)]
struct FabricateArgs {
    /// Pipeline file (JSON, or TOML by extension).
    #[arg(long, value_name = "FILE")]
    plan: PathBuf,
    /// Seed overriding the one declared by the pipeline.
    #[arg(long)]
    seed: Option<u64>,
    /// Output directory for runs.
    #[arg(long, default_value = "runs")]
    run_dir: PathBuf,
    /// Optional extra copy of the data file.
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,
    /// Data file format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,
    /// Fail when any warning is recorded.
    #[arg(long, default_value_t = false)]
    strict: bool,
    /// Upper bound on the rows of any level.
    #[arg(long)]
    max_rows: Option<usize>,
}

#[derive(Args, Debug)]
struct ValidateArgs {
    /// Pipeline file (JSON, or TOML by extension).
    #[arg(long, value_name = "FILE")]
    plan: PathBuf,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Write the schema to a file instead of stdout.
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Fabricate(args) => run_fabricate(args),
        Command::Validate(args) => run_validate(&args.plan).map(|_| ()),
        Command::Schema(args) => run_schema(args),
    }
}

fn run_fabricate(args: FabricateArgs) -> Result<(), CliError> {
    let validated = run_validate(&args.plan)?;
    let plan = validated.plan;

    let mut options = FabricateOptions::default().with_plan(&plan);
    if let Some(seed) = args.seed {
        options.seed = seed;
    }
    if let Some(max_rows) = args.max_rows {
        options.max_rows = max_rows;
    }
    options.strict |= args.strict;

    let fabrication = compile_plan(&plan)?;

    let run_id = Uuid::new_v4().to_string();
    let run_ctx = RunContext {
        run_id: run_id.clone(),
        started_at: chrono::Utc::now(),
        plan_path: args.plan.clone(),
        plan_version: plan.plan_version.clone(),
        run_dir: args.run_dir,
        out: args.out,
        options: RunOptions {
            seed: options.seed,
            strict: options.strict,
            max_rows: options.max_rows,
            format: args.format,
        },
    };

    let run_paths = start_run(&run_ctx)?;
    init_run_logging(&run_paths.logs_path)?;
    tracing::info!(event = "run_started", run_id = %run_id, plan = %args.plan.display());

    let timer = Instant::now();
    write_resolved_plan(&run_paths, &plan)?;

    let engine = FabricationEngine::new(options).with_run_id(run_id.clone());
    let result = engine.run(&fabrication)?;

    let bytes = write_table(&run_paths, &result.table, run_ctx.out.as_deref())?;
    tracing::info!(
        event = "data_written",
        path = %run_paths.data_path.display(),
        bytes
    );

    write_report(&run_paths, &result.report)?;
    tracing::info!(event = "report_written", path = %run_paths.report_path.display());

    tracing::info!(
        event = "run_finished",
        status = "success",
        rows = result.table.rows(),
        duration_ms = timer.elapsed().as_millis() as u64
    );
    println!("{}", run_paths.root.display());

    Ok(())
}

fn run_validate(path: &Path) -> Result<ValidatedPlan, CliError> {
    let plan_json = load_plan_value(path)?;
    match validate_plan(&plan_json) {
        Ok(validated) => {
            if validated.warnings.is_empty() {
                eprintln!("plan validated successfully");
            } else {
                eprintln!("plan validated with warnings:");
                print_report(&ValidationReport {
                    errors: Vec::new(),
                    warnings: validated.warnings.clone(),
                });
            }
            Ok(validated)
        }
        Err(report) => {
            eprintln!("plan validation failed");
            print_report(&report);
            Err(CliError::Validation(report.errors.len()))
        }
    }
}

fn run_schema(args: SchemaArgs) -> Result<(), CliError> {
    let schema = plan_json_schema_value()?;
    let json = serde_json::to_string_pretty(&schema)?;
    match args.out {
        Some(path) => std::fs::write(path, json)?,
        None => println!("{json}"),
    }
    Ok(())
}

fn print_report(report: &ValidationReport) {
    for issue in &report.errors {
        eprintln!("error {} {}: {}", issue.code, issue.path, issue.message);
        if let Some(hint) = &issue.hint {
            eprintln!("  hint: {hint}");
        }
    }
    for issue in &report.warnings {
        eprintln!("warning {} {}: {}", issue.code, issue.path, issue.message);
        if let Some(hint) = &issue.hint {
            eprintln!("  hint: {hint}");
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn fabricate_flags_parse() {
        let cli = Cli::try_parse_from([
            "strata",
            "fabricate",
            "--plan",
            "plans/examples/regions.plan.json",
            "--seed",
            "9",
            "--format",
            "json",
            "--strict",
        ])
        .unwrap();
        let Command::Fabricate(args) = cli.command else {
            panic!("expected fabricate");
        };
        assert_eq!(args.seed, Some(9));
        assert_eq!(args.format, OutputFormat::Json);
        assert!(args.strict);
        assert_eq!(args.run_dir, PathBuf::from("runs"));
    }
}
