use std::env;
use std::path::PathBuf;

use strata_fabricate::output::write_table_csv;
use strata_fabricate::{FabricateOptions, FabricationEngine, compile_plan};
use strata_plan::{PipelinePlan, load_plan_value};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut args = env::args().skip(1);
    let mut plan_path: Option<PathBuf> = None;
    let mut out_path: Option<PathBuf> = None;
    let mut seed: Option<u64> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--plan" => plan_path = args.next().map(PathBuf::from),
            "--out" => out_path = args.next().map(PathBuf::from),
            "--seed" => seed = args.next().map(|raw| raw.parse()).transpose()?,
            _ => {
                if plan_path.is_none() {
                    plan_path = Some(PathBuf::from(arg));
                } else {
                    return Err("unexpected argument".into());
                }
            }
        }
    }

    let plan_path = plan_path.ok_or("missing --plan path")?;
    let out_path = out_path.unwrap_or_else(|| PathBuf::from("data.csv"));
    let plan: PipelinePlan = serde_json::from_value(load_plan_value(&plan_path)?)?;

    let mut options = FabricateOptions::default().with_plan(&plan);
    if let Some(seed) = seed {
        options.seed = seed;
    }

    let fabrication = compile_plan(&plan)?;
    let result = FabricationEngine::new(options).run(&fabrication)?;
    let bytes = write_table_csv(&out_path, &result.table)?;

    println!(
        "rows={} bytes={} out={}",
        result.table.rows(),
        bytes,
        out_path.display()
    );
    Ok(())
}
