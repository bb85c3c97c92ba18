use std::env;
use std::path::PathBuf;

use strata_plan::{ValidationReport, load_plan_value, validate_plan};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let plan_path = args.next().map(PathBuf::from).ok_or("missing plan path")?;
    if args.next().is_some() {
        return Err("unexpected argument".into());
    }

    let plan_json = load_plan_value(&plan_path)?;
    let validated = match validate_plan(&plan_json) {
        Ok(validated) => validated,
        Err(report) => {
            eprintln!("plan validation failed");
            print_report(&report);
            std::process::exit(1);
        }
    };

    if !validated.warnings.is_empty() {
        eprintln!("plan validated with warnings:");
        print_report(&ValidationReport {
            errors: Vec::new(),
            warnings: validated.warnings,
        });
    } else {
        println!(
            "plan validated successfully ({} level(s))",
            validated.plan.levels.len().max(1)
        );
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
