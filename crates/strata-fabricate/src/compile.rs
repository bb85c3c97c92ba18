use strata_plan::{PipelinePlan, SizeDecl, VariableDecl};

use crate::errors::FabricationError;
use crate::level::{Fabrication, Level, SizeSpec, Variable};

/// Compile a declarative pipeline into an engine request.
///
/// Every expression is parsed here, so syntax errors surface as
/// configuration errors before any row is fabricated.
pub fn compile_plan(plan: &PipelinePlan) -> Result<Fabrication, FabricationError> {
    let mut fabrication = Fabrication::new();

    if let Some(n) = &plan.n {
        fabrication = fabrication.n(compile_size(strata_plan::IMPLICIT_LEVEL, n)?);
    }
    for decl in &plan.variables {
        fabrication = fabrication.variable(compile_variable(strata_plan::IMPLICIT_LEVEL, decl)?);
    }

    for level_decl in &plan.levels {
        let mut level = Level::new(
            level_decl.name.clone(),
            compile_size(&level_decl.name, &level_decl.n)?,
        );
        for decl in &level_decl.variables {
            level = level.variable(compile_variable(&level_decl.name, decl)?);
        }
        fabrication = fabrication.level(level);
    }

    Ok(fabrication)
}

fn compile_variable(level: &str, decl: &VariableDecl) -> Result<Variable, FabricationError> {
    Variable::parse(decl.name.clone(), &decl.expr).map_err(|err| {
        FabricationError::configuration(
            level,
            format!("cannot parse expression of '{}': {err}", decl.name),
        )
    })
}

fn compile_size(level: &str, decl: &SizeDecl) -> Result<SizeSpec, FabricationError> {
    match decl {
        SizeDecl::Count(count) => Ok(SizeSpec::Count(positive(level, *count)?)),
        SizeDecl::PerParent(counts) => Ok(SizeSpec::PerParent(
            counts
                .iter()
                .map(|count| positive(level, *count))
                .collect::<Result<Vec<_>, _>>()?,
        )),
        SizeDecl::Expr(source) => SizeSpec::parse(source).map_err(|err| {
            FabricationError::configuration(level, format!("cannot parse size expression: {err}"))
        }),
    }
}

fn positive(level: &str, count: i64) -> Result<usize, FabricationError> {
    usize::try_from(count)
        .ok()
        .filter(|count| *count > 0)
        .ok_or_else(|| {
            FabricationError::configuration(
                level,
                format!("size must be a positive integer, got {count}"),
            )
        })
}

#[cfg(test)]
mod tests {
    use strata_plan::{LevelDecl, PLAN_VERSION};

    use super::*;

    fn plan(levels: Vec<LevelDecl>) -> PipelinePlan {
        PipelinePlan {
            plan_version: PLAN_VERSION.to_string(),
            seed: Some(1),
            n: None,
            variables: Vec::new(),
            levels,
            options: None,
        }
    }

    #[test]
    fn compiles_levels_in_order() {
        let fabrication = compile_plan(&plan(vec![
            LevelDecl {
                name: "school".to_string(),
                n: SizeDecl::Count(3),
                variables: vec![VariableDecl::new("urban", "draw_binary(0.5)")],
            },
            LevelDecl {
                name: "pupil".to_string(),
                n: SizeDecl::Expr("if_else(urban, 4, 2)".to_string()),
                variables: Vec::new(),
            },
        ]))
        .unwrap();

        let names: Vec<&str> = fabrication.levels().iter().map(Level::name).collect();
        assert_eq!(names, ["school", "pupil"]);
        assert!(matches!(fabrication.levels()[1].size(), SizeSpec::Computed(_)));
    }

    #[test]
    fn syntax_errors_are_configuration_errors() {
        let err = compile_plan(&plan(vec![LevelDecl {
            name: "school".to_string(),
            n: SizeDecl::Count(3),
            variables: vec![VariableDecl::new("broken", "1 +")],
        }]))
        .unwrap_err();
        assert!(matches!(err, FabricationError::Configuration { ref level, .. } if level == "school"));
        assert!(err.to_string().contains("'broken'"));
    }

    #[test]
    fn non_positive_sizes_are_rejected() {
        let err = compile_plan(&plan(vec![LevelDecl {
            name: "school".to_string(),
            n: SizeDecl::PerParent(vec![2, 0]),
            variables: Vec::new(),
        }]))
        .unwrap_err();
        assert!(matches!(err, FabricationError::Configuration { .. }));
    }
}
