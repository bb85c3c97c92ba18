use std::path::{Path, PathBuf};

use serde_json::json;
use strata_plan::{
    LevelDecl, PipelinePlan, SizeDecl, VariableDecl, load_plan_value, validate_plan,
    validate_plan_json, validate_plan_semantics,
};

fn example(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../plans/examples")
        .join(name)
}

fn plan_with_levels(levels: Vec<LevelDecl>) -> PipelinePlan {
    PipelinePlan {
        plan_version: "0.1".to_string(),
        seed: Some(1),
        n: None,
        variables: Vec::new(),
        levels,
        options: None,
    }
}

fn level(name: &str, n: SizeDecl, variables: &[(&str, &str)]) -> LevelDecl {
    LevelDecl {
        name: name.to_string(),
        n,
        variables: variables
            .iter()
            .map(|(name, expr)| VariableDecl::new(*name, *expr))
            .collect(),
    }
}

#[test]
fn bundled_json_plan_validates() {
    let plan_json = load_plan_value(&example("regions.plan.json")).expect("load plan");
    let schema = strata_plan::plan_json_schema_value().expect("schema json");

    let structural = validate_plan_json(&plan_json, &schema).expect("validate against schema");
    assert!(structural.errors.is_empty(), "structural errors found");

    let validated = validate_plan(&plan_json).expect("plan validation should succeed");
    assert!(validated.warnings.is_empty(), "unexpected warnings");
    assert_eq!(validated.plan.levels.len(), 2);
}

#[test]
fn bundled_toml_plan_validates() {
    let plan_json = load_plan_value(&example("schools.plan.toml")).expect("load toml plan");
    let validated = validate_plan(&plan_json).expect("plan validation should succeed");

    let levels: Vec<&str> = validated
        .plan
        .levels
        .iter()
        .map(|level| level.name.as_str())
        .collect();
    assert_eq!(levels, ["schools", "classrooms", "students"]);
    assert!(matches!(validated.plan.levels[1].n, SizeDecl::Expr(_)));
}

#[test]
fn root_size_mixed_with_levels_is_rejected() {
    let plan_json = load_plan_value(&example("mixed_root.plan.json")).expect("load plan");
    let report = validate_plan(&plan_json).unwrap_err();
    assert!(report.has_code("mixed_root_and_levels"));
}

#[test]
fn structural_errors_point_at_the_offending_field() {
    let plan_json = json!({
        "plan_version": "0.1",
        "levels": [{ "name": "regions", "n": 2.5 }]
    });
    let report = validate_plan(&plan_json).unwrap_err();
    assert!(report.has_code("schema_violation"));
    assert!(
        report
            .errors
            .iter()
            .any(|issue| issue.path.starts_with("/levels/0"))
    );
}

#[test]
fn per_parent_sizes_must_match_parent_rows() {
    let plan = plan_with_levels(vec![
        level("regions", SizeDecl::Count(3), &[]),
        level("districts", SizeDecl::PerParent(vec![1, 2]), &[]),
    ]);
    let report = validate_plan_semantics(&plan);
    assert!(report.has_code("size_length_mismatch"));
}

#[test]
fn root_level_rejects_per_parent_sizes() {
    let plan = plan_with_levels(vec![level("regions", SizeDecl::PerParent(vec![1, 2]), &[])]);
    let report = validate_plan_semantics(&plan);
    assert!(report.has_code("root_size_not_scalar"));
}

#[test]
fn non_positive_sizes_are_rejected() {
    let plan = plan_with_levels(vec![
        level("regions", SizeDecl::Count(2), &[]),
        level("districts", SizeDecl::PerParent(vec![1, 0]), &[]),
    ]);
    let report = validate_plan_semantics(&plan);
    assert!(report.has_code("invalid_size"));
}

#[test]
fn naming_rules_are_enforced() {
    let plan = plan_with_levels(vec![
        level("regions", SizeDecl::Count(2), &[("gdp", "1"), ("gdp", "2")]),
        level(
            "districts",
            SizeDecl::Count(2),
            &[("regions", "1"), ("N", "3"), ("gdp", "4")],
        ),
        level("regions", SizeDecl::Count(1), &[]),
    ]);
    let report = validate_plan_semantics(&plan);

    assert!(report.has_code("duplicate_variable"));
    assert!(report.has_code("variable_shadows_level"));
    assert!(report.has_code("reserved_name"));
    assert!(report.has_code("duplicate_level"));
    assert!(
        report
            .warnings
            .iter()
            .any(|issue| issue.code == "shadowed_variable")
    );
}

#[test]
fn literal_sizes_respect_max_rows() {
    let mut plan = plan_with_levels(vec![
        level("regions", SizeDecl::Count(100), &[]),
        level("districts", SizeDecl::Count(100), &[]),
    ]);
    plan.options = Some(strata_plan::PlanOptions {
        strict: None,
        max_rows: Some(5000),
    });
    let report = validate_plan_semantics(&plan);
    assert!(report.has_code("max_rows_exceeded"));
}

#[test]
fn implicit_root_level_is_accepted() {
    let plan = PipelinePlan {
        plan_version: "0.1".to_string(),
        seed: None,
        n: Some(SizeDecl::Count(10)),
        variables: vec![VariableDecl::new("x", "draw_normal()")],
        levels: Vec::new(),
        options: None,
    };
    let report = validate_plan_semantics(&plan);
    assert!(report.is_ok());
    assert!(report.has_code("missing_seed"));
}
