use strata_fabricate::distributions::DistributionError;
use strata_fabricate::{
    FabricateOptions, Fabrication, FabricationEngine, FabricationError, FabricationResult, Level,
    SizeSpec,
};

fn run_with(
    fabrication: &Fabrication,
    options: FabricateOptions,
) -> Result<FabricationResult, FabricationError> {
    FabricationEngine::new(options).run(fabrication)
}

fn run(fabrication: &Fabrication) -> Result<FabricationResult, FabricationError> {
    run_with(fabrication, FabricateOptions::default())
}

fn two_levels(child: Level) -> Fabrication {
    Fabrication::new()
        .level(Level::new("region", 2).expr("gdp", "[100, 200]").unwrap())
        .level(child)
}

#[test]
fn non_dividing_result_length_is_a_recycling_error() {
    let fabrication = two_levels(
        Level::new("district", 2)
            .expr("code", "[1, 2, 3]")
            .unwrap(),
    );

    let err = run(&fabrication).unwrap_err();
    match err {
        FabricationError::Recycling {
            level,
            variable,
            len,
            target,
        } => {
            assert_eq!(level, "district");
            assert_eq!(variable, "code");
            assert_eq!((len, target), (3, 4));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn unresolvable_names_are_undefined_variable_errors() {
    let fabrication = two_levels(
        Level::new("district", 2)
            .expr("ratio", "gdp / population")
            .unwrap(),
    );

    let err = run(&fabrication).unwrap_err();
    assert_eq!(err.level(), Some("district"));
    assert_eq!(err.variable(), Some("ratio"));
    assert!(matches!(
        err,
        FabricationError::UndefinedVariable { ref name, .. } if name == "population"
    ));
}

#[test]
fn descendants_are_not_visible_to_ancestors() {
    let fabrication = Fabrication::new()
        .level(Level::new("region", 2).expr("peek", "district").unwrap())
        .level(Level::new("district", 2));

    let err = run(&fabrication).unwrap_err();
    assert!(matches!(err, FabricationError::UndefinedVariable { .. }));
}

#[test]
fn later_siblings_are_not_visible() {
    let fabrication = Fabrication::new().level(
        Level::new("unit", 3)
            .expr("a", "b + 1")
            .unwrap()
            .expr("b", "1")
            .unwrap(),
    );

    let err = run(&fabrication).unwrap_err();
    assert!(matches!(
        err,
        FabricationError::UndefinedVariable { ref variable, ref name, .. }
            if variable == "a" && name == "b"
    ));
}

#[test]
fn distribution_errors_carry_level_and_variable() {
    let fabrication = two_levels(
        Level::new("district", 2)
            .expr("treated", "draw_binary(prob = gdp / 100)")
            .unwrap(),
    );

    let err = run(&fabrication).unwrap_err();
    match &err {
        FabricationError::Distribution {
            level,
            variable,
            source,
        } => {
            assert_eq!(level, "district");
            assert_eq!(variable, "treated");
            assert!(matches!(source, DistributionError::OutOfRange { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn unknown_link_is_a_distribution_error() {
    let fabrication = Fabrication::new().level(
        Level::new("unit", 4)
            .expr("y", "draw_binary(0, link = 'cloglog')")
            .unwrap(),
    );

    let err = run(&fabrication).unwrap_err();
    assert!(matches!(
        err,
        FabricationError::Distribution {
            source: DistributionError::UnknownLink(_),
            ..
        }
    ));
}

#[test]
fn type_errors_are_expression_errors() {
    let fabrication = Fabrication::new().level(
        Level::new("unit", 2)
            .expr("label", "'a' + 1")
            .unwrap(),
    );

    let err = run(&fabrication).unwrap_err();
    assert!(matches!(err, FabricationError::Expression { .. }));
}

#[test]
fn malformed_declarations_are_configuration_errors() {
    let cases = [
        Fabrication::new(),
        Fabrication::new()
            .level(Level::new("region", 2))
            .level(Level::new("region", 2)),
        Fabrication::new().level(Level::new("region", 0)),
        Fabrication::new().level(Level::new("region", vec![1, 2])),
        Fabrication::new()
            .level(Level::new("region", 2))
            .level(Level::new("district", vec![1, 0])),
        Fabrication::new()
            .level(Level::new("region", 2))
            .level(Level::new("district", vec![1, 2, 3])),
        Fabrication::new().level(Level::new("region", 2).expr("N", "1").unwrap()),
        Fabrication::new()
            .level(Level::new("region", 2))
            .level(Level::new("district", 2).expr("region", "1").unwrap()),
        Fabrication::new().level(
            Level::new("region", 2)
                .expr("x", "1")
                .unwrap()
                .expr("x", "2")
                .unwrap(),
        ),
        Fabrication::new().level(Level::new("region", SizeSpec::parse("[2, 3]").unwrap())),
        Fabrication::new()
            .level(Level::new("region", 2))
            .level(Level::new("district", SizeSpec::parse("1.5").unwrap())),
        Fabrication::new()
            .level(Level::new("region", 2))
            .level(Level::new("district", SizeSpec::parse("region - 1").unwrap())),
    ];

    for (idx, fabrication) in cases.iter().enumerate() {
        match run(fabrication) {
            Err(FabricationError::Configuration { .. }) => {}
            other => panic!("case {idx}: expected configuration error, got {other:?}"),
        }
    }
}

#[test]
fn max_rows_limits_every_level() {
    let fabrication = Fabrication::new()
        .level(Level::new("region", 10))
        .level(Level::new("district", 10));

    let err = run_with(
        &fabrication,
        FabricateOptions {
            max_rows: 50,
            ..FabricateOptions::default()
        },
    )
    .unwrap_err();
    assert!(matches!(
        err,
        FabricationError::Configuration { ref level, .. } if level == "district"
    ));
}

#[test]
fn warnings_are_reported_and_fail_strict_runs() {
    let fabrication = Fabrication::new().level(
        Level::new("unit", 4)
            .expr("p", "if_else(unit > 2, 0.5, null)")
            .unwrap()
            .expr("y", "draw_binary(p)")
            .unwrap(),
    );

    let result = run(&fabrication).unwrap();
    assert_eq!(result.report.warnings_by_code.get("missing_parameter"), Some(&1));
    let warning = &result.report.warnings[0];
    assert_eq!(warning.level, "unit");
    assert_eq!(warning.variable.as_deref(), Some("y"));
    let y = result.table.column("y").unwrap();
    assert!(y[0].is_null() && y[1].is_null());
    assert!(!y[2].is_null() && !y[3].is_null());

    let err = run_with(
        &fabrication,
        FabricateOptions {
            strict: true,
            ..FabricateOptions::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, FabricationError::Configuration { .. }));
}

#[test]
fn non_finite_parameters_are_distribution_errors() {
    for source in [
        "draw_count(mean = 1e400)",
        "draw_count(mean = exp(1000))",
        "draw_binary(prob = 1e400, link = 'logit')",
        "draw_normal(mean = 0, sd = 1e400)",
        "draw_binomial(0.5, trials = 1e400)",
    ] {
        let fabrication =
            Fabrication::new().level(Level::new("unit", 2).expr("x", source).unwrap());
        match run(&fabrication) {
            Err(FabricationError::Distribution {
                source: DistributionError::OutOfRange { .. },
                ..
            }) => {}
            other => panic!("{source}: expected out-of-range error, got {other:?}"),
        }
    }
}

#[test]
fn huge_counts_finish_quickly() {
    let fabrication = Fabrication::new().level(
        Level::new("unit", 2)
            .expr("successes", "draw_binomial(0.5, trials = 1e13)")
            .unwrap()
            .expr("events", "draw_count(mean = 1e12)")
            .unwrap(),
    );

    let result = run(&fabrication).unwrap();
    for value in result.table.column("successes").unwrap() {
        let successes = value.as_i64().unwrap();
        assert!((0..=10_000_000_000_000).contains(&successes));
    }
    assert!(
        result
            .table
            .column("events")
            .unwrap()
            .iter()
            .all(|value| value.as_i64().is_some_and(|v| v > 0))
    );
}

#[test]
fn oversized_vectors_are_rejected() {
    let expression_errors = [
        "rep([1, 2, 3], 9223372036854775807)",
        "rep_each([1, 2], 4611686018427387904)",
        "seq(0, 1e300)",
    ];
    for source in expression_errors {
        let fabrication =
            Fabrication::new().level(Level::new("unit", 2).expr("x", source).unwrap());
        match run(&fabrication) {
            Err(FabricationError::Expression { .. }) => {}
            other => panic!("{source}: expected expression error, got {other:?}"),
        }
    }

    let fabrication = Fabrication::new().level(
        Level::new("unit", 2)
            .expr("x", "draw_normal(N = 1000000000000)")
            .unwrap(),
    );
    assert!(matches!(
        run(&fabrication),
        Err(FabricationError::Distribution {
            source: DistributionError::Invalid(_),
            ..
        })
    ));
}

#[test]
fn max_rows_bounds_expression_vectors() {
    let fabrication = Fabrication::new().level(
        Level::new("unit", 4)
            .expr("x", "rep([1, 2], 4)")
            .unwrap(),
    );
    let options = FabricateOptions {
        max_rows: 6,
        ..FabricateOptions::default()
    };

    let err = run_with(&fabrication, options).unwrap_err();
    assert!(matches!(
        err,
        FabricationError::Expression { ref variable, .. } if variable == "x"
    ));
}
