use strata_core::Value;
use strata_fabricate::{
    FabricateOptions, Fabrication, FabricationEngine, FabricationError, Level, SizeSpec, Variable,
};

fn run(fabrication: &Fabrication) -> Result<strata_fabricate::FabricationResult, FabricationError> {
    FabricationEngine::new(FabricateOptions {
        seed: 5,
        ..FabricateOptions::default()
    })
    .run(fabrication)
}

fn ints(values: &[i64]) -> Vec<Value> {
    values.iter().map(|value| Value::Int(*value)).collect()
}

#[test]
fn per_parent_sizes_expand_in_parent_order() {
    let fabrication = Fabrication::new()
        .level(Level::new("region", 3))
        .level(Level::new("district", vec![1, 2, 3]));

    let result = run(&fabrication).unwrap();
    assert_eq!(result.table.rows(), 6);
    assert_eq!(
        result.table.column("region").unwrap(),
        ints(&[1, 2, 2, 3, 3, 3]).as_slice()
    );
    assert_eq!(
        result.table.column("district").unwrap(),
        ints(&[1, 2, 3, 4, 5, 6]).as_slice()
    );
    assert_eq!(result.plan.child_counts(1), [1, 2, 3]);
    assert_eq!(result.plan.lineage(4), vec![3, 5]);
}

#[test]
fn row_count_is_the_recursive_sum_of_child_counts() {
    let fabrication = Fabrication::new()
        .level(Level::new("a", 2))
        .level(Level::new("b", vec![2, 3]))
        .level(
            Level::new("c", SizeSpec::parse("if_else(b % 2 == 0, 2, 1)").unwrap()),
        );

    let result = run(&fabrication).unwrap();
    // b ids 1..=5, even ids spawn two rows.
    assert_eq!(result.plan.child_counts(2), [1, 2, 1, 2, 1]);
    assert_eq!(result.table.rows(), 7);
    assert_eq!(result.report.rows, 7);
    let levels: Vec<usize> = result.report.levels.iter().map(|level| level.rows).collect();
    assert_eq!(levels, [2, 5, 7]);
}

#[test]
fn ancestor_values_are_constant_within_each_ancestor() {
    let fabrication = Fabrication::new()
        .level(
            Level::new("region", 2)
                .expr("income", "draw_normal(mean = 50, sd = 10)")
                .unwrap(),
        )
        .level(
            Level::new("district", 3)
                .expr("tax", "income * 0.1 + draw_normal(sd = 0.5)")
                .unwrap(),
        )
        .level(Level::new("household", 2));

    let result = run(&fabrication).unwrap();
    let table = &result.table;
    assert_eq!(table.rows(), 12);
    let region = table.column("region").unwrap();
    let district = table.column("district").unwrap();
    let income = table.column("income").unwrap();
    let tax = table.column("tax").unwrap();
    for a in 0..table.rows() {
        for b in 0..table.rows() {
            if region[a] == region[b] {
                assert_eq!(income[a], income[b]);
            }
            if district[a] == district[b] {
                assert_eq!(tax[a], tax[b]);
            }
        }
    }
}

#[test]
fn deeper_declarations_shadow_ancestor_variables() {
    let fabrication = Fabrication::new()
        .level(
            Level::new("region", 2)
                .expr("x", "1")
                .unwrap()
                .expr("from_region", "x + 10")
                .unwrap(),
        )
        .level(
            Level::new("district", 2)
                .expr("inherited", "x")
                .unwrap()
                .expr("x", "2")
                .unwrap()
                .expr("shadowed", "x")
                .unwrap(),
        );

    let result = run(&fabrication).unwrap();
    let table = &result.table;
    assert_eq!(
        table.column_names(),
        ["region", "x", "from_region", "district", "inherited", "shadowed"]
    );
    assert_eq!(table.column("x").unwrap(), ints(&[2, 2, 2, 2]).as_slice());
    assert_eq!(table.column("inherited").unwrap(), ints(&[1, 1, 1, 1]).as_slice());
    assert_eq!(table.column("shadowed").unwrap(), ints(&[2, 2, 2, 2]).as_slice());
    assert_eq!(
        table.column("from_region").unwrap(),
        ints(&[11, 11, 11, 11]).as_slice()
    );
}

#[test]
fn short_results_are_tiled_across_the_level() {
    let fabrication = Fabrication::new().level(
        Level::new("unit", 6)
            .expr("pair", "[1, 2]")
            .unwrap()
            .expr("triple", "['a', 'b', 'c']")
            .unwrap(),
    );

    let result = run(&fabrication).unwrap();
    assert_eq!(
        result.table.column("pair").unwrap(),
        ints(&[1, 2, 1, 2, 1, 2]).as_slice()
    );
    let triple: Vec<String> = result
        .table
        .column("triple")
        .unwrap()
        .iter()
        .map(Value::to_string)
        .collect();
    assert_eq!(triple, ["a", "b", "c", "a", "b", "c"]);
}

#[test]
fn variables_see_earlier_siblings_and_row_count() {
    let fabrication = Fabrication::new().level(
        Level::new("unit", 3)
            .expr("base", "unit * 10")
            .unwrap()
            .expr("share", "base / N")
            .unwrap(),
    );

    let result = run(&fabrication).unwrap();
    assert_eq!(
        result.table.column("share").unwrap(),
        [Value::Float(10.0 / 3.0), Value::Float(20.0 / 3.0), Value::Float(10.0)]
    );
}

#[test]
fn closures_resolve_through_the_same_scope() {
    let ratio = Variable::from_fn("ratio", |ctx| {
        let total = ctx.get("total")?;
        Ok(total
            .iter()
            .map(|value| Value::from(value.as_f64().map(|v| v / 2.0)))
            .collect())
    });
    let fabrication = Fabrication::new()
        .level(Level::new("region", 2).variable(Variable::constant(
            "total",
            vec![Value::Int(10), Value::Int(30)],
        )))
        .level(Level::new("district", 2).variable(ratio));

    let result = run(&fabrication).unwrap();
    assert_eq!(
        result.table.column("ratio").unwrap(),
        [
            Value::Float(5.0),
            Value::Float(5.0),
            Value::Float(15.0),
            Value::Float(15.0),
        ]
    );
}

/// Size expressions are evaluated against the parent level only. A level's
/// own variables do not exist yet when its size is computed.
#[test]
fn size_expressions_see_parent_level_only() {
    let parent_driven = Fabrication::new()
        .level(
            Level::new("school", 2)
                .expr("big", "[true, false]")
                .unwrap(),
        )
        .level(Level::new("class", SizeSpec::parse("if_else(big, N + 1, 1)").unwrap()));
    let result = run(&parent_driven).unwrap();
    // N in a size expression is the parent's row count.
    assert_eq!(result.plan.child_counts(1), [3, 1]);

    let same_level = Fabrication::new()
        .level(Level::new("school", 2))
        .level(
            Level::new("class", SizeSpec::parse("if_else(small, 1, 2)").unwrap())
                .expr("small", "true")
                .unwrap(),
        );
    let err = run(&same_level).unwrap_err();
    assert!(matches!(
        err,
        FabricationError::UndefinedVariable { ref level, ref variable, ref name }
            if level == "class" && variable == "N" && name == "small"
    ));
}

#[test]
fn root_size_may_be_a_constant_expression() {
    let fabrication = Fabrication::new().level(Level::new("unit", SizeSpec::parse("2 * 3").unwrap()));
    assert_eq!(run(&fabrication).unwrap().table.rows(), 6);
}
