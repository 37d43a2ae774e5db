// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::Result;
use paramtable::*;

use std::rc::Rc;

fn tagged(val: impl Into<Value>) -> Value {
    Value::from(Param::new(val))
}

fn graph() -> Value {
    let inner = Record::new("Inner")
        .field("p", tagged(1))
        .field("q", 10);
    let outer = Record::new("Outer")
        .field("inner", inner)
        .field("list", Value::tuple(vec![tagged(2), Value::from("x"), tagged(3)]))
        .field("skipped", Value::array(vec![tagged(99)]))
        .field("r", tagged(4));
    Value::from(outer)
}

#[test]
fn discovery_is_depth_first() -> Result<()> {
    let found = discover(&graph(), &Walk::default());
    let vals: Vec<Value> = found.iter().map(|p| p.val().clone()).collect();
    assert_eq!(
        vals,
        vec![Value::from(1), Value::from(2), Value::from(3), Value::from(4)]
    );

    let leaves = discover_leaves(&graph(), &Walk::default());
    let components: Vec<&str> = leaves.iter().map(|l| l.component.as_ref()).collect();
    assert_eq!(components, vec!["Inner", "tuple", "tuple", "Outer"]);
    assert_eq!(leaves[1].field, FieldName::Index(0));
    assert_eq!(leaves[3].field, FieldName::Name("r".into()));
    Ok(())
}

#[test]
fn discovery_is_stable() {
    let g = graph();
    let walk = Walk::default();
    let first = discover(&g, &walk);
    let second = discover(&g, &walk);
    assert_eq!(first.len(), second.len());
    assert!(first.iter().zip(&second).all(|(a, b)| Rc::ptr_eq(a, b)));
}

#[test]
fn counting_matches_discovery() {
    let g = graph();
    for walk in [Walk::default(), Walk::new().include(ValueKind::Array)] {
        assert_eq!(count_params(&g, &walk), discover(&g, &walk).len());
    }
    assert_eq!(count_params(&Value::from(7), &Walk::default()), 0);
}

#[test]
fn round_trip_preserves_structure() -> Result<()> {
    let g = graph();
    let walk = Walk::default();
    let found = discover(&g, &walk).into_iter().map(Value::from).collect();
    let rebuilt = reconstruct(&g, found, &walk)?;
    assert!(rebuilt.same_structure(&g));
    Ok(())
}

#[test]
fn replacement_substitutes_in_order() -> Result<()> {
    let g = graph();
    let walk = Walk::default();
    let replacements = (1..=4).map(|i| Value::from(i * 100)).collect();
    let rebuilt = reconstruct(&g, replacements, &walk)?;

    let outer = rebuilt.as_record()?;
    assert_eq!(outer.get("r"), Some(&Value::from(400)));
    assert_eq!(outer.get("inner").map(|i| &i["p"]), Some(&Value::from(100)));
    assert_eq!(
        outer.get("list"),
        Some(&Value::tuple(vec![
            Value::from(200),
            Value::from("x"),
            Value::from(300)
        ]))
    );
    // Excluded subtrees are carried over as they were.
    assert_eq!(outer.get("skipped"), g.as_record()?.get("skipped"));

    // The original graph is not touched.
    assert_eq!(discover(&g, &walk).len(), 4);
    Ok(())
}

#[test]
fn record_type_params_follow_substitution() -> Result<()> {
    let g = Value::from(Record::new("S").field("a", tagged(1.0)).field("b", "s"));
    assert_eq!(
        g.as_record()?.type_params(),
        vec![ValueKind::Param, ValueKind::String]
    );
    let rebuilt = reconstruct(&g, vec![Value::from(2.0)], &Walk::default())?;
    assert_eq!(
        rebuilt.as_record()?.type_params(),
        vec![ValueKind::Number, ValueKind::String]
    );
    Ok(())
}

#[test]
fn arity_is_checked_before_rebuilding() {
    let g = graph();
    let walk = Walk::default();
    let r = reconstruct(&g, vec![Value::from(1)], &walk);
    assert!(matches!(r, Err(Error::Arity { expected: 4, found: 1 })));

    let too_many = (0..5).map(Value::from).collect();
    let r = reconstruct(&g, too_many, &walk);
    assert!(matches!(r, Err(Error::Arity { expected: 4, found: 5 })));
}

#[test]
fn graph_without_params() -> Result<()> {
    let g = Value::from_json_str(r#"[1, "two", null]"#)?;
    let walk = Walk::default();
    assert!(!has_params(&g, &walk));
    assert!(discover(&g, &walk).is_empty());
    assert_eq!(reconstruct(&g, vec![], &walk)?, g);
    Ok(())
}

#[test]
fn root_param_is_its_own_leaf() -> Result<()> {
    let g = tagged(5);
    let leaves = discover_leaves(&g, &Walk::default());
    assert_eq!(leaves.len(), 1);
    assert_eq!(leaves[0].component.as_ref(), "");
    assert_eq!(leaves[0].field, FieldName::Root);
    assert_eq!(reconstruct(&g, vec![Value::from(6)], &Walk::default())?, Value::from(6));
    Ok(())
}

#[test]
fn selectors_narrow_discovery() -> Result<()> {
    let g = Value::tuple(vec![
        Value::from(Param::real(1.0)?),
        tagged("a"),
        Value::from(Param::real(2.0)?),
    ]);

    let reals = Walk::new().select(Selector::Kind(ParamKind::Real));
    assert_eq!(discover(&g, &reals).len(), 2);

    let strings = Walk::new().select(Selector::custom(|p| p.val().kind() == ValueKind::String));
    let found = discover(&g, &strings);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].val(), &Value::from("a"));

    // Unselected parameters stay in place.
    let rebuilt = reconstruct(&g, vec![Value::from("b")], &strings)?;
    assert_eq!(rebuilt[0], g[0]);
    assert_eq!(rebuilt[1], Value::from("b"));
    Ok(())
}

#[test]
fn exclusions_are_configurable() -> Result<()> {
    let g = Value::tuple(vec![
        Value::array(vec![tagged(1)]),
        Value::from(Record::new("Hidden").field("a", tagged(2))),
        tagged(3),
    ]);

    assert_eq!(discover(&g, &Walk::default()).len(), 2);
    assert_eq!(discover(&g, &Walk::new().include(ValueKind::Array)).len(), 3);
    assert_eq!(discover(&g, &Walk::new().exclude_record("Hidden")).len(), 1);
    assert_eq!(discover(&g, &Walk::new().exclude(ValueKind::Record)).len(), 1);
    assert_eq!(discover(&g, &Walk::new().exclude(ValueKind::Tuple)).len(), 0);
    Ok(())
}

#[test]
fn walk_from_yaml() -> Result<()> {
    let walk: Walk = serde_yaml::from_str("exclude: [object]\nexclude_records: [Hidden]")?;
    let g = Value::tuple(vec![
        Value::array(vec![tagged(1)]),
        Value::from(Record::new("Hidden").field("a", tagged(2))),
    ]);
    assert_eq!(discover(&g, &walk).len(), 1);
    Ok(())
}

#[test]
fn normalize_pads_and_shares() -> Result<()> {
    let params = vec![
        Rc::new(Param::new(1)),
        Rc::new(Param::builder(2).field("units", 1000).build()?),
    ];
    let once = normalize(&params);
    assert_eq!(once[0].get("units"), Some(&Value::Absent));
    assert!(Rc::ptr_eq(&once[1], &params[1]));

    let twice = normalize(&once);
    assert!(once.iter().zip(&twice).all(|(a, b)| Rc::ptr_eq(a, b)));
    Ok(())
}

#[test]
fn map_leaves_over_graph() -> Result<()> {
    let g = Value::tuple(vec![Value::from(1), Value::tuple(vec![Value::from(2)])]);
    let out = map_leaves(&g, &default_containers(), &mut |v| v.scale(&Value::from(10)))?;
    assert_eq!(
        out,
        Value::tuple(vec![Value::from(10), Value::tuple(vec![Value::from(20)])])
    );
    Ok(())
}
