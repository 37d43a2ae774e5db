// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::test_utils::*;
use crate::*;
use anyhow::{bail, Result};
use serde::Deserialize;
use test_generator::test_resources;

#[derive(Deserialize, Debug)]
struct SetColumn {
    #[serde(default)]
    rows: Option<Vec<usize>>,
    column: String,
    values: Vec<Value>,
}

#[derive(Deserialize, Debug)]
struct SetTable {
    #[serde(default)]
    rows: Option<Vec<usize>>,
    table: Frame,
}

#[derive(Deserialize, Debug)]
struct ColumnCheck {
    name: String,
    values: Vec<Value>,
}

#[derive(Deserialize, Debug)]
struct GroupCheck {
    columns: Vec<String>,
    sizes: Vec<usize>,
}

/// One write followed by any number of checks. A step with `error` expects
/// the write to fail and the model to stay as it was.
#[derive(Deserialize, Debug, Default)]
#[serde(default)]
struct Step {
    update_values: Option<Vec<Value>>,
    set_column: Option<SetColumn>,
    set_table: Option<SetTable>,
    error: Option<String>,

    keys: Option<Vec<String>>,
    column: Option<ColumnCheck>,
    group: Option<GroupCheck>,
    stripped: Option<Value>,
}

#[derive(Deserialize, Debug)]
struct TestCase {
    note: String,
    root: Value,
    #[serde(default)]
    walk: Option<Walk>,
    #[serde(default)]
    no_params: bool,
    steps: Vec<Step>,
}

#[derive(Deserialize, Debug)]
struct YamlTest {
    cases: Vec<TestCase>,
}

fn rows(r: &Option<Vec<usize>>) -> Rows {
    match r {
        Some(v) => Rows::Indices(v.clone()),
        None => Rows::All,
    }
}

fn write(model: &mut Model, step: &Step) -> crate::Result<()> {
    if let Some(values) = &step.update_values {
        model.update_values(values.clone())?;
    }
    if let Some(s) = &step.set_column {
        model.set_column(rows(&s.rows), &s.column, s.values.clone())?;
    }
    if let Some(s) = &step.set_table {
        model.set_table(rows(&s.rows), &s.table)?;
    }
    Ok(())
}

fn run_step(model: &mut Model, step: &Step) -> Result<()> {
    match &step.error {
        Some(error) => {
            let before = model.root().clone();
            let keys = model.keys();
            expect_error(write(model, step), error)?;
            if !before.same_structure(model.root()) || keys != model.keys() {
                bail!("failed write modified the model");
            }
        }
        None => write(model, step)?,
    }

    if let Some(expected) = &step.keys {
        let keys: Vec<String> = model.keys().iter().map(|k| k.to_string()).collect();
        assert_eq!(&keys, expected);
    }
    if let Some(c) = &step.column {
        match_sequences(&model.get_column(&c.name)?, &process_values(&c.values)?)?;
    }
    if let Some(g) = &step.group {
        let columns: Vec<&str> = g.columns.iter().map(|c| c.as_str()).collect();
        let grouped = model.group(&columns)?;
        let found: Vec<usize> = match &grouped {
            Grouped::Nested(m) => m.values().map(|b| b.len()).collect(),
            Grouped::Leaf(items) => vec![items.len()],
        };
        assert_eq!(&found, &g.sizes);
        assert_eq!(grouped.len(), model.len());
    }
    if let Some(expected) = &step.stripped {
        match_values(&model.strip_tags()?, &process_value(expected)?)?;
    }
    Ok(())
}

fn yaml_test_impl(file: &str) -> Result<()> {
    std::println!("\nrunning {file}");

    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;

    for case in &test.cases {
        std::print!("\ncase {} ", case.note);
        let root = process_value(&case.root)?;
        let walk = case.walk.clone().unwrap_or_default();
        let mut model = Model::with_walk(root.clone(), walk.clone())?;
        assert_eq!(
            model.warnings().contains(&Warning::NoParameters),
            case.no_params
        );

        // Discovery on the owned graph sees the same rows in the same order.
        let again = discover(model.root(), &walk);
        assert_eq!(again.len(), model.len());

        // Rebuilding from the discovered parameters gives the same graph back.
        let found = discover(&root, &walk);
        let rebuilt = reconstruct(&root, found.into_iter().map(Value::from).collect(), &walk)?;
        if !rebuilt.same_structure(&root) {
            bail!("round trip changed the graph");
        }

        for step in &case.steps {
            run_step(&mut model, step)?;
        }
        std::println!("passed");
    }

    std::println!("{} cases passed.", test.cases.len());
    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(_) => Ok(()),
        Err(e) => {
            // If Err is returned, it doesn't always get printed by cargo test.
            // Therefore, panic with the error.
            panic!("{}", e);
        }
    }
}

#[test_resources("tests/model/cases/**/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}
