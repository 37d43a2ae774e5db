// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Nested views over flat parameter sequences.

use crate::error::Result;
use crate::value::{Value, ValueKind};
use crate::walk::Composite;

use std::collections::{BTreeMap, BTreeSet};

/// Items bucketed by the successive values of one or more columns.
///
/// Leaf buckets keep the relative order of the items they were built from.
#[derive(Debug, Clone, PartialEq)]
pub enum Grouped<T> {
    Leaf(Vec<T>),
    Nested(BTreeMap<Value, Grouped<T>>),
}

impl<T: Clone> Grouped<T> {
    /// Bucket `items` by their key paths. Every path must have `depth` entries.
    pub(crate) fn build(items: Vec<(Vec<Value>, T)>, depth: usize) -> Self {
        Self::build_level(items, 0, depth)
    }

    fn build_level(items: Vec<(Vec<Value>, T)>, level: usize, depth: usize) -> Self {
        if level == depth {
            return Grouped::Leaf(items.into_iter().map(|(_, t)| t).collect());
        }

        let mut buckets: BTreeMap<Value, Vec<(Vec<Value>, T)>> = BTreeMap::new();
        for (path, item) in items {
            let key = path.get(level).cloned().unwrap_or(Value::Absent);
            buckets.entry(key).or_default().push((path, item));
        }
        Grouped::Nested(
            buckets
                .into_iter()
                .map(|(k, items)| (k, Self::build_level(items, level + 1, depth)))
                .collect(),
        )
    }
}

impl<T> Grouped<T> {
    pub fn get(&self, key: &Value) -> Option<&Grouped<T>> {
        match self {
            Grouped::Nested(m) => m.get(key),
            Grouped::Leaf(_) => None,
        }
    }

    pub fn keys(&self) -> Vec<&Value> {
        match self {
            Grouped::Nested(m) => m.keys().collect(),
            Grouped::Leaf(_) => vec![],
        }
    }

    pub fn as_leaf(&self) -> Option<&[T]> {
        match self {
            Grouped::Leaf(items) => Some(items),
            Grouped::Nested(_) => None,
        }
    }

    /// All items, bucket by bucket.
    pub fn leaves(&self) -> Vec<&T> {
        let mut out = vec![];
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a T>) {
        match self {
            Grouped::Leaf(items) => out.extend(items.iter()),
            Grouped::Nested(m) => m.values().for_each(|g| g.collect_leaves(out)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Grouped::Leaf(items) => items.len(),
            Grouped::Nested(m) => m.values().map(|g| g.len()).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Same nesting, with `f` applied to every item.
    pub fn map<U>(&self, f: &mut impl FnMut(&T) -> U) -> Grouped<U> {
        match self {
            Grouped::Leaf(items) => Grouped::Leaf(items.iter().map(&mut *f).collect()),
            Grouped::Nested(m) => {
                Grouped::Nested(m.iter().map(|(k, g)| (k.clone(), g.map(f))).collect())
            }
        }
    }

    pub fn try_map<U>(&self, f: &mut impl FnMut(&T) -> Result<U>) -> Result<Grouped<U>> {
        match self {
            Grouped::Leaf(items) => Ok(Grouped::Leaf(
                items.iter().map(&mut *f).collect::<Result<Vec<_>>>()?,
            )),
            Grouped::Nested(m) => Ok(Grouped::Nested(
                m.iter()
                    .map(|(k, g)| Ok((k.clone(), g.try_map(f)?)))
                    .collect::<Result<BTreeMap<_, _>>>()?,
            )),
        }
    }
}

impl<T: Clone + Into<Value>> Grouped<T> {
    /// Objects for nested levels, tuples for leaf buckets.
    pub fn to_value(&self) -> Value {
        match self {
            Grouped::Leaf(items) => Value::tuple(items.iter().cloned().map(Into::into).collect()),
            Grouped::Nested(m) => Value::from(
                m.iter()
                    .map(|(k, g)| (k.clone(), g.to_value()))
                    .collect::<BTreeMap<_, _>>(),
            ),
        }
    }
}

/// Apply `f` to every element of `value` whose kind is not in `containers`,
/// recursing through the containers and rebuilding the same shape.
pub fn map_leaves<F>(value: &Value, containers: &BTreeSet<ValueKind>, f: &mut F) -> Result<Value>
where
    F: FnMut(&Value) -> Result<Value>,
{
    if !containers.contains(&value.kind()) {
        return f(value);
    }

    match value {
        Value::Record(r) => {
            let children = map_children(r.children(), containers, f)?;
            Ok(Value::from(r.rebuild(children)?))
        }
        Value::Tuple(items) => {
            let children = map_children(items.children(), containers, f)?;
            Ok(Value::tuple(items.rebuild(children)?))
        }
        Value::Array(items) => {
            let children = map_children(items.children(), containers, f)?;
            Ok(Value::array(items.rebuild(children)?))
        }
        Value::Object(m) => {
            let children = map_children(m.children(), containers, f)?;
            Ok(Value::from(m.rebuild(children)?))
        }
        _ => f(value),
    }
}

fn map_children<F>(
    children: Vec<(crate::value::FieldName, &Value)>,
    containers: &BTreeSet<ValueKind>,
    f: &mut F,
) -> Result<Vec<Value>>
where
    F: FnMut(&Value) -> Result<Value>,
{
    children
        .into_iter()
        .map(|(_, c)| map_leaves(c, containers, f))
        .collect()
}

/// The container kinds `map_leaves` recurses through by default.
pub fn default_containers() -> BTreeSet<ValueKind> {
    [
        ValueKind::Record,
        ValueKind::Tuple,
        ValueKind::Array,
        ValueKind::Object,
    ]
    .into_iter()
    .collect()
}
