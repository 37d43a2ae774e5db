// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Discovery and reconstruction of tagged parameters.
//!
//! Both directions visit the graph in the same order: depth first, fields left
//! to right. The i-th parameter returned by [`discover`] is the one replaced by
//! the i-th replacement passed to [`reconstruct`].

use crate::error::{Error, Result};
use crate::param::{Param, ParamKind};
use crate::value::{FieldName, Record, Value, ValueKind};

use core::fmt;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

/// Which parameters a walk treats as tagged leaves.
#[derive(Clone, Default)]
pub enum Selector {
    #[default]
    Any,
    Kind(ParamKind),
    Custom(Rc<dyn Fn(&Param) -> bool>),
}

impl Selector {
    pub fn custom(f: impl Fn(&Param) -> bool + 'static) -> Self {
        Selector::Custom(Rc::new(f))
    }

    pub fn selects(&self, param: &Param) -> bool {
        match self {
            Selector::Any => true,
            Selector::Kind(k) => param.kind() == *k,
            Selector::Custom(f) => f(param),
        }
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Selector::Any => f.write_str("Any"),
            Selector::Kind(k) => write!(f, "Kind({k:?})"),
            Selector::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Traversal configuration: what is selected and which containers are opaque.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Walk {
    #[serde(skip)]
    pub selector: Selector,
    /// Value kinds that are never descended into.
    pub exclude: BTreeSet<ValueKind>,
    /// Named record types that are never descended into.
    pub exclude_records: BTreeSet<Rc<str>>,
}

impl Default for Walk {
    fn default() -> Self {
        Self {
            selector: Selector::Any,
            exclude: [ValueKind::Array, ValueKind::Object].into_iter().collect(),
            exclude_records: BTreeSet::new(),
        }
    }
}

impl Walk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, selector: Selector) -> Self {
        self.selector = selector;
        self
    }

    pub fn exclude(mut self, kind: ValueKind) -> Self {
        self.exclude.insert(kind);
        self
    }

    pub fn include(mut self, kind: ValueKind) -> Self {
        self.exclude.remove(&kind);
        self
    }

    pub fn exclude_record(mut self, name: impl Into<Rc<str>>) -> Self {
        self.exclude_records.insert(name.into());
        self
    }

    pub fn selected<'a>(&self, value: &'a Value) -> Option<&'a Rc<Param>> {
        match value {
            Value::Param(p) if self.selector.selects(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_excluded(&self, value: &Value) -> bool {
        if self.exclude.contains(&value.kind()) {
            return true;
        }
        match value {
            Value::Record(r) => r
                .name()
                .is_some_and(|n| self.exclude_records.contains(n)),
            _ => false,
        }
    }
}

/// Composite node that can list its children and be rebuilt from a
/// same-length list of replacement children.
pub trait Composite: Sized {
    fn children(&self) -> Vec<(FieldName, &Value)>;

    fn rebuild(&self, children: Vec<Value>) -> Result<Self>;
}

impl Composite for Record {
    fn children(&self) -> Vec<(FieldName, &Value)> {
        self.fields()
            .iter()
            .map(|(n, v)| (FieldName::Name(n.clone()), v))
            .collect()
    }

    fn rebuild(&self, children: Vec<Value>) -> Result<Self> {
        self.with_values(children)
    }
}

impl Composite for Vec<Value> {
    fn children(&self) -> Vec<(FieldName, &Value)> {
        self.iter()
            .enumerate()
            .map(|(i, v)| (FieldName::Index(i), v))
            .collect()
    }

    fn rebuild(&self, children: Vec<Value>) -> Result<Self> {
        if children.len() != self.len() {
            return Err(Error::Arity {
                expected: self.len(),
                found: children.len(),
            });
        }
        Ok(children)
    }
}

impl Composite for BTreeMap<Value, Value> {
    fn children(&self) -> Vec<(FieldName, &Value)> {
        self.iter()
            .map(|(k, v)| (FieldName::Key(k.clone()), v))
            .collect()
    }

    fn rebuild(&self, children: Vec<Value>) -> Result<Self> {
        if children.len() != self.len() {
            return Err(Error::Arity {
                expected: self.len(),
                found: children.len(),
            });
        }
        Ok(self.keys().cloned().zip(children).collect())
    }
}

/// Identity of a container as reported in the `component` column.
pub fn component_name(value: &Value) -> Rc<str> {
    match value {
        Value::Record(r) => match r.name() {
            Some(n) => n.into(),
            None => "record".into(),
        },
        _ => value.kind().as_str().into(),
    }
}

fn children_of(value: &Value) -> Option<Vec<(FieldName, &Value)>> {
    match value {
        Value::Record(r) => Some(r.children()),
        Value::Tuple(items) | Value::Array(items) => Some(items.children()),
        Value::Object(m) => Some(m.children()),
        _ => None,
    }
}

/// A discovered parameter together with where it was found.
#[derive(Debug, Clone)]
pub struct Leaf {
    pub component: Rc<str>,
    pub field: FieldName,
    pub param: Rc<Param>,
}

fn visit(value: &Value, component: &Rc<str>, field: FieldName, walk: &Walk, out: &mut Vec<Leaf>) {
    if let Some(param) = walk.selected(value) {
        out.push(Leaf {
            component: component.clone(),
            field,
            param: param.clone(),
        });
        return;
    }
    if walk.is_excluded(value) {
        return;
    }
    if let Some(children) = children_of(value) {
        let component = component_name(value);
        for (name, child) in children {
            visit(child, &component, name, walk, out);
        }
    }
}

/// Every selected parameter reachable from `root`, with its location.
pub fn discover_leaves(root: &Value, walk: &Walk) -> Vec<Leaf> {
    let mut out = vec![];
    visit(root, &"".into(), FieldName::Root, walk, &mut out);
    debug!("discovered {} parameters", out.len());
    out
}

/// Every selected parameter reachable from `root`, in traversal order.
pub fn discover(root: &Value, walk: &Walk) -> Vec<Rc<Param>> {
    discover_leaves(root, walk)
        .into_iter()
        .map(|l| l.param)
        .collect()
}

pub fn has_params(root: &Value, walk: &Walk) -> bool {
    // Short-circuits on the first hit.
    fn any(value: &Value, walk: &Walk) -> bool {
        if walk.selected(value).is_some() {
            return true;
        }
        if walk.is_excluded(value) {
            return false;
        }
        children_of(value).is_some_and(|cs| cs.into_iter().any(|(_, c)| any(c, walk)))
    }
    any(root, walk)
}

/// Number of selected parameters reachable from `root`, without collecting them.
pub fn count_params(root: &Value, walk: &Walk) -> usize {
    if walk.selected(root).is_some() {
        return 1;
    }
    if walk.is_excluded(root) {
        return 0;
    }
    match root {
        Value::Record(r) => r.fields().iter().map(|(_, v)| count_params(v, walk)).sum(),
        Value::Tuple(items) | Value::Array(items) => {
            items.iter().map(|v| count_params(v, walk)).sum()
        }
        Value::Object(m) => m.values().map(|v| count_params(v, walk)).sum(),
        _ => 0,
    }
}

struct Rebuilder<'a> {
    walk: &'a Walk,
    replacements: std::vec::IntoIter<Value>,
    consumed: usize,
}

impl Rebuilder<'_> {
    fn rebuild(&mut self, value: &Value) -> Result<Value> {
        if self.walk.selected(value).is_some() {
            self.consumed += 1;
            return self.replacements.next().ok_or(Error::Arity {
                expected: self.consumed,
                found: self.consumed - 1,
            });
        }
        if self.walk.is_excluded(value) {
            return Ok(value.clone());
        }

        let before = self.consumed;
        let rebuilt = match value {
            Value::Record(r) => {
                let children = self.rebuild_all(r.children())?;
                Value::from(r.rebuild(children)?)
            }
            Value::Tuple(items) => {
                let children = self.rebuild_all(items.children())?;
                Value::tuple(items.rebuild(children)?)
            }
            Value::Array(items) => {
                let children = self.rebuild_all(items.children())?;
                Value::array(items.rebuild(children)?)
            }
            Value::Object(m) => {
                let children = self.rebuild_all(m.children())?;
                Value::from(m.rebuild(children)?)
            }
            _ => return Ok(value.clone()),
        };

        // Untouched subtrees keep sharing the original allocation.
        if self.consumed == before {
            Ok(value.clone())
        } else {
            Ok(rebuilt)
        }
    }

    fn rebuild_all(&mut self, children: Vec<(FieldName, &Value)>) -> Result<Vec<Value>> {
        children
            .into_iter()
            .map(|(_, c)| self.rebuild(c))
            .collect()
    }
}

/// Rebuild `root` with the i-th selected parameter replaced by the i-th
/// element of `replacements`. Replacements may be parameters or plain values.
///
/// Fails with [`Error::Arity`] unless there is exactly one replacement per
/// discovered parameter. `root` itself is never modified.
pub fn reconstruct(root: &Value, replacements: Vec<Value>, walk: &Walk) -> Result<Value> {
    let expected = count_params(root, walk);
    if replacements.len() != expected {
        return Err(Error::Arity {
            expected,
            found: replacements.len(),
        });
    }
    if expected == 0 {
        return Ok(root.clone());
    }

    let mut rebuilder = Rebuilder {
        walk,
        replacements: replacements.into_iter(),
        consumed: 0,
    };
    let out = rebuilder.rebuild(root)?;
    trace!("reconstructed graph with {} replacements", rebuilder.consumed);
    Ok(out)
}
