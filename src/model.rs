// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::{Error, Result};
use crate::group::Grouped;
use crate::param::{Key, Param};
use crate::schema::{normalize_to, ordered_keys};
use crate::table::Table;
use crate::value::{FieldName, Value, ValueKind};
use crate::walk::{discover_leaves, reconstruct, Walk};

use core::fmt;
use std::collections::BTreeSet;
use std::ops::Range;
use std::rc::Rc;

use log::{debug, warn};

pub const COMPONENT: &str = "component";
pub const FIELDNAME: &str = "fieldname";

/// A column of a [`Model`]. `Component` and `FieldName` are synthesized from
/// where a parameter was found and are read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Column {
    Component,
    FieldName,
    Meta(Key),
}

impl Column {
    pub fn parse(name: &str) -> Column {
        match name {
            COMPONENT => Column::Component,
            FIELDNAME => Column::FieldName,
            _ => Column::Meta(Key::parse(name)),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Column::Component => COMPONENT,
            Column::FieldName => FIELDNAME,
            Column::Meta(k) => k.as_str(),
        }
    }

    pub fn is_reserved(&self) -> bool {
        !matches!(self, Column::Meta(_))
    }
}

/// Row selection for writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rows {
    All,
    Indices(Vec<usize>),
}

impl From<usize> for Rows {
    fn from(i: usize) -> Self {
        Rows::Indices(vec![i])
    }
}

impl From<Vec<usize>> for Rows {
    fn from(v: Vec<usize>) -> Self {
        Rows::Indices(v)
    }
}

impl From<&[usize]> for Rows {
    fn from(v: &[usize]) -> Self {
        Rows::Indices(v.to_vec())
    }
}

impl From<Range<usize>> for Rows {
    fn from(r: Range<usize>) -> Self {
        Rows::Indices(r.collect())
    }
}

/// Result of a per-row transform passed to [`Model::update_with`].
#[derive(Debug, Clone)]
pub enum Update {
    /// Leave the row as it is.
    Keep,
    /// Replace `val` only.
    Val(Value),
    /// Replace (or add) each listed field.
    Fields(Vec<(Key, Value)>),
}

/// Non-fatal conditions noticed while building a model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Warning {
    NoParameters,
}

#[derive(Debug, Clone)]
struct Location {
    component: Rc<str>,
    field: FieldName,
}

/// Tabular handle over the parameters of one object graph.
///
/// Rows are the discovered parameters in traversal order. Columns are
/// `component`, `fieldname` and every metadata key, with all parameters padded
/// to the same keys. Writes rebuild the owned graph; values returned earlier
/// keep pointing at the previous graph.
#[derive(Debug, Clone)]
pub struct Model {
    root: Value,
    walk: Walk,
    locations: Vec<Location>,
    params: Vec<Rc<Param>>,
    keys: Vec<Key>,
    warnings: Vec<Warning>,
}

impl Model {
    pub fn new(root: Value) -> Result<Self> {
        Self::with_walk(root, Walk::default())
    }

    pub fn with_walk(root: Value, walk: Walk) -> Result<Self> {
        let leaves = discover_leaves(&root, &walk);
        let mut warnings = vec![];
        if leaves.is_empty() {
            warn!("model has no parameters");
            warnings.push(Warning::NoParameters);
        }

        let (locations, params): (Vec<_>, Vec<_>) = leaves
            .into_iter()
            .map(|l| {
                (
                    Location {
                        component: l.component,
                        field: l.field,
                    },
                    l.param,
                )
            })
            .unzip();
        let keys = ordered_keys(params.iter().map(|p| p.as_ref()));
        let normalized = normalize_to(&params, &keys);

        let root = if normalized.iter().zip(&params).all(|(a, b)| Rc::ptr_eq(a, b)) {
            root
        } else {
            reconstruct(&root, normalized.iter().cloned().map(Value::from).collect(), &walk)?
        };

        debug!(
            "model over {} parameters with columns {:?}",
            normalized.len(),
            keys.iter().map(|k| k.as_str()).collect::<Vec<_>>()
        );
        Ok(Self {
            root,
            walk,
            locations,
            params: normalized,
            keys,
            warnings,
        })
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    pub fn into_root(self) -> Value {
        self.root
    }

    pub fn walk(&self) -> &Walk {
        &self.walk
    }

    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn params(&self) -> &[Rc<Param>] {
        &self.params
    }

    /// Column names: `component`, `fieldname`, then the metadata keys.
    pub fn keys(&self) -> Vec<Rc<str>> {
        self.columns().iter().map(|c| c.as_str().into()).collect()
    }

    pub fn columns(&self) -> Vec<Column> {
        let mut columns = vec![Column::Component, Column::FieldName];
        columns.extend(self.keys.iter().cloned().map(Column::Meta));
        columns
    }

    pub fn has_column(&self, name: &str) -> bool {
        match Column::parse(name) {
            Column::Meta(k) => self.keys.contains(&k),
            _ => true,
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &FieldName, &Rc<Param>)> {
        self.locations
            .iter()
            .zip(self.params.iter())
            .map(|(l, p)| (l.component.as_ref(), &l.field, p))
    }

    fn check_row(&self, row: usize) -> Result<()> {
        if row >= self.params.len() {
            return Err(Error::Index {
                index: row,
                len: self.params.len(),
            });
        }
        Ok(())
    }

    pub fn row(&self, row: usize) -> Result<&Rc<Param>> {
        self.check_row(row)?;
        Ok(&self.params[row])
    }

    pub fn component(&self, row: usize) -> Result<&Rc<str>> {
        self.check_row(row)?;
        Ok(&self.locations[row].component)
    }

    pub fn fieldname(&self, row: usize) -> Result<&FieldName> {
        self.check_row(row)?;
        Ok(&self.locations[row].field)
    }

    fn cell_of(&self, row: usize, column: &Column) -> Value {
        match column {
            Column::Component => Value::String(self.locations[row].component.clone()),
            Column::FieldName => self.locations[row].field.to_value(),
            Column::Meta(k) => self.params[row]
                .get_key(k)
                .cloned()
                .unwrap_or(Value::Absent),
        }
    }

    fn resolve(&self, name: &str) -> Result<Column> {
        let column = Column::parse(name);
        match &column {
            Column::Meta(k) if !self.keys.contains(k) => Err(Error::UnknownColumn(name.into())),
            _ => Ok(column),
        }
    }

    pub fn get_column(&self, name: &str) -> Result<Vec<Value>> {
        let column = self.resolve(name)?;
        Ok((0..self.len()).map(|i| self.cell_of(i, &column)).collect())
    }

    pub fn get_cell(&self, row: usize, name: &str) -> Result<Value> {
        let column = self.resolve(name)?;
        self.check_row(row)?;
        Ok(self.cell_of(row, &column))
    }

    /// Union of the runtime kinds found in one column.
    pub fn column_kinds(&self, name: &str) -> Result<BTreeSet<ValueKind>> {
        Ok(self.get_column(name)?.iter().map(|v| v.kind()).collect())
    }

    fn selection_len(&self, rows: &Rows) -> Result<usize> {
        match rows {
            Rows::All => Ok(self.len()),
            Rows::Indices(v) => {
                for &i in v {
                    self.check_row(i)?;
                }
                Ok(v.len())
            }
        }
    }

    fn write_key(name: &str) -> Result<Key> {
        match Column::parse(name) {
            Column::Meta(k) => Ok(k),
            c => Err(Error::ReservedColumn(c.as_str().into())),
        }
    }

    // Swap in new parameters: pad to `keys`, rebuild the graph, then commit.
    // Nothing on `self` changes unless every step succeeds.
    fn commit(&mut self, params: Vec<Rc<Param>>, keys: Vec<Key>) -> Result<()> {
        // A row the selector drops would shift every later row.
        if let Some(row) = params.iter().position(|p| !self.walk.selector.selects(p)) {
            return Err(Error::schema(format!(
                "edit would stop row {row} from being selected"
            )));
        }
        let params = if keys.len() != self.keys.len() {
            normalize_to(&params, &keys)
        } else {
            params
        };
        let root = reconstruct(
            &self.root,
            params.iter().cloned().map(Value::from).collect(),
            &self.walk,
        )?;
        self.root = root;
        self.params = params;
        self.keys = keys;
        Ok(())
    }

    fn extend_keys(&self, extra: impl IntoIterator<Item = Key>) -> Vec<Key> {
        let mut keys = self.keys.clone();
        for k in extra {
            if !keys.contains(&k) {
                keys.push(k);
            }
        }
        keys
    }

    /// Write `values` into `column` for the selected rows, row-aligned.
    ///
    /// A column that does not exist yet is added to every row; rows outside
    /// the selection receive `Absent`.
    pub fn set_column(
        &mut self,
        rows: impl Into<Rows>,
        name: &str,
        values: Vec<Value>,
    ) -> Result<()> {
        let key = Self::write_key(name)?;
        let rows = rows.into();
        let expected = self.selection_len(&rows)?;
        if values.len() != expected {
            return Err(Error::Arity {
                expected,
                found: values.len(),
            });
        }

        let mut params = self.params.clone();
        match rows {
            Rows::All => {
                for (param, v) in params.iter_mut().zip(values) {
                    *param = Rc::new(param.replace(&key, v)?);
                }
            }
            Rows::Indices(indices) => {
                for (i, v) in indices.into_iter().zip(values) {
                    params[i] = Rc::new(params[i].replace(&key, v)?);
                }
            }
        }
        let keys = self.extend_keys([key]);
        debug!("set column '{name}'");
        self.commit(params, keys)
    }

    pub fn set_cell(&mut self, row: usize, name: &str, value: impl Into<Value>) -> Result<()> {
        self.set_column(row, name, vec![value.into()])
    }

    /// Add a column that does not exist yet.
    pub fn add_column(&mut self, name: &str, values: Vec<Value>) -> Result<()> {
        let key = Self::write_key(name)?;
        if self.keys.contains(&key) {
            return Err(Error::schema(format!("column '{name}' already exists")));
        }
        self.set_column(Rows::All, name, values)
    }

    /// Ingest every column of `table` except the synthesized ones, row-aligned
    /// with the selected rows. Either all columns are written or none.
    pub fn set_table<T>(&mut self, rows: impl Into<Rows>, table: &T) -> Result<()>
    where
        T: Table + ?Sized,
    {
        let rows = rows.into();
        let mut next = self.clone();
        for name in table.column_names() {
            if Column::parse(&name).is_reserved() {
                continue;
            }
            next.set_column(rows.clone(), &name, table.column(&name)?)?;
        }
        *self = next;
        Ok(())
    }

    fn select_rows<P>(&self, predicate: P) -> Vec<usize>
    where
        P: Fn(&str, &FieldName, &Param) -> bool,
    {
        self.rows()
            .enumerate()
            .filter(|(_, (c, f, p))| predicate(c, f, p))
            .map(|(i, _)| i)
            .collect()
    }

    /// Replace `val` on every row.
    pub fn update_values(&mut self, values: Vec<Value>) -> Result<()> {
        self.set_column(Rows::All, "val", values)
    }

    /// Replace `val` on the rows accepted by `predicate(component, fieldname, param)`.
    pub fn update_values_where<P>(&mut self, values: Vec<Value>, predicate: P) -> Result<()>
    where
        P: Fn(&str, &FieldName, &Param) -> bool,
    {
        let rows = self.select_rows(predicate);
        self.set_column(rows, "val", values)
    }

    /// Run `transform` on every row accepted by `predicate` and apply the
    /// returned [`Update`].
    pub fn update_with<P, F>(&mut self, predicate: P, mut transform: F) -> Result<()>
    where
        P: Fn(&str, &FieldName, &Param) -> bool,
        F: FnMut(&Param) -> Result<Update>,
    {
        let mut params = self.params.clone();
        let mut added = vec![];
        for i in self.select_rows(predicate) {
            let updated = match transform(&params[i])? {
                Update::Keep => continue,
                Update::Val(v) => params[i].set_val(v)?,
                Update::Fields(fields) => {
                    let mut p = params[i].as_ref().clone();
                    for (k, v) in fields {
                        p = p.replace(&k, v)?;
                        added.push(k);
                    }
                    p
                }
            };
            params[i] = Rc::new(updated);
        }
        let keys = self.extend_keys(added);
        self.commit(params, keys)
    }

    /// The owned graph with every parameter replaced by its value with units
    /// applied.
    pub fn strip_tags(&self) -> Result<Value> {
        let values = self
            .params
            .iter()
            .map(|p| p.with_units())
            .collect::<Result<Vec<_>>>()?;
        reconstruct(&self.root, values, &self.walk)
    }

    /// Bucket the parameters by the values of `columns`, outermost first.
    pub fn group(&self, columns: &[&str]) -> Result<Grouped<Rc<Param>>> {
        let resolved = columns
            .iter()
            .map(|c| self.resolve(c))
            .collect::<Result<Vec<_>>>()?;
        let items: Vec<(Vec<Value>, Rc<Param>)> = (0..self.len())
            .map(|i| {
                let path: Vec<Value> = resolved.iter().map(|c| self.cell_of(i, c)).collect();
                (path, self.params[i].clone())
            })
            .collect();
        Ok(Grouped::build(items, resolved.len()))
    }
}

impl Table for Model {
    fn column_names(&self) -> Vec<Rc<str>> {
        self.keys()
    }

    fn column(&self, name: &str) -> Result<Vec<Value>> {
        self.get_column(name)
    }

    fn row_count(&self) -> usize {
        self.len()
    }

    fn column_count(&self) -> usize {
        self.keys.len() + 2
    }

    fn cell(&self, row: usize, name: &str) -> Result<Value> {
        self.get_cell(row, name)
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let columns = self.columns();
        let names: Vec<&str> = columns.iter().map(|c| c.as_str()).collect();
        writeln!(f, "{}", names.join("\t"))?;
        for row in 0..self.len() {
            let cells: Vec<String> = columns
                .iter()
                .map(|c| match self.cell_of(row, c) {
                    Value::String(s) => s.to_string(),
                    v => v.to_string(),
                })
                .collect();
            writeln!(f, "{}", cells.join("\t"))?;
        }
        Ok(())
    }
}
