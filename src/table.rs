// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Column-oriented tables exchanged with a [`Model`](crate::Model).

use crate::error::{Error, Result};
use crate::value::Value;

use std::path::Path;
use std::rc::Rc;

use anyhow::bail;
use serde::{Deserialize, Serialize};

/// Anything that exposes named, equally long columns.
pub trait Table {
    fn column_names(&self) -> Vec<Rc<str>>;

    fn column(&self, name: &str) -> Result<Vec<Value>>;

    fn row_count(&self) -> usize;

    fn column_count(&self) -> usize {
        self.column_names().len()
    }

    fn cell(&self, row: usize, name: &str) -> Result<Value> {
        let column = self.column(name)?;
        let len = column.len();
        column
            .into_iter()
            .nth(row)
            .ok_or(Error::Index { index: row, len })
    }
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(default)]
    columns: Vec<Rc<str>>,
    #[serde(default)]
    data: Vec<Vec<Value>>,
}

/// In-memory column store. Serializes as `{"columns": [...], "data": [[...]]}`
/// with one inner list per column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFrame")]
pub struct Frame {
    columns: Vec<Rc<str>>,
    data: Vec<Vec<Value>>,
}

impl TryFrom<RawFrame> for Frame {
    type Error = Error;

    fn try_from(raw: RawFrame) -> Result<Self> {
        if raw.columns.len() != raw.data.len() {
            return Err(Error::Arity {
                expected: raw.columns.len(),
                found: raw.data.len(),
            });
        }
        let mut frame = Frame::new();
        for (name, values) in raw.columns.into_iter().zip(raw.data) {
            frame.push_column(name, values)?;
        }
        Ok(frame)
    }
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot every column of `table`.
    pub fn from_table<T: Table + ?Sized>(table: &T) -> Result<Self> {
        let mut frame = Frame::new();
        for name in table.column_names() {
            let values = table.column(&name)?;
            frame.push_column(name, values)?;
        }
        Ok(frame)
    }

    /// Add a column, or replace the column of the same name.
    pub fn push_column(&mut self, name: impl Into<Rc<str>>, values: Vec<Value>) -> Result<()> {
        let name = name.into();
        let replacing = self.columns.iter().position(|c| *c == name);
        let others = self.data.len() - usize::from(replacing.is_some());
        if others > 0 && values.len() != self.row_count() {
            return Err(Error::Arity {
                expected: self.row_count(),
                found: values.len(),
            });
        }
        match replacing {
            Some(idx) => self.data[idx] = values,
            None => {
                self.columns.push(name);
                self.data.push(values);
            }
        }
        Ok(())
    }

    pub fn with_column(mut self, name: impl Into<Rc<str>>, values: Vec<Value>) -> Result<Self> {
        self.push_column(name, values)?;
        Ok(self)
    }

    pub fn drop_column(&mut self, name: &str) -> Option<Vec<Value>> {
        let idx = self.columns.iter().position(|c| c.as_ref() == name)?;
        self.columns.remove(idx);
        Some(self.data.remove(idx))
    }

    /// Apply `f` to every cell of one column.
    pub fn map_column<F>(&mut self, name: &str, mut f: F) -> Result<()>
    where
        F: FnMut(&Value) -> Result<Value>,
    {
        let idx = self
            .columns
            .iter()
            .position(|c| c.as_ref() == name)
            .ok_or_else(|| Error::UnknownColumn(name.into()))?;
        self.data[idx] = self.data[idx]
            .iter()
            .map(&mut f)
            .collect::<Result<Vec<_>>>()?;
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_str(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(c) => Ok(Self::from_json_str(c.as_str())?),
            Err(e) => bail!("Failed to read {}. {e}", path.display()),
        }
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    #[cfg(feature = "yaml")]
    pub fn to_yaml_str(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    #[cfg(feature = "yaml")]
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(c) => Ok(Self::from_yaml_str(c.as_str())?),
            Err(e) => bail!("Failed to read {}. {e}", path.display()),
        }
    }
}

impl Table for Frame {
    fn column_names(&self) -> Vec<Rc<str>> {
        self.columns.clone()
    }

    fn column(&self, name: &str) -> Result<Vec<Value>> {
        self.columns
            .iter()
            .position(|c| c.as_ref() == name)
            .map(|idx| self.data[idx].clone())
            .ok_or_else(|| Error::UnknownColumn(name.into()))
    }

    fn row_count(&self) -> usize {
        self.data.first().map_or(0, |c| c.len())
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }
}
