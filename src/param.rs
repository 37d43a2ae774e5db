// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Tagged parameter values.
//!
//! A [`Param`] wraps a value together with an ordered metadata record. The
//! primary field `val` is always the first entry of that record. Parameters
//! are never edited in place: every edit produces a new `Param`.

use crate::error::{Error, Result};
use crate::number::Number;
use crate::value::Value;

use core::cmp::Ordering;
use core::fmt;
use std::rc::Rc;

/// Metadata key. The well-known keys get their own variants; everything else
/// is carried as `Custom`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    Val,
    Units,
    Bounds,
    Range,
    Label,
    Description,
    Group,
    Custom(Rc<str>),
}

impl Key {
    pub fn parse(s: &str) -> Key {
        match s {
            "val" => Key::Val,
            "units" => Key::Units,
            "bounds" => Key::Bounds,
            "range" => Key::Range,
            "label" => Key::Label,
            "description" => Key::Description,
            "group" => Key::Group,
            _ => Key::Custom(s.into()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Key::Val => "val",
            Key::Units => "units",
            Key::Bounds => "bounds",
            Key::Range => "range",
            Key::Label => "label",
            Key::Description => "description",
            Key::Group => "group",
            Key::Custom(s) => s,
        }
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::parse(s)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered metadata record. Invariant: non-empty, `val` first, keys unique.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Meta {
    fields: Vec<(Key, Value)>,
}

impl Meta {
    pub fn from_fields(fields: Vec<(Key, Value)>) -> Result<Self> {
        match fields.first() {
            Some((Key::Val, _)) => (),
            Some((k, _)) => {
                return Err(Error::schema(format!(
                    "primary field 'val' must come first, found '{k}'"
                )))
            }
            None => return Err(Error::schema("missing primary field 'val'")),
        }
        for (idx, (k, _)) in fields.iter().enumerate() {
            if fields[..idx].iter().any(|(p, _)| p == k) {
                return Err(Error::schema(format!("duplicate metadata field '{k}'")));
            }
        }
        Ok(Self { fields })
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, (Key, Value)> {
        self.fields.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.fields.iter().map(|(k, _)| k)
    }

    pub fn get(&self, key: &Key) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn val(&self) -> &Value {
        &self.fields[0].1
    }

    /// Same schema as `keys`, in that order.
    pub fn matches_keys(&self, keys: &[Key]) -> bool {
        self.fields.len() == keys.len() && self.fields.iter().zip(keys).all(|((k, _), o)| k == o)
    }

    // `keys` must start with `Key::Val`.
    fn padded(&self, keys: &[Key]) -> Self {
        Self {
            fields: keys
                .iter()
                .map(|k| (k.clone(), self.get(k).cloned().unwrap_or(Value::Absent)))
                .collect(),
        }
    }

    fn replaced(&self, key: &Key, value: Value) -> Self {
        let mut fields = self.fields.clone();
        match fields.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value,
            None => fields.push((key.clone(), value)),
        }
        Self { fields }
    }
}

/// Parameter variants sharing one interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum ParamKind {
    /// `val` may hold any value.
    #[default]
    Generic,
    /// `val` must be a number.
    Real,
}

impl ParamKind {
    fn check(&self, val: &Value) -> Result<()> {
        match (self, val) {
            (ParamKind::Real, Value::Number(_)) | (ParamKind::Generic, _) => Ok(()),
            (ParamKind::Real, _) => Err(Error::mismatch("number", val.kind().as_str())),
        }
    }
}

/// A value tagged as a tunable parameter, plus arbitrary metadata.
#[derive(Debug, Clone)]
pub struct Param {
    kind: ParamKind,
    meta: Meta,
}

/// Keyword-style construction of a [`Param`]: `val` first, then the remaining
/// fields in call order.
#[derive(Debug, Clone)]
pub struct ParamBuilder {
    kind: ParamKind,
    fields: Vec<(Key, Value)>,
}

impl ParamBuilder {
    pub fn field(mut self, key: impl Into<Key>, value: impl Into<Value>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    pub fn kind(mut self, kind: ParamKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn real(self) -> Self {
        self.kind(ParamKind::Real)
    }

    pub fn build(self) -> Result<Param> {
        Param::from_fields(self.kind, self.fields)
    }
}

impl Param {
    pub fn new(val: impl Into<Value>) -> Self {
        Self {
            kind: ParamKind::Generic,
            meta: Meta {
                fields: vec![(Key::Val, val.into())],
            },
        }
    }

    pub fn real(val: impl Into<Value>) -> Result<Self> {
        Self::builder(val).real().build()
    }

    pub fn builder(val: impl Into<Value>) -> ParamBuilder {
        ParamBuilder {
            kind: ParamKind::Generic,
            fields: vec![(Key::Val, val.into())],
        }
    }

    /// Build from positional metadata. `val` must be present and first.
    pub fn from_fields(kind: ParamKind, fields: Vec<(Key, Value)>) -> Result<Self> {
        Self::from_meta(kind, Meta::from_fields(fields)?)
    }

    pub fn from_meta(kind: ParamKind, meta: Meta) -> Result<Self> {
        kind.check(meta.val())?;
        Ok(Self { kind, meta })
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    pub fn keys(&self) -> impl Iterator<Item = &Key> {
        self.meta.keys()
    }

    pub fn val(&self) -> &Value {
        self.meta.val()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.meta.get(&Key::parse(key))
    }

    pub fn get_key(&self, key: &Key) -> Option<&Value> {
        self.meta.get(key)
    }

    /// Metadata field, or `default` when the field is missing.
    pub fn get_or(&self, key: &str, default: impl Into<Value>) -> Value {
        match self.get(key) {
            Some(v) => v.clone(),
            None => default.into(),
        }
    }

    fn units(&self) -> Option<&Value> {
        self.meta.get(&Key::Units).filter(|u| !u.is_absent())
    }

    /// `val` with units applied.
    pub fn with_units(&self) -> Result<Value> {
        self.with_units_of("val")
    }

    /// A metadata field multiplied by `units` when units are present.
    /// Sequences such as bounds are scaled element-wise.
    pub fn with_units_of(&self, key: &str) -> Result<Value> {
        let value = self.get_or(key, Value::Absent);
        match self.units() {
            Some(units) => value.scale(units),
            None => Ok(value),
        }
    }

    /// Inverse of [`Param::with_units`]: divide `x` by `units` when present.
    pub fn strip_units(&self, x: &Value) -> Result<Value> {
        match self.units() {
            Some(units) => x.unscale(units),
            None => Ok(x.clone()),
        }
    }

    /// The value this parameter stands for in numeric code.
    pub fn coerce(&self) -> Result<Value> {
        self.with_units()
    }

    fn coerced_or_val(&self) -> Value {
        self.coerce().unwrap_or_else(|_| self.val().clone())
    }

    /// New parameter with one metadata field replaced or appended.
    pub fn replace(&self, key: &Key, value: Value) -> Result<Self> {
        if *key == Key::Val {
            self.kind.check(&value)?;
        }
        Ok(Self {
            kind: self.kind,
            meta: self.meta.replaced(key, value),
        })
    }

    pub fn set_val(&self, value: impl Into<Value>) -> Result<Self> {
        self.replace(&Key::Val, value.into())
    }

    /// Rebuild the metadata over exactly `keys`, filling gaps with `Absent`.
    pub(crate) fn padded(&self, keys: &[Key]) -> Self {
        Self {
            kind: self.kind,
            meta: self.meta.padded(keys),
        }
    }
}

impl PartialEq for Param {
    fn eq(&self, other: &Self) -> bool {
        self.coerced_or_val() == other.coerced_or_val()
    }
}

impl Eq for Param {}

impl Ord for Param {
    fn cmp(&self, other: &Self) -> Ordering {
        self.coerced_or_val().cmp(&other.coerced_or_val())
    }
}

impl PartialOrd for Param {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.coerced_or_val())
    }
}

impl TryFrom<&Param> for Number {
    type Error = Error;

    fn try_from(p: &Param) -> Result<Number> {
        Ok(*p.coerce()?.as_number()?)
    }
}

impl TryFrom<&Param> for f64 {
    type Error = Error;

    fn try_from(p: &Param) -> Result<f64> {
        Ok(Number::try_from(p)?.to_f64())
    }
}
