// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::error::{Error, Result};
use crate::number::Number;
use crate::param::Param;

use core::fmt;
use std::collections::BTreeMap;
use std::ops;
use std::rc::Rc;

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};

/// A node of an immutable object graph.
///
/// Composite payloads are reference counted. Rebuilding a graph shares every
/// subtree that did not change, and values handed out earlier stay valid.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Value {
    // Explicit "no value". Used to pad metadata and for missing cells.
    Absent,
    Bool(bool),
    Number(Number),
    String(Rc<str>),

    // Fixed-size ordered sequence.
    Tuple(Rc<Vec<Value>>),

    // Growable sequence.
    Array(Rc<Vec<Value>>),

    // Dictionary keyed by arbitrary values.
    Object(Rc<BTreeMap<Value, Value>>),

    Record(Rc<Record>),
    Param(Rc<Param>),
}

/// Runtime kind of a [`Value`], used to configure which containers a walk
/// descends into.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Absent,
    Bool,
    Number,
    String,
    Tuple,
    Array,
    Object,
    Record,
    Param,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Absent => "absent",
            ValueKind::Bool => "bool",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Tuple => "tuple",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
            ValueKind::Record => "record",
            ValueKind::Param => "param",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered record with named fields.
///
/// A record without a name plays the role of an anonymous named-field group.
/// Its type parameters are not stored; they are derived from the field values
/// so that a rebuilt record always reports parameters matching its contents.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Record {
    name: Option<Rc<str>>,
    fields: Vec<(Rc<str>, Value)>,
}

impl Record {
    pub fn new(name: impl Into<Rc<str>>) -> Self {
        Self {
            name: Some(name.into()),
            fields: vec![],
        }
    }

    pub fn anonymous() -> Self {
        Self {
            name: None,
            fields: vec![],
        }
    }

    /// Append a field, replacing the value of an existing field of the same name.
    pub fn field(mut self, name: impl Into<Rc<str>>, value: impl Into<Value>) -> Self {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, v)) => *v = value,
            None => self.fields.push((name, value)),
        }
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn fields(&self) -> &[(Rc<str>, Value)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(n, _)| n.as_ref() == name)
            .map(|(_, v)| v)
    }

    /// Kinds of the current field values, in field order.
    pub fn type_params(&self) -> Vec<ValueKind> {
        self.fields.iter().map(|(_, v)| v.kind()).collect()
    }

    /// Nominal type with derived parameters, e.g. `S1{number, param}`.
    pub fn type_name(&self) -> String {
        let params: Vec<&str> = self.type_params().iter().map(|k| k.as_str()).collect();
        format!(
            "{}{{{}}}",
            self.name.as_deref().unwrap_or("record"),
            params.join(", ")
        )
    }

    pub(crate) fn with_values(&self, values: Vec<Value>) -> Result<Self> {
        if values.len() != self.fields.len() {
            return Err(Error::Arity {
                expected: self.fields.len(),
                found: values.len(),
            });
        }
        Ok(Self {
            name: self.name.clone(),
            fields: self
                .fields
                .iter()
                .zip(values)
                .map(|((n, _), v)| (n.clone(), v))
                .collect(),
        })
    }
}

/// Name or position of a value inside its enclosing container.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum FieldName {
    /// The value is the root itself.
    Root,
    Name(Rc<str>),
    Index(usize),
    Key(Value),
}

impl FieldName {
    pub fn to_value(&self) -> Value {
        match self {
            FieldName::Root => Value::Absent,
            FieldName::Name(n) => Value::String(n.clone()),
            FieldName::Index(i) => Value::from(*i),
            FieldName::Key(k) => k.clone(),
        }
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldName::Root => f.write_str("<root>"),
            FieldName::Name(n) => f.write_str(n),
            FieldName::Index(i) => write!(f, "{i}"),
            FieldName::Key(k) => write!(f, "{k}"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::Error;
        match self {
            Value::Absent => serializer.serialize_none(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::String(s) => serializer.serialize_str(s.as_ref()),
            Value::Number(n) => n.serialize(serializer),
            Value::Tuple(a) | Value::Array(a) => a.serialize(serializer),
            Value::Object(fields) => {
                let mut map = serializer.serialize_map(Some(fields.len()))?;
                for (k, v) in fields.iter() {
                    match k {
                        Value::String(_) => map.serialize_entry(k, v)?,
                        _ => {
                            let key_str = serde_json::to_string(k).map_err(Error::custom)?;
                            map.serialize_entry(&key_str, v)?
                        }
                    }
                }
                map.end()
            }
            Value::Record(r) => {
                let mut map = serializer.serialize_map(Some(r.fields.len()))?;
                for (k, v) in r.fields.iter() {
                    map.serialize_entry(k.as_ref(), v)?;
                }
                map.end()
            }
            Value::Param(p) => {
                let mut map = serializer.serialize_map(Some(p.meta().len()))?;
                for (k, v) in p.meta().iter() {
                    map.serialize_entry(k.as_str(), v)?;
                }
                map.end()
            }
        }
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a value")
    }

    fn visit_unit<E>(self) -> core::result::Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Absent)
    }

    fn visit_none<E>(self) -> core::result::Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Absent)
    }

    fn visit_bool<E>(self, v: bool) -> core::result::Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::Bool(v))
    }

    fn visit_u64<E>(self, v: u64) -> core::result::Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::from(Number::from(v)))
    }

    fn visit_i64<E>(self, v: i64) -> core::result::Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::from(v))
    }

    fn visit_f64<E>(self, v: f64) -> core::result::Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::from(v))
    }

    fn visit_str<E>(self, s: &str) -> core::result::Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::String(s.into()))
    }

    fn visit_string<E>(self, s: String) -> core::result::Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(Value::String(s.into()))
    }

    fn visit_seq<V>(self, mut visitor: V) -> core::result::Result<Self::Value, V::Error>
    where
        V: SeqAccess<'de>,
    {
        let mut items = vec![];
        while let Some(v) = visitor.next_element()? {
            items.push(v);
        }
        Ok(Value::tuple(items))
    }

    fn visit_map<V>(self, mut visitor: V) -> core::result::Result<Self::Value, V::Error>
    where
        V: MapAccess<'de>,
    {
        let mut map = BTreeMap::new();
        while let Some((key, value)) = visitor.next_entry()? {
            map.insert(key, value);
        }
        Ok(Value::from(map))
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> core::result::Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Param(p) => write!(f, "{p}"),
            _ => match serde_json::to_string(self) {
                Ok(s) => write!(f, "{s}"),
                Err(_e) => Err(std::fmt::Error),
            },
        }
    }
}

impl Value {
    pub fn new_object() -> Value {
        Value::from(BTreeMap::new())
    }

    pub fn tuple(items: Vec<Value>) -> Value {
        Value::Tuple(Rc::new(items))
    }

    pub fn array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(items))
    }

    /// Sequences in JSON become tuples and objects become dictionaries.
    pub fn from_json_str(json: &str) -> Result<Value> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_str(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Absent => ValueKind::Absent,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Tuple(_) => ValueKind::Tuple,
            Value::Array(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
            Value::Record(_) => ValueKind::Record,
            Value::Param(_) => ValueKind::Param,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub fn as_number(&self) -> Result<&Number> {
        match self {
            Value::Number(n) => Ok(n),
            _ => Err(Error::mismatch("number", self.kind().as_str())),
        }
    }

    pub fn as_f64(&self) -> Result<f64> {
        Ok(self.as_number()?.to_f64())
    }

    pub fn as_string(&self) -> Result<&Rc<str>> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(Error::mismatch("string", self.kind().as_str())),
        }
    }

    pub fn as_tuple(&self) -> Result<&Vec<Value>> {
        match self {
            Value::Tuple(t) => Ok(t),
            _ => Err(Error::mismatch("tuple", self.kind().as_str())),
        }
    }

    pub fn as_object(&self) -> Result<&BTreeMap<Value, Value>> {
        match self {
            Value::Object(m) => Ok(m),
            _ => Err(Error::mismatch("object", self.kind().as_str())),
        }
    }

    pub fn as_object_mut(&mut self) -> Result<&mut BTreeMap<Value, Value>> {
        match self {
            Value::Object(m) => Ok(Rc::make_mut(m)),
            _ => Err(Error::mismatch("object", self.kind().as_str())),
        }
    }

    pub fn as_record(&self) -> Result<&Record> {
        match self {
            Value::Record(r) => Ok(r),
            _ => Err(Error::mismatch("record", self.kind().as_str())),
        }
    }
}

impl Value {
    fn zip_with(
        &self,
        rhs: &Value,
        op: &dyn Fn(&Number, &Number) -> Result<Number>,
    ) -> Result<Value> {
        match (self, rhs) {
            (Value::Absent, _) => Ok(Value::Absent),
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(op(a, b)?)),
            (Value::Tuple(items), Value::Number(_)) => Ok(Value::tuple(
                items
                    .iter()
                    .map(|v| v.zip_with(rhs, op))
                    .collect::<Result<Vec<_>>>()?,
            )),
            (Value::Array(items), Value::Number(_)) => Ok(Value::array(
                items
                    .iter()
                    .map(|v| v.zip_with(rhs, op))
                    .collect::<Result<Vec<_>>>()?,
            )),
            (Value::Param(p), _) => p.coerce()?.zip_with(rhs, op),
            (_, Value::Number(_)) => Err(Error::mismatch(
                "number or sequence",
                self.kind().as_str(),
            )),
            _ => Err(Error::mismatch("number", rhs.kind().as_str())),
        }
    }

    /// Multiply by a scalar, element-wise through tuples and arrays.
    /// `Absent` passes through unchanged.
    pub fn scale(&self, factor: &Value) -> Result<Value> {
        self.zip_with(factor, &|a, b| Ok(a.mul(b)))
    }

    /// Divide by a scalar, element-wise through tuples and arrays.
    pub fn unscale(&self, divisor: &Value) -> Result<Value> {
        self.zip_with(divisor, &|a, b| a.divide(b))
    }

    /// Deep equality that compares parameters by their full metadata rather
    /// than by their coerced value.
    pub fn same_structure(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Param(a), Value::Param(b)) => a.kind() == b.kind() && a.meta() == b.meta(),
            (Value::Tuple(a), Value::Tuple(b)) | (Value::Array(a), Value::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.same_structure(y))
            }
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .zip(b.iter())
                        .all(|((ka, va), (kb, vb))| ka == kb && va.same_structure(vb))
            }
            (Value::Record(a), Value::Record(b)) => {
                a.name == b.name
                    && a.fields.len() == b.fields.len()
                    && a
                        .fields
                        .iter()
                        .zip(b.fields.iter())
                        .all(|((na, va), (nb, vb))| na == nb && va.same_structure(vb))
            }
            _ => self == other,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s.into())
    }
}

impl From<Rc<str>> for Value {
    fn from(s: Rc<str>) -> Self {
        Value::String(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::tuple(items)
    }
}

impl<A: Into<Value>, B: Into<Value>> From<(A, B)> for Value {
    fn from((a, b): (A, B)) -> Self {
        Value::tuple(vec![a.into(), b.into()])
    }
}

impl From<BTreeMap<Value, Value>> for Value {
    fn from(m: BTreeMap<Value, Value>) -> Self {
        Value::Object(Rc::new(m))
    }
}

impl From<Record> for Value {
    fn from(r: Record) -> Self {
        Value::Record(Rc::new(r))
    }
}

impl From<Param> for Value {
    fn from(p: Param) -> Self {
        Value::Param(Rc::new(p))
    }
}

impl From<Rc<Param>> for Value {
    fn from(p: Rc<Param>) -> Self {
        Value::Param(p)
    }
}

impl ops::Index<usize> for Value {
    type Output = Value;

    fn index(&self, index: usize) -> &Self::Output {
        match self {
            Value::Tuple(a) | Value::Array(a) if index < a.len() => &a[index],
            Value::Record(r) if index < r.fields.len() => &r.fields[index].1,
            _ => &Value::Absent,
        }
    }
}

impl ops::Index<&str> for Value {
    type Output = Value;

    fn index(&self, key: &str) -> &Self::Output {
        match self {
            Value::Record(r) => r.get(key).unwrap_or(&Value::Absent),
            Value::Object(o) => o.get(&Value::String(key.into())).unwrap_or(&Value::Absent),
            Value::Param(p) => p.get(key).unwrap_or(&Value::Absent),
            _ => &Value::Absent,
        }
    }
}
