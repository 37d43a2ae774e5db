// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod error;
mod group;
mod model;
mod number;
mod param;
mod schema;
mod table;
mod value;
mod walk;

pub use error::{Error, Result};
pub use group::{default_containers, map_leaves, Grouped};
pub use model::{Column, Model, Rows, Update, Warning, COMPONENT, FIELDNAME};
pub use number::Number;
pub use param::{Key, Meta, Param, ParamBuilder, ParamKind};
pub use schema::{normalize, ordered_keys};
pub use table::{Frame, Table};
pub use value::{FieldName, Record, Value, ValueKind};
pub use walk::{
    component_name, count_params, discover, discover_leaves, has_params, reconstruct, Composite,
    Leaf, Selector, Walk,
};
