// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Gives every parameter of a sequence the same metadata schema.

use crate::param::{Key, Param};

use std::rc::Rc;

/// Union of metadata keys in first-seen order across `params`.
pub fn ordered_keys<'a, I>(params: I) -> Vec<Key>
where
    I: IntoIterator<Item = &'a Param>,
{
    let mut keys: Vec<Key> = vec![];
    for param in params {
        for key in param.keys() {
            if !keys.contains(key) {
                keys.push(key.clone());
            }
        }
    }
    keys
}

/// Pad every parameter to the shared schema, using `Value::Absent` for keys a
/// parameter does not carry. Parameters already on the schema are shared, not
/// copied.
pub fn normalize(params: &[Rc<Param>]) -> Vec<Rc<Param>> {
    let keys = ordered_keys(params.iter().map(|p| p.as_ref()));
    normalize_to(params, &keys)
}

pub(crate) fn normalize_to(params: &[Rc<Param>], keys: &[Key]) -> Vec<Rc<Param>> {
    params
        .iter()
        .map(|p| {
            if p.meta().matches_keys(keys) {
                p.clone()
            } else {
                Rc::new(p.padded(keys))
            }
        })
        .collect()
}
