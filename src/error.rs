// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use thiserror::Error;

/// Errors raised while discovering, rebuilding or editing parameters.
///
/// Every variant is fatal to the operation that produced it. Nothing is
/// retried internally and a failed edit leaves the owning graph untouched.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed parameter metadata, e.g. a missing or misplaced `val` field.
    #[error("schema error: {0}")]
    Schema(String),

    /// Replacement or value sequence does not line up with its target.
    #[error("expected {expected} values, found {found}")]
    Arity { expected: usize, found: usize },

    /// Attempted write to one of the synthesized columns.
    #[error("column '{0}' is synthesized and cannot be written")]
    ReservedColumn(String),

    /// Row or positional index past the end of the table.
    #[error("index {index} out of bounds (len={len})")]
    Index { index: usize, len: usize },

    /// Named column that does not exist on the table.
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    /// A value does not have the runtime kind an operation requires.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "yaml")]
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    pub(crate) fn schema(msg: impl Into<String>) -> Self {
        Error::Schema(msg.into())
    }

    pub(crate) fn mismatch(expected: &str, found: &str) -> Self {
        Error::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
