// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use core::cmp::Ordering;
use core::fmt::{Debug, Display, Formatter};

use serde::ser::Serializer;
use serde::Serialize;

use crate::error::{Error, Result};

const I64_BOUND: f64 = 9_223_372_036_854_775_808.0; // 2^63

/// Numeric scalar stored in values and parameter metadata.
///
/// Integers stay integers under integer arithmetic and widen to floats on
/// overflow or when either operand is a float.
#[derive(Clone, Copy)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn to_f64_lossy(self) -> f64 {
        match self {
            Number::Int(v) => v as f64,
            Number::Float(v) => v,
        }
    }

    fn is_zero(&self) -> bool {
        match self {
            Number::Int(v) => *v == 0,
            Number::Float(f) => *f == 0.0,
        }
    }

    /// Float view of the number, saturating large integers.
    pub fn to_f64(&self) -> f64 {
        self.to_f64_lossy()
    }

    pub fn mul(&self, rhs: &Self) -> Number {
        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) => match a.checked_mul(*b) {
                Some(prod) => Number::Int(prod),
                None => Number::Float(*a as f64 * *b as f64),
            },
            _ => Number::Float(self.to_f64_lossy() * rhs.to_f64_lossy()),
        }
    }

    /// Exact integer quotients stay integers; anything else becomes a float.
    pub fn divide(&self, rhs: &Self) -> Result<Number> {
        if rhs.is_zero() {
            return Err(Error::mismatch("non-zero divisor", "0"));
        }

        match (self, rhs) {
            (Number::Int(a), Number::Int(b)) if a.checked_rem(*b) == Some(0) => Ok(a
                .checked_div(*b)
                .map(Number::Int)
                .unwrap_or(Number::Float(*a as f64 / *b as f64))),
            _ => Ok(Number::Float(self.to_f64_lossy() / rhs.to_f64_lossy())),
        }
    }

    pub fn format_decimal(&self) -> String {
        match self {
            Number::Int(v) => v.to_string(),
            Number::Float(f) => {
                if f.is_nan() {
                    "NaN".to_string()
                } else if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e16 {
                    format!("{f:.1}")
                } else {
                    f.to_string()
                }
            }
        }
    }
}

impl Debug for Number {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.format_decimal())
    }
}

impl Display for Number {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.format_decimal())
    }
}

impl Serialize for Number {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Number::Int(v) => serializer.serialize_i64(*v),
            Number::Float(v) => serializer.serialize_f64(*v),
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Int(value)
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Self {
        Number::Int(value as i64)
    }
}

impl From<u64> for Number {
    fn from(value: u64) -> Self {
        i64::try_from(value)
            .map(Number::Int)
            .unwrap_or(Number::Float(value as f64))
    }
}

impl From<usize> for Number {
    fn from(value: usize) -> Self {
        Number::from(value as u64)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Float(value)
    }
}

// Floats compare by `total_cmp` after folding every NaN into one value and
// `-0.0` into `0.0`. Ints and floats compare exactly, without going through
// a lossy conversion.
fn canonical(f: f64) -> f64 {
    if f.is_nan() {
        f64::NAN
    } else if f == 0.0 {
        0.0
    } else {
        f
    }
}

fn cmp_int_float(i: i64, f: f64) -> Ordering {
    if f.is_nan() || f >= I64_BOUND {
        return Ordering::Less;
    }
    if f < -I64_BOUND {
        return Ordering::Greater;
    }
    let whole = f.trunc();
    match i.cmp(&(whole as i64)) {
        Ordering::Equal => canonical(whole).total_cmp(&canonical(f)),
        ord => ord,
    }
}

impl Ord for Number {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a.cmp(b),
            (Number::Float(a), Number::Float(b)) => canonical(*a).total_cmp(&canonical(*b)),
            (Number::Int(a), Number::Float(b)) => cmp_int_float(*a, *b),
            (Number::Float(a), Number::Int(b)) => cmp_int_float(*b, *a).reverse(),
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Number {}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
