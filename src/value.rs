//! Tagged evaluation results.
//!
//! The free variable is bound either to a single number (sequence mode) or to
//! the whole sampling domain (function mode), so every intermediate result is
//! a [`Value`]. Operators combine values element-wise, promoting a scalar
//! against an array; the first faulting element aborts the whole operation.

use serde::Serialize;

use crate::Real;
use crate::error::{ExprError, NumericFault};

/// A scalar or an array of reals.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Value {
    Scalar(Real),
    Array(Vec<Real>),
}

impl Value {
    /// Number of elements for an array, `None` for a scalar.
    pub fn len(&self) -> Option<usize> {
        match self {
            Value::Scalar(_) => None,
            Value::Array(values) => Some(values.len()),
        }
    }

    pub fn as_scalar(&self) -> Option<Real> {
        match self {
            Value::Scalar(v) => Some(*v),
            Value::Array(_) => None,
        }
    }

    /// Expands the value to exactly `len` elements.
    ///
    /// A scalar is repeated; an array must already have the requested length.
    pub fn broadcast(self, len: usize) -> Result<Vec<Real>, ExprError> {
        match self {
            Value::Scalar(v) => Ok(vec![v; len]),
            Value::Array(values) if values.len() == len => Ok(values),
            Value::Array(values) => Err(ExprError::InvalidRange(format!(
                "cannot broadcast an array of {} values to {} samples",
                values.len(),
                len
            ))),
        }
    }

    /// Applies a checked function to every element.
    pub fn map<F>(self, f: F) -> Result<Value, NumericFault>
    where
        F: Fn(Real) -> Result<Real, NumericFault>,
    {
        match self {
            Value::Scalar(v) => f(v).map(Value::Scalar),
            Value::Array(values) => values
                .into_iter()
                .map(f)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
        }
    }

    /// Combines two values element-wise with a checked binary kernel.
    pub fn zip_with<F>(self, other: Value, f: F) -> Result<Value, ExprError>
    where
        F: Fn(Real, Real) -> Result<Real, NumericFault>,
    {
        let out = match (self, other) {
            (Value::Scalar(a), Value::Scalar(b)) => Value::Scalar(f(a, b)?),
            (Value::Scalar(a), Value::Array(bs)) => Value::Array(
                bs.into_iter()
                    .map(|b| f(a, b))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            (Value::Array(as_), Value::Scalar(b)) => Value::Array(
                as_.into_iter()
                    .map(|a| f(a, b))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            (Value::Array(as_), Value::Array(bs)) => {
                if as_.len() != bs.len() {
                    return Err(ExprError::InvalidRange(format!(
                        "array length mismatch: {} vs {}",
                        as_.len(),
                        bs.len()
                    )));
                }
                Value::Array(
                    as_.into_iter()
                        .zip(bs)
                        .map(|(a, b)| f(a, b))
                        .collect::<Result<Vec<_>, _>>()?,
                )
            }
        };
        Ok(out)
    }
}

impl From<Real> for Value {
    fn from(v: Real) -> Self {
        Value::Scalar(v)
    }
}

impl From<Vec<Real>> for Value {
    fn from(values: Vec<Real>) -> Self {
        Value::Array(values)
    }
}
