//! Function mode: sampling `y = f(x)` over a range.
//!
//! The grid is `start, start + step, ...` up to and including `end`, with a
//! small fraction of a step (see [`EngineConfig::endpoint_tolerance`]) added
//! to the upper bound so the endpoint survives floating truncation. The
//! formula is evaluated once over the whole grid, so a fault at any sample
//! aborts the run instead of leaving a misleading partial plot.

use serde::Serialize;

use crate::Real;
use crate::config::EngineConfig;
use crate::context::EvalContext;
use crate::engine::Formula;
use crate::error::{ExprError, Result};
use crate::value::Value;

/// Sampled `(x, y)` pairs with `x` strictly increasing.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct SampleSet {
    x: Vec<Real>,
    y: Vec<Real>,
}

impl SampleSet {
    pub fn x(&self) -> &[Real] {
        &self.x
    }

    pub fn y(&self) -> &[Real] {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Iterates over `(x, y)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (Real, Real)> + '_ {
        self.x.iter().copied().zip(self.y.iter().copied())
    }

    pub fn into_points(self) -> Vec<(Real, Real)> {
        self.x.into_iter().zip(self.y).collect()
    }
}

/// Number of samples in `[start, end]`: `floor((end - start)/step + tolerance) + 1`,
/// or zero when `start > end`.
pub fn sample_count(start: Real, end: Real, step: Real, tolerance: Real) -> Real {
    if start > end {
        return 0.0;
    }
    ((end - start) / step + tolerance).floor() + 1.0
}

/// Validates the range and builds the x grid.
///
/// Fails with [`ExprError::InvalidRange`] for a non-positive or non-finite
/// step, non-finite bounds or a step too small to separate neighbouring
/// samples, and with [`ExprError::LimitExceeded`] when the
/// grid would exceed [`EngineConfig::max_samples`].
pub fn sample_grid(start: Real, end: Real, step: Real, config: &EngineConfig) -> Result<Vec<Real>> {
    if !(step.is_finite() && step > 0.0) {
        return Err(ExprError::InvalidRange(format!(
            "step must be greater than 0, got {}",
            step
        )));
    }
    if !(start.is_finite() && end.is_finite()) {
        return Err(ExprError::InvalidRange(format!(
            "range bounds must be finite, got [{}, {}]",
            start, end
        )));
    }

    let count = sample_count(start, end, step, config.endpoint_tolerance);
    if count > config.max_samples as Real {
        return Err(ExprError::LimitExceeded {
            limit: "sample count",
            requested: if count >= usize::MAX as Real {
                usize::MAX
            } else {
                count as usize
            },
            max: config.max_samples,
        });
    }

    let count = count as usize;
    let xs: Vec<Real> = (0..count).map(|i| start + i as Real * step).collect();
    if xs.windows(2).any(|pair| pair[1] <= pair[0]) {
        return Err(ExprError::InvalidRange(format!(
            "step {} is below the floating-point resolution of [{}, {}]",
            step, start, end
        )));
    }
    Ok(xs)
}

/// Evaluates `formula` once with the free variable bound to `xs`.
///
/// A scalar result (a formula that ignores the variable) is broadcast to the
/// grid's length.
pub fn sample(formula: &Formula, ctx: &mut EvalContext, xs: Vec<Real>) -> Result<SampleSet> {
    ctx.bind(Value::Array(xs.clone()));
    let y = formula.eval(ctx)?.broadcast(xs.len())?;
    Ok(SampleSet { x: xs, y })
}
