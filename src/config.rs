//! Engine configuration.
//!
//! The numeric limits below have no deeper correctness argument behind them,
//! so they are defaults rather than invariants. A presentation layer can
//! deserialize an [`EngineConfig`] from its own settings; missing fields fall
//! back to the defaults.

use serde::{Deserialize, Serialize};

use crate::Real;
use crate::constants;
use crate::context::is_identifier;
use crate::error::{ExprError, Result};

/// Tunable limits for parsing, sampling and iteration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Name of the free variable.
    pub variable: String,
    /// Sequence mode stops once `|x(n)|` exceeds this.
    pub divergence_threshold: Real,
    /// Fraction of a step added to the function-mode end bound so the literal
    /// endpoint survives floating truncation.
    pub endpoint_tolerance: Real,
    /// Largest sample count function mode will evaluate.
    pub max_samples: usize,
    /// Largest iteration count sequence mode will run.
    pub max_iterations: usize,
    /// Deepest parenthesis/operator nesting the parser accepts.
    pub max_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            variable: "x".to_string(),
            divergence_threshold: constants::DIVERGENCE_THRESHOLD,
            endpoint_tolerance: constants::ENDPOINT_TOLERANCE,
            max_samples: 1_000_000,
            max_iterations: 1_000_000,
            max_depth: 256,
        }
    }
}

impl EngineConfig {
    /// Checks that every limit is usable.
    pub fn validate(&self) -> Result<()> {
        if !is_identifier(&self.variable) {
            return Err(ExprError::Syntax(format!(
                "'{}' is not a valid variable name",
                self.variable
            )));
        }
        if !(self.divergence_threshold.is_finite() && self.divergence_threshold > 0.0) {
            return Err(ExprError::InvalidRange(format!(
                "divergence threshold must be positive and finite, got {}",
                self.divergence_threshold
            )));
        }
        if !(0.0..1.0).contains(&self.endpoint_tolerance) {
            return Err(ExprError::InvalidRange(format!(
                "endpoint tolerance must be in [0, 1), got {}",
                self.endpoint_tolerance
            )));
        }
        if self.max_samples == 0 || self.max_iterations == 0 || self.max_depth == 0 {
            return Err(ExprError::InvalidRange(
                "sample, iteration and depth ceilings must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
