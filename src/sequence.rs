//! Sequence mode: iterating `x(n+1) = f(x(n))` from a seed.
//!
//! Each iterate depends on the previous one, so unlike function mode the
//! formula is evaluated once per step with the free variable bound to a
//! scalar. A [`Recurrence`] walks the state machine
//!
//! ```text
//! Running --(n+1 == max)--------------> HaltedNormal
//! Running --(evaluation fault)--------> HaltedError      (fault message kept as warning)
//! Running --(|x(n+1)| > threshold)----> HaltedDivergent  (divergent point kept)
//! ```
//!
//! Points computed before a halt are always kept.

use log::{trace, warn};
use serde::Serialize;

use crate::Real;
use crate::context::EvalContext;
use crate::engine::Formula;
use crate::error::{ExprError, Result};
use crate::value::Value;

/// Where a sequence run is, or why it stopped.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum IterationState {
    Running,
    /// Reached the requested number of iterations.
    HaltedNormal,
    /// The formula failed while computing the next iterate.
    HaltedError,
    /// The last iterate's magnitude exceeded the divergence threshold.
    HaltedDivergent,
}

impl IterationState {
    pub fn is_halted(&self) -> bool {
        !matches!(self, IterationState::Running)
    }
}

/// `(n, x(n))` pairs starting at `n = 0` with the seed.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Trajectory {
    points: Vec<(usize, Real)>,
}

impl Trajectory {
    fn push(&mut self, n: usize, value: Real) {
        self.points.push((n, value));
    }

    pub fn points(&self) -> &[(usize, Real)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn last(&self) -> Option<(usize, Real)> {
        self.points.last().copied()
    }

    /// The iterates without their indices.
    pub fn values(&self) -> Vec<Real> {
        self.points.iter().map(|&(_, v)| v).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, Real)> + '_ {
        self.points.iter().copied()
    }
}

/// The outcome of a sequence run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SequenceRun {
    pub trajectory: Trajectory,
    /// Always halted.
    pub state: IterationState,
    /// Non-fatal diagnostic for `HaltedError` and `HaltedDivergent`.
    pub warning: Option<String>,
}

/// Step-by-step driver for one sequence run.
pub struct Recurrence<'f> {
    formula: &'f Formula,
    ctx: EvalContext,
    max_iters: usize,
    divergence_threshold: Real,
    current: Real,
    n: usize,
    state: IterationState,
    trajectory: Trajectory,
    warning: Option<String>,
}

impl<'f> Recurrence<'f> {
    /// Starts a run at `n = 0` with `seed`.
    pub fn new(
        formula: &'f Formula,
        ctx: EvalContext,
        seed: Real,
        max_iters: usize,
        divergence_threshold: Real,
    ) -> Self {
        let mut trajectory = Trajectory::default();
        trajectory.push(0, seed);
        let state = if max_iters == 0 {
            IterationState::HaltedNormal
        } else {
            IterationState::Running
        };
        Self {
            formula,
            ctx,
            max_iters,
            divergence_threshold,
            current: seed,
            n: 0,
            state,
            trajectory,
            warning: None,
        }
    }

    pub fn state(&self) -> IterationState {
        self.state
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    fn next_value(&mut self) -> Result<Real> {
        self.ctx.bind(Value::Scalar(self.current));
        self.formula.eval(&self.ctx)?.as_scalar().ok_or_else(|| {
            ExprError::InvalidRange("formula produced an array for a scalar iterate".to_string())
        })
    }

    /// Computes one more iterate, unless already halted. Returns the new state.
    pub fn step(&mut self) -> IterationState {
        if self.state.is_halted() {
            return self.state;
        }

        match self.next_value() {
            Ok(next) => {
                self.n += 1;
                self.trajectory.push(self.n, next);
                trace!("{:?}: x({}) = {}", self.formula.source(), self.n, next);

                if next.abs() > self.divergence_threshold {
                    let message = format!(
                        "value too large (divergence) at n={}, stopped",
                        self.n
                    );
                    warn!("{:?}: {}", self.formula.source(), message);
                    self.warning = Some(message);
                    self.state = IterationState::HaltedDivergent;
                } else if self.n >= self.max_iters {
                    self.state = IterationState::HaltedNormal;
                } else {
                    self.current = next;
                }
            }
            Err(err) => {
                let message = format!("computation stopped at n={}: {}", self.n, err);
                warn!("{:?}: {}", self.formula.source(), message);
                self.warning = Some(message);
                self.state = IterationState::HaltedError;
            }
        }
        self.state
    }

    /// Steps until halted.
    pub fn run(mut self) -> SequenceRun {
        while !self.step().is_halted() {}
        self.into_run()
    }

    /// The run so far. The state is `Running` if called before halting.
    pub fn into_run(self) -> SequenceRun {
        SequenceRun {
            trajectory: self.trajectory,
            state: self.state,
            warning: self.warning,
        }
    }
}
