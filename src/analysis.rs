//! One-shot analysis requests, shaped for a plotting front end.
//!
//! An [`AnalysisRequest`] bundles everything a form would collect: the mode,
//! the formula and a symmetric view range. [`run`] turns it into an
//! [`AnalysisReport`] holding the points, table headers, a plot label and the
//! axis window. Failures are carried inside the report as a [`Diagnostic`]
//! so the caller always has something to render.

use log::info;
use serde::{Deserialize, Serialize};

use crate::Real;
use crate::engine::Engine;
use crate::error::{ErrorKind, ExprError};

/// Per-mode parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Mode {
    /// `y = f(x)` over `[start, end]`.
    Function { start: Real, end: Real, step: Real },
    /// `x(n+1) = f(x(n))` from `seed`.
    Sequence { seed: Real, iterations: usize },
}

impl Mode {
    pub fn function() -> Self {
        Mode::Function {
            start: -5.0,
            end: 5.0,
            step: 0.1,
        }
    }

    pub fn sequence() -> Self {
        Mode::Sequence {
            seed: 0.5,
            iterations: 20,
        }
    }

    /// The formula a fresh form shows for this mode.
    pub fn default_formula(&self) -> &'static str {
        match self {
            Mode::Function { .. } => "x**2",
            Mode::Sequence { .. } => "0.5 * x + 1",
        }
    }
}

impl Default for Mode {
    fn default() -> Self {
        Mode::function()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisRequest {
    pub formula: String,
    #[serde(flatten)]
    pub mode: Mode,
    /// Half-width `n` of the plot window `[-n, n]`.
    pub view_range: Real,
}

impl AnalysisRequest {
    /// A request for `mode` with that mode's default formula.
    pub fn for_mode(mode: Mode) -> Self {
        Self {
            formula: mode.default_formula().to_string(),
            mode,
            view_range: 10.0,
        }
    }
}

impl Default for AnalysisRequest {
    fn default() -> Self {
        Self::for_mode(Mode::default())
    }
}

/// Axis bounds for the plot.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlotWindow {
    pub x: (Real, Real),
    pub y: (Real, Real),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ExprError> for Diagnostic {
    fn from(err: &ExprError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Everything needed to draw one analysis.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisReport {
    /// `(x, y)` in function mode, `(n, x(n))` in sequence mode.
    pub points: Vec<(Real, Real)>,
    /// Table headers for `points`.
    pub columns: [&'static str; 2],
    pub label: String,
    pub window: PlotWindow,
    /// Set when a sequence stopped early; the points are still valid.
    pub warning: Option<String>,
    /// Set when the run failed outright; `points` is then empty.
    pub error: Option<Diagnostic>,
}

impl AnalysisReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

fn check_view_range(view_range: Real) -> Result<Real, ExprError> {
    if view_range.is_finite() && view_range > 0.0 {
        Ok(view_range)
    } else {
        Err(ExprError::InvalidRange(format!(
            "view range must be positive and finite, got {}",
            view_range
        )))
    }
}

/// Runs `request` on `engine`.
pub fn run(engine: &Engine, request: &AnalysisRequest) -> AnalysisReport {
    let formula = request.formula.trim();
    let n = request.view_range;
    let mut report = match request.mode {
        Mode::Function { .. } => AnalysisReport {
            points: Vec::new(),
            columns: ["X", "Y"],
            label: format!("y={}", formula),
            window: PlotWindow {
                x: (-n, n),
                y: (-n, n),
            },
            warning: None,
            error: None,
        },
        Mode::Sequence { .. } => AnalysisReport {
            points: Vec::new(),
            columns: ["n", "x(n)"],
            label: format!("x(n+1)={}", formula),
            window: PlotWindow {
                x: (0.0, 10.0),
                y: (-n, n),
            },
            warning: None,
            error: None,
        },
    };

    let outcome = check_view_range(n).and_then(|_| match request.mode {
        Mode::Function { start, end, step } => engine
            .evaluate_function(formula, start, end, step)
            .map(|samples| {
                report.points = samples.into_points();
            }),
        Mode::Sequence { seed, iterations } => engine
            .evaluate_sequence(formula, seed, iterations)
            .map(|run| {
                if let Some((last_n, _)) = run.trajectory.last() {
                    report.window.x = (0.0, (last_n + 1) as Real);
                }
                report.points = run
                    .trajectory
                    .iter()
                    .map(|(i, v)| (i as Real, v))
                    .collect();
                report.warning = run.warning;
            }),
    });

    if let Err(err) = outcome {
        report.points.clear();
        report.error = Some(Diagnostic::from(&err));
    }

    info!(
        "analysis {:?} finished with {} points (warning: {}, error: {:?})",
        report.label,
        report.points.len(),
        report.warning.is_some(),
        report.error.as_ref().map(|d| d.kind)
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let request = AnalysisRequest::default();
        assert_eq!(request.formula, "x**2");
        assert_eq!(request.view_range, 10.0);
        assert_eq!(request.mode, Mode::function());

        let request = AnalysisRequest::for_mode(Mode::sequence());
        assert_eq!(request.formula, "0.5 * x + 1");
        assert_eq!(
            request.mode,
            Mode::Sequence {
                seed: 0.5,
                iterations: 20
            }
        );
    }

    #[test]
    fn test_function_report() {
        let request = AnalysisRequest {
            formula: "x**2".to_string(),
            mode: Mode::Function {
                start: -2.0,
                end: 2.0,
                step: 1.0,
            },
            view_range: 5.0,
        };
        let report = run(&Engine::default(), &request);
        assert!(report.is_ok());
        assert_eq!(report.columns, ["X", "Y"]);
        assert_eq!(report.label, "y=x**2");
        assert_eq!(report.window.x, (-5.0, 5.0));
        assert_eq!(report.window.y, (-5.0, 5.0));
        assert_eq!(
            report.points,
            vec![(-2.0, 4.0), (-1.0, 1.0), (0.0, 0.0), (1.0, 1.0), (2.0, 4.0)]
        );
    }

    #[test]
    fn test_sequence_window_follows_trajectory() {
        let request = AnalysisRequest {
            formula: "0.5*x".to_string(),
            mode: Mode::Sequence {
                seed: 1.0,
                iterations: 3,
            },
            view_range: 2.0,
        };
        let report = run(&Engine::default(), &request);
        assert_eq!(report.columns, ["n", "x(n)"]);
        assert_eq!(report.label, "x(n+1)=0.5*x");
        assert_eq!(report.window.x, (0.0, 4.0));
        assert_eq!(report.window.y, (-2.0, 2.0));
        assert_eq!(report.points.len(), 4);
        assert!(report.warning.is_none());
    }

    #[test]
    fn test_failure_is_reported_not_returned() {
        let request = AnalysisRequest {
            formula: "1/x".to_string(),
            mode: Mode::Function {
                start: -1.0,
                end: 1.0,
                step: 1.0,
            },
            view_range: 10.0,
        };
        let report = run(&Engine::default(), &request);
        assert!(report.points.is_empty());
        assert_eq!(report.error.unwrap().kind, ErrorKind::EvaluationError);

        let request = AnalysisRequest {
            view_range: 0.0,
            ..Default::default()
        };
        let report = run(&Engine::default(), &request);
        assert_eq!(report.error.unwrap().kind, ErrorKind::InvalidRangeError);
    }

    #[test]
    fn test_sequence_failure_keeps_empty_window() {
        let request = AnalysisRequest {
            formula: "open(x)".to_string(),
            mode: Mode::sequence(),
            view_range: 10.0,
        };
        let report = run(&Engine::default(), &request);
        assert!(report.points.is_empty());
        assert_eq!(report.window.x, (0.0, 10.0));
        assert_eq!(report.error.unwrap().kind, ErrorKind::UnknownSymbolError);
    }
}
