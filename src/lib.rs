#![doc = r#"
# exp-plot

A sandboxed formula evaluator and sampling engine for plotting user-supplied
math expressions.

## Overview

exp-plot takes a single formula such as `sin(x) * exp(-x)` and produces the
numbers needed to draw it in one of two modes:

- **function mode**: `y = f(x)` sampled over `[start, end]` with a fixed step;
- **sequence mode**: the recurrence `x(n+1) = f(x(n))` iterated from a seed,
  stopping on an evaluation fault or when the iterate diverges.

Formulas are lexed, parsed with a Pratt parser into an AST and interpreted
against an explicit symbol table. Nothing in a formula can reach the host:
the only names a formula can use are the free variable and the allow-listed
symbols `sin`, `cos`, `tan`, `exp`, `log`, `sqrt`, `pi` and `abs`.

## Quick Start

```rust
use exp_plot::{evaluate_function, evaluate_sequence, IterationState};

let samples = evaluate_function("x**2", -2.0, 2.0, 1.0).unwrap();
assert_eq!(samples.x(), &[-2.0, -1.0, 0.0, 1.0, 2.0]);
assert_eq!(samples.y(), &[4.0, 1.0, 0.0, 1.0, 4.0]);

let run = evaluate_sequence("0.5*x", 1.0, 5).unwrap();
assert_eq!(run.state, IterationState::HaltedNormal);
assert_eq!(run.trajectory.last(), Some((5, 0.03125)));
```

## Error Handling

Every failure maps to one of four kinds:

```rust
use exp_plot::{evaluate_function, ErrorKind};

let err = evaluate_function("1/x", -1.0, 1.0, 1.0).unwrap_err();
assert_eq!(err.kind(), ErrorKind::EvaluationError);

let err = evaluate_function("import os; x", -1.0, 1.0, 1.0).unwrap_err();
assert_eq!(err.kind(), ErrorKind::UnknownSymbolError);

let err = evaluate_function("x +", -1.0, 1.0, 1.0).unwrap_err();
assert_eq!(err.kind(), ErrorKind::ParseError);

let err = evaluate_function("x", -1.0, 1.0, 0.0).unwrap_err();
assert_eq!(err.kind(), ErrorKind::InvalidRangeError);
```

In sequence mode a fault while computing the next iterate is not fatal: the
points computed so far are returned with a warning.

## Supported Grammar

| Precedence | Operators    | Associativity |
|------------|--------------|---------------|
| 1          | `+` `-`      | Left          |
| 2          | `*` `/` `%`  | Left          |
| 3          | unary `+ -`  | Right         |
| 4          | `^` `**`     | Right         |

Function calls take exactly one argument: `sqrt(x)`.
"#]

pub mod analysis;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod sampling;
pub mod sequence;
pub mod types;
pub mod value;

pub use analysis::{AnalysisReport, AnalysisRequest, Mode, PlotWindow};
pub use config::EngineConfig;
pub use context::{EvalContext, SymbolTable};
pub use engine::{Engine, Formula, evaluate_function, evaluate_sequence, interp};
pub use error::{ErrorKind, ExprError, NumericFault};
pub use sampling::SampleSet;
pub use sequence::{IterationState, Recurrence, SequenceRun, Trajectory};
pub use value::Value;

/// Floating-point type used for every computation in the crate.
pub type Real = f64;

pub mod constants {
    use super::Real;

    pub const PI: Real = core::f64::consts::PI;
    /// Magnitude above which a sequence-mode iterate counts as divergent.
    pub const DIVERGENCE_THRESHOLD: Real = 1e100;
    /// Fraction of a step added to the function-mode end bound.
    pub const ENDPOINT_TOLERANCE: Real = 1e-3;
    pub const TEST_PRECISION: Real = 1e-10;
}

/// Utility macro to check if two floating point values are approximately equal
/// within a specified epsilon. Supports optional format arguments like assert_eq!.
#[macro_export]
macro_rules! assert_approx_eq {
    ($left:expr, $right:expr $(,)?) => {
        $crate::assert_approx_eq!($left, $right, $crate::constants::TEST_PRECISION)
    };
    ($left:expr, $right:expr, $epsilon:expr $(,)?) => {{
        let left_val: $crate::Real = $left;
        let right_val: $crate::Real = $right;
        let eps: $crate::Real = $epsilon;

        if left_val.is_nan() && right_val.is_nan() {
            // NaN == NaN for our purposes
        } else if left_val.is_infinite()
            && right_val.is_infinite()
            && left_val.signum() == right_val.signum()
        {
            // Same-signed infinities are equal
        } else {
            assert!(
                (left_val - right_val).abs() < eps,
                "assertion failed: `(left ≈ right)` (left: `{}`, right: `{}`, epsilon: `{}`)",
                left_val,
                right_val,
                eps
            );
        }
    }};
    ($left:expr, $right:expr, $epsilon:expr, $($arg:tt)+) => {{
        let left_val: $crate::Real = $left;
        let right_val: $crate::Real = $right;
        let eps: $crate::Real = $epsilon;

        if !(left_val.is_nan() && right_val.is_nan()) {
            assert!((left_val - right_val).abs() < eps, $($arg)+);
        }
    }};
}
