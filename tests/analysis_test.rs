//! Analysis requests as a presentation layer would send them.


use exp_plot::analysis::{self, Diagnostic};
use exp_plot::{AnalysisRequest, Engine, ErrorKind, Mode};
use test_helpers::init_logger;

#[test]
fn test_request_from_json_uses_defaults() {
    init_logger();
    let request: AnalysisRequest = serde_json::from_str(r#"{"mode": "function", "start": -5.0, "end": 5.0, "step": 0.1}"#)
            .unwrap();
    assert_eq!(request, AnalysisRequest::default());
    // Flattened mode tag and per-mode parameters
    let request: AnalysisRequest = serde_json::from_str(
        r#"{"formula": "2*x", "mode": "sequence", "seed": 1.0, "iterations": 4, "view_range": 20.0}"#,
    )
    .unwrap();
    assert_eq!(
        request.mode,
        Mode::Sequence {
            seed: 1.0,
            iterations: 4
        }
    );
    assert_eq!(request.view_range, 20.0);
}

#[test]
fn test_default_requests_run_cleanly() {
    init_logger();
    let engine = Engine::default();
    let report = analysis::run(&engine, &AnalysisRequest::default());
    assert!(report.is_ok());
    assert_eq!(report.points.len(), 101);

    let report = analysis::run(&engine, &AnalysisRequest::for_mode(Mode::sequence()));
    assert!(report.is_ok());
    assert_eq!(report.points.len(), 21);
    assert_eq!(report.window.x, (0.0, 21.0));
}

#[test]
fn test_divergent_sequence_report() {
    init_logger();
    let request = AnalysisRequest {
        formula: "2*x".to_string(),
        mode: Mode::Sequence {
            seed: 1.0,
            iterations: 1000,
        },
        view_range: 10.0,
    };
    let report = analysis::run(&Engine::default(), &request);
    assert!(report.is_ok());
    assert_eq!(report.points.len(), 334);
    assert_eq!(report.window.x, (0.0, 334.0));
    assert!(report.warning.unwrap().contains("divergence"));
}

#[test]
fn test_report_serializes_for_the_front_end() {
    init_logger();
    let request = AnalysisRequest {
        formula: "sqrt(x)".to_string(),
        mode: Mode::Function {
            start: -1.0,
            end: 1.0,
            step: 1.0,
        },
        view_range: 10.0,
    };
    let report = analysis::run(&Engine::default(), &request);
    assert_eq!(
        report.error,
        Some(Diagnostic {
            kind: ErrorKind::EvaluationError,
            message: "Evaluation error: math domain error: sqrt(-1)".to_string(),
        })
    );
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["columns"], serde_json::json!(["X", "Y"]));
    assert_eq!(json["label"], "y=sqrt(x)");
    assert_eq!(json["error"]["kind"], "EvaluationError");
    assert_eq!(json["points"], serde_json::json!([]));
    assert_eq!(json["window"]["x"], serde_json::json!([-10.0, 10.0]));
}

#[test]
fn test_each_error_kind_reaches_the_report() {
    init_logger();
    let engine = Engine::default();
    let cases = [
        ("x +", Mode::function(), ErrorKind::ParseError),
        ("import os; x", Mode::sequence(), ErrorKind::UnknownSymbolError),
        (
            "1/x",
            Mode::Function {
                start: -1.0,
                end: 1.0,
                step: 1.0,
            },
            ErrorKind::EvaluationError,
        ),
        (
            "x",
            Mode::Sequence {
                seed: 1.0,
                iterations: 0,
            },
            ErrorKind::InvalidRangeError,
        ),
    ];
    for (formula, mode, kind) in cases {
        let request = AnalysisRequest {
            formula: formula.to_string(),
            mode,
            view_range: 10.0,
        };
        let report = analysis::run(&engine, &request);
        assert!(report.points.is_empty());
        assert_eq!(report.error.map(|d| d.kind), Some(kind), "{}", formula);
    }
}
