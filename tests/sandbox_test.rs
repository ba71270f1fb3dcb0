//! Formulas can only reach the free variable and the allow-listed symbols.


use exp_plot::{
    Engine, EngineConfig, ErrorKind, ExprError, SymbolTable, evaluate_function,
    evaluate_sequence,
};
use test_helpers::init_logger;

const HOSTILE: &[&str] = &[
    "import os; x",
    "__import__('os').system('ls')",
    "os.system(x)",
    "open(x)",
    "eval(x)",
    "exec(x)",
    "globals()",
    "x.__class__",
    "lambda: x",
    "y + x",
    "sinh(x)",
    "e",
];

#[test]
fn test_hostile_formulas_rejected_in_function_mode() {
    init_logger();
    for formula in HOSTILE {
        let err = evaluate_function(formula, -1.0, 1.0, 0.5).unwrap_err();
        assert_eq!(
            err.kind(),
            ErrorKind::UnknownSymbolError,
            "{:?} gave {:?}",
            formula,
            err
        );
    }
}

#[test]
fn test_hostile_formulas_rejected_in_sequence_mode() {
    init_logger();
    for formula in HOSTILE {
        let err = evaluate_sequence(formula, 0.5, 20).unwrap_err();
        assert_eq!(
            err.kind(),
            ErrorKind::UnknownSymbolError,
            "{:?} gave {:?}",
            formula,
            err
        );
    }
}

#[test]
fn test_first_unknown_name_is_reported() {
    init_logger();
    match evaluate_function("sin(x) + os.system(x)", 0.0, 1.0, 1.0).unwrap_err() {
        ExprError::UnknownSymbol { name, position } => {
            assert_eq!(name, "os");
            assert_eq!(position, 9);
        }
        other => panic!("Expected UnknownSymbol, got {:?}", other),
    }
}

#[test]
fn test_every_allowed_name_compiles() {
    init_logger();
    let engine = Engine::default();
    for name in ["sin", "cos", "tan", "exp", "log", "sqrt", "abs"] {
        assert!(engine.compile(&format!("{}(x)", name)).is_ok(), "{}", name);
    }
    assert!(engine.compile("pi * x").is_ok());
}

#[test]
fn test_overlong_names_are_unknown_symbols() {
    init_logger();
    let long = "a".repeat(1001);
    let err = evaluate_function(&long, 0.0, 1.0, 1.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnknownSymbolError, "{:?}", err);
    let err = evaluate_sequence(&format!("x + {}", long), 1.0, 5).unwrap_err();
    match err {
        ExprError::UnknownSymbol { name, position } => {
            assert_eq!(name.len(), 1001);
            assert_eq!(position, 4);
        }
        other => panic!("Expected UnknownSymbol, got {:?}", other),
    }
}

#[test]
fn test_non_ascii_names_are_unknown_symbols() {
    init_logger();
    for formula in ["π * x", "x + é", "sin(ξ)"] {
        let err = evaluate_function(formula, 0.0, 1.0, 1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownSymbolError, "{:?} gave {:?}", formula, err);
        let err = evaluate_sequence(formula, 0.5, 5).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownSymbolError, "{:?} gave {:?}", formula, err);
    }
}

#[test]
fn test_names_are_case_sensitive() {
    init_logger();
    for formula in ["SIN(x)", "Pi", "X"] {
        let err = evaluate_function(formula, 0.0, 1.0, 1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownSymbolError, "{}", formula);
    }
}

#[test]
fn test_extending_the_allow_list() {
    init_logger();
    let mut symbols = SymbolTable::standard();
    symbols
        .register_function("sinh", libm::sinh)
        .unwrap();
    let engine = Engine::with_symbols(EngineConfig::default(), symbols).unwrap();
    let samples = engine.evaluate_function("sinh(x)", 0.0, 0.0, 1.0).unwrap();
    assert_eq!(samples.y(), &[0.0]);

    // The default engine is unaffected
    assert_eq!(
        evaluate_function("sinh(x)", 0.0, 0.0, 1.0).unwrap_err().kind(),
        ErrorKind::UnknownSymbolError
    );
}

#[test]
fn test_empty_allow_list_only_knows_the_variable() {
    init_logger();
    let engine = Engine::with_symbols(EngineConfig::default(), SymbolTable::empty()).unwrap();
    assert_eq!(
        engine.evaluate_function("x * 2 - 1", 0.0, 1.0, 1.0).unwrap().y(),
        &[-1.0, 1.0]
    );
    assert_eq!(
        engine.evaluate_function("sin(x)", 0.0, 1.0, 1.0).unwrap_err().kind(),
        ErrorKind::UnknownSymbolError
    );
}
