use std::rc::Rc;

use log::debug;

use crate::Real;
use crate::config::EngineConfig;
use crate::context::{EvalContext, Symbol, SymbolTable};
use crate::error::{ExprError, Result};
use crate::eval::eval_ast;
use crate::lexer::{Lexer, Token};
use crate::sampling::{self, SampleSet};
use crate::sequence::{Recurrence, SequenceRun};
use crate::types::{AstExpr, BinaryOperator, TokenKind, UnaryOperator};
use crate::value::Value;

/// Longest formula the parser accepts, in bytes.
const MAX_EXPRESSION_LENGTH: usize = 10_000;

/// Most AST nodes a single formula may produce.
const MAX_NODES: usize = 4096;

/// Token binding powers for the Pratt parser
#[derive(Debug, Clone, Copy)]
struct BindingPower {
    left: u8,
    right: u8,
}

impl BindingPower {
    const fn new(left: u8, right: u8) -> Self {
        Self { left, right }
    }

    // For left-associative operators, right binding power is left + 1
    const fn left_assoc(power: u8) -> Self {
        Self::new(power, power + 1)
    }

    // For right-associative operators, the right side may start at a lower power
    const fn right_assoc(power: u8) -> Self {
        Self::new(power, power - 1)
    }
}

/// Prefix operators bind looser than `^`/`**` so `-2**2` is `-(2**2)`.
const PREFIX_BINDING_POWER: u8 = 14;

/// Pratt parser for arithmetic formulas
struct PrattParser<'a> {
    lexer: Lexer<'a>,
    current: Option<Token>,
    recursion_depth: usize,
    max_recursion_depth: usize,
    nodes: usize,
}

impl<'a> PrattParser<'a> {
    fn new(input: &'a str, max_recursion_depth: usize) -> Self {
        let mut lexer = Lexer::new(input);
        let current = lexer.next_token();
        Self {
            lexer,
            current,
            recursion_depth: 0,
            max_recursion_depth,
            nodes: 0,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.current.take();
        self.current = self.lexer.next_token();
        tok
    }

    // Get binding power for an infix operator
    fn get_binding_power(op: BinaryOperator) -> BindingPower {
        match op {
            BinaryOperator::Add | BinaryOperator::Sub => BindingPower::left_assoc(9),
            BinaryOperator::Mul | BinaryOperator::Div | BinaryOperator::Rem => {
                BindingPower::left_assoc(10)
            }
            BinaryOperator::Pow => BindingPower::right_assoc(15),
        }
    }

    fn node(&mut self, expr: AstExpr) -> Result<AstExpr> {
        self.nodes += 1;
        if self.nodes > MAX_NODES {
            return Err(ExprError::RecursionLimit(format!(
                "Expression too complex: more than {} operations",
                MAX_NODES
            )));
        }
        Ok(expr)
    }

    fn parse_expr(&mut self, min_bp: u8) -> Result<AstExpr> {
        // Check recursion depth to prevent stack overflow
        self.recursion_depth += 1;
        if self.recursion_depth > self.max_recursion_depth {
            return Err(ExprError::RecursionLimit(format!(
                "Expression too complex: exceeded maximum nesting depth of {}",
                self.max_recursion_depth
            )));
        }

        let lhs = self.parse_prefix_or_primary()?;
        let lhs = self.parse_infix_operators(lhs, min_bp)?;

        self.recursion_depth -= 1;
        Ok(lhs)
    }

    fn parse_prefix_or_primary(&mut self) -> Result<AstExpr> {
        let op = match self.peek() {
            Some(tok) if tok.kind == TokenKind::Operator => match tok.text() {
                "-" => Some(UnaryOperator::Neg),
                "+" => Some(UnaryOperator::Plus),
                _ => None,
            },
            _ => None,
        };
        let Some(op) = op else {
            return self.parse_primary();
        };

        let op_position = self.peek().map(|t| t.position).unwrap_or(0);
        self.next();
        if self.peek().is_none() {
            return Err(ExprError::Syntax(format!(
                "Expected expression after unary operator at position {}",
                op_position
            )));
        }
        let operand = self.parse_expr(PREFIX_BINDING_POWER)?;
        self.node(AstExpr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_infix_operators(&mut self, mut lhs: AstExpr, min_bp: u8) -> Result<AstExpr> {
        loop {
            let op = match self.peek() {
                Some(tok) if tok.kind == TokenKind::Operator => {
                    match BinaryOperator::from_symbol(tok.text()) {
                        Some(op) => op,
                        None => break,
                    }
                }
                _ => break,
            };

            let bp = Self::get_binding_power(op);
            // If the operator's left binding power is less than the minimum, we're done
            if bp.left < min_bp {
                break;
            }

            let op_position = self.peek().map(|t| t.position).unwrap_or(0);
            self.next();
            if self.peek().is_none() {
                return Err(ExprError::Syntax(format!(
                    "Expected expression after '{}' at position {}",
                    op, op_position
                )));
            }

            let rhs = self.parse_expr(bp.right)?;
            lhs = self.node(AstExpr::Binary {
                op,
                left: Box::new(lhs),
                right: Box::new(rhs),
            })?;
        }
        Ok(lhs)
    }

    // Parse a primary expression (number, name, call, parenthesized expression)
    fn parse_primary(&mut self) -> Result<AstExpr> {
        let tok = match self.peek() {
            Some(tok) => tok,
            None => return Err(ExprError::Syntax("Unexpected end of input".to_string())),
        };

        match tok.kind {
            TokenKind::Number => {
                let val = tok.value.unwrap_or(0.0);
                self.next();
                self.node(AstExpr::Constant(val))
            }
            TokenKind::Variable => {
                let name = tok.text().to_string();
                self.next();
                match self.peek() {
                    Some(next) if next.kind == TokenKind::Open && next.text() == "(" => {
                        self.parse_function_call(name)
                    }
                    _ => self.node(AstExpr::Variable(name)),
                }
            }
            TokenKind::Open if tok.text() == "(" => self.parse_parenthesized_expr(),
            TokenKind::Close => Err(ExprError::Syntax(format!(
                "Unexpected closing parenthesis at position {}: '{}'",
                tok.position,
                tok.text()
            ))),
            _ => Err(ExprError::Syntax(format!(
                "Unexpected token at position {}: '{}'",
                tok.position,
                tok.text()
            ))),
        }
    }

    fn expect_close(&mut self, open_position: usize, context: &str) -> Result<()> {
        match self.peek() {
            Some(tok) if tok.kind == TokenKind::Close && tok.text() == ")" => {
                self.next();
                Ok(())
            }
            Some(tok) => Err(ExprError::Syntax(format!(
                "Expected closing parenthesis ')' but found '{}' at position {}{} (opening at position {})",
                tok.text(),
                tok.position,
                context,
                open_position
            ))),
            None => Err(ExprError::UnmatchedParenthesis {
                position: open_position,
                found: "(".to_string(),
            }),
        }
    }

    fn parse_parenthesized_expr(&mut self) -> Result<AstExpr> {
        let open_position = self.peek().map(|t| t.position).unwrap_or(0);
        self.next(); // consume '('
        let expr = self.parse_expr(0)?;
        self.expect_close(open_position, "")?;
        Ok(expr)
    }

    fn parse_function_call(&mut self, name: String) -> Result<AstExpr> {
        let open_position = self.peek().map(|t| t.position).unwrap_or(0);
        self.next(); // consume '('

        let mut args = Vec::new();
        if !matches!(self.peek(), Some(tok) if tok.kind == TokenKind::Close) {
            args.push(self.parse_expr(0)?);
            while let Some(tok) = self.peek() {
                if tok.kind == TokenKind::Separator && tok.text() == "," {
                    self.next();
                    args.push(self.parse_expr(0)?);
                } else {
                    break;
                }
            }
        }
        self.expect_close(open_position, " in function call")?;

        let arg = match <[AstExpr; 1]>::try_from(args) {
            Ok([arg]) => arg,
            Err(args) => {
                return Err(ExprError::InvalidFunctionCall {
                    name,
                    expected: 1,
                    found: args.len(),
                });
            }
        };
        self.node(AstExpr::Function {
            name,
            arg: Box::new(arg),
        })
    }

    // Parse a complete expression
    fn parse(&mut self) -> Result<AstExpr> {
        self.recursion_depth = 0;
        let expr = self.parse_expr(0)?;

        // Check for unexpected trailing tokens
        if let Some(tok) = self.peek() {
            if tok.kind == TokenKind::Close {
                return Err(ExprError::Syntax(format!(
                    "Unexpected closing parenthesis at position {}: check for balanced parentheses",
                    tok.position
                )));
            }
            return Err(ExprError::Syntax(format!(
                "Unexpected token at position {}: '{}'",
                tok.position,
                tok.text()
            )));
        }
        Ok(expr)
    }
}

/// Rejects every identifier that is neither `variable` nor in `symbols`,
/// then every token the lexer could not classify.
///
/// Runs over the raw token stream so a hostile formula is refused on its
/// names before its syntax is even considered.
fn screen_tokens(input: &str, symbols: &SymbolTable, variable: &str) -> Result<()> {
    let tokens: Vec<Token> = Lexer::new(input).collect();
    if let Some(tok) = tokens.iter().find(|tok| {
        tok.kind == TokenKind::Variable && tok.text() != variable && !symbols.contains(tok.text())
    }) {
        return Err(ExprError::UnknownSymbol {
            name: tok.text().to_string(),
            position: tok.position,
        });
    }
    if let Some(tok) = tokens.iter().find(|tok| tok.kind == TokenKind::Error) {
        let what = if tok.text().starts_with(|c: char| c.is_ascii_digit() || c == '.') {
            "invalid number literal"
        } else {
            "unexpected character"
        };
        return Err(ExprError::Tokenizer(format!(
            "{} '{}' at position {}",
            what,
            tok.text(),
            tok.position
        )));
    }
    Ok(())
}

/// Checks that names are used in the role their symbol allows: functions are
/// called, constants and the variable are not.
fn check_roles(ast: &AstExpr, symbols: &SymbolTable) -> Result<()> {
    match ast {
        AstExpr::Constant(_) => Ok(()),
        AstExpr::Variable(name) => match symbols.get(name) {
            Some(Symbol::Function(_)) => Err(ExprError::InvalidFunctionCall {
                name: name.clone(),
                expected: 1,
                found: 0,
            }),
            _ => Ok(()),
        },
        AstExpr::Function { name, arg } => {
            if !symbols.is_function(name) {
                return Err(ExprError::InvalidFunctionCall {
                    name: name.clone(),
                    expected: 0,
                    found: 1,
                });
            }
            check_roles(arg, symbols)
        }
        AstExpr::Unary { operand, .. } => check_roles(operand, symbols),
        AstExpr::Binary { left, right, .. } => {
            check_roles(left, symbols)?;
            check_roles(right, symbols)
        }
    }
}

/// A formula that passed the sandbox checks, ready to be evaluated.
#[derive(Clone, Debug, PartialEq)]
pub struct Formula {
    source: String,
    ast: AstExpr,
}

impl Formula {
    /// Parses `source` against an allow-list and a free-variable name.
    ///
    /// Fails with [`ExprError::UnknownSymbol`] for any other identifier and
    /// with a parse-kind error for malformed syntax.
    pub fn compile(
        source: &str,
        symbols: &SymbolTable,
        variable: &str,
        max_depth: usize,
    ) -> Result<Self> {
        if source.trim().is_empty() {
            return Err(ExprError::Syntax("Formula is empty".to_string()));
        }
        if source.len() > MAX_EXPRESSION_LENGTH {
            return Err(ExprError::Syntax(format!(
                "Expression too long: {} characters (maximum is {})",
                source.len(),
                MAX_EXPRESSION_LENGTH
            )));
        }
        screen_tokens(source, symbols, variable)?;

        let ast = PrattParser::new(source, max_depth).parse()?;
        check_roles(&ast, symbols)?;

        debug!("compiled formula {:?}", source);
        Ok(Self {
            source: source.to_string(),
            ast,
        })
    }

    /// Evaluates the formula; see [`eval_ast`].
    pub fn eval(&self, ctx: &EvalContext) -> Result<Value> {
        eval_ast(&self.ast, ctx)
    }

    /// The formula text as it was compiled.
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Parses an expression string into an AST against the standard allow-list
/// with `x` as the free variable.
pub fn parse_expression(input: &str) -> Result<AstExpr> {
    let config = EngineConfig::default();
    Formula::compile(input, &SymbolTable::standard(), &config.variable, config.max_depth)
        .map(|formula| formula.ast)
}

/// Interprets a string as a formula and evaluates it in `ctx`.
///
/// # Examples
///
/// ```
/// use exp_plot::context::{EvalContext, SymbolTable};
/// use exp_plot::engine::interp;
/// use exp_plot::error::ExprError;
/// use exp_plot::Value;
/// use std::rc::Rc;
///
/// let mut ctx = EvalContext::new(Rc::new(SymbolTable::standard()), "x").unwrap();
/// ctx.bind(Value::Scalar(3.0));
/// assert_eq!(interp("x**2 + 1", &ctx).unwrap(), Value::Scalar(10.0));
///
/// match interp("2 + * 3", &ctx) {
///     Err(ExprError::Syntax(_)) => {}
///     other => panic!("Expected a syntax error, got {:?}", other),
/// }
/// ```
pub fn interp(expression: &str, ctx: &EvalContext) -> Result<Value> {
    let formula = Formula::compile(
        expression,
        ctx.symbols(),
        ctx.variable(),
        EngineConfig::default().max_depth,
    )?;
    formula.eval(ctx)
}

/// The formula engine: an allow-list plus a configuration.
///
/// Holds no per-run state; every call builds its own context and output.
#[derive(Clone, Debug)]
pub struct Engine {
    config: EngineConfig,
    symbols: Rc<SymbolTable>,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            config: EngineConfig::default(),
            symbols: Rc::new(SymbolTable::standard()),
        }
    }
}

impl Engine {
    /// An engine over the standard allow-list.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_symbols(config, SymbolTable::standard())
    }

    /// An engine over a custom allow-list.
    pub fn with_symbols(config: EngineConfig, symbols: SymbolTable) -> Result<Self> {
        config.validate()?;
        let symbols = Rc::new(symbols);
        // Rejects a variable name that collides with a symbol
        EvalContext::new(symbols.clone(), &config.variable)?;
        Ok(Self { config, symbols })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn compile(&self, formula: &str) -> Result<Formula> {
        Formula::compile(
            formula,
            &self.symbols,
            &self.config.variable,
            self.config.max_depth,
        )
    }

    /// A fresh context with the free variable unbound.
    pub fn context(&self) -> Result<EvalContext> {
        EvalContext::new(self.symbols.clone(), &self.config.variable)
    }

    /// Samples `formula` over `[start, end]` with a fixed `step`.
    ///
    /// The range is validated before the formula is parsed, and the formula
    /// is evaluated once over the whole domain: any fault aborts the run.
    pub fn evaluate_function(
        &self,
        formula: &str,
        start: Real,
        end: Real,
        step: Real,
    ) -> Result<SampleSet> {
        let xs = sampling::sample_grid(start, end, step, &self.config)?;
        debug!(
            "sampling {:?} over [{}, {}] step {} ({} points)",
            formula,
            start,
            end,
            step,
            xs.len()
        );
        let formula = self.compile(formula)?;
        let mut ctx = self.context()?;
        sampling::sample(&formula, &mut ctx, xs)
    }

    /// Iterates `x(n+1) = formula(x(n))` from `seed` for up to `max_iters` steps.
    ///
    /// Parameter and compile errors are returned as `Err`; a fault during the
    /// iteration ends the run early and is reported in [`SequenceRun::warning`].
    pub fn evaluate_sequence(
        &self,
        formula: &str,
        seed: Real,
        max_iters: usize,
    ) -> Result<SequenceRun> {
        if max_iters == 0 {
            return Err(ExprError::InvalidRange(
                "iteration count must be at least 1".to_string(),
            ));
        }
        if max_iters > self.config.max_iterations {
            return Err(ExprError::LimitExceeded {
                limit: "iteration count",
                requested: max_iters,
                max: self.config.max_iterations,
            });
        }
        if !seed.is_finite() {
            return Err(ExprError::InvalidRange(format!(
                "seed must be finite, got {}",
                seed
            )));
        }
        debug!(
            "iterating {:?} from {} for {} steps",
            formula, seed, max_iters
        );
        let formula = self.compile(formula)?;
        let recurrence = Recurrence::new(
            &formula,
            self.context()?,
            seed,
            max_iters,
            self.config.divergence_threshold,
        );
        Ok(recurrence.run())
    }
}

/// Function mode with the default engine; see [`Engine::evaluate_function`].
pub fn evaluate_function(formula: &str, start: Real, end: Real, step: Real) -> Result<SampleSet> {
    Engine::default().evaluate_function(formula, start, end, step)
}

/// Sequence mode with the default engine; see [`Engine::evaluate_sequence`].
pub fn evaluate_sequence(formula: &str, seed: Real, max_iters: usize) -> Result<SequenceRun> {
    Engine::default().evaluate_sequence(formula, seed, max_iters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;
    use crate::error::ErrorKind;

    fn eval_scalar(expr: &str, x: Real) -> Result<Real> {
        let mut ctx = Engine::default().context()?;
        ctx.bind(Value::Scalar(x));
        match interp(expr, &ctx)? {
            Value::Scalar(v) => Ok(v),
            other => panic!("expected a scalar, got {:?}", other),
        }
    }

    #[test]
    fn test_operator_precedence() {
        assert_approx_eq!(eval_scalar("2 + 3 * 4", 0.0).unwrap(), 14.0);
        assert_approx_eq!(eval_scalar("(2 + 3) * 4", 0.0).unwrap(), 20.0);
        assert_approx_eq!(eval_scalar("10 - 4 - 3", 0.0).unwrap(), 3.0);
        assert_approx_eq!(eval_scalar("24 / 4 / 2", 0.0).unwrap(), 3.0);
        assert_approx_eq!(eval_scalar("7 % 4 * 2", 0.0).unwrap(), 6.0);
    }

    #[test]
    fn test_power_is_right_associative_and_binds_tighter_than_unary() {
        assert_approx_eq!(eval_scalar("2**3**2", 0.0).unwrap(), 512.0);
        assert_approx_eq!(eval_scalar("2^3^2", 0.0).unwrap(), 512.0);
        assert_approx_eq!(eval_scalar("-2**2", 0.0).unwrap(), -4.0);
        assert_approx_eq!(eval_scalar("(-2)**2", 0.0).unwrap(), 4.0);
        assert_approx_eq!(eval_scalar("2**-1", 0.0).unwrap(), 0.5);
        assert_approx_eq!(eval_scalar("2 * x**2", 3.0).unwrap(), 18.0);
        assert_approx_eq!(eval_scalar("--x", 3.0).unwrap(), 3.0);
        assert_approx_eq!(eval_scalar("+x", 3.0).unwrap(), 3.0);
    }

    #[test]
    fn test_functions_and_constants() {
        assert_approx_eq!(eval_scalar("sin(pi/6) + cos(pi/3)", 0.0).unwrap(), 1.0);
        assert_approx_eq!(eval_scalar("sqrt(abs(x))", -16.0).unwrap(), 4.0);
        assert_approx_eq!(eval_scalar("log(exp(x))", 2.5).unwrap(), 2.5);
        assert_approx_eq!(eval_scalar("tan(0)", 0.0).unwrap(), 0.0);
    }

    #[test]
    fn test_parse_produces_expected_tree() {
        let ast = parse_expression("sin(x) + 1").unwrap();
        match ast {
            AstExpr::Binary {
                op: BinaryOperator::Add,
                left,
                right,
            } => {
                assert_eq!(
                    *left,
                    AstExpr::Function {
                        name: "sin".to_string(),
                        arg: Box::new(AstExpr::Variable("x".to_string())),
                    }
                );
                assert_eq!(*right, AstExpr::Constant(1.0));
            }
            other => panic!("Expected an addition, got {:?}", other),
        }
    }

    #[test]
    fn test_syntax_errors() {
        for expr in [
            "x +", "* x", "2 + * 3", "(x", "x)", "()", "sin()", "x x", "2x", "[x]", "x,1",
            "1 $ 2", "1..2", "x == 1", "x; x", "   ",
        ] {
            let err = parse_expression(expr).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::ParseError, "{:?} gave {:?}", expr, err);
        }
    }

    #[test]
    fn test_unmatched_parenthesis_reports_opening_position() {
        assert_eq!(
            parse_expression("1 + (x * 2").unwrap_err(),
            ExprError::UnmatchedParenthesis {
                position: 4,
                found: "(".to_string()
            }
        );
    }

    #[test]
    fn test_wrong_roles_and_arity() {
        assert!(matches!(
            parse_expression("sin + 1").unwrap_err(),
            ExprError::InvalidFunctionCall { expected: 1, found: 0, .. }
        ));
        assert!(matches!(
            parse_expression("pi(2)").unwrap_err(),
            ExprError::InvalidFunctionCall { expected: 0, found: 1, .. }
        ));
        assert!(matches!(
            parse_expression("x(2)").unwrap_err(),
            ExprError::InvalidFunctionCall { .. }
        ));
        assert!(matches!(
            parse_expression("sqrt(x, 2)").unwrap_err(),
            ExprError::InvalidFunctionCall { expected: 1, found: 2, .. }
        ));
    }

    #[test]
    fn test_unknown_symbols_are_reported_before_syntax() {
        match parse_expression("import os; x").unwrap_err() {
            ExprError::UnknownSymbol { name, position } => {
                assert_eq!(name, "import");
                assert_eq!(position, 0);
            }
            other => panic!("Expected UnknownSymbol, got {:?}", other),
        }
        match parse_expression("x + __builtins__").unwrap_err() {
            ExprError::UnknownSymbol { name, position } => {
                assert_eq!(name, "__builtins__");
                assert_eq!(position, 4);
            }
            other => panic!("Expected UnknownSymbol, got {:?}", other),
        }
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}x{}", "(".repeat(300), ")".repeat(300));
        assert!(matches!(
            parse_expression(&deep).unwrap_err(),
            ExprError::RecursionLimit(_)
        ));
        let shallow = format!("{}x{}", "(".repeat(50), ")".repeat(50));
        assert!(parse_expression(&shallow).is_ok());
    }

    #[test]
    fn test_operation_limit() {
        let long_sum = vec!["x"; 3000].join("+");
        assert!(matches!(
            parse_expression(&long_sum).unwrap_err(),
            ExprError::RecursionLimit(_)
        ));
        let too_long = "1".repeat(MAX_EXPRESSION_LENGTH + 1);
        assert_eq!(parse_expression(&too_long).unwrap_err().kind(), ErrorKind::ParseError);
    }

    #[test]
    fn test_formula_keeps_its_source() {
        let engine = Engine::default();
        let formula = engine.compile("sqrt(x) + 1").unwrap();
        assert_eq!(formula.source(), "sqrt(x) + 1");
        let mut ctx = engine.context().unwrap();
        ctx.bind(Value::Scalar(9.0));
        assert_eq!(formula.eval(&ctx).unwrap(), Value::Scalar(4.0));
    }

    #[test]
    fn test_engine_rejects_variable_shadowing_a_symbol() {
        let config = EngineConfig {
            variable: "pi".to_string(),
            ..Default::default()
        };
        assert!(Engine::new(config).is_err());
    }

    #[test]
    fn test_custom_variable_and_symbols() {
        let mut symbols = SymbolTable::standard();
        symbols.register_constant("k", 0.5).unwrap();
        let config = EngineConfig {
            variable: "t".to_string(),
            ..Default::default()
        };
        let engine = Engine::with_symbols(config, symbols).unwrap();
        let samples = engine.evaluate_function("k * t", 0.0, 2.0, 1.0).unwrap();
        assert_eq!(samples.y(), &[0.0, 0.5, 1.0]);
        let err = engine.evaluate_function("x", 0.0, 2.0, 1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownSymbolError);
    }
}
