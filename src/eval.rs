//! AST interpreter.
//!
//! Walks a parsed [`AstExpr`] against an [`EvalContext`]. Names resolve to
//! the free variable's binding or to the context's symbol table and nothing
//! else; there is no other lookup path.

use crate::Real;
use crate::context::{EvalContext, Symbol};
use crate::error::{ExprError, NumericFault, Result};
use crate::functions;
use crate::types::{AstExpr, BinaryOperator, UnaryOperator};
use crate::value::Value;

type BinaryKernel = fn(Real, Real) -> core::result::Result<Real, NumericFault>;

/// Evaluates an AST node to a [`Value`].
///
/// The result is a scalar unless the free variable is bound to an array and
/// the expression depends on it.
pub fn eval_ast(ast: &AstExpr, ctx: &EvalContext) -> Result<Value> {
    match ast {
        AstExpr::Constant(val) => Ok(Value::Scalar(*val)),
        AstExpr::Variable(name) => eval_variable(name, ctx),
        AstExpr::Function { name, arg } => {
            let function = match ctx.symbols().get(name) {
                Some(Symbol::Function(function)) => function,
                Some(Symbol::Constant(_)) => {
                    return Err(ExprError::InvalidFunctionCall {
                        name: name.clone(),
                        expected: 0,
                        found: 1,
                    });
                }
                None if name == ctx.variable() => {
                    return Err(ExprError::InvalidFunctionCall {
                        name: name.clone(),
                        expected: 0,
                        found: 1,
                    });
                }
                None => {
                    return Err(ExprError::UnknownSymbol {
                        name: name.clone(),
                        position: 0,
                    });
                }
            };
            let arg = eval_ast(arg, ctx)?;
            Ok(arg.map(|a| (function.implementation)(a))?)
        }
        AstExpr::Unary { op, operand } => {
            let operand = eval_ast(operand, ctx)?;
            match op {
                UnaryOperator::Plus => Ok(operand),
                UnaryOperator::Neg => Ok(operand.map(|a| Ok(functions::neg(a)))?),
            }
        }
        AstExpr::Binary { op, left, right } => {
            let left = eval_ast(left, ctx)?;
            let right = eval_ast(right, ctx)?;
            let kernel: BinaryKernel = match op {
                BinaryOperator::Add => functions::add,
                BinaryOperator::Sub => functions::sub,
                BinaryOperator::Mul => functions::mul,
                BinaryOperator::Div => functions::div,
                BinaryOperator::Rem => functions::rem,
                BinaryOperator::Pow => functions::pow,
            };
            left.zip_with(right, kernel)
        }
    }
}

fn eval_variable(name: &str, ctx: &EvalContext) -> Result<Value> {
    if name == ctx.variable() {
        return ctx.binding().cloned().ok_or_else(|| ExprError::UnknownSymbol {
            name: name.to_string(),
            position: 0,
        });
    }
    match ctx.symbols().get(name) {
        Some(Symbol::Constant(val)) => Ok(Value::Scalar(*val)),
        Some(Symbol::Function(_)) => Err(ExprError::InvalidFunctionCall {
            name: name.to_string(),
            expected: 1,
            found: 0,
        }),
        None => Err(ExprError::UnknownSymbol {
            name: name.to_string(),
            position: 0,
        }),
    }
}
