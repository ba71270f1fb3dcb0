//! Type definitions for the expression parser and evaluator.
//!
//! This module contains the Abstract Syntax Tree (AST) representation, token
//! kinds, operator enums and the heapless string type used for symbol names.

use core::fmt;

use crate::Real;
use crate::error::ExprError;

/// Maximum length of a symbol name stored in the symbol table.
pub const MAX_SYMBOL_NAME_LEN: usize = 32;

/// Heapless string used for symbol names.
pub type HString = heapless::String<MAX_SYMBOL_NAME_LEN>;

/// Conversion of string slices into bounded symbol names.
pub trait TryIntoHeaplessString {
    fn try_into_heapless(self) -> Result<HString, ExprError>;
}

impl TryIntoHeaplessString for &str {
    fn try_into_heapless(self) -> Result<HString, ExprError> {
        let mut name = HString::new();
        name.push_str(self).map_err(|_| ExprError::StringTooLong)?;
        Ok(name)
    }
}

/// Abstract Syntax Tree (AST) node representing an expression.
#[derive(Clone, Debug, PartialEq)]
pub enum AstExpr {
    /// A literal numerical value.
    ///
    /// Examples: `3.14`, `42`, `.5`
    Constant(Real),

    /// A named value: the free variable or an allow-listed constant.
    ///
    /// Examples: `x`, `pi`
    Variable(String),

    /// A one-argument call of an allow-listed function.
    ///
    /// Examples: `sin(x)`, `sqrt(x*x + 1)`
    Function {
        /// The name of the function being called
        name: String,
        /// The argument expression
        arg: Box<AstExpr>,
    },

    /// A prefix operation.
    Unary {
        op: UnaryOperator,
        operand: Box<AstExpr>,
    },

    /// An infix operation.
    Binary {
        op: BinaryOperator,
        left: Box<AstExpr>,
        right: Box<AstExpr>,
    },
}

/// Prefix operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOperator {
    /// `-a`
    Neg,
    /// `+a`, a no-op kept so the AST mirrors the source
    Plus,
}

/// Infix arithmetic operators.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    /// Floored remainder, matching the sign of the divisor.
    Rem,
    /// Both `^` and `**`.
    Pow,
}

impl BinaryOperator {
    /// Maps operator text to the operator, if it is one the grammar knows.
    pub fn from_symbol(text: &str) -> Option<Self> {
        match text {
            "+" => Some(BinaryOperator::Add),
            "-" => Some(BinaryOperator::Sub),
            "*" => Some(BinaryOperator::Mul),
            "/" => Some(BinaryOperator::Div),
            "%" => Some(BinaryOperator::Rem),
            "^" | "**" => Some(BinaryOperator::Pow),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Add => "+",
            BinaryOperator::Sub => "-",
            BinaryOperator::Mul => "*",
            BinaryOperator::Div => "/",
            BinaryOperator::Rem => "%",
            BinaryOperator::Pow => "**",
        }
    }
}

impl fmt::Display for BinaryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Classifies the kind of token produced during lexical analysis.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TokenKind {
    /// A numerical literal.
    Number,

    /// An identifier (variable, constant or function name).
    Variable,

    /// An operator such as +, -, *, /, ^, **.
    Operator,

    /// An opening delimiter like '(' or '['.
    Open,

    /// A closing delimiter like ')' or ']'.
    Close,

    /// A separator between items, a comma or a semicolon.
    Separator,

    /// An error token representing invalid input.
    Error,
}
