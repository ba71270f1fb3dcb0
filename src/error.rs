//! Error types and handling for the exp-plot crate.
//!
//! Every failure the crate can report is an [`ExprError`]. Callers that only
//! care about the broad category (what to show the user, whether a partial
//! result exists) use [`ExprError::kind`], which folds the detailed variants
//! into the four [`ErrorKind`]s exposed across the crate boundary.

use std::fmt;
use std::num::ParseFloatError;

use serde::{Deserialize, Serialize};

use crate::Real;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, ExprError>;

/// The category of an error as seen by the presentation layer.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed expression syntax. Fatal to the run, no partial output.
    ParseError,
    /// An identifier outside the allow-list and the free variable.
    UnknownSymbolError,
    /// A runtime numeric fault (domain error, division by zero, overflow).
    EvaluationError,
    /// Invalid mode parameters, checked before any evaluation.
    InvalidRangeError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::ParseError => "ParseError",
            ErrorKind::UnknownSymbolError => "UnknownSymbolError",
            ErrorKind::EvaluationError => "EvaluationError",
            ErrorKind::InvalidRangeError => "InvalidRangeError",
        };
        f.write_str(name)
    }
}

/// The underlying cause of an [`ExprError::Evaluation`].
#[derive(Debug, Clone, PartialEq)]
pub enum NumericFault {
    /// Division (or remainder) by zero, including `0 ** negative`.
    DivisionByZero,
    /// A function or operator applied outside its domain.
    Domain {
        /// Name of the function or operator symbol
        function: String,
        /// The offending argument
        argument: Real,
    },
    /// A finite computation produced an infinite result.
    Overflow {
        /// Name of the function or operator symbol
        operation: String,
    },
}

impl fmt::Display for NumericFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumericFault::DivisionByZero => write!(f, "division by zero"),
            NumericFault::Domain { function, argument } => {
                write!(f, "math domain error: {}({})", function, argument)
            }
            NumericFault::Overflow { operation } => {
                write!(f, "numeric overflow in '{}'", operation)
            }
        }
    }
}

/// Error type for expression parsing, evaluation and sampling.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprError {
    /// Error when parsing a floating point literal.
    Parse(ParseFloatError),

    /// Error during lexical analysis, such as an unknown character.
    Tokenizer(String),

    /// Error during syntax analysis.
    ///
    /// This occurs when the parser encounters unexpected tokens or an
    /// incorrect expression structure. The string contains a detailed message.
    Syntax(String),

    /// A parenthesis without its matching pair.
    UnmatchedParenthesis { position: usize, found: String },

    /// The expression nests deeper than the parser allows.
    RecursionLimit(String),

    /// An identifier that is neither the free variable nor an allow-listed symbol.
    ///
    /// This is the sandbox boundary: formulas can only name what the
    /// [`SymbolTable`](crate::context::SymbolTable) exposes.
    UnknownSymbol { name: String, position: usize },

    /// A function applied with the wrong number of arguments, or a symbol
    /// used in the wrong role (a function used as a value, a constant called).
    InvalidFunctionCall {
        /// Name of the symbol
        name: String,
        /// Expected number of arguments
        expected: usize,
        /// Actual number of arguments provided
        found: usize,
    },

    /// A runtime numeric fault.
    Evaluation(NumericFault),

    /// Invalid sampling or iteration parameters.
    InvalidRange(String),

    /// A request above one of the configured resource ceilings.
    LimitExceeded {
        /// Which ceiling was hit
        limit: &'static str,
        /// What the request needed
        requested: usize,
        /// The configured maximum
        max: usize,
    },

    /// Error when capacity is exceeded for a heapless container.
    CapacityExceeded(&'static str),

    /// Error when a symbol name is too long for the heapless string buffer.
    StringTooLong,
}

impl ExprError {
    /// The boundary category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExprError::Parse(_)
            | ExprError::Tokenizer(_)
            | ExprError::Syntax(_)
            | ExprError::UnmatchedParenthesis { .. }
            | ExprError::RecursionLimit(_)
            | ExprError::InvalidFunctionCall { .. }
            | ExprError::CapacityExceeded(_)
            | ExprError::StringTooLong => ErrorKind::ParseError,
            ExprError::UnknownSymbol { .. } => ErrorKind::UnknownSymbolError,
            ExprError::Evaluation(_) => ErrorKind::EvaluationError,
            ExprError::InvalidRange(_) | ExprError::LimitExceeded { .. } => {
                ErrorKind::InvalidRangeError
            }
        }
    }
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprError::Parse(err) => write!(f, "Parse error: {}", err),
            ExprError::Tokenizer(err) => write!(f, "Tokenizer error: {}", err),
            ExprError::Syntax(err) => write!(f, "Syntax error: {}", err),
            ExprError::UnmatchedParenthesis { position, found } => {
                write!(
                    f,
                    "Unmatched parenthesis at position {}: found '{}'",
                    position, found
                )
            }
            ExprError::RecursionLimit(err) => write!(f, "Recursion limit exceeded: {}", err),
            ExprError::UnknownSymbol { name, position } => {
                write!(f, "Unknown symbol '{}' at position {}", name, position)
            }
            ExprError::InvalidFunctionCall {
                name,
                expected,
                found,
            } => {
                write!(
                    f,
                    "Invalid use of '{}': expected {} arguments, found {}",
                    name, expected, found
                )
            }
            ExprError::Evaluation(fault) => write!(f, "Evaluation error: {}", fault),
            ExprError::InvalidRange(msg) => write!(f, "Invalid range: {}", msg),
            ExprError::LimitExceeded {
                limit,
                requested,
                max,
            } => {
                write!(
                    f,
                    "Invalid range: {} {} exceeds the configured maximum of {}",
                    limit, requested, max
                )
            }
            ExprError::CapacityExceeded(container_type) => {
                write!(f, "Capacity exceeded for {}", container_type)
            }
            ExprError::StringTooLong => write!(f, "Symbol name too long"),
        }
    }
}

impl std::error::Error for ExprError {}

impl From<ParseFloatError> for ExprError {
    fn from(err: ParseFloatError) -> ExprError {
        ExprError::Parse(err)
    }
}

impl From<NumericFault> for ExprError {
    fn from(fault: NumericFault) -> ExprError {
        ExprError::Evaluation(fault)
    }
}
