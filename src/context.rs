use std::fmt;
use std::rc::Rc;

use heapless::FnvIndexMap;

use crate::Real;
use crate::error::{ExprError, NumericFault, Result};
use crate::functions::{self, CheckedFn};
use crate::types::{HString, TryIntoHeaplessString};
use crate::value::Value;

/// Maximum number of symbols a table can hold (must be a power of two).
pub const MAX_SYMBOLS: usize = 16;

/// A one-argument function callable from formulas.
#[derive(Clone)]
pub struct NativeFunction {
    /// The name of the function as it is used in formulas.
    pub name: HString,
    /// The checked implementation.
    pub implementation: Rc<dyn Fn(Real) -> core::result::Result<Real, NumericFault>>,
}

impl fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeFunction")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// An allow-listed name and what it stands for.
#[derive(Clone, Debug)]
pub enum Symbol {
    Constant(Real),
    Function(NativeFunction),
}

/// The allow-list of names a formula may reference besides the free variable.
///
/// This table is the only thing formulas can reach. [`SymbolTable::standard`]
/// exposes `sin`, `cos`, `tan`, `exp`, `log`, `sqrt`, `abs` and `pi`; an
/// embedding program may register more.
///
/// # Examples
///
/// ```
/// use exp_plot::context::SymbolTable;
///
/// let mut table = SymbolTable::standard();
/// assert!(table.contains("sqrt"));
/// assert!(!table.contains("open"));
///
/// table.register_constant("tau", 2.0 * std::f64::consts::PI).unwrap();
/// table.register_function("cube", |a| a * a * a).unwrap();
/// assert!(table.contains("tau"));
/// ```
#[derive(Clone, Debug)]
pub struct SymbolTable {
    symbols: FnvIndexMap<HString, Symbol, MAX_SYMBOLS>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl SymbolTable {
    /// A table with no symbols at all.
    pub fn empty() -> Self {
        Self {
            symbols: FnvIndexMap::new(),
        }
    }

    /// The standard allow-list.
    pub fn standard() -> Self {
        let mut table = Self::empty();
        for (name, value) in functions::BUILTIN_CONSTANTS {
            table
                .insert(name, Symbol::Constant(value))
                .expect("built-in constants fit in the table");
        }
        for (name, f) in functions::BUILTIN_FUNCTIONS {
            table
                .register_checked(name, f)
                .expect("built-in functions fit in the table");
        }
        table
    }

    fn insert(&mut self, name: &str, symbol: Symbol) -> Result<()> {
        if !is_identifier(name) {
            return Err(ExprError::Syntax(format!(
                "'{}' is not a valid symbol name",
                name
            )));
        }
        let key = name.try_into_heapless()?;
        self.symbols
            .insert(key, symbol)
            .map_err(|_| ExprError::CapacityExceeded("symbol table"))?;
        Ok(())
    }

    /// Adds (or replaces) a named constant.
    pub fn register_constant(&mut self, name: &str, value: Real) -> Result<()> {
        self.insert(name, Symbol::Constant(value))
    }

    /// Adds (or replaces) a one-argument function.
    ///
    /// Results are checked the same way built-ins are: NaN from a non-NaN
    /// argument is a domain error, infinity from a finite one an overflow.
    pub fn register_function<F>(&mut self, name: &str, f: F) -> Result<()>
    where
        F: Fn(Real) -> Real + 'static,
    {
        let label = name.to_string();
        let implementation = move |a: Real| functions::check_unary(&label, a, f(a));
        self.insert(
            name,
            Symbol::Function(NativeFunction {
                name: name.try_into_heapless()?,
                implementation: Rc::new(implementation),
            }),
        )
    }

    fn register_checked(&mut self, name: &str, f: CheckedFn) -> Result<()> {
        self.insert(
            name,
            Symbol::Function(NativeFunction {
                name: name.try_into_heapless()?,
                implementation: Rc::new(f),
            }),
        )
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        let key = name.try_into_heapless().ok()?;
        self.symbols.get(&key)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn is_function(&self, name: &str) -> bool {
        matches!(self.get(name), Some(Symbol::Function(_)))
    }

    /// Symbol names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.symbols.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Returns true for `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Evaluation context: the allow-list plus the binding of the free variable.
///
/// In function mode the variable is bound once to the whole sampling domain;
/// in sequence mode it is rebound to each iterate with [`EvalContext::bind`].
///
/// # Examples
///
/// ```
/// use exp_plot::context::{EvalContext, SymbolTable};
/// use exp_plot::engine::interp;
/// use exp_plot::Value;
/// use std::rc::Rc;
///
/// let mut ctx = EvalContext::new(Rc::new(SymbolTable::standard()), "x").unwrap();
/// ctx.bind(Value::Array(vec![1.0, 4.0, 9.0]));
/// assert_eq!(interp("sqrt(x)", &ctx).unwrap(), Value::Array(vec![1.0, 2.0, 3.0]));
///
/// ctx.bind(Value::Scalar(16.0));
/// assert_eq!(interp("sqrt(x)", &ctx).unwrap(), Value::Scalar(4.0));
/// ```
#[derive(Clone, Debug)]
pub struct EvalContext {
    symbols: Rc<SymbolTable>,
    variable: HString,
    binding: Option<Value>,
}

impl EvalContext {
    /// Creates a context with the free variable left unbound.
    ///
    /// Fails if the variable name is not an identifier or shadows a symbol.
    pub fn new(symbols: Rc<SymbolTable>, variable: &str) -> Result<Self> {
        if !is_identifier(variable) {
            return Err(ExprError::Syntax(format!(
                "'{}' is not a valid variable name",
                variable
            )));
        }
        if symbols.contains(variable) {
            return Err(ExprError::Syntax(format!(
                "variable '{}' shadows an allow-listed symbol",
                variable
            )));
        }
        Ok(Self {
            symbols,
            variable: variable.try_into_heapless()?,
            binding: None,
        })
    }

    /// Binds the free variable, replacing any previous binding.
    pub fn bind(&mut self, value: Value) {
        self.binding = Some(value);
    }

    pub fn binding(&self) -> Option<&Value> {
        self.binding.as_ref()
    }

    pub fn variable(&self) -> &str {
        self.variable.as_str()
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }
}
