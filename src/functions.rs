//! Built-in mathematical functions and operator kernels.
//!
//! Every kernel here is checked: instead of letting NaN or infinity leak into
//! a plot, a fault is reported as a [`NumericFault`]. The rules are
//!
//! - a zero divisor (`/`, `%`, or `0 ** negative`) is [`NumericFault::DivisionByZero`];
//! - an argument outside a function's domain, or any NaN produced from
//!   non-NaN operands, is [`NumericFault::Domain`];
//! - an infinite result produced from finite operands is [`NumericFault::Overflow`].
//!
//! All functions use the `libm` crate so results do not depend on the
//! platform's C math library.

use crate::Real;
use crate::error::NumericFault;

/// Signature of a checked one-argument function.
pub type CheckedFn = fn(Real) -> Result<Real, NumericFault>;

/// Validates the result of a one-argument function.
pub fn check_unary(name: &str, arg: Real, out: Real) -> Result<Real, NumericFault> {
    if out.is_nan() && !arg.is_nan() {
        return Err(NumericFault::Domain {
            function: name.to_string(),
            argument: arg,
        });
    }
    if out.is_infinite() && arg.is_finite() {
        return Err(NumericFault::Overflow {
            operation: name.to_string(),
        });
    }
    Ok(out)
}

/// Validates the result of a binary operator.
pub fn check_binary(op: &str, a: Real, b: Real, out: Real) -> Result<Real, NumericFault> {
    if out.is_nan() && !a.is_nan() && !b.is_nan() {
        return Err(NumericFault::Domain {
            function: op.to_string(),
            argument: a,
        });
    }
    if out.is_infinite() && a.is_finite() && b.is_finite() {
        return Err(NumericFault::Overflow {
            operation: op.to_string(),
        });
    }
    Ok(out)
}

pub fn add(a: Real, b: Real) -> Result<Real, NumericFault> {
    check_binary("+", a, b, a + b)
}

pub fn sub(a: Real, b: Real) -> Result<Real, NumericFault> {
    check_binary("-", a, b, a - b)
}

pub fn mul(a: Real, b: Real) -> Result<Real, NumericFault> {
    check_binary("*", a, b, a * b)
}

/// Divides the first value by the second, failing on a zero divisor.
pub fn div(a: Real, b: Real) -> Result<Real, NumericFault> {
    if b == 0.0 {
        return Err(NumericFault::DivisionByZero);
    }
    check_binary("/", a, b, a / b)
}

/// Floored remainder: the result takes the sign of the divisor.
///
/// `-7 % 3 == 2` and `7 % -3 == -2`.
pub fn rem(a: Real, b: Real) -> Result<Real, NumericFault> {
    if b == 0.0 {
        return Err(NumericFault::DivisionByZero);
    }
    let mut r = libm::fmod(a, b);
    if r != 0.0 && (r < 0.0) != (b < 0.0) {
        r += b;
    }
    check_binary("%", a, b, r)
}

/// Raises `a` to the power `b`.
///
/// A zero base with a negative exponent is a division by zero; a negative
/// base with a non-integer exponent is a domain error.
pub fn pow(a: Real, b: Real) -> Result<Real, NumericFault> {
    if a == 0.0 && b < 0.0 {
        return Err(NumericFault::DivisionByZero);
    }
    check_binary("**", a, b, libm::pow(a, b))
}

pub fn neg(a: Real) -> Real {
    -a
}

pub fn sin(a: Real) -> Result<Real, NumericFault> {
    check_unary("sin", a, libm::sin(a))
}

pub fn cos(a: Real) -> Result<Real, NumericFault> {
    check_unary("cos", a, libm::cos(a))
}

pub fn tan(a: Real) -> Result<Real, NumericFault> {
    check_unary("tan", a, libm::tan(a))
}

pub fn exp(a: Real) -> Result<Real, NumericFault> {
    check_unary("exp", a, libm::exp(a))
}

/// Natural logarithm, defined for strictly positive arguments.
pub fn log(a: Real) -> Result<Real, NumericFault> {
    if a <= 0.0 {
        return Err(NumericFault::Domain {
            function: "log".to_string(),
            argument: a,
        });
    }
    check_unary("log", a, libm::log(a))
}

/// Square root, defined for non-negative arguments.
pub fn sqrt(a: Real) -> Result<Real, NumericFault> {
    if a < 0.0 {
        return Err(NumericFault::Domain {
            function: "sqrt".to_string(),
            argument: a,
        });
    }
    check_unary("sqrt", a, libm::sqrt(a))
}

pub fn abs(a: Real) -> Result<Real, NumericFault> {
    Ok(libm::fabs(a))
}

/// The built-in functions, by the name formulas use.
pub const BUILTIN_FUNCTIONS: [(&str, CheckedFn); 7] = [
    ("sin", sin),
    ("cos", cos),
    ("tan", tan),
    ("exp", exp),
    ("log", log),
    ("sqrt", sqrt),
    ("abs", abs),
];

/// The built-in constants, by the name formulas use.
pub const BUILTIN_CONSTANTS: [(&str, Real); 1] = [("pi", crate::constants::PI)];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;

    #[test]
    fn test_division_by_zero_is_a_fault() {
        assert_eq!(div(1.0, 0.0), Err(NumericFault::DivisionByZero));
        assert_eq!(div(0.0, -0.0), Err(NumericFault::DivisionByZero));
        assert_eq!(rem(5.0, 0.0), Err(NumericFault::DivisionByZero));
        assert_eq!(pow(0.0, -1.0), Err(NumericFault::DivisionByZero));
        assert_approx_eq!(div(1.0, 4.0).unwrap(), 0.25);
    }

    #[test]
    fn test_floored_remainder() {
        assert_approx_eq!(rem(7.0, 3.0).unwrap(), 1.0);
        assert_approx_eq!(rem(-7.0, 3.0).unwrap(), 2.0);
        assert_approx_eq!(rem(7.0, -3.0).unwrap(), -2.0);
        assert_approx_eq!(rem(6.0, 3.0).unwrap(), 0.0);
    }

    #[test]
    fn test_domain_errors() {
        assert!(matches!(log(-1.0), Err(NumericFault::Domain { .. })));
        assert!(matches!(log(0.0), Err(NumericFault::Domain { .. })));
        assert!(matches!(sqrt(-4.0), Err(NumericFault::Domain { .. })));
        assert!(matches!(pow(-8.0, 1.0 / 3.0), Err(NumericFault::Domain { .. })));
        assert!(matches!(sin(Real::INFINITY), Err(NumericFault::Domain { .. })));
        assert_approx_eq!(pow(-2.0, 3.0).unwrap(), -8.0);
        assert_approx_eq!(sqrt(0.0).unwrap(), 0.0);
    }

    #[test]
    fn test_overflow() {
        assert_eq!(
            exp(1000.0),
            Err(NumericFault::Overflow {
                operation: "exp".to_string()
            })
        );
        assert!(matches!(mul(1e200, 1e200), Err(NumericFault::Overflow { .. })));
        assert!(matches!(pow(10.0, 400.0), Err(NumericFault::Overflow { .. })));
        assert!(matches!(div(1e300, 1e-300), Err(NumericFault::Overflow { .. })));
    }

    #[test]
    fn test_builtin_values() {
        assert_approx_eq!(sin(crate::constants::PI / 2.0).unwrap(), 1.0);
        assert_approx_eq!(cos(0.0).unwrap(), 1.0);
        assert_approx_eq!(tan(crate::constants::PI / 4.0).unwrap(), 1.0);
        assert_approx_eq!(exp(0.0).unwrap(), 1.0);
        assert_approx_eq!(log(core::f64::consts::E).unwrap(), 1.0);
        assert_approx_eq!(abs(-3.5).unwrap(), 3.5);
        assert_approx_eq!(neg(2.0), -2.0);
    }
}
