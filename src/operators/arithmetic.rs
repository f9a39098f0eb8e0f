//! Arithmetic on values: the binary operators, negation and integer matrix powers.
//!
//! Scalars are promoted to complex numbers; when both operands are real the plain `f64`
//! operation is used so that results such as `1/0` or `10^3` stay exact.

use nalgebra::DMatrix;
use num_complex::Complex64;

use crate::errors::EvalError;
use crate::value::Value;

fn both_real(a: Complex64, b: Complex64) -> bool {
    a.im == 0.0 && b.im == 0.0
}

fn same_shape(a: &DMatrix<f64>, b: &DMatrix<f64>) -> Result<(), EvalError> {
    if a.shape() != b.shape() {
        return Err(EvalError::DimensionMismatch(
            "LHS rows or cols != RHS rows or cols".to_string(),
        ));
    }
    Ok(())
}

pub fn add(a: &Value, b: &Value) -> Result<Value, EvalError> {
    match (a, b) {
        (Value::Complex(x), Value::Complex(y)) => Ok(Value::Complex(x + y)),
        (Value::Matrix(x), Value::Matrix(y)) => {
            same_shape(x, y)?;
            Ok(Value::Matrix(x + y))
        }
        _ => Err(EvalError::TypeMismatch(
            "Cannot add scalar and matrix".to_string(),
        )),
    }
}

pub fn subtract(a: &Value, b: &Value) -> Result<Value, EvalError> {
    match (a, b) {
        (Value::Complex(x), Value::Complex(y)) => Ok(Value::Complex(x - y)),
        (Value::Matrix(x), Value::Matrix(y)) => {
            same_shape(x, y)?;
            Ok(Value::Matrix(x - y))
        }
        _ => Err(EvalError::TypeMismatch(
            "Cannot subtract scalar and matrix".to_string(),
        )),
    }
}

fn scale(m: &DMatrix<f64>, z: Complex64) -> Result<Value, EvalError> {
    if z.im != 0.0 {
        return Err(EvalError::TypeMismatch(
            "Matrix multiplication with complex numbers is not supported".to_string(),
        ));
    }
    Ok(Value::Matrix(m * z.re))
}

pub fn multiply(a: &Value, b: &Value) -> Result<Value, EvalError> {
    match (a, b) {
        (Value::Complex(x), Value::Complex(y)) if both_real(*x, *y) => Ok(Value::real(x.re * y.re)),
        (Value::Complex(x), Value::Complex(y)) => Ok(Value::Complex(x * y)),
        (Value::Matrix(x), Value::Matrix(y)) => {
            if x.ncols() != y.nrows() {
                return Err(EvalError::DimensionMismatch(
                    "LHS cols != RHS rows".to_string(),
                ));
            }
            Ok(Value::Matrix(x * y))
        }
        (Value::Matrix(m), Value::Complex(z)) | (Value::Complex(z), Value::Matrix(m)) => {
            scale(m, *z)
        }
    }
}

pub fn divide(a: &Value, b: &Value) -> Result<Value, EvalError> {
    match (a, b) {
        (Value::Complex(x), Value::Complex(y)) if both_real(*x, *y) => Ok(Value::real(x.re / y.re)),
        (Value::Complex(x), Value::Complex(y)) => Ok(Value::Complex(x / y)),
        _ => Err(EvalError::TypeMismatch(
            "Cannot divide with matrices".to_string(),
        )),
    }
}

/// Raises a complex number to a complex power.
pub fn complex_pow(base: Complex64, exponent: Complex64) -> Complex64 {
    if both_real(base, exponent) && (base.re >= 0.0 || exponent.re.fract() == 0.0) {
        return Complex64::new(base.re.powf(exponent.re), 0.0);
    }
    if base.re == 0.0 && base.im == 0.0 {
        return if exponent.re > 0.0 {
            Complex64::new(0.0, 0.0)
        } else {
            Complex64::new(f64::INFINITY, 0.0)
        };
    }
    base.powc(exponent)
}

pub fn power(a: &Value, b: &Value) -> Result<Value, EvalError> {
    match (a, b) {
        (_, Value::Matrix(_)) => Err(EvalError::TypeMismatch(
            "cannot raise to the power of a matrix".to_string(),
        )),
        (Value::Matrix(m), Value::Complex(z)) => {
            if z.im != 0.0 {
                return Err(EvalError::TypeMismatch(
                    "cannot raise matrix to power of complex number".to_string(),
                ));
            }
            matrix_power(m, z.re).map(Value::Matrix)
        }
        (Value::Complex(x), Value::Complex(y)) => Ok(Value::Complex(complex_pow(*x, *y))),
    }
}

/// `m^n` for a square matrix and an integer `n`; negative `n` inverts first.
pub fn matrix_power(m: &DMatrix<f64>, n: f64) -> Result<DMatrix<f64>, EvalError> {
    if !m.is_square() {
        return Err(EvalError::DimensionMismatch(
            "Not a square matrix".to_string(),
        ));
    }
    if n.fract() != 0.0 {
        return Err(EvalError::Domain(
            "matrix powers must be integers".to_string(),
        ));
    }

    let mut base = if n < 0.0 {
        m.clone().try_inverse().ok_or(EvalError::SingularSystem)?
    } else {
        m.clone()
    };
    let mut exponent = n.abs() as u64;
    let mut result = DMatrix::identity(m.nrows(), m.ncols());
    while exponent > 0 {
        if exponent & 1 == 1 {
            result = &result * &base;
        }
        base = &base * &base;
        exponent >>= 1;
    }
    Ok(result)
}

pub fn negate(a: &Value) -> Value {
    match a {
        Value::Complex(z) => Value::Complex(-z),
        Value::Matrix(m) => Value::Matrix(-m),
    }
}

/// Remainder of the truncated operands, carrying the sign of the dividend.
///
/// Computed on `f64`, where the remainder of integral values is exact at any magnitude.
pub fn modulus(a: &Value, b: &Value) -> Result<Value, EvalError> {
    let x = a.expect_real("MOD")?.trunc();
    let y = b.expect_real("MOD")?.trunc();
    if !x.is_finite() || !y.is_finite() {
        return Err(EvalError::Domain("MOD requires finite operands".to_string()));
    }
    if y == 0.0 {
        return Err(EvalError::Domain("modulus by zero".to_string()));
    }
    Ok(Value::real(x % y))
}
