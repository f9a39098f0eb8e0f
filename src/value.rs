//! Runtime values produced by evaluation.
//!
//! Every evaluation yields either a complex scalar or a dense real matrix. Real numbers are
//! complex numbers with a zero imaginary part. Operations declare which kinds they accept
//! through the `expect_*` helpers below; a matrix passed to a scalar-only operation, or a
//! complex number with a nonzero imaginary part passed to a real-only one, is an error.

use std::fmt;

use itertools::Itertools;
use nalgebra::DMatrix;
use num_complex::Complex64;

use crate::errors::EvalError;

/// Result of evaluating an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Complex(Complex64),
    Matrix(DMatrix<f64>),
}

impl Value {
    pub fn real(value: f64) -> Self {
        Value::Complex(Complex64::new(value, 0.0))
    }

    pub fn complex(re: f64, im: f64) -> Self {
        Value::Complex(Complex64::new(re, im))
    }

    pub fn is_matrix(&self) -> bool {
        matches!(self, Value::Matrix(_))
    }

    /// Returns the scalar value, or `None` for matrices.
    pub fn as_complex(&self) -> Option<Complex64> {
        match self {
            Value::Complex(z) => Some(*z),
            Value::Matrix(_) => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&DMatrix<f64>> {
        match self {
            Value::Matrix(m) => Some(m),
            Value::Complex(_) => None,
        }
    }

    /// Real part of a scalar, `NaN` for matrices.
    ///
    /// Used by the numeric routines, which only look at real parts.
    pub fn re(&self) -> f64 {
        match self {
            Value::Complex(z) => z.re,
            Value::Matrix(_) => f64::NAN,
        }
    }

    /// Returns `true` for scalars with a zero imaginary part.
    pub fn is_real(&self) -> bool {
        matches!(self, Value::Complex(z) if z.im == 0.0)
    }

    /// Scalar operand of `op`; matrices are rejected.
    pub(crate) fn expect_scalar(&self, op: &str) -> Result<Complex64, EvalError> {
        match self {
            Value::Complex(z) => Ok(*z),
            Value::Matrix(_) => Err(EvalError::TypeMismatch(format!(
                "Matrices are not supported with {op}"
            ))),
        }
    }

    /// Purely real operand of `op`; matrices and complex numbers are rejected.
    pub(crate) fn expect_real(&self, op: &str) -> Result<f64, EvalError> {
        let z = self.expect_scalar(op)?;
        if z.im != 0.0 {
            return Err(EvalError::TypeMismatch(format!(
                "Complex numbers are not supported with {op}"
            )));
        }
        Ok(z.re)
    }

    /// Matrix operand of `op`; scalars are rejected.
    pub(crate) fn expect_matrix(&self, op: &str) -> Result<&DMatrix<f64>, EvalError> {
        match self {
            Value::Matrix(m) => Ok(m),
            Value::Complex(_) => Err(EvalError::TypeMismatch(format!(
                "Argument to {op} is not a matrix"
            ))),
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::real(value)
    }
}

impl From<Complex64> for Value {
    fn from(value: Complex64) -> Self {
        Value::Complex(value)
    }
}

impl From<DMatrix<f64>> for Value {
    fn from(value: DMatrix<f64>) -> Self {
        Value::Matrix(value)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Complex(z) if z.im == 0.0 => write!(f, "{}", z.re),
            Value::Complex(z) if z.re == 0.0 => write!(f, "{}i", z.im),
            Value::Complex(z) => {
                let sign = if z.im < 0.0 { '-' } else { '+' };
                write!(f, "{} {} {}i", z.re, sign, z.im.abs())
            }
            Value::Matrix(m) => {
                let rows = m
                    .row_iter()
                    .map(|row| row.iter().map(|x| x.to_string()).join(", "))
                    .join("; ");
                write!(f, "[{rows}]")
            }
        }
    }
}
