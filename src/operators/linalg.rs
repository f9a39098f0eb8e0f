//! Matrix functions backed by `nalgebra`.

use nalgebra::DMatrix;

use crate::errors::EvalError;
use crate::value::Value;

pub fn transpose(a: &Value) -> Result<Value, EvalError> {
    Ok(Value::Matrix(a.expect_matrix("transpose")?.transpose()))
}

pub fn det(a: &Value) -> Result<Value, EvalError> {
    let m = a.expect_matrix("det")?;
    if !m.is_square() {
        return Err(EvalError::DimensionMismatch(
            "Not a square matrix".to_string(),
        ));
    }
    Ok(Value::real(m.determinant()))
}

fn column(value: &Value, op: &str, rows: Option<usize>) -> Result<DMatrix<f64>, EvalError> {
    let m = value.expect_matrix(op)?;
    let ok = m.ncols() == 1 && rows.map_or(true, |n| m.nrows() == n);
    if !ok {
        let shape = rows.map_or_else(|| "nx1".to_string(), |n| format!("{n}x1"));
        return Err(EvalError::DimensionMismatch(format!("Not a {shape} matrix")));
    }
    Ok(m.clone())
}

pub fn dot(a: &Value, b: &Value) -> Result<Value, EvalError> {
    let u = column(a, "dot", None)?;
    let v = column(b, "dot", Some(u.nrows()))?;
    Ok(Value::real(u.dot(&v)))
}

pub fn cross(a: &Value, b: &Value) -> Result<Value, EvalError> {
    let u = column(a, "cross", Some(3))?;
    let v = column(b, "cross", Some(3))?;
    Ok(Value::Matrix(u.cross(&v)))
}

/// Solves `A x = b` using a QR decomposition.
pub fn solve(a: &Value, b: &Value) -> Result<Value, EvalError> {
    let a = a.expect_matrix("solveSOLE")?;
    if !a.is_square() {
        return Err(EvalError::DimensionMismatch(
            "Not a square matrix".to_string(),
        ));
    }
    let b = column(b, "solveSOLE", Some(a.nrows()))?;
    let qr = a.clone().qr();

    // Householder QR leaves rounding noise on the diagonal of R for rank-deficient systems
    let diagonal = qr.r().diagonal();
    let largest = diagonal.amax();
    let tolerance = largest * f64::EPSILON * 16.0 * a.nrows() as f64;
    if largest == 0.0 || diagonal.iter().any(|d| d.abs() <= tolerance) {
        return Err(EvalError::SingularSystem);
    }

    qr.solve(&b)
        .map(Value::Matrix)
        .ok_or(EvalError::SingularSystem)
}
