//! Factorials, permutations, combinations, gcd and lcm.

use crate::errors::EvalError;
use crate::value::Value;

/// Largest `n` whose factorial is finite in `f64`.
const MAX_FINITE_FACTORIAL: f64 = 170.0;

fn non_negative_integer(value: &Value, op: &str) -> Result<f64, EvalError> {
    let x = value.expect_real(op)?;
    if x < 0.0 {
        return Err(EvalError::Domain(format!(
            "{op} of a negative number does not exist"
        )));
    }
    if x.fract() != 0.0 {
        return Err(EvalError::Domain(format!("{op} requires an integer")));
    }
    Ok(x)
}

pub fn factorial(value: &Value) -> Result<Value, EvalError> {
    let n = non_negative_integer(value, "factorial")?;
    Ok(Value::real(falling_product(n, n)))
}

/// `n * (n-1) * ... * (n-k+1)`.
fn falling_product(n: f64, k: f64) -> f64 {
    if n > MAX_FINITE_FACTORIAL && k > MAX_FINITE_FACTORIAL {
        return f64::INFINITY;
    }
    let mut product = 1.0;
    let mut i = 0.0;
    while i < k {
        product *= n - i;
        if product.is_infinite() {
            break;
        }
        i += 1.0;
    }
    product
}

/// `nPr = n! / (n-r)!`.
pub fn permutations(n: &Value, r: &Value) -> Result<Value, EvalError> {
    let n = non_negative_integer(n, "nPr")?;
    let r = non_negative_integer(r, "nPr")?;
    if r > n {
        return Err(EvalError::Domain("nPr requires r <= n".to_string()));
    }
    Ok(Value::real(falling_product(n, r)))
}

/// `nCr = nPr / r!`.
pub fn combinations(n: &Value, r: &Value) -> Result<Value, EvalError> {
    let n = non_negative_integer(n, "nCr")?;
    let r = non_negative_integer(r, "nCr")?;
    if r > n {
        return Err(EvalError::Domain("nCr requires r <= n".to_string()));
    }
    // C(n, r) == C(n, n - r); the smaller side keeps the products finite longer
    let r = r.min(n - r);
    Ok(Value::real(
        (falling_product(n, r) / falling_product(r, r)).round(),
    ))
}

/// Truncated magnitude of a real operand. Integral `f64` values are kept as `f64` so
/// that operands past the `u64` range stay exact.
fn integer_operand(value: &Value, op: &str) -> Result<f64, EvalError> {
    let x = value.expect_real(op)?;
    if !x.is_finite() {
        return Err(EvalError::Domain(format!("{op} requires finite operands")));
    }
    Ok(x.trunc().abs())
}

/// Euclid on integral `f64` values; `%` is exact for them.
fn gcd_pair(mut a: f64, mut b: f64) -> f64 {
    while b != 0.0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Greatest common divisor of one or more values.
///
/// Operands are truncated toward zero. Stops as soon as the running divisor reaches 1.
pub fn gcd(values: &[Value]) -> Result<Value, EvalError> {
    let mut running = None;
    for value in values {
        let x = integer_operand(value, "GCD")?;
        let next = match running {
            None => x,
            Some(g) => gcd_pair(g, x),
        };
        if next == 1.0 {
            return Ok(Value::real(1.0));
        }
        running = Some(next);
    }
    running
        .map(Value::real)
        .ok_or_else(|| EvalError::Domain("GCD requires at least one argument".to_string()))
}

/// Least common multiple of one or more values.
///
/// Products beyond `f64` precision are rounded and may overflow to infinity.
pub fn lcm(values: &[Value]) -> Result<Value, EvalError> {
    let mut running: Option<f64> = None;
    for value in values {
        let x = integer_operand(value, "LCM")?;
        running = Some(match running {
            None => x,
            Some(l) if l == 0.0 || x == 0.0 => 0.0,
            Some(l) => l / gcd_pair(l, x) * x,
        });
    }
    running
        .map(Value::real)
        .ok_or_else(|| EvalError::Domain("LCM requires at least one argument".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reals(xs: &[f64]) -> Vec<Value> {
        xs.iter().map(|x| Value::real(*x)).collect()
    }

    #[test]
    fn test_factorial() {
        assert_eq!(factorial(&0.0.into()), Ok(Value::real(1.0)));
        assert_eq!(factorial(&5.0.into()), Ok(Value::real(120.0)));
        assert!(factorial(&(-1.0).into()).is_err());
        assert!(factorial(&2.5.into()).is_err());
        assert!(factorial(&Value::complex(1.0, 1.0)).is_err());
        assert!(factorial(&1000.0.into()).unwrap().re().is_infinite());
    }

    #[test]
    fn test_permutations_and_combinations() {
        assert_eq!(permutations(&5.0.into(), &2.0.into()), Ok(Value::real(20.0)));
        assert_eq!(combinations(&5.0.into(), &2.0.into()), Ok(Value::real(10.0)));
        assert_eq!(combinations(&52.0.into(), &5.0.into()), Ok(Value::real(2598960.0)));
        assert!(combinations(&2.0.into(), &5.0.into()).is_err());
    }

    #[test]
    fn test_gcd_lcm() {
        assert_eq!(gcd(&reals(&[12.0, 18.0, 24.0])), Ok(Value::real(6.0)));
        assert_eq!(gcd(&reals(&[7.0, 5.0, 100.0])), Ok(Value::real(1.0)));
        assert_eq!(lcm(&reals(&[4.0, 6.0])), Ok(Value::real(12.0)));
        assert_eq!(lcm(&reals(&[4.0, 0.0])), Ok(Value::real(0.0)));
        assert_eq!(gcd(&reals(&[9.0])), Ok(Value::real(9.0)));
    }

    #[test]
    fn test_gcd_truncates_operands() {
        assert_eq!(gcd(&reals(&[4.6, 6.0])), Ok(Value::real(2.0)));
        assert_eq!(gcd(&reals(&[-12.0, 18.9])), Ok(Value::real(6.0)));
        assert_eq!(lcm(&reals(&[-4.9, 6.0])), Ok(Value::real(12.0)));
    }

    #[test]
    fn test_gcd_lcm_beyond_u64() {
        assert_eq!(gcd(&reals(&[1e19, -1e19])), Ok(Value::real(1e19)));
        assert_eq!(gcd(&reals(&[1e19, 4e19])), Ok(Value::real(1e19)));
        assert_eq!(gcd(&reals(&[-1e19, 6.0])), Ok(Value::real(2.0)));

        let big = lcm(&reals(&[10000000000.0, 10000000001.0])).unwrap().re();
        assert!((big - 1.00000000001e20).abs() / 1e20 < 1e-15);
        assert!(lcm(&reals(&[2f64.powi(1023), 3.0])).unwrap().re().is_infinite());
    }

    #[test]
    fn test_gcd_lcm_reject_non_finite() {
        for bad in [f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
            assert!(gcd(&reals(&[bad, 2.0])).is_err());
            assert!(lcm(&reals(&[bad, 2.0])).is_err());
            assert!(lcm(&reals(&[2.0, bad])).is_err());
        }
    }

    #[test]
    fn test_gcd_short_circuits_before_bad_operand() {
        let values = vec![Value::real(2.0), Value::real(3.0), Value::complex(1.0, 1.0)];
        assert_eq!(gcd(&values), Ok(Value::real(1.0)));
    }
}
