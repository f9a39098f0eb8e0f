//! Error function, indicator functions, min/max/abs and the random integer generator.

use std::f64::consts::PI;

use rand::Rng;

use crate::errors::EvalError;
use crate::value::Value;

/// Below this magnitude `erf` is summed from its Maclaurin series, above it `erfc` is
/// taken from its continued fraction.
const SERIES_LIMIT: f64 = 2.5;
const CONTINUED_FRACTION_TERMS: u32 = 120;

fn erf_series(x: f64) -> f64 {
    let x2 = x * x;
    let mut term = x;
    let mut sum = x;
    let mut n = 1.0;
    loop {
        term *= -x2 / n;
        let contribution = term / (2.0 * n + 1.0);
        sum += contribution;
        if contribution.abs() <= 1e-17 * sum.abs() {
            break;
        }
        n += 1.0;
    }
    2.0 / PI.sqrt() * sum
}

/// `erfc(x)` for `x >= SERIES_LIMIT`.
fn erfc_continued_fraction(x: f64) -> f64 {
    let mut f = x;
    for k in (1..=CONTINUED_FRACTION_TERMS).rev() {
        f = x + (k as f64 / 2.0) / f;
    }
    (-x * x).exp() / (PI.sqrt() * f)
}

pub fn erf(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x < 0.0 {
        return -erf(-x);
    }
    if x < SERIES_LIMIT {
        erf_series(x)
    } else {
        1.0 - erfc_continued_fraction(x)
    }
}

pub fn erfc(x: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x < 0.0 {
        return 2.0 - erfc(-x);
    }
    if x < SERIES_LIMIT {
        1.0 - erf_series(x)
    } else {
        erfc_continued_fraction(x)
    }
}

/// Unit step: 1 for `x >= 0`, otherwise 0.
pub fn step(value: &Value) -> Result<Value, EvalError> {
    let x = value.expect_real("step")?;
    Ok(Value::real(if x >= 0.0 { 1.0 } else { 0.0 }))
}

/// Indicator of zero: 1 for `x == 0`, otherwise 0.
pub fn delta(value: &Value) -> Result<Value, EvalError> {
    let x = value.expect_real("delta")?;
    Ok(Value::real(if x == 0.0 { 1.0 } else { 0.0 }))
}

/// Returns the larger (`want_max`) or smaller argument.
///
/// Real arguments compare by value, complex ones by modulus.
pub fn extremum(a: &Value, b: &Value, want_max: bool) -> Result<Value, EvalError> {
    let op = if want_max { "max" } else { "min" };
    let x = a.expect_scalar(op)?;
    let y = b.expect_scalar(op)?;
    let (kx, ky) = if x.im == 0.0 && y.im == 0.0 {
        (x.re, y.re)
    } else {
        (x.norm(), y.norm())
    };
    let pick_y = if want_max { ky > kx } else { ky < kx };
    Ok(Value::Complex(if pick_y { y } else { x }))
}

pub fn abs(value: &Value) -> Result<Value, EvalError> {
    Ok(Value::real(value.expect_scalar("abs")?.norm()))
}

/// Uniformly distributed integer in `[low, high]`.
pub fn random_integer(low: &Value, high: &Value) -> Result<Value, EvalError> {
    let low = low.expect_real("RNG")?.ceil();
    let high = high.expect_real("RNG")?.floor();
    if low.is_nan() || high.is_nan() || low > high {
        return Err(EvalError::Domain(
            "RNG requires a non-empty range".to_string(),
        ));
    }
    let n = rand::thread_rng().gen_range(low as i64..=high as i64);
    Ok(Value::real(n as f64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_erf_reference_values() {
        // erf(0.5), erf(1), erf(2), erf(3)
        assert!((erf(0.5) - 0.520_499_877_813_046_5).abs() < 1e-13);
        assert!((erf(1.0) - 0.842_700_792_949_714_9).abs() < 1e-13);
        assert!((erf(2.0) - 0.995_322_265_018_952_7).abs() < 1e-13);
        assert!((erf(3.0) - 0.999_977_909_503_001_4).abs() < 1e-13);
        assert_eq!(erf(0.0), 0.0);
        assert!((erf(-1.0) + erf(1.0)).abs() < 1e-15);
    }

    #[test]
    fn test_erfc_tail() {
        // erfc(4) = 1.541725790028002e-8
        assert!((erfc(4.0) / 1.541_725_790_028_002e-8 - 1.0).abs() < 1e-9);
        assert!((erfc(-1.0) - (1.0 + erf(1.0))).abs() < 1e-13);
    }

    #[test]
    fn test_step_and_delta() {
        assert_eq!(step(&0.0.into()), Ok(Value::real(1.0)));
        assert_eq!(step(&(-0.1).into()), Ok(Value::real(0.0)));
        assert_eq!(delta(&0.0.into()), Ok(Value::real(1.0)));
        assert_eq!(delta(&0.1.into()), Ok(Value::real(0.0)));
        assert!(step(&Value::complex(0.0, 1.0)).is_err());
    }

    #[test]
    fn test_min_max_abs() {
        assert_eq!(extremum(&2.0.into(), &(-3.0).into(), true), Ok(Value::real(2.0)));
        assert_eq!(extremum(&2.0.into(), &(-3.0).into(), false), Ok(Value::real(-3.0)));
        assert_eq!(
            extremum(&Value::complex(0.0, 3.0), &2.0.into(), true),
            Ok(Value::complex(0.0, 3.0))
        );
        assert_eq!(abs(&Value::complex(3.0, 4.0)), Ok(Value::real(5.0)));
        assert_eq!(abs(&(-2.0).into()), Ok(Value::real(2.0)));
    }

    #[test]
    fn test_random_integer_in_range() {
        for _ in 0..50 {
            let n = random_integer(&1.0.into(), &6.0.into()).unwrap().re();
            assert!((1.0..=6.0).contains(&n));
            assert_eq!(n.fract(), 0.0);
        }
        assert!(random_integer(&5.0.into(), &1.0.into()).is_err());
    }
}
