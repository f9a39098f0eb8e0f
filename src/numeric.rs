//! Numeric routines built on repeated evaluation.
//!
//! Each routine copies the caller's bindings once, then rebinds a single variable and
//! re-evaluates the same tree. Only real parts of scalar results are used, except by
//! [`sum`] and [`product`], which accumulate complex values. Iteration counts are fixed so
//! results are reproducible.

use num_complex::Complex64;

use crate::context::{Bindings, EvalContext};
use crate::errors::EvalError;
use crate::node::ExpressionNode;

/// Bisection steps taken by [`find_zero`].
pub const BISECTION_STEPS: usize = 50;
/// Samples in the first pass of [`find_extremum`].
pub const EXTREMUM_SAMPLES: usize = 160;
/// Refinement passes of [`find_extremum`] after the first one.
pub const EXTREMUM_PASSES: usize = 29;
/// Samples per refinement pass of [`find_extremum`].
pub const EXTREMUM_REFINE_SAMPLES: usize = 4;
/// Simpson panels used by [`integrate`].
pub const SIMPSON_INTERVALS: usize = 1000;

/// Evaluates one tree at varying values of one variable.
struct Probe<'a> {
    body: &'a ExpressionNode,
    variable: &'a str,
    ctx: EvalContext<'a>,
    bindings: Bindings,
}

impl<'a> Probe<'a> {
    fn new(body: &'a ExpressionNode, variable: &'a str, ctx: &EvalContext<'a>) -> Self {
        let mut bindings = ctx.bindings.clone();
        bindings.insert(variable.to_string(), 0.0);
        Self {
            body,
            variable,
            ctx: *ctx,
            bindings,
        }
    }

    fn complex_at(&mut self, x: f64) -> Result<Complex64, EvalError> {
        if let Some(slot) = self.bindings.get_mut(self.variable) {
            *slot = x;
        }
        let value = self.body.evaluate(&self.ctx.rebind(&self.bindings))?;
        value.expect_scalar(self.body.operation().name())
    }

    fn real_at(&mut self, x: f64) -> Result<f64, EvalError> {
        Ok(self.complex_at(x)?.re)
    }
}

/// Finds a root of `body` in `[x_left, x_right]` by bisection.
///
/// Returns `NaN` when the endpoint values do not differ in sign. Otherwise exactly
/// [`BISECTION_STEPS`] halvings are performed and the last midpoint is returned. With an
/// even number of roots in the bracket no sign change is seen and the result is `NaN`.
///
/// # Example
/// ```
/// use lepton_calc::context::{Bindings, EvalContext};
/// use lepton_calc::numeric::find_zero;
/// use lepton_calc::Parser;
///
/// let expr = Parser::new().parse("x - 5").unwrap();
/// let bindings = Bindings::new();
/// let root = find_zero(expr.root(), "x", &EvalContext::new(&bindings), 0.0, 10.0).unwrap();
/// assert!((root - 5.0).abs() < 1e-9);
/// ```
pub fn find_zero(
    body: &ExpressionNode,
    variable: &str,
    ctx: &EvalContext,
    mut x_left: f64,
    mut x_right: f64,
) -> Result<f64, EvalError> {
    let mut probe = Probe::new(body, variable, ctx);
    let mut left_negative = probe.real_at(x_left)? < 0.0;
    let right_negative = probe.real_at(x_right)? < 0.0;
    if left_negative == right_negative {
        return Ok(f64::NAN);
    }

    let mut mid = x_left;
    for _ in 0..BISECTION_STEPS {
        mid = x_left + (x_right - x_left) / 2.0;
        let mid_negative = probe.real_at(mid)? < 0.0;
        if left_negative != mid_negative {
            x_right = mid;
        } else {
            x_left = mid;
            left_negative = mid_negative;
        }
    }
    Ok(mid)
}

/// Finds the `x` in `[x_left, x_right]` where `body` is largest (`maximum`) or smallest.
///
/// The first pass samples [`EXTREMUM_SAMPLES`] evenly spaced points. Each of the following
/// [`EXTREMUM_PASSES`] passes samples [`EXTREMUM_REFINE_SAMPLES`] points around the best
/// point so far, with the spacing halved every pass and the window kept inside the
/// bracket. Multimodal functions may yield a local extremum.
pub fn find_extremum(
    body: &ExpressionNode,
    variable: &str,
    ctx: &EvalContext,
    x_left: f64,
    x_right: f64,
    maximum: bool,
) -> Result<f64, EvalError> {
    let mut probe = Probe::new(body, variable, ctx);
    let mut samples = EXTREMUM_SAMPLES;
    let mut step = (x_right - x_left) / samples as f64;
    let mut x = x_left;
    let mut best = probe.real_at(x)?;
    let mut best_x = x_left;

    for _ in 0..=EXTREMUM_PASSES {
        for _ in 0..samples {
            let y = probe.real_at(x)?;
            if (maximum && y > best) || (!maximum && y < best) {
                best = y;
                best_x = x;
            }
            x += step;
        }
        samples = EXTREMUM_REFINE_SAMPLES;
        x = if best_x - step < x_left {
            x_left
        } else if best_x + step > x_right {
            x_right - 2.0 * step
        } else {
            best_x - step
        };
        step *= 2.0 / samples as f64;
    }

    Ok(best_x.min(x_right))
}

/// Integrates `body` over `[lower, upper]` with composite Simpson's rule.
///
/// Uses [`SIMPSON_INTERVALS`] panels of width `2h`. Returns 0 when `lower > upper`.
pub fn integrate(
    body: &ExpressionNode,
    variable: &str,
    ctx: &EvalContext,
    lower: f64,
    upper: f64,
) -> Result<f64, EvalError> {
    if lower > upper {
        return Ok(0.0);
    }
    let mut probe = Probe::new(body, variable, ctx);
    let h = (upper - lower) / (2 * SIMPSON_INTERVALS) as f64;
    let mut total = 0.0;
    for i in 0..SIMPSON_INTERVALS {
        let x0 = lower + 2.0 * i as f64 * h;
        let y0 = probe.real_at(x0)?;
        let y1 = probe.real_at(x0 + h)?;
        let y2 = probe.real_at(x0 + 2.0 * h)?;
        total += h * (y0 + 4.0 * y1 + y2) / 3.0;
    }
    Ok(total)
}

/// Integer bounds of a discrete sum or product; fractional parts are truncated.
fn integer_range(lower: f64, upper: f64) -> Option<(i64, i64)> {
    let (lo, hi) = (lower.trunc(), upper.trunc());
    if lo.is_nan() || hi.is_nan() || lo > hi {
        return None;
    }
    Some((lo as i64, hi as i64))
}

/// Sum of `body` for the variable running over the integers from `lower` to `upper`.
///
/// Returns 0 when `lower > upper`.
pub fn sum(
    body: &ExpressionNode,
    variable: &str,
    ctx: &EvalContext,
    lower: f64,
    upper: f64,
) -> Result<Complex64, EvalError> {
    let Some((lo, hi)) = integer_range(lower, upper) else {
        return Ok(Complex64::new(0.0, 0.0));
    };
    let mut probe = Probe::new(body, variable, ctx);
    let mut total = Complex64::new(0.0, 0.0);
    for k in lo..=hi {
        total += probe.complex_at(k as f64)?;
    }
    Ok(total)
}

/// Product of `body` for the variable running over the integers from `lower` to `upper`.
///
/// Returns 0, not the empty product, when `lower > upper`.
pub fn product(
    body: &ExpressionNode,
    variable: &str,
    ctx: &EvalContext,
    lower: f64,
    upper: f64,
) -> Result<Complex64, EvalError> {
    let Some((lo, hi)) = integer_range(lower, upper) else {
        return Ok(Complex64::new(0.0, 0.0));
    };
    let mut probe = Probe::new(body, variable, ctx);
    let mut total = Complex64::new(1.0, 0.0);
    for k in lo..=hi {
        total *= probe.complex_at(k as f64)?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeRef;
    use crate::parser::Parser;

    fn tree(text: &str) -> NodeRef {
        Parser::new().parse(text).unwrap().root().clone()
    }

    #[test]
    fn test_find_zero() {
        let bindings = Bindings::new();
        let ctx = EvalContext::new(&bindings);
        let root = find_zero(&tree("x - 5"), "x", &ctx, 0.0, 10.0).unwrap();
        assert!((root - 5.0).abs() < 1e-9);

        let root = find_zero(&tree("x^3 - 2"), "x", &ctx, 0.0, 3.0).unwrap();
        assert!((root - 2f64.cbrt()).abs() < 1e-12);
    }

    #[test]
    fn test_find_zero_without_sign_change() {
        let bindings = Bindings::new();
        let ctx = EvalContext::new(&bindings);
        assert!(find_zero(&tree("x*x + 1"), "x", &ctx, -10.0, 10.0).unwrap().is_nan());
        // Two roots cancel out the sign change
        assert!(find_zero(&tree("x*x - 1"), "x", &ctx, -2.0, 2.0).unwrap().is_nan());
    }

    #[test]
    fn test_find_zero_uses_other_bindings() {
        let bindings = Bindings::from([("a".to_string(), 3.0)]);
        let ctx = EvalContext::new(&bindings);
        let root = find_zero(&tree("x - a"), "x", &ctx, -10.0, 10.0).unwrap();
        assert!((root - 3.0).abs() < 1e-9);
        // Caller's bindings are untouched
        assert_eq!(bindings.len(), 1);
    }

    #[test]
    fn test_find_extremum() {
        let bindings = Bindings::new();
        let ctx = EvalContext::new(&bindings);
        let x = find_extremum(&tree("-(x - 1)^2 + 4"), "x", &ctx, -10.0, 10.0, true).unwrap();
        assert!((x - 1.0).abs() < 1e-6);
        let x = find_extremum(&tree("(x + 2.5)^2"), "x", &ctx, -10.0, 10.0, false).unwrap();
        assert!((x + 2.5).abs() < 1e-6);
    }

    #[test]
    fn test_find_extremum_at_boundary() {
        let bindings = Bindings::new();
        let ctx = EvalContext::new(&bindings);
        let x = find_extremum(&tree("x"), "x", &ctx, 0.0, 1.0, true).unwrap();
        assert!(x <= 1.0);
        assert!(x > 0.99);
        let x = find_extremum(&tree("x"), "x", &ctx, 0.0, 1.0, false).unwrap();
        assert_eq!(x, 0.0);
    }

    #[test]
    fn test_integrate() {
        let bindings = Bindings::new();
        let ctx = EvalContext::new(&bindings);
        assert!((integrate(&tree("x"), "x", &ctx, 0.0, 1.0).unwrap() - 0.5).abs() < 1e-12);
        let area = integrate(&tree("sin(x)"), "x", &ctx, 0.0, std::f64::consts::PI).unwrap();
        assert!((area - 2.0).abs() < 1e-10);
        assert_eq!(integrate(&tree("x"), "x", &ctx, 1.0, 0.0), Ok(0.0));
    }

    #[test]
    fn test_sum_and_product() {
        let bindings = Bindings::new();
        let ctx = EvalContext::new(&bindings);
        assert_eq!(sum(&tree("k"), "k", &ctx, 1.0, 5.0), Ok(Complex64::new(15.0, 0.0)));
        assert_eq!(product(&tree("k"), "k", &ctx, 1.0, 4.0), Ok(Complex64::new(24.0, 0.0)));
        // Bounds are truncated
        assert_eq!(sum(&tree("k"), "k", &ctx, 1.9, 3.2), Ok(Complex64::new(6.0, 0.0)));
        assert_eq!(sum(&tree("k"), "k", &ctx, 3.0, 1.0), Ok(Complex64::new(0.0, 0.0)));
        assert_eq!(product(&tree("k"), "k", &ctx, 3.0, 1.0), Ok(Complex64::new(0.0, 0.0)));
        let z = sum(&tree("k * i"), "k", &ctx, 1.0, 3.0).unwrap();
        assert_eq!(z, Complex64::new(0.0, 6.0));
    }

    #[test]
    fn test_errors_propagate() {
        let bindings = Bindings::new();
        let ctx = EvalContext::new(&bindings);
        assert_eq!(
            integrate(&tree("x + y"), "x", &ctx, 0.0, 1.0),
            Err(EvalError::UnboundVariable("y".to_string()))
        );
    }
}
