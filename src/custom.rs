//! User-supplied functions.
//!
//! A [`CustomFunction`] is registered with the parser under a name and shadows any built-in
//! function of the same name. Calls to it become `Custom` nodes; differentiating such a node
//! produces further `Custom` nodes that ask the function for its partial derivatives.

use std::fmt;
use std::sync::Arc;

/// A function of real arguments that the parser can call by name.
///
/// Implementations must be `Send + Sync` so that parsed trees can be evaluated from several
/// threads at once (see [`Graph::sample`](crate::graph::Graph::sample)).
pub trait CustomFunction: Send + Sync {
    /// Number of arguments the function takes.
    fn arity(&self) -> usize;

    /// Evaluates the function.
    fn evaluate(&self, args: &[f64]) -> f64;

    /// Evaluates a partial derivative.
    ///
    /// `deriv_order[i]` is how many times to differentiate with respect to argument `i`.
    fn evaluate_derivative(&self, args: &[f64], deriv_order: &[usize]) -> f64;

    /// Returns an owned copy of this function.
    fn clone_box(&self) -> Box<dyn CustomFunction>;
}

impl Clone for Box<dyn CustomFunction> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Signature of the closure evaluating a [`ClosureFunction`].
pub type ValueFn = Arc<dyn Fn(&[f64]) -> f64 + Send + Sync>;

/// Signature of the closure evaluating partial derivatives of a [`ClosureFunction`].
pub type DerivativeFn = Arc<dyn Fn(&[f64], &[usize]) -> f64 + Send + Sync>;

/// A [`CustomFunction`] built from closures.
///
/// # Example
///
/// ```
/// use lepton_calc::custom::ClosureFunction;
/// use lepton_calc::Parser;
///
/// // hyp(a, b) = sqrt(a^2 + b^2)
/// let hyp = ClosureFunction::new(
///     2,
///     |x| (x[0] * x[0] + x[1] * x[1]).sqrt(),
///     |x, order| {
///         let r = (x[0] * x[0] + x[1] * x[1]).sqrt();
///         if order == [1, 0] { x[0] / r } else if order == [0, 1] { x[1] / r } else { f64::NAN }
///     },
/// );
/// let parser = Parser::new().with_function("hyp", hyp);
/// let expr = parser.parse("hyp(3, 4)").unwrap();
/// assert_eq!(expr.evaluate(&Default::default()).unwrap().re(), 5.0);
/// ```
#[derive(Clone)]
pub struct ClosureFunction {
    arity: usize,
    value: ValueFn,
    derivative: DerivativeFn,
}

impl ClosureFunction {
    pub fn new<F, D>(arity: usize, value: F, derivative: D) -> Self
    where
        F: Fn(&[f64]) -> f64 + Send + Sync + 'static,
        D: Fn(&[f64], &[usize]) -> f64 + Send + Sync + 'static,
    {
        Self {
            arity,
            value: Arc::new(value),
            derivative: Arc::new(derivative),
        }
    }
}

impl fmt::Debug for ClosureFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClosureFunction")
            .field("arity", &self.arity)
            .finish_non_exhaustive()
    }
}

impl CustomFunction for ClosureFunction {
    fn arity(&self) -> usize {
        self.arity
    }

    fn evaluate(&self, args: &[f64]) -> f64 {
        (self.value)(args)
    }

    fn evaluate_derivative(&self, args: &[f64], deriv_order: &[usize]) -> f64 {
        (self.derivative)(args, deriv_order)
    }

    fn clone_box(&self) -> Box<dyn CustomFunction> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_function() {
        let f = ClosureFunction::new(1, |x| x[0] * x[0], |x, _| 2.0 * x[0]);
        assert_eq!(f.arity(), 1);
        assert_eq!(f.evaluate(&[3.0]), 9.0);
        assert_eq!(f.evaluate_derivative(&[3.0], &[1]), 6.0);
    }

    #[test]
    fn test_clone_box_shares_behavior() {
        let boxed: Box<dyn CustomFunction> =
            Box::new(ClosureFunction::new(1, |x| x[0] + 1.0, |_, _| 1.0));
        let copy = boxed.clone();
        assert_eq!(copy.evaluate(&[1.0]), 2.0);
    }
}
