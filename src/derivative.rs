//! Symbolic differentiation.
//!
//! [`Differentiator`] rewrites a tree into the tree of its derivative. Rules are applied
//! post-order: each node's derivative is built from its children's derivatives and, where a
//! rule needs them, the original children, which are shared rather than copied.
//!
//! The helper constructors at the bottom fold constants as they go (`0 * f` is `0`,
//! `1 * f` is `f`, `c * f` becomes `MultiplyConstant(c)`), which keeps derivative trees
//! close to what one would write by hand.
//!
//! `factorial`, `GCD`, `LCM`, `nPr`, `nCr`, `sigma`, `prod` and `fnInt` differentiate to
//! zero.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::sync::Arc;

use log::trace;

use crate::config::AngleUnit;
use crate::node::{ExpressionNode, NodeRef};
use crate::operation::Operation;
use crate::operators::trigonometric::TrigFunction::{self, *};

/// One differentiation pass with respect to a single variable.
pub(crate) struct Differentiator<'a> {
    variable: &'a str,
    /// Derivatives already built in this pass, keyed by node identity
    cache: HashMap<*const ExpressionNode, NodeRef>,
}

impl<'a> Differentiator<'a> {
    pub(crate) fn new(variable: &'a str) -> Self {
        Self {
            variable,
            cache: HashMap::new(),
        }
    }

    pub(crate) fn derive(&mut self, node: &NodeRef) -> NodeRef {
        let key = Arc::as_ptr(node);
        if let Some(done) = self.cache.get(&key) {
            return Arc::clone(done);
        }
        let derivative = self.rule(node);
        trace!("d/d{} [{}] = {}", self.variable, node, derivative);
        self.cache.insert(key, Arc::clone(&derivative));
        derivative
    }

    fn rule(&mut self, node: &NodeRef) -> NodeRef {
        let c = node.children();
        match node.operation() {
            Operation::Variable(name) if name == self.variable => constant(1.0),
            Operation::Constant(_)
            | Operation::ComplexNumber(_)
            | Operation::Variable(_)
            | Operation::Matrix(_) => constant(0.0),

            // d/dx f(g1, ..., gn) = sum_i df/dgi * dgi/dx
            Operation::Custom(custom) => {
                let mut total = constant(0.0);
                for (i, child) in c.iter().enumerate() {
                    let dg = self.derive(child);
                    let partial =
                        ExpressionNode::new(Operation::Custom(custom.partial(i)), c.to_vec());
                    total = add(total, mul(partial, dg));
                }
                total
            }

            // d/dx(f + g) = df/dx + dg/dx
            Operation::Add => {
                let (df, dg) = (self.derive(&c[0]), self.derive(&c[1]));
                add(df, dg)
            }
            // d/dx(f - g) = df/dx - dg/dx
            Operation::Subtract => {
                let (df, dg) = (self.derive(&c[0]), self.derive(&c[1]));
                sub(df, dg)
            }
            // d/dx(f * g) = df/dx * g + f * dg/dx
            Operation::Multiply => {
                let (df, dg) = (self.derive(&c[0]), self.derive(&c[1]));
                add(mul(df, c[1].clone()), mul(c[0].clone(), dg))
            }
            // d/dx(f / g) = (df/dx * g - f * dg/dx) / g^2
            Operation::Divide => {
                let (df, dg) = (self.derive(&c[0]), self.derive(&c[1]));
                if is_zero(&dg) {
                    div(df, c[1].clone())
                } else {
                    div(
                        sub(mul(df, c[1].clone()), mul(c[0].clone(), dg)),
                        call(Operation::Square, c[1].clone()),
                    )
                }
            }
            Operation::Power => self.power(node),
            // d/dx(-f) = -(df/dx)
            Operation::Negate => neg(self.derive(&c[0])),

            // d/dx(sqrt(f)) = df/dx / (2 * sqrt(f))
            Operation::Sqrt => div(scale(0.5, self.derive(&c[0])), node.clone()),
            // d/dx(e^f) = e^f * df/dx
            Operation::Exp => mul(node.clone(), self.derive(&c[0])),
            // d/dx(ln(f)) = df/dx / f
            Operation::Ln => div(self.derive(&c[0]), c[0].clone()),
            // d/dx(log_b(f)) = (df/dx / f - log_b(f) * db/dx / b) / ln(b)
            Operation::Log => {
                let (db, df) = (self.derive(&c[0]), self.derive(&c[1]));
                div(
                    sub(
                        div(df, c[1].clone()),
                        mul(node.clone(), div(db, c[0].clone())),
                    ),
                    call(Operation::Ln, c[0].clone()),
                )
            }
            // d/dx(f^2) = 2 * f * df/dx
            Operation::Square => mul(scale(2.0, c[0].clone()), self.derive(&c[0])),
            // d/dx(f^3) = 3 * f^2 * df/dx
            Operation::Cube => mul(
                scale(3.0, call(Operation::Square, c[0].clone())),
                self.derive(&c[0]),
            ),
            // d/dx(1/f) = -df/dx / f^2
            Operation::Reciprocal => div(
                neg(self.derive(&c[0])),
                call(Operation::Square, c[0].clone()),
            ),
            Operation::AddConstant(_) => self.derive(&c[0]),
            Operation::MultiplyConstant(k) => scale(*k, self.derive(&c[0])),
            // d/dx(f^c) = c * f^(c-1) * df/dx
            Operation::PowerConstant(k) => mul(
                scale(*k, powc(*k - 1.0, c[0].clone())),
                self.derive(&c[0]),
            ),

            Operation::Trig(f, unit) => {
                let df = self.derive(&c[0]);
                if is_zero(&df) {
                    return df;
                }
                mul(trig_rule(*f, *unit, &c[0]), df)
            }

            // d/dx(erf(f)) = 2/sqrt(pi) * e^(-f^2) * df/dx
            Operation::Erf | Operation::Erfc => {
                let sign = if matches!(node.operation(), Operation::Erf) {
                    1.0
                } else {
                    -1.0
                };
                let gaussian = call(
                    Operation::Exp,
                    neg(call(Operation::Square, c[0].clone())),
                );
                mul(scale(sign * 2.0 / PI.sqrt(), gaussian), self.derive(&c[0]))
            }

            Operation::Min | Operation::Max => {
                let (da, db) = (self.derive(&c[0]), self.derive(&c[1]));
                // Selector is 1 exactly where the first argument is returned
                let gap = if matches!(node.operation(), Operation::Min) {
                    sub(c[1].clone(), c[0].clone())
                } else {
                    sub(c[0].clone(), c[1].clone())
                };
                let first = call(Operation::Step, gap);
                let second = offset(1.0, neg(first.clone()));
                add(mul(da, first), mul(db, second))
            }
            // d/dx|f| = (2 * step(f) - 1) * df/dx
            Operation::Abs => {
                let sign = offset(-1.0, scale(2.0, call(Operation::Step, c[0].clone())));
                mul(self.derive(&c[0]), sign)
            }

            Operation::Transpose => {
                let df = self.derive(&c[0]);
                if is_zero(&df) {
                    df
                } else {
                    call(Operation::Transpose, df)
                }
            }
            Operation::Dot | Operation::Cross => {
                let (df, dg) = (self.derive(&c[0]), self.derive(&c[1]));
                let op = node.operation().clone();
                let left = if is_zero(&df) {
                    constant(0.0)
                } else {
                    ExpressionNode::binary(op.clone(), df, c[1].clone())
                };
                let right = if is_zero(&dg) {
                    constant(0.0)
                } else {
                    ExpressionNode::binary(op, c[0].clone(), dg)
                };
                add(left, right)
            }

            // Piecewise constant in their operands
            Operation::Modulus
            | Operation::Step
            | Operation::Delta
            | Operation::Bitwise(_)
            | Operation::Random => constant(0.0),

            Operation::Factorial
            | Operation::Gcd
            | Operation::Lcm
            | Operation::Npr
            | Operation::Ncr
            | Operation::Sigma(_)
            | Operation::Prod(_)
            | Operation::FnInt(_) => constant(0.0),

            Operation::Det | Operation::SolveSole => constant(0.0),
        }
    }

    fn power(&mut self, node: &NodeRef) -> NodeRef {
        let (f, g) = (&node.children()[0], &node.children()[1]);
        let (df, dg) = (self.derive(f), self.derive(g));
        if is_zero(&dg) {
            if let Some(k) = g.constant_value() {
                // d/dx(f^c) = c * f^(c-1) * df/dx
                return mul(scale(k, powc(k - 1.0, f.clone())), df);
            }
            // d/dx(f^g) = g * f^(g-1) * df/dx when g does not depend on x
            let lowered = ExpressionNode::binary(Operation::Power, f.clone(), offset(-1.0, g.clone()));
            return mul(mul(g.clone(), lowered), df);
        }
        // d/dx(f^g) = f^g * (dg/dx * ln(f) + g * df/dx / f)
        mul(
            node.clone(),
            add(
                mul(dg, call(Operation::Ln, f.clone())),
                div(mul(g.clone(), df), f.clone()),
            ),
        )
    }
}

/// Derivative of a trigonometric function with respect to its argument `f`.
///
/// Forward circular functions pick up a factor converting the angle unit to radians, and
/// inverse circular functions the reciprocal of that factor.
fn trig_rule(function: TrigFunction, unit: AngleUnit, f: &NodeRef) -> NodeRef {
    let k = unit.to_radians();
    let trig = |g: TrigFunction| call(Operation::Trig(g, unit), f.clone());
    let square = |n: NodeRef| call(Operation::Square, n);
    let f2 = || square(f.clone());
    // 1 / (f^2 * sqrt(1 -+ f^-2)), shared by the reciprocal inverses
    let reciprocal_inverse = |sign: f64| {
        let inner = offset(1.0, scale(sign, powc(-2.0, f.clone())));
        call(
            Operation::Reciprocal,
            mul(f2(), call(Operation::Sqrt, inner)),
        )
    };

    match function {
        Sin => scale(k, trig(Cos)),
        Cos => scale(-k, trig(Sin)),
        Tan => scale(k, square(trig(Sec))),
        Sec => scale(k, mul(trig(Sec), trig(Tan))),
        Csc => scale(-k, mul(trig(Csc), trig(Cot))),
        Cot => scale(-k, square(trig(Csc))),
        Asin => scale(1.0 / k, powc(-0.5, offset(1.0, neg(f2())))),
        Acos => scale(-1.0 / k, powc(-0.5, offset(1.0, neg(f2())))),
        Atan => scale(1.0 / k, call(Operation::Reciprocal, offset(1.0, f2()))),
        Asec => scale(1.0 / k, reciprocal_inverse(-1.0)),
        Acsc => scale(-1.0 / k, reciprocal_inverse(-1.0)),
        Acot => scale(-1.0 / k, call(Operation::Reciprocal, offset(1.0, f2()))),
        Sinh => trig(Cosh),
        Cosh => trig(Sinh),
        Tanh => square(trig(Sech)),
        Sech => neg(mul(trig(Sech), trig(Tanh))),
        Csch => neg(mul(trig(Csch), trig(Coth))),
        Coth => neg(square(trig(Csch))),
        Asinh => powc(-0.5, offset(1.0, f2())),
        Acosh => powc(-0.5, offset(-1.0, f2())),
        Atanh | Acoth => call(Operation::Reciprocal, offset(1.0, neg(f2()))),
        Asech => {
            let inner = offset(-1.0, powc(-2.0, f.clone()));
            neg(call(
                Operation::Reciprocal,
                mul(f2(), call(Operation::Sqrt, inner)),
            ))
        }
        Acsch => neg(reciprocal_inverse(1.0)),
    }
}

fn constant(value: f64) -> NodeRef {
    ExpressionNode::constant(value)
}

fn is_zero(node: &NodeRef) -> bool {
    node.constant_value() == Some(0.0)
}

fn call(operation: Operation, child: NodeRef) -> NodeRef {
    ExpressionNode::unary(operation, child)
}

fn add(a: NodeRef, b: NodeRef) -> NodeRef {
    match (a.constant_value(), b.constant_value()) {
        (Some(x), Some(y)) => constant(x + y),
        (Some(x), None) => offset(x, b),
        (None, Some(y)) => offset(y, a),
        (None, None) => ExpressionNode::binary(Operation::Add, a, b),
    }
}

fn sub(a: NodeRef, b: NodeRef) -> NodeRef {
    match (a.constant_value(), b.constant_value()) {
        (Some(x), Some(y)) => constant(x - y),
        (Some(x), None) if x == 0.0 => neg(b),
        (None, Some(y)) => offset(-y, a),
        _ => ExpressionNode::binary(Operation::Subtract, a, b),
    }
}

fn mul(a: NodeRef, b: NodeRef) -> NodeRef {
    match (a.constant_value(), b.constant_value()) {
        (Some(x), Some(y)) => constant(x * y),
        (Some(x), None) => scale(x, b),
        (None, Some(y)) => scale(y, a),
        (None, None) => ExpressionNode::binary(Operation::Multiply, a, b),
    }
}

fn div(a: NodeRef, b: NodeRef) -> NodeRef {
    match (a.constant_value(), b.constant_value()) {
        (Some(x), _) if x == 0.0 => constant(0.0),
        (Some(x), Some(y)) => constant(x / y),
        (None, Some(y)) => scale(1.0 / y, a),
        _ => ExpressionNode::binary(Operation::Divide, a, b),
    }
}

fn neg(a: NodeRef) -> NodeRef {
    if let Some(x) = a.constant_value() {
        return constant(-x);
    }
    match (a.operation(), a.children()) {
        (Operation::Negate, [inner]) => inner.clone(),
        (Operation::MultiplyConstant(k), [inner]) => scale(-k, inner.clone()),
        _ => call(Operation::Negate, a),
    }
}

/// `k * a`
fn scale(k: f64, a: NodeRef) -> NodeRef {
    if k == 0.0 {
        return constant(0.0);
    }
    if k == 1.0 {
        return a;
    }
    if let Some(x) = a.constant_value() {
        return constant(k * x);
    }
    match (a.operation(), a.children()) {
        (Operation::MultiplyConstant(j), [inner]) => scale(k * j, inner.clone()),
        (Operation::Negate, [inner]) => scale(-k, inner.clone()),
        _ => call(Operation::MultiplyConstant(k), a),
    }
}

/// `a + k`
fn offset(k: f64, a: NodeRef) -> NodeRef {
    if k == 0.0 {
        return a;
    }
    match a.constant_value() {
        Some(x) => constant(x + k),
        None => call(Operation::AddConstant(k), a),
    }
}

/// `a ^ k`
fn powc(k: f64, a: NodeRef) -> NodeRef {
    if k == 0.0 {
        return constant(1.0);
    }
    if k == 1.0 {
        return a;
    }
    match a.constant_value() {
        Some(x) => constant(x.powf(k)),
        None if k == 2.0 => call(Operation::Square, a),
        None => call(Operation::PowerConstant(k), a),
    }
}
