//! Operation registry.
//!
//! Every [`ExpressionNode`](crate::node::ExpressionNode) carries one [`Operation`]: a closed set
//! of about seventy operation kinds plus the open [`Operation::Custom`] variant wrapping a
//! caller-supplied [`CustomFunction`]. Each operation knows its name, arity, how to evaluate
//! itself from its children, and (in `derivative.rs`) how to differentiate itself.
//!
//! Operations fall into these groups:
//!
//! - Leaves: constants, complex constants, variables, matrix references
//! - Binary arithmetic: `+ - * / ^` and `MOD`
//! - Unary scalar functions: negation, `sqrt`, `exp`, `ln`, `log`, `square`, `cube`, `recip`
//! - Trigonometric and hyperbolic functions, parameterised by the angle unit
//! - Bitwise/logical functions on rounded integers
//! - Combinatorics: `factorial`, `GCD`, `LCM`, `nPr`, `nCr`
//! - Quantifiers: `sigma`, `prod`, `fnInt`, each binding a variable over a range
//! - Matrix functions: `transpose`, `det`, `dot`, `cross`, `solveSOLE`
//! - Helpers used by the differentiator: `AddConstant`, `MultiplyConstant`, `PowerConstant`

use std::fmt;
use std::sync::Arc;

use num_complex::Complex64;

use crate::config::AngleUnit;
use crate::context::EvalContext;
use crate::custom::CustomFunction;
use crate::errors::EvalError;
use crate::node::NodeRef;
use crate::numeric;
use crate::operators::arithmetic::{self, complex_pow};
use crate::operators::bitwise::BitwiseOp;
use crate::operators::trigonometric::TrigFunction;
use crate::operators::{combinatorics, linalg, special};
use crate::value::Value;

/// Number of children an operation takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Fixed(usize),
    /// One or more
    Variadic,
}

impl Arity {
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Arity::Fixed(n) => *n == count,
            Arity::Variadic => count >= 1,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{n}"),
            Arity::Variadic => f.write_str("at least 1"),
        }
    }
}

/// A call to a [`CustomFunction`], possibly one of its partial derivatives.
#[derive(Clone)]
pub struct CustomOp {
    name: String,
    function: Arc<dyn CustomFunction>,
    deriv_order: Vec<usize>,
}

impl CustomOp {
    pub fn new(name: impl Into<String>, function: Box<dyn CustomFunction>) -> Self {
        let deriv_order = vec![0; function.arity()];
        Self {
            name: name.into(),
            function: Arc::from(function),
            deriv_order,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.function.arity()
    }

    pub fn deriv_order(&self) -> &[usize] {
        &self.deriv_order
    }

    pub fn is_derivative(&self) -> bool {
        self.deriv_order.iter().any(|&n| n > 0)
    }

    /// The same function differentiated once more with respect to argument `index`.
    pub fn partial(&self, index: usize) -> Self {
        let mut deriv_order = self.deriv_order.clone();
        deriv_order[index] += 1;
        Self {
            name: self.name.clone(),
            function: Arc::clone(&self.function),
            deriv_order,
        }
    }

    fn evaluate(&self, args: &[Value]) -> Result<Value, EvalError> {
        let reals = args
            .iter()
            .map(|v| {
                v.expect_real(&self.name).map_err(|_| {
                    EvalError::TypeMismatch("Argument must be purely real".to_string())
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let y = if self.is_derivative() {
            self.function.evaluate_derivative(&reals, &self.deriv_order)
        } else {
            self.function.evaluate(&reals)
        };
        Ok(Value::real(y))
    }
}

impl fmt::Debug for CustomOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomOp")
            .field("name", &self.name)
            .field("deriv_order", &self.deriv_order)
            .finish()
    }
}

impl PartialEq for CustomOp {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.deriv_order == other.deriv_order
    }
}

/// The operation carried by an expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Constant(f64),
    ComplexNumber(Complex64),
    Variable(String),
    /// Reference to a stored matrix, e.g. `[A]`
    Matrix(String),
    Custom(CustomOp),

    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Modulus,
    Negate,

    Sqrt,
    Exp,
    /// `log(base, x)`
    Log,
    Ln,
    Square,
    Cube,
    Reciprocal,
    AddConstant(f64),
    MultiplyConstant(f64),
    PowerConstant(f64),

    Trig(TrigFunction, AngleUnit),
    Erf,
    Erfc,
    Step,
    Delta,

    Bitwise(BitwiseOp),

    Factorial,
    Gcd,
    Lcm,
    Npr,
    Ncr,

    /// Children: lower bound, upper bound, body
    Sigma(String),
    /// Children: lower bound, upper bound, body
    Prod(String),
    /// Children: lower bound, upper bound, body
    FnInt(String),

    Min,
    Max,
    Abs,
    Random,

    Transpose,
    Det,
    Dot,
    Cross,
    SolveSole,
}

/// Names of the quantifier functions, which the parser treats specially.
pub const QUANTIFIERS: [&str; 3] = ["sigma", "prod", "fnInt"];

impl Operation {
    /// Looks up a built-in function by the name it is called with.
    ///
    /// Trigonometric functions capture `angle_unit`. Quantifiers are not returned here; see
    /// [`Operation::quantifier`].
    pub fn from_function_name(name: &str, angle_unit: AngleUnit) -> Option<Self> {
        if let Some(f) = TrigFunction::from_name(name) {
            return Some(Operation::Trig(f, angle_unit));
        }
        if let Some(op) = BitwiseOp::from_name(name) {
            return Some(Operation::Bitwise(op));
        }
        let op = match name {
            "sqrt" => Operation::Sqrt,
            "exp" => Operation::Exp,
            "log" => Operation::Log,
            "ln" => Operation::Ln,
            "factorial" => Operation::Factorial,
            "GCD" => Operation::Gcd,
            "LCM" => Operation::Lcm,
            "nPr" => Operation::Npr,
            "nCr" => Operation::Ncr,
            "erf" => Operation::Erf,
            "erfc" => Operation::Erfc,
            "step" => Operation::Step,
            "delta" => Operation::Delta,
            "square" => Operation::Square,
            "cube" => Operation::Cube,
            "recip" => Operation::Reciprocal,
            "min" => Operation::Min,
            "max" => Operation::Max,
            "abs" => Operation::Abs,
            "RNG" => Operation::Random,
            "MOD" => Operation::Modulus,
            "transpose" => Operation::Transpose,
            "det" => Operation::Det,
            "dot" => Operation::Dot,
            "cross" => Operation::Cross,
            "solveSOLE" => Operation::SolveSole,
            _ => return None,
        };
        Some(op)
    }

    /// Builds the quantifier `name` binding `variable`.
    pub fn quantifier(name: &str, variable: String) -> Option<Self> {
        match name {
            "sigma" => Some(Operation::Sigma(variable)),
            "prod" => Some(Operation::Prod(variable)),
            "fnInt" => Some(Operation::FnInt(variable)),
            _ => None,
        }
    }

    /// Name of the operation as written in expressions.
    pub fn name(&self) -> &str {
        match self {
            Operation::Constant(_) => "constant",
            Operation::ComplexNumber(_) => "complex",
            Operation::Variable(name) | Operation::Matrix(name) => name,
            Operation::Custom(custom) => custom.name(),
            Operation::Add => "+",
            Operation::Subtract => "-",
            Operation::Multiply => "*",
            Operation::Divide => "/",
            Operation::Power => "^",
            Operation::Modulus => "MOD",
            Operation::Negate => "-",
            Operation::Sqrt => "sqrt",
            Operation::Exp => "exp",
            Operation::Log => "log",
            Operation::Ln => "ln",
            Operation::Square => "square",
            Operation::Cube => "cube",
            Operation::Reciprocal => "recip",
            Operation::AddConstant(_) => "addConstant",
            Operation::MultiplyConstant(_) => "multiplyConstant",
            Operation::PowerConstant(_) => "powerConstant",
            Operation::Trig(f, _) => f.name(),
            Operation::Erf => "erf",
            Operation::Erfc => "erfc",
            Operation::Step => "step",
            Operation::Delta => "delta",
            Operation::Bitwise(op) => op.name(),
            Operation::Factorial => "factorial",
            Operation::Gcd => "GCD",
            Operation::Lcm => "LCM",
            Operation::Npr => "nPr",
            Operation::Ncr => "nCr",
            Operation::Sigma(_) => "sigma",
            Operation::Prod(_) => "prod",
            Operation::FnInt(_) => "fnInt",
            Operation::Min => "min",
            Operation::Max => "max",
            Operation::Abs => "abs",
            Operation::Random => "RNG",
            Operation::Transpose => "transpose",
            Operation::Det => "det",
            Operation::Dot => "dot",
            Operation::Cross => "cross",
            Operation::SolveSole => "solveSOLE",
        }
    }

    /// Number of child nodes the operation takes.
    ///
    /// Quantifiers take three children (bounds and body); the bound variable is stored in the
    /// operation itself.
    pub fn arity(&self) -> Arity {
        match self {
            Operation::Constant(_)
            | Operation::ComplexNumber(_)
            | Operation::Variable(_)
            | Operation::Matrix(_) => Arity::Fixed(0),
            Operation::Custom(custom) => Arity::Fixed(custom.arity()),
            Operation::Gcd | Operation::Lcm => Arity::Variadic,
            Operation::Sigma(_) | Operation::Prod(_) | Operation::FnInt(_) => Arity::Fixed(3),
            Operation::Bitwise(op) => Arity::Fixed(op.arity()),
            Operation::Add
            | Operation::Subtract
            | Operation::Multiply
            | Operation::Divide
            | Operation::Power
            | Operation::Modulus
            | Operation::Log
            | Operation::Npr
            | Operation::Ncr
            | Operation::Min
            | Operation::Max
            | Operation::Random
            | Operation::Dot
            | Operation::Cross
            | Operation::SolveSole => Arity::Fixed(2),
            _ => Arity::Fixed(1),
        }
    }

    /// `true` for binary operations the keypad places between their operands: the
    /// arithmetic operators, `MOD` and the two-operand bitwise operations.
    pub fn is_infix(&self) -> bool {
        match self {
            Operation::Bitwise(op) => op.arity() == 2,
            Operation::Modulus => true,
            _ => self.has_operator_symbol(),
        }
    }

    /// `true` for the infix operations typed as a symbol (`+ - * / ^`). Other infix
    /// operations are typed and rendered in call form, e.g. `and(a, b)`.
    pub fn has_operator_symbol(&self) -> bool {
        matches!(
            self,
            Operation::Add
                | Operation::Subtract
                | Operation::Multiply
                | Operation::Divide
                | Operation::Power
        )
    }

    /// `true` if swapping the operands does not change the result.
    pub fn is_symmetric(&self) -> bool {
        match self {
            Operation::Add
            | Operation::Multiply
            | Operation::Gcd
            | Operation::Lcm
            | Operation::Min
            | Operation::Max => true,
            Operation::Bitwise(op) => op.is_symmetric(),
            _ => false,
        }
    }

    /// Evaluates the operation over its children.
    ///
    /// Children are evaluated first (post-order), except for quantifiers, which evaluate
    /// their bounds and then evaluate the body repeatedly with the bound variable rebound.
    pub(crate) fn evaluate(
        &self,
        children: &[NodeRef],
        ctx: &EvalContext,
    ) -> Result<Value, EvalError> {
        match self {
            Operation::Sigma(variable) | Operation::Prod(variable) | Operation::FnInt(variable) => {
                return self.evaluate_quantifier(variable, children, ctx)
            }
            _ => {}
        }
        let args = children
            .iter()
            .map(|child| child.evaluate(ctx))
            .collect::<Result<Vec<_>, _>>()?;
        self.apply(&args, ctx)
    }

    fn evaluate_quantifier(
        &self,
        variable: &str,
        children: &[NodeRef],
        ctx: &EvalContext,
    ) -> Result<Value, EvalError> {
        let [lower, upper, body] = children else {
            return Err(EvalError::Domain(format!(
                "{} expects bounds and a body",
                self.name()
            )));
        };
        let lower = lower.evaluate(ctx)?.expect_real(self.name())?;
        let upper = upper.evaluate(ctx)?.expect_real(self.name())?;
        match self {
            Operation::Sigma(_) => numeric::sum(body, variable, ctx, lower, upper).map(Value::from),
            Operation::Prod(_) => {
                numeric::product(body, variable, ctx, lower, upper).map(Value::from)
            }
            _ => numeric::integrate(body, variable, ctx, lower, upper).map(Value::real),
        }
    }

    /// Applies the operation to already evaluated arguments.
    fn apply(&self, args: &[Value], ctx: &EvalContext) -> Result<Value, EvalError> {
        let arg = |i: usize| -> Result<&Value, EvalError> {
            args.get(i).ok_or_else(|| {
                EvalError::Domain(format!("{} expects {} arguments", self.name(), self.arity()))
            })
        };

        match self {
            Operation::Constant(c) => Ok(Value::real(*c)),
            Operation::ComplexNumber(z) => Ok(Value::Complex(*z)),
            Operation::Variable(name) => ctx.variable(name).map(Value::real),
            Operation::Matrix(name) => ctx.matrix(name).map(Value::Matrix),
            Operation::Custom(custom) => custom.evaluate(args),

            Operation::Add => arithmetic::add(arg(0)?, arg(1)?),
            Operation::Subtract => arithmetic::subtract(arg(0)?, arg(1)?),
            Operation::Multiply => arithmetic::multiply(arg(0)?, arg(1)?),
            Operation::Divide => arithmetic::divide(arg(0)?, arg(1)?),
            Operation::Power => arithmetic::power(arg(0)?, arg(1)?),
            Operation::Modulus => arithmetic::modulus(arg(0)?, arg(1)?),
            Operation::Negate => Ok(arithmetic::negate(arg(0)?)),

            Operation::Sqrt => scalar_map(arg(0)?, "sqrt", |z| {
                if z.im == 0.0 && z.re >= 0.0 {
                    Complex64::new(z.re.sqrt(), 0.0)
                } else if z.im == 0.0 {
                    Complex64::new(0.0, (-z.re).sqrt())
                } else {
                    z.sqrt()
                }
            }),
            Operation::Exp => scalar_map(arg(0)?, "exp", |z| {
                if z.im == 0.0 {
                    Complex64::new(z.re.exp(), 0.0)
                } else {
                    z.exp()
                }
            }),
            Operation::Ln => scalar_map(arg(0)?, "ln", ln),
            Operation::Log => {
                let base = arg(0)?.expect_scalar("log")?;
                let x = arg(1)?.expect_scalar("log")?;
                Ok(Value::Complex(quotient(ln(x), ln(base))))
            }
            Operation::Square => scalar_map(arg(0)?, "square", |z| z * z),
            Operation::Cube => scalar_map(arg(0)?, "cube", |z| z * z * z),
            Operation::Reciprocal => scalar_map(arg(0)?, "recip", |z| {
                quotient(Complex64::new(1.0, 0.0), z)
            }),
            Operation::AddConstant(c) => scalar_map(arg(0)?, "addConstant", |z| z + c),
            Operation::MultiplyConstant(c) => match arg(0)? {
                Value::Matrix(m) => Ok(Value::Matrix(m * *c)),
                Value::Complex(z) => Ok(Value::Complex(z * c)),
            },
            Operation::PowerConstant(c) => scalar_map(arg(0)?, "powerConstant", |z| {
                if z.im == 0.0 && c.fract() == 0.0 && c.abs() <= i32::MAX as f64 {
                    Complex64::new(z.re.powi(*c as i32), 0.0)
                } else {
                    complex_pow(z, Complex64::new(*c, 0.0))
                }
            }),

            Operation::Trig(f, unit) => {
                let x = arg(0)?.expect_real(f.name()).map_err(|err| match arg(0) {
                    Ok(Value::Matrix(_)) => {
                        EvalError::TypeMismatch("Matrices are not supported with trig functions".to_string())
                    }
                    _ => err,
                })?;
                Ok(Value::real(f.apply(x, *unit)))
            }
            Operation::Erf => Ok(Value::real(special::erf(arg(0)?.expect_real("erf")?))),
            Operation::Erfc => Ok(Value::real(special::erfc(arg(0)?.expect_real("erfc")?))),
            Operation::Step => special::step(arg(0)?),
            Operation::Delta => special::delta(arg(0)?),

            Operation::Bitwise(op) => op.apply(args),

            Operation::Factorial => combinatorics::factorial(arg(0)?),
            Operation::Gcd => combinatorics::gcd(args),
            Operation::Lcm => combinatorics::lcm(args),
            Operation::Npr => combinatorics::permutations(arg(0)?, arg(1)?),
            Operation::Ncr => combinatorics::combinations(arg(0)?, arg(1)?),

            Operation::Sigma(_) | Operation::Prod(_) | Operation::FnInt(_) => Err(
                EvalError::Domain(format!("{} needs its body to evaluate", self.name())),
            ),

            Operation::Min => special::extremum(arg(0)?, arg(1)?, false),
            Operation::Max => special::extremum(arg(0)?, arg(1)?, true),
            Operation::Abs => special::abs(arg(0)?),
            Operation::Random => special::random_integer(arg(0)?, arg(1)?),

            Operation::Transpose => linalg::transpose(arg(0)?),
            Operation::Det => linalg::det(arg(0)?),
            Operation::Dot => linalg::dot(arg(0)?, arg(1)?),
            Operation::Cross => linalg::cross(arg(0)?, arg(1)?),
            Operation::SolveSole => linalg::solve(arg(0)?, arg(1)?),
        }
    }
}

fn scalar_map(
    value: &Value,
    op: &str,
    f: impl FnOnce(Complex64) -> Complex64,
) -> Result<Value, EvalError> {
    Ok(Value::Complex(f(value.expect_scalar(op)?)))
}

/// Natural logarithm, staying real for positive reals.
fn ln(z: Complex64) -> Complex64 {
    if z.im == 0.0 && z.re > 0.0 {
        Complex64::new(z.re.ln(), 0.0)
    } else if z.im == 0.0 && z.re == 0.0 {
        Complex64::new(f64::NEG_INFINITY, 0.0)
    } else {
        z.ln()
    }
}

/// Division that keeps IEEE semantics (`1/0 = inf`) for real operands.
fn quotient(a: Complex64, b: Complex64) -> Complex64 {
    if a.im == 0.0 && b.im == 0.0 {
        Complex64::new(a.re / b.re, 0.0)
    } else {
        a / b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Bindings;
    use crate::custom::ClosureFunction;
    use crate::node::ExpressionNode;

    fn eval(op: Operation, args: &[f64]) -> Result<Value, EvalError> {
        let children: Vec<NodeRef> = args
            .iter()
            .map(|x| ExpressionNode::leaf(Operation::Constant(*x)))
            .collect();
        let bindings = Bindings::new();
        ExpressionNode::new(op, children).evaluate(&EvalContext::new(&bindings))
    }

    #[test]
    fn test_function_table() {
        assert_eq!(
            Operation::from_function_name("sin", AngleUnit::Degrees),
            Some(Operation::Trig(TrigFunction::Sin, AngleUnit::Degrees))
        );
        assert_eq!(
            Operation::from_function_name("GCD", AngleUnit::Radians),
            Some(Operation::Gcd)
        );
        assert_eq!(Operation::from_function_name("sigma", AngleUnit::Radians), None);
        assert_eq!(Operation::from_function_name("nope", AngleUnit::Radians), None);
        assert_eq!(
            Operation::quantifier("prod", "k".to_string()),
            Some(Operation::Prod("k".to_string()))
        );
    }

    #[test]
    fn test_arity_and_flags() {
        assert_eq!(Operation::Add.arity(), Arity::Fixed(2));
        assert_eq!(Operation::Gcd.arity(), Arity::Variadic);
        assert_eq!(Operation::Sigma("i".into()).arity(), Arity::Fixed(3));
        assert!(Operation::Power.is_infix());
        assert!(Operation::Modulus.is_infix());
        assert!(Operation::Bitwise(BitwiseOp::ShiftRight).is_infix());
        assert!(!Operation::Bitwise(BitwiseOp::Not).is_infix());
        assert!(!Operation::Gcd.is_infix());
        assert!(Operation::Power.has_operator_symbol());
        assert!(!Operation::Modulus.has_operator_symbol());
        assert!(!Operation::Power.is_symmetric());
        assert!(Operation::Bitwise(BitwiseOp::Xor).is_symmetric());
        assert!(!Operation::Bitwise(BitwiseOp::ShiftLeft).is_symmetric());
        assert!(Arity::Variadic.accepts(3));
        assert!(!Arity::Variadic.accepts(0));
    }

    #[test]
    fn test_unary_scalar_functions() {
        assert_eq!(eval(Operation::Sqrt, &[9.0]), Ok(Value::real(3.0)));
        assert_eq!(eval(Operation::Sqrt, &[-4.0]), Ok(Value::complex(0.0, 2.0)));
        assert_eq!(eval(Operation::Exp, &[0.0]), Ok(Value::real(1.0)));
        assert_eq!(eval(Operation::Ln, &[1.0]), Ok(Value::real(0.0)));
        assert_eq!(eval(Operation::Reciprocal, &[4.0]), Ok(Value::real(0.25)));
        assert_eq!(eval(Operation::Cube, &[2.0]), Ok(Value::real(8.0)));
        assert_eq!(eval(Operation::PowerConstant(3.0), &[2.0]), Ok(Value::real(8.0)));
        assert_eq!(eval(Operation::AddConstant(1.5), &[2.0]), Ok(Value::real(3.5)));
    }

    #[test]
    fn test_log_base() {
        let v = eval(Operation::Log, &[2.0, 8.0]).unwrap().re();
        assert!((v - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_ln_of_negative_is_complex() {
        let z = eval(Operation::Ln, &[-1.0]).unwrap().as_complex().unwrap();
        assert!((z.im - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn test_custom_operation_and_partials() {
        let f = ClosureFunction::new(
            2,
            |x| x[0] * x[1],
            |x, order| match order {
                [1, 0] => x[1],
                [0, 1] => x[0],
                _ => 1.0,
            },
        );
        let custom = CustomOp::new("mul", Box::new(f));
        assert_eq!(eval(Operation::Custom(custom.clone()), &[3.0, 4.0]), Ok(Value::real(12.0)));
        assert_eq!(eval(Operation::Custom(custom.partial(0)), &[3.0, 4.0]), Ok(Value::real(4.0)));
        let mixed = custom.partial(0).partial(1);
        assert_eq!(mixed.deriv_order(), &[1, 1]);
        assert_eq!(eval(Operation::Custom(mixed), &[3.0, 4.0]), Ok(Value::real(1.0)));
    }

    #[test]
    fn test_custom_rejects_complex_arguments() {
        let f = ClosureFunction::new(1, |x| x[0], |_, _| 1.0);
        let node = ExpressionNode::new(
            Operation::Custom(CustomOp::new("id", Box::new(f))),
            vec![ExpressionNode::leaf(Operation::ComplexNumber(Complex64::new(0.0, 1.0)))],
        );
        let bindings = Bindings::new();
        assert_eq!(
            node.evaluate(&EvalContext::new(&bindings)),
            Err(EvalError::TypeMismatch("Argument must be purely real".to_string()))
        );
    }

    #[test]
    fn test_trig_rejects_complex() {
        let node = ExpressionNode::new(
            Operation::Trig(TrigFunction::Sin, AngleUnit::Radians),
            vec![ExpressionNode::leaf(Operation::ComplexNumber(Complex64::new(1.0, 1.0)))],
        );
        let bindings = Bindings::new();
        assert!(matches!(
            node.evaluate(&EvalContext::new(&bindings)),
            Err(EvalError::TypeMismatch(_))
        ));
    }
}
