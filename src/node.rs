//! Expression tree nodes.
//!
//! An [`ExpressionNode`] is an [`Operation`] plus its ordered children. Nodes are immutable
//! once built and are handed around as [`NodeRef`] (`Arc<ExpressionNode>`), so the same node
//! may hang under several parents. Named subexpressions (`y = x*x; y + y`) and derivative
//! trees that reuse undifferentiated children both rely on this. Construction is strictly
//! bottom-up, which keeps every tree a DAG with a single root.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use itertools::Itertools;

use crate::context::EvalContext;
use crate::derivative::Differentiator;
use crate::errors::EvalError;
use crate::operation::Operation;
use crate::value::Value;

/// Shared handle to an immutable node.
pub type NodeRef = Arc<ExpressionNode>;

#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionNode {
    operation: Operation,
    children: Vec<NodeRef>,
}

impl ExpressionNode {
    pub fn new(operation: Operation, children: Vec<NodeRef>) -> NodeRef {
        Arc::new(Self {
            operation,
            children,
        })
    }

    pub fn leaf(operation: Operation) -> NodeRef {
        Self::new(operation, Vec::new())
    }

    pub fn constant(value: f64) -> NodeRef {
        Self::leaf(Operation::Constant(value))
    }

    pub fn variable(name: impl Into<String>) -> NodeRef {
        Self::leaf(Operation::Variable(name.into()))
    }

    pub fn unary(operation: Operation, child: NodeRef) -> NodeRef {
        Self::new(operation, vec![child])
    }

    pub fn binary(operation: Operation, left: NodeRef, right: NodeRef) -> NodeRef {
        Self::new(operation, vec![left, right])
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }

    /// Value of a `Constant` leaf.
    pub fn constant_value(&self) -> Option<f64> {
        match self.operation {
            Operation::Constant(c) => Some(c),
            _ => None,
        }
    }

    pub fn evaluate(&self, ctx: &EvalContext) -> Result<Value, EvalError> {
        self.operation.evaluate(&self.children, ctx)
    }

    /// Builds the derivative tree with respect to `variable`.
    ///
    /// Subtrees are differentiated once per distinct node, so a shared child yields a
    /// shared derivative.
    pub fn differentiate(self: &Arc<Self>, variable: &str) -> NodeRef {
        Differentiator::new(variable).derive(self)
    }

    /// Names of all free variables in the tree, in sorted order.
    ///
    /// Variables bound by `sigma`, `prod` or `fnInt` are only reported where they occur
    /// outside their own body.
    pub fn variables(&self) -> Vec<String> {
        let mut found = HashSet::new();
        self.collect_variables(&mut Vec::new(), &mut found);
        found.into_iter().sorted().collect()
    }

    fn collect_variables<'a>(&'a self, bound: &mut Vec<&'a str>, found: &mut HashSet<String>) {
        match &self.operation {
            Operation::Variable(name) if !bound.contains(&name.as_str()) => {
                found.insert(name.clone());
            }
            Operation::Sigma(var) | Operation::Prod(var) | Operation::FnInt(var) => {
                for child in &self.children[..self.children.len().saturating_sub(1)] {
                    child.collect_variables(bound, found);
                }
                if let Some(body) = self.children.last() {
                    bound.push(var);
                    body.collect_variables(bound, found);
                    bound.pop();
                }
            }
            _ => {
                for child in &self.children {
                    child.collect_variables(bound, found);
                }
            }
        }
    }

    /// Number of distinct nodes reachable from this one.
    pub fn node_count(&self) -> usize {
        fn visit(node: &ExpressionNode, seen: &mut HashSet<*const ExpressionNode>) {
            if seen.insert(node as *const _) {
                for child in &node.children {
                    visit(child, seen);
                }
            }
        }
        let mut seen = HashSet::new();
        visit(self, &mut seen);
        seen.len()
    }

    /// Binding strength when printed; atoms and function calls bind tightest.
    fn precedence(&self) -> u8 {
        match self.operation {
            Operation::Add | Operation::Subtract | Operation::AddConstant(_) => 1,
            Operation::Multiply | Operation::Divide | Operation::MultiplyConstant(_) => 2,
            Operation::Negate => 3,
            Operation::Power | Operation::PowerConstant(_) => 4,
            _ => 5,
        }
    }

    fn write_operand(&self, f: &mut fmt::Formatter<'_>, parenthesize: bool) -> fmt::Result {
        if parenthesize {
            write!(f, "({self})")
        } else {
            write!(f, "{self}")
        }
    }
}

fn write_number(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value < 0.0 {
        write!(f, "({value})")
    } else {
        write!(f, "{value}")
    }
}

/// Infix rendering. The output parses back to an equivalent tree, except for
/// non-finite constants (`NaN`, `inf`) and custom-function derivatives (`f_d10(x, y)`),
/// which have no input syntax.
impl fmt::Display for ExpressionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prec = self.precedence();
        match (&self.operation, self.children.as_slice()) {
            (Operation::Constant(c), _) => write_number(f, *c),
            (Operation::ComplexNumber(z), _) => {
                if z.re == 0.0 && z.im == 1.0 {
                    f.write_str("i")
                } else {
                    write!(f, "({})", Value::Complex(*z))
                }
            }
            (Operation::Variable(name), _) | (Operation::Matrix(name), _) => f.write_str(name),
            (op, [left, right]) if op.has_operator_symbol() => {
                // Power is right associative, the others left associative
                let right_assoc = matches!(op, Operation::Power);
                left.write_operand(
                    f,
                    left.precedence() < prec || (right_assoc && left.precedence() == prec),
                )?;
                write!(f, " {} ", op.name())?;
                right.write_operand(
                    f,
                    right.precedence() < prec || (!right_assoc && right.precedence() == prec),
                )
            }
            (Operation::Negate, [child]) => {
                f.write_str("-")?;
                child.write_operand(f, child.precedence() <= prec)
            }
            (Operation::AddConstant(c), [child]) => {
                child.write_operand(f, child.precedence() < prec)?;
                f.write_str(" + ")?;
                write_number(f, *c)
            }
            (Operation::MultiplyConstant(c), [child]) => {
                write_number(f, *c)?;
                f.write_str(" * ")?;
                child.write_operand(f, child.precedence() <= prec)
            }
            (Operation::PowerConstant(c), [child]) => {
                child.write_operand(f, child.precedence() <= prec)?;
                f.write_str(" ^ ")?;
                write_number(f, *c)
            }
            (
                Operation::Sigma(var) | Operation::Prod(var) | Operation::FnInt(var),
                [lower, upper, body],
            ) => write!(
                f,
                "{}({lower}, {upper}, {var}, {body})",
                self.operation.name()
            ),
            (Operation::Custom(custom), children) if custom.is_derivative() => write!(
                f,
                "{}_d{}({})",
                custom.name(),
                custom.deriv_order().iter().join(""),
                children.iter().join(", ")
            ),
            (op, children) => write!(f, "{}({})", op.name(), children.iter().join(", ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AngleUnit;
    use crate::context::Bindings;
    use crate::operators::bitwise::BitwiseOp;
    use crate::operators::trigonometric::TrigFunction;

    fn x() -> NodeRef {
        ExpressionNode::variable("x")
    }

    #[test]
    fn test_evaluate_shared_child() {
        let square = ExpressionNode::binary(Operation::Multiply, x(), x());
        let sum = ExpressionNode::binary(Operation::Add, square.clone(), square);
        assert_eq!(sum.node_count(), 3);

        let bindings = Bindings::from([("x".to_string(), 3.0)]);
        assert_eq!(
            sum.evaluate(&EvalContext::new(&bindings)),
            Ok(Value::real(18.0))
        );
    }

    #[test]
    fn test_display_parenthesizes_by_precedence() {
        let sum = ExpressionNode::binary(Operation::Add, x(), ExpressionNode::constant(1.0));
        let product = ExpressionNode::binary(Operation::Multiply, sum.clone(), x());
        assert_eq!(product.to_string(), "(x + 1) * x");

        let difference = ExpressionNode::binary(Operation::Subtract, x(), sum);
        assert_eq!(difference.to_string(), "x - (x + 1)");

        let tower = ExpressionNode::binary(
            Operation::Power,
            ExpressionNode::constant(2.0),
            ExpressionNode::binary(
                Operation::Power,
                ExpressionNode::constant(3.0),
                ExpressionNode::constant(2.0),
            ),
        );
        assert_eq!(tower.to_string(), "2 ^ 3 ^ 2");
    }

    #[test]
    fn test_display_functions_and_constants() {
        let sin = ExpressionNode::unary(
            Operation::Trig(TrigFunction::Sin, AngleUnit::Radians),
            ExpressionNode::constant(-2.0),
        );
        assert_eq!(sin.to_string(), "sin((-2))");
        let neg = ExpressionNode::unary(Operation::Negate, sin);
        assert_eq!(neg.to_string(), "-sin((-2))");
        let scaled = ExpressionNode::unary(Operation::MultiplyConstant(3.0), x());
        assert_eq!(scaled.to_string(), "3 * x");
    }

    #[test]
    fn test_display_keyword_infix_in_call_form() {
        let rem = ExpressionNode::binary(Operation::Modulus, x(), ExpressionNode::constant(3.0));
        let and = ExpressionNode::binary(
            Operation::Bitwise(BitwiseOp::And),
            rem,
            ExpressionNode::constant(6.0),
        );
        assert!(and.operation().is_infix());
        assert_eq!(and.to_string(), "and(MOD(x, 3), 6)");
    }

    #[test]
    fn test_variables_respect_bound_names() {
        let body = ExpressionNode::binary(Operation::Multiply, ExpressionNode::variable("k"), x());
        let sigma = ExpressionNode::new(
            Operation::Sigma("k".to_string()),
            vec![ExpressionNode::constant(1.0), ExpressionNode::variable("n"), body],
        );
        assert_eq!(sigma.variables(), vec!["n".to_string(), "x".to_string()]);
        assert_eq!(sigma.to_string(), "sigma(1, n, k, k * x)");
    }
}
