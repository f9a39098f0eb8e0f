//! Parsed expressions.
//!
//! A [`ParsedExpression`] is the handle returned by the parser. It owns the root of an
//! immutable expression tree and is cheap to clone, since clones share the tree.
//!
//! # Example
//!
//! ```
//! use lepton_calc::context::Bindings;
//! use lepton_calc::Parser;
//!
//! let expr = Parser::new().parse("x^2 + 3*x").unwrap();
//! let bindings = Bindings::from([("x".to_string(), 2.0)]);
//! assert_eq!(expr.evaluate(&bindings).unwrap().re(), 10.0);
//!
//! let slope = expr.differentiate("x");
//! assert_eq!(slope.evaluate(&bindings).unwrap().re(), 7.0);
//! ```

use std::fmt;

use colored::Colorize;

use crate::context::{Bindings, EvalContext, MatrixStore};
use crate::errors::EvalError;
use crate::node::NodeRef;
use crate::numeric;
use crate::value::Value;

#[derive(Clone, PartialEq)]
pub struct ParsedExpression {
    root: NodeRef,
}

impl ParsedExpression {
    pub fn new(root: NodeRef) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    /// Evaluates the expression. Matrix references fail with
    /// [`EvalError::UndefinedMatrix`]; use [`evaluate_with`](Self::evaluate_with) to supply
    /// a matrix store.
    pub fn evaluate(&self, bindings: &Bindings) -> Result<Value, EvalError> {
        self.root.evaluate(&EvalContext::new(bindings))
    }

    pub fn evaluate_with(
        &self,
        bindings: &Bindings,
        matrices: &dyn MatrixStore,
    ) -> Result<Value, EvalError> {
        self.root
            .evaluate(&EvalContext::new(bindings).with_matrices(matrices))
    }

    /// Evaluates the expression and requires a purely real result.
    pub fn evaluate_real(&self, bindings: &Bindings) -> Result<f64, EvalError> {
        self.evaluate(bindings)?.expect_real("the result")
    }

    /// Returns a new expression for the derivative with respect to `variable`.
    ///
    /// The original expression is left untouched and may share nodes with the result.
    pub fn differentiate(&self, variable: &str) -> ParsedExpression {
        ParsedExpression::new(self.root.differentiate(variable))
    }

    /// Free variables of the expression, sorted by name.
    pub fn variables(&self) -> Vec<String> {
        self.root.variables()
    }

    /// See [`numeric::find_zero`].
    pub fn find_zero(
        &self,
        variable: &str,
        bindings: &Bindings,
        x_left: f64,
        x_right: f64,
    ) -> Result<f64, EvalError> {
        numeric::find_zero(
            &self.root,
            variable,
            &EvalContext::new(bindings),
            x_left,
            x_right,
        )
    }

    /// See [`numeric::find_extremum`].
    pub fn find_extremum(
        &self,
        variable: &str,
        bindings: &Bindings,
        x_left: f64,
        x_right: f64,
        maximum: bool,
    ) -> Result<f64, EvalError> {
        numeric::find_extremum(
            &self.root,
            variable,
            &EvalContext::new(bindings),
            x_left,
            x_right,
            maximum,
        )
    }

    /// See [`numeric::integrate`].
    pub fn integrate(
        &self,
        variable: &str,
        bindings: &Bindings,
        lower: f64,
        upper: f64,
    ) -> Result<f64, EvalError> {
        numeric::integrate(
            &self.root,
            variable,
            &EvalContext::new(bindings),
            lower,
            upper,
        )
    }
}

impl fmt::Debug for ParsedExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{{")?;
        writeln!(f, "    {}: {}", "Expression".cyan(), self.root)?;
        writeln!(f, "    {}: {:?}", "Variables".cyan(), self.variables())?;
        writeln!(f, "    {}: {}", "Nodes".cyan(), self.root.node_count())?;
        write!(f, "}}")
    }
}

/// Infix rendering. See the `Display` impl of [`ExpressionNode`](crate::node::ExpressionNode)
/// for the forms that do not parse back.
impl fmt::Display for ParsedExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.root)
    }
}
