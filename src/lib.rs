//! Expression engine of a scientific calculator.
//!
//! This crate parses calculator input into an immutable expression tree and evaluates it
//! over real numbers, complex numbers and matrices. Trees can be differentiated
//! symbolically, and the numeric helpers locate zeros and extrema or integrate over an
//! interval.
//!
//! # Features
//!
//! - Precedence-climbing parser with named subexpressions (`y = x*x; y + y`)
//! - Complex literals (`2+3i`) and matrix references (`[A]`)
//! - Symbolic differentiation with constant folding and shared subtrees
//! - Runtime switches that disable functions or whole input categories
//! - A calculator session with radix output and a four-function graph
//!
//! # Example
//!
//! ```rust
//! use lepton_calc::context::Bindings;
//! use lepton_calc::{Parser, Value};
//!
//! let expr = Parser::new().parse("x^2 + 2i").unwrap();
//! let bindings = Bindings::from([("x".to_string(), 3.0)]);
//! assert_eq!(expr.evaluate(&bindings).unwrap(), Value::complex(9.0, 2.0));
//!
//! // d/dx = 2x
//! let slope = expr.differentiate("x").evaluate_real(&bindings).unwrap();
//! assert_eq!(slope, 6.0);
//! ```

pub use expression::ParsedExpression;
pub use parser::{parse, Parser};
pub use session::Calculator;
pub use value::Value;

pub mod prelude {
    pub use crate::backends::matrix::MatrixBackend;
    pub use crate::config::{AngleUnit, ParserConfig};
    pub use crate::context::{Bindings, MatrixTable};
    pub use crate::custom::{ClosureFunction, CustomFunction};
    pub use crate::errors::{CalcError, EvalError, ParseError};
    pub use crate::expression::ParsedExpression;
    pub use crate::graph::{Analysis, Graph};
    pub use crate::parser::Parser;
    pub use crate::session::{Calculator, Radix};
    pub use crate::value::Value;
}

/// Conversions from matrix types of other crates
pub mod backends {
    pub mod matrix;
}
/// Angle unit and parser settings
pub mod config;
/// Variable bindings and matrix storage used during evaluation
pub mod context;
/// User-registered functions
pub mod custom;
/// Symbolic differentiation
pub(crate) mod derivative;
/// Error types for the various failure modes
pub mod errors;
/// Parsed expression handle
pub mod expression;
/// Disabled-feature sets and the process-wide switches
pub mod features;
/// Function graph and its analysis tools
pub mod graph;
/// Tokenizer
pub mod lexer;
/// Expression tree nodes
pub mod node;
/// Root finding, extremum search, quadrature and series
pub mod numeric;
/// The operations a node can hold
pub mod operation;
/// Math behind the built-in operations
pub mod operators {
    pub mod arithmetic;
    pub mod bitwise;
    pub mod combinatorics;
    pub mod linalg;
    pub mod special;
    pub mod trigonometric;
}
/// Text to expression tree
pub mod parser;
/// Calculator session
pub mod session;
/// Evaluation results
pub mod value;
