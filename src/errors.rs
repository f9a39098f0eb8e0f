//! Error types for the lepton-calc crate.
//!
//! This module defines the failure modes of the expression engine. The main error types are:
//!
//! - `DisabledFeature`: A function or a whole category of input was switched off
//! - `ParseError`: Errors while tokenizing or parsing an expression string
//! - `EvalError`: Errors while evaluating a parsed expression tree
//! - `CalcError`: Session-level errors wrapping the above
//!
//! Disabled features are kept separate from ordinary syntax errors so that callers can show
//! a "temporarily disabled" message instead of a generic parse failure.

use thiserror::Error;

use crate::features::FeatureCategory;

/// A feature that the active configuration refuses to accept.
///
/// For functions the `name` is the function name as typed (e.g. `sin`). For whole
/// categories (variables, complex numbers, matrices, graphing) it is the category key
/// used by [`FeatureSet`](crate::features::FeatureSet).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", render_disabled(.name, .category))]
pub struct DisabledFeature {
    pub name: String,
    pub category: FeatureCategory,
}

impl DisabledFeature {
    pub fn new(name: impl Into<String>, category: FeatureCategory) -> Self {
        Self {
            name: name.into(),
            category,
        }
    }
}

fn render_disabled(name: &str, category: &FeatureCategory) -> String {
    match category {
        FeatureCategory::Function => format!("Error: {name} function is disabled"),
        other => format!("{} are disabled", other.display_name()),
    }
}

/// Errors that can occur while turning an expression string into a tree.
///
/// Positions are byte offsets into the original input string.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Opening and closing parentheses do not match up
    #[error("unbalanced parentheses")]
    UnbalancedParentheses,
    /// The token stream ended while an operand was still expected
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    /// A token appeared where it cannot be used
    #[error("unexpected token: {token} (at position {position})")]
    UnexpectedToken { token: String, position: usize },
    /// Tokens remained after a complete expression was parsed
    #[error("unexpected text at end of expression: {text} (at position {position})")]
    TrailingText { text: String, position: usize },
    /// Neither a custom nor a built-in function carries this name
    #[error("unknown function: {name} (at position {position})")]
    UnknownFunction { name: String, position: usize },
    /// A `;`-separated segment other than the last one lacks the `name = expr` form
    #[error("Parse error: subexpression does not specify a name: {segment}")]
    UnnamedSubexpression { segment: String },
    /// A function was called with the wrong number of arguments
    #[error("wrong number of arguments to function {name}: expected {expected}, got {got}")]
    WrongArgumentCount {
        name: String,
        expected: String,
        got: usize,
    },
    /// A numeric literal could not be read
    #[error("malformed number: {text} (at position {position})")]
    MalformedNumber { text: String, position: usize },
    /// The bound variable slot of `sigma`, `prod` or `fnInt` is not a plain name
    #[error("{function} expects a variable name as its third argument")]
    InvalidBoundVariable { function: String },
    /// The input contains a disabled feature
    #[error(transparent)]
    Disabled(#[from] DisabledFeature),
}

impl ParseError {
    /// Returns `true` if the parse was refused because of a disabled feature.
    pub fn is_disabled(&self) -> bool {
        matches!(self, ParseError::Disabled(_))
    }

    /// Returns the disabled feature that caused this error, if any.
    pub fn disabled(&self) -> Option<&DisabledFeature> {
        match self {
            ParseError::Disabled(feature) => Some(feature),
            _ => None,
        }
    }
}

/// Errors that can occur while evaluating an expression tree.
///
/// None of these leave the tree in a modified state; the same expression can be
/// evaluated again with different bindings.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// An operand had the wrong kind (matrix where a scalar is needed, complex where a
    /// real is needed, ...)
    #[error("Error: {0}")]
    TypeMismatch(String),
    /// A variable had no value in the supplied bindings
    #[error("No value specified for variable {0}")]
    UnboundVariable(String),
    /// The operand lies outside the domain of the operation
    #[error("Math Error: {0}")]
    Domain(String),
    /// The matrix store has no entry under this name
    #[error("Error: Undefined matrix value {0}")]
    UndefinedMatrix(String),
    /// Matrix shapes do not agree
    #[error("Error: {0}")]
    DimensionMismatch(String),
    /// A linear system has no unique solution
    #[error("Math Error: singular system")]
    SingularSystem,
}

/// Errors raised by the calculator session and the graphing layer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    /// Error while parsing the input line
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Error while evaluating the parsed expression
    #[error(transparent)]
    Eval(#[from] EvalError),
    /// A session-level feature (graphing) is disabled
    #[error(transparent)]
    Disabled(#[from] DisabledFeature),
    /// A stored function slot is empty or out of range
    #[error("No function stored in slot {0}")]
    EmptySlot(usize),
}

impl CalcError {
    /// Returns the disabled feature behind this error, whether it surfaced during
    /// parsing or at the session level.
    pub fn disabled(&self) -> Option<&DisabledFeature> {
        match self {
            CalcError::Parse(err) => err.disabled(),
            CalcError::Disabled(feature) => Some(feature),
            _ => None,
        }
    }
}
