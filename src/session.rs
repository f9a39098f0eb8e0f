//! Calculator session.
//!
//! A [`Calculator`] is what the keypad (or the CLI) talks to: it keeps the session
//! variables, the matrix table, custom functions, the graph's stored functions and the
//! output radix, and turns input lines into formatted answers.
//!
//! # Example
//!
//! ```
//! use lepton_calc::session::{Calculator, Radix};
//!
//! let mut calc = Calculator::new();
//! assert_eq!(calc.evaluate_to_string("2 + 3i").unwrap(), "2 + 3i");
//! assert_eq!(calc.evaluate_to_string("6 * 7").unwrap(), "42");
//! assert_eq!(calc.evaluate_to_string("ans / 2").unwrap(), "21");
//!
//! calc.set_radix(Radix::Binary);
//! assert_eq!(calc.evaluate_to_string("5").unwrap(), "101");
//! ```

use std::f64::consts;
use std::fmt;
use std::str::FromStr;

use colored::Colorize;
use itertools::Itertools;
use log::debug;

use crate::backends::matrix::MatrixBackend;
use crate::config::{AngleUnit, ParserConfig};
use crate::context::{Bindings, MatrixTable};
use crate::custom::CustomFunction;
use crate::errors::CalcError;
use crate::expression::ParsedExpression;
use crate::features::FeatureSet;
use crate::graph::{Graph, FUNCTION_SLOTS};
use crate::parser::Parser;
use crate::value::Value;

/// Variable updated with the real part of every scalar answer.
pub const ANSWER: &str = "ans";

/// Base in which scalar answers are shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Radix {
    #[default]
    Decimal,
    /// Integer part as 32-bit two's complement
    Binary,
    Octal,
    Hexadecimal,
}

impl FromStr for Radix {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "decimal" | "dec" => Ok(Radix::Decimal),
            "binary" | "bin" => Ok(Radix::Binary),
            "octal" | "oct" => Ok(Radix::Octal),
            "hexadecimal" | "hex" => Ok(Radix::Hexadecimal),
            other => Err(format!("unknown radix: {other}")),
        }
    }
}

impl fmt::Display for Radix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Radix::Decimal => "decimal",
            Radix::Binary => "binary",
            Radix::Octal => "octal",
            Radix::Hexadecimal => "hexadecimal",
        };
        f.write_str(name)
    }
}

#[derive(Clone)]
pub struct Calculator {
    parser: Parser,
    variables: Bindings,
    matrices: MatrixTable,
    radix: Radix,
    stored_functions: [String; FUNCTION_SLOTS],
}

impl Default for Calculator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Calculator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{{")?;
        writeln!(f, "    {}: {}", "Angle unit".cyan(), self.config().angle_unit)?;
        writeln!(f, "    {}: {}", "Radix".cyan(), self.radix)?;
        writeln!(
            f,
            "    {}: {:?}",
            "Disabled".cyan(),
            self.config().disabled.iter().collect::<Vec<_>>()
        )?;
        writeln!(
            f,
            "    {}: {:?}",
            "Variables".cyan(),
            self.variables.iter().sorted_by(|a, b| a.0.cmp(b.0)).collect::<Vec<_>>()
        )?;
        writeln!(
            f,
            "    {}: {:?}",
            "Matrices".cyan(),
            self.matrices.names().sorted().collect::<Vec<_>>()
        )?;
        write!(f, "}}")
    }
}

impl Calculator {
    /// Session with every feature enabled, angles in radians and decimal output.
    pub fn new() -> Self {
        Self::with_config(ParserConfig::default())
    }

    /// Session using the process-wide angle unit and disabled features.
    pub fn from_process() -> Self {
        Self::with_config(ParserConfig::from_process())
    }

    pub fn with_config(config: ParserConfig) -> Self {
        let variables = Bindings::from([
            (ANSWER.to_string(), 0.0),
            ("PI".to_string(), consts::PI),
            ("e".to_string(), consts::E),
        ]);
        Self {
            parser: Parser::with_config(config),
            variables,
            matrices: MatrixTable::new(),
            radix: Radix::Decimal,
            stored_functions: Default::default(),
        }
    }

    pub fn config(&self) -> &ParserConfig {
        self.parser.config()
    }

    pub fn set_angle_unit(&mut self, unit: AngleUnit) {
        self.parser.config_mut().angle_unit = unit;
    }

    /// Disables a function name or category key for later input.
    pub fn disable(&mut self, name: &str) {
        self.parser.config_mut().disabled.disable(name);
    }

    pub fn enable(&mut self, name: &str) {
        self.parser.config_mut().disabled.enable(name);
    }

    /// Replaces the disabled set, e.g. with one decoded by [`FeatureSet::from_bits`].
    pub fn set_disabled(&mut self, disabled: FeatureSet) {
        debug!("disabled features: {:?}", disabled.iter().collect::<Vec<_>>());
        self.parser.config_mut().disabled = disabled;
    }

    pub fn add_function(&mut self, name: impl Into<String>, function: Box<dyn CustomFunction>) {
        self.parser.add_function(name, function);
    }

    pub fn radix(&self) -> Radix {
        self.radix
    }

    pub fn set_radix(&mut self, radix: Radix) {
        self.radix = radix;
    }

    pub fn variables(&self) -> &Bindings {
        &self.variables
    }

    pub fn set_variable(&mut self, name: impl Into<String>, value: f64) {
        self.variables.insert(name.into(), value);
    }

    pub fn variable(&self, name: &str) -> Option<f64> {
        self.variables.get(name).copied()
    }

    pub fn matrices(&self) -> &MatrixTable {
        &self.matrices
    }

    /// Stores a matrix under a reference such as `"[A]"`.
    pub fn set_matrix<M: MatrixBackend>(&mut self, name: &str, matrix: &M) {
        self.matrices.set(name, matrix);
    }

    pub fn remove_matrix(&mut self, name: &str) {
        self.matrices.remove(name);
    }

    pub fn parse(&self, line: &str) -> Result<ParsedExpression, CalcError> {
        Ok(self.parser.parse(line)?)
    }

    /// Parses and evaluates `line` against the session variables and matrices.
    ///
    /// The real part of a scalar answer is stored in `ans`; matrix answers leave it alone.
    pub fn evaluate(&mut self, line: &str) -> Result<Value, CalcError> {
        let expr = self.parse(line)?;
        let value = expr.evaluate_with(&self.variables, &self.matrices)?;
        if let Value::Complex(z) = value {
            self.variables.insert(ANSWER.to_string(), z.re);
        }
        debug!("{line} = {value}");
        Ok(value)
    }

    /// [`evaluate`](Self::evaluate) followed by [`format`](Self::format).
    pub fn evaluate_to_string(&mut self, line: &str) -> Result<String, CalcError> {
        let value = self.evaluate(line)?;
        Ok(self.format(&value))
    }

    /// Derivative of `line` with respect to `variable`.
    pub fn derive(&self, line: &str, variable: &str) -> Result<ParsedExpression, CalcError> {
        Ok(self.parse(line)?.differentiate(variable))
    }

    /// Renders a value in the session radix. Matrices are always decimal, one row per line.
    pub fn format(&self, value: &Value) -> String {
        match value {
            Value::Matrix(m) => m
                .row_iter()
                .map(|row| format!("[{}]", row.iter().join(", ")))
                .join("\n"),
            Value::Complex(z) => match self.radix {
                Radix::Decimal if z.im == 0.0 => format!("{}", z.re),
                Radix::Decimal if z.re == 0.0 => format!("{}i", z.im),
                Radix::Decimal => {
                    let sign = if z.im < 0.0 { '-' } else { '+' };
                    format!("{} {} {}i", z.re, sign, z.im.abs())
                }
                Radix::Binary => format!("{:b}", z.re.trunc() as i64 as u32),
                Radix::Octal => signed_integer(z.re, |n| format!("{n:o}")),
                Radix::Hexadecimal => signed_integer(z.re, |n| format!("{n:X}")),
            },
        }
    }

    /// Stores the source of graph function `index`. An empty string clears the slot.
    pub fn store_function(&mut self, index: usize, text: &str) -> Result<(), CalcError> {
        let slot = self
            .stored_functions
            .get_mut(index)
            .ok_or(CalcError::EmptySlot(index))?;
        *slot = text.to_string();
        Ok(())
    }

    pub fn stored_functions(&self) -> &[String] {
        &self.stored_functions
    }

    /// A graph of the stored functions, parsed with the current session settings.
    pub fn graph(&self) -> Result<Graph, CalcError> {
        let mut graph = Graph::new(self.parser.clone());
        for (index, text) in self.stored_functions.iter().enumerate() {
            graph.set_function(index, text)?;
        }
        Ok(graph)
    }
}

fn signed_integer(x: f64, render: impl Fn(u64) -> String) -> String {
    let n = x.trunc() as i64;
    if n < 0 {
        format!("-{}", render(n.unsigned_abs()))
    } else {
        render(n as u64)
    }
}
