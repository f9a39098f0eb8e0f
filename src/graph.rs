//! Function graphing support.
//!
//! A [`Graph`] keeps a viewing window and up to [`FUNCTION_SLOTS`] functions of `x`. It can
//! sample a function across the window for plotting, and run the numeric routines over a
//! user-chosen interval: maximum, minimum, zero, intersection of two functions and the
//! definite integral.
//!
//! Every operation is refused with a [`DisabledFeature`] error while the `graphing`
//! feature is disabled in the graph's parser configuration.
//!
//! # Example
//!
//! ```
//! use lepton_calc::context::Bindings;
//! use lepton_calc::graph::{Analysis, Graph};
//! use lepton_calc::Parser;
//!
//! let mut graph = Graph::new(Parser::new());
//! graph.set_function(0, "x^2 - 4").unwrap();
//! let bindings = Bindings::new();
//!
//! let ys = graph.sample(0, 4, &bindings).unwrap();
//! assert_eq!(ys, vec![96.0, 21.0, -4.0, 21.0]);
//!
//! let zero = graph.analyze(Analysis::Zero, 0, 0.0, 5.0, &bindings).unwrap();
//! assert!((zero.x - 2.0).abs() < 1e-9);
//! ```

use log::{debug, warn};
use rayon::prelude::*;

use crate::context::{Bindings, EvalContext};
use crate::errors::{CalcError, DisabledFeature};
use crate::expression::ParsedExpression;
use crate::features::FeatureCategory;
use crate::node::ExpressionNode;
use crate::numeric;
use crate::operation::Operation;
use crate::parser::Parser;

/// Number of functions a graph can hold.
pub const FUNCTION_SLOTS: usize = 4;

/// Variable graphed functions are written in.
pub const GRAPH_VARIABLE: &str = "x";

/// Visible region of the plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Window {
    pub x_left: f64,
    pub x_right: f64,
    pub y_bottom: f64,
    pub y_top: f64,
}

impl Default for Window {
    fn default() -> Self {
        Self {
            x_left: -10.0,
            x_right: 10.0,
            y_bottom: -10.0,
            y_top: 10.0,
        }
    }
}

impl Window {
    /// The `x` value shown in `column` of a plot `width` columns wide.
    pub fn x_at(&self, column: usize, width: usize) -> f64 {
        self.x_left + column as f64 * (self.x_right - self.x_left) / width as f64
    }

    /// Screen row of `y` in a plot `height` rows tall, counted from the top. `None` when
    /// `y` is off screen or not a number.
    pub fn row_of(&self, y: f64, height: usize) -> Option<usize> {
        if y.is_nan() || y < self.y_bottom || y > self.y_top {
            return None;
        }
        let row = (self.y_top - y) / (self.y_top - self.y_bottom) * height as f64;
        Some((row as usize).min(height.saturating_sub(1)))
    }
}

/// Analysis run over an interval of a stored function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Analysis {
    Maximum,
    Minimum,
    Zero,
    /// Where the function meets the function in the given slot
    Intersect(usize),
    Integral,
}

/// Result of [`Graph::analyze`].
///
/// For [`Analysis::Integral`] `x` holds the area and `y` is `NaN`. For the other analyses
/// `(x, y)` is the point found on the analysed function. A failed analysis gives `NaN`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisResult {
    pub x: f64,
    pub y: f64,
}

impl AnalysisResult {
    fn failed() -> Self {
        Self {
            x: f64::NAN,
            y: f64::NAN,
        }
    }

    pub fn is_nan(&self) -> bool {
        self.x.is_nan()
    }
}

#[derive(Debug, Clone)]
pub struct Graph {
    parser: Parser,
    pub window: Window,
    functions: [Option<ParsedExpression>; FUNCTION_SLOTS],
}

impl Graph {
    /// Creates an empty graph. Functions are parsed with `parser`.
    pub fn new(parser: Parser) -> Self {
        Self {
            parser,
            window: Window::default(),
            functions: Default::default(),
        }
    }

    fn check_enabled(&self) -> Result<(), DisabledFeature> {
        self.parser.config().disabled.check(FeatureCategory::Graphing)
    }

    fn slot(&self, index: usize) -> Result<&ParsedExpression, CalcError> {
        self.functions
            .get(index)
            .and_then(Option::as_ref)
            .ok_or(CalcError::EmptySlot(index))
    }

    /// Parses `text` and stores it in slot `index`. An empty string clears the slot.
    pub fn set_function(&mut self, index: usize, text: &str) -> Result<(), CalcError> {
        self.check_enabled()?;
        if index >= FUNCTION_SLOTS {
            return Err(CalcError::EmptySlot(index));
        }
        self.functions[index] = if text.trim().is_empty() {
            None
        } else {
            Some(self.parser.parse(text)?)
        };
        Ok(())
    }

    pub fn function(&self, index: usize) -> Option<&ParsedExpression> {
        self.functions.get(index).and_then(Option::as_ref)
    }

    /// Indices of the occupied slots.
    pub fn occupied(&self) -> impl Iterator<Item = usize> + '_ {
        self.functions
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.as_ref().map(|_| i))
    }

    /// Evaluates the function in slot `index` at `width` evenly spaced points of the
    /// window, starting at `x_left`. Points that fail to evaluate are `NaN`.
    ///
    /// Columns are evaluated in parallel; the tree is shared read-only between threads.
    pub fn sample(
        &self,
        index: usize,
        width: usize,
        bindings: &Bindings,
    ) -> Result<Vec<f64>, CalcError> {
        self.check_enabled()?;
        let root = self.slot(index)?.root();
        let window = self.window;

        let num_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8);
        let chunk_size = (width / (num_threads * 4)).max(1);
        let columns: Vec<usize> = (0..width).collect();

        Ok(columns
            .par_chunks(chunk_size)
            .map(|chunk| {
                let mut local = bindings.clone();
                chunk
                    .iter()
                    .map(|&column| {
                        local.insert(GRAPH_VARIABLE.to_string(), window.x_at(column, width));
                        root.evaluate(&EvalContext::new(&local))
                            .ok()
                            .and_then(|v| v.as_complex())
                            .map_or(f64::NAN, |z| z.re)
                    })
                    .collect::<Vec<_>>()
            })
            .flatten()
            .collect())
    }

    /// Runs `analysis` on the function in slot `index` over `[a, b]`.
    ///
    /// The bounds are swapped if given in reverse order. Numeric failures (evaluation
    /// errors, no sign change) yield a `NaN` result rather than an error.
    ///
    /// # Errors
    /// Fails when graphing is disabled, when [`Analysis::Integral`] is requested while
    /// `fnInt` is disabled, or when a referenced slot is empty.
    pub fn analyze(
        &self,
        analysis: Analysis,
        index: usize,
        a: f64,
        b: f64,
        bindings: &Bindings,
    ) -> Result<AnalysisResult, CalcError> {
        self.check_enabled()?;
        let function = self.slot(index)?.root();
        let (a, b) = if b < a { (b, a) } else { (a, b) };
        let ctx = EvalContext::new(bindings);

        let x = match analysis {
            Analysis::Maximum | Analysis::Minimum => numeric::find_extremum(
                function,
                GRAPH_VARIABLE,
                &ctx,
                a,
                b,
                analysis == Analysis::Maximum,
            ),
            Analysis::Zero => numeric::find_zero(function, GRAPH_VARIABLE, &ctx, a, b),
            Analysis::Intersect(other) => {
                let other = self.slot(other)?.root();
                let difference =
                    ExpressionNode::binary(Operation::Subtract, function.clone(), other.clone());
                numeric::find_zero(&difference, GRAPH_VARIABLE, &ctx, a, b)
            }
            Analysis::Integral => {
                self.parser.config().disabled.check_function("fnInt")?;
                let area = numeric::integrate(function, GRAPH_VARIABLE, &ctx, a, b);
                return Ok(match area {
                    Ok(x) => AnalysisResult { x, y: f64::NAN },
                    Err(err) => {
                        warn!("integral over [{a}, {b}] failed: {err}");
                        AnalysisResult::failed()
                    }
                });
            }
        };

        let x = match x {
            Ok(x) if !x.is_nan() => x,
            Ok(_) => return Ok(AnalysisResult::failed()),
            Err(err) => {
                warn!("{analysis:?} over [{a}, {b}] failed: {err}");
                return Ok(AnalysisResult::failed());
            }
        };

        let mut local = bindings.clone();
        local.insert(GRAPH_VARIABLE.to_string(), x);
        let y = function
            .evaluate(&EvalContext::new(&local))
            .map_or(f64::NAN, |v| v.re());
        debug!("{analysis:?} over [{a}, {b}] found ({x}, {y})");
        Ok(AnalysisResult { x, y })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParserConfig;
    use crate::features::FeatureSet;

    fn graph(functions: &[&str]) -> Graph {
        let mut graph = Graph::new(Parser::new());
        for (i, f) in functions.iter().enumerate() {
            graph.set_function(i, f).unwrap();
        }
        graph
    }

    #[test]
    fn test_sample_covers_window() {
        let g = graph(&["2*x"]);
        let ys = g.sample(0, 200, &Bindings::new()).unwrap();
        assert_eq!(ys.len(), 200);
        assert_eq!(ys[0], -20.0);
        assert!((ys[100] - 0.0).abs() < 1e-12);
        assert!(ys.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_sample_failures_are_nan() {
        let g = graph(&["x + y", "sqrt(x)"]);
        let ys = g.sample(0, 10, &Bindings::new()).unwrap();
        assert!(ys.iter().all(|y| y.is_nan()));

        let ys = g.sample(1, 10, &Bindings::new()).unwrap();
        // sqrt of a negative number is purely imaginary
        assert_eq!(ys[0], 0.0);
        assert!((ys[9] - 8f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_analyses() {
        let g = graph(&["4 - x^2", "x"]);
        let none = Bindings::new();

        let top = g.analyze(Analysis::Maximum, 0, 3.0, -3.0, &none).unwrap();
        assert!(top.x.abs() < 1e-6);
        assert!((top.y - 4.0).abs() < 1e-9);

        let bottom = g.analyze(Analysis::Minimum, 0, -1.0, 3.0, &none).unwrap();
        assert!((bottom.x - 3.0).abs() < 1e-6);

        let zero = g.analyze(Analysis::Zero, 0, 0.0, 5.0, &none).unwrap();
        assert!((zero.x - 2.0).abs() < 1e-9);

        let meet = g.analyze(Analysis::Intersect(1), 0, 0.0, 5.0, &none).unwrap();
        let expected = (17f64.sqrt() - 1.0) / 2.0;
        assert!((meet.x - expected).abs() < 1e-9);
        assert!((meet.y - expected).abs() < 1e-6);

        let area = g.analyze(Analysis::Integral, 0, -2.0, 2.0, &none).unwrap();
        assert!((area.x - 32.0 / 3.0).abs() < 1e-9);
        assert!(area.y.is_nan());
    }

    #[test]
    fn test_failed_analysis_is_nan() {
        let g = graph(&["x^2 + 1"]);
        let r = g.analyze(Analysis::Zero, 0, -1.0, 1.0, &Bindings::new()).unwrap();
        assert!(r.is_nan());
        assert!(matches!(
            g.analyze(Analysis::Intersect(3), 0, -1.0, 1.0, &Bindings::new()),
            Err(CalcError::EmptySlot(3))
        ));
    }

    #[test]
    fn test_graphing_disabled() {
        let mut disabled = FeatureSet::new();
        disabled.disable(FeatureSet::GRAPHING);
        let mut g = Graph::new(Parser::with_config(ParserConfig::new().with_disabled(disabled)));
        let err = g.set_function(0, "x").unwrap_err();
        assert_eq!(err.to_string(), "Graphs are disabled");
    }

    #[test]
    fn test_integral_refused_when_fnint_disabled() {
        let disabled: FeatureSet = ["fnInt"].into_iter().collect();
        let mut g = Graph::new(Parser::with_config(ParserConfig::new().with_disabled(disabled)));
        g.set_function(0, "x").unwrap();
        let none = Bindings::new();
        assert!(g.analyze(Analysis::Integral, 0, 0.0, 1.0, &none).is_err());
        assert!(g.analyze(Analysis::Zero, 0, -1.0, 1.0, &none).is_ok());
    }

    #[test]
    fn test_window_rows() {
        let w = Window::default();
        assert_eq!(w.row_of(10.0, 20), Some(0));
        assert_eq!(w.row_of(-10.0, 20), Some(19));
        assert_eq!(w.row_of(0.0, 20), Some(10));
        assert_eq!(w.row_of(11.0, 20), None);
        assert_eq!(w.row_of(f64::NAN, 20), None);
    }
}
