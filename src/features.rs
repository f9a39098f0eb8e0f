//! Disabled-feature policy.
//!
//! A [`FeatureSet`] names functions and input categories that the lexer and parser must
//! refuse. It is consulted while tokenizing identifiers, the imaginary unit `i` and matrix
//! references, and never during evaluation.
//!
//! The set can also be decoded from the 64-bit mask the firmware receives over the radio
//! link (see [`FeatureSet::from_bits`]).
//!
//! A process-wide set is kept for callers that configure the engine once at startup
//! ([`disable`], [`enable`], [`clear_all`], [`is_disabled`]). Parsing only sees it through
//! [`ParserConfig::from_process`](crate::config::ParserConfig::from_process).
//!
//! # Example
//!
//! ```
//! use lepton_calc::features::{FeatureCategory, FeatureSet};
//!
//! let mut features = FeatureSet::new();
//! features.disable("sin");
//! features.disable(FeatureSet::COMPLEX);
//!
//! assert!(features.is_disabled("sin"));
//! assert!(features.check(FeatureCategory::ComplexNumber).is_err());
//! assert!(features.check(FeatureCategory::Matrix).is_ok());
//! ```

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use log::debug;

use crate::errors::DisabledFeature;

/// The kind of thing a disabled feature refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureCategory {
    Function,
    Variable,
    ComplexNumber,
    Matrix,
    Graphing,
}

impl FeatureCategory {
    /// Key under which a whole category is stored in a [`FeatureSet`].
    ///
    /// Functions have no category key; they are stored under their own name.
    pub fn key(&self) -> Option<&'static str> {
        match self {
            FeatureCategory::Function => None,
            FeatureCategory::Variable => Some(FeatureSet::VARIABLES),
            FeatureCategory::ComplexNumber => Some(FeatureSet::COMPLEX),
            FeatureCategory::Matrix => Some(FeatureSet::MATRICES),
            FeatureCategory::Graphing => Some(FeatureSet::GRAPHING),
        }
    }

    /// Human-readable plural used in error messages.
    pub fn display_name(&self) -> &'static str {
        match self {
            FeatureCategory::Function => "Functions",
            FeatureCategory::Variable => "Variables",
            FeatureCategory::ComplexNumber => "Complex numbers",
            FeatureCategory::Matrix => "Matrices",
            FeatureCategory::Graphing => "Graphs",
        }
    }
}

impl fmt::Display for FeatureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FeatureCategory::Function => "function",
            FeatureCategory::Variable => "variable",
            FeatureCategory::ComplexNumber => "complex number",
            FeatureCategory::Matrix => "matrix",
            FeatureCategory::Graphing => "graphing",
        };
        f.write_str(name)
    }
}

/// Bit positions of the remote feature mask, lowest bit first.
const FEATURE_BITS: [&str; 49] = [
    "sin",
    "asin",
    "sinh",
    "asinh",
    "cos",
    "acos",
    "cosh",
    "acosh",
    "tan",
    "atan",
    "tanh",
    "atanh",
    "csc",
    "acsc",
    "csch",
    "acsch",
    "sec",
    "asec",
    "sech",
    "asech",
    "cot",
    "acot",
    "coth",
    "acoth",
    "log",
    "ln",
    "nPr",
    "nCr",
    "RNG",
    "GCD",
    "LCM",
    "fnInt",
    "sigma",
    "prod",
    "and",
    "or",
    "not",
    "xor",
    "lls",
    "lrs",
    "transpose",
    "det",
    "dot",
    "cross",
    "solveSOLE",
    FeatureSet::MATRICES,
    FeatureSet::VARIABLES,
    FeatureSet::COMPLEX,
    FeatureSet::GRAPHING,
];

/// A set of disabled function names and category keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureSet {
    disabled: BTreeSet<String>,
}

impl FeatureSet {
    /// Key disabling every free variable.
    pub const VARIABLES: &'static str = "variables";
    /// Key disabling the imaginary unit `i`.
    pub const COMPLEX: &'static str = "complex";
    /// Key disabling matrix references such as `[A]`.
    pub const MATRICES: &'static str = "matrices";
    /// Key disabling the graphing screen.
    pub const GRAPHING: &'static str = "graphing";

    /// Creates an empty set (everything enabled).
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes a remote feature mask.
    ///
    /// Bits without an assigned feature are ignored.
    pub fn from_bits(bits: u64) -> Self {
        let disabled = FEATURE_BITS
            .iter()
            .enumerate()
            .filter(|(bit, _)| bits & (1u64 << bit) != 0)
            .map(|(_, name)| name.to_string())
            .collect();
        Self { disabled }
    }

    /// Encodes the set as a remote feature mask.
    ///
    /// Names that have no bit assigned (e.g. `sqrt`) are not representable and are left out.
    pub fn bits(&self) -> u64 {
        FEATURE_BITS
            .iter()
            .enumerate()
            .filter(|(_, name)| self.disabled.contains(**name))
            .fold(0, |acc, (bit, _)| acc | (1u64 << bit))
    }

    pub fn disable(&mut self, name: impl Into<String>) {
        self.disabled.insert(name.into());
    }

    pub fn enable(&mut self, name: &str) {
        self.disabled.remove(name);
    }

    pub fn clear_all(&mut self) {
        self.disabled.clear();
    }

    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.disabled.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.disabled.iter().map(String::as_str)
    }

    /// Fails if the named function is disabled.
    pub fn check_function(&self, name: &str) -> Result<(), DisabledFeature> {
        if self.is_disabled(name) {
            debug!("refusing disabled function {name}");
            return Err(DisabledFeature::new(name, FeatureCategory::Function));
        }
        Ok(())
    }

    /// Fails if the whole category is disabled.
    pub fn check(&self, category: FeatureCategory) -> Result<(), DisabledFeature> {
        match category.key() {
            Some(key) if self.is_disabled(key) => {
                debug!("refusing disabled category {category}");
                Err(DisabledFeature::new(key, category))
            }
            _ => Ok(()),
        }
    }
}

impl<S: Into<String>> FromIterator<S> for FeatureSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            disabled: iter.into_iter().map(Into::into).collect(),
        }
    }
}

static PROCESS_FEATURES: RwLock<BTreeSet<String>> = RwLock::new(BTreeSet::new());

/// Disables a function name or category key for the whole process.
pub fn disable(name: &str) {
    PROCESS_FEATURES
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .insert(name.to_string());
}

/// Re-enables a single function name or category key for the whole process.
pub fn enable(name: &str) {
    PROCESS_FEATURES
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(name);
}

/// Re-enables everything for the whole process.
pub fn clear_all() {
    PROCESS_FEATURES
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .clear();
}

pub fn is_disabled(name: &str) -> bool {
    PROCESS_FEATURES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains(name)
}

/// Snapshot of the process-wide set.
pub fn process_features() -> FeatureSet {
    let disabled = PROCESS_FEATURES
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .clone();
    FeatureSet { disabled }
}
