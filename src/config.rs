//! Parser configuration.
//!
//! The angle unit and the disabled-feature set are captured when an expression is parsed.
//! Changing either afterwards does not affect trees that were already built.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::features::{self, FeatureSet};

/// Unit used by trigonometric functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AngleUnit {
    #[default]
    Radians,
    Degrees,
}

impl AngleUnit {
    /// Factor converting one unit of this kind into radians.
    pub fn to_radians(&self) -> f64 {
        match self {
            AngleUnit::Radians => 1.0,
            AngleUnit::Degrees => std::f64::consts::PI / 180.0,
        }
    }

    pub fn is_degrees(&self) -> bool {
        matches!(self, AngleUnit::Degrees)
    }
}

impl fmt::Display for AngleUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AngleUnit::Radians => f.write_str("Radians"),
            AngleUnit::Degrees => f.write_str("Degrees"),
        }
    }
}

/// Everything the lexer and parser consult besides the input text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserConfig {
    pub angle_unit: AngleUnit,
    pub disabled: FeatureSet,
}

impl ParserConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the process-wide angle unit and disabled-feature set.
    pub fn from_process() -> Self {
        Self {
            angle_unit: angle_unit(),
            disabled: features::process_features(),
        }
    }

    pub fn with_angle_unit(mut self, angle_unit: AngleUnit) -> Self {
        self.angle_unit = angle_unit;
        self
    }

    pub fn with_disabled(mut self, disabled: FeatureSet) -> Self {
        self.disabled = disabled;
        self
    }
}

static PROCESS_DEGREES: AtomicBool = AtomicBool::new(false);

/// Sets the process-wide angle unit used by [`ParserConfig::from_process`].
pub fn set_angle_unit(unit: AngleUnit) {
    PROCESS_DEGREES.store(unit.is_degrees(), Ordering::Relaxed);
}

/// Reads the process-wide angle unit.
pub fn angle_unit() -> AngleUnit {
    if PROCESS_DEGREES.load(Ordering::Relaxed) {
        AngleUnit::Degrees
    } else {
        AngleUnit::Radians
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degree_factor() {
        assert_eq!(AngleUnit::Radians.to_radians(), 1.0);
        assert!((AngleUnit::Degrees.to_radians() * 180.0 - std::f64::consts::PI).abs() < 1e-15);
    }

    #[test]
    fn test_builder() {
        let mut disabled = FeatureSet::new();
        disabled.disable("tan");
        let config = ParserConfig::new()
            .with_angle_unit(AngleUnit::Degrees)
            .with_disabled(disabled);
        assert!(config.angle_unit.is_degrees());
        assert!(config.disabled.is_disabled("tan"));
    }
}
