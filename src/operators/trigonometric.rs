//! Trigonometric and hyperbolic function family.
//!
//! All 24 functions take a purely real argument. The angle unit captured at parse time
//! applies to the circular functions only:
//!
//! - forward functions (`sin`, `cos`, ...) read their argument in that unit
//! - inverse functions (`asin`, `acos`, ...) return their result in that unit
//! - hyperbolic functions and their inverses ignore it

use crate::config::AngleUnit;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrigFunction {
    Sin,
    Cos,
    Tan,
    Sec,
    Csc,
    Cot,
    Asin,
    Acos,
    Atan,
    Asec,
    Acsc,
    Acot,
    Sinh,
    Cosh,
    Tanh,
    Sech,
    Csch,
    Coth,
    Asinh,
    Acosh,
    Atanh,
    Asech,
    Acsch,
    Acoth,
}

use TrigFunction::*;

const ALL: [TrigFunction; 24] = [
    Sin, Cos, Tan, Sec, Csc, Cot, Asin, Acos, Atan, Asec, Acsc, Acot, Sinh, Cosh, Tanh, Sech,
    Csch, Coth, Asinh, Acosh, Atanh, Asech, Acsch, Acoth,
];

impl TrigFunction {
    pub fn name(&self) -> &'static str {
        match self {
            Sin => "sin",
            Cos => "cos",
            Tan => "tan",
            Sec => "sec",
            Csc => "csc",
            Cot => "cot",
            Asin => "asin",
            Acos => "acos",
            Atan => "atan",
            Asec => "asec",
            Acsc => "acsc",
            Acot => "acot",
            Sinh => "sinh",
            Cosh => "cosh",
            Tanh => "tanh",
            Sech => "sech",
            Csch => "csch",
            Coth => "coth",
            Asinh => "asinh",
            Acosh => "acosh",
            Atanh => "atanh",
            Asech => "asech",
            Acsch => "acsch",
            Acoth => "acoth",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ALL.iter().copied().find(|f| f.name() == name)
    }

    /// `true` for the six circular functions that read an angle.
    pub fn is_forward(&self) -> bool {
        matches!(self, Sin | Cos | Tan | Sec | Csc | Cot)
    }

    /// `true` for the six circular inverses that return an angle.
    pub fn is_inverse(&self) -> bool {
        matches!(self, Asin | Acos | Atan | Asec | Acsc | Acot)
    }

    /// Evaluates the function at `x` under `unit`.
    pub fn apply(&self, x: f64, unit: AngleUnit) -> f64 {
        let k = unit.to_radians();
        let t = if self.is_forward() { x * k } else { x };
        let y = match self {
            Sin => t.sin(),
            Cos => t.cos(),
            Tan => t.tan(),
            Sec => 1.0 / t.cos(),
            Csc => 1.0 / t.sin(),
            Cot => 1.0 / t.tan(),
            Asin => t.asin(),
            Acos => t.acos(),
            Atan => t.atan(),
            Asec => (1.0 / t).acos(),
            Acsc => (1.0 / t).asin(),
            Acot => (1.0 / t).atan(),
            Sinh => t.sinh(),
            Cosh => t.cosh(),
            Tanh => t.tanh(),
            Sech => 1.0 / t.cosh(),
            Csch => 1.0 / t.sinh(),
            Coth => 1.0 / t.tanh(),
            Asinh => t.asinh(),
            Acosh => t.acosh(),
            Atanh => t.atanh(),
            Asech => (1.0 / t).acosh(),
            Acsch => (1.0 / t).asinh(),
            Acoth => (1.0 / t).atanh(),
        };
        if self.is_inverse() {
            y / k
        } else {
            y
        }
    }
}
