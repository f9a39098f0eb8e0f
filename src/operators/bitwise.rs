//! Bitwise and logical operations on rounded integers.
//!
//! Operands are rounded to the nearest `i64`; matrices, complex numbers and values outside
//! the `i64` range are rejected.
//! Shifts are logical: the right shift does not propagate the sign bit.

use crate::errors::EvalError;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BitwiseOp {
    And,
    Or,
    Xor,
    Not,
    ShiftLeft,
    ShiftRight,
}

impl BitwiseOp {
    pub fn name(&self) -> &'static str {
        match self {
            BitwiseOp::And => "and",
            BitwiseOp::Or => "or",
            BitwiseOp::Xor => "xor",
            BitwiseOp::Not => "not",
            BitwiseOp::ShiftLeft => "lls",
            BitwiseOp::ShiftRight => "lrs",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let op = match name {
            "and" => BitwiseOp::And,
            "or" => BitwiseOp::Or,
            "xor" => BitwiseOp::Xor,
            "not" => BitwiseOp::Not,
            "lls" => BitwiseOp::ShiftLeft,
            "lrs" => BitwiseOp::ShiftRight,
            _ => return None,
        };
        Some(op)
    }

    pub fn arity(&self) -> usize {
        match self {
            BitwiseOp::Not => 1,
            _ => 2,
        }
    }

    pub fn is_symmetric(&self) -> bool {
        matches!(self, BitwiseOp::And | BitwiseOp::Or | BitwiseOp::Xor)
    }

    pub fn apply(&self, args: &[Value]) -> Result<Value, EvalError> {
        let ints = args
            .iter()
            .map(|v| rounded(v, self.name()))
            .collect::<Result<Vec<_>, _>>()?;

        let result = match (self, ints.as_slice()) {
            (BitwiseOp::Not, [a]) => !a,
            (BitwiseOp::And, [a, b]) => a & b,
            (BitwiseOp::Or, [a, b]) => a | b,
            (BitwiseOp::Xor, [a, b]) => a ^ b,
            (BitwiseOp::ShiftLeft, [a, b]) => {
                let shift = shift_amount(*b)?;
                ((*a as u64) << shift) as i64
            }
            (BitwiseOp::ShiftRight, [a, b]) => {
                let shift = shift_amount(*b)?;
                ((*a as u64) >> shift) as i64
            }
            _ => {
                return Err(EvalError::Domain(format!(
                    "{} expects {} arguments",
                    self.name(),
                    self.arity()
                )))
            }
        };
        Ok(Value::real(result as f64))
    }
}

/// `2^63`, the first magnitude outside `i64`.
const I64_LIMIT: f64 = 9_223_372_036_854_775_808.0;

fn rounded(value: &Value, op: &str) -> Result<i64, EvalError> {
    let x = value.expect_real(op)?.round();
    // NaN fails both comparisons
    if !(x >= -I64_LIMIT && x < I64_LIMIT) {
        return Err(EvalError::Domain(format!(
            "{op} operand {x} does not fit in a 64-bit integer"
        )));
    }
    Ok(x as i64)
}

fn shift_amount(b: i64) -> Result<u32, EvalError> {
    if !(0..64).contains(&b) {
        return Err(EvalError::Domain(format!(
            "shift amount {b} is out of range"
        )));
    }
    Ok(b as u32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(op: BitwiseOp, args: &[f64]) -> f64 {
        let args: Vec<Value> = args.iter().map(|x| Value::real(*x)).collect();
        op.apply(&args).unwrap().re()
    }

    #[test]
    fn test_logic() {
        assert_eq!(apply(BitwiseOp::And, &[12.0, 10.0]), 8.0);
        assert_eq!(apply(BitwiseOp::Or, &[12.0, 10.0]), 14.0);
        assert_eq!(apply(BitwiseOp::Xor, &[12.0, 10.0]), 6.0);
        assert_eq!(apply(BitwiseOp::Not, &[0.0]), -1.0);
    }

    #[test]
    fn test_operands_are_rounded() {
        assert_eq!(apply(BitwiseOp::And, &[11.6, 3.2]), 0.0);
    }

    #[test]
    fn test_shifts() {
        assert_eq!(apply(BitwiseOp::ShiftLeft, &[1.0, 4.0]), 16.0);
        assert_eq!(apply(BitwiseOp::ShiftRight, &[16.0, 2.0]), 4.0);
        assert!(apply(BitwiseOp::ShiftRight, &[-1.0, 1.0]) > 0.0);
        assert!(BitwiseOp::ShiftLeft
            .apply(&[Value::real(1.0), Value::real(64.0)])
            .is_err());
    }

    #[test]
    fn test_operands_outside_i64() {
        let ops = [
            BitwiseOp::And,
            BitwiseOp::Or,
            BitwiseOp::Xor,
            BitwiseOp::ShiftLeft,
            BitwiseOp::ShiftRight,
        ];
        for op in ops {
            for bad in [1e19, -1e19, f64::INFINITY, f64::NEG_INFINITY, f64::NAN] {
                assert!(op.apply(&[Value::real(bad), Value::real(1.0)]).is_err(), "{op:?} {bad}");
                assert!(op.apply(&[Value::real(1.0), Value::real(bad)]).is_err(), "{op:?} {bad}");
            }
        }
        assert!(BitwiseOp::Not.apply(&[Value::real(f64::NAN)]).is_err());
        assert_eq!(apply(BitwiseOp::Not, &[-9.223372036854775808e18]), i64::MAX as f64);
        assert_eq!(apply(BitwiseOp::And, &[4e18, 4e18]), 4e18);
    }

    #[test]
    fn test_rejects_complex() {
        assert!(BitwiseOp::And
            .apply(&[Value::complex(1.0, 1.0), Value::real(1.0)])
            .is_err());
    }
}
