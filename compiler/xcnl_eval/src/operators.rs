//! Binary and unary operator semantics.
//!
//! The type set is closed, so dispatch is a direct match on operand pairs.
//! Mixed `Int`/`Uint` operands are computed as signed; any float operand
//! promotes the other side to float. `==`/`!=` between different types is
//! simply unequal rather than an error.

use xcnl_ir::{BinaryOp, UnaryOp};

use crate::errors::{
    binary_type_mismatch, division_by_zero, integer_overflow, invalid_binary_op_for,
    invalid_unary_op_for, modulo_by_zero, EvalError, EvalResult,
};
use crate::value::{CustomValue, Value};

#[inline]
fn checked_arith<T>(result: Option<T>, wrap: fn(T) -> Value, op_name: &'static str) -> EvalResult {
    result.map(wrap).ok_or_else(|| integer_overflow(op_name))
}

fn shift_amount(amount: i64) -> EvalResult<u32> {
    u32::try_from(amount)
        .ok()
        .filter(|&a| a < 64)
        .ok_or_else(|| EvalError::new(format!("shift amount {amount} out of range (0-63)")))
}

/// Evaluate `left op right`. `&&`/`||` here are the strict forms; the
/// interpreter short-circuits before reaching this.
pub fn evaluate_binary(left: &Value, right: &Value, op: BinaryOp) -> EvalResult {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => eval_int_binary(*a, *b, op),
        (Value::Uint(a), Value::Uint(b)) => eval_uint_binary(*a, *b, op),
        (Value::Int(_), Value::Uint(_)) | (Value::Uint(_), Value::Int(_)) => {
            match (left.as_i64(), right.as_i64()) {
                (Some(a), Some(b)) => eval_int_binary(a, b, op),
                _ => Err(integer_overflow("signed conversion")),
            }
        }
        (Value::Float(_), Value::Int(_) | Value::Uint(_) | Value::Float(_))
        | (Value::Int(_) | Value::Uint(_), Value::Float(_)) => {
            match (left.as_f64(), right.as_f64()) {
                (Some(a), Some(b)) => eval_float_binary(a, b, op),
                _ => Err(binary_type_mismatch(left.type_name(), right.type_name())),
            }
        }
        (Value::Bool(a), Value::Bool(b)) => eval_bool_binary(*a, *b, op),
        (Value::Str(a), Value::Str(b)) => eval_string_binary(a, b, op),
        (Value::Custom(a), Value::Custom(b)) => eval_custom_binary(a, b, op),
        _ => match op {
            BinaryOp::Eq => Ok(Value::Bool(false)),
            BinaryOp::NotEq => Ok(Value::Bool(true)),
            _ => Err(binary_type_mismatch(left.type_name(), right.type_name())),
        },
    }
}

fn eval_int_binary(a: i64, b: i64, op: BinaryOp) -> EvalResult {
    match op {
        BinaryOp::Add => checked_arith(a.checked_add(b), Value::Int, "addition"),
        BinaryOp::Sub => checked_arith(a.checked_sub(b), Value::Int, "subtraction"),
        BinaryOp::Mul => checked_arith(a.checked_mul(b), Value::Int, "multiplication"),
        BinaryOp::Div if b == 0 => Err(division_by_zero()),
        BinaryOp::Div => checked_arith(a.checked_div(b), Value::Int, "division"),
        BinaryOp::Mod if b == 0 => Err(modulo_by_zero()),
        BinaryOp::Mod => checked_arith(a.checked_rem(b), Value::Int, "remainder"),
        BinaryOp::Eq => Ok(Value::Bool(a == b)),
        BinaryOp::NotEq => Ok(Value::Bool(a != b)),
        BinaryOp::Lt => Ok(Value::Bool(a < b)),
        BinaryOp::LtEq => Ok(Value::Bool(a <= b)),
        BinaryOp::Gt => Ok(Value::Bool(a > b)),
        BinaryOp::GtEq => Ok(Value::Bool(a >= b)),
        BinaryOp::BitAnd => Ok(Value::Int(a & b)),
        BinaryOp::BitOr => Ok(Value::Int(a | b)),
        BinaryOp::BitXor => Ok(Value::Int(a ^ b)),
        BinaryOp::Shl => Ok(Value::Int(a << shift_amount(b)?)),
        BinaryOp::Shr => Ok(Value::Int(a >> shift_amount(b)?)),
        BinaryOp::And | BinaryOp::Or => Err(invalid_binary_op_for("integers", op)),
    }
}

fn eval_uint_binary(a: u64, b: u64, op: BinaryOp) -> EvalResult {
    let shift = |b: u64| shift_amount(i64::try_from(b).unwrap_or(i64::MAX));
    match op {
        BinaryOp::Add => checked_arith(a.checked_add(b), Value::Uint, "addition"),
        BinaryOp::Sub => checked_arith(a.checked_sub(b), Value::Uint, "subtraction"),
        BinaryOp::Mul => checked_arith(a.checked_mul(b), Value::Uint, "multiplication"),
        BinaryOp::Div if b == 0 => Err(division_by_zero()),
        BinaryOp::Div => Ok(Value::Uint(a / b)),
        BinaryOp::Mod if b == 0 => Err(modulo_by_zero()),
        BinaryOp::Mod => Ok(Value::Uint(a % b)),
        BinaryOp::Eq => Ok(Value::Bool(a == b)),
        BinaryOp::NotEq => Ok(Value::Bool(a != b)),
        BinaryOp::Lt => Ok(Value::Bool(a < b)),
        BinaryOp::LtEq => Ok(Value::Bool(a <= b)),
        BinaryOp::Gt => Ok(Value::Bool(a > b)),
        BinaryOp::GtEq => Ok(Value::Bool(a >= b)),
        BinaryOp::BitAnd => Ok(Value::Uint(a & b)),
        BinaryOp::BitOr => Ok(Value::Uint(a | b)),
        BinaryOp::BitXor => Ok(Value::Uint(a ^ b)),
        BinaryOp::Shl => Ok(Value::Uint(a << shift(b)?)),
        BinaryOp::Shr => Ok(Value::Uint(a >> shift(b)?)),
        BinaryOp::And | BinaryOp::Or => Err(invalid_binary_op_for("unsigned integers", op)),
    }
}

#[allow(clippy::float_cmp, reason = "IEEE comparison is the language semantics")]
fn eval_float_binary(a: f64, b: f64, op: BinaryOp) -> EvalResult {
    match op {
        BinaryOp::Add => Ok(Value::Float(a + b)),
        BinaryOp::Sub => Ok(Value::Float(a - b)),
        BinaryOp::Mul => Ok(Value::Float(a * b)),
        BinaryOp::Div => Ok(Value::Float(a / b)),
        BinaryOp::Mod => Ok(Value::Float(a % b)),
        BinaryOp::Eq => Ok(Value::Bool(a == b)),
        BinaryOp::NotEq => Ok(Value::Bool(a != b)),
        BinaryOp::Lt => Ok(Value::Bool(a < b)),
        BinaryOp::LtEq => Ok(Value::Bool(a <= b)),
        BinaryOp::Gt => Ok(Value::Bool(a > b)),
        BinaryOp::GtEq => Ok(Value::Bool(a >= b)),
        _ => Err(invalid_binary_op_for("floats", op)),
    }
}

fn eval_bool_binary(a: bool, b: bool, op: BinaryOp) -> EvalResult {
    match op {
        BinaryOp::And | BinaryOp::BitAnd => Ok(Value::Bool(a & b)),
        BinaryOp::Or | BinaryOp::BitOr => Ok(Value::Bool(a | b)),
        BinaryOp::BitXor => Ok(Value::Bool(a ^ b)),
        BinaryOp::Eq => Ok(Value::Bool(a == b)),
        BinaryOp::NotEq => Ok(Value::Bool(a != b)),
        _ => Err(invalid_binary_op_for("booleans", op)),
    }
}

fn eval_string_binary(a: &str, b: &str, op: BinaryOp) -> EvalResult {
    match op {
        BinaryOp::Add => {
            let mut joined = String::with_capacity(a.len() + b.len());
            joined.push_str(a);
            joined.push_str(b);
            Ok(Value::string(joined))
        }
        BinaryOp::Eq => Ok(Value::Bool(a == b)),
        BinaryOp::NotEq => Ok(Value::Bool(a != b)),
        BinaryOp::Lt => Ok(Value::Bool(a < b)),
        BinaryOp::LtEq => Ok(Value::Bool(a <= b)),
        BinaryOp::Gt => Ok(Value::Bool(a > b)),
        BinaryOp::GtEq => Ok(Value::Bool(a >= b)),
        _ => Err(invalid_binary_op_for("strings", op)),
    }
}

fn eval_custom_binary(a: &CustomValue, b: &CustomValue, op: BinaryOp) -> EvalResult {
    match op {
        BinaryOp::Eq => Ok(Value::Bool(a.eq_same_kind(b))),
        BinaryOp::NotEq => Ok(Value::Bool(!a.eq_same_kind(b))),
        _ => Err(invalid_binary_op_for(a.type_name(), op)),
    }
}

pub fn evaluate_unary(op: UnaryOp, value: &Value) -> EvalResult {
    match (op, value) {
        (UnaryOp::Neg, Value::Int(v)) => checked_arith(v.checked_neg(), Value::Int, "negation"),
        (UnaryOp::Neg, Value::Uint(_)) => match value.as_i64() {
            Some(v) => checked_arith(v.checked_neg(), Value::Int, "negation"),
            None => Err(integer_overflow("negation")),
        },
        (UnaryOp::Neg, Value::Float(v)) => Ok(Value::Float(-v)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::BitNot, Value::Int(v)) => Ok(Value::Int(!v)),
        (UnaryOp::BitNot, Value::Uint(v)) => Ok(Value::Uint(!v)),
        _ => Err(invalid_unary_op_for(value.type_name(), op)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::EvalErrorKind;
    use pretty_assertions::assert_eq;

    fn bin(l: Value, r: Value, op: BinaryOp) -> EvalResult {
        evaluate_binary(&l, &r, op)
    }

    #[test]
    fn test_int_arithmetic() {
        assert_eq!(bin(Value::Int(7), Value::Int(2), BinaryOp::Div).ok(), Some(Value::Int(3)));
        assert_eq!(bin(Value::Int(7), Value::Int(2), BinaryOp::Mod).ok(), Some(Value::Int(1)));
        assert_eq!(bin(Value::Int(1), Value::Int(4), BinaryOp::Shl).ok(), Some(Value::Int(16)));
        assert_eq!(
            bin(Value::Int(1), Value::Int(0), BinaryOp::Div).err().map(|e| e.kind),
            Some(EvalErrorKind::DivisionByZero)
        );
        assert!(bin(Value::Int(i64::MAX), Value::Int(1), BinaryOp::Add).is_err());
    }

    #[test]
    fn test_mixed_numeric_promotion() {
        assert_eq!(bin(Value::Int(-1), Value::Uint(3), BinaryOp::Add).ok(), Some(Value::Int(2)));
        assert_eq!(
            bin(Value::Uint(3), Value::Float(0.5), BinaryOp::Mul).ok(),
            Some(Value::Float(1.5))
        );
        assert_eq!(
            bin(Value::Int(2), Value::Float(2.0), BinaryOp::Eq).ok(),
            Some(Value::Bool(true))
        );
    }

    #[test]
    fn test_uint_underflow_is_an_error() {
        assert!(bin(Value::Uint(1), Value::Uint(2), BinaryOp::Sub).is_err());
    }

    #[test]
    fn test_string_ops() {
        assert_eq!(
            bin(Value::string("ab"), Value::string("cd"), BinaryOp::Add).ok(),
            Some(Value::string("abcd"))
        );
        assert!(bin(Value::string("a"), Value::string("b"), BinaryOp::Mul).is_err());
    }

    #[test]
    fn test_mismatched_equality_is_false() {
        assert_eq!(
            bin(Value::string("1"), Value::Int(1), BinaryOp::Eq).ok(),
            Some(Value::Bool(false))
        );
        assert_eq!(
            bin(Value::Empty, Value::Int(1), BinaryOp::NotEq).ok(),
            Some(Value::Bool(true))
        );
        assert!(bin(Value::string("1"), Value::Int(1), BinaryOp::Add).is_err());
    }

    #[test]
    fn test_unary() {
        assert_eq!(evaluate_unary(UnaryOp::Neg, &Value::Uint(3)).ok(), Some(Value::Int(-3)));
        assert_eq!(evaluate_unary(UnaryOp::Not, &Value::Bool(true)).ok(), Some(Value::Bool(false)));
        assert!(evaluate_unary(UnaryOp::Not, &Value::Int(1)).is_err());
    }
}
