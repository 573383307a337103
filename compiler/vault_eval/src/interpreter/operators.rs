//! Unary and binary operators.
//!
//! Direct enum-based dispatch over the fixed set of primitive types. All
//! integer arithmetic is checked; overflow is a language-level error.
//! Short-circuiting operators (`&&`, `||`, `??`) never reach this module.

use std::cmp::Ordering;

use vault_ir::{BinaryOp, UnaryOp};

use crate::errors::{
    division_by_zero, integer_overflow, type_mismatch, unreachable, EvalError, EvalResult,
};
use crate::value::{Int256, Value};

/// Evaluate a strict binary operation on two evaluated operands.
#[expect(
    clippy::needless_pass_by_value,
    reason = "Operands are consumed by the trampoline continuation that calls this"
)]
pub(super) fn evaluate_binary(op: BinaryOp, left: Value, right: Value) -> EvalResult {
    match op {
        BinaryOp::Eq => return Ok(Value::Bool(left == right)),
        BinaryOp::NotEq => return Ok(Value::Bool(left != right)),
        BinaryOp::And | BinaryOp::Or | BinaryOp::Coalesce => {
            return Err(unreachable(format!(
                "short-circuit operator {} evaluated strictly",
                op.as_symbol()
            )));
        }
        _ => {}
    }

    match (&left, &right) {
        (Value::Int(a), Value::Int(b)) => eval_int(op, *a, *b, &left, &right),
        (Value::UInt64(a), Value::UInt64(b)) => eval_uint(op, *a, *b, &left, &right),
        (Value::Int256(a), Value::Int256(b)) => eval_int256(op, a, b, &left, &right),
        (Value::Str(a), Value::Str(b)) => match op {
            BinaryOp::Add => Ok(Value::string(&format!("{a}{b}"))),
            _ => compare(op, a.cmp(b)).ok_or_else(|| mismatch(&left, &right)),
        },
        (Value::Address(a), Value::Address(b)) => {
            compare(op, a.cmp(b)).ok_or_else(|| mismatch(&left, &right))
        }
        _ => Err(mismatch(&left, &right)),
    }
}

/// Evaluate a unary operation.
pub(super) fn evaluate_unary(op: UnaryOp, value: Value) -> EvalResult {
    match (op, &value) {
        (UnaryOp::Neg, Value::Int(n)) => n
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| integer_overflow("-", &Value::Int(0), &value)),
        (UnaryOp::Neg, Value::Int256(n)) => n
            .checked_neg()
            .map(Value::Int256)
            .ok_or_else(|| integer_overflow("-", &Value::Int256(Int256::zero()), &value)),
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Neg, _) => Err(type_mismatch("signed integer", value.type_name())),
        (UnaryOp::Not, _) => Err(type_mismatch("Bool", value.type_name())),
    }
}

fn eval_int(op: BinaryOp, a: i64, b: i64, left: &Value, right: &Value) -> EvalResult {
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div | BinaryOp::Mod if b == 0 => return Err(division_by_zero()),
        BinaryOp::Div => a.checked_div(b),
        BinaryOp::Mod => a.checked_rem(b),
        _ => return compare(op, a.cmp(&b)).ok_or_else(|| mismatch(left, right)),
    };
    result
        .map(Value::Int)
        .ok_or_else(|| integer_overflow(op.as_symbol(), left, right))
}

fn eval_uint(op: BinaryOp, a: u64, b: u64, left: &Value, right: &Value) -> EvalResult {
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div | BinaryOp::Mod if b == 0 => return Err(division_by_zero()),
        BinaryOp::Div => a.checked_div(b),
        BinaryOp::Mod => a.checked_rem(b),
        _ => return compare(op, a.cmp(&b)).ok_or_else(|| mismatch(left, right)),
    };
    result
        .map(Value::UInt64)
        .ok_or_else(|| integer_overflow(op.as_symbol(), left, right))
}

fn eval_int256(op: BinaryOp, a: &Int256, b: &Int256, left: &Value, right: &Value) -> EvalResult {
    let result = match op {
        BinaryOp::Add => a.checked_add(b),
        BinaryOp::Sub => a.checked_sub(b),
        BinaryOp::Mul => a.checked_mul(b),
        BinaryOp::Div | BinaryOp::Mod if b.is_zero() => return Err(division_by_zero()),
        BinaryOp::Div => a.checked_div(b),
        BinaryOp::Mod => a.checked_rem(b),
        _ => return compare(op, a.cmp(b)).ok_or_else(|| mismatch(left, right)),
    };
    result
        .map(Value::Int256)
        .ok_or_else(|| integer_overflow(op.as_symbol(), left, right))
}

/// Apply a comparison operator to an ordering. `None` if `op` is not a
/// comparison.
fn compare(op: BinaryOp, ordering: Ordering) -> Option<Value> {
    let result = match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::LtEq => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        BinaryOp::GtEq => ordering.is_ge(),
        _ => return None,
    };
    Some(Value::Bool(result))
}

#[cold]
fn mismatch(left: &Value, right: &Value) -> EvalError {
    type_mismatch(left.type_name(), right.type_name())
}
