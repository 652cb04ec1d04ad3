//! Pure word operations.
//!
//! Variadic operations fold left over their inputs, deepest word first.
//! Plain arithmetic aborts on overflow, underflow and zero divisors; the
//! `saturating_*` family clamps instead. Nothing wraps.

use crate::vm::error::{ArithmeticKind, VmError};
use crate::word::{Word, from_bool, truthy};

#[inline]
fn fault(op: &'static str, kind: ArithmeticKind) -> VmError {
    VmError::Arithmetic { op, kind }
}

#[inline]
fn fold_checked<F>(inputs: &[Word], op: &'static str, kind: ArithmeticKind, f: F) -> Result<Word, VmError>
where
    F: Fn(Word, Word) -> Option<Word>,
{
    let (first, rest) = split(inputs);
    rest.iter()
        .try_fold(first, |acc, x| f(acc, *x).ok_or_else(|| fault(op, kind)))
}

#[inline]
fn split(inputs: &[Word]) -> (Word, &[Word]) {
    match inputs.split_first() {
        Some((first, rest)) => (*first, rest),
        None => (Word::zero(), inputs),
    }
}

pub(super) fn add(inputs: &[Word]) -> Result<Word, VmError> {
    fold_checked(inputs, "add", ArithmeticKind::Overflow, |a, b| a.checked_add(b))
}

pub(super) fn sub(inputs: &[Word]) -> Result<Word, VmError> {
    fold_checked(inputs, "sub", ArithmeticKind::Underflow, |a, b| a.checked_sub(b))
}

pub(super) fn mul(inputs: &[Word]) -> Result<Word, VmError> {
    fold_checked(inputs, "mul", ArithmeticKind::Overflow, |a, b| a.checked_mul(b))
}

pub(super) fn div(inputs: &[Word]) -> Result<Word, VmError> {
    fold_checked(inputs, "div", ArithmeticKind::DivisionByZero, |a, b| a.checked_div(b))
}

pub(super) fn rem(inputs: &[Word]) -> Result<Word, VmError> {
    fold_checked(inputs, "mod", ArithmeticKind::DivisionByZero, |a, b| a.checked_rem(b))
}

pub(super) fn exp(inputs: &[Word]) -> Result<Word, VmError> {
    fold_checked(inputs, "exp", ArithmeticKind::Overflow, |a, b| a.checked_pow(b))
}

pub(super) fn min(inputs: &[Word]) -> Result<Word, VmError> {
    let (first, rest) = split(inputs);
    Ok(rest.iter().fold(first, |acc, x| acc.min(*x)))
}

pub(super) fn max(inputs: &[Word]) -> Result<Word, VmError> {
    let (first, rest) = split(inputs);
    Ok(rest.iter().fold(first, |acc, x| acc.max(*x)))
}

pub(super) fn saturating_add(inputs: &[Word]) -> Result<Word, VmError> {
    let (first, rest) = split(inputs);
    Ok(rest.iter().fold(first, |acc, x| acc.saturating_add(*x)))
}

pub(super) fn saturating_sub(inputs: &[Word]) -> Result<Word, VmError> {
    let (first, rest) = split(inputs);
    Ok(rest.iter().fold(first, |acc, x| acc.saturating_sub(*x)))
}

pub(super) fn saturating_mul(inputs: &[Word]) -> Result<Word, VmError> {
    let (first, rest) = split(inputs);
    Ok(rest.iter().fold(first, |acc, x| acc.saturating_mul(*x)))
}

pub(super) fn is_zero(inputs: &[Word]) -> Result<Word, VmError> {
    Ok(from_bool(inputs.iter().all(Word::is_zero)))
}

pub(super) fn equal_to(inputs: &[Word]) -> Result<Word, VmError> {
    Ok(from_bool(inputs[0] == inputs[1]))
}

pub(super) fn less_than(inputs: &[Word]) -> Result<Word, VmError> {
    Ok(from_bool(inputs[0] < inputs[1]))
}

pub(super) fn greater_than(inputs: &[Word]) -> Result<Word, VmError> {
    Ok(from_bool(inputs[0] > inputs[1]))
}

/// First input when every input is non-zero, otherwise zero.
pub(super) fn every(inputs: &[Word]) -> Result<Word, VmError> {
    if inputs.iter().all(truthy) {
        Ok(split(inputs).0)
    } else {
        Ok(Word::zero())
    }
}

/// First non-zero input, otherwise zero.
pub(super) fn any(inputs: &[Word]) -> Result<Word, VmError> {
    Ok(inputs.iter().copied().find(truthy).unwrap_or_default())
}

pub(super) fn eager_if(inputs: &[Word]) -> Result<Word, VmError> {
    Ok(if truthy(&inputs[0]) { inputs[1] } else { inputs[2] })
}
