use crate::array::{Array, BoolArray};
use crate::bitpack::BitBuffer;
use crate::dtype::DType;
use crate::error::StratumError;
use crate::Result;

fn bool_values(array: &Array) -> Result<Vec<Option<bool>>> {
    if !matches!(array.dtype(), DType::Bool(_)) {
        return Err(StratumError::TypeMismatch(format!(
            "boolean kernel over {}",
            array.dtype()
        )));
    }
    let flat = array.flatten()?;
    (0..flat.len())
        .map(|i| Ok(flat.scalar_at(i)?.as_bool()))
        .collect()
}

fn finish(values: Vec<Option<bool>>, nullable: bool) -> Result<Array> {
    let bits = BitBuffer::from_bools(values.iter().map(|v| v.unwrap_or(false)));
    let validity = nullable.then(|| BitBuffer::from_bools(values.iter().map(Option::is_some)));
    Ok(Array::from(BoolArray::try_new(DType::bool(nullable), bits, validity)?))
}

fn binary<F>(lhs: &Array, rhs: &Array, f: F) -> Result<Array>
where
    F: Fn(bool, bool) -> bool,
{
    if lhs.len() != rhs.len() {
        return Err(StratumError::InvalidArgument(format!(
            "boolean operands of length {} and {}",
            lhs.len(),
            rhs.len()
        )));
    }
    let (a, b) = (bool_values(lhs)?, bool_values(rhs)?);
    let values = a
        .into_iter()
        .zip(b)
        .map(|(a, b)| Some(f(a?, b?)))
        .collect();
    finish(values, lhs.dtype().is_nullable() || rhs.dtype().is_nullable())
}

/// Elementwise AND; null if either side is null.
pub fn and(lhs: &Array, rhs: &Array) -> Result<Array> {
    binary(lhs, rhs, |a, b| a & b)
}

/// Elementwise OR; null if either side is null.
pub fn or(lhs: &Array, rhs: &Array) -> Result<Array> {
    binary(lhs, rhs, |a, b| a | b)
}

/// Elementwise XOR; null if either side is null.
pub fn xor(lhs: &Array, rhs: &Array) -> Result<Array> {
    binary(lhs, rhs, |a, b| a ^ b)
}

/// Elementwise NOT; nulls stay null.
pub fn not(array: &Array) -> Result<Array> {
    let values = bool_values(array)?
        .into_iter()
        .map(|v| v.map(|b| !b))
        .collect();
    finish(values, array.dtype().is_nullable())
}
