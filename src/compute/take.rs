use crate::array::{Array, PrimitiveArray};
use crate::bitpack::BitBuffer;
use crate::compute::ArrayBuilder;
use crate::dtype::DType;
use crate::error::StratumError;
use crate::Result;

/// Gather the elements of `array` at `indices` into a new canonical array.
///
/// `indices` must be an unsigned integer array. A null index yields a null slot,
/// and then the result dtype is the nullable form of `array`'s dtype; otherwise
/// the dtype is unchanged. An index past the end fails with
/// [`StratumError::IndexOutOfBounds`].
pub fn take(array: &Array, indices: &Array) -> Result<Array> {
    if !indices.dtype().is_unsigned_int() {
        return Err(StratumError::TypeMismatch(format!(
            "take indices must be unsigned integers, got {}",
            indices.dtype()
        )));
    }
    let indices = indices.flatten()?;
    let indices = indices.as_primitive().ok_or_else(|| {
        StratumError::TypeMismatch(format!("indices decoded to {}", indices.encoding()))
    })?;

    let len = array.len();
    let mut positions = Vec::with_capacity(indices.len());
    for i in 0..indices.len() {
        if !indices.is_valid_unchecked(i) {
            positions.push(None);
            continue;
        }
        let index = indices.u64_at(i);
        if index >= len as u64 {
            return Err(StratumError::IndexOutOfBounds {
                index: usize::try_from(index).unwrap_or(usize::MAX),
                len,
            });
        }
        positions.push(Some(index as usize));
    }

    let dtype = if indices.dtype().is_nullable() {
        array.dtype().as_nullable()
    } else {
        array.dtype().clone()
    };
    let source = array.flatten()?;

    if let Array::Primitive(primitive) = &source {
        return take_primitive(primitive, dtype, &positions);
    }

    let mut builder = ArrayBuilder::with_capacity(&dtype, positions.len());
    if let Array::VarBin(varbin) = &source {
        builder = builder.with_offset_width(varbin.offset_width());
    }
    for position in positions {
        match position {
            Some(index) => builder.push(&source.scalar_at(index)?)?,
            None => builder.push_null()?,
        }
    }
    builder.finish()
}

/// Copies value bytes verbatim, so float payloads survive exactly.
fn take_primitive(
    array: &PrimitiveArray,
    dtype: DType,
    positions: &[Option<usize>],
) -> Result<Array> {
    let width = array.ptype().byte_width();
    let mut out = Vec::with_capacity(positions.len() * width);
    let mut validity = dtype
        .is_nullable()
        .then(|| Vec::with_capacity(positions.len()));
    for position in positions {
        let valid = match position {
            Some(index) => {
                out.extend_from_slice(array.value_bytes(*index));
                array.is_valid_unchecked(*index)
            }
            None => {
                out.resize(out.len() + width, 0);
                false
            }
        };
        if let Some(validity) = validity.as_mut() {
            validity.push(valid);
        }
    }
    Ok(Array::from(PrimitiveArray::try_new(
        dtype,
        out.into(),
        validity.map(BitBuffer::from_bools),
    )?))
}

/// Keep the elements of `array` where `mask` is true; false and null drop the row.
pub fn filter(array: &Array, mask: &Array) -> Result<Array> {
    if !matches!(mask.dtype(), crate::dtype::DType::Bool(_)) {
        return Err(StratumError::TypeMismatch(format!(
            "filter mask must be bool, got {}",
            mask.dtype()
        )));
    }
    if mask.len() != array.len() {
        return Err(StratumError::InvalidArgument(format!(
            "mask of {} values for array of {}",
            mask.len(),
            array.len()
        )));
    }
    let mask = mask.flatten()?;
    let mut selected = Vec::new();
    for i in 0..mask.len() {
        if mask.scalar_at(i)?.as_bool() == Some(true) {
            selected.push(i as u64);
        }
    }
    take(array, &Array::from(PrimitiveArray::from_vec(selected)))
}
