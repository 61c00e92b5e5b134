use crate::array::{Array, NullArray, OffsetWidth};
use crate::compute::ArrayBuilder;
use crate::dtype::DType;
use crate::error::StratumError;
use crate::Result;

/// Concatenate arrays of exactly `dtype` into one canonical array.
///
/// Utf8 and Binary results use 64-bit offsets if any input does.
pub fn concat(dtype: &DType, arrays: &[Array]) -> Result<Array> {
    for (i, array) in arrays.iter().enumerate() {
        if array.dtype() != dtype {
            return Err(StratumError::TypeMismatch(format!(
                "array {i} is {}, expected {dtype}",
                array.dtype()
            )));
        }
    }
    if let [single] = arrays {
        return single.flatten();
    }
    let len = arrays.iter().map(Array::len).sum();
    if dtype == &DType::Null {
        return Ok(Array::from(NullArray::new(len)));
    }

    let flattened = arrays
        .iter()
        .map(Array::flatten)
        .collect::<Result<Vec<_>>>()?;
    let wide = flattened
        .iter()
        .any(|a| matches!(a, Array::VarBin(v) if v.offset_width() == OffsetWidth::U64));
    let mut builder = ArrayBuilder::with_capacity(dtype, len);
    if wide {
        builder = builder.with_offset_width(OffsetWidth::U64);
    }
    for array in &flattened {
        builder.extend_from_array(array)?;
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::{PrimitiveArray, VarBinArray};
    use crate::scalar::Scalar;

    #[test]
    fn test_concat_ints() {
        let dtype = DType::default_int();
        let array = concat(
            &dtype,
            &[
                Array::from(PrimitiveArray::from_vec(vec![0i64, 1, 2])),
                Array::from(PrimitiveArray::from_vec(vec![3i64, 4, 5])),
            ],
        )
        .unwrap();
        assert_eq!(array, Array::from(PrimitiveArray::from_vec(vec![0i64, 1, 2, 3, 4, 5])));
    }

    #[test]
    fn test_concat_empty_list() {
        let array = concat(&DType::utf8(true), &[]).unwrap();
        assert_eq!(array.dtype(), &DType::utf8(true));
        assert!(array.is_empty());
    }

    #[test]
    fn test_concat_rejects_mixed() {
        let result = concat(
            &DType::utf8(false),
            &[
                Array::from(VarBinArray::from_strs(["a"])),
                Array::from(PrimitiveArray::from_vec(vec![1u8])),
            ],
        );
        assert!(matches!(result, Err(StratumError::TypeMismatch(_))));
    }

    #[test]
    fn test_concat_nullable_strings() {
        let dtype = DType::utf8(true);
        let array = concat(
            &dtype,
            &[
                Array::from(VarBinArray::from_nullable_strs([Some("x"), None])),
                Array::from(VarBinArray::from_nullable_strs([Some("y")])),
            ],
        )
        .unwrap();
        assert_eq!(
            array.scalars().unwrap(),
            vec![Scalar::from("x"), Scalar::Null, Scalar::from("y")]
        );
    }
}
