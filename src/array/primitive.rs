use bytes::Bytes;

use crate::array::check_validity;
use crate::bitpack::BitBuffer;
use crate::dtype::DType;
use crate::error::StratumError;
use crate::ptype::{i64_from_le, scalar_from_le, u64_from_le, write_u64_le, NativePType, PType};
use crate::scalar::Scalar;
use crate::Result;

/// Fixed-width numeric values in one little-endian buffer plus optional validity.
///
/// Null slots still occupy a value (zero when built by this crate).
///
/// # Example
/// ```
/// use stratum::{Array, PrimitiveArray, Scalar};
///
/// let array = Array::from(PrimitiveArray::from_nullable_vec(vec![Some(1i32), None, Some(3)]));
/// assert_eq!(array.len(), 3);
/// assert_eq!(array.scalar_at(1).unwrap(), Scalar::Null);
/// assert_eq!(array.nbytes(), 12 + 1);
/// ```
#[derive(Debug, Clone)]
pub struct PrimitiveArray {
    dtype: DType,
    ptype: PType,
    values: Bytes,
    validity: Option<BitBuffer>,
}

impl PrimitiveArray {
    /// Wrap a value buffer. `dtype` must be an Int or Float type.
    ///
    /// Fails with [`StratumError::CorruptEncoding`] if the buffer is not a whole
    /// number of values or the validity length disagrees.
    pub fn try_new(dtype: DType, values: Bytes, validity: Option<BitBuffer>) -> Result<Self> {
        let ptype = dtype.ptype().ok_or_else(|| {
            StratumError::TypeMismatch(format!("primitive array cannot hold {dtype}"))
        })?;
        if values.len() % ptype.byte_width() != 0 {
            return Err(StratumError::CorruptEncoding(format!(
                "{} bytes is not a multiple of the {ptype} width",
                values.len()
            )));
        }
        let len = values.len() / ptype.byte_width();
        let validity = check_validity(&dtype, validity, len)?;
        Ok(PrimitiveArray {
            dtype,
            ptype,
            values,
            validity,
        })
    }

    /// A non-nullable array of the given values.
    pub fn from_vec<T: NativePType>(values: Vec<T>) -> Self {
        let mut buffer = Vec::with_capacity(values.len() * T::PTYPE.byte_width());
        for value in values {
            value.write_le(&mut buffer);
        }
        PrimitiveArray {
            dtype: T::PTYPE.into(),
            ptype: T::PTYPE,
            values: buffer.into(),
            validity: None,
        }
    }

    /// A nullable array; `None` slots become nulls.
    pub fn from_nullable_vec<T: NativePType>(values: Vec<Option<T>>) -> Self {
        let mut buffer = Vec::with_capacity(values.len() * T::PTYPE.byte_width());
        let validity = BitBuffer::from_bools(values.iter().map(Option::is_some));
        for value in values {
            value.unwrap_or_default().write_le(&mut buffer);
        }
        PrimitiveArray {
            dtype: DType::from(T::PTYPE).as_nullable(),
            ptype: T::PTYPE,
            values: buffer.into(),
            validity: Some(validity),
        }
    }

    /// A non-nullable integer array of `ptype` from widened values, keeping the low bytes.
    pub(crate) fn from_u64_values<I: IntoIterator<Item = u64>>(ptype: PType, values: I) -> Self {
        let mut buffer = Vec::new();
        for value in values {
            write_u64_le(ptype, value, &mut buffer);
        }
        PrimitiveArray {
            dtype: ptype.into(),
            ptype,
            values: buffer.into(),
            validity: None,
        }
    }

    /// The logical type.
    #[inline]
    pub fn dtype(&self) -> &DType {
        &self.dtype
    }

    /// The physical value type.
    #[inline]
    pub fn ptype(&self) -> PType {
        self.ptype
    }

    /// Number of values.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len() / self.ptype.byte_width()
    }

    /// Whether there are no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The raw little-endian value buffer.
    pub fn values(&self) -> &Bytes {
        &self.values
    }

    /// The validity bitmap, if any.
    pub fn validity(&self) -> Option<&BitBuffer> {
        self.validity.as_ref()
    }

    /// Copy the values out as `T`. Fails with [`StratumError::TypeMismatch`] if `T`
    /// is not this array's physical type.
    pub fn typed_values<T: NativePType>(&self) -> Result<Vec<T>> {
        if T::PTYPE != self.ptype {
            return Err(StratumError::TypeMismatch(format!(
                "cannot read {} values as {}",
                self.ptype,
                T::PTYPE
            )));
        }
        Ok(self
            .values
            .chunks_exact(self.ptype.byte_width())
            .map(T::from_le_slice)
            .collect())
    }

    /// Raw little-endian bytes of the value at `index`. Callers check bounds.
    #[inline]
    pub(crate) fn value_bytes(&self, index: usize) -> &[u8] {
        let width = self.ptype.byte_width();
        &self.values[index * width..(index + 1) * width]
    }

    /// Integer value at `index` as raw u64 bits. Callers check bounds.
    #[inline]
    pub(crate) fn u64_at(&self, index: usize) -> u64 {
        u64_from_le(self.ptype, self.value_bytes(index))
    }

    /// Signed integer value at `index` sign-extended. Callers check bounds.
    #[inline]
    pub(crate) fn i64_at(&self, index: usize) -> i64 {
        i64_from_le(self.ptype, self.value_bytes(index))
    }

    pub(crate) fn is_valid_unchecked(&self, index: usize) -> bool {
        self.validity.as_ref().map_or(true, |v| v.value(index))
    }

    pub(crate) fn scalar_at_unchecked(&self, index: usize) -> Scalar {
        if !self.is_valid_unchecked(index) {
            return Scalar::Null;
        }
        scalar_from_le(self.ptype, self.value_bytes(index))
    }

    pub(crate) fn slice_unchecked(&self, start: usize, len: usize) -> Self {
        let width = self.ptype.byte_width();
        PrimitiveArray {
            dtype: self.dtype.clone(),
            ptype: self.ptype,
            values: self.values.slice(start * width..(start + len) * width),
            validity: self.validity.as_ref().map(|v| v.slice(start, len)),
        }
    }

    /// Value bytes plus validity bytes.
    pub fn nbytes(&self) -> usize {
        self.values.len() + self.validity.as_ref().map_or(0, BitBuffer::nbytes)
    }
}

#[cfg(test)]
mod tests {
    use half::f16;

    use super::*;
    use crate::array::Array;

    #[test]
    fn test_typed_values() {
        let array = PrimitiveArray::from_vec(vec![1u16, 2, 300]);
        assert_eq!(array.typed_values::<u16>().unwrap(), vec![1, 2, 300]);
        assert!(matches!(
            array.typed_values::<i16>(),
            Err(StratumError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_scalar_at_with_nulls() {
        let array = Array::from(PrimitiveArray::from_nullable_vec(vec![
            Some(-4i8),
            None,
            Some(7),
        ]));
        assert_eq!(array.dtype(), &DType::int(8, true, true).unwrap());
        assert_eq!(array.scalar_at(0).unwrap(), Scalar::Int(-4));
        assert_eq!(array.scalar_at(1).unwrap(), Scalar::Null);
        assert!(matches!(
            array.scalar_at(3),
            Err(StratumError::IndexOutOfBounds { index: 3, len: 3 })
        ));
    }

    #[test]
    fn test_half_floats() {
        let array = PrimitiveArray::from_vec(vec![f16::from_f32(0.5), f16::from_f32(-2.0)]);
        assert_eq!(array.dtype().to_string(), "float(16)");
        assert_eq!(array.scalar_at_unchecked(1), Scalar::Float(-2.0));
    }

    #[test]
    fn test_slice_shares_buffer() {
        let array = PrimitiveArray::from_vec(vec![1u32, 2, 3, 4]);
        let sliced = array.slice_unchecked(1, 2);
        assert_eq!(sliced.typed_values::<u32>().unwrap(), vec![2, 3]);
        assert_eq!(
            sliced.values().as_ptr(),
            array.values().slice(4..).as_ptr()
        );
        assert_eq!(sliced.nbytes(), 8);
    }

    #[test]
    fn test_try_new_rejects_ragged_buffer() {
        let result = PrimitiveArray::try_new(
            DType::int(32, true, false).unwrap(),
            Bytes::from_static(&[1, 2, 3]),
            None,
        );
        assert!(matches!(result, Err(StratumError::CorruptEncoding(_))));

        let result = PrimitiveArray::try_new(DType::utf8(false), Bytes::new(), None);
        assert!(matches!(result, Err(StratumError::TypeMismatch(_))));
    }
}
