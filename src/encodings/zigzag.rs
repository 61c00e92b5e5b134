//! ZigZag mapping of signed integers onto unsigned ones.
//!
//! `0, -1, 1, -2, 2, ...` map to `0, 1, 2, 3, 4, ...`, so values of small
//! magnitude stay small whatever their sign.

use std::sync::Arc;

use crate::array::{Array, PrimitiveArray};
use crate::dtype::DType;
use crate::error::StratumError;
use crate::ptype::{write_u64_le, PType};
use crate::scalar::Scalar;
use crate::Result;

#[inline]
pub(crate) fn zigzag_encode(value: i64) -> u64 {
    ((value << 1) ^ (value >> 63)) as u64
}

#[inline]
pub(crate) fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}

/// Signed integers stored as an unsigned child array. Validity lives on the child.
#[derive(Debug, Clone)]
pub struct ZigZagArray {
    dtype: DType,
    encoded: Arc<Array>,
}

impl ZigZagArray {
    /// Wrap an already mapped child of the same length and nullability, no wider
    /// than the logical type.
    pub fn try_new(dtype: DType, encoded: Array) -> Result<Self> {
        if !dtype.is_signed_int() {
            return Err(StratumError::CorruptEncoding(format!(
                "zigzag array cannot hold {dtype}"
            )));
        }
        if !encoded.dtype().is_unsigned_int()
            || encoded.dtype().nullability() != dtype.nullability()
        {
            return Err(StratumError::CorruptEncoding(format!(
                "zigzag child must be an unsigned integer with the nullability of {dtype}, got {}",
                encoded.dtype()
            )));
        }
        let width = |d: &DType| d.ptype().map_or(0, PType::byte_width);
        if width(encoded.dtype()) > width(&dtype) {
            return Err(StratumError::CorruptEncoding(format!(
                "zigzag child {} is wider than {dtype}",
                encoded.dtype()
            )));
        }
        Ok(ZigZagArray {
            dtype,
            encoded: Arc::new(encoded),
        })
    }

    /// Map a signed integer array. The child is narrowed to the smallest unsigned
    /// width that holds every mapped value.
    ///
    /// Fails with [`StratumError::UnsupportedEncoding`] for any other dtype.
    pub fn encode(array: &Array) -> Result<Self> {
        if !array.dtype().is_signed_int() {
            return Err(StratumError::UnsupportedEncoding {
                encoding: "zigzag",
                reason: format!("expected a signed integer, got {}", array.dtype()),
            });
        }
        let flat = array.flatten()?;
        let primitive = flat.as_primitive().ok_or_else(|| StratumError::UnsupportedEncoding {
            encoding: "zigzag",
            reason: format!("{} is not a primitive layout", flat.encoding()),
        })?;

        let mapped: Vec<u64> = (0..primitive.len())
            .map(|i| zigzag_encode(primitive.i64_at(i)))
            .collect();
        let ptype = PType::narrowest_unsigned(mapped.iter().copied().max().unwrap_or(0));
        let mut values = Vec::with_capacity(mapped.len() * ptype.byte_width());
        for value in mapped {
            write_u64_le(ptype, value, &mut values);
        }
        let encoded = PrimitiveArray::try_new(
            DType::from(ptype).with_nullability(array.dtype().nullability()),
            values.into(),
            primitive.validity().cloned(),
        )?;
        Ok(ZigZagArray {
            dtype: array.dtype().clone(),
            encoded: Arc::new(Array::from(encoded)),
        })
    }

    /// The logical type.
    #[inline]
    pub fn dtype(&self) -> &DType {
        &self.dtype
    }

    /// Number of values.
    #[inline]
    pub fn len(&self) -> usize {
        self.encoded.len()
    }

    /// Whether there are no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.encoded.is_empty()
    }

    /// The mapped unsigned child.
    pub fn encoded(&self) -> &Array {
        &self.encoded
    }

    fn bit_width(&self) -> u32 {
        self.dtype.ptype().map_or(64, |p| p.bit_width() as u32)
    }

    pub(crate) fn scalar_at_unchecked(&self, index: usize) -> Result<Scalar> {
        match self.encoded.scalar_at(index)? {
            Scalar::Null => Ok(Scalar::Null),
            scalar => {
                let mapped = scalar.as_u64().ok_or_else(|| {
                    StratumError::CorruptEncoding(format!("zigzag child holds {scalar}"))
                })?;
                Ok(Scalar::Int(sign_extend(zigzag_decode(mapped), self.bit_width())))
            }
        }
    }

    pub(crate) fn slice_unchecked(&self, start: usize, len: usize) -> Result<Self> {
        Ok(ZigZagArray {
            dtype: self.dtype.clone(),
            encoded: Arc::new(self.encoded.slice(start, len)?),
        })
    }

    /// Undo the mapping into a primitive array of the declared width.
    pub fn decode(&self) -> Result<PrimitiveArray> {
        let ptype = self
            .dtype
            .ptype()
            .ok_or_else(|| StratumError::CorruptEncoding(format!("zigzag array of {}", self.dtype)))?;
        let flat = self.encoded.flatten()?;
        let encoded = flat.as_primitive().ok_or_else(|| {
            StratumError::CorruptEncoding(format!(
                "zigzag child decoded to {} instead of primitive",
                flat.encoding()
            ))
        })?;
        let mut values = Vec::with_capacity(encoded.len() * ptype.byte_width());
        for i in 0..encoded.len() {
            write_u64_le(ptype, zigzag_decode(encoded.u64_at(i)) as u64, &mut values);
        }
        PrimitiveArray::try_new(self.dtype.clone(), values.into(), encoded.validity().cloned())
    }

    /// Bytes of the child.
    pub fn nbytes(&self) -> usize {
        self.encoded.nbytes()
    }
}

fn sign_extend(value: i64, bits: u32) -> i64 {
    if bits >= 64 {
        return value;
    }
    let shift = 64 - bits;
    (value << shift) >> shift
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping() {
        let pairs = [(0i64, 0u64), (-1, 1), (1, 2), (-2, 3), (2, 4)];
        for (signed, unsigned) in pairs {
            assert_eq!(zigzag_encode(signed), unsigned);
            assert_eq!(zigzag_decode(unsigned), signed);
        }
        assert_eq!(zigzag_encode(i64::MIN), u64::MAX);
        assert_eq!(zigzag_decode(u64::MAX), i64::MIN);
    }

    #[test]
    fn test_encode_narrows() {
        let array = Array::from(PrimitiveArray::from_vec(vec![-1i64, -1, 0, -1, 1, -1]));
        let zigzag = ZigZagArray::encode(&array).unwrap();
        assert_eq!(zigzag.encoded().dtype(), &DType::from(PType::U8));
        assert_eq!(zigzag.nbytes(), 6);
        let zigzag = Array::from(zigzag);
        assert_eq!(zigzag.scalar_at(0).unwrap(), Scalar::Int(-1));
        assert_eq!(zigzag.to_canonical().unwrap(), array);
    }

    #[test]
    fn test_nulls_travel_on_child() {
        let array = Array::from(PrimitiveArray::from_nullable_vec(vec![
            Some(i16::MIN),
            None,
            Some(i16::MAX),
        ]));
        let zigzag = Array::from(ZigZagArray::encode(&array).unwrap());
        assert!(!zigzag.is_valid(1).unwrap());
        assert_eq!(zigzag.scalar_at(0).unwrap(), Scalar::Int(i16::MIN as i64));
        assert_eq!(zigzag.to_canonical().unwrap(), array);
        assert_eq!(zigzag.slice(2, 1).unwrap().scalar_at(0).unwrap(), Scalar::Int(i16::MAX as i64));
    }

    #[test]
    fn test_rejects_unsigned() {
        let array = Array::from(PrimitiveArray::from_vec(vec![1u32, 2]));
        assert!(matches!(
            ZigZagArray::encode(&array),
            Err(StratumError::UnsupportedEncoding { .. })
        ));
        let floats = Array::from(PrimitiveArray::from_vec(vec![1.0f32]));
        assert!(matches!(
            ZigZagArray::encode(&floats),
            Err(StratumError::UnsupportedEncoding { .. })
        ));
    }

    #[test]
    fn test_child_wider_than_dtype() {
        let wide = Array::from(PrimitiveArray::from_vec(vec![1000u16]));
        let i8_dtype = DType::int(8, true, false).unwrap();
        assert!(matches!(
            ZigZagArray::try_new(i8_dtype.clone(), wide),
            Err(StratumError::CorruptEncoding(_))
        ));
        let narrow = Array::from(PrimitiveArray::from_vec(vec![255u8]));
        let zigzag = Array::from(ZigZagArray::try_new(i8_dtype, narrow).unwrap());
        assert_eq!(zigzag.scalar_at(0).unwrap(), Scalar::Int(-128));
    }
}
