//! The array value model.
//!
//! An [`Array`] is a logical sequence of values of one [`DType`] realized in one
//! physical encoding. The set of encodings is closed: every operation dispatches
//! with an exhaustive `match`, so adding an encoding is a compile error at every
//! site that needs to learn about it.
//!
//! Arrays are immutable. Buffers are reference counted ([`bytes::Bytes`] and
//! [`Arc`](std::sync::Arc)), so `clone` and `slice` are cheap views and the last
//! owner frees the memory.

use std::fmt::{Display, Formatter};

use crate::bitpack::BitBuffer;
use crate::dtype::DType;
use crate::encodings::{RoaringBoolArray, RoaringIntArray, RunEndArray, ZigZagArray};
use crate::error::{check_index, check_slice, StratumError};
use crate::scalar::Scalar;
use crate::Result;

mod bool;
mod chunked;
mod null;
mod primitive;
mod struct_;
mod varbin;

pub use self::bool::BoolArray;
pub use self::chunked::ChunkedArray;
pub use self::null::NullArray;
pub use self::primitive::PrimitiveArray;
pub use self::struct_::StructArray;
pub use self::varbin::{OffsetWidth, VarBinArray};

/// Identifies a physical encoding. The discriminant is the serialized tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum EncodingId {
    /// All-null array.
    Null = 0,
    /// Flat fixed-width values.
    Primitive = 1,
    /// Offsets into a byte buffer.
    VarBin = 2,
    /// Bit-packed booleans.
    Bool = 3,
    /// One child per field.
    Struct = 4,
    /// Concatenation of same-typed chunks.
    Chunked = 5,
    /// Run-end encoded values.
    RunEnd = 6,
    /// Set-bit positions in a roaring bitmap.
    RoaringBool = 7,
    /// Sorted distinct unsigned values in a roaring bitmap.
    RoaringInt = 8,
    /// Signed integers mapped onto unsigned ones.
    ZigZag = 9,
}

impl EncodingId {
    /// The one-byte tag written by the serializer.
    #[inline]
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Parse a serialized tag.
    pub fn from_tag(tag: u8) -> Result<Self> {
        Ok(match tag {
            0 => EncodingId::Null,
            1 => EncodingId::Primitive,
            2 => EncodingId::VarBin,
            3 => EncodingId::Bool,
            4 => EncodingId::Struct,
            5 => EncodingId::Chunked,
            6 => EncodingId::RunEnd,
            7 => EncodingId::RoaringBool,
            8 => EncodingId::RoaringInt,
            9 => EncodingId::ZigZag,
            other => {
                return Err(StratumError::CorruptEncoding(format!(
                    "unknown encoding tag {other}"
                )))
            }
        })
    }

    /// Stable encoding name.
    pub fn name(self) -> &'static str {
        match self {
            EncodingId::Null => "null",
            EncodingId::Primitive => "primitive",
            EncodingId::VarBin => "varbin",
            EncodingId::Bool => "bool",
            EncodingId::Struct => "struct",
            EncodingId::Chunked => "chunked",
            EncodingId::RunEnd => "runend",
            EncodingId::RoaringBool => "roaring.bool",
            EncodingId::RoaringInt => "roaring.int",
            EncodingId::ZigZag => "zigzag",
        }
    }

    /// Whether this encoding is a canonical (uncompressed) layout.
    pub fn is_canonical(self) -> bool {
        matches!(
            self,
            EncodingId::Null
                | EncodingId::Primitive
                | EncodingId::VarBin
                | EncodingId::Bool
                | EncodingId::Struct
                | EncodingId::Chunked
        )
    }
}

impl Display for EncodingId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed, nullable, immutable array in one of the supported encodings.
#[derive(Debug, Clone)]
pub enum Array {
    /// See [`NullArray`].
    Null(NullArray),
    /// See [`PrimitiveArray`].
    Primitive(PrimitiveArray),
    /// See [`VarBinArray`].
    VarBin(VarBinArray),
    /// See [`BoolArray`].
    Bool(BoolArray),
    /// See [`StructArray`].
    Struct(StructArray),
    /// See [`ChunkedArray`].
    Chunked(ChunkedArray),
    /// See [`RunEndArray`].
    RunEnd(RunEndArray),
    /// See [`RoaringBoolArray`].
    RoaringBool(RoaringBoolArray),
    /// See [`RoaringIntArray`].
    RoaringInt(RoaringIntArray),
    /// See [`ZigZagArray`].
    ZigZag(ZigZagArray),
}

impl Array {
    /// The logical type.
    pub fn dtype(&self) -> &DType {
        match self {
            Array::Null(_) => &DType::Null,
            Array::Primitive(a) => a.dtype(),
            Array::VarBin(a) => a.dtype(),
            Array::Bool(a) => a.dtype(),
            Array::Struct(a) => a.dtype(),
            Array::Chunked(a) => a.dtype(),
            Array::RunEnd(a) => a.dtype(),
            Array::RoaringBool(a) => a.dtype(),
            Array::RoaringInt(a) => a.dtype(),
            Array::ZigZag(a) => a.dtype(),
        }
    }

    /// Number of logical elements.
    pub fn len(&self) -> usize {
        match self {
            Array::Null(a) => a.len(),
            Array::Primitive(a) => a.len(),
            Array::VarBin(a) => a.len(),
            Array::Bool(a) => a.len(),
            Array::Struct(a) => a.len(),
            Array::Chunked(a) => a.len(),
            Array::RunEnd(a) => a.len(),
            Array::RoaringBool(a) => a.len(),
            Array::RoaringInt(a) => a.len(),
            Array::ZigZag(a) => a.len(),
        }
    }

    /// Whether the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The physical encoding.
    pub fn encoding(&self) -> EncodingId {
        match self {
            Array::Null(_) => EncodingId::Null,
            Array::Primitive(_) => EncodingId::Primitive,
            Array::VarBin(_) => EncodingId::VarBin,
            Array::Bool(_) => EncodingId::Bool,
            Array::Struct(_) => EncodingId::Struct,
            Array::Chunked(_) => EncodingId::Chunked,
            Array::RunEnd(_) => EncodingId::RunEnd,
            Array::RoaringBool(_) => EncodingId::RoaringBool,
            Array::RoaringInt(_) => EncodingId::RoaringInt,
            Array::ZigZag(_) => EncodingId::ZigZag,
        }
    }

    /// Whether slot `index` holds a value. Absent validity means every slot is valid.
    pub fn is_valid(&self, index: usize) -> Result<bool> {
        check_index(index, self.len())?;
        match self {
            Array::Null(_) => Ok(false),
            Array::Primitive(a) => Ok(a.is_valid_unchecked(index)),
            Array::VarBin(a) => Ok(a.is_valid_unchecked(index)),
            Array::Bool(a) => Ok(a.is_valid_unchecked(index)),
            Array::Struct(a) => Ok(a.is_valid_unchecked(index)),
            Array::Chunked(a) => {
                let (chunk, offset) = a.find_chunk(index)?;
                a.chunk(chunk).is_valid(offset)
            }
            Array::RunEnd(a) => a.values().is_valid(a.find_physical_index(index)?),
            Array::RoaringBool(_) | Array::RoaringInt(_) => Ok(true),
            Array::ZigZag(a) => a.encoded().is_valid(index),
        }
    }

    /// The logical value at `index`.
    pub fn scalar_at(&self, index: usize) -> Result<Scalar> {
        check_index(index, self.len())?;
        match self {
            Array::Null(_) => Ok(Scalar::Null),
            Array::Primitive(a) => Ok(a.scalar_at_unchecked(index)),
            Array::VarBin(a) => a.scalar_at_unchecked(index),
            Array::Bool(a) => Ok(a.scalar_at_unchecked(index)),
            Array::Struct(a) => a.scalar_at_unchecked(index),
            Array::Chunked(a) => {
                let (chunk, offset) = a.find_chunk(index)?;
                a.chunk(chunk).scalar_at(offset)
            }
            Array::RunEnd(a) => a.values().scalar_at(a.find_physical_index(index)?),
            Array::RoaringBool(a) => Ok(a.scalar_at_unchecked(index)),
            Array::RoaringInt(a) => a.scalar_at_unchecked(index),
            Array::ZigZag(a) => a.scalar_at_unchecked(index),
        }
    }

    /// A zero-copy view of `len` elements starting at `start`.
    pub fn slice(&self, start: usize, len: usize) -> Result<Array> {
        check_slice(start, len, self.len())?;
        Ok(match self {
            Array::Null(_) => Array::Null(NullArray::new(len)),
            Array::Primitive(a) => Array::Primitive(a.slice_unchecked(start, len)),
            Array::VarBin(a) => Array::VarBin(a.slice_unchecked(start, len)),
            Array::Bool(a) => Array::Bool(a.slice_unchecked(start, len)),
            Array::Struct(a) => Array::Struct(a.slice_unchecked(start, len)?),
            Array::Chunked(a) => Array::Chunked(a.slice_unchecked(start, len)?),
            Array::RunEnd(a) => Array::RunEnd(a.slice_unchecked(start, len)),
            Array::RoaringBool(a) => Array::RoaringBool(a.slice_unchecked(start, len)),
            Array::RoaringInt(a) => Array::RoaringInt(a.slice_unchecked(start, len)),
            Array::ZigZag(a) => Array::ZigZag(a.slice_unchecked(start, len)?),
        })
    }

    /// Resident bytes across the buffers this array views.
    pub fn nbytes(&self) -> usize {
        match self {
            Array::Null(_) => 0,
            Array::Primitive(a) => a.nbytes(),
            Array::VarBin(a) => a.nbytes(),
            Array::Bool(a) => a.nbytes(),
            Array::Struct(a) => a.nbytes(),
            Array::Chunked(a) => a.nbytes(),
            Array::RunEnd(a) => a.nbytes(),
            Array::RoaringBool(a) => a.nbytes(),
            Array::RoaringInt(a) => a.nbytes(),
            Array::ZigZag(a) => a.nbytes(),
        }
    }

    /// Decode into a canonical layout (Null, Primitive, VarBin, Bool, Struct or Chunked).
    ///
    /// Struct fields and chunks are canonicalized recursively.
    pub fn to_canonical(&self) -> Result<Array> {
        match self {
            Array::Null(_) | Array::Primitive(_) | Array::VarBin(_) | Array::Bool(_) => {
                Ok(self.clone())
            }
            Array::Struct(a) => Ok(Array::Struct(a.map_fields(|f| f.to_canonical())?)),
            Array::Chunked(a) => Ok(Array::Chunked(a.map_chunks(|c| c.to_canonical())?)),
            Array::RunEnd(a) => a.decode(),
            Array::RoaringBool(a) => a.decode().map(Array::Bool),
            Array::RoaringInt(a) => a.decode().map(Array::Primitive),
            Array::ZigZag(a) => a.decode().map(Array::Primitive),
        }
    }

    /// Decode into a canonical layout with every chunked array concatenated.
    pub fn flatten(&self) -> Result<Array> {
        match self {
            Array::Null(_) | Array::Primitive(_) | Array::VarBin(_) | Array::Bool(_) => {
                Ok(self.clone())
            }
            Array::Struct(a) => Ok(Array::Struct(a.map_fields(|f| f.flatten())?)),
            Array::Chunked(a) => crate::compute::concat(a.dtype(), a.chunks()),
            other => other.to_canonical()?.flatten(),
        }
    }

    /// Number of null slots.
    pub fn null_count(&self) -> Result<usize> {
        if !self.dtype().is_nullable() {
            return Ok(0);
        }
        let mut nulls = 0;
        for i in 0..self.len() {
            if !self.is_valid(i)? {
                nulls += 1;
            }
        }
        Ok(nulls)
    }

    /// Collect every value as a scalar.
    pub fn scalars(&self) -> Result<Vec<Scalar>> {
        let flat = self.flatten()?;
        (0..flat.len()).map(|i| flat.scalar_at(i)).collect()
    }

    /// The primitive array inside, if this is one.
    pub fn as_primitive(&self) -> Option<&PrimitiveArray> {
        match self {
            Array::Primitive(a) => Some(a),
            _ => None,
        }
    }

    /// The struct array inside, if this is one.
    pub fn as_struct(&self) -> Option<&StructArray> {
        match self {
            Array::Struct(a) => Some(a),
            _ => None,
        }
    }

    /// The bool array inside, if this is one.
    pub fn as_bool(&self) -> Option<&BoolArray> {
        match self {
            Array::Bool(a) => Some(a),
            _ => None,
        }
    }
}

impl PartialEq for Array {
    /// Same dtype, length, encoding and elementwise values (including nulls).
    fn eq(&self, other: &Self) -> bool {
        if self.dtype() != other.dtype()
            || self.len() != other.len()
            || self.encoding() != other.encoding()
        {
            return false;
        }
        (0..self.len()).all(|i| match (self.scalar_at(i), other.scalar_at(i)) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        })
    }
}

/// Validate a validity bitmap against an array's dtype and length.
///
/// A bitmap on a non-nullable dtype is dropped when it marks every slot valid and
/// rejected otherwise.
pub(crate) fn check_validity(
    dtype: &DType,
    validity: Option<BitBuffer>,
    len: usize,
) -> Result<Option<BitBuffer>> {
    let Some(validity) = validity else {
        return Ok(None);
    };
    if validity.len() != len {
        return Err(StratumError::CorruptEncoding(format!(
            "validity has {} bits for {len} values",
            validity.len()
        )));
    }
    if dtype.is_nullable() {
        return Ok(Some(validity));
    }
    if validity.count_set_bits() != len {
        return Err(StratumError::TypeMismatch(format!(
            "null values in non-nullable {dtype} array"
        )));
    }
    Ok(None)
}

macro_rules! impl_from_array {
    ($($variant:ident => $T:ty),+ $(,)?) => {
        $(impl From<$T> for Array {
            fn from(array: $T) -> Self {
                Array::$variant(array)
            }
        })+
    };
}

impl_from_array!(
    Null => NullArray,
    Primitive => PrimitiveArray,
    VarBin => VarBinArray,
    Bool => BoolArray,
    Struct => StructArray,
    Chunked => ChunkedArray,
    RunEnd => RunEndArray,
    RoaringBool => RoaringBoolArray,
    RoaringInt => RoaringIntArray,
    ZigZag => ZigZagArray,
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoding_tags_roundtrip() {
        for tag in 0..10u8 {
            assert_eq!(EncodingId::from_tag(tag).unwrap().tag(), tag);
        }
        assert!(matches!(
            EncodingId::from_tag(42),
            Err(StratumError::CorruptEncoding(_))
        ));
    }

    #[test]
    fn test_is_valid_bounds() {
        let array = Array::from(PrimitiveArray::from_nullable_vec(vec![Some(1i32), None]));
        assert!(array.is_valid(0).unwrap());
        assert!(!array.is_valid(1).unwrap());
        assert!(matches!(
            array.is_valid(2),
            Err(StratumError::IndexOutOfBounds { index: 2, len: 2 })
        ));
        assert_eq!(array.null_count().unwrap(), 1);
    }

    #[test]
    fn test_slice_bounds() {
        let array = Array::from(PrimitiveArray::from_vec(vec![1u8, 2, 3]));
        assert_eq!(array.slice(1, 2).unwrap().scalars().unwrap(), vec![Scalar::UInt(2), Scalar::UInt(3)]);
        assert!(matches!(
            array.slice(2, 2),
            Err(StratumError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_equality_requires_same_encoding() {
        let a = Array::from(PrimitiveArray::from_vec(vec![1i64, 1, 1]));
        let ree = Array::from(crate::encodings::RunEndArray::encode(&a).unwrap());
        assert_ne!(a, ree);
        assert_eq!(a, ree.to_canonical().unwrap());
    }
}
