//! Booleans stored as the set of true positions in a roaring bitmap.

use std::sync::Arc;

use croaring::{Bitmap, Portable};

use crate::array::{Array, BoolArray};
use crate::bitpack::BitBuffer;
use crate::dtype::DType;
use crate::error::StratumError;
use crate::scalar::Scalar;
use crate::Result;

/// A bool array whose true positions live in a run-optimized roaring bitmap.
///
/// Every slot is valid; a nullable dtype is kept as declared.
#[derive(Debug, Clone)]
pub struct RoaringBoolArray {
    dtype: DType,
    bitmap: Arc<Bitmap>,
    offset: usize,
    len: usize,
}

impl RoaringBoolArray {
    /// Wrap a bitmap of true positions, viewing `len` positions from `offset`.
    pub fn try_new(dtype: DType, bitmap: Bitmap, offset: usize, len: usize) -> Result<Self> {
        if !matches!(dtype, DType::Bool(_)) {
            return Err(StratumError::CorruptEncoding(format!(
                "roaring bool array cannot hold {dtype}"
            )));
        }
        if offset.saturating_add(len) > u32::MAX as usize + 1 {
            return Err(StratumError::CorruptEncoding(format!(
                "roaring bool view {offset}+{len} exceeds the u32 position space"
            )));
        }
        Ok(RoaringBoolArray {
            dtype,
            bitmap: Arc::new(bitmap),
            offset,
            len,
        })
    }

    /// Encode a bool array without nulls.
    ///
    /// Fails with [`StratumError::UnsupportedEncoding`] for other dtypes, for
    /// arrays holding nulls, and for arrays longer than the u32 position space.
    pub fn encode(array: &Array) -> Result<Self> {
        let unsupported = |reason: String| StratumError::UnsupportedEncoding {
            encoding: "roaring.bool",
            reason,
        };
        if !matches!(array.dtype(), DType::Bool(_)) {
            return Err(unsupported(format!("expected bool, got {}", array.dtype())));
        }
        if array.len() > u32::MAX as usize {
            return Err(unsupported(format!("{} values exceed u32 positions", array.len())));
        }
        let flat = array.flatten()?;
        let bools = flat
            .as_bool()
            .ok_or_else(|| unsupported(format!("{} is not a bool layout", flat.encoding())))?;
        if bools
            .validity()
            .is_some_and(|v| v.count_set_bits() != v.len())
        {
            return Err(unsupported("array contains nulls".into()));
        }

        let mut bitmap = Bitmap::new();
        for position in bools.bits().set_indices() {
            bitmap.add(position as u32);
        }
        bitmap.run_optimize();
        Ok(RoaringBoolArray {
            dtype: array.dtype().clone(),
            bitmap: Arc::new(bitmap),
            offset: 0,
            len: array.len(),
        })
    }

    /// The logical type.
    #[inline]
    pub fn dtype(&self) -> &DType {
        &self.dtype
    }

    /// Number of values in this view.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the view is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The shared bitmap of true positions.
    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    /// Offset of this view into the bitmap's positions.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn scalar_at_unchecked(&self, index: usize) -> Scalar {
        Scalar::Bool(self.bitmap.contains((self.offset + index) as u32))
    }

    pub(crate) fn slice_unchecked(&self, start: usize, len: usize) -> Self {
        RoaringBoolArray {
            dtype: self.dtype.clone(),
            bitmap: self.bitmap.clone(),
            offset: self.offset + start,
            len,
        }
    }

    /// Expand into a packed bool array.
    pub fn decode(&self) -> Result<BoolArray> {
        let mut bits = vec![false; self.len];
        let end = self.offset + self.len;
        for position in self.bitmap.iter() {
            let position = position as usize;
            if position >= end {
                break;
            }
            if position >= self.offset {
                bits[position - self.offset] = true;
            }
        }
        BoolArray::try_new(self.dtype.clone(), BitBuffer::from_bools(bits), None)
    }

    /// Portable serialized size of the bitmap.
    pub fn nbytes(&self) -> usize {
        self.bitmap.get_serialized_size_in_bytes::<Portable>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::PrimitiveArray;

    #[test]
    fn test_positions() {
        let array = Array::from(BoolArray::from_bools([true, false, true, true]));
        let roaring = RoaringBoolArray::encode(&array).unwrap();
        assert_eq!(roaring.bitmap().iter().collect::<Vec<_>>(), vec![0, 2, 3]);
        let roaring = Array::from(roaring);
        assert_eq!(roaring.scalar_at(0).unwrap(), Scalar::Bool(true));
        assert_eq!(roaring.scalar_at(1).unwrap(), Scalar::Bool(false));
        assert_eq!(roaring.to_canonical().unwrap(), array);
    }

    #[test]
    fn test_long_runs_are_small() {
        let array = Array::from(BoolArray::from_bools(
            std::iter::repeat(false)
                .take(10_000)
                .chain(std::iter::repeat(true).take(10_000)),
        ));
        let roaring = RoaringBoolArray::encode(&array).unwrap();
        assert!(roaring.nbytes() < array.nbytes());
        assert_eq!(Array::from(roaring).to_canonical().unwrap(), array);
    }

    #[test]
    fn test_slice() {
        let array = Array::from(BoolArray::from_bools([false, true, true, false, true]));
        let roaring = Array::from(RoaringBoolArray::encode(&array).unwrap());
        let sliced = roaring.slice(1, 3).unwrap();
        assert_eq!(
            sliced.to_canonical().unwrap(),
            Array::from(BoolArray::from_bools([true, true, false]))
        );
    }

    #[test]
    fn test_rejects_nulls_and_non_bools() {
        let nullable = Array::from(BoolArray::from_nullable_bools([Some(true), None]));
        assert!(matches!(
            RoaringBoolArray::encode(&nullable),
            Err(StratumError::UnsupportedEncoding { .. })
        ));
        let ints = Array::from(PrimitiveArray::from_vec(vec![1u8]));
        assert!(matches!(
            RoaringBoolArray::encode(&ints),
            Err(StratumError::UnsupportedEncoding { .. })
        ));
    }

    #[test]
    fn test_nullable_dtype_preserved() {
        let array = Array::from(BoolArray::from_nullable_bools([Some(true), Some(false)]));
        let roaring = Array::from(RoaringBoolArray::encode(&array).unwrap());
        assert_eq!(roaring.dtype(), &DType::bool(true));
        let decoded = roaring.to_canonical().unwrap();
        assert_eq!(decoded.dtype(), &DType::bool(true));
        assert_eq!(decoded.scalars().unwrap(), array.scalars().unwrap());
    }
}
