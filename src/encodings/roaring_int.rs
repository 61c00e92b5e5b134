//! Strictly increasing unsigned integers stored as a roaring bitmap.

use std::sync::Arc;

use croaring::{Bitmap, Portable};

use crate::array::{Array, PrimitiveArray};
use crate::dtype::DType;
use crate::error::StratumError;
use crate::ptype::write_u64_le;
use crate::scalar::Scalar;
use crate::Result;

/// A sorted set of distinct unsigned integers. Element `i` is the set's `i`-th
/// smallest member; every slot is valid.
#[derive(Debug, Clone)]
pub struct RoaringIntArray {
    dtype: DType,
    bitmap: Arc<Bitmap>,
    offset: usize,
    len: usize,
}

impl RoaringIntArray {
    /// Wrap a bitmap, viewing `len` members from rank `offset`.
    pub fn try_new(dtype: DType, bitmap: Bitmap, offset: usize, len: usize) -> Result<Self> {
        if !dtype.is_unsigned_int() {
            return Err(StratumError::CorruptEncoding(format!(
                "roaring int array cannot hold {dtype}"
            )));
        }
        let cardinality = bitmap.cardinality();
        if offset as u64 + len as u64 > cardinality {
            return Err(StratumError::CorruptEncoding(format!(
                "view {offset}+{len} past the bitmap cardinality {cardinality}"
            )));
        }
        if let (Some(ptype), Some(max)) = (dtype.ptype(), bitmap.maximum()) {
            if ptype.bit_width() < 32 && u64::from(max) >> ptype.bit_width() != 0 {
                return Err(StratumError::CorruptEncoding(format!(
                    "bitmap member {max} does not fit {ptype}"
                )));
            }
        }
        Ok(RoaringIntArray {
            dtype,
            bitmap: Arc::new(bitmap),
            offset,
            len,
        })
    }

    /// Encode strictly increasing unsigned integers without nulls, all at most `u32::MAX`.
    ///
    /// # Example
    /// ```
    /// use stratum::{Array, PrimitiveArray, RoaringIntArray};
    ///
    /// let array = Array::from(PrimitiveArray::from_vec(vec![1u32, 5, 9]));
    /// let roaring = RoaringIntArray::encode(&array).unwrap();
    /// assert_eq!(Array::from(roaring).to_canonical().unwrap(), array);
    ///
    /// let unsorted = Array::from(PrimitiveArray::from_vec(vec![3u32, 1]));
    /// assert!(RoaringIntArray::encode(&unsorted).is_err());
    /// ```
    pub fn encode(array: &Array) -> Result<Self> {
        let unsupported = |reason: String| StratumError::UnsupportedEncoding {
            encoding: "roaring.int",
            reason,
        };
        if !array.dtype().is_unsigned_int() {
            return Err(unsupported(format!(
                "expected an unsigned integer, got {}",
                array.dtype()
            )));
        }
        let flat = array.flatten()?;
        let primitive = flat
            .as_primitive()
            .ok_or_else(|| unsupported(format!("{} is not a primitive layout", flat.encoding())))?;
        if primitive
            .validity()
            .is_some_and(|v| v.count_set_bits() != v.len())
        {
            return Err(unsupported("array contains nulls".into()));
        }

        let mut bitmap = Bitmap::new();
        let mut previous: Option<u64> = None;
        for i in 0..primitive.len() {
            let value = primitive.u64_at(i);
            if previous.is_some_and(|p| p >= value) {
                return Err(unsupported(format!("values not strictly increasing at {i}")));
            }
            let member = u32::try_from(value)
                .map_err(|_| unsupported(format!("value {value} exceeds u32::MAX")))?;
            bitmap.add(member);
            previous = Some(value);
        }
        bitmap.run_optimize();
        Ok(RoaringIntArray {
            dtype: array.dtype().clone(),
            bitmap: Arc::new(bitmap),
            offset: 0,
            len: primitive.len(),
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

    /// The shared bitmap of members.
    pub fn bitmap(&self) -> &Bitmap {
        &self.bitmap
    }

    /// Rank of this view's first member.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub(crate) fn scalar_at_unchecked(&self, index: usize) -> Result<Scalar> {
        let rank = (self.offset + index) as u32;
        self.bitmap
            .select(rank)
            .map(|v| Scalar::UInt(v.into()))
            .ok_or_else(|| StratumError::CorruptEncoding(format!("no bitmap member at rank {rank}")))
    }

    pub(crate) fn slice_unchecked(&self, start: usize, len: usize) -> Self {
        RoaringIntArray {
            dtype: self.dtype.clone(),
            bitmap: self.bitmap.clone(),
            offset: self.offset + start,
            len,
        }
    }

    /// Expand into a primitive array of the declared width.
    pub fn decode(&self) -> Result<PrimitiveArray> {
        let ptype = self.dtype.ptype().ok_or_else(|| {
            StratumError::CorruptEncoding(format!("roaring int array of {}", self.dtype))
        })?;
        let mut values = Vec::with_capacity(self.len * ptype.byte_width());
        for member in self.bitmap.iter().skip(self.offset).take(self.len) {
            write_u64_le(ptype, member.into(), &mut values);
        }
        PrimitiveArray::try_new(self.dtype.clone(), values.into(), None)
    }

    /// Portable serialized size of the bitmap.
    pub fn nbytes(&self) -> usize {
        self.bitmap.get_serialized_size_in_bytes::<Portable>()
    }
}
