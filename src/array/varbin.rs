use bytes::Bytes;

use crate::array::check_validity;
use crate::bitpack::BitBuffer;
use crate::dtype::DType;
use crate::error::StratumError;
use crate::ptype::{u64_from_le, write_u64_le, PType};
use crate::scalar::Scalar;
use crate::Result;

/// Width of the entries in a VarBin offsets buffer.
///
/// The width chosen at construction survives slicing, take and serialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OffsetWidth {
    /// 32-bit offsets.
    U32,
    /// 64-bit offsets, for byte buffers past 4 GiB.
    U64,
}

impl OffsetWidth {
    /// Bytes per offset.
    #[inline]
    pub const fn byte_width(self) -> usize {
        match self {
            OffsetWidth::U32 => 4,
            OffsetWidth::U64 => 8,
        }
    }

    #[inline]
    pub(crate) const fn ptype(self) -> PType {
        match self {
            OffsetWidth::U32 => PType::U32,
            OffsetWidth::U64 => PType::U64,
        }
    }

    /// The narrowest width able to address `total_bytes`.
    pub fn for_total_bytes(total_bytes: usize) -> Self {
        if total_bytes as u64 > u32::MAX as u64 {
            OffsetWidth::U64
        } else {
            OffsetWidth::U32
        }
    }

    pub(crate) fn tag(self) -> u8 {
        self.byte_width() as u8
    }

    pub(crate) fn from_tag(tag: u8) -> Result<Self> {
        match tag {
            4 => Ok(OffsetWidth::U32),
            8 => Ok(OffsetWidth::U64),
            other => Err(StratumError::CorruptEncoding(format!(
                "offset width must be 4 or 8 bytes, got {other}"
            ))),
        }
    }
}

/// Variable-length strings or byte strings.
///
/// `len + 1` absolute offsets index into a shared byte buffer; value `i` spans
/// `bytes[offsets[i]..offsets[i + 1]]`. Slices share both buffers.
#[derive(Debug, Clone)]
pub struct VarBinArray {
    dtype: DType,
    offsets: Bytes,
    offset_width: OffsetWidth,
    bytes: Bytes,
    validity: Option<BitBuffer>,
}

impl VarBinArray {
    /// Wrap offsets and bytes, validating the layout.
    ///
    /// Offsets must be non-decreasing and end inside `bytes`, and every valid Utf8
    /// value must be UTF-8; violations are [`StratumError::CorruptEncoding`].
    pub fn try_new(
        dtype: DType,
        offsets: Bytes,
        offset_width: OffsetWidth,
        bytes: Bytes,
        validity: Option<BitBuffer>,
    ) -> Result<Self> {
        if !matches!(dtype, DType::Utf8(_) | DType::Binary(_)) {
            return Err(StratumError::TypeMismatch(format!(
                "varbin array cannot hold {dtype}"
            )));
        }
        let width = offset_width.byte_width();
        if offsets.len() < width || offsets.len() % width != 0 {
            return Err(StratumError::CorruptEncoding(format!(
                "offsets buffer of {} bytes is not a non-empty run of {width}-byte entries",
                offsets.len()
            )));
        }
        let len = offsets.len() / width - 1;
        let validity = check_validity(&dtype, validity, len)?;

        let array = VarBinArray {
            dtype,
            offsets,
            offset_width,
            bytes,
            validity,
        };
        let mut previous = array.offset_at(0);
        for i in 1..=len {
            let next = array.offset_at(i);
            if next < previous {
                return Err(StratumError::CorruptEncoding(format!(
                    "offsets decrease at {i}: {previous} > {next}"
                )));
            }
            previous = next;
        }
        if previous > array.bytes.len() as u64 {
            return Err(StratumError::CorruptEncoding(format!(
                "offset {previous} past the end of {} bytes",
                array.bytes.len()
            )));
        }
        if matches!(array.dtype, DType::Utf8(_)) {
            for i in 0..len {
                if array.is_valid_unchecked(i) {
                    std::str::from_utf8(array.value_unchecked(i)).map_err(|e| {
                        StratumError::CorruptEncoding(format!("value {i} is not UTF-8: {e}"))
                    })?;
                }
            }
        }
        Ok(array)
    }

    /// A non-nullable Utf8 array.
    ///
    /// # Example
    /// ```
    /// use stratum::{Array, Scalar, VarBinArray};
    ///
    /// let array = Array::from(VarBinArray::from_strs(["a", "bc"]));
    /// assert_eq!(array.scalar_at(1).unwrap(), Scalar::from("bc"));
    /// ```
    pub fn from_strs<S: AsRef<str>>(values: impl IntoIterator<Item = S>) -> Self {
        Self::from_values(
            DType::utf8(false),
            values.into_iter().map(|s| Some(s.as_ref().as_bytes().to_vec())),
        )
    }

    /// A nullable Utf8 array; `None` slots become nulls.
    pub fn from_nullable_strs<S: AsRef<str>>(values: impl IntoIterator<Item = Option<S>>) -> Self {
        Self::from_values(
            DType::utf8(true),
            values
                .into_iter()
                .map(|s| s.map(|s| s.as_ref().as_bytes().to_vec())),
        )
    }

    /// A non-nullable Binary array.
    pub fn from_binary<B: AsRef<[u8]>>(values: impl IntoIterator<Item = B>) -> Self {
        Self::from_values(
            DType::binary(false),
            values.into_iter().map(|b| Some(b.as_ref().to_vec())),
        )
    }

    /// A nullable Binary array; `None` slots become nulls.
    pub fn from_nullable_binary<B: AsRef<[u8]>>(
        values: impl IntoIterator<Item = Option<B>>,
    ) -> Self {
        Self::from_values(
            DType::binary(true),
            values.into_iter().map(|b| b.map(|b| b.as_ref().to_vec())),
        )
    }

    fn from_values(dtype: DType, values: impl IntoIterator<Item = Option<Vec<u8>>>) -> Self {
        let mut ends = vec![0u64];
        let mut data = Vec::new();
        let mut valid = Vec::new();
        for value in values {
            valid.push(value.is_some());
            if let Some(value) = value {
                data.extend_from_slice(&value);
            }
            ends.push(data.len() as u64);
        }
        let offset_width = OffsetWidth::for_total_bytes(data.len());
        let mut offsets = Vec::with_capacity(ends.len() * offset_width.byte_width());
        for end in ends {
            write_u64_le(offset_width.ptype(), end, &mut offsets);
        }
        let validity = dtype
            .is_nullable()
            .then(|| BitBuffer::from_bools(valid));
        VarBinArray {
            dtype,
            offsets: offsets.into(),
            offset_width,
            bytes: data.into(),
            validity,
        }
    }

    /// The logical type.
    #[inline]
    pub fn dtype(&self) -> &DType {
        &self.dtype
    }

    /// Number of values.
    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len() / self.offset_width.byte_width() - 1
    }

    /// Whether there are no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The offset entry width.
    pub fn offset_width(&self) -> OffsetWidth {
        self.offset_width
    }

    /// The raw offsets buffer.
    pub fn offsets(&self) -> &Bytes {
        &self.offsets
    }

    /// The shared data buffer.
    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    /// The validity bitmap, if any.
    pub fn validity(&self) -> Option<&BitBuffer> {
        self.validity.as_ref()
    }

    #[inline]
    pub(crate) fn offset_at(&self, index: usize) -> u64 {
        let width = self.offset_width.byte_width();
        u64_from_le(
            self.offset_width.ptype(),
            &self.offsets[index * width..(index + 1) * width],
        )
    }

    /// Bytes of value `index`, ignoring validity. Callers check bounds.
    pub(crate) fn value_unchecked(&self, index: usize) -> &[u8] {
        let start = self.offset_at(index) as usize;
        let end = self.offset_at(index + 1) as usize;
        &self.bytes[start..end]
    }

    pub(crate) fn is_valid_unchecked(&self, index: usize) -> bool {
        self.validity.as_ref().map_or(true, |v| v.value(index))
    }

    pub(crate) fn scalar_at_unchecked(&self, index: usize) -> Result<Scalar> {
        if !self.is_valid_unchecked(index) {
            return Ok(Scalar::Null);
        }
        let value = self.value_unchecked(index).to_vec();
        match self.dtype {
            DType::Utf8(_) => String::from_utf8(value)
                .map(Scalar::Utf8)
                .map_err(|e| StratumError::CorruptEncoding(e.to_string())),
            _ => Ok(Scalar::Binary(value)),
        }
    }

    pub(crate) fn slice_unchecked(&self, start: usize, len: usize) -> Self {
        let width = self.offset_width.byte_width();
        VarBinArray {
            dtype: self.dtype.clone(),
            offsets: self.offsets.slice(start * width..(start + len + 1) * width),
            offset_width: self.offset_width,
            bytes: self.bytes.clone(),
            validity: self.validity.as_ref().map(|v| v.slice(start, len)),
        }
    }

    /// Offsets re-based to start at zero and the data span they address.
    pub(crate) fn rebased_buffers(&self) -> (Bytes, Bytes) {
        let first = self.offset_at(0);
        let last = self.offset_at(self.len());
        let data = self.bytes.slice(first as usize..last as usize);
        if first == 0 {
            return (self.offsets.clone(), data);
        }
        let mut offsets = Vec::with_capacity(self.offsets.len());
        for i in 0..=self.len() {
            write_u64_le(
                self.offset_width.ptype(),
                self.offset_at(i) - first,
                &mut offsets,
            );
        }
        (offsets.into(), data)
    }

    /// Offsets bytes, the data span they address and validity bytes.
    pub fn nbytes(&self) -> usize {
        let span = self.offset_at(self.len()) - self.offset_at(0);
        self.offsets.len() + span as usize + self.validity.as_ref().map_or(0, BitBuffer::nbytes)
    }
}
