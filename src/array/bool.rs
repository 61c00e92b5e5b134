use crate::array::check_validity;
use crate::bitpack::BitBuffer;
use crate::dtype::DType;
use crate::error::StratumError;
use crate::scalar::Scalar;
use crate::Result;

/// Booleans packed one bit per value, plus optional validity.
#[derive(Debug, Clone)]
pub struct BoolArray {
    dtype: DType,
    bits: BitBuffer,
    validity: Option<BitBuffer>,
}

impl BoolArray {
    /// Wrap packed bits. `dtype` must be a Bool type.
    pub fn try_new(dtype: DType, bits: BitBuffer, validity: Option<BitBuffer>) -> Result<Self> {
        if !matches!(dtype, DType::Bool(_)) {
            return Err(StratumError::TypeMismatch(format!(
                "bool array cannot hold {dtype}"
            )));
        }
        let validity = check_validity(&dtype, validity, bits.len())?;
        Ok(BoolArray {
            dtype,
            bits,
            validity,
        })
    }

    /// A non-nullable array of the given values.
    pub fn from_bools<I: IntoIterator<Item = bool>>(values: I) -> Self {
        BoolArray {
            dtype: DType::bool(false),
            bits: BitBuffer::from_bools(values),
            validity: None,
        }
    }

    /// A nullable array; `None` slots become nulls stored as `false`.
    pub fn from_nullable_bools<I: IntoIterator<Item = Option<bool>>>(values: I) -> Self {
        let values: Vec<Option<bool>> = values.into_iter().collect();
        BoolArray {
            dtype: DType::bool(true),
            bits: BitBuffer::from_bools(values.iter().map(|v| v.unwrap_or(false))),
            validity: Some(BitBuffer::from_bools(values.iter().map(Option::is_some))),
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
        self.bits.len()
    }

    /// Whether there are no values.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    /// The value bits; null slots hold an unspecified bit.
    pub fn bits(&self) -> &BitBuffer {
        &self.bits
    }

    /// The validity bitmap, if any.
    pub fn validity(&self) -> Option<&BitBuffer> {
        self.validity.as_ref()
    }

    /// Number of valid slots holding `true`.
    pub fn true_count(&self) -> usize {
        match &self.validity {
            None => self.bits.count_set_bits(),
            Some(validity) => self
                .bits
                .iter()
                .zip(validity.iter())
                .filter(|(bit, valid)| *bit && *valid)
                .count(),
        }
    }

    pub(crate) fn is_valid_unchecked(&self, index: usize) -> bool {
        self.validity.as_ref().map_or(true, |v| v.value(index))
    }

    pub(crate) fn scalar_at_unchecked(&self, index: usize) -> Scalar {
        if !self.is_valid_unchecked(index) {
            return Scalar::Null;
        }
        Scalar::Bool(self.bits.value(index))
    }

    pub(crate) fn slice_unchecked(&self, start: usize, len: usize) -> Self {
        BoolArray {
            dtype: self.dtype.clone(),
            bits: self.bits.slice(start, len),
            validity: self.validity.as_ref().map(|v| v.slice(start, len)),
        }
    }

    /// Packed value bytes plus validity bytes.
    pub fn nbytes(&self) -> usize {
        self.bits.nbytes() + self.validity.as_ref().map_or(0, BitBuffer::nbytes)
    }
}
