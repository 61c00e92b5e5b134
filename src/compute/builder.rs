use crate::array::{
    Array, BoolArray, NullArray, OffsetWidth, PrimitiveArray, StructArray, VarBinArray,
};
use crate::bitpack::BitBuffer;
use crate::dtype::DType;
use crate::error::StratumError;
use crate::ptype::{write_scalar_le, write_u64_le, PType};
use crate::scalar::Scalar;
use crate::Result;

enum Values {
    Null,
    Primitive { ptype: PType, bytes: Vec<u8> },
    VarBin { ends: Vec<u64>, bytes: Vec<u8>, offset_width: OffsetWidth },
    Bool(Vec<bool>),
    Struct(Vec<ArrayBuilder>),
}

/// Builds a canonical array of one dtype from pushed scalars.
///
/// # Example
/// ```
/// use stratum::{ArrayBuilder, DType, Scalar};
///
/// let mut builder = ArrayBuilder::new(&DType::utf8(true));
/// builder.push(&Scalar::from("a")).unwrap();
/// builder.push(&Scalar::Null).unwrap();
/// let array = builder.finish().unwrap();
/// assert_eq!(array.len(), 2);
/// assert!(!array.is_valid(1).unwrap());
/// ```
pub struct ArrayBuilder {
    dtype: DType,
    validity: Vec<bool>,
    values: Values,
}

impl ArrayBuilder {
    /// An empty builder for `dtype`.
    pub fn new(dtype: &DType) -> Self {
        Self::with_capacity(dtype, 0)
    }

    /// An empty builder for `dtype` with room for `capacity` values.
    pub fn with_capacity(dtype: &DType, capacity: usize) -> Self {
        let values = match dtype {
            DType::Null => Values::Null,
            DType::Bool(_) => Values::Bool(Vec::with_capacity(capacity)),
            DType::Int(..) | DType::Float(..) => {
                let ptype = dtype.ptype().unwrap_or(PType::I64);
                Values::Primitive {
                    ptype,
                    bytes: Vec::with_capacity(capacity * ptype.byte_width()),
                }
            }
            DType::Utf8(_) | DType::Binary(_) => Values::VarBin {
                ends: Vec::with_capacity(capacity),
                bytes: Vec::new(),
                offset_width: OffsetWidth::U32,
            },
            DType::Struct(fields, _) => Values::Struct(
                fields
                    .iter()
                    .map(|f| ArrayBuilder::with_capacity(&f.dtype, capacity))
                    .collect(),
            ),
        };
        ArrayBuilder {
            dtype: dtype.clone(),
            validity: Vec::with_capacity(capacity),
            values,
        }
    }

    /// Use `offset_width` for a Utf8 or Binary result. Ignored for other dtypes.
    pub fn with_offset_width(mut self, width: OffsetWidth) -> Self {
        if let Values::VarBin { offset_width, .. } = &mut self.values {
            *offset_width = width;
        }
        self
    }

    /// The dtype being built.
    pub fn dtype(&self) -> &DType {
        &self.dtype
    }

    /// Number of values pushed.
    pub fn len(&self) -> usize {
        self.validity.len()
    }

    /// Whether nothing was pushed.
    pub fn is_empty(&self) -> bool {
        self.validity.is_empty()
    }

    /// Append one value. A null into a non-nullable dtype, or a scalar of the wrong
    /// kind or range, fails with [`StratumError::TypeMismatch`].
    pub fn push(&mut self, scalar: &Scalar) -> Result<()> {
        if scalar.is_null() {
            if !self.dtype.is_nullable() {
                return Err(StratumError::TypeMismatch(format!(
                    "null pushed into non-nullable {}",
                    self.dtype
                )));
            }
            self.push_placeholder();
            self.validity.push(false);
            return Ok(());
        }

        let mismatch = || {
            StratumError::TypeMismatch(format!("cannot push {scalar:?} into {}", self.dtype))
        };
        match (&mut self.values, scalar) {
            (Values::Primitive { ptype, bytes }, Scalar::Int(_) | Scalar::UInt(_)) => {
                if !ptype.is_int() || !fits_int(*ptype, scalar) {
                    return Err(mismatch());
                }
                write_scalar_le(*ptype, scalar, bytes)?;
            }
            (Values::Primitive { ptype, bytes }, Scalar::Float(_)) => {
                if !ptype.is_float() {
                    return Err(mismatch());
                }
                write_scalar_le(*ptype, scalar, bytes)?;
            }
            (Values::VarBin { ends, bytes, .. }, Scalar::Utf8(value))
                if matches!(self.dtype, DType::Utf8(_)) =>
            {
                bytes.extend_from_slice(value.as_bytes());
                ends.push(bytes.len() as u64);
            }
            (Values::VarBin { ends, bytes, .. }, Scalar::Binary(value))
                if matches!(self.dtype, DType::Binary(_)) =>
            {
                bytes.extend_from_slice(value);
                ends.push(bytes.len() as u64);
            }
            (Values::Bool(bits), Scalar::Bool(value)) => bits.push(*value),
            (Values::Struct(fields), Scalar::Struct(values)) if fields.len() == values.len() => {
                // Validate every field before mutating any child.
                for (field, value) in fields.iter().zip(values) {
                    field.check(value)?;
                }
                for (field, value) in fields.iter_mut().zip(values) {
                    field.push(value)?;
                }
            }
            _ => return Err(mismatch()),
        }
        self.validity.push(true);
        Ok(())
    }

    /// Append a null.
    pub fn push_null(&mut self) -> Result<()> {
        self.push(&Scalar::Null)
    }

    /// Append every value of `array`.
    pub fn extend_from_array(&mut self, array: &Array) -> Result<()> {
        let flat = array.flatten()?;
        for i in 0..flat.len() {
            self.push(&flat.scalar_at(i)?)?;
        }
        Ok(())
    }

    /// Dry-run `push` without mutating.
    fn check(&self, scalar: &Scalar) -> Result<()> {
        let mut probe = ArrayBuilder::new(&self.dtype);
        probe.push(scalar)
    }

    /// Fill a slot whose value is never read: a null when the dtype allows it, a
    /// zero value otherwise. Used for fields under a null struct row.
    fn push_default(&mut self) {
        self.push_placeholder();
        self.validity.push(!self.dtype.is_nullable());
    }

    fn push_placeholder(&mut self) {
        match &mut self.values {
            Values::Null => {}
            Values::Primitive { ptype, bytes } => write_u64_le(*ptype, 0, bytes),
            Values::VarBin { ends, bytes, .. } => ends.push(bytes.len() as u64),
            Values::Bool(bits) => bits.push(false),
            Values::Struct(fields) => fields.iter_mut().for_each(ArrayBuilder::push_default),
        }
    }

    /// Build the array.
    pub fn finish(self) -> Result<Array> {
        let len = self.validity.len();
        let validity = self
            .dtype
            .is_nullable()
            .then(|| BitBuffer::from_bools(self.validity.iter().copied()));
        Ok(match self.values {
            Values::Null => Array::from(NullArray::new(len)),
            Values::Primitive { bytes, .. } => {
                Array::from(PrimitiveArray::try_new(self.dtype, bytes.into(), validity)?)
            }
            Values::VarBin {
                ends,
                bytes,
                offset_width,
            } => {
                if offset_width == OffsetWidth::U32 && bytes.len() as u64 > u32::MAX as u64 {
                    return Err(StratumError::InvalidArgument(format!(
                        "{} bytes do not fit 32-bit offsets",
                        bytes.len()
                    )));
                }
                let ptype = match offset_width {
                    OffsetWidth::U32 => PType::U32,
                    OffsetWidth::U64 => PType::U64,
                };
                let mut offsets = Vec::with_capacity((ends.len() + 1) * ptype.byte_width());
                write_u64_le(ptype, 0, &mut offsets);
                for end in ends {
                    write_u64_le(ptype, end, &mut offsets);
                }
                Array::from(VarBinArray::try_new(
                    self.dtype,
                    offsets.into(),
                    offset_width,
                    bytes.into(),
                    validity,
                )?)
            }
            Values::Bool(bits) => Array::from(BoolArray::try_new(
                self.dtype,
                BitBuffer::from_bools(bits),
                validity,
            )?),
            Values::Struct(fields) => {
                let fields = fields
                    .into_iter()
                    .map(ArrayBuilder::finish)
                    .collect::<Result<Vec<_>>>()?;
                Array::from(StructArray::try_new(self.dtype, fields, len, validity)?)
            }
        })
    }
}

fn fits_int(ptype: PType, scalar: &Scalar) -> bool {
    let value: i128 = match scalar {
        Scalar::Int(v) => *v as i128,
        Scalar::UInt(v) => *v as i128,
        _ => return false,
    };
    let bits = ptype.bit_width() as u32;
    if ptype.is_unsigned_int() {
        value >= 0 && value < (1i128 << bits)
    } else {
        let bound = 1i128 << (bits - 1);
        value >= -bound && value < bound
    }
}
