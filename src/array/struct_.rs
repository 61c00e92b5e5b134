use std::sync::Arc;

use crate::array::{check_validity, Array};
use crate::bitpack::BitBuffer;
use crate::dtype::{DType, Field};
use crate::error::StratumError;
use crate::scalar::Scalar;
use crate::Result;

/// One child array per field, all of the same length, plus optional validity.
///
/// A struct with no fields still has an explicit length.
#[derive(Debug, Clone)]
pub struct StructArray {
    dtype: DType,
    fields: Vec<Array>,
    len: usize,
    validity: Option<BitBuffer>,
}

impl StructArray {
    /// Assemble a struct array. Each child must have its field's dtype and `len` elements.
    pub fn try_new(
        dtype: DType,
        fields: Vec<Array>,
        len: usize,
        validity: Option<BitBuffer>,
    ) -> Result<Self> {
        let declared = dtype.fields().ok_or_else(|| {
            StratumError::TypeMismatch(format!("struct array cannot hold {dtype}"))
        })?;
        if declared.len() != fields.len() {
            return Err(StratumError::TypeMismatch(format!(
                "{dtype} has {} fields, got {} arrays",
                declared.len(),
                fields.len()
            )));
        }
        for (field, array) in declared.iter().zip(&fields) {
            if &field.dtype != array.dtype() {
                return Err(StratumError::TypeMismatch(format!(
                    "field {} is {}, got an array of {}",
                    field.name,
                    field.dtype,
                    array.dtype()
                )));
            }
            if array.len() != len {
                return Err(StratumError::CorruptEncoding(format!(
                    "field {} has {} values, struct has {len}",
                    field.name,
                    array.len()
                )));
            }
        }
        let validity = check_validity(&dtype, validity, len)?;
        Ok(StructArray {
            dtype,
            fields,
            len,
            validity,
        })
    }

    /// A non-nullable struct from named columns of equal length.
    ///
    /// # Example
    /// ```
    /// use stratum::{Array, PrimitiveArray, StructArray, VarBinArray};
    ///
    /// let table = StructArray::from_fields([
    ///     ("id", Array::from(PrimitiveArray::from_vec(vec![1i64, 2]))),
    ///     ("name", Array::from(VarBinArray::from_strs(["a", "b"]))),
    /// ])
    /// .unwrap();
    /// assert_eq!(table.dtype().to_string(), "{id=int(64), name=utf8}");
    /// ```
    pub fn from_fields<N, I>(fields: I) -> Result<Self>
    where
        N: Into<Arc<str>>,
        I: IntoIterator<Item = (N, Array)>,
    {
        let (names, arrays): (Vec<Arc<str>>, Vec<Array>) = fields
            .into_iter()
            .map(|(name, array)| (name.into(), array))
            .unzip();
        let len = arrays.first().map_or(0, Array::len);
        let dtype = DType::struct_(
            names
                .into_iter()
                .zip(arrays.iter().map(|a| a.dtype().clone())),
            false,
        );
        Self::try_new(dtype, arrays, len, None)
    }

    /// The logical type.
    #[inline]
    pub fn dtype(&self) -> &DType {
        &self.dtype
    }

    /// Number of rows.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether there are no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Field declarations, in order.
    pub fn field_defs(&self) -> &[Field] {
        self.dtype.fields().unwrap_or(&[])
    }

    /// Field names, in order.
    pub fn names(&self) -> impl Iterator<Item = &Arc<str>> + '_ {
        self.field_defs().iter().map(|f| &f.name)
    }

    /// Child arrays, in field order.
    pub fn fields(&self) -> &[Array] {
        &self.fields
    }

    /// The child array for `name`.
    pub fn field_by_name(&self, name: &str) -> Option<&Array> {
        self.field_defs()
            .iter()
            .position(|f| &*f.name == name)
            .map(|i| &self.fields[i])
    }

    /// The validity bitmap, if any.
    pub fn validity(&self) -> Option<&BitBuffer> {
        self.validity.as_ref()
    }

    /// A struct with only the named fields, in the requested order.
    pub fn project(&self, names: &[&str]) -> Result<StructArray> {
        let mut fields = Vec::with_capacity(names.len());
        let mut defs = Vec::with_capacity(names.len());
        for name in names {
            let index = self
                .field_defs()
                .iter()
                .position(|f| &*f.name == *name)
                .ok_or_else(|| StratumError::UnknownColumn((*name).to_string()))?;
            defs.push(self.field_defs()[index].clone());
            fields.push(self.fields[index].clone());
        }
        Ok(StructArray {
            dtype: DType::Struct(defs.into(), self.dtype.nullability()),
            fields,
            len: self.len,
            validity: self.validity.clone(),
        })
    }

    /// Replace every field with `f(field)`. Each result must keep its dtype and length.
    pub(crate) fn map_fields<F>(&self, f: F) -> Result<StructArray>
    where
        F: FnMut(&Array) -> Result<Array>,
    {
        let fields = self.fields.iter().map(f).collect::<Result<Vec<_>>>()?;
        Self::try_new(self.dtype.clone(), fields, self.len, self.validity.clone())
    }

    pub(crate) fn is_valid_unchecked(&self, index: usize) -> bool {
        self.validity.as_ref().map_or(true, |v| v.value(index))
    }

    pub(crate) fn scalar_at_unchecked(&self, index: usize) -> Result<Scalar> {
        if !self.is_valid_unchecked(index) {
            return Ok(Scalar::Null);
        }
        let values = self
            .fields
            .iter()
            .map(|field| field.scalar_at(index))
            .collect::<Result<Vec<_>>>()?;
        Ok(Scalar::Struct(values))
    }

    pub(crate) fn slice_unchecked(&self, start: usize, len: usize) -> Result<Self> {
        let fields = self
            .fields
            .iter()
            .map(|field| field.slice(start, len))
            .collect::<Result<Vec<_>>>()?;
        Ok(StructArray {
            dtype: self.dtype.clone(),
            fields,
            len,
            validity: self.validity.as_ref().map(|v| v.slice(start, len)),
        })
    }

    /// Sum of the children's bytes plus validity bytes.
    pub fn nbytes(&self) -> usize {
        self.fields.iter().map(Array::nbytes).sum::<usize>()
            + self.validity.as_ref().map_or(0, BitBuffer::nbytes)
    }
}
