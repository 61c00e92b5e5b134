//! Scanning a struct-typed array with projection, filtering and batching.

use std::io::Read;
use std::sync::Arc;

use tracing::debug;

use crate::array::{Array, ChunkedArray, StructArray};
use crate::dtype::DType;
use crate::error::StratumError;
use crate::expr::Expr;
use crate::serialize;
use crate::Result;

/// A table of named columns backed by one struct-typed array in any encoding.
///
/// # Example
/// ```
/// use stratum::expr::{col, lit};
/// use stratum::{Array, Dataset, PrimitiveArray, StructArray, VarBinArray};
///
/// let table = StructArray::from_fields([
///     ("id", Array::from(PrimitiveArray::from_vec(vec![1i64, 2, 3, 4]))),
///     ("name", Array::from(VarBinArray::from_strs(["a", "b", "c", "d"]))),
/// ])
/// .unwrap();
/// let dataset = Dataset::try_new(Array::from(table)).unwrap();
///
/// let filter = col("id").gt(lit(1i64));
/// let result = dataset
///     .to_array(Some(&["name"]), Some(2), Some(&filter))
///     .unwrap();
/// assert_eq!(result.len(), 3);
/// ```
#[derive(Debug, Clone)]
pub struct Dataset {
    array: Array,
}

impl Dataset {
    /// Wrap `array`, which must have a struct dtype ([`StratumError::TypeMismatch`]
    /// otherwise).
    pub fn try_new(array: Array) -> Result<Self> {
        if !matches!(array.dtype(), DType::Struct(..)) {
            return Err(StratumError::TypeMismatch(format!(
                "dataset requires a struct array, got {}",
                array.dtype()
            )));
        }
        Ok(Dataset { array })
    }

    /// Deserialize a dataset of the given struct dtype. See [`serialize::read`].
    pub fn read<R: Read>(dtype: &DType, source: &mut R) -> Result<Self> {
        Self::try_new(serialize::read(dtype, source)?)
    }

    /// The backing array, as stored.
    pub fn array(&self) -> &Array {
        &self.array
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.array.len()
    }

    /// Whether the dataset has no rows.
    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    /// Column names and dtypes, in order.
    pub fn schema(&self) -> Vec<(Arc<str>, DType)> {
        self.array
            .dtype()
            .fields()
            .unwrap_or_default()
            .iter()
            .map(|f| (f.name.clone(), f.dtype.clone()))
            .collect()
    }

    /// Materialize the rows matching `filter`, restricted to `columns`.
    ///
    /// - `columns` selects and orders the output fields; all fields when `None`.
    ///   Unknown names fail with [`StratumError::UnknownColumn`].
    /// - `filter` must evaluate to a Bool array; rows where it is false or null are
    ///   dropped. It may reference columns that are not projected.
    /// - `batch_size` splits the result into a Chunked array of struct slices with
    ///   at most that many rows each; zero fails with [`StratumError::InvalidArgument`].
    pub fn to_array(
        &self,
        columns: Option<&[&str]>,
        batch_size: Option<usize>,
        filter: Option<&Expr>,
    ) -> Result<Array> {
        if batch_size == Some(0) {
            return Err(StratumError::InvalidArgument(
                "batch size must be positive".into(),
            ));
        }
        let table = self.table()?;
        let rows_in = table.len();

        let mask = filter
            .map(|expr| {
                let mask = expr.evaluate(&table)?;
                if !matches!(mask.dtype(), DType::Bool(_)) {
                    return Err(StratumError::InvalidExpression(format!(
                        "filter {expr} evaluates to {}, not bool",
                        mask.dtype()
                    )));
                }
                Ok(mask)
            })
            .transpose()?;

        let projected = match columns {
            Some(names) => table.project(names)?,
            None => table,
        };
        let mut result = Array::from(projected);
        if let Some(mask) = mask {
            result = result.filter(&mask)?;
        }

        debug!(
            rows_in,
            rows_out = result.len(),
            columns = ?columns,
            filtered = filter.is_some(),
            "scanned dataset"
        );

        match batch_size {
            Some(size) => batch(result, size),
            None => Ok(result),
        }
    }

    /// Gather rows by position. See [`crate::compute::take`].
    pub fn take(&self, indices: &Array) -> Result<Array> {
        self.array.take(indices)
    }

    fn table(&self) -> Result<StructArray> {
        match self.array.flatten()? {
            Array::Struct(table) => Ok(table),
            other => Err(StratumError::TypeMismatch(format!(
                "dataset flattened to {} array",
                other.encoding()
            ))),
        }
    }
}

fn batch(array: Array, size: usize) -> Result<Array> {
    let mut chunks = Vec::with_capacity(array.len().div_ceil(size));
    let mut start = 0;
    while start < array.len() {
        let len = size.min(array.len() - start);
        chunks.push(array.slice(start, len)?);
        start += len;
    }
    Ok(Array::from(ChunkedArray::try_new(
        array.dtype().clone(),
        chunks,
    )?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::{PrimitiveArray, VarBinArray};
    use crate::compress::Compressor;
    use crate::expr::{col, lit};
    use crate::scalar::Scalar;

    fn dataset() -> Dataset {
        let table = StructArray::from_fields([
            (
                "id",
                Array::from(PrimitiveArray::from_vec((0..10u32).collect())),
            ),
            (
                "group",
                Array::from(VarBinArray::from_strs([
                    "a", "a", "a", "a", "b", "b", "b", "c", "c", "c",
                ])),
            ),
            (
                "score",
                Array::from(PrimitiveArray::from_nullable_vec(vec![
                    Some(-5i64),
                    Some(3),
                    None,
                    Some(8),
                    Some(-1),
                    Some(0),
                    Some(12),
                    None,
                    Some(7),
                    Some(2),
                ])),
            ),
        ])
        .unwrap();
        Dataset::try_new(Array::from(table)).unwrap()
    }

    #[test]
    fn test_schema() {
        let schema = dataset().schema();
        let names: Vec<&str> = schema.iter().map(|(n, _)| &**n).collect();
        assert_eq!(names, ["id", "group", "score"]);
        assert_eq!(schema[2].1, DType::int(64, true, true).unwrap());
    }

    #[test]
    fn test_projection_order_and_filter() {
        let filter = col("score").gt(lit(2i64));
        let result = dataset()
            .to_array(Some(&["score", "id"]), None, Some(&filter))
            .unwrap();
        let table = result.as_struct().unwrap();
        let names: Vec<&str> = table.names().map(|n| &**n).collect();
        assert_eq!(names, ["score", "id"]);
        assert_eq!(
            table.field_by_name("id").unwrap().scalars().unwrap(),
            vec![Scalar::UInt(1), Scalar::UInt(3), Scalar::UInt(6), Scalar::UInt(8)]
        );
    }

    #[test]
    fn test_batches() {
        let result = dataset().to_array(None, Some(4), None).unwrap();
        assert_eq!(result.encoding(), crate::array::EncodingId::Chunked);
        let Array::Chunked(chunked) = &result else {
            panic!("expected chunks");
        };
        let lens: Vec<usize> = chunked.chunks().iter().map(Array::len).collect();
        assert_eq!(lens, [4, 4, 2]);
        assert!(matches!(
            dataset().to_array(None, Some(0), None),
            Err(StratumError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_scan_compressed_and_serialized() {
        let original = dataset();
        let compressed = Compressor::default().compress(original.array()).unwrap();
        let bytes = serialize::to_bytes(&compressed).unwrap();
        let read = Dataset::read(compressed.dtype(), &mut bytes.as_slice()).unwrap();

        let filter = col("group").eq(lit("b")).or(col("id").eq(lit(0u64)));
        let expected = original.to_array(None, None, Some(&filter)).unwrap();
        let actual = read.to_array(None, None, Some(&filter)).unwrap();
        assert_eq!(actual.len(), 4);
        assert_eq!(actual.scalars().unwrap(), expected.scalars().unwrap());
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            dataset().to_array(Some(&["nope"]), None, None),
            Err(StratumError::UnknownColumn(_))
        ));
        let not_a_predicate = col("id");
        assert!(matches!(
            dataset().to_array(None, None, Some(&not_a_predicate)),
            Err(StratumError::InvalidExpression(_))
        ));
        let ints = Array::from(PrimitiveArray::from_vec(vec![1u8]));
        assert!(matches!(
            Dataset::try_new(ints),
            Err(StratumError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_take() {
        let indices = Array::from(PrimitiveArray::from_vec(vec![9u16, 0]));
        let rows = dataset().take(&indices).unwrap();
        assert_eq!(
            rows.scalar_at(0).unwrap(),
            Scalar::Struct(vec![Scalar::UInt(9), Scalar::from("c"), Scalar::Int(2)])
        );
    }
}
