//! One-pass array statistics consumed by the compressor.

use crate::array::Array;
use crate::dtype::DType;
use crate::scalar::Scalar;
use crate::Result;

/// Summary statistics of an array.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayStats {
    /// Number of elements.
    pub len: usize,
    /// Number of null slots.
    pub null_count: usize,
    /// Number of maximal runs of equal adjacent values (nulls included).
    pub run_count: usize,
    /// Number of valid `true` values, for Bool arrays.
    pub true_count: Option<usize>,
    /// Smallest valid value, for integer arrays.
    pub min: Option<i128>,
    /// Largest valid value, for integer arrays.
    pub max: Option<i128>,
    /// Whether the valid values strictly increase, for integer arrays.
    pub is_strict_sorted: Option<bool>,
}

impl ArrayStats {
    /// Compute statistics in a single pass over the flattened array.
    ///
    /// # Example
    /// ```
    /// use stratum::{Array, ArrayStats, PrimitiveArray};
    ///
    /// let array = Array::from(PrimitiveArray::from_vec(vec![3i8, 3, -1, 4]));
    /// let stats = ArrayStats::compute(&array).unwrap();
    /// assert_eq!(stats.run_count, 3);
    /// assert_eq!(stats.min, Some(-1));
    /// assert_eq!(stats.is_strict_sorted, Some(false));
    /// ```
    pub fn compute(array: &Array) -> Result<Self> {
        let flat = array.flatten()?;
        let is_int = matches!(flat.dtype(), DType::Int(..));
        let is_bool = matches!(flat.dtype(), DType::Bool(_));

        let mut stats = ArrayStats {
            len: flat.len(),
            null_count: 0,
            run_count: 0,
            true_count: is_bool.then_some(0),
            min: None,
            max: None,
            is_strict_sorted: is_int.then_some(true),
        };

        let mut previous: Option<Scalar> = None;
        let mut previous_int: Option<i128> = None;
        for i in 0..flat.len() {
            let value = flat.scalar_at(i)?;
            if previous.as_ref() != Some(&value) {
                stats.run_count += 1;
            }
            match &value {
                Scalar::Null => stats.null_count += 1,
                Scalar::Bool(true) => {
                    if let Some(count) = stats.true_count.as_mut() {
                        *count += 1;
                    }
                }
                Scalar::Int(v) if is_int => stats.observe_int(*v as i128, &mut previous_int),
                Scalar::UInt(v) if is_int => stats.observe_int(*v as i128, &mut previous_int),
                _ => {}
            }
            previous = Some(value);
        }
        Ok(stats)
    }

    fn observe_int(&mut self, value: i128, previous: &mut Option<i128>) {
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
        if previous.is_some_and(|p| p >= value) {
            self.is_strict_sorted = Some(false);
        }
        *previous = Some(value);
    }

    /// Mean run length, `len / run_count`; zero for an empty array.
    pub fn avg_run_length(&self) -> f64 {
        if self.run_count == 0 {
            return 0.0;
        }
        self.len as f64 / self.run_count as f64
    }

    /// Fraction of elements that are valid `true`, for Bool arrays.
    pub fn true_density(&self) -> Option<f64> {
        let count = self.true_count?;
        if self.len == 0 {
            return Some(0.0);
        }
        Some(count as f64 / self.len as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::{BoolArray, PrimitiveArray, VarBinArray};

    #[test]
    fn test_int_stats() {
        let array = Array::from(PrimitiveArray::from_nullable_vec(vec![
            Some(1u64),
            Some(5),
            None,
            None,
            Some(u64::MAX),
        ]));
        let stats = ArrayStats::compute(&array).unwrap();
        assert_eq!(stats.len, 5);
        assert_eq!(stats.null_count, 2);
        assert_eq!(stats.run_count, 4);
        assert_eq!(stats.min, Some(1));
        assert_eq!(stats.max, Some(u64::MAX as i128));
        assert_eq!(stats.is_strict_sorted, Some(true));
        assert_eq!(stats.true_count, None);
    }

    #[test]
    fn test_bool_stats() {
        let array = Array::from(BoolArray::from_bools([false, false, true, true, true]));
        let stats = ArrayStats::compute(&array).unwrap();
        assert_eq!(stats.true_count, Some(3));
        assert_eq!(stats.run_count, 2);
        assert_eq!(stats.avg_run_length(), 2.5);
        assert_eq!(stats.true_density(), Some(0.6));
    }

    #[test]
    fn test_string_runs() {
        let array = Array::from(VarBinArray::from_strs(["a", "a", "b"]));
        let stats = ArrayStats::compute(&array).unwrap();
        assert_eq!(stats.run_count, 2);
        assert_eq!(stats.min, None);
        assert_eq!(stats.is_strict_sorted, None);
    }

    #[test]
    fn test_empty() {
        let array = Array::from(PrimitiveArray::from_vec(Vec::<i32>::new()));
        let stats = ArrayStats::compute(&array).unwrap();
        assert_eq!(stats.run_count, 0);
        assert_eq!(stats.avg_run_length(), 0.0);
    }
}
