//! Encoding selection.
//!
//! The compressor computes [`ArrayStats`] for a canonical array, materializes every
//! eligible candidate encoding and keeps the smallest by [`Array::nbytes`]. A
//! candidate must be strictly smaller than the input to win, and on equal sizes
//! the earlier candidate wins. Candidates are tried in this order:
//!
//! | Encoding | Eligible when |
//! |----------|---------------|
//! | RunEnd | primitive or varbin, average run length at least the threshold |
//! | ZigZag | signed integers with a negative minimum |
//! | RoaringBool | bools without nulls, long enough or sparse/dense enough |
//! | RoaringInt | unsigned, no nulls, strictly increasing, max at most `u32::MAX` |
//!
//! The children of RunEnd and ZigZag are compressed again one level deeper.

use std::collections::HashSet;

use tracing::debug;

use crate::array::{Array, EncodingId};
use crate::dtype::DType;
use crate::encodings::{RoaringBoolArray, RoaringIntArray, RunEndArray, ZigZagArray};
use crate::stats::ArrayStats;
use crate::Result;

/// Default nesting depth for recursive child compression.
pub const DEFAULT_MAX_DEPTH: u8 = 3;

/// Default minimum average run length for RunEnd.
pub const DEFAULT_REE_AVERAGE_RUN_THRESHOLD: f64 = 2.0;

/// Default length from which RoaringBool is always tried.
pub const DEFAULT_ROARING_BOOL_MIN_LEN: usize = 1024;

/// Default true (or false) density at or below which RoaringBool is tried.
pub const DEFAULT_ROARING_BOOL_DENSITY: f64 = 1.0 / 32.0;

/// Compressor settings.
///
/// # Example
/// ```
/// use stratum::{CompressConfig, EncodingId};
///
/// let config = CompressConfig::default()
///     .with_max_depth(2)
///     .without_encoding(EncodingId::RoaringInt);
/// assert!(!config.is_enabled(EncodingId::RoaringInt));
/// assert!(config.is_enabled(EncodingId::RunEnd));
/// ```
#[derive(Debug, Clone)]
pub struct CompressConfig {
    max_depth: u8,
    ree_average_run_threshold: f64,
    roaring_bool_min_len: usize,
    roaring_bool_density: f64,
    disabled_encodings: HashSet<EncodingId>,
}

impl Default for CompressConfig {
    fn default() -> Self {
        CompressConfig {
            max_depth: DEFAULT_MAX_DEPTH,
            ree_average_run_threshold: DEFAULT_REE_AVERAGE_RUN_THRESHOLD,
            roaring_bool_min_len: DEFAULT_ROARING_BOOL_MIN_LEN,
            roaring_bool_density: DEFAULT_ROARING_BOOL_DENSITY,
            disabled_encodings: HashSet::new(),
        }
    }
}

impl CompressConfig {
    /// Set the nesting depth for recursive child compression. Zero disables compression.
    pub fn with_max_depth(mut self, max_depth: u8) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Set the minimum average run length for RunEnd.
    pub fn with_ree_average_run_threshold(mut self, threshold: f64) -> Self {
        self.ree_average_run_threshold = threshold;
        self
    }

    /// Set the length from which RoaringBool is always tried.
    pub fn with_roaring_bool_min_len(mut self, min_len: usize) -> Self {
        self.roaring_bool_min_len = min_len;
        self
    }

    /// Set the density at or below which RoaringBool is tried.
    pub fn with_roaring_bool_density(mut self, density: f64) -> Self {
        self.roaring_bool_density = density;
        self
    }

    /// Never produce `encoding`.
    pub fn without_encoding(mut self, encoding: EncodingId) -> Self {
        self.disabled_encodings.insert(encoding);
        self
    }

    /// Whether `encoding` may be produced.
    pub fn is_enabled(&self, encoding: EncodingId) -> bool {
        !self.disabled_encodings.contains(&encoding)
    }

    /// The nesting depth for recursive child compression.
    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    /// The minimum average run length for RunEnd.
    pub fn ree_average_run_threshold(&self) -> f64 {
        self.ree_average_run_threshold
    }

    /// The length from which RoaringBool is always tried.
    pub fn roaring_bool_min_len(&self) -> usize {
        self.roaring_bool_min_len
    }

    /// The density at or below which RoaringBool is tried.
    pub fn roaring_bool_density(&self) -> f64 {
        self.roaring_bool_density
    }
}

/// Picks the smallest encoding for an array.
#[derive(Debug, Clone, Default)]
pub struct Compressor {
    config: CompressConfig,
}

impl Compressor {
    /// A compressor with the given settings.
    pub fn new(config: CompressConfig) -> Self {
        Compressor { config }
    }

    /// The settings in use.
    pub fn config(&self) -> &CompressConfig {
        &self.config
    }

    /// Compress `array`. The result decodes to the same values and dtype, and is
    /// never larger than the input.
    ///
    /// # Example
    /// ```
    /// use stratum::{Array, Compressor, EncodingId, PrimitiveArray};
    ///
    /// let array = Array::from(PrimitiveArray::from_vec(vec![0i64, 0, 0, 0, 9, 9, 9, 9, 1, 5]));
    /// let compressed = Compressor::default().compress(&array).unwrap();
    /// assert_eq!(compressed.encoding(), EncodingId::RunEnd);
    /// assert!(compressed.nbytes() < array.nbytes());
    /// ```
    pub fn compress(&self, array: &Array) -> Result<Array> {
        self.compress_at(array, 0)
    }

    fn compress_at(&self, array: &Array, depth: u8) -> Result<Array> {
        if array.is_empty() || depth >= self.config.max_depth {
            return Ok(array.clone());
        }
        match array {
            Array::Struct(s) => Ok(Array::Struct(s.map_fields(|f| self.compress_at(f, depth))?)),
            Array::Chunked(c) => Ok(Array::Chunked(
                c.map_chunks(|chunk| self.compress_at(chunk, depth))?,
            )),
            Array::Primitive(_) | Array::VarBin(_) | Array::Bool(_) => {
                self.compress_canonical(array, depth)
            }
            _ => Ok(array.clone()),
        }
    }

    fn compress_canonical(&self, array: &Array, depth: u8) -> Result<Array> {
        let stats = ArrayStats::compute(array)?;
        let mut best: Option<Array> = None;
        let mut best_nbytes = array.nbytes();

        for encoding in [
            EncodingId::RunEnd,
            EncodingId::ZigZag,
            EncodingId::RoaringBool,
            EncodingId::RoaringInt,
        ] {
            if !self.config.is_enabled(encoding) || !self.is_candidate(encoding, array, &stats) {
                continue;
            }
            let candidate = self.encode(encoding, array, depth)?;
            let nbytes = candidate.nbytes();
            if nbytes < best_nbytes {
                debug!(%encoding, nbytes, depth, "candidate selected");
                best_nbytes = nbytes;
                best = Some(candidate);
            } else {
                debug!(%encoding, nbytes, best_nbytes, depth, "candidate rejected");
            }
        }

        Ok(best.unwrap_or_else(|| array.clone()))
    }

    fn is_candidate(&self, encoding: EncodingId, array: &Array, stats: &ArrayStats) -> bool {
        let dtype = array.dtype();
        match encoding {
            EncodingId::RunEnd => {
                let eligible = match array {
                    Array::Primitive(_) | Array::VarBin(_) => true,
                    // Bool runs go to RoaringBool whenever it can hold them.
                    Array::Bool(_) => {
                        !(self.config.is_enabled(EncodingId::RoaringBool)
                            && self.is_candidate(EncodingId::RoaringBool, array, stats))
                    }
                    _ => false,
                };
                eligible && stats.avg_run_length() >= self.config.ree_average_run_threshold
            }
            EncodingId::ZigZag => dtype.is_signed_int() && stats.min.is_some_and(|m| m < 0),
            EncodingId::RoaringBool => {
                let dense_or_sparse = stats.true_density().is_some_and(|d| {
                    d <= self.config.roaring_bool_density
                        || 1.0 - d <= self.config.roaring_bool_density
                });
                matches!(dtype, DType::Bool(_))
                    && stats.null_count == 0
                    && (stats.len >= self.config.roaring_bool_min_len || dense_or_sparse)
            }
            EncodingId::RoaringInt => {
                dtype.is_unsigned_int()
                    && stats.null_count == 0
                    && stats.is_strict_sorted == Some(true)
                    && stats.max.is_some_and(|m| m <= u32::MAX as i128)
            }
            _ => false,
        }
    }

    fn encode(&self, encoding: EncodingId, array: &Array, depth: u8) -> Result<Array> {
        Ok(match encoding {
            EncodingId::RunEnd => {
                let ree = RunEndArray::encode(array)?;
                let ends = self.compress_at(ree.ends(), depth + 1)?;
                let values = self.compress_at(ree.values(), depth + 1)?;
                Array::from(RunEndArray::try_new(ends, values, 0, ree.len())?)
            }
            EncodingId::ZigZag => {
                let zigzag = ZigZagArray::encode(array)?;
                let encoded = self.compress_at(zigzag.encoded(), depth + 1)?;
                Array::from(ZigZagArray::try_new(array.dtype().clone(), encoded)?)
            }
            EncodingId::RoaringBool => Array::from(RoaringBoolArray::encode(array)?),
            EncodingId::RoaringInt => Array::from(RoaringIntArray::encode(array)?),
            _ => array.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::{BoolArray, PrimitiveArray, StructArray, VarBinArray};

    #[test]
    fn test_runs_pick_runend() {
        let array = Array::from(PrimitiveArray::from_vec(vec![0i64, 0, 0, 0, 9, 9, 9, 9, 1, 5]));
        let compressed = Compressor::default().compress(&array).unwrap();
        assert_eq!(compressed.encoding(), EncodingId::RunEnd);
        assert_eq!(compressed.nbytes(), 36);
        assert_eq!(compressed.to_canonical().unwrap(), array);
    }

    #[test]
    fn test_bool_runs_pick_roaring() {
        let array = Array::from(BoolArray::from_bools(
            std::iter::repeat(false)
                .take(10_000)
                .chain(std::iter::repeat(true).take(10_000)),
        ));
        let compressed = Compressor::default().compress(&array).unwrap();
        assert_eq!(compressed.encoding(), EncodingId::RoaringBool);
        assert_eq!(compressed.len(), 20_000);
        assert!(compressed.nbytes() < array.nbytes());
    }

    #[test]
    fn test_small_negative_ints_pick_zigzag() {
        let values: Vec<i64> = (0..256).map(|i| if i % 2 == 0 { -(i % 7) } else { i % 5 }).collect();
        let array = Array::from(PrimitiveArray::from_vec(values));
        let compressed = Compressor::default().compress(&array).unwrap();
        assert_eq!(compressed.encoding(), EncodingId::ZigZag);
        assert_eq!(compressed.nbytes(), 256);
        assert_eq!(compressed.to_canonical().unwrap(), array);
    }

    #[test]
    fn test_disabled_encoding() {
        let array = Array::from(PrimitiveArray::from_vec(vec![1u8; 64]));
        let config = CompressConfig::default().without_encoding(EncodingId::RunEnd);
        let compressed = Compressor::new(config).compress(&array).unwrap();
        assert_eq!(compressed.encoding(), EncodingId::Primitive);
    }

    #[test]
    fn test_incompressible_returned_unchanged() {
        let array = Array::from(VarBinArray::from_strs(["a", "b", "c"]));
        let compressed = Compressor::default().compress(&array).unwrap();
        assert_eq!(compressed, array);
    }

    #[test]
    fn test_struct_fields_compressed_independently() {
        let table = Array::from(
            StructArray::from_fields([
                ("runs", Array::from(PrimitiveArray::from_vec(vec![7u32; 100]))),
                ("names", Array::from(VarBinArray::from_strs(["x", "y"].repeat(50)))),
            ])
            .unwrap(),
        );
        let compressed = Compressor::default().compress(&table).unwrap();
        let fields = compressed.as_struct().unwrap().fields();
        assert_eq!(fields[0].encoding(), EncodingId::RunEnd);
        assert_eq!(fields[1].encoding(), EncodingId::VarBin);
        assert_eq!(compressed.to_canonical().unwrap().scalars().unwrap(), table.scalars().unwrap());
    }

    #[test]
    fn test_empty_and_zero_depth() {
        let empty = Array::from(PrimitiveArray::from_vec(Vec::<u16>::new()));
        assert_eq!(Compressor::default().compress(&empty).unwrap(), empty);

        let runs = Array::from(PrimitiveArray::from_vec(vec![3i32; 10]));
        let off = Compressor::new(CompressConfig::default().with_max_depth(0));
        assert_eq!(off.compress(&runs).unwrap(), runs);
    }

    #[test]
    fn test_nullable_bool_runs_pick_runend() {
        let values = [Some(true), None, Some(false), Some(true)]
            .into_iter()
            .flat_map(|v| std::iter::repeat(v).take(500));
        let array = Array::from(BoolArray::from_nullable_bools(values));
        assert_eq!(array.nbytes(), 500);

        let compressed = Compressor::default().compress(&array).unwrap();
        assert_eq!(compressed.encoding(), EncodingId::RunEnd);
        assert_eq!(compressed.nbytes(), 10);
        assert_eq!(compressed.dtype(), array.dtype());
        assert_eq!(compressed.to_canonical().unwrap(), array);
        assert!(!compressed.is_valid(999).unwrap());
    }
}
