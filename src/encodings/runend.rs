//! Run-end encoding.
//!
//! A run of equal values is stored once in `values`, and `ends[i]` is the
//! exclusive physical end of run `i`. Logical element `j` of a view at `offset`
//! lives in the first run whose end exceeds `offset + j`.

use std::sync::Arc;

use crate::array::{Array, PrimitiveArray};
use crate::compute::take;
use crate::dtype::DType;
use crate::error::StratumError;
use crate::ptype::PType;
use crate::Result;

/// Run-end encoded values of any dtype.
#[derive(Debug, Clone)]
pub struct RunEndArray {
    ends: Arc<Array>,
    values: Arc<Array>,
    offset: usize,
    len: usize,
}

impl RunEndArray {
    /// Assemble from run ends and run values, viewing `len` elements from `offset`.
    ///
    /// `ends` must be a non-nullable unsigned integer array, strictly increasing,
    /// as long as `values`, with `offset + len` not past the last end. Violations
    /// are [`StratumError::CorruptEncoding`].
    pub fn try_new(ends: Array, values: Array, offset: usize, len: usize) -> Result<Self> {
        if !ends.dtype().is_unsigned_int() || ends.dtype().is_nullable() {
            return Err(StratumError::CorruptEncoding(format!(
                "run ends must be non-nullable unsigned integers, got {}",
                ends.dtype()
            )));
        }
        if ends.len() != values.len() {
            return Err(StratumError::CorruptEncoding(format!(
                "{} run ends for {} run values",
                ends.len(),
                values.len()
            )));
        }
        let run_ends = decode_ends(&ends)?;
        let mut previous = 0u64;
        for (i, end) in run_ends.iter().enumerate() {
            if *end <= previous {
                return Err(StratumError::CorruptEncoding(format!(
                    "run ends must be strictly increasing from 1, got {end} at {i}"
                )));
            }
            previous = *end;
        }
        let covered = offset
            .checked_add(len)
            .ok_or_else(|| StratumError::CorruptEncoding("run-end view overflows".into()))?;
        if covered as u64 > previous {
            return Err(StratumError::CorruptEncoding(format!(
                "view {offset}..{covered} past the last run end {previous}"
            )));
        }
        Ok(RunEndArray {
            ends: Arc::new(ends),
            values: Arc::new(values),
            offset,
            len,
        })
    }

    /// Encode maximal runs of equal adjacent values. Consecutive nulls form one run.
    ///
    /// # Example
    /// ```
    /// use stratum::{Array, PrimitiveArray, RunEndArray};
    ///
    /// let array = Array::from(PrimitiveArray::from_vec(vec![7u8, 7, 7, 2]));
    /// let ree = RunEndArray::encode(&array).unwrap();
    /// assert_eq!(ree.values().len(), 2);
    /// assert_eq!(Array::from(ree).to_canonical().unwrap(), array);
    /// ```
    pub fn encode(array: &Array) -> Result<Self> {
        let flat = array.flatten()?;
        let len = flat.len();
        let mut starts = Vec::new();
        let mut ends = Vec::new();
        for i in 0..len {
            if i == 0 || starts_run(&flat, i)? {
                if i > 0 {
                    ends.push(i as u64);
                }
                starts.push(i as u64);
            }
        }
        if len > 0 {
            ends.push(len as u64);
        }

        let indices = Array::from(PrimitiveArray::from_vec(starts));
        let values = take(&flat, &indices)?;
        let ends = Array::from(PrimitiveArray::from_u64_values(
            PType::narrowest_unsigned(len as u64),
            ends,
        ));
        Ok(RunEndArray {
            ends: Arc::new(ends),
            values: Arc::new(values),
            offset: 0,
            len,
        })
    }

    /// The logical type, which is the run values' type.
    #[inline]
    pub fn dtype(&self) -> &DType {
        self.values.dtype()
    }

    /// Number of logical elements in this view.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the view is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Exclusive run ends.
    pub fn ends(&self) -> &Array {
        &self.ends
    }

    /// One value per run.
    pub fn values(&self) -> &Array {
        &self.values
    }

    /// Logical offset of this view into the runs.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Number of runs.
    pub fn run_count(&self) -> usize {
        self.ends.len()
    }

    /// The run holding logical element `index`, found by binary search over the ends.
    pub fn find_physical_index(&self, index: usize) -> Result<usize> {
        let target = (self.offset + index) as u64;
        let (mut lo, mut hi) = (0, self.ends.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if end_at(&self.ends, mid)? <= target {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        if lo == self.ends.len() {
            return Err(StratumError::IndexOutOfBounds {
                index,
                len: self.len,
            });
        }
        Ok(lo)
    }

    pub(crate) fn slice_unchecked(&self, start: usize, len: usize) -> Self {
        RunEndArray {
            ends: self.ends.clone(),
            values: self.values.clone(),
            offset: self.offset + start,
            len,
        }
    }

    /// Expand the runs into a canonical array of the values' dtype.
    pub fn decode(&self) -> Result<Array> {
        let run_ends = decode_ends(&self.ends)?;
        let mut indices = Vec::with_capacity(self.len);
        let mut run = run_ends.partition_point(|end| *end <= self.offset as u64);
        for position in self.offset..self.offset + self.len {
            while run < run_ends.len() && run_ends[run] <= position as u64 {
                run += 1;
            }
            if run == run_ends.len() {
                return Err(StratumError::CorruptEncoding(format!(
                    "position {position} past the last run end"
                )));
            }
            indices.push(run as u64);
        }
        let values = self.values.flatten()?;
        take(&values, &Array::from(PrimitiveArray::from_vec(indices)))
    }

    /// Bytes of the ends plus bytes of the values.
    pub fn nbytes(&self) -> usize {
        self.ends.nbytes() + self.values.nbytes()
    }
}

/// Whether element `i` differs from element `i - 1`. Primitive values compare by
/// their raw bytes.
fn starts_run(flat: &Array, i: usize) -> Result<bool> {
    match flat {
        Array::Primitive(p) => {
            let valid = p.is_valid_unchecked(i);
            Ok(valid != p.is_valid_unchecked(i - 1)
                || (valid && p.value_bytes(i) != p.value_bytes(i - 1)))
        }
        other => Ok(other.scalar_at(i)? != other.scalar_at(i - 1)?),
    }
}

fn end_at(ends: &Array, index: usize) -> Result<u64> {
    ends.scalar_at(index)?
        .as_u64()
        .ok_or_else(|| StratumError::CorruptEncoding(format!("null run end at {index}")))
}

fn decode_ends(ends: &Array) -> Result<Vec<u64>> {
    let flat = ends.flatten()?;
    match flat.as_primitive() {
        Some(primitive) => Ok((0..primitive.len()).map(|i| primitive.u64_at(i)).collect()),
        None if flat.is_empty() => Ok(Vec::new()),
        None => Err(StratumError::CorruptEncoding(format!(
            "run ends decoded to {} instead of primitive",
            flat.encoding()
        ))),
    }
}
