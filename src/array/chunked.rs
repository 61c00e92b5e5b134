use crate::array::Array;
use crate::dtype::DType;
use crate::error::StratumError;
use crate::Result;

/// The logical concatenation of same-typed chunks.
#[derive(Debug, Clone)]
pub struct ChunkedArray {
    dtype: DType,
    chunks: Vec<Array>,
    // Cumulative chunk ends: chunk i covers `ends[i - 1]..ends[i]`.
    ends: Vec<usize>,
}

impl ChunkedArray {
    /// Combine chunks that all have exactly `dtype`.
    ///
    /// # Example
    /// ```
    /// use stratum::{Array, ChunkedArray, DType, PrimitiveArray};
    ///
    /// let chunked = ChunkedArray::try_new(
    ///     DType::default_int(),
    ///     vec![
    ///         Array::from(PrimitiveArray::from_vec(vec![0i64, 1, 2])),
    ///         Array::from(PrimitiveArray::from_vec(vec![3i64, 4, 5])),
    ///     ],
    /// )
    /// .unwrap();
    /// assert_eq!(chunked.len(), 6);
    /// ```
    pub fn try_new(dtype: DType, chunks: Vec<Array>) -> Result<Self> {
        let mut ends = Vec::with_capacity(chunks.len());
        let mut total = 0usize;
        for (i, chunk) in chunks.iter().enumerate() {
            if chunk.dtype() != &dtype {
                return Err(StratumError::TypeMismatch(format!(
                    "chunk {i} is {}, expected {dtype}",
                    chunk.dtype()
                )));
            }
            total += chunk.len();
            ends.push(total);
        }
        Ok(ChunkedArray {
            dtype,
            chunks,
            ends,
        })
    }

    /// The logical type.
    #[inline]
    pub fn dtype(&self) -> &DType {
        &self.dtype
    }

    /// Sum of the chunk lengths.
    #[inline]
    pub fn len(&self) -> usize {
        self.ends.last().copied().unwrap_or(0)
    }

    /// Whether there are no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The chunks, in order.
    pub fn chunks(&self) -> &[Array] {
        &self.chunks
    }

    /// Number of chunks.
    pub fn nchunks(&self) -> usize {
        self.chunks.len()
    }

    /// The chunk at `index`. Callers check bounds.
    pub(crate) fn chunk(&self, index: usize) -> &Array {
        &self.chunks[index]
    }

    fn chunk_start(&self, chunk: usize) -> usize {
        if chunk == 0 {
            0
        } else {
            self.ends[chunk - 1]
        }
    }

    /// The chunk holding logical `index` and the position inside it.
    pub fn find_chunk(&self, index: usize) -> Result<(usize, usize)> {
        let chunk = self.ends.partition_point(|end| *end <= index);
        if chunk >= self.chunks.len() {
            return Err(StratumError::IndexOutOfBounds {
                index,
                len: self.len(),
            });
        }
        Ok((chunk, index - self.chunk_start(chunk)))
    }

    pub(crate) fn slice_unchecked(&self, start: usize, len: usize) -> Result<Self> {
        let end = start + len;
        let mut chunks = Vec::new();
        for (i, chunk) in self.chunks.iter().enumerate() {
            let chunk_start = self.chunk_start(i);
            let chunk_end = self.ends[i];
            if chunk_end <= start || chunk_start >= end {
                continue;
            }
            let from = start.max(chunk_start) - chunk_start;
            let to = end.min(chunk_end) - chunk_start;
            chunks.push(chunk.slice(from, to - from)?);
        }
        Self::try_new(self.dtype.clone(), chunks)
    }

    /// Replace every chunk with `f(chunk)`. Each result must keep its dtype.
    pub(crate) fn map_chunks<F>(&self, f: F) -> Result<ChunkedArray>
    where
        F: FnMut(&Array) -> Result<Array>,
    {
        let chunks = self.chunks.iter().map(f).collect::<Result<Vec<_>>>()?;
        Self::try_new(self.dtype.clone(), chunks)
    }

    /// Sum of the chunks' bytes.
    pub fn nbytes(&self) -> usize {
        self.chunks.iter().map(Array::nbytes).sum()
    }
}
