//! Error types for array construction, encoding, compute and serialization.

use thiserror::Error;

use crate::dtype::DType;

/// Errors that can occur while building, encoding, decoding or serializing arrays.
#[derive(Debug, Error)]
pub enum StratumError {
    /// A dtype was constructed with an unsupported parameter (e.g. a bit width of 12).
    #[error("invalid dtype: {0}")]
    InvalidDType(String),

    /// An operation was applied to operands with incompatible dtypes.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// A position or range fell outside the array.
    #[error("index {index} out of bounds for array of length {len}")]
    IndexOutOfBounds {
        /// The offending index (or range end).
        index: usize,
        /// The length of the array that was indexed.
        len: usize,
    },

    /// An encoding was requested for data it cannot represent.
    #[error("{encoding} encoding unsupported: {reason}")]
    UnsupportedEncoding {
        /// Name of the requested encoding.
        encoding: &'static str,
        /// Why the source array cannot be encoded.
        reason: String,
    },

    /// Buffers were malformed or inconsistent with the declared layout.
    #[error("corrupt encoding: {0}")]
    CorruptEncoding(String),

    /// A deserialized dtype disagreed with the dtype the caller expected.
    #[error("dtype mismatch: expected {expected}, found {actual}")]
    DTypeMismatch {
        /// The dtype the caller asked for.
        expected: DType,
        /// The dtype found in the stream.
        actual: DType,
    },

    /// An expression tree was malformed (wrong arity, non-boolean predicate).
    #[error("invalid expression: {0}")]
    InvalidExpression(String),

    /// A projection or expression referenced a column that does not exist.
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    /// A caller-supplied argument was out of its accepted range.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The byte sink or source failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl StratumError {
    /// Re-label any error raised while decoding foreign bytes as corruption.
    pub(crate) fn into_corrupt(self) -> Self {
        match self {
            StratumError::CorruptEncoding(_) | StratumError::Io(_) => self,
            StratumError::DTypeMismatch { .. } => self,
            other => StratumError::CorruptEncoding(other.to_string()),
        }
    }
}

/// Fail with [`StratumError::IndexOutOfBounds`] unless `index < len`.
#[inline]
pub(crate) fn check_index(index: usize, len: usize) -> crate::Result<()> {
    if index >= len {
        return Err(StratumError::IndexOutOfBounds { index, len });
    }
    Ok(())
}

/// Fail with [`StratumError::IndexOutOfBounds`] unless `start + len <= total`.
#[inline]
pub(crate) fn check_slice(start: usize, len: usize, total: usize) -> crate::Result<()> {
    match start.checked_add(len) {
        Some(end) if end <= total => Ok(()),
        Some(end) => Err(StratumError::IndexOutOfBounds { index: end, len: total }),
        None => Err(StratumError::IndexOutOfBounds {
            index: usize::MAX,
            len: total,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_slice() {
        assert!(check_slice(0, 4, 4).is_ok());
        assert!(check_slice(4, 0, 4).is_ok());
        assert!(matches!(
            check_slice(2, 3, 4),
            Err(StratumError::IndexOutOfBounds { index: 5, len: 4 })
        ));
        assert!(check_slice(usize::MAX, 2, 4).is_err());
    }

    #[test]
    fn test_into_corrupt() {
        let err = StratumError::TypeMismatch("x".into()).into_corrupt();
        assert!(matches!(err, StratumError::CorruptEncoding(_)));
    }
}
