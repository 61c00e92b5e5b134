/// An array of `DType::Null` where every slot is null. It owns no buffers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NullArray {
    len: usize,
}

impl NullArray {
    /// An all-null array of `len` slots.
    pub fn new(len: usize) -> Self {
        NullArray { len }
    }

    /// Number of slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether there are no slots.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use crate::array::Array;
    use crate::dtype::DType;
    use crate::scalar::Scalar;

    use super::*;

    #[test]
    fn test_null_array() {
        let array = Array::from(NullArray::new(3));
        assert_eq!(array.dtype(), &DType::Null);
        assert_eq!(array.nbytes(), 0);
        assert_eq!(array.scalar_at(2).unwrap(), Scalar::Null);
        assert!(!array.is_valid(0).unwrap());
        assert_eq!(array.slice(1, 2).unwrap().len(), 2);
    }
}
