//! Physical (in-memory) value types backing primitive arrays.
//!
//! Primitive buffers are plain little-endian byte buffers; a [`PType`] says how
//! to slice them into values. [`NativePType`] connects Rust primitives to their
//! `PType` for typed construction and typed reads.

use std::fmt::{Debug, Display, Formatter};

use half::f16;

use crate::error::StratumError;
use crate::scalar::Scalar;

/// Physical type of a primitive value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PType {
    /// Unsigned 8-bit integer.
    U8,
    /// Unsigned 16-bit integer.
    U16,
    /// Unsigned 32-bit integer.
    U32,
    /// Unsigned 64-bit integer.
    U64,
    /// Signed 8-bit integer.
    I8,
    /// Signed 16-bit integer.
    I16,
    /// Signed 32-bit integer.
    I32,
    /// Signed 64-bit integer.
    I64,
    /// IEEE 754 half precision float.
    F16,
    /// IEEE 754 single precision float.
    F32,
    /// IEEE 754 double precision float.
    F64,
}

impl PType {
    /// Number of bytes one value occupies.
    #[inline]
    pub const fn byte_width(self) -> usize {
        match self {
            PType::U8 | PType::I8 => 1,
            PType::U16 | PType::I16 | PType::F16 => 2,
            PType::U32 | PType::I32 | PType::F32 => 4,
            PType::U64 | PType::I64 | PType::F64 => 8,
        }
    }

    /// Number of bits one value occupies.
    #[inline]
    pub const fn bit_width(self) -> u8 {
        (self.byte_width() * 8) as u8
    }

    /// Whether this is an unsigned integer type.
    pub const fn is_unsigned_int(self) -> bool {
        matches!(self, PType::U8 | PType::U16 | PType::U32 | PType::U64)
    }

    /// Whether this is a signed integer type.
    pub const fn is_signed_int(self) -> bool {
        matches!(self, PType::I8 | PType::I16 | PType::I32 | PType::I64)
    }

    /// Whether this is an integer type of either signedness.
    pub const fn is_int(self) -> bool {
        self.is_unsigned_int() || self.is_signed_int()
    }

    /// Whether this is a floating point type.
    pub const fn is_float(self) -> bool {
        matches!(self, PType::F16 | PType::F32 | PType::F64)
    }

    /// The smallest unsigned type able to hold `max`.
    pub fn narrowest_unsigned(max: u64) -> PType {
        if max <= u8::MAX as u64 {
            PType::U8
        } else if max <= u16::MAX as u64 {
            PType::U16
        } else if max <= u32::MAX as u64 {
            PType::U32
        } else {
            PType::U64
        }
    }
}

impl Display for PType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PType::U8 => "u8",
            PType::U16 => "u16",
            PType::U32 => "u32",
            PType::U64 => "u64",
            PType::I8 => "i8",
            PType::I16 => "i16",
            PType::I32 => "i32",
            PType::I64 => "i64",
            PType::F16 => "f16",
            PType::F32 => "f32",
            PType::F64 => "f64",
        };
        f.write_str(name)
    }
}

/// A Rust type whose values can live in a primitive buffer.
pub trait NativePType: Copy + Debug + Default + PartialOrd + Send + Sync + 'static {
    /// The physical type this Rust type maps to.
    const PTYPE: PType;

    /// Decode one value from exactly `PTYPE.byte_width()` little-endian bytes.
    fn from_le_slice(bytes: &[u8]) -> Self;

    /// Append the little-endian bytes of `self`.
    fn write_le(self, out: &mut Vec<u8>);
}

macro_rules! native_ptype {
    ($T:ty, $P:ident) => {
        impl NativePType for $T {
            const PTYPE: PType = PType::$P;

            #[inline]
            fn from_le_slice(bytes: &[u8]) -> Self {
                <$T>::from_le_bytes(le_array(bytes))
            }

            #[inline]
            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }
        }
    };
}

native_ptype!(u8, U8);
native_ptype!(u16, U16);
native_ptype!(u32, U32);
native_ptype!(u64, U64);
native_ptype!(i8, I8);
native_ptype!(i16, I16);
native_ptype!(i32, I32);
native_ptype!(i64, I64);
native_ptype!(f16, F16);
native_ptype!(f32, F32);
native_ptype!(f64, F64);

/// Copy the first `N` bytes of `bytes` into an array.
#[inline]
fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

/// Read the value stored in `bytes` as a scalar of `ptype`.
pub(crate) fn scalar_from_le(ptype: PType, bytes: &[u8]) -> Scalar {
    match ptype {
        PType::U8 => Scalar::UInt(bytes[0] as u64),
        PType::U16 => Scalar::UInt(u16::from_le_slice(bytes) as u64),
        PType::U32 => Scalar::UInt(u32::from_le_slice(bytes) as u64),
        PType::U64 => Scalar::UInt(u64::from_le_slice(bytes)),
        PType::I8 => Scalar::Int(bytes[0] as i8 as i64),
        PType::I16 => Scalar::Int(i16::from_le_slice(bytes) as i64),
        PType::I32 => Scalar::Int(i32::from_le_slice(bytes) as i64),
        PType::I64 => Scalar::Int(i64::from_le_slice(bytes)),
        PType::F16 => Scalar::Float(f16::from_le_slice(bytes).to_f64()),
        PType::F32 => Scalar::Float(f32::from_le_slice(bytes) as f64),
        PType::F64 => Scalar::Float(f64::from_le_slice(bytes)),
    }
}

/// Read an integer value as `u64`, reinterpreting signed values' two's complement.
#[inline]
pub(crate) fn u64_from_le(ptype: PType, bytes: &[u8]) -> u64 {
    match ptype.byte_width() {
        1 => bytes[0] as u64,
        2 => u16::from_le_slice(bytes) as u64,
        4 => u32::from_le_slice(bytes) as u64,
        _ => u64::from_le_slice(bytes),
    }
}

/// Read a signed integer value sign-extended to `i64`.
#[inline]
pub(crate) fn i64_from_le(ptype: PType, bytes: &[u8]) -> i64 {
    match ptype.byte_width() {
        1 => bytes[0] as i8 as i64,
        2 => i16::from_le_slice(bytes) as i64,
        4 => i32::from_le_slice(bytes) as i64,
        _ => i64::from_le_slice(bytes),
    }
}

/// Append the low `ptype.byte_width()` bytes of `value`.
#[inline]
pub(crate) fn write_u64_le(ptype: PType, value: u64, out: &mut Vec<u8>) {
    out.extend_from_slice(&value.to_le_bytes()[..ptype.byte_width()]);
}

/// Append the bytes of `scalar` encoded as `ptype`.
pub(crate) fn write_scalar_le(
    ptype: PType,
    scalar: &Scalar,
    out: &mut Vec<u8>,
) -> Result<(), StratumError> {
    match (ptype, scalar) {
        (PType::F16, Scalar::Float(v)) => f16::from_f64(*v).write_le(out),
        (PType::F32, Scalar::Float(v)) => (*v as f32).write_le(out),
        (PType::F64, Scalar::Float(v)) => v.write_le(out),
        (p, Scalar::Int(v)) if p.is_int() => write_u64_le(p, *v as u64, out),
        (p, Scalar::UInt(v)) if p.is_int() => write_u64_le(p, *v, out),
        (p, other) => {
            return Err(StratumError::TypeMismatch(format!(
                "cannot store {other:?} as {p}"
            )))
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widths() {
        assert_eq!(PType::U8.byte_width(), 1);
        assert_eq!(PType::F16.bit_width(), 16);
        assert_eq!(PType::I64.bit_width(), 64);
        assert!(PType::U32.is_unsigned_int());
        assert!(!PType::I32.is_unsigned_int());
        assert!(PType::F32.is_float());
    }

    #[test]
    fn test_narrowest_unsigned() {
        assert_eq!(PType::narrowest_unsigned(0), PType::U8);
        assert_eq!(PType::narrowest_unsigned(255), PType::U8);
        assert_eq!(PType::narrowest_unsigned(256), PType::U16);
        assert_eq!(PType::narrowest_unsigned(70_000), PType::U32);
        assert_eq!(PType::narrowest_unsigned(u64::MAX), PType::U64);
    }

    #[test]
    fn test_scalar_bytes() {
        let mut out = Vec::new();
        write_scalar_le(PType::I16, &Scalar::Int(-2), &mut out).unwrap();
        assert_eq!(scalar_from_le(PType::I16, &out), Scalar::Int(-2));
        assert_eq!(i64_from_le(PType::I16, &out), -2);
        assert_eq!(u64_from_le(PType::I16, &out), 0xFFFE);

        let mut out = Vec::new();
        write_scalar_le(PType::F16, &Scalar::Float(1.5), &mut out).unwrap();
        assert_eq!(scalar_from_le(PType::F16, &out), Scalar::Float(1.5));

        let err = write_scalar_le(PType::U8, &Scalar::Bool(true), &mut Vec::new());
        assert!(matches!(err, Err(StratumError::TypeMismatch(_))));
    }
}
