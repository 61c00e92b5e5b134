//! Single logical values read out of arrays.

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

/// One logical value of an array slot.
///
/// Numeric values are widened (`Int` for signed integers, `UInt` for unsigned,
/// `Float` for every float width); the array's dtype says how they are stored.
#[derive(Debug, Clone)]
pub enum Scalar {
    /// A null slot.
    Null,
    /// A boolean.
    Bool(bool),
    /// A signed integer.
    Int(i64),
    /// An unsigned integer.
    UInt(u64),
    /// A float.
    Float(f64),
    /// A UTF-8 string.
    Utf8(String),
    /// A byte string.
    Binary(Vec<u8>),
    /// One value per struct field, in field order.
    Struct(Vec<Scalar>),
}

impl Scalar {
    /// Whether this is the null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    /// The boolean payload, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// The value as a non-negative integer, if it is one.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Scalar::UInt(v) => Some(*v),
            Scalar::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// The value as a signed integer, if it fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(v) => Some(*v),
            Scalar::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }

    /// Order two non-null scalars of the same kind.
    ///
    /// Returns `None` when either side is null, the kinds differ, or a float is NaN.
    pub fn compare(&self, other: &Scalar) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => Some(a.cmp(b)),
            (Scalar::Int(a), Scalar::Int(b)) => Some(a.cmp(b)),
            (Scalar::UInt(a), Scalar::UInt(b)) => Some(a.cmp(b)),
            (Scalar::Int(a), Scalar::UInt(b)) => Some((*a as i128).cmp(&(*b as i128))),
            (Scalar::UInt(a), Scalar::Int(b)) => Some((*a as i128).cmp(&(*b as i128))),
            (Scalar::Float(a), Scalar::Float(b)) => a.partial_cmp(b),
            (Scalar::Utf8(a), Scalar::Utf8(b)) => Some(a.cmp(b)),
            (Scalar::Binary(a), Scalar::Binary(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Scalar::Null, Scalar::Null) => true,
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            (Scalar::Int(a), Scalar::Int(b)) => a == b,
            (Scalar::UInt(a), Scalar::UInt(b)) => a == b,
            // Exact bit equality keeps NaN == NaN for run detection and round trips.
            (Scalar::Float(a), Scalar::Float(b)) => a.to_bits() == b.to_bits(),
            (Scalar::Utf8(a), Scalar::Utf8(b)) => a == b,
            (Scalar::Binary(a), Scalar::Binary(b)) => a == b,
            (Scalar::Struct(a), Scalar::Struct(b)) => a == b,
            _ => false,
        }
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Null => f.write_str("null"),
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::UInt(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Utf8(v) => write!(f, "{v:?}"),
            Scalar::Binary(v) => write!(f, "{v:?}"),
            Scalar::Struct(values) => {
                f.write_str("{")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Scalar::Null)
    }
}

macro_rules! scalar_from {
    ($variant:ident, $as:ty, $($T:ty),+) => {
        $(impl From<$T> for Scalar {
            fn from(value: $T) -> Self {
                Scalar::$variant(value as $as)
            }
        })+
    };
}

scalar_from!(Int, i64, i8, i16, i32, i64);
scalar_from!(UInt, u64, u8, u16, u32, u64);
scalar_from!(Float, f64, f32, f64);

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Utf8(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Utf8(value)
    }
}

impl From<&[u8]> for Scalar {
    fn from(value: &[u8]) -> Self {
        Scalar::Binary(value.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_equality_is_bitwise() {
        assert_eq!(Scalar::Float(f64::NAN), Scalar::Float(f64::NAN));
        assert_ne!(Scalar::Float(0.0), Scalar::Float(-0.0));
        assert_eq!(Scalar::Float(0.0).compare(&Scalar::Float(-0.0)), Some(Ordering::Equal));
    }

    #[test]
    fn test_compare() {
        assert_eq!(Scalar::Int(-1).compare(&Scalar::Int(3)), Some(Ordering::Less));
        assert_eq!(Scalar::from("b").compare(&Scalar::from("a")), Some(Ordering::Greater));
        assert_eq!(Scalar::Null.compare(&Scalar::Int(1)), None);
        assert_eq!(Scalar::Bool(true).compare(&Scalar::Int(1)), None);
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Scalar::from(Some(3i32)), Scalar::Int(3));
        assert_eq!(Scalar::from(None::<u8>), Scalar::Null);
    }
}
