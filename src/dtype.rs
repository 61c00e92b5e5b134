//! Logical data types.
//!
//! A [`DType`] is a closed, recursively defined description of what an array
//! holds. Equality is structural and nullability is part of a type's identity:
//! `int(32)` and `int(32)?` are different types.
//!
//! ## Textual form
//!
//! | DType | Display |
//! |-------|---------|
//! | `Int(32, signed, non-null)` | `int(32)` |
//! | `Int(32, unsigned, non-null)` | `uint(32)` |
//! | `Float(16, non-null)` | `float(16)` |
//! | `Bool(nullable)` | `bool?` |
//! | `Struct([a: int(64), b: utf8])` | `{a=int(64), b=utf8}` |

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::error::StratumError;
use crate::ptype::PType;
use crate::Result;

/// Whether a type admits null values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Nullability {
    /// Every value is present.
    #[default]
    NonNullable,
    /// Values may be null.
    Nullable,
}

impl From<bool> for Nullability {
    fn from(nullable: bool) -> Self {
        if nullable {
            Nullability::Nullable
        } else {
            Nullability::NonNullable
        }
    }
}

impl Display for Nullability {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Nullability::NonNullable => Ok(()),
            Nullability::Nullable => f.write_str("?"),
        }
    }
}

/// Signedness of an integer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Signedness {
    /// Two's complement signed.
    Signed,
    /// Unsigned.
    Unsigned,
}

/// Bit width of an integer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntWidth {
    /// 8 bits.
    W8,
    /// 16 bits.
    W16,
    /// 32 bits.
    W32,
    /// 64 bits.
    W64,
}

impl IntWidth {
    /// Parse a bit width, failing for anything other than 8, 16, 32 or 64.
    pub fn try_from_bits(bits: u8) -> Result<Self> {
        match bits {
            8 => Ok(IntWidth::W8),
            16 => Ok(IntWidth::W16),
            32 => Ok(IntWidth::W32),
            64 => Ok(IntWidth::W64),
            other => Err(StratumError::InvalidDType(format!(
                "integer bit width must be 8, 16, 32 or 64, got {other}"
            ))),
        }
    }

    /// The width in bits.
    pub const fn bits(self) -> u8 {
        match self {
            IntWidth::W8 => 8,
            IntWidth::W16 => 16,
            IntWidth::W32 => 32,
            IntWidth::W64 => 64,
        }
    }
}

/// Bit width of a floating point type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatWidth {
    /// Half precision.
    W16,
    /// Single precision.
    W32,
    /// Double precision.
    W64,
}

impl FloatWidth {
    /// Parse a bit width, failing for anything other than 16, 32 or 64.
    pub fn try_from_bits(bits: u8) -> Result<Self> {
        match bits {
            16 => Ok(FloatWidth::W16),
            32 => Ok(FloatWidth::W32),
            64 => Ok(FloatWidth::W64),
            other => Err(StratumError::InvalidDType(format!(
                "float bit width must be 16, 32 or 64, got {other}"
            ))),
        }
    }

    /// The width in bits.
    pub const fn bits(self) -> u8 {
        match self {
            FloatWidth::W16 => 16,
            FloatWidth::W32 => 32,
            FloatWidth::W64 => 64,
        }
    }
}

/// A named member of a struct type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    /// Field name.
    pub name: Arc<str>,
    /// Field type.
    pub dtype: DType,
}

impl Field {
    /// Create a field.
    pub fn new(name: impl Into<Arc<str>>, dtype: DType) -> Self {
        Field {
            name: name.into(),
            dtype,
        }
    }
}

/// Logical type of an array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DType {
    /// Every value is null.
    Null,
    /// Booleans.
    Bool(Nullability),
    /// Integers of a given width and signedness.
    Int(IntWidth, Signedness, Nullability),
    /// Floating point numbers of a given width.
    Float(FloatWidth, Nullability),
    /// UTF-8 strings.
    Utf8(Nullability),
    /// Arbitrary byte strings.
    Binary(Nullability),
    /// Ordered named fields.
    Struct(Arc<[Field]>, Nullability),
}

impl DType {
    /// An integer type. Fails with [`StratumError::InvalidDType`] for unsupported widths.
    ///
    /// # Example
    /// ```
    /// use stratum::DType;
    ///
    /// let dtype = DType::int(32, false, true).unwrap();
    /// assert_eq!(dtype.to_string(), "uint(32)?");
    /// assert!(DType::int(12, true, false).is_err());
    /// ```
    pub fn int(bit_width: u8, signed: bool, nullable: bool) -> Result<Self> {
        let signedness = if signed {
            Signedness::Signed
        } else {
            Signedness::Unsigned
        };
        Ok(DType::Int(
            IntWidth::try_from_bits(bit_width)?,
            signedness,
            nullable.into(),
        ))
    }

    /// The default integer type: signed, 64 bits, non-nullable.
    pub const fn default_int() -> Self {
        DType::Int(IntWidth::W64, Signedness::Signed, Nullability::NonNullable)
    }

    /// A floating point type. Fails with [`StratumError::InvalidDType`] for unsupported widths.
    pub fn float(bit_width: u8, nullable: bool) -> Result<Self> {
        Ok(DType::Float(
            FloatWidth::try_from_bits(bit_width)?,
            nullable.into(),
        ))
    }

    /// A boolean type.
    pub fn bool(nullable: bool) -> Self {
        DType::Bool(nullable.into())
    }

    /// A UTF-8 string type.
    pub fn utf8(nullable: bool) -> Self {
        DType::Utf8(nullable.into())
    }

    /// A binary type.
    pub fn binary(nullable: bool) -> Self {
        DType::Binary(nullable.into())
    }

    /// A struct type with the given ordered fields.
    pub fn struct_<N, I>(fields: I, nullable: bool) -> Self
    where
        N: Into<Arc<str>>,
        I: IntoIterator<Item = (N, DType)>,
    {
        let fields: Vec<Field> = fields
            .into_iter()
            .map(|(name, dtype)| Field::new(name, dtype))
            .collect();
        DType::Struct(fields.into(), nullable.into())
    }

    /// The nullability of this type. `Null` is always nullable.
    pub fn nullability(&self) -> Nullability {
        match self {
            DType::Null => Nullability::Nullable,
            DType::Bool(n)
            | DType::Int(_, _, n)
            | DType::Float(_, n)
            | DType::Utf8(n)
            | DType::Binary(n)
            | DType::Struct(_, n) => *n,
        }
    }

    /// Whether values of this type may be null.
    pub fn is_nullable(&self) -> bool {
        self.nullability() == Nullability::Nullable
    }

    /// The same type with the given nullability.
    pub fn with_nullability(&self, nullability: Nullability) -> Self {
        match self {
            DType::Null => DType::Null,
            DType::Bool(_) => DType::Bool(nullability),
            DType::Int(w, s, _) => DType::Int(*w, *s, nullability),
            DType::Float(w, _) => DType::Float(*w, nullability),
            DType::Utf8(_) => DType::Utf8(nullability),
            DType::Binary(_) => DType::Binary(nullability),
            DType::Struct(fields, _) => DType::Struct(fields.clone(), nullability),
        }
    }

    /// The nullable variant of this type.
    pub fn as_nullable(&self) -> Self {
        self.with_nullability(Nullability::Nullable)
    }

    /// Structural equality that ignores top-level nullability.
    pub fn eq_ignore_nullability(&self, other: &DType) -> bool {
        self.as_nullable() == other.as_nullable()
    }

    /// The physical type backing values of this dtype, for numeric types.
    pub fn ptype(&self) -> Option<PType> {
        match self {
            DType::Int(w, s, _) => Some(match (w, s) {
                (IntWidth::W8, Signedness::Unsigned) => PType::U8,
                (IntWidth::W16, Signedness::Unsigned) => PType::U16,
                (IntWidth::W32, Signedness::Unsigned) => PType::U32,
                (IntWidth::W64, Signedness::Unsigned) => PType::U64,
                (IntWidth::W8, Signedness::Signed) => PType::I8,
                (IntWidth::W16, Signedness::Signed) => PType::I16,
                (IntWidth::W32, Signedness::Signed) => PType::I32,
                (IntWidth::W64, Signedness::Signed) => PType::I64,
            }),
            DType::Float(FloatWidth::W16, _) => Some(PType::F16),
            DType::Float(FloatWidth::W32, _) => Some(PType::F32),
            DType::Float(FloatWidth::W64, _) => Some(PType::F64),
            _ => None,
        }
    }

    /// Whether this is an unsigned integer type.
    pub fn is_unsigned_int(&self) -> bool {
        matches!(self, DType::Int(_, Signedness::Unsigned, _))
    }

    /// Whether this is a signed integer type.
    pub fn is_signed_int(&self) -> bool {
        matches!(self, DType::Int(_, Signedness::Signed, _))
    }

    /// The fields of a struct type.
    pub fn fields(&self) -> Option<&[Field]> {
        match self {
            DType::Struct(fields, _) => Some(fields),
            _ => None,
        }
    }
}

impl From<PType> for DType {
    fn from(ptype: PType) -> Self {
        use Nullability::NonNullable;
        match ptype {
            PType::U8 => DType::Int(IntWidth::W8, Signedness::Unsigned, NonNullable),
            PType::U16 => DType::Int(IntWidth::W16, Signedness::Unsigned, NonNullable),
            PType::U32 => DType::Int(IntWidth::W32, Signedness::Unsigned, NonNullable),
            PType::U64 => DType::Int(IntWidth::W64, Signedness::Unsigned, NonNullable),
            PType::I8 => DType::Int(IntWidth::W8, Signedness::Signed, NonNullable),
            PType::I16 => DType::Int(IntWidth::W16, Signedness::Signed, NonNullable),
            PType::I32 => DType::Int(IntWidth::W32, Signedness::Signed, NonNullable),
            PType::I64 => DType::Int(IntWidth::W64, Signedness::Signed, NonNullable),
            PType::F16 => DType::Float(FloatWidth::W16, NonNullable),
            PType::F32 => DType::Float(FloatWidth::W32, NonNullable),
            PType::F64 => DType::Float(FloatWidth::W64, NonNullable),
        }
    }
}

impl Display for DType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DType::Null => write!(f, "null"),
            DType::Bool(n) => write!(f, "bool{n}"),
            DType::Int(w, Signedness::Signed, n) => write!(f, "int({}){n}", w.bits()),
            DType::Int(w, Signedness::Unsigned, n) => write!(f, "uint({}){n}", w.bits()),
            DType::Float(w, n) => write!(f, "float({}){n}", w.bits()),
            DType::Utf8(n) => write!(f, "utf8{n}"),
            DType::Binary(n) => write!(f, "binary{n}"),
            DType::Struct(fields, n) => {
                f.write_str("{")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}={}", field.name, field.dtype)?;
                }
                write!(f, "}}{n}")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(DType::int(32, true, false).unwrap().to_string(), "int(32)");
        assert_eq!(DType::int(32, false, false).unwrap().to_string(), "uint(32)");
        assert_eq!(DType::float(16, false).unwrap().to_string(), "float(16)");
        assert_eq!(DType::bool(true).to_string(), "bool?");
        assert_eq!(DType::Null.to_string(), "null");
        let s = DType::struct_([("a", DType::default_int()), ("b", DType::utf8(true))], false);
        assert_eq!(s.to_string(), "{a=int(64), b=utf8?}");
    }

    #[test]
    fn test_invalid_widths() {
        assert!(matches!(
            DType::int(12, true, false),
            Err(StratumError::InvalidDType(_))
        ));
        assert!(matches!(
            DType::float(8, false),
            Err(StratumError::InvalidDType(_))
        ));
    }

    #[test]
    fn test_nullability_is_identity() {
        let a = DType::int(32, true, false).unwrap();
        let b = DType::int(32, true, true).unwrap();
        assert_ne!(a, b);
        assert!(a.eq_ignore_nullability(&b));
        assert!(b.is_nullable());
        assert!(!a.is_nullable());
        assert_eq!(a.as_nullable(), b);
    }

    #[test]
    fn test_default_int() {
        assert_eq!(DType::default_int(), DType::int(64, true, false).unwrap());
        assert_eq!(DType::default_int().ptype(), Some(PType::I64));
    }

    #[test]
    fn test_ptype_roundtrip() {
        for ptype in [PType::U8, PType::I32, PType::F16, PType::F64] {
            assert_eq!(DType::from(ptype).ptype(), Some(ptype));
        }
        assert_eq!(DType::utf8(false).ptype(), None);
    }
}
