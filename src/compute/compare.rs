use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use crate::array::{Array, BoolArray};
use crate::bitpack::BitBuffer;
use crate::dtype::DType;
use crate::error::StratumError;
use crate::scalar::Scalar;
use crate::Result;

/// An elementwise comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `<=`
    Lte,
    /// `>`
    Gt,
    /// `>=`
    Gte,
}

impl CompareOp {
    /// The operator with its operands swapped: `a < b` is `b > a`.
    pub fn swap(self) -> Self {
        match self {
            CompareOp::Eq => CompareOp::Eq,
            CompareOp::NotEq => CompareOp::NotEq,
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Lte => CompareOp::Gte,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Gte => CompareOp::Lte,
        }
    }

    /// Apply to an ordering; `None` (NaN involved) only satisfies `NotEq`.
    fn matches(self, ordering: Option<Ordering>) -> bool {
        match self {
            CompareOp::Eq => ordering == Some(Ordering::Equal),
            CompareOp::NotEq => ordering != Some(Ordering::Equal),
            CompareOp::Lt => ordering == Some(Ordering::Less),
            CompareOp::Lte => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
            CompareOp::Gt => ordering == Some(Ordering::Greater),
            CompareOp::Gte => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
        }
    }
}

impl Display for CompareOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            CompareOp::Eq => "==",
            CompareOp::NotEq => "!=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
        })
    }
}

fn check_comparable(dtype: &DType) -> Result<()> {
    match dtype {
        DType::Struct(..) => Err(StratumError::TypeMismatch(format!(
            "{dtype} values are not comparable"
        ))),
        _ => Ok(()),
    }
}

fn bool_result(values: Vec<Option<bool>>, nullable: bool) -> Result<Array> {
    let bits = BitBuffer::from_bools(values.iter().map(|v| v.unwrap_or(false)));
    let validity = nullable.then(|| BitBuffer::from_bools(values.iter().map(Option::is_some)));
    Ok(Array::from(BoolArray::try_new(DType::bool(nullable), bits, validity)?))
}

/// Compare two arrays elementwise.
///
/// The operands must have the same dtype up to nullability
/// ([`StratumError::TypeMismatch`] otherwise) and the same length. The result is
/// a Bool array, nullable if either operand is, with a null wherever either
/// operand is null.
pub fn compare(lhs: &Array, rhs: &Array, op: CompareOp) -> Result<Array> {
    if !lhs.dtype().eq_ignore_nullability(rhs.dtype()) {
        return Err(StratumError::TypeMismatch(format!(
            "cannot compare {} {op} {}",
            lhs.dtype(),
            rhs.dtype()
        )));
    }
    check_comparable(lhs.dtype())?;
    if lhs.len() != rhs.len() {
        return Err(StratumError::InvalidArgument(format!(
            "cannot compare arrays of length {} and {}",
            lhs.len(),
            rhs.len()
        )));
    }
    let (lhs, rhs) = (lhs.flatten()?, rhs.flatten()?);
    let mut values = Vec::with_capacity(lhs.len());
    for i in 0..lhs.len() {
        let (a, b) = (lhs.scalar_at(i)?, rhs.scalar_at(i)?);
        values.push(if a.is_null() || b.is_null() {
            None
        } else {
            Some(op.matches(a.compare(&b)))
        });
    }
    bool_result(
        values,
        lhs.dtype().is_nullable() || rhs.dtype().is_nullable(),
    )
}

/// Compare every element of `array` against one scalar.
///
/// Integer scalars are accepted for float arrays. A null scalar makes every slot null.
pub fn compare_scalar(array: &Array, scalar: &Scalar, op: CompareOp) -> Result<Array> {
    check_comparable(array.dtype())?;
    if scalar.is_null() {
        return bool_result(vec![None; array.len()], true);
    }
    let scalar = coerce(array.dtype(), scalar)?;
    let flat = array.flatten()?;
    let mut values = Vec::with_capacity(flat.len());
    for i in 0..flat.len() {
        let value = flat.scalar_at(i)?;
        values.push((!value.is_null()).then(|| op.matches(value.compare(&scalar))));
    }
    bool_result(values, array.dtype().is_nullable())
}

/// Convert `scalar` to the scalar kind `dtype` produces.
pub(crate) fn coerce(dtype: &DType, scalar: &Scalar) -> Result<Scalar> {
    let coerced = match (dtype, scalar) {
        (DType::Int(..), Scalar::Int(_) | Scalar::UInt(_)) => Some(scalar.clone()),
        (DType::Float(..), Scalar::Float(_)) => Some(scalar.clone()),
        (DType::Float(..), Scalar::Int(v)) => Some(Scalar::Float(*v as f64)),
        (DType::Float(..), Scalar::UInt(v)) => Some(Scalar::Float(*v as f64)),
        (DType::Bool(_), Scalar::Bool(_)) => Some(scalar.clone()),
        (DType::Utf8(_), Scalar::Utf8(_)) => Some(scalar.clone()),
        (DType::Binary(_), Scalar::Binary(_)) => Some(scalar.clone()),
        (DType::Binary(_), Scalar::Utf8(s)) => Some(Scalar::Binary(s.as_bytes().to_vec())),
        _ => None,
    };
    coerced.ok_or_else(|| {
        StratumError::TypeMismatch(format!("cannot compare {dtype} with {scalar}"))
    })
}
