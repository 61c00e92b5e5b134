//! Row predicates evaluated elementwise over struct arrays.
//!
//! An [`Expr`] is a small tree of column references, literals and operators.
//! Evaluating it against a [`StructArray`] yields one value per row; predicates
//! yield a Bool array that [`crate::Dataset`] uses as a selection mask.
//!
//! ```
//! use stratum::expr::{col, lit};
//! use stratum::{Array, PrimitiveArray, Scalar, StructArray};
//!
//! let table = StructArray::from_fields([
//!     ("id", Array::from(PrimitiveArray::from_vec(vec![1i64, 2, 3]))),
//! ])
//! .unwrap();
//! let mask = col("id").gt(lit(1i64)).evaluate(&table).unwrap();
//! assert_eq!(
//!     mask.scalars().unwrap(),
//!     vec![Scalar::Bool(false), Scalar::Bool(true), Scalar::Bool(true)]
//! );
//! ```

use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

use crate::array::{Array, NullArray, StructArray};
use crate::compute::{self, ArrayBuilder, CompareOp};
use crate::dtype::DType;
use crate::error::StratumError;
use crate::scalar::Scalar;
use crate::Result;

/// Operators of a [`Expr::BinaryOp`] node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// Logical AND of two or more Bool operands.
    And,
    /// Logical OR of two or more Bool operands.
    Or,
    /// Logical XOR of two or more Bool operands.
    Xor,
    /// Logical NOT of one Bool operand.
    Not,
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

impl Operator {
    fn comparison(self) -> Option<CompareOp> {
        match self {
            Operator::Eq => Some(CompareOp::Eq),
            Operator::NotEq => Some(CompareOp::NotEq),
            Operator::Lt => Some(CompareOp::Lt),
            Operator::Lte => Some(CompareOp::Lte),
            Operator::Gt => Some(CompareOp::Gt),
            Operator::Gte => Some(CompareOp::Gte),
            Operator::And | Operator::Or | Operator::Xor | Operator::Not => None,
        }
    }

    fn check_arity(self, count: usize) -> Result<()> {
        let ok = match self {
            Operator::Not => count == 1,
            Operator::And | Operator::Or | Operator::Xor => count >= 2,
            _ => count == 2,
        };
        if !ok {
            return Err(StratumError::InvalidExpression(format!(
                "{self} does not take {count} operands"
            )));
        }
        Ok(())
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Operator::And => "and",
            Operator::Or => "or",
            Operator::Xor => "xor",
            Operator::Not => "not",
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
        })
    }
}

/// An expression over the columns of a struct array.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// The field with this name.
    Column(String),
    /// A constant broadcast to every row.
    Literal {
        /// Type of the constant.
        dtype: DType,
        /// The constant.
        value: Scalar,
    },
    /// An operator applied to its operands.
    BinaryOp {
        /// The operator.
        op: Operator,
        /// Operands, in order.
        operands: Vec<Expr>,
    },
}

/// Reference a column by name.
pub fn col(name: impl Into<String>) -> Expr {
    Expr::Column(name.into())
}

/// A literal whose dtype is inferred from the scalar: 64-bit numbers, non-nullable
/// unless the value is null.
pub fn lit(value: impl Into<Scalar>) -> Expr {
    let value = value.into();
    Expr::Literal {
        dtype: infer_dtype(&value),
        value,
    }
}

fn infer_dtype(value: &Scalar) -> DType {
    match value {
        Scalar::Null => DType::Null,
        Scalar::Bool(_) => DType::bool(false),
        Scalar::Int(_) => DType::default_int(),
        Scalar::UInt(_) => DType::from(crate::ptype::PType::U64),
        Scalar::Float(_) => DType::from(crate::ptype::PType::F64),
        Scalar::Utf8(_) => DType::utf8(false),
        Scalar::Binary(_) => DType::binary(false),
        Scalar::Struct(values) => DType::struct_(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| (format!("f{i}"), infer_dtype(v).as_nullable())),
            false,
        ),
    }
}

impl Expr {
    /// A literal with an explicit dtype.
    pub fn literal(dtype: DType, value: impl Into<Scalar>) -> Expr {
        Expr::Literal {
            dtype,
            value: value.into(),
        }
    }

    /// Apply `op` to `operands`, checking the operator's arity.
    pub fn try_binary(op: Operator, operands: Vec<Expr>) -> Result<Expr> {
        op.check_arity(operands.len())?;
        Ok(Expr::BinaryOp { op, operands })
    }

    fn binary(self, op: Operator, other: Expr) -> Expr {
        Expr::BinaryOp {
            op,
            operands: vec![self, other],
        }
    }

    /// `self == other`
    #[allow(clippy::should_implement_trait)]
    pub fn eq(self, other: Expr) -> Expr {
        self.binary(Operator::Eq, other)
    }

    /// `self != other`
    pub fn not_eq(self, other: Expr) -> Expr {
        self.binary(Operator::NotEq, other)
    }

    /// `self < other`
    pub fn lt(self, other: Expr) -> Expr {
        self.binary(Operator::Lt, other)
    }

    /// `self <= other`
    pub fn lte(self, other: Expr) -> Expr {
        self.binary(Operator::Lte, other)
    }

    /// `self > other`
    pub fn gt(self, other: Expr) -> Expr {
        self.binary(Operator::Gt, other)
    }

    /// `self >= other`
    pub fn gte(self, other: Expr) -> Expr {
        self.binary(Operator::Gte, other)
    }

    /// `self and other`; chained calls flatten into one n-ary node.
    pub fn and(self, other: Expr) -> Expr {
        self.logical(Operator::And, other)
    }

    /// `self or other`; chained calls flatten into one n-ary node.
    pub fn or(self, other: Expr) -> Expr {
        self.logical(Operator::Or, other)
    }

    /// `self xor other`; chained calls flatten into one n-ary node.
    pub fn xor(self, other: Expr) -> Expr {
        self.logical(Operator::Xor, other)
    }

    /// `not self`
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Expr {
        Expr::BinaryOp {
            op: Operator::Not,
            operands: vec![self],
        }
    }

    fn logical(self, op: Operator, other: Expr) -> Expr {
        match self {
            Expr::BinaryOp {
                op: existing,
                mut operands,
            } if existing == op => {
                operands.push(other);
                Expr::BinaryOp { op, operands }
            }
            lhs => lhs.binary(op, other),
        }
    }

    /// Names of every column the expression reads, sorted and deduplicated.
    pub fn referenced_columns(&self) -> BTreeSet<&str> {
        let mut out = BTreeSet::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut BTreeSet<&'a str>) {
        match self {
            Expr::Column(name) => {
                out.insert(name.as_str());
            }
            Expr::Literal { .. } => {}
            Expr::BinaryOp { operands, .. } => {
                operands.iter().for_each(|e| e.collect_columns(out));
            }
        }
    }

    /// Evaluate against every row of `table`.
    ///
    /// Comparisons yield a Bool array, nullable if either side is; logical
    /// operators require Bool operands and propagate nulls. Unknown columns fail
    /// with [`StratumError::UnknownColumn`]; a malformed tree fails with
    /// [`StratumError::InvalidExpression`].
    pub fn evaluate(&self, table: &StructArray) -> Result<Array> {
        match self {
            Expr::Column(name) => table
                .field_by_name(name)
                .cloned()
                .ok_or_else(|| StratumError::UnknownColumn(name.clone())),
            Expr::Literal { dtype, value } => {
                check_literal(dtype, value)?;
                constant(dtype, value, table.len())
            }
            Expr::BinaryOp { op, operands } => {
                op.check_arity(operands.len())?;
                match op.comparison() {
                    Some(cmp) => evaluate_comparison(cmp, &operands[0], &operands[1], table),
                    None => evaluate_logical(*op, operands, table),
                }
            }
        }
    }
}

fn evaluate_comparison(op: CompareOp, lhs: &Expr, rhs: &Expr, table: &StructArray) -> Result<Array> {
    match (lhs, rhs) {
        (lhs, Expr::Literal { dtype, value }) if !matches!(lhs, Expr::Literal { .. }) => {
            check_literal(dtype, value)?;
            compute::compare_scalar(&lhs.evaluate(table)?, value, op)
        }
        (Expr::Literal { dtype, value }, rhs) if !matches!(rhs, Expr::Literal { .. }) => {
            check_literal(dtype, value)?;
            compute::compare_scalar(&rhs.evaluate(table)?, value, op.swap())
        }
        _ => compute::compare(&lhs.evaluate(table)?, &rhs.evaluate(table)?, op),
    }
}

fn evaluate_logical(op: Operator, operands: &[Expr], table: &StructArray) -> Result<Array> {
    let mut values = operands
        .iter()
        .map(|e| {
            let value = e.evaluate(table)?;
            if !matches!(value.dtype(), DType::Bool(_)) {
                return Err(StratumError::InvalidExpression(format!(
                    "{op} operand {e} is {}, not bool",
                    value.dtype()
                )));
            }
            Ok(value)
        })
        .collect::<Result<Vec<_>>>()?
        .into_iter();

    let Some(first) = values.next() else {
        return Err(StratumError::InvalidExpression(format!("{op} without operands")));
    };
    if op == Operator::Not {
        return compute::not(&first);
    }
    values.try_fold(first, |acc, next| match op {
        Operator::And => compute::and(&acc, &next),
        Operator::Or => compute::or(&acc, &next),
        _ => compute::xor(&acc, &next),
    })
}

/// `value` repeated `len` times.
/// A literal's value must be storable in its declared dtype.
fn check_literal(dtype: &DType, value: &Scalar) -> Result<()> {
    ArrayBuilder::new(dtype).push(value).map_err(|_| {
        StratumError::InvalidExpression(format!("literal {value} does not fit {dtype}"))
    })
}

fn constant(dtype: &DType, value: &Scalar, len: usize) -> Result<Array> {
    if *dtype == DType::Null {
        return Ok(Array::from(NullArray::new(len)));
    }
    let mut builder = ArrayBuilder::with_capacity(dtype, len);
    for _ in 0..len {
        builder.push(value)?;
    }
    builder.finish()
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Column(name) => write!(f, "${name}"),
            Expr::Literal { value, .. } => write!(f, "{value}"),
            Expr::BinaryOp {
                op: Operator::Not,
                operands,
            } => {
                f.write_str("(not")?;
                for operand in operands {
                    write!(f, " {operand}")?;
                }
                f.write_str(")")
            }
            Expr::BinaryOp { op, operands } => {
                f.write_str("(")?;
                for (i, operand) in operands.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {op} ")?;
                    }
                    write!(f, "{operand}")?;
                }
                f.write_str(")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::array::{BoolArray, PrimitiveArray, VarBinArray};

    fn table() -> StructArray {
        StructArray::from_fields([
            (
                "id",
                Array::from(PrimitiveArray::from_nullable_vec(vec![
                    Some(1i32),
                    Some(2),
                    None,
                    Some(4),
                ])),
            ),
            ("name", Array::from(VarBinArray::from_strs(["a", "b", "c", "d"]))),
            (
                "flag",
                Array::from(BoolArray::from_bools([true, false, true, true])),
            ),
        ])
        .unwrap()
    }

    fn bools(values: &[Option<bool>]) -> Vec<Scalar> {
        values.iter().map(|v| Scalar::from(*v)).collect()
    }

    #[test]
    fn test_comparison_with_literal_on_either_side() {
        let forward = col("id").gte(lit(2i64)).evaluate(&table()).unwrap();
        let swapped = lit(2i64).lte(col("id")).evaluate(&table()).unwrap();
        let expected = bools(&[Some(false), Some(true), None, Some(true)]);
        assert_eq!(forward.scalars().unwrap(), expected);
        assert_eq!(swapped.scalars().unwrap(), expected);
    }

    #[test]
    fn test_logical_fold() {
        let expr = col("flag")
            .and(col("name").not_eq(lit("d")))
            .and(col("id").lt(lit(10i64)));
        assert!(matches!(&expr, Expr::BinaryOp { operands, .. } if operands.len() == 3));
        let mask = expr.evaluate(&table()).unwrap();
        assert_eq!(
            mask.scalars().unwrap(),
            bools(&[Some(true), Some(false), None, Some(false)])
        );
        let negated = col("flag").not().evaluate(&table()).unwrap();
        assert_eq!(
            negated.scalars().unwrap(),
            bools(&[Some(false), Some(true), Some(false), Some(false)])
        );
    }

    #[test]
    fn test_arity_is_checked() {
        assert!(matches!(
            Expr::try_binary(Operator::Not, vec![col("a"), col("b")]),
            Err(StratumError::InvalidExpression(_))
        ));
        let bad = Expr::BinaryOp {
            op: Operator::And,
            operands: vec![col("flag")],
        };
        assert!(matches!(
            bad.evaluate(&table()),
            Err(StratumError::InvalidExpression(_))
        ));
    }

    #[test]
    fn test_non_bool_logical_operand() {
        let expr = col("flag").or(col("id"));
        assert!(matches!(
            expr.evaluate(&table()),
            Err(StratumError::InvalidExpression(_))
        ));
    }

    #[test]
    fn test_unknown_column() {
        let expr = col("missing").eq(lit(1i64));
        assert!(matches!(
            expr.evaluate(&table()),
            Err(StratumError::UnknownColumn(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_referenced_columns_and_display() {
        let expr = col("b").gt(lit(1i64)).or(col("a").eq(col("b")));
        assert_eq!(expr.referenced_columns().into_iter().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(expr.to_string(), "(($b > 1) or ($a = $b))");
    }

    #[test]
    fn test_literal_broadcast() {
        let value = lit("x").evaluate(&table()).unwrap();
        assert_eq!(value.len(), 4);
        assert_eq!(value.scalar_at(3).unwrap(), Scalar::from("x"));
        let null = lit(Option::<i64>::None).evaluate(&table()).unwrap();
        assert_eq!(null.null_count().unwrap(), 4);
    }

    #[test]
    fn test_literal_must_fit_its_dtype() {
        let wrong_kind = Expr::literal(DType::utf8(false), 3i64);
        let out_of_range = Expr::literal(DType::int(8, true, false).unwrap(), 1000i64);
        let null_in_non_nullable = Expr::literal(DType::default_int(), Scalar::Null);
        for literal in [wrong_kind, out_of_range, null_in_non_nullable] {
            assert!(matches!(
                col("id").eq(literal.clone()).evaluate(&table()),
                Err(StratumError::InvalidExpression(_))
            ));
            assert!(matches!(
                literal.clone().lt(col("id")).evaluate(&table()),
                Err(StratumError::InvalidExpression(_))
            ));
            let empty = table().slice_unchecked(0, 0).unwrap();
            assert!(matches!(
                literal.evaluate(&empty),
                Err(StratumError::InvalidExpression(_))
            ));
        }
        let typed = Expr::literal(DType::int(8, true, false).unwrap(), 2i64);
        let mask = col("id").eq(typed).evaluate(&table()).unwrap();
        assert_eq!(mask.scalars().unwrap(), bools(&[Some(false), Some(true), None, Some(false)]));
    }
}
