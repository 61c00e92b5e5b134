//! Kernels over arrays of any encoding.
//!
//! Kernels flatten their inputs and produce canonical outputs. Nulls propagate:
//! a null operand yields a null result slot.

mod boolean;
mod builder;
mod compare;
mod concat;
mod take;

pub use boolean::{and, not, or, xor};
pub use builder::ArrayBuilder;
pub use compare::{compare, compare_scalar, CompareOp};
pub use concat::concat;
pub use take::{filter, take};

use crate::array::Array;
use crate::Result;

impl Array {
    /// Gather the elements at `indices`. See [`take`].
    pub fn take(&self, indices: &Array) -> Result<Array> {
        take(self, indices)
    }

    /// Keep the elements where `mask` is true. See [`filter`].
    pub fn filter(&self, mask: &Array) -> Result<Array> {
        filter(self, mask)
    }

    /// Compare elementwise against `other`. See [`compare`].
    pub fn compare(&self, other: &Array, op: CompareOp) -> Result<Array> {
        compare(self, other, op)
    }
}
