//! # stratum
//!
//! Typed, nullable columnar arrays with pluggable physical encodings, automatic
//! compression and a self-describing binary format.
//!
//! ## Overview
//!
//! An [`Array`] pairs a logical [`DType`] with one physical encoding. Every
//! encoding answers the same questions (`len`, `scalar_at`, `slice`, `nbytes`) and
//! can be decoded back to a canonical layout, so callers never need to know how
//! values are stored:
//!
//! 1. **Canonical encodings** hold values directly: Null, Primitive, VarBin, Bool,
//!    Struct and Chunked.
//! 2. **Compressed encodings** ([`encodings`]) trade random access cost for size:
//!    RunEnd, RoaringBool, RoaringInt and ZigZag.
//! 3. The [`Compressor`] measures each candidate encoding and keeps the smallest,
//!    recursing into the children of the winner.
//! 4. [`serialize`] writes any array, compressed or not, to a byte stream and reads
//!    it back exactly.
//!
//! ## Encodings
//!
//! | Encoding | Holds | Chosen when |
//! |----------|-------|-------------|
//! | RunEnd | runs of equal values | average run length is at least 2 |
//! | ZigZag | signed integers as unsigned | the minimum is negative |
//! | RoaringBool | set positions of a Bool array | long or sparse, no nulls |
//! | RoaringInt | strictly increasing unsigned integers | values fit in 32 bits |
//!
//! ## Quick Start
//!
//! ```rust
//! use stratum::{serialize, Array, PrimitiveArray};
//!
//! let array = Array::from(PrimitiveArray::from_vec(vec![0i32, 0, 0, 0, 9, 9, 9, 9, 1, 5]));
//!
//! // Pick the smallest encoding.
//! let compressed = stratum::compress(&array).unwrap();
//! assert!(compressed.nbytes() < array.nbytes());
//! assert_eq!(compressed.scalar_at(4).unwrap(), array.scalar_at(4).unwrap());
//!
//! // Round trip through bytes without decompressing.
//! let bytes = serialize::to_bytes(&compressed).unwrap();
//! let read = serialize::from_bytes(array.dtype(), &bytes).unwrap();
//! assert_eq!(read, compressed);
//! assert_eq!(read.to_canonical().unwrap(), array);
//! ```
//!
//! ## Scanning
//!
//! A [`Dataset`] wraps a struct-typed array and materializes projected, filtered
//! and batched views of it, with filters written as [`Expr`] trees.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod bitpack;
mod error;
mod ptype;
mod scalar;
mod stats;

pub mod array;
pub mod compress;
pub mod compute;
pub mod dataset;
pub mod dtype;
pub mod encodings;
pub mod expr;
pub mod serialize;

pub use array::{
    Array, BoolArray, ChunkedArray, EncodingId, NullArray, OffsetWidth, PrimitiveArray,
    StructArray, VarBinArray,
};
pub use bitpack::BitBuffer;
pub use compress::{CompressConfig, Compressor};
pub use compute::{ArrayBuilder, CompareOp};
pub use dataset::Dataset;
pub use dtype::{DType, Field, FloatWidth, IntWidth, Nullability, Signedness};
pub use encodings::{RoaringBoolArray, RoaringIntArray, RunEndArray, ZigZagArray};
pub use error::StratumError;
pub use expr::{Expr, Operator};
pub use ptype::{NativePType, PType};
pub use scalar::Scalar;
pub use stats::ArrayStats;

/// Convenience type alias for Results with StratumError.
pub type Result<T> = std::result::Result<T, StratumError>;

/// Compress `array` with the default [`Compressor`].
pub fn compress(array: &Array) -> Result<Array> {
    Compressor::default().compress(array)
}
