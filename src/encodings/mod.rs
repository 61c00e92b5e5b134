//! Compressed encodings layered over the canonical arrays.
//!
//! | Encoding | Source dtype | Layout |
//! |----------|--------------|--------|
//! | [`RunEndArray`] | any | run ends + one value per run |
//! | [`RoaringBoolArray`] | bool, no nulls | bitmap of true positions |
//! | [`RoaringIntArray`] | unsigned, strictly increasing | bitmap of members |
//! | [`ZigZagArray`] | signed int | unsigned mapped child |
//!
//! Every encoding decodes back to a canonical array of the same dtype.

mod roaring_bool;
mod roaring_int;
mod runend;
mod zigzag;

pub use roaring_bool::RoaringBoolArray;
pub use roaring_int::RoaringIntArray;
pub use runend::RunEndArray;
pub use zigzag::ZigZagArray;
