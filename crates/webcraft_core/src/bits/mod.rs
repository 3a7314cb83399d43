//! Bit-field layouts.
//!
//! A layout maps an ordered list of named fields onto a run of fixed-width
//! buckets. Get/set are small inlined functions driven by a table of
//! `(bucket, offset, mask)` entries computed once at compile time.

mod layout;

pub use layout::{BitFieldLayout, BitOrder, FieldSlot, FieldSpec, MAX_BUCKET_BITS};
