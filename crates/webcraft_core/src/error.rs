//! # Core Error Types
//!
//! All errors raised by the packing and grid primitives.

use thiserror::Error;

/// Errors that can occur in the core primitives.
///
/// Kept free of heap data so layouts can be compiled in `const` context.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoreError {
    /// A field cannot be placed in the requested bucket width.
    #[error("invalid layout: field `{field}` is {bits} bits wide, buckets hold {bucket_bits} bits")]
    InvalidLayout {
        /// Name of the offending field.
        field: &'static str,
        /// Width the field asked for.
        bits: u32,
        /// Width of one bucket.
        bucket_bits: u32,
    },

    /// A grid coordinate lies outside the grid dimensions.
    #[error("coordinate ({x}, {y}, {z}) out of bounds for grid {sx}x{sy}x{sz}")]
    OutOfBounds {
        /// X coordinate.
        x: usize,
        /// Y coordinate.
        y: usize,
        /// Z coordinate.
        z: usize,
        /// Grid size along X.
        sx: usize,
        /// Grid size along Y.
        sy: usize,
        /// Grid size along Z.
        sz: usize,
    },
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
