//! # WEBCRAFT Core
//!
//! Data-oriented primitives shared by the voxel pipeline:
//! - [`BitFieldLayout`]: named fields packed into fixed-width words
//! - [`Array3D`]: dense linear 3D grid of 16-bit cells
//!
//! ## Architecture Rules
//!
//! 1. **Layouts are values** - computed once by a `const fn`, never mutated
//! 2. **No checks in the hot path** - bounds are `debug_assert!`ed, checked
//!    accessors exist for callers at the boundary
//! 3. **Fixed-width words** - every packed record is a slice of `u32`
//!
//! ## Example
//!
//! ```rust
//! use webcraft_core::{BitFieldLayout, BitOrder, FieldSpec};
//!
//! const LAYOUT: BitFieldLayout<2> = match BitFieldLayout::compile(
//!     [FieldSpec::new("kind", 4), FieldSpec::new("level", 3)],
//!     8,
//!     BitOrder::LsbFirst,
//! ) {
//!     Ok(layout) => layout,
//!     Err(_) => panic!("invalid layout"),
//! };
//!
//! let mut words = [0u32; 1];
//! LAYOUT.set(&mut words, 0, 1, 5);
//! assert_eq!(LAYOUT.get(&words, 0, 1), 5);
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod bits;
pub mod error;
pub mod memory;

pub use bits::{BitFieldLayout, BitOrder, FieldSlot, FieldSpec, MAX_BUCKET_BITS};
pub use error::{CoreError, CoreResult};
pub use memory::Array3D;
