//! Memory layouts for voxel data.
//!
//! - [`Array3D`]: dense linear grid, used for voxels and bitmask scratch space

mod array3d;

pub use array3d::Array3D;
