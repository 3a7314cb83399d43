//! # WEBCRAFT Rendering
//!
//! CPU side of the voxel renderer: block states, chunk palettes and a
//! bitmask mesher that emits packed quad instances.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        MESH PIPELINE                          │
//! ├──────────────────────────────────────────────────────────────┤
//! │  set_block → Palette → Chunk (dirty) → ChunkMesher            │
//! │                                           ↓                   │
//! │            BlockModel lookups → QuadRecord × N → QuadSink     │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rules
//!
//! - One mesher per thread, scratch buffers reused across chunks
//! - Quads are 3 packed words, never expanded to vertices on the CPU
//! - Missing lookups degrade to a fallback texture, they never fail a mesh
//! - No logging subscriber is installed here; the host decides

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod error;
pub mod instancing;
pub mod voxel;

pub use config::EngineConfig;
pub use error::{VoxelError, VoxelResult};
pub use instancing::{InstanceBuffer, QuadSink};
pub use voxel::{
    BlockModel, BlockPalette, BlockProperty, BlockState, BlockStateRegistry, Chunk, ChunkCoord,
    ChunkMesher, DrawRange, Face, MeshStats, QuadRecord, VoxelWorld,
};
