//! # Voxel Error Types
//!
//! All errors that can occur in block, palette, registry and world handling.
//!
//! Missing material/geometry/texture lookups are NOT errors: the mesher
//! substitutes a fallback and records the miss in its stats.

use thiserror::Error;
use webcraft_core::CoreError;

/// Errors that can occur in the voxel layer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VoxelError {
    /// Requested a block property outside the closed catalog.
    #[error("unknown block property: {0}")]
    UnknownProperty(String),

    /// Face name or index does not name one of the six faces.
    #[error("unknown face: {0}")]
    UnknownFace(String),

    /// The chunk palette cannot address another entry.
    #[error("palette full: {capacity} entries")]
    PaletteFull {
        /// Maximum number of entries.
        capacity: usize,
    },

    /// Engine configuration could not be parsed or failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A decoded block model document references something that does not exist.
    #[error("invalid block model definition: {0}")]
    InvalidDefinition(String),

    /// A quad offset does not address a chunk slot of the instance buffer.
    #[error("quad offset {quad_offset} does not address a chunk slot")]
    InvalidSlot {
        /// The rejected offset, in quads.
        quad_offset: u32,
    },

    /// A chunk produced more quads than its slot holds.
    #[error("{quads} quads overflow the {capacity}-quad slot at offset {quad_offset}")]
    SlotOverflow {
        /// Slot start, in quads.
        quad_offset: u32,
        /// Quads the chunk produced.
        quads: usize,
        /// Slot capacity, in quads.
        capacity: u32,
    },

    /// Every chunk slot of the instance buffer is in use.
    #[error("all {slots} chunk slots are in use")]
    ChunkSlotsExhausted {
        /// Number of slots configured.
        slots: u32,
    },

    /// Error from the core primitives.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for voxel operations.
pub type VoxelResult<T> = Result<T, VoxelError>;
