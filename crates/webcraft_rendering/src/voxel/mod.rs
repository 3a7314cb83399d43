//! Voxel data and chunk meshing.
//!
//! Flow: block states are interned into a per-chunk palette, the chunk grid
//! stores palette indices, and the mesher turns a chunk into packed quads
//! that the world publishes into the instance buffer.

pub mod block_state;
pub mod chunk;
pub mod face;
pub mod mesher;
pub mod palette;
pub mod quad;
pub mod registry;
pub mod world;

pub use block_state::{BlockProperty, BlockState, BlockStateRegistry, BlockStateRegistryBuilder, STATE_LAYOUT};
pub use chunk::{Chunk, ChunkCoord, DrawRange, CHUNK_SIZE, CHUNK_VOLUME};
pub use face::Face;
pub use mesher::{exposed_bits, ChunkMesher, ExposedFaces, MeshPhase, MeshStats};
pub use palette::{BlockPalette, AIR_INDEX};
pub use quad::{QuadFields, QuadRecord, QUAD_LAYOUT, WORDS_PER_QUAD};
pub use registry::{
    BlockModel, CubeTransform, GeometryDef, GeometryId, GeometryRegistry, MaterialDef, MaterialId,
    MaterialRegistry, SubCube, TextureAtlas, TileId,
};
pub use world::{RemeshReport, VoxelWorld};
