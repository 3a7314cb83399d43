//! Voxel chunk data structures.
//!
//! Chunks are 16x16x16 voxels. Each column along an axis fits one `u16`,
//! which is what the mesher's face culling works on.

use webcraft_core::{Array3D, CoreError};

use super::block_state::{BlockProperty, BlockState, BlockStateRegistry};
use super::palette::{BlockPalette, AIR_INDEX};
use crate::error::VoxelResult;

/// Chunk dimension - 16 voxels per axis.
pub const CHUNK_SIZE: usize = 16;

/// Total voxels per chunk.
pub const CHUNK_VOLUME: usize = CHUNK_SIZE * CHUNK_SIZE * CHUNK_SIZE;

/// Chunk coordinate in world space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkCoord {
    /// X coordinate.
    pub x: i32,
    /// Y coordinate.
    pub y: i32,
    /// Z coordinate.
    pub z: i32,
}

impl ChunkCoord {
    /// Creates a new chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Chunk containing a world position.
    #[inline]
    #[must_use]
    pub const fn from_world_pos(x: i32, y: i32, z: i32) -> Self {
        Self::new(
            x.div_euclid(CHUNK_SIZE as i32),
            y.div_euclid(CHUNK_SIZE as i32),
            z.div_euclid(CHUNK_SIZE as i32),
        )
    }

    /// Local position of a world position inside its chunk.
    #[inline]
    #[must_use]
    pub const fn local(x: i32, y: i32, z: i32) -> (usize, usize, usize) {
        // rem_euclid is in 0..CHUNK_SIZE
        (
            x.rem_euclid(CHUNK_SIZE as i32) as usize,
            y.rem_euclid(CHUNK_SIZE as i32) as usize,
            z.rem_euclid(CHUNK_SIZE as i32) as usize,
        )
    }
}

/// Where a chunk's quads live in the shared instance buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawRange {
    /// First quad of the chunk's slot. Fixed at creation.
    pub quad_offset: u32,
    /// Quads produced by the last mesh run.
    pub quad_count: u32,
}

/// A chunk of voxels - 16x16x16 = 4,096 palette indices.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// The coordinate of this chunk in world space.
    coord: ChunkCoord,

    /// Instance buffer slot.
    slot: u32,

    /// Palette indices, `Array3D` order.
    voxels: Array3D,

    /// States referenced by `voxels`.
    palette: BlockPalette,

    /// Published draw range.
    draw: DrawRange,

    /// Dirty flag - set when chunk needs re-meshing.
    dirty: bool,

    /// Number of non-air voxels.
    solid_count: u32,
}

impl Chunk {
    /// Creates an empty chunk in slot 0.
    #[must_use]
    pub fn new(coord: ChunkCoord) -> Self {
        Self::with_slot(coord, 0, 0)
    }

    /// Creates an empty chunk bound to an instance buffer slot.
    #[must_use]
    pub fn with_slot(coord: ChunkCoord, slot: u32, quad_offset: u32) -> Self {
        Self {
            coord,
            slot,
            voxels: Array3D::cube(CHUNK_SIZE),
            palette: BlockPalette::new(),
            draw: DrawRange {
                quad_offset,
                quad_count: 0,
            },
            dirty: true,
            solid_count: 0,
        }
    }

    /// Returns the chunk coordinate.
    #[inline]
    #[must_use]
    pub const fn coord(&self) -> ChunkCoord {
        self.coord
    }

    /// Instance buffer slot.
    #[inline]
    #[must_use]
    pub const fn slot(&self) -> u32 {
        self.slot
    }

    /// Published draw range.
    #[inline]
    #[must_use]
    pub const fn draw_range(&self) -> DrawRange {
        self.draw
    }

    pub(crate) fn set_quad_count(&mut self, quad_count: u32) {
        self.draw.quad_count = quad_count;
    }

    /// Returns true if the chunk needs re-meshing.
    #[inline]
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Marks the chunk as needing re-meshing.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Clears the dirty flag.
    #[inline]
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// The chunk palette.
    #[inline]
    #[must_use]
    pub const fn palette(&self) -> &BlockPalette {
        &self.palette
    }

    /// Palette indices.
    #[inline]
    #[must_use]
    pub const fn voxels(&self) -> &Array3D {
        &self.voxels
    }

    /// Palette index at a local position (hot path, debug-checked).
    #[inline]
    #[must_use]
    pub fn palette_index(&self, x: usize, y: usize, z: usize) -> u16 {
        self.voxels.get(x, y, z)
    }

    /// Block state at a local position. `None` for air or out of bounds.
    #[must_use]
    pub fn block(&self, x: usize, y: usize, z: usize) -> Option<&BlockState> {
        self.palette.get_type(self.voxels.try_get(x, y, z)?)
    }

    /// Places a block and returns its palette index.
    ///
    /// # Errors
    /// `OutOfBounds` for positions outside the chunk, `PaletteFull` if the
    /// state cannot be interned.
    pub fn set_block(&mut self, x: usize, y: usize, z: usize, state: &BlockState) -> VoxelResult<u16> {
        let previous = self.checked_index(x, y, z)?;
        let id = self.palette.add(state)?;
        self.voxels.set(x, y, z, id);
        if previous == AIR_INDEX {
            self.solid_count += 1;
        }
        self.dirty = true;
        Ok(id)
    }

    /// Removes the block at a local position.
    ///
    /// # Errors
    /// `OutOfBounds` for positions outside the chunk.
    pub fn clear_block(&mut self, x: usize, y: usize, z: usize) -> VoxelResult<()> {
        let previous = self.checked_index(x, y, z)?;
        self.voxels.set(x, y, z, AIR_INDEX);
        if previous != AIR_INDEX {
            self.solid_count -= 1;
        }
        self.dirty = true;
        Ok(())
    }

    /// Changes one property of the block at a local position.
    ///
    /// The changed state is interned as its own palette entry; entries
    /// already in the palette are never modified. Returns the new palette
    /// index, or `None` if the position holds air.
    ///
    /// # Errors
    /// `OutOfBounds` or `PaletteFull`.
    pub fn set_property(
        &mut self,
        x: usize,
        y: usize,
        z: usize,
        registry: &BlockStateRegistry,
        property: BlockProperty,
        value: u32,
    ) -> VoxelResult<Option<u16>> {
        let index = self.checked_index(x, y, z)?;
        let Some(current) = self.palette.get_type(index) else {
            return Ok(None);
        };
        let next = registry.set(current, property, value);
        self.set_block(x, y, z, &next).map(Some)
    }

    fn checked_index(&self, x: usize, y: usize, z: usize) -> VoxelResult<u16> {
        self.voxels.try_get(x, y, z).ok_or_else(|| {
            CoreError::OutOfBounds {
                x,
                y,
                z,
                sx: CHUNK_SIZE,
                sy: CHUNK_SIZE,
                sz: CHUNK_SIZE,
            }
            .into()
        })
    }

    /// Fills the whole chunk with one state.
    ///
    /// # Errors
    /// `PaletteFull` if the state cannot be interned.
    pub fn fill(&mut self, state: &BlockState) -> VoxelResult<()> {
        let id = self.palette.add(state)?;
        self.voxels.fill(id);
        self.solid_count = CHUNK_VOLUME as u32;
        self.dirty = true;
        Ok(())
    }

    /// Returns the number of non-air voxels.
    #[inline]
    #[must_use]
    pub const fn solid_count(&self) -> u32 {
        self.solid_count
    }

    /// Returns true if the chunk holds only air.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.solid_count == 0
    }
}
