//! Voxel world management.
//!
//! Owns the loaded chunks, hands out instance buffer slots and schedules
//! dirty chunks for re-meshing through a single mesher.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;

use super::block_state::{BlockProperty, BlockState, BlockStateRegistry};
use super::chunk::{Chunk, ChunkCoord, DrawRange};
use super::mesher::ChunkMesher;
use super::registry::BlockModel;
use crate::config::EngineConfig;
use crate::error::{VoxelError, VoxelResult};
use crate::instancing::QuadSink;

/// Outcome of one [`VoxelWorld::remesh_dirty`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RemeshReport {
    /// Chunks meshed and published.
    pub chunks: usize,
    /// Quads published.
    pub quads: u64,
    /// Chunks whose mesh did not fit their slot and now draw nothing.
    pub overflowed: usize,
}

#[derive(Debug, Default)]
struct SlotAllocator {
    next: u32,
    free: Vec<u32>,
}

/// Voxel world containing multiple chunks.
///
/// Thread-safe for concurrent read access from rendering thread
/// while game logic writes updates.
pub struct VoxelWorld {
    /// Chunks indexed by coordinate.
    chunks: RwLock<HashMap<ChunkCoord, Chunk>>,

    /// List of dirty chunks that need re-meshing.
    dirty_chunks: RwLock<Vec<ChunkCoord>>,

    /// Instance buffer slots.
    slots: Mutex<SlotAllocator>,

    chunk_slots: u32,
    quads_per_chunk: u32,
}

impl VoxelWorld {
    /// Creates a new empty voxel world with one slot per configured chunk.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            chunks: RwLock::new(HashMap::with_capacity(config.chunk_slots as usize)),
            dirty_chunks: RwLock::new(Vec::with_capacity(config.chunk_slots as usize)),
            slots: Mutex::new(SlotAllocator::default()),
            chunk_slots: config.chunk_slots,
            quads_per_chunk: config.quads_per_chunk,
        }
    }

    /// Loads an empty chunk at the given coordinate.
    ///
    /// The chunk's slot and quad offset are assigned here and never change.
    /// Returns true if the chunk was newly created.
    ///
    /// # Errors
    /// [`VoxelError::ChunkSlotsExhausted`] when every slot is taken.
    pub fn add_chunk(&self, coord: ChunkCoord) -> VoxelResult<bool> {
        let mut chunks = self.chunks.write();
        if chunks.contains_key(&coord) {
            return Ok(false);
        }

        let slot = {
            let mut slots = self.slots.lock();
            match slots.free.pop() {
                Some(slot) => slot,
                None if slots.next < self.chunk_slots => {
                    slots.next += 1;
                    slots.next - 1
                }
                None => {
                    return Err(VoxelError::ChunkSlotsExhausted {
                        slots: self.chunk_slots,
                    })
                }
            }
        };

        let quad_offset = slot.saturating_mul(self.quads_per_chunk);
        chunks.insert(coord, Chunk::with_slot(coord, slot, quad_offset));
        self.dirty_chunks.write().push(coord);
        tracing::debug!(x = coord.x, y = coord.y, z = coord.z, slot, "Chunk added");
        Ok(true)
    }

    /// Unloads a chunk and frees its slot, returning it if it existed.
    pub fn unload_chunk(&self, coord: ChunkCoord) -> Option<Chunk> {
        let chunk = self.chunks.write().remove(&coord)?;
        self.slots.lock().free.push(chunk.slot());
        self.dirty_chunks.write().retain(|c| *c != coord);
        Some(chunk)
    }

    /// Executes a closure with read access to a chunk.
    pub fn with_chunk<F, R>(&self, coord: ChunkCoord, f: F) -> Option<R>
    where
        F: FnOnce(&Chunk) -> R,
    {
        self.chunks.read().get(&coord).map(f)
    }

    /// Executes a closure with write access to a chunk and schedules it for
    /// re-meshing if the closure left it dirty.
    pub fn with_chunk_mut<F, R>(&self, coord: ChunkCoord, f: F) -> Option<R>
    where
        F: FnOnce(&mut Chunk) -> R,
    {
        let mut chunks = self.chunks.write();
        let chunk = chunks.get_mut(&coord)?;
        let result = f(chunk);
        if chunk.is_dirty() {
            self.schedule(coord);
        }
        Some(result)
    }

    /// Places a block at world coordinates.
    ///
    /// Marks the containing chunk dirty. Returns false if the chunk is not
    /// loaded.
    ///
    /// # Errors
    /// `PaletteFull` from the chunk palette.
    pub fn set_block(&self, world_x: i32, world_y: i32, world_z: i32, state: &BlockState) -> VoxelResult<bool> {
        let coord = ChunkCoord::from_world_pos(world_x, world_y, world_z);
        let (x, y, z) = ChunkCoord::local(world_x, world_y, world_z);
        self.with_chunk_mut(coord, |chunk| chunk.set_block(x, y, z, state))
            .transpose()
            .map(|placed| placed.is_some())
    }

    /// Removes the block at world coordinates. Returns false if the chunk
    /// is not loaded.
    ///
    /// # Errors
    /// Never in practice; local coordinates are always in bounds.
    pub fn clear_block(&self, world_x: i32, world_y: i32, world_z: i32) -> VoxelResult<bool> {
        let coord = ChunkCoord::from_world_pos(world_x, world_y, world_z);
        let (x, y, z) = ChunkCoord::local(world_x, world_y, world_z);
        self.with_chunk_mut(coord, |chunk| chunk.clear_block(x, y, z))
            .transpose()
            .map(|cleared| cleared.is_some())
    }

    /// Changes one property of the block at world coordinates.
    ///
    /// Returns false if the chunk is not loaded or the position holds air.
    ///
    /// # Errors
    /// `PaletteFull` from the chunk palette.
    pub fn set_property(
        &self,
        world: [i32; 3],
        registry: &BlockStateRegistry,
        property: BlockProperty,
        value: u32,
    ) -> VoxelResult<bool> {
        let [world_x, world_y, world_z] = world;
        let coord = ChunkCoord::from_world_pos(world_x, world_y, world_z);
        let (x, y, z) = ChunkCoord::local(world_x, world_y, world_z);
        let changed = self
            .with_chunk_mut(coord, |chunk| chunk.set_property(x, y, z, registry, property, value))
            .transpose()?;
        Ok(matches!(changed, Some(Some(_))))
    }

    /// Gets the block at world coordinates. `None` for air or unloaded chunks.
    #[must_use]
    pub fn get_block(&self, world_x: i32, world_y: i32, world_z: i32) -> Option<BlockState> {
        let coord = ChunkCoord::from_world_pos(world_x, world_y, world_z);
        let (x, y, z) = ChunkCoord::local(world_x, world_y, world_z);
        self.chunks.read().get(&coord)?.block(x, y, z).cloned()
    }

    /// Returns and clears the list of dirty chunks.
    pub fn take_dirty_chunks(&self) -> Vec<ChunkCoord> {
        std::mem::take(&mut *self.dirty_chunks.write())
    }

    /// Meshes every dirty chunk with `mesher` and publishes the result to
    /// `sink`, one chunk at a time.
    ///
    /// A chunk whose mesh overflows its slot is logged and published as
    /// empty; the other chunks still go through.
    ///
    /// # Errors
    /// Any other error from the sink. The failed chunk draws nothing and is
    /// scheduled again along with the chunks not yet meshed.
    pub fn remesh_dirty<S: QuadSink + ?Sized>(
        &self,
        mesher: &mut ChunkMesher,
        model: &BlockModel,
        sink: &mut S,
    ) -> VoxelResult<RemeshReport> {
        let dirty = self.take_dirty_chunks();
        let mut report = RemeshReport::default();

        for (i, coord) in dirty.iter().enumerate() {
            let mut chunks = self.chunks.write();
            let Some(chunk) = chunks.get_mut(coord) else {
                continue;
            };

            let stats = mesher.compute_chunk(chunk, model);
            let quad_offset = chunk.draw_range().quad_offset;
            match sink.upload(quad_offset, mesher.quads()) {
                Ok(()) => {
                    report.chunks += 1;
                    report.quads += u64::from(stats.quad_count);
                }
                Err(VoxelError::SlotOverflow { quads, capacity, .. }) => {
                    tracing::warn!(
                        x = coord.x,
                        y = coord.y,
                        z = coord.z,
                        quads,
                        capacity,
                        "Chunk mesh dropped, slot too small"
                    );
                    chunk.set_quad_count(0);
                    report.overflowed += 1;
                }
                Err(e) => {
                    // Nothing of this mesh is known to be in the sink.
                    chunk.set_quad_count(0);
                    chunk.mark_dirty();
                    drop(chunks);
                    self.reschedule(&dirty[i..]);
                    return Err(e);
                }
            }
        }

        if report.chunks > 0 || report.overflowed > 0 {
            tracing::debug!(
                chunks = report.chunks,
                quads = report.quads,
                overflowed = report.overflowed,
                "Dirty chunks remeshed"
            );
        }
        Ok(report)
    }

    /// Draw ranges of every loaded chunk.
    #[must_use]
    pub fn draw_ranges(&self) -> Vec<(ChunkCoord, DrawRange)> {
        self.chunks
            .read()
            .values()
            .map(|c| (c.coord(), c.draw_range()))
            .collect()
    }

    /// Returns the number of loaded chunks.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.read().len()
    }

    fn schedule(&self, coord: ChunkCoord) {
        let mut dirty = self.dirty_chunks.write();
        if !dirty.contains(&coord) {
            dirty.push(coord);
        }
    }

    fn reschedule(&self, coords: &[ChunkCoord]) {
        let mut dirty = self.dirty_chunks.write();
        for coord in coords {
            if !dirty.contains(coord) {
                dirty.push(*coord);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instancing::InstanceBuffer;

    fn config(slots: u32) -> EngineConfig {
        EngineConfig {
            chunk_slots: slots,
            quads_per_chunk: 64,
            ..EngineConfig::default()
        }
    }

    #[test]
    fn test_slot_assignment() {
        let world = VoxelWorld::new(&config(2));
        assert!(world.add_chunk(ChunkCoord::new(0, 0, 0)).unwrap());
        assert!(!world.add_chunk(ChunkCoord::new(0, 0, 0)).unwrap());
        assert!(world.add_chunk(ChunkCoord::new(1, 0, 0)).unwrap());
        assert!(matches!(
            world.add_chunk(ChunkCoord::new(2, 0, 0)),
            Err(VoxelError::ChunkSlotsExhausted { slots: 2 })
        ));

        let offset = world
            .with_chunk(ChunkCoord::new(1, 0, 0), |c| c.draw_range().quad_offset)
            .unwrap();
        assert_eq!(offset, 64);

        world.unload_chunk(ChunkCoord::new(0, 0, 0)).unwrap();
        assert!(world.add_chunk(ChunkCoord::new(2, 0, 0)).unwrap());
        let slot = world.with_chunk(ChunkCoord::new(2, 0, 0), Chunk::slot).unwrap();
        assert_eq!(slot, 0);
    }

    #[test]
    fn test_set_block_schedules_once() {
        let world = VoxelWorld::new(&config(4));
        world.add_chunk(ChunkCoord::new(-1, 0, 0)).unwrap();
        assert_eq!(world.take_dirty_chunks().len(), 1);

        let stone = BlockState::new("stone");
        assert!(world.set_block(-1, 3, 4, &stone).unwrap());
        assert!(world.set_block(-2, 3, 4, &stone).unwrap());
        assert!(!world.set_block(100, 0, 0, &stone).unwrap());

        assert_eq!(world.take_dirty_chunks(), vec![ChunkCoord::new(-1, 0, 0)]);
        assert_eq!(world.get_block(-1, 3, 4), Some(stone));
        assert_eq!(world.get_block(-3, 3, 4), None);
    }

    #[test]
    fn test_remesh_publishes_to_sink() {
        let cfg = config(2);
        let world = VoxelWorld::new(&cfg);
        let mut mesher = ChunkMesher::new(&cfg);
        let mut buffer = InstanceBuffer::new(&cfg);
        let model = BlockModel::new();

        world.add_chunk(ChunkCoord::new(0, 0, 0)).unwrap();
        world.add_chunk(ChunkCoord::new(1, 0, 0)).unwrap();
        let stone = BlockState::new("stone").with(BlockProperty::FullBlock, 1);
        world.set_block(16 + 8, 8, 8, &stone).unwrap();

        let report = world.remesh_dirty(&mut mesher, &model, &mut buffer).unwrap();
        assert_eq!(report.chunks, 2);
        assert_eq!(report.quads, 6);
        assert!(world.take_dirty_chunks().is_empty());

        let range = world
            .with_chunk(ChunkCoord::new(1, 0, 0), Chunk::draw_range)
            .unwrap();
        assert_eq!(range, DrawRange { quad_offset: 64, quad_count: 6 });
        assert_eq!(buffer.chunk_quads(range).len(), 6);
        assert!(buffer
            .chunk_quads(range)
            .iter()
            .all(|q| q.fields().x == 8));
    }

    #[test]
    fn test_remesh_overflow_draws_nothing() {
        let cfg = EngineConfig {
            chunk_slots: 1,
            quads_per_chunk: 5,
            ..EngineConfig::default()
        };
        let world = VoxelWorld::new(&cfg);
        let mut mesher = ChunkMesher::new(&cfg);
        let mut buffer = InstanceBuffer::new(&cfg);

        world.add_chunk(ChunkCoord::default()).unwrap();
        world
            .set_block(8, 8, 8, &BlockState::new("stone").with(BlockProperty::FullBlock, 1))
            .unwrap();

        let report = world.remesh_dirty(&mut mesher, &BlockModel::new(), &mut buffer).unwrap();
        assert_eq!(report.overflowed, 1);
        assert_eq!(
            world.with_chunk(ChunkCoord::default(), |c| c.draw_range().quad_count),
            Some(0)
        );
    }

    #[test]
    fn test_reschedule_skips_queued_chunks() {
        let world = VoxelWorld::new(&config(4));
        let a = ChunkCoord::new(0, 0, 0);
        let b = ChunkCoord::new(1, 0, 0);
        let c = ChunkCoord::new(2, 0, 0);

        world.schedule(b);
        world.reschedule(&[a, b, c, a]);
        assert_eq!(world.take_dirty_chunks(), vec![b, a, c]);
    }

    #[test]
    fn test_set_property_at_world_position() {
        let world = VoxelWorld::new(&config(1));
        let registry = BlockStateRegistry::new();
        world.add_chunk(ChunkCoord::default()).unwrap();
        world.set_block(1, 1, 1, &BlockState::new("lamp")).unwrap();

        assert!(world.set_property([1, 1, 1], &registry, BlockProperty::Active, 1).unwrap());
        assert!(!world.set_property([2, 1, 1], &registry, BlockProperty::Active, 1).unwrap());
        assert_eq!(
            world.get_block(1, 1, 1).map(|b| b.get(BlockProperty::Active)),
            Some(1)
        );
    }
}
