//! CPU-side instance buffer management.
//!
//! Pre-allocates every chunk slot up front to avoid runtime allocations.

use std::ops::Range;

use crate::config::EngineConfig;
use crate::error::{VoxelError, VoxelResult};
use crate::voxel::chunk::DrawRange;
use crate::voxel::quad::QuadRecord;

/// Receiver of finished chunk meshes.
///
/// This is the seam to the rendering backend: implementations copy the
/// quads into whatever memory the GPU reads.
pub trait QuadSink {
    /// Publishes the quads of one chunk into the slot starting at
    /// `quad_offset`.
    ///
    /// # Errors
    /// Implementations reject offsets that do not start a slot and meshes
    /// larger than a slot.
    fn upload(&mut self, quad_offset: u32, quads: &[QuadRecord]) -> VoxelResult<()>;
}

/// Shared quad buffer split into equal chunk slots.
pub struct InstanceBuffer {
    /// All slots back to back.
    records: Vec<QuadRecord>,

    /// Quads per slot.
    quads_per_chunk: u32,

    /// Number of slots.
    chunk_slots: u32,

    /// Quads written since the last [`Self::take_dirty_range`].
    dirty: Option<Range<usize>>,
}

impl InstanceBuffer {
    /// Creates a zeroed buffer sized from the config.
    ///
    /// # Note
    /// This allocates significant memory. Call once during initialization.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            records: vec![QuadRecord::default(); config.total_quads()],
            quads_per_chunk: config.quads_per_chunk,
            chunk_slots: config.chunk_slots,
            dirty: None,
        }
    }

    /// Copies one chunk's quads into its slot.
    ///
    /// # Errors
    /// [`VoxelError::InvalidSlot`] if `quad_offset` does not start a slot,
    /// [`VoxelError::SlotOverflow`] if the quads do not fit; nothing is
    /// written in either case.
    pub fn write_chunk(&mut self, quad_offset: u32, quads: &[QuadRecord]) -> VoxelResult<()> {
        if self.quads_per_chunk == 0
            || quad_offset % self.quads_per_chunk != 0
            || quad_offset / self.quads_per_chunk >= self.chunk_slots
        {
            return Err(VoxelError::InvalidSlot { quad_offset });
        }
        if quads.len() > self.quads_per_chunk as usize {
            tracing::warn!(
                quad_offset,
                quads = quads.len(),
                capacity = self.quads_per_chunk,
                "Chunk mesh overflows its slot"
            );
            return Err(VoxelError::SlotOverflow {
                quad_offset,
                quads: quads.len(),
                capacity: self.quads_per_chunk,
            });
        }

        let start = quad_offset as usize;
        let end = start + quads.len();
        self.records[start..end].copy_from_slice(quads);

        self.dirty = Some(match self.dirty.take() {
            Some(range) => range.start.min(start)..range.end.max(end),
            None => start..end,
        });
        tracing::trace!(quad_offset, quads = quads.len(), "Chunk quads written");
        Ok(())
    }

    /// Quads a draw range refers to; empty if the range is out of bounds.
    #[must_use]
    pub fn chunk_quads(&self, range: DrawRange) -> &[QuadRecord] {
        let start = range.quad_offset as usize;
        self.records
            .get(start..start + range.quad_count as usize)
            .unwrap_or(&[])
    }

    /// Returns the quad range written since the last call, for partial
    /// uploads.
    pub fn take_dirty_range(&mut self) -> Option<Range<usize>> {
        self.dirty.take()
    }

    /// Quads per slot.
    #[must_use]
    pub const fn slot_capacity(&self) -> u32 {
        self.quads_per_chunk
    }

    /// Number of slots.
    #[must_use]
    pub const fn chunk_slots(&self) -> u32 {
        self.chunk_slots
    }

    /// Whole buffer.
    #[must_use]
    pub fn records(&self) -> &[QuadRecord] {
        &self.records
    }

    /// Returns the buffer as bytes for GPU upload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.records)
    }
}

impl QuadSink for InstanceBuffer {
    fn upload(&mut self, quad_offset: u32, quads: &[QuadRecord]) -> VoxelResult<()> {
        self.write_chunk(quad_offset, quads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> InstanceBuffer {
        InstanceBuffer::new(&EngineConfig {
            chunk_slots: 2,
            quads_per_chunk: 4,
            ..EngineConfig::default()
        })
    }

    fn quad(word: u32) -> QuadRecord {
        QuadRecord { words: [word, 0, 0] }
    }

    #[test]
    fn test_write_and_read_slot() {
        let mut buffer = small();
        assert_eq!(buffer.as_bytes().len(), 2 * 4 * 12);

        buffer.write_chunk(4, &[quad(1), quad(2)]).unwrap();
        let range = DrawRange {
            quad_offset: 4,
            quad_count: 2,
        };
        assert_eq!(buffer.chunk_quads(range), &[quad(1), quad(2)]);
        assert_eq!(buffer.take_dirty_range(), Some(4..6));
        assert_eq!(buffer.take_dirty_range(), None);
    }

    #[test]
    fn test_overflow_leaves_neighbour_untouched() {
        let mut buffer = small();
        buffer.write_chunk(4, &[quad(7)]).unwrap();

        let err = buffer.write_chunk(0, &[quad(1); 5]).unwrap_err();
        assert!(matches!(err, VoxelError::SlotOverflow { quads: 5, capacity: 4, .. }));
        assert_eq!(buffer.records()[4], quad(7));
        assert_eq!(buffer.records()[0], QuadRecord::default());
    }

    #[test]
    fn test_rejects_bad_offsets() {
        let mut buffer = small();
        assert!(matches!(
            buffer.write_chunk(2, &[]),
            Err(VoxelError::InvalidSlot { quad_offset: 2 })
        ));
        assert!(buffer.upload(8, &[]).is_err());
        assert!(buffer.upload(0, &[]).is_ok());
    }
}
