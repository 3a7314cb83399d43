//! Per-chunk block palette.
//!
//! Voxels store a 16-bit palette index instead of a full block state.
//! Index 0 is air and never names an entry.
//!
//! Memory:
//! - Voxel grid: 4096 × 2 bytes = 8KB per chunk
//! - Palette: one entry per distinct (name, state word) actually placed

use std::collections::HashMap;
use std::sync::Arc;

use super::block_state::BlockState;
use crate::error::{VoxelError, VoxelResult};

/// Palette index of air.
pub const AIR_INDEX: u16 = 0;

/// Largest number of entries, air slot included.
pub const PALETTE_CAPACITY: usize = u16::MAX as usize + 1;

/// Append-only mapping between block states and 16-bit indices.
#[derive(Debug, Clone)]
pub struct BlockPalette {
    /// name -> state word -> index
    lookup: HashMap<Arc<str>, HashMap<u32, u16>>,
    /// index -> state; slot 0 is air
    entries: Vec<Option<BlockState>>,
}

impl BlockPalette {
    /// Empty palette holding only the air slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            lookup: HashMap::new(),
            entries: vec![None],
        }
    }

    /// Interns `state` and returns its index.
    ///
    /// Adding a state equal in name and state word to an existing entry
    /// returns that entry's index. Returned indices are never 0.
    ///
    /// # Errors
    /// [`VoxelError::PaletteFull`] once 65 535 states are interned.
    pub fn add(&mut self, state: &BlockState) -> VoxelResult<u16> {
        if let Some(&id) = self
            .lookup
            .get(state.name())
            .and_then(|by_bits| by_bits.get(&state.bits()))
        {
            return Ok(id);
        }

        let id = u16::try_from(self.entries.len()).map_err(|_| VoxelError::PaletteFull {
            capacity: PALETTE_CAPACITY,
        })?;
        self.entries.push(Some(state.clone()));
        self.lookup
            .entry(Arc::clone(state.name_arc()))
            .or_default()
            .insert(state.bits(), id);
        Ok(id)
    }

    /// State stored at `id`. `None` for air and unknown indices.
    #[inline]
    #[must_use]
    pub fn get_type(&self, id: u16) -> Option<&BlockState> {
        self.entries.get(usize::from(id)).and_then(Option::as_ref)
    }

    /// Index of `state` if it was interned.
    #[must_use]
    pub fn get_id(&self, state: &BlockState) -> Option<u16> {
        self.lookup
            .get(state.name())
            .and_then(|by_bits| by_bits.get(&state.bits()))
            .copied()
    }

    /// Number of slots, the air slot included.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing but air was ever interned.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.len() == 1
    }

    /// Interned states with their indices, in index order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &BlockState)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| Some((u16::try_from(i).ok()?, e.as_ref()?)))
    }
}

impl Default for BlockPalette {
    fn default() -> Self {
        Self::new()
    }
}
