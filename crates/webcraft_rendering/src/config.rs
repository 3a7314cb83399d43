//! # Engine Configuration
//!
//! Loaded once at startup from TOML. Every field has a default, so an empty
//! document is a valid configuration.
//!
//! ```toml
//! chunk_slots = 64
//! quads_per_chunk = 16384
//! cull_chunk_border = true
//! missing_texture_id = 0
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{VoxelError, VoxelResult};
use crate::voxel::quad::MAX_TEXTURE_ID;

/// Meshing and instance-buffer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Number of chunk slots in the shared instance buffer.
    pub chunk_slots: u32,
    /// Quad records reserved per chunk slot.
    pub quads_per_chunk: u32,
    /// Treat faces on the chunk border as hidden by the neighbouring chunk.
    pub cull_chunk_border: bool,
    /// Texture id written for faces whose material or atlas tile is missing.
    pub missing_texture_id: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_slots: 64,
            quads_per_chunk: 16_384,
            cull_chunk_border: true,
            missing_texture_id: 0,
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    /// Returns [`VoxelError::InvalidConfig`] on malformed TOML, unknown keys,
    /// or values that fail [`EngineConfig::validate`].
    pub fn from_toml_str(source: &str) -> VoxelResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| VoxelError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    /// Returns [`VoxelError::InvalidConfig`] describing the first bad value.
    pub fn validate(&self) -> VoxelResult<()> {
        if self.chunk_slots == 0 {
            return Err(VoxelError::InvalidConfig("chunk_slots must be > 0".into()));
        }
        if self.quads_per_chunk == 0 {
            return Err(VoxelError::InvalidConfig("quads_per_chunk must be > 0".into()));
        }
        if u64::from(self.chunk_slots) * u64::from(self.quads_per_chunk) > u64::from(u32::MAX) {
            return Err(VoxelError::InvalidConfig(
                "chunk_slots * quads_per_chunk overflows a 32-bit quad offset".into(),
            ));
        }
        if self.missing_texture_id > MAX_TEXTURE_ID {
            return Err(VoxelError::InvalidConfig(format!(
                "missing_texture_id {} does not fit the 12-bit texture field",
                self.missing_texture_id
            )));
        }
        Ok(())
    }

    /// Total quad capacity of the instance buffer.
    #[must_use]
    pub const fn total_quads(&self) -> usize {
        self.chunk_slots as usize * self.quads_per_chunk as usize
    }
}
