//! # Block States
//!
//! A block state is a block name plus a 32-bit property word. Properties
//! form a closed catalog packed low bits first:
//!
//! | property    | bits |
//! |-------------|------|
//! | full_block  | 1    |
//! | facing      | 2    |
//! | placing     | 3    |
//! | double_slab | 1    |
//! | waterlogged | 1    |
//! | active      | 1    |
//! | mode        | 1    |
//! | value       | 4    |
//! | note_pitch  | 5    |
//!
//! States are values. Changing a property produces a new state, which the
//! chunk then interns in its palette.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use webcraft_core::{BitFieldLayout, BitOrder, FieldSpec};

use super::face::Face;
use super::registry::{GeometryId, MaterialId};
use crate::error::{VoxelError, VoxelResult};

/// Field table of the state word.
pub const STATE_FIELDS: [FieldSpec; 9] = [
    FieldSpec::new("full_block", 1),
    FieldSpec::new("facing", 2),
    FieldSpec::new("placing", 3),
    FieldSpec::new("double_slab", 1),
    FieldSpec::new("waterlogged", 1),
    FieldSpec::new("active", 1),
    FieldSpec::new("mode", 1),
    FieldSpec::new("value", 4),
    FieldSpec::new("note_pitch", 5),
];

/// Compiled state word layout.
pub const STATE_LAYOUT: BitFieldLayout<9> =
    match BitFieldLayout::compile(STATE_FIELDS, 32, BitOrder::LsbFirst) {
        Ok(layout) => layout,
        Err(_) => panic!("block state fields do not fit one 32-bit word"),
    };

/// Default `placing` value for a block placed on top of another.
///
/// `placing` uses the face numbering of [`Face::index`], so this decodes to
/// [`Face::Bottom`], the face the block rests on.
pub const DEFAULT_PLACING: u32 = 4;

/// A property of the closed catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum BlockProperty {
    /// Block occupies its whole cell and takes part in face culling.
    FullBlock = 0,
    /// Horizontal orientation.
    Facing = 1,
    /// Face the block was placed against.
    Placing = 2,
    /// Slab occupies both halves.
    DoubleSlab = 3,
    /// Block contains water.
    Waterlogged = 4,
    /// Powered / lit / open.
    Active = 5,
    /// Two-state mode switch.
    Mode = 6,
    /// Generic 4-bit level.
    Value = 7,
    /// Note block pitch.
    NotePitch = 8,
}

impl BlockProperty {
    /// Every property in field order.
    pub const ALL: [Self; 9] = [
        Self::FullBlock,
        Self::Facing,
        Self::Placing,
        Self::DoubleSlab,
        Self::Waterlogged,
        Self::Active,
        Self::Mode,
        Self::Value,
        Self::NotePitch,
    ];

    /// Field index inside [`STATE_LAYOUT`].
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Width in bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        STATE_LAYOUT.slot(self.index()).bits()
    }

    /// Largest storable value.
    #[must_use]
    pub const fn max_value(self) -> u32 {
        STATE_LAYOUT.slot(self.index()).mask
    }

    /// Lowercase name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        STATE_FIELDS[self.index()].name
    }

    /// Property from its numeric id.
    ///
    /// # Errors
    /// [`VoxelError::UnknownProperty`] if `id` is not in the catalog.
    pub fn from_index(id: u8) -> VoxelResult<Self> {
        Self::ALL
            .get(usize::from(id))
            .copied()
            .ok_or_else(|| VoxelError::UnknownProperty(id.to_string()))
    }
}

impl fmt::Display for BlockProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BlockProperty {
    type Err = VoxelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        STATE_LAYOUT
            .field_index(s)
            .map(|i| Self::ALL[i])
            .ok_or_else(|| VoxelError::UnknownProperty(s.to_string()))
    }
}

/// An immutable block state.
///
/// Two states are the same palette entry iff name and state word match.
/// Geometry and material are carried along for the mesher.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockState {
    name: Arc<str>,
    bits: u32,
    geometry: GeometryId,
    material: MaterialId,
}

impl BlockState {
    /// Default state word: `placing = up`, everything else zero.
    pub const DEFAULT_BITS: u32 = DEFAULT_PLACING << STATE_LAYOUT.slot(BlockProperty::Placing.index()).offset;

    /// New state with the default word and id 0 geometry/material.
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            bits: Self::DEFAULT_BITS,
            geometry: GeometryId::default(),
            material: MaterialId::default(),
        }
    }

    /// Convenience for a full cube of the given material.
    pub fn full_cube(name: impl Into<Arc<str>>, material: MaterialId) -> Self {
        Self::new(name)
            .with(BlockProperty::FullBlock, 1)
            .with_material(material)
    }

    /// Block name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shared name handle.
    #[must_use]
    pub fn name_arc(&self) -> &Arc<str> {
        &self.name
    }

    /// Raw state word.
    #[inline]
    #[must_use]
    pub const fn bits(&self) -> u32 {
        self.bits
    }

    /// Replaces the raw state word.
    #[must_use]
    pub fn with_bits(mut self, bits: u32) -> Self {
        self.bits = bits;
        self
    }

    /// Reads a property.
    #[inline]
    #[must_use]
    pub const fn get(&self, property: BlockProperty) -> u32 {
        STATE_LAYOUT.get_word(self.bits, property.index())
    }

    /// Returns a copy with `property` set. Values wider than the field are
    /// truncated to its low bits.
    #[must_use]
    pub fn with(mut self, property: BlockProperty, value: u32) -> Self {
        self.bits = STATE_LAYOUT.set_word(self.bits, property.index(), value);
        self
    }

    /// True if the block takes part in face culling.
    #[inline]
    #[must_use]
    pub const fn is_full_block(&self) -> bool {
        self.get(BlockProperty::FullBlock) != 0
    }

    /// Face the block was placed against, if the stored value names one.
    #[must_use]
    pub const fn placing_face(&self) -> Option<Face> {
        Face::from_index(self.get(BlockProperty::Placing) as u8)
    }

    /// Geometry id.
    #[inline]
    #[must_use]
    pub const fn geometry(&self) -> GeometryId {
        self.geometry
    }

    /// Returns a copy with another geometry.
    #[must_use]
    pub fn with_geometry(mut self, geometry: GeometryId) -> Self {
        self.geometry = geometry;
        self
    }

    /// Material id.
    #[inline]
    #[must_use]
    pub const fn material(&self) -> MaterialId {
        self.material
    }

    /// Returns a copy with another material.
    #[must_use]
    pub fn with_material(mut self, material: MaterialId) -> Self {
        self.material = material;
        self
    }
}

/// Callback fired after a property change.
pub type PropertyListener = Box<dyn Fn(&BlockState, u32) + Send + Sync>;

/// Owns the property change listeners.
///
/// Built once through [`BlockStateRegistry::builder`] and immutable after.
pub struct BlockStateRegistry {
    listeners: [Vec<PropertyListener>; 9],
}

impl BlockStateRegistry {
    /// Registry without listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            listeners: std::array::from_fn(|_| Vec::new()),
        }
    }

    /// Starts a builder.
    #[must_use]
    pub fn builder() -> BlockStateRegistryBuilder {
        BlockStateRegistryBuilder {
            registry: Self::new(),
        }
    }

    /// The state word layout.
    #[must_use]
    pub const fn layout(&self) -> &'static BitFieldLayout<9> {
        &STATE_LAYOUT
    }

    /// Reads a property.
    #[must_use]
    pub fn get(&self, state: &BlockState, property: BlockProperty) -> u32 {
        state.get(property)
    }

    /// Produces the changed state and notifies every listener of `property`
    /// in registration order with the stored value.
    #[must_use]
    pub fn set(&self, state: &BlockState, property: BlockProperty, value: u32) -> BlockState {
        let next = state.clone().with(property, value);
        let stored = next.get(property);
        for listener in &self.listeners[property.index()] {
            listener(&next, stored);
        }
        next
    }

    /// [`Self::set`] with the property given by name.
    ///
    /// # Errors
    /// [`VoxelError::UnknownProperty`] if `name` is not in the catalog.
    pub fn set_named(&self, state: &BlockState, name: &str, value: u32) -> VoxelResult<BlockState> {
        let property: BlockProperty = name.parse()?;
        Ok(self.set(state, property, value))
    }

    /// Number of listeners attached to `property`.
    #[must_use]
    pub fn listener_count(&self, property: BlockProperty) -> usize {
        self.listeners[property.index()].len()
    }
}

impl Default for BlockStateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BlockStateRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: Vec<usize> = self.listeners.iter().map(Vec::len).collect();
        f.debug_struct("BlockStateRegistry")
            .field("listeners", &counts)
            .finish()
    }
}

/// Builder for [`BlockStateRegistry`].
pub struct BlockStateRegistryBuilder {
    registry: BlockStateRegistry,
}

impl BlockStateRegistryBuilder {
    /// Attaches a listener to `property`.
    #[must_use]
    pub fn on_change<F>(mut self, property: BlockProperty, listener: F) -> Self
    where
        F: Fn(&BlockState, u32) + Send + Sync + 'static,
    {
        self.registry.listeners[property.index()].push(Box::new(listener));
        self
    }

    /// Finishes the registry.
    #[must_use]
    pub fn build(self) -> BlockStateRegistry {
        self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_layout_is_lsb_packed() {
        let offsets: Vec<u32> = (0..9).map(|i| STATE_LAYOUT.slot(i).offset).collect();
        assert_eq!(offsets, vec![0, 1, 3, 6, 7, 8, 9, 10, 14]);
        assert_eq!(STATE_LAYOUT.bucket_count(), 1);
    }

    #[test]
    fn test_default_places_up() {
        let state = BlockState::new("stone");
        assert_eq!(state.bits(), 32);
        assert_eq!(state.get(BlockProperty::Placing), 4);
        assert_eq!(state.placing_face(), Some(Face::Bottom));
        assert_eq!(
            state.clone().with(BlockProperty::Placing, 1).placing_face(),
            Some(Face::Top)
        );
        assert_eq!(
            state.clone().with(BlockProperty::Placing, 3).placing_face(),
            Some(Face::Back)
        );
        assert_eq!(state.clone().with(BlockProperty::Placing, 7).placing_face(), None);
        assert!(!state.is_full_block());
    }

    #[test]
    fn test_set_truncates() {
        let state = BlockState::new("lever").with(BlockProperty::Facing, 0b111);
        assert_eq!(state.get(BlockProperty::Facing), 0b11);
        assert_eq!(state.get(BlockProperty::Placing), 4);
        assert_eq!(BlockProperty::NotePitch.max_value(), 31);
    }

    #[test]
    fn test_property_lookup() {
        assert_eq!("waterlogged".parse::<BlockProperty>().unwrap(), BlockProperty::Waterlogged);
        assert_eq!(BlockProperty::from_index(8).unwrap(), BlockProperty::NotePitch);
        assert!(matches!(
            "color".parse::<BlockProperty>(),
            Err(VoxelError::UnknownProperty(_))
        ));
        assert!(BlockProperty::from_index(9).is_err());
    }

    #[test]
    fn test_listeners_fire_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (a, b) = (Arc::clone(&log), Arc::clone(&log));
        let registry = BlockStateRegistry::builder()
            .on_change(BlockProperty::Active, move |_, v| a.lock().push(("first", v)))
            .on_change(BlockProperty::Active, move |_, v| b.lock().push(("second", v)))
            .build();

        let lamp = BlockState::new("lamp");
        let lit = registry.set(&lamp, BlockProperty::Active, 1);
        let _ = registry.set(&lit, BlockProperty::Value, 3);

        assert_eq!(lit.get(BlockProperty::Active), 1);
        assert_eq!(lamp.get(BlockProperty::Active), 0);
        assert_eq!(*log.lock(), vec![("first", 1), ("second", 1)]);
        assert_eq!(registry.listener_count(BlockProperty::Value), 0);
    }

    #[test]
    fn test_set_named() {
        let registry = BlockStateRegistry::new();
        let state = registry.set_named(&BlockState::new("note"), "note_pitch", 12).unwrap();
        assert_eq!(state.get(BlockProperty::NotePitch), 12);
        assert!(registry.set_named(&state, "pitch", 1).is_err());
    }
}
