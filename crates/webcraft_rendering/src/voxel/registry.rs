//! Block model registries - materials, geometries and the texture atlas.
//!
//! The mesher only reads these. They are filled once at startup, either in
//! code or from a decoded TOML document ([`BlockModel::from_toml_str`]).
//!
//! Lookup chain for one quad:
//! - block state -> material -> atlas tile for the face -> texture id
//! - block state -> geometry -> sub-cube -> transform id

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::face::Face;
use crate::error::{VoxelError, VoxelResult};

/// Material id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialId(pub u16);

/// Geometry id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeometryId(pub u16);

/// Texture atlas tile id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TileId(pub u16);

/// Sub-cube ids are packed into 10 bits of the quad.
pub const MAX_SUB_CUBES: usize = 1 << 10;

// =============================================================================
// MATERIALS
// =============================================================================

/// Per-face appearance of a block.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MaterialDef {
    /// Atlas tile per face, indexed by [`Face::index`].
    pub tiles: [TileId; 6],
    /// Ambient occlusion curve exponent.
    pub ao_exponent: f32,
    /// Bit `f` set: face `f` ignores texture rotation.
    pub isotropic_mask: u8,
}

impl Default for MaterialDef {
    fn default() -> Self {
        Self::uniform(TileId::default())
    }
}

impl MaterialDef {
    /// Same tile on every face.
    #[must_use]
    pub const fn uniform(tile: TileId) -> Self {
        Self {
            tiles: [tile; 6],
            ao_exponent: 1.0,
            isotropic_mask: 0,
        }
    }

    /// Returns a copy with `tile` on one face.
    #[must_use]
    pub fn with_face(mut self, face: Face, tile: TileId) -> Self {
        self.tiles[face.index()] = tile;
        self
    }

    /// Returns a copy with `tile` on the four side faces.
    #[must_use]
    pub fn with_sides(mut self, tile: TileId) -> Self {
        for face in [Face::Right, Face::Front, Face::Back, Face::Left] {
            self.tiles[face.index()] = tile;
        }
        self
    }

    /// Atlas tile on `face`.
    #[inline]
    #[must_use]
    pub const fn tile(&self, face: Face) -> TileId {
        self.tiles[face.index()]
    }

    /// Exponent quantized to 8 bits (`round(v * 63.75)`).
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn ao_exponent_packed(&self) -> u32 {
        // clamped, so the cast is exact
        (self.ao_exponent * 63.75).round().clamp(0.0, 255.0) as u32
    }

    /// True if `face` ignores texture rotation.
    #[inline]
    #[must_use]
    pub const fn is_isotropic(&self, face: Face) -> bool {
        self.isotropic_mask & face.bit() != 0
    }
}

/// Materials by id and name.
#[derive(Debug, Clone, Default)]
pub struct MaterialRegistry {
    materials: Vec<MaterialDef>,
    names: HashMap<String, MaterialId>,
}

impl MaterialRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a material; re-registering a name replaces its definition.
    ///
    /// # Errors
    /// [`VoxelError::InvalidDefinition`] if 16-bit ids are exhausted.
    pub fn register(&mut self, name: &str, material: MaterialDef) -> VoxelResult<MaterialId> {
        if let Some(&id) = self.names.get(name) {
            self.materials[usize::from(id.0)] = material;
            return Ok(id);
        }
        let id = MaterialId(u16::try_from(self.materials.len()).map_err(|_| {
            VoxelError::InvalidDefinition(format!("too many materials registering {name}"))
        })?);
        self.materials.push(material);
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Material by id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: MaterialId) -> Option<&MaterialDef> {
        self.materials.get(usize::from(id.0))
    }

    /// Id by name.
    #[must_use]
    pub fn id(&self, name: &str) -> Option<MaterialId> {
        self.names.get(name).copied()
    }

    /// Number of materials.
    #[must_use]
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// True if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

// =============================================================================
// GEOMETRY
// =============================================================================

/// Placement of a sub-cube inside its cell, in 1/16 block units.
///
/// Consumed by the shader through the transform id; the mesher never reads it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CubeTransform {
    /// Minimum corner.
    pub origin: [f32; 3],
    /// Extent.
    pub scale: [f32; 3],
    /// Euler rotation in degrees.
    pub rotation: [f32; 3],
    /// Rotation pivot.
    pub pivot: [f32; 3],
    /// Bit `f` set: face `f` keeps world-aligned UVs.
    pub uv_lock: u8,
    /// Rotate with the block's placing face.
    pub use_placing_rotation: bool,
}

impl Default for CubeTransform {
    fn default() -> Self {
        Self {
            origin: [0.0; 3],
            scale: [16.0; 3],
            rotation: [0.0; 3],
            pivot: [8.0; 3],
            uv_lock: 0,
            use_placing_rotation: true,
        }
    }
}

/// One box of a block geometry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubCube {
    /// Global sub-cube id, assigned by [`GeometryRegistry::register`].
    #[serde(default)]
    pub id: u16,
    /// Bit `f` set: face `f` of this cube is never drawn.
    #[serde(default)]
    pub occlusion_mask: u8,
    /// Placement.
    #[serde(default)]
    pub transform: CubeTransform,
}

impl SubCube {
    /// Full-size cube with the given occlusion mask.
    #[must_use]
    pub fn masked(occlusion_mask: u8) -> Self {
        Self {
            occlusion_mask,
            ..Self::default()
        }
    }

    /// True if `face` of this cube is drawn.
    #[inline]
    #[must_use]
    pub const fn shows(&self, face: Face) -> bool {
        self.occlusion_mask & face.bit() == 0
    }
}

/// Ordered list of sub-cubes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeometryDef {
    /// Sub-cubes in draw order.
    pub cubes: Vec<SubCube>,
}

/// Geometries by id and name.
#[derive(Debug, Clone, Default)]
pub struct GeometryRegistry {
    geometries: Vec<GeometryDef>,
    names: HashMap<String, GeometryId>,
    next_cube: usize,
}

impl GeometryRegistry {
    /// Empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a geometry and assigns global ids to its sub-cubes.
    ///
    /// # Errors
    /// [`VoxelError::InvalidDefinition`] if the name is taken, or sub-cube
    /// ids run out of their 10-bit range.
    pub fn register(&mut self, name: &str, mut geometry: GeometryDef) -> VoxelResult<GeometryId> {
        if self.names.contains_key(name) {
            return Err(VoxelError::InvalidDefinition(format!(
                "geometry {name} registered twice"
            )));
        }
        if self.next_cube + geometry.cubes.len() > MAX_SUB_CUBES {
            return Err(VoxelError::InvalidDefinition(format!(
                "geometry {name} exceeds {MAX_SUB_CUBES} sub-cubes"
            )));
        }
        let id = GeometryId(u16::try_from(self.geometries.len()).map_err(|_| {
            VoxelError::InvalidDefinition(format!("too many geometries registering {name}"))
        })?);
        for cube in &mut geometry.cubes {
            // bounded by MAX_SUB_CUBES above
            cube.id = self.next_cube as u16;
            self.next_cube += 1;
        }
        self.geometries.push(geometry);
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Geometry by id.
    #[inline]
    #[must_use]
    pub fn get(&self, id: GeometryId) -> Option<&GeometryDef> {
        self.geometries.get(usize::from(id.0))
    }

    /// Sub-cubes of a geometry in order; empty if unknown.
    pub fn cubes(&self, id: GeometryId) -> impl Iterator<Item = &SubCube> + '_ {
        self.get(id).into_iter().flat_map(|g| g.cubes.iter())
    }

    /// Id by name.
    #[must_use]
    pub fn id(&self, name: &str) -> Option<GeometryId> {
        self.names.get(name).copied()
    }

    /// Number of sub-cubes handed out.
    #[must_use]
    pub const fn sub_cube_count(&self) -> usize {
        self.next_cube
    }
}

// =============================================================================
// TEXTURE ATLAS
// =============================================================================

/// Atlas tiles, each with one or more texture variants.
#[derive(Debug, Clone, Default)]
pub struct TextureAtlas {
    tiles: Vec<Vec<u16>>,
    names: HashMap<String, TileId>,
}

impl TextureAtlas {
    /// Empty atlas.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tile with its texture variants.
    ///
    /// # Errors
    /// [`VoxelError::InvalidDefinition`] if the tile has no variants, a
    /// texture id does not fit 12 bits, or the name is taken.
    pub fn register(&mut self, name: &str, textures: Vec<u16>) -> VoxelResult<TileId> {
        if textures.is_empty() {
            return Err(VoxelError::InvalidDefinition(format!("tile {name} has no textures")));
        }
        if let Some(&bad) = textures.iter().find(|&&t| u32::from(t) > super::quad::MAX_TEXTURE_ID) {
            return Err(VoxelError::InvalidDefinition(format!(
                "tile {name}: texture {bad} exceeds the 12-bit texture range"
            )));
        }
        if self.names.contains_key(name) {
            return Err(VoxelError::InvalidDefinition(format!("tile {name} registered twice")));
        }
        let id = TileId(u16::try_from(self.tiles.len()).map_err(|_| {
            VoxelError::InvalidDefinition(format!("too many tiles registering {name}"))
        })?);
        self.tiles.push(textures);
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    /// Texture id of `variant` of `tile`.
    #[inline]
    #[must_use]
    pub fn texture(&self, tile: TileId, variant: usize) -> Option<u16> {
        self.tiles.get(usize::from(tile.0))?.get(variant).copied()
    }

    /// Number of variants of `tile`.
    #[must_use]
    pub fn variant_count(&self, tile: TileId) -> usize {
        self.tiles.get(usize::from(tile.0)).map_or(0, Vec::len)
    }

    /// Id by name.
    #[must_use]
    pub fn id(&self, name: &str) -> Option<TileId> {
        self.names.get(name).copied()
    }
}

// =============================================================================
// BLOCK MODEL
// =============================================================================

/// Everything the mesher looks up while emitting quads.
#[derive(Debug, Clone, Default)]
pub struct BlockModel {
    /// Materials.
    pub materials: MaterialRegistry,
    /// Geometries.
    pub geometries: GeometryRegistry,
    /// Texture atlas.
    pub atlas: TextureAtlas,
}

impl BlockModel {
    /// Empty model.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a model from a TOML document.
    ///
    /// ```toml
    /// [[tiles]]
    /// name = "grass_top"
    /// textures = [3]
    ///
    /// [[materials]]
    /// name = "grass"
    /// textures = { all = "dirt", side = "grass_side", top = "grass_top" }
    /// ambient_occlusion_exponent = 1.5
    ///
    /// [[geometries]]
    /// name = "slab"
    /// cubes = [{ occlusion_mask = 2, transform = { scale = [16.0, 8.0, 16.0] } }]
    /// ```
    ///
    /// Material `textures` is either one tile name for all faces or a table
    /// keyed by `all`, `side` or a face name, applied in that order.
    /// Unknown face keys are skipped.
    ///
    /// # Errors
    /// [`VoxelError::InvalidDefinition`] on malformed TOML or a reference to
    /// an unregistered tile.
    pub fn from_toml_str(source: &str) -> VoxelResult<Self> {
        let document: ModelDocument =
            toml::from_str(source).map_err(|e| VoxelError::InvalidDefinition(e.to_string()))?;

        let mut model = Self::new();
        for tile in document.tiles {
            model.atlas.register(&tile.name, tile.textures)?;
        }
        for entry in document.materials {
            let material = entry.resolve(&model.atlas)?;
            model.materials.register(&entry.name, material)?;
        }
        for entry in document.geometries {
            model.geometries.register(&entry.name, GeometryDef { cubes: entry.cubes })?;
        }

        tracing::info!(
            materials = model.materials.len(),
            sub_cubes = model.geometries.sub_cube_count(),
            "Block model loaded"
        );
        Ok(model)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModelDocument {
    #[serde(default)]
    tiles: Vec<TileEntry>,
    #[serde(default)]
    materials: Vec<MaterialEntry>,
    #[serde(default)]
    geometries: Vec<GeometryEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TileEntry {
    name: String,
    textures: Vec<u16>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct GeometryEntry {
    name: String,
    cubes: Vec<SubCube>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PerFace<T> {
    All(T),
    Faces(BTreeMap<String, T>),
}

fn default_ao_exponent() -> f32 {
    1.0
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct MaterialEntry {
    name: String,
    textures: PerFace<String>,
    #[serde(default = "default_ao_exponent")]
    ambient_occlusion_exponent: f32,
    #[serde(default)]
    isotropic: Option<PerFace<bool>>,
}

impl MaterialEntry {
    fn resolve(&self, atlas: &TextureAtlas) -> VoxelResult<MaterialDef> {
        let tile = |name: &str| {
            atlas.id(name).ok_or_else(|| {
                VoxelError::InvalidDefinition(format!("material {}: unknown tile {name}", self.name))
            })
        };

        let mut material = MaterialDef::default();
        match &self.textures {
            PerFace::All(name) => material = MaterialDef::uniform(tile(name)?),
            PerFace::Faces(faces) => {
                for (key, name) in ordered_face_entries(faces) {
                    let id = tile(name)?;
                    material = match key {
                        FaceKey::All => MaterialDef { tiles: [id; 6], ..material },
                        FaceKey::Side => material.with_sides(id),
                        FaceKey::Face(face) => material.with_face(face, id),
                    };
                }
            }
        }
        material.ao_exponent = self.ambient_occlusion_exponent;

        match &self.isotropic {
            None => {}
            Some(PerFace::All(flag)) => material.isotropic_mask = if *flag { 0x3F } else { 0 },
            Some(PerFace::Faces(faces)) => {
                for (key, &flag) in ordered_face_entries(faces) {
                    let bits = match key {
                        FaceKey::All => 0x3F,
                        FaceKey::Side => 0x3F & !(Face::Top.bit() | Face::Bottom.bit()),
                        FaceKey::Face(face) => face.bit(),
                    };
                    if flag {
                        material.isotropic_mask |= bits;
                    } else {
                        material.isotropic_mask &= !bits;
                    }
                }
            }
        }
        Ok(material)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum FaceKey {
    All,
    Side,
    Face(Face),
}

/// `all` first, then `side`, then single faces.
fn ordered_face_entries<T>(faces: &BTreeMap<String, T>) -> Vec<(FaceKey, &T)> {
    let mut entries: Vec<(FaceKey, &T)> = faces
        .iter()
        .filter_map(|(key, value)| {
            let key = match key.as_str() {
                "all" => FaceKey::All,
                "side" => FaceKey::Side,
                other => match other.parse::<Face>() {
                    Ok(face) => FaceKey::Face(face),
                    Err(_) => {
                        tracing::warn!(key = other, "Skipping unknown face key");
                        return None;
                    }
                },
            };
            Some((key, value))
        })
        .collect();
    entries.sort_by_key(|(key, _)| *key);
    entries
}
