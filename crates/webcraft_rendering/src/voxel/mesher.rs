//! Bitmask chunk mesher.
//!
//! Every 16-voxel column along an axis is one `u16`. Exposed faces of a
//! whole column fall out of two shifts:
//!
//! ```text
//! pos = v & !(v >> 1)   solid with empty +1 neighbour
//! neg = v & !(v << 1)   solid with empty -1 neighbour
//! ```
//!
//! Pass layout:
//! 1. Scanning    - full blocks into per-axis occupancy planes, everything
//!                  else onto the irregular list
//! 2. FaceCulling - planes into six face masks
//! 3. Emitting    - one packed quad per set mask bit, then every visible
//!                  sub-cube face of the irregular blocks
//!
//! All scratch memory is allocated once in [`ChunkMesher::new`].

use std::time::Instant;

use webcraft_core::Array3D;

use super::block_state::{BlockProperty, BlockState};
use super::chunk::{Chunk, CHUNK_SIZE, CHUNK_VOLUME};
use super::face::Face;
use super::palette::AIR_INDEX;
use super::quad::{QuadFields, QuadRecord, MAX_TEXTURE_ID, QUAD_LAYOUT};
use super::registry::{BlockModel, MaterialDef};
use crate::config::EngineConfig;

/// Mesh passes slower than this are logged as warnings.
pub const SLOW_MESH_MICROS: u128 = 2_000;

/// Clears bit 15 of `pos` masks when the chunk border counts as covered.
const BORDER_POS: u16 = 0x7FFF;
/// Clears bit 0 of `neg` masks when the chunk border counts as covered.
const BORDER_NEG: u16 = 0xFFFE;

/// Exposed bits of one occupancy column: `(positive side, negative side)`.
#[inline]
#[must_use]
pub const fn exposed_bits(column: u16) -> (u16, u16) {
    (column & !(column >> 1), column & !(column << 1))
}

/// Where a mesh pass currently is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MeshPhase {
    /// No pass has run yet.
    #[default]
    Idle,
    /// Building occupancy planes.
    Scanning,
    /// Turning planes into face masks.
    FaceCulling,
    /// Writing quads.
    Emitting,
    /// Quads are complete and readable.
    Done,
}

/// Counters of one mesh pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MeshStats {
    /// Quads emitted.
    pub quad_count: u32,
    /// Full blocks scanned.
    pub full_blocks: u32,
    /// Non-full, non-air blocks scanned.
    pub irregular_blocks: u32,
    /// Faces drawn with the fallback texture because the material is unknown.
    pub missing_materials: u32,
    /// Faces drawn with the fallback texture because the atlas tile is unknown.
    pub missing_textures: u32,
    /// Failed geometry lookups: per face for full blocks, per block otherwise.
    pub missing_geometries: u32,
}

impl MeshStats {
    /// Sum of all degraded lookups.
    #[must_use]
    pub const fn missing_lookups(&self) -> u32 {
        self.missing_materials + self.missing_textures + self.missing_geometries
    }
}

#[derive(Debug, Clone, Copy)]
struct IrregularBlock {
    x: u8,
    y: u8,
    z: u8,
    id: u16,
}

#[derive(Debug, Clone, Copy)]
struct Surface {
    texture_id: u16,
    ao_exponent: u8,
    isotropic: bool,
}

/// Lazy walk over the set bits of one face mask.
///
/// Yields local `[x, y, z]` positions of exposed faces using count trailing
/// zeros and clear-lowest-bit. Finite: 256 columns, at most 16 bits each.
pub struct ExposedFaces<'a> {
    masks: &'a Array3D,
    face: Face,
    next_cell: usize,
    cell: usize,
    bits: u16,
}

impl<'a> ExposedFaces<'a> {
    fn new(masks: &'a Array3D, face: Face) -> Self {
        Self {
            masks,
            face,
            next_cell: 0,
            cell: 0,
            bits: 0,
        }
    }
}

impl Iterator for ExposedFaces<'_> {
    type Item = [usize; 3];

    fn next(&mut self) -> Option<Self::Item> {
        while self.bits == 0 {
            if self.next_cell >= CHUNK_SIZE * CHUNK_SIZE {
                return None;
            }
            self.cell = self.next_cell;
            self.next_cell += 1;
            self.bits = self.masks.get(
                self.cell / CHUNK_SIZE,
                self.cell % CHUNK_SIZE,
                self.face.index(),
            );
        }

        let bit = self.bits.trailing_zeros() as usize;
        self.bits &= self.bits - 1;
        let (i, j) = (self.cell / CHUNK_SIZE, self.cell % CHUNK_SIZE);
        Some(match self.face.axis() {
            0 => [bit, i, j],
            1 => [i, bit, j],
            _ => [i, j, bit],
        })
    }
}

/// Chunk mesher with reusable scratch buffers.
///
/// One instance meshes one chunk at a time; `&mut self` keeps the scratch
/// buffers exclusive for the whole pass.
pub struct ChunkMesher {
    /// Occupancy columns: `(y, z)` bit x, `(x, z)` bit y, `(x, y)` bit z.
    planes: Array3D,
    /// Exposed-face columns per face, same indexing as `planes`.
    masks: Array3D,
    /// Non-full blocks of the current chunk.
    irregular: Vec<IrregularBlock>,
    /// Output of the current pass.
    quads: Vec<QuadRecord>,
    phase: MeshPhase,
    stats: MeshStats,
    cull_chunk_border: bool,
    missing_texture_id: u16,
}

impl ChunkMesher {
    /// Creates a mesher with pre-allocated buffers.
    ///
    /// Note: Call this once during initialization, not in hot path.
    #[must_use]
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            planes: Array3D::new(CHUNK_SIZE, CHUNK_SIZE, 3),
            masks: Array3D::new(CHUNK_SIZE, CHUNK_SIZE, 6),
            irregular: Vec::with_capacity(CHUNK_VOLUME),
            // checkerboard of full blocks: half the cells, six faces each
            quads: Vec::with_capacity(CHUNK_VOLUME / 2 * 6),
            phase: MeshPhase::Idle,
            stats: MeshStats::default(),
            cull_chunk_border: config.cull_chunk_border,
            missing_texture_id: (config.missing_texture_id & MAX_TEXTURE_ID) as u16,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> MeshPhase {
        self.phase
    }

    /// Meshes `chunk`, publishes the quad count into its draw range and
    /// clears its dirty flag.
    ///
    /// The quads stay readable through [`Self::quads`] until the next call.
    pub fn compute_chunk(&mut self, chunk: &mut Chunk, model: &BlockModel) -> MeshStats {
        let mesh_start = Instant::now();
        let coord = chunk.coord();

        self.reset();

        // Skip empty chunks entirely
        if !chunk.is_empty() {
            self.scan(chunk);
            self.cull();
            self.emit_full_blocks(chunk, model);
            self.emit_irregular_blocks(chunk, model);
        }

        self.phase = MeshPhase::Done;
        let quad_count = self.quad_count();
        self.stats.quad_count = quad_count;
        chunk.set_quad_count(quad_count);
        chunk.clear_dirty();

        let micros = mesh_start.elapsed().as_micros();
        tracing::debug!(
            x = coord.x,
            y = coord.y,
            z = coord.z,
            quads = quad_count,
            full = self.stats.full_blocks,
            irregular = self.stats.irregular_blocks,
            micros,
            "Chunk meshed"
        );
        if micros > SLOW_MESH_MICROS {
            tracing::warn!(x = coord.x, y = coord.y, z = coord.z, micros, "Slow mesh generation");
        }
        if self.stats.missing_lookups() > 0 {
            tracing::warn!(
                x = coord.x,
                y = coord.y,
                z = coord.z,
                materials = self.stats.missing_materials,
                textures = self.stats.missing_textures,
                geometries = self.stats.missing_geometries,
                "Chunk meshed with fallback lookups"
            );
        }

        self.stats
    }

    /// Quads of the last pass.
    #[inline]
    #[must_use]
    pub fn quads(&self) -> &[QuadRecord] {
        &self.quads
    }

    /// Quads of the last pass as raw words, three per quad.
    #[must_use]
    pub fn words(&self) -> &[u32] {
        bytemuck::cast_slice(&self.quads)
    }

    /// Number of quads of the last pass.
    #[must_use]
    pub fn quad_count(&self) -> u32 {
        self.quads.len() as u32
    }

    /// Exposed faces on `face` found by the last pass.
    #[must_use]
    pub fn exposed_faces(&self, face: Face) -> ExposedFaces<'_> {
        ExposedFaces::new(&self.masks, face)
    }

    fn reset(&mut self) {
        self.planes.fill(0);
        self.masks.fill(0);
        self.irregular.clear();
        self.quads.clear();
        self.stats = MeshStats::default();
    }

    fn scan(&mut self, chunk: &Chunk) {
        self.phase = MeshPhase::Scanning;
        let voxels = chunk.voxels();
        let palette = chunk.palette();

        for (index, &id) in voxels.data().iter().enumerate() {
            if id == AIR_INDEX {
                continue;
            }
            let Some(state) = palette.get_type(id) else {
                continue;
            };
            let (x, y, z) = voxels.coords(index);

            if state.is_full_block() {
                self.stats.full_blocks += 1;
                set_bit(&mut self.planes, y, z, 0, x);
                set_bit(&mut self.planes, x, z, 1, y);
                set_bit(&mut self.planes, x, y, 2, z);
            } else {
                self.stats.irregular_blocks += 1;
                self.irregular.push(IrregularBlock {
                    x: x as u8,
                    y: y as u8,
                    z: z as u8,
                    id,
                });
            }
        }
    }

    fn cull(&mut self) {
        self.phase = MeshPhase::FaceCulling;
        for axis in 0..3 {
            for j in 0..CHUNK_SIZE {
                for i in 0..CHUNK_SIZE {
                    let (mut pos, mut neg) = exposed_bits(self.planes.get(i, j, axis));
                    if self.cull_chunk_border {
                        pos &= BORDER_POS;
                        neg &= BORDER_NEG;
                    }
                    self.masks.set(i, j, axis, pos);
                    self.masks.set(i, j, 5 - axis, neg);
                }
            }
        }
    }

    fn emit_full_blocks(&mut self, chunk: &Chunk, model: &BlockModel) {
        self.phase = MeshPhase::Emitting;
        let palette = chunk.palette();

        for face in Face::ALL {
            for [x, y, z] in ExposedFaces::new(&self.masks, face) {
                let Some(state) = palette.get_type(chunk.palette_index(x, y, z)) else {
                    continue;
                };

                // first sub-cube that shows this face
                let transform = match model.geometries.get(state.geometry()) {
                    Some(geometry) => match geometry.cubes.iter().find(|c| c.shows(face)) {
                        Some(cube) => cube.id,
                        None => continue,
                    },
                    None => {
                        self.stats.missing_geometries += 1;
                        0
                    }
                };

                let surface = resolve_surface(model, state, face, self.missing_texture_id, &mut self.stats);
                push_quad(&mut self.quads, [x, y, z], face, state, transform, surface);
            }
        }
    }

    fn emit_irregular_blocks(&mut self, chunk: &Chunk, model: &BlockModel) {
        self.phase = MeshPhase::Emitting;
        let palette = chunk.palette();

        for block in &self.irregular {
            let Some(state) = palette.get_type(block.id) else {
                continue;
            };
            let Some(geometry) = model.geometries.get(state.geometry()) else {
                self.stats.missing_geometries += 1;
                tracing::warn!(
                    block = state.name(),
                    geometry = state.geometry().0,
                    "Skipping block with unknown geometry"
                );
                continue;
            };

            let pos = [usize::from(block.x), usize::from(block.y), usize::from(block.z)];
            for cube in &geometry.cubes {
                for face in Face::ALL {
                    if cube.shows(face) {
                        let surface =
                            resolve_surface(model, state, face, self.missing_texture_id, &mut self.stats);
                        push_quad(&mut self.quads, pos, face, state, cube.id, surface);
                    }
                }
            }
        }
    }
}

#[inline]
fn set_bit(planes: &mut Array3D, i: usize, j: usize, axis: usize, bit: usize) {
    let column = planes.get(i, j, axis);
    planes.set(i, j, axis, column | (1 << bit));
}

/// Material -> atlas tile -> texture, falling back to `missing_texture_id`.
fn resolve_surface(
    model: &BlockModel,
    state: &BlockState,
    face: Face,
    missing_texture_id: u16,
    stats: &mut MeshStats,
) -> Surface {
    let Some(material) = model.materials.get(state.material()) else {
        stats.missing_materials += 1;
        return Surface {
            texture_id: missing_texture_id,
            ao_exponent: MaterialDef::default().ao_exponent_packed() as u8,
            isotropic: false,
        };
    };

    let texture_id = model.atlas.texture(material.tile(face), 0).unwrap_or_else(|| {
        stats.missing_textures += 1;
        missing_texture_id
    });

    Surface {
        texture_id,
        ao_exponent: material.ao_exponent_packed() as u8,
        isotropic: material.is_isotropic(face),
    }
}

#[inline]
fn push_quad(
    quads: &mut Vec<QuadRecord>,
    [x, y, z]: [usize; 3],
    face: Face,
    state: &BlockState,
    transform: u16,
    surface: Surface,
) {
    let fields = QuadFields {
        x: x as u8,
        y: y as u8,
        z: z as u8,
        texture_id: surface.texture_id,
        quad_normal: face as u8,
        placing_face: state.get(BlockProperty::Placing) as u8,
        facing: state.get(BlockProperty::Facing) as u8,
        transform,
        ao_exponent: surface.ao_exponent,
        isotropic: surface.isotropic,
        ..QuadFields::default()
    };
    // fresh records are zeroed, so the OR-only writer is enough
    let mut record = QuadRecord::default();
    QUAD_LAYOUT.set_all(&mut record.words, 0, &fields.to_values());
    quads.push(record);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voxel::chunk::ChunkCoord;
    use crate::voxel::registry::{GeometryDef, MaterialId, SubCube, TileId};

    fn mesher() -> ChunkMesher {
        ChunkMesher::new(&EngineConfig::default())
    }

    #[test]
    fn test_exposed_bits() {
        assert_eq!(exposed_bits(0b11100), (0b10000, 0b00100));
        assert_eq!(exposed_bits(0), (0, 0));
        assert_eq!(exposed_bits(0xFFFF), (0x8000, 0x0001));
        assert_eq!(exposed_bits(0b101), (0b101, 0b101));
    }

    #[test]
    fn test_phases() {
        let mut mesher = mesher();
        assert_eq!(mesher.phase(), MeshPhase::Idle);
        let mut chunk = Chunk::new(ChunkCoord::default());
        let stats = mesher.compute_chunk(&mut chunk, &BlockModel::new());
        assert_eq!(mesher.phase(), MeshPhase::Done);
        assert_eq!(stats, MeshStats::default());
        assert!(!chunk.is_dirty());
    }

    #[test]
    fn test_exposed_faces_positions() {
        let mut chunk = Chunk::new(ChunkCoord::default());
        let stone = BlockState::new("stone").with(BlockProperty::FullBlock, 1);
        chunk.set_block(3, 4, 5, &stone).unwrap();
        chunk.set_block(4, 4, 5, &stone).unwrap();

        let mut mesher = mesher();
        mesher.compute_chunk(&mut chunk, &BlockModel::new());

        assert_eq!(mesher.exposed_faces(Face::Right).collect::<Vec<_>>(), vec![[4, 4, 5]]);
        assert_eq!(mesher.exposed_faces(Face::Left).collect::<Vec<_>>(), vec![[3, 4, 5]]);
        let mut tops: Vec<_> = mesher.exposed_faces(Face::Top).collect();
        tops.sort_unstable();
        assert_eq!(tops, vec![[3, 4, 5], [4, 4, 5]]);
        assert_eq!(mesher.quad_count(), 10);
    }

    #[test]
    fn test_quad_contents() {
        let mut model = BlockModel::new();
        let tile = model.atlas.register("log_side", vec![77]).unwrap();
        let top = model.atlas.register("log_top", vec![78]).unwrap();
        let material = model
            .materials
            .register("log", MaterialDef::uniform(tile).with_face(Face::Top, top))
            .unwrap();
        let geometry = model
            .geometries
            .register("cube", GeometryDef { cubes: vec![SubCube::default()] })
            .unwrap();

        let log = BlockState::full_cube("log", material)
            .with_geometry(geometry)
            .with(BlockProperty::Facing, 2);
        let mut chunk = Chunk::new(ChunkCoord::default());
        chunk.set_block(8, 8, 8, &log).unwrap();

        let mut mesher = mesher();
        let stats = mesher.compute_chunk(&mut chunk, &model);
        assert_eq!(stats.quad_count, 6);
        assert_eq!(stats.missing_lookups(), 0);
        assert_eq!(mesher.words().len(), 18);

        let top_quad = mesher
            .quads()
            .iter()
            .map(QuadRecord::fields)
            .find(|q| q.quad_normal == Face::Top as u8)
            .unwrap();
        assert_eq!((top_quad.x, top_quad.y, top_quad.z), (8, 8, 8));
        assert_eq!(top_quad.texture_id, 78);
        assert_eq!(top_quad.placing_face, 4);
        assert_eq!(top_quad.facing, 2);
        assert_eq!(top_quad.ao_exponent, 64);
    }

    #[test]
    fn test_missing_lookups_use_fallback() {
        let config = EngineConfig {
            missing_texture_id: 9,
            ..EngineConfig::default()
        };
        let mut mesher = ChunkMesher::new(&config);
        let mut model = BlockModel::new();
        let material = model
            .materials
            .register("ghost", MaterialDef::uniform(TileId(40)))
            .unwrap();

        let mut chunk = Chunk::new(ChunkCoord::default());
        chunk
            .set_block(1, 1, 1, &BlockState::full_cube("a", material))
            .unwrap();
        chunk
            .set_block(5, 5, 5, &BlockState::full_cube("b", MaterialId(3)))
            .unwrap();

        let stats = mesher.compute_chunk(&mut chunk, &model);
        assert_eq!(stats.quad_count, 12);
        assert_eq!(stats.missing_textures, 6);
        assert_eq!(stats.missing_materials, 6);
        assert!(mesher.quads().iter().all(|q| q.fields().texture_id == 9));
    }

    #[test]
    fn test_masked_sub_cube_hides_face() {
        let mut model = BlockModel::new();
        let geometry = model
            .geometries
            .register(
                "open_top",
                GeometryDef {
                    cubes: vec![SubCube::masked(Face::Top.bit())],
                },
            )
            .unwrap();
        let mut chunk = Chunk::new(ChunkCoord::default());
        chunk
            .set_block(
                2,
                2,
                2,
                &BlockState::new("hopper")
                    .with(BlockProperty::FullBlock, 1)
                    .with_geometry(geometry),
            )
            .unwrap();

        let mut mesher = mesher();
        let stats = mesher.compute_chunk(&mut chunk, &model);
        assert_eq!(stats.quad_count, 5);
        assert!(mesher
            .quads()
            .iter()
            .all(|q| q.fields().quad_normal != Face::Top as u8));
    }

    #[test]
    fn test_unknown_irregular_geometry_is_skipped() {
        let mut chunk = Chunk::new(ChunkCoord::default());
        chunk
            .set_block(0, 0, 0, &BlockState::new("torch").with_geometry(crate::voxel::registry::GeometryId(5)))
            .unwrap();
        let mut mesher = mesher();
        let stats = mesher.compute_chunk(&mut chunk, &BlockModel::new());
        assert_eq!(stats.quad_count, 0);
        assert_eq!(stats.irregular_blocks, 1);
        assert_eq!(stats.missing_geometries, 1);
    }
}
