//! Packed quad record.
//!
//! One visible face = 3 × u32, uploaded as-is and decoded in the vertex
//! shader. Fields fill each word from the top bit down:
//!
//! ```text
//! word 0: x4 y4 z4 texture_id12 quad_normal3 placing_face3 facing2
//! word 1: transform10 ao_exponent8 ao8 light4 isotropic1 flag1
//! word 2: light_corners4 sky_light4 temperature8 humidity8 (8 bits spare)
//! ```

use bytemuck::{Pod, Zeroable};
use webcraft_core::{BitFieldLayout, BitOrder, FieldSpec};

/// Field table of the quad record.
pub const QUAD_FIELDS: [FieldSpec; 17] = [
    FieldSpec::new("x", 4),
    FieldSpec::new("y", 4),
    FieldSpec::new("z", 4),
    FieldSpec::new("texture_id", 12),
    FieldSpec::new("quad_normal", 3),
    FieldSpec::new("placing_face", 3),
    FieldSpec::new("facing", 2),
    FieldSpec::new("transform", 10),
    FieldSpec::new("ao_exponent", 8),
    FieldSpec::new("ao", 8),
    FieldSpec::new("light", 4),
    FieldSpec::new("isotropic", 1),
    FieldSpec::new("flag", 1),
    FieldSpec::new("light_corners", 4),
    FieldSpec::new("sky_light", 4),
    FieldSpec::new("temperature", 8),
    FieldSpec::new("humidity", 8),
];

/// Compiled quad layout.
pub const QUAD_LAYOUT: BitFieldLayout<17> =
    match BitFieldLayout::compile(QUAD_FIELDS, 32, BitOrder::MsbFirst) {
        Ok(layout) => layout,
        Err(_) => panic!("quad fields do not fit 32-bit words"),
    };

/// Words per quad.
pub const WORDS_PER_QUAD: usize = 3;

const _: () = assert!(QUAD_LAYOUT.bucket_count() == WORDS_PER_QUAD);

/// Largest texture id the record can carry.
pub const MAX_TEXTURE_ID: u32 = (1 << 12) - 1;

/// GPU quad instance.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Pod, Zeroable)]
pub struct QuadRecord {
    /// Packed words.
    pub words: [u32; WORDS_PER_QUAD],
}

impl QuadRecord {
    /// Packs decoded fields.
    #[must_use]
    pub fn pack(fields: &QuadFields) -> Self {
        let mut record = Self::default();
        QUAD_LAYOUT.write_all(&mut record.words, 0, &fields.to_values());
        record
    }

    /// Unpacks every field.
    #[must_use]
    pub fn fields(&self) -> QuadFields {
        QuadFields::from_values(&QUAD_LAYOUT.get_all(&self.words, 0))
    }

    /// Raw bytes for upload.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::bytes_of(self)
    }
}

/// Decoded view of a [`QuadRecord`].
///
/// The lighting and climate fields are reserved; the mesher writes them as 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[allow(missing_docs)]
pub struct QuadFields {
    pub x: u8,
    pub y: u8,
    pub z: u8,
    pub texture_id: u16,
    /// Face index `0..6`.
    pub quad_normal: u8,
    pub placing_face: u8,
    pub facing: u8,
    /// Global sub-cube id.
    pub transform: u16,
    pub ao_exponent: u8,
    pub ao: u8,
    pub light: u8,
    pub isotropic: bool,
    pub flag: bool,
    pub light_corners: u8,
    pub sky_light: u8,
    pub temperature: u8,
    pub humidity: u8,
}

impl QuadFields {
    /// Values in [`QUAD_FIELDS`] order.
    #[must_use]
    pub fn to_values(&self) -> [u32; 17] {
        [
            u32::from(self.x),
            u32::from(self.y),
            u32::from(self.z),
            u32::from(self.texture_id),
            u32::from(self.quad_normal),
            u32::from(self.placing_face),
            u32::from(self.facing),
            u32::from(self.transform),
            u32::from(self.ao_exponent),
            u32::from(self.ao),
            u32::from(self.light),
            u32::from(self.isotropic),
            u32::from(self.flag),
            u32::from(self.light_corners),
            u32::from(self.sky_light),
            u32::from(self.temperature),
            u32::from(self.humidity),
        ]
    }

    /// Fields from values in [`QUAD_FIELDS`] order. Values are masked by
    /// the layout, so the casts never lose bits.
    #[must_use]
    pub fn from_values(v: &[u32; 17]) -> Self {
        Self {
            x: v[0] as u8,
            y: v[1] as u8,
            z: v[2] as u8,
            texture_id: v[3] as u16,
            quad_normal: v[4] as u8,
            placing_face: v[5] as u8,
            facing: v[6] as u8,
            transform: v[7] as u16,
            ao_exponent: v[8] as u8,
            ao: v[9] as u8,
            light: v[10] as u8,
            isotropic: v[11] != 0,
            flag: v[12] != 0,
            light_corners: v[13] as u8,
            sky_light: v[14] as u8,
            temperature: v[15] as u8,
            humidity: v[16] as u8,
        }
    }
}
