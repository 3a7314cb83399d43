//! # Bit-Field Round-Trip Tests
//!
//! For every field and every value inside its width, `get` after `set`
//! returns the value, and no other field in the record moves.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use webcraft_core::{BitFieldLayout, BitOrder, FieldSpec};

const STATE_FIELDS: [FieldSpec; 9] = [
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

fn check_every_value<const N: usize>(layout: &BitFieldLayout<N>, seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let words = layout.bucket_count();

    for field in 0..N {
        let slot = layout.slot(field);
        for value in 0..=slot.mask.min(0xFFF) {
            // Random background so neighbouring fields hold non-zero data
            let mut buffer: Vec<u32> = (0..words).map(|_| rng.gen()).collect();
            let before = layout.get_all(&buffer, 0);

            layout.set(&mut buffer, 0, field, value);
            let after = layout.get_all(&buffer, 0);

            assert_eq!(after[field], value, "field {} value {}", layout.names()[field], value);
            for other in (0..N).filter(|&o| o != field) {
                assert_eq!(after[other], before[other], "field {} moved", layout.names()[other]);
            }
        }
    }
}

#[test]
fn test_state_word_layout_round_trip() {
    let layout = BitFieldLayout::compile(STATE_FIELDS, 32, BitOrder::LsbFirst).unwrap();
    assert_eq!(layout.bucket_count(), 1);
    check_every_value(&layout, 7);
}

#[test]
fn test_quad_style_layout_round_trip() {
    let layout = BitFieldLayout::compile(
        [
            FieldSpec::new("x", 4),
            FieldSpec::new("y", 4),
            FieldSpec::new("z", 4),
            FieldSpec::new("texture_id", 12),
            FieldSpec::new("quad_normal", 3),
            FieldSpec::new("placing_face", 3),
            FieldSpec::new("facing", 2),
            FieldSpec::new("transform", 10),
            FieldSpec::new("ao_exponent", 8),
        ],
        32,
        BitOrder::MsbFirst,
    )
    .unwrap();
    assert_eq!(layout.bucket_count(), 2);
    check_every_value(&layout, 11);
}

#[test]
fn test_batched_write_matches_field_writes() {
    let layout = BitFieldLayout::compile(STATE_FIELDS, 32, BitOrder::LsbFirst).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(99);

    for _ in 0..256 {
        let mut values = [0u32; 9];
        for (field, value) in values.iter_mut().enumerate() {
            *value = rng.gen::<u32>() & layout.slot(field).mask;
        }

        let mut batched = [u32::MAX; 1];
        layout.write_all(&mut batched, 0, &values);

        let mut single = [0u32; 1];
        for (field, &value) in values.iter().enumerate() {
            layout.set(&mut single, 0, field, value);
        }

        assert_eq!(batched, single);
        assert_eq!(layout.get_all(&batched, 0), values);
    }
}
