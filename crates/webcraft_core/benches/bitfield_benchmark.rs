//! # Bit-Field Benchmark
//!
//! Measures the batched writer against per-field writes for a
//! three-word quad-sized record.

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use webcraft_core::{BitFieldLayout, BitOrder, FieldSpec};

const LAYOUT: BitFieldLayout<8> = match BitFieldLayout::compile(
    [
        FieldSpec::new("x", 4),
        FieldSpec::new("y", 4),
        FieldSpec::new("z", 4),
        FieldSpec::new("texture_id", 12),
        FieldSpec::new("quad_normal", 3),
        FieldSpec::new("placing_face", 3),
        FieldSpec::new("facing", 2),
        FieldSpec::new("transform", 10),
    ],
    32,
    BitOrder::MsbFirst,
) {
    Ok(layout) => layout,
    Err(_) => panic!("benchmark layout does not fit"),
};

fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("bitfield_write");
    let mut buffer = vec![0u32; 4096 * 2];

    group.bench_function("write_all", |b| {
        b.iter(|| {
            for record in 0..4096usize {
                let v = record as u32;
                LAYOUT.write_all(
                    &mut buffer,
                    record * 2,
                    black_box(&[v & 15, (v >> 4) & 15, (v >> 8) & 15, v, 1, 2, 3, 0]),
                );
            }
        });
    });

    group.bench_function("set_per_field", |b| {
        b.iter(|| {
            for record in 0..4096usize {
                let v = record as u32;
                let values = black_box([v & 15, (v >> 4) & 15, (v >> 8) & 15, v, 1, 2, 3, 0]);
                for (field, &value) in values.iter().enumerate() {
                    LAYOUT.set(&mut buffer, record * 2, field, value);
                }
            }
        });
    });

    group.finish();
}

criterion_group!(benches, bench_write);
criterion_main!(benches);
