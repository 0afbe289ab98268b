//! Slicing benchmarks
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lamina::config::SliceSettings;
use lamina::infill::PatternCache;
use lamina::mesh::{split_shapes, Shape};
use lamina::slice::{cross_section_at_z, Layer};
use lamina::CancelToken;

fn bench_cross_section(c: &mut Criterion) {
    let cube = Shape::cube(20.0);
    let settings = SliceSettings::default();
    let cancel = CancelToken::new();
    c.bench_function("cross_section_cube", |b| {
        b.iter(|| {
            black_box(cross_section_at_z(&cube, black_box(10.0), &settings, &cancel).unwrap())
        })
    });
}

fn bench_layer_build(c: &mut Criterion) {
    let cube = Shape::cube(20.0);
    let settings = SliceSettings::default();
    let cancel = CancelToken::new();
    let cache = PatternCache::new();
    c.bench_function("layer_shells_and_infill", |b| {
        b.iter(|| {
            let mut layer = Layer::new(0, 10.0, &settings);
            layer.add_shape(&cube, &settings, &cancel).unwrap();
            layer.make_shells(&settings);
            layer.calc_infill(&cache, &settings);
            black_box(layer)
        })
    });
}

fn bench_component_split(c: &mut Criterion) {
    let mut combined = Shape::cube(10.0);
    let mut second = Shape::cube(10.0);
    second.translate(lamina::geometry::Point3F::new(50.0, 0.0, 0.0));
    let moved: Vec<_> = second
        .triangles()
        .iter()
        .map(|t| t.transformed(second.transform()))
        .collect();
    combined.add_triangles(&moved);
    let cancel = CancelToken::new();
    c.bench_function("split_two_solids", |b| {
        b.iter(|| black_box(split_shapes(&combined, 1e-8, &cancel).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_cross_section,
    bench_layer_build,
    bench_component_split
);
criterion_main!(benches);
