//! End-to-end slicing pipeline tests: mesh in, categorized layers out.

use lamina::config::{SkirtMode, SliceSettings};
use lamina::geometry::Point3F;
use lamina::infill::PatternCache;
use lamina::mesh::{split_shapes, Shape};
use lamina::slice::{support_polygons_at_z, Layer};
use lamina::{CancelToken, SCALING_FACTOR};

/// Sum of signed polygon areas in mm² (holes count negative).
fn solid_area_mm2(layer: &Layer) -> f64 {
    layer
        .polygons()
        .iter()
        .map(|p| p.signed_area())
        .sum::<f64>()
        / (SCALING_FACTOR * SCALING_FACTOR)
}

#[test]
fn test_cube_full_pipeline() {
    let settings = SliceSettings::default();
    settings.validate().unwrap();
    let cancel = CancelToken::new();
    let cache = PatternCache::new();
    let cube = Shape::cube(20.0);

    let layer_count = (20.0 / settings.layer_thickness) as i32 - 1;
    let mut prev: Option<Layer> = None;
    for layer_no in 0..layer_count {
        let z = (layer_no as f64 + 0.5) * settings.layer_thickness;
        let mut layer = Layer::new(layer_no, z, &settings);
        layer.add_shape(&cube, &settings, &cancel).unwrap();

        // interior slices of a 20 mm cube are a 400 mm² square
        assert!(
            (solid_area_mm2(&layer) - 400.0).abs() < 0.5,
            "layer {layer_no} area {}",
            solid_area_mm2(&layer)
        );

        layer.make_shells(&settings);
        assert_eq!(layer.shells().len(), settings.shell_count as usize);
        assert!(!layer.fill_polygons().is_empty());

        if layer_no == 0 {
            layer.make_skirt(&settings);
            assert!(!layer.skirt().is_empty());
        }

        layer.calc_infill(&cache, &settings);
        assert!(!layer.normal_infill().is_empty());

        if let Some(prev_layer) = &prev {
            // a straight cube never overhangs
            assert!(layer.overhangs(prev_layer).is_empty());
        }
        prev = Some(layer);
    }

    // only a handful of distinct (kind, spacing, angle) patterns exist
    assert!(cache.len() <= 8, "cache grew to {}", cache.len());
}

#[test]
fn test_two_solids_split_and_slice() {
    let mut combined = Shape::cube(10.0);
    let mut second = Shape::cube(10.0);
    second.translate(Point3F::new(40.0, 0.0, 0.0));
    let moved: Vec<_> = second
        .triangles()
        .iter()
        .map(|t| t.transformed(second.transform()))
        .collect();
    combined.add_triangles(&moved);

    let cancel = CancelToken::new();
    let parts = split_shapes(&combined, 1e-8, &cancel).unwrap();
    assert_eq!(parts.len(), 2);

    let settings = SliceSettings::default();
    let mut layer = Layer::new(0, 5.0, &settings);
    for part in &parts {
        layer.add_shape(part, &settings, &cancel).unwrap();
    }
    assert_eq!(layer.polygons().len(), 2);
    assert!((solid_area_mm2(&layer) - 200.0).abs() < 0.5);

    layer.make_shells(&settings);
    // each solid gets its own ring per shell level
    assert_eq!(layer.shells()[0].len(), 2);
}

#[test]
fn test_floating_cube_gets_support() {
    let settings = SliceSettings::default();
    let cancel = CancelToken::new();
    let cache = PatternCache::new();

    let mut cube = Shape::cube(10.0);
    cube.translate(Point3F::new(0.0, 0.0, 5.0));

    // candidates show up on the layer whose band reaches the bottom face
    let z_overhang = 5.0 + settings.layer_thickness / 2.0;
    let candidates = support_polygons_at_z(
        &cube,
        z_overhang,
        settings.layer_thickness,
        settings.support_angle,
    );
    assert!(!candidates.is_empty());

    // the layer inside the solid keeps none of them
    let mut solid_layer = Layer::new(13, z_overhang, &settings);
    solid_layer.add_shape(&cube, &settings, &cancel).unwrap();
    solid_layer.set_support_polygons(&candidates, &settings);
    assert!(solid_layer.support_polygons().is_empty());

    // an open layer below the cube carries the full footprint
    let z_below = 5.0 - settings.layer_thickness;
    let mut layer = Layer::new(11, z_below, &settings);
    layer.add_shape(&cube, &settings, &cancel).unwrap();
    layer.make_shells(&settings);
    layer.set_support_polygons(&candidates, &settings);
    assert!(!layer.support_polygons().is_empty());

    layer.calc_infill(&cache, &settings);
    assert!(!layer.support_infill().is_empty());
}

#[test]
fn test_per_shape_skirt_mode() {
    let mut settings = SliceSettings::default();
    settings.skirt_mode = SkirtMode::PerShape;
    let cancel = CancelToken::new();

    let cube = Shape::cube(10.0);
    let mut layer = Layer::new(0, 0.2, &settings);
    layer.add_shape(&cube, &settings, &cancel).unwrap();
    layer.make_shells(&settings);
    layer.make_skirt(&settings);
    assert!(!layer.skirt().is_empty());
}

#[test]
fn test_cancellation_propagates() {
    let settings = SliceSettings::default();
    let cancel = CancelToken::new();
    cancel.cancel();

    let cube = Shape::cube(10.0);
    let mut layer = Layer::new(0, 5.0, &settings);
    assert!(matches!(
        layer.add_shape(&cube, &settings, &cancel),
        Err(lamina::Error::Cancelled)
    ));
}
