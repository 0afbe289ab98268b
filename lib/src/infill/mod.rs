//! Infill pattern generation, clipping, and the session pattern cache.
//!
//! Patterns are built once per (kind, spacing, angle) and clipped against
//! each layer's target regions. The parallel pattern is a square-wave
//! polygon whose strokes run along the fill axis; after boolean clipping,
//! only edges on that axis survive the direction filter, yielding the
//! infill lines. The line pattern skips the polygon stage entirely and
//! clips raw segments.

use crate::clipper;
use crate::geometry::{BoundingBox, ExPolygon, Point, Polygon};
use crate::{scale, CoordF};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Cache quantization step for spacing (mm) and angle (radians).
const CACHE_QUANTUM: CoordF = 0.01;

/// Normalized edge directions within this of the fill axis are kept.
const AXIS_TOLERANCE: CoordF = 0.1;

/// Fill style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InfillKind {
    /// Square-wave raster converted to parallel lines after clipping.
    Parallel,
    /// Parallel single-segment lines, clipped directly.
    Lines,
    /// Raster for support towers; coarse spacing, no per-layer rotation.
    Support,
}

/// A generated, unclipped pattern covering a generous region.
#[derive(Debug, Clone)]
pub enum Pattern {
    Polygons(Vec<Polygon>),
    Segments(Vec<(Point, Point)>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PatternKey {
    kind: InfillKind,
    spacing_q: i64,
    angle_q: i64,
}

impl PatternKey {
    fn new(kind: InfillKind, spacing: CoordF, angle: CoordF) -> Self {
        Self {
            kind,
            spacing_q: (spacing / CACHE_QUANTUM).round() as i64,
            angle_q: (angle / CACHE_QUANTUM).round() as i64,
        }
    }
}

/// Session-wide pattern cache. Insert-once per key: a hit returns the
/// previously built pattern unchanged, so concurrent layer processing only
/// needs this one mutex.
#[derive(Debug, Default)]
pub struct PatternCache {
    inner: Mutex<HashMap<PatternKey, Arc<Pattern>>>,
}

impl PatternCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_or_build(&self, key: PatternKey, build: impl FnOnce() -> Pattern) -> Arc<Pattern> {
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        map.entry(key).or_insert_with(|| Arc::new(build())).clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One fill category's parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Infill {
    pub kind: InfillKind,
    /// Line spacing in mm.
    pub line_distance: CoordF,
    /// Base direction, radians, normalized to [0, 2π).
    pub base_angle: CoordF,
    /// Added per layer index.
    pub rotation_per_layer: CoordF,
}

/// Wrap into [0, 2π).
fn normalize_angle(angle: CoordF) -> CoordF {
    let tau = std::f64::consts::TAU;
    angle.rem_euclid(tau)
}

impl Infill {
    pub fn new(
        kind: InfillKind,
        line_distance: CoordF,
        base_angle: CoordF,
        rotation_per_layer: CoordF,
    ) -> Self {
        Self {
            kind,
            line_distance,
            base_angle: normalize_angle(base_angle),
            rotation_per_layer,
        }
    }

    /// Effective fill direction for a layer index.
    pub fn angle_for_layer(&self, layer_no: i32) -> CoordF {
        normalize_angle(self.base_angle + layer_no as CoordF * self.rotation_per_layer)
    }

    /// Fill `targets` with this pattern at `angle`, returning line segments.
    pub fn apply(
        &self,
        cache: &PatternCache,
        targets: &[ExPolygon],
        angle: CoordF,
    ) -> Vec<(Point, Point)> {
        if targets.is_empty() || self.line_distance <= 0.0 {
            return vec![];
        }
        let angle = normalize_angle(angle);
        let mut bbox = BoundingBox::new();
        for t in targets {
            for p in t.outer.points() {
                bbox.merge_point(*p);
            }
        }
        if bbox.is_empty() {
            return vec![];
        }

        let key = PatternKey::new(self.kind, self.line_distance, angle);
        let pattern = cache.get_or_build(key, || {
            build_pattern(self.kind, self.line_distance, angle, &bbox)
        });

        match pattern.as_ref() {
            Pattern::Polygons(polys) => {
                let subject: Vec<ExPolygon> =
                    polys.iter().cloned().map(ExPolygon::new).collect();
                let clipped = clipper::intersection(&subject, targets);
                let mut lines = Vec::new();
                for expoly in &clipped {
                    extract_axis_edges(&expoly.outer, angle, &mut lines);
                    for hole in &expoly.holes {
                        extract_axis_edges(hole, angle, &mut lines);
                    }
                }
                lines
            }
            Pattern::Segments(segs) => clipper::clip_segments(segs, targets),
        }
    }
}

/// Build an unclipped pattern spanning twice the target bounding box, so
/// rotation about the box center still covers it fully.
fn build_pattern(kind: InfillKind, spacing: CoordF, angle: CoordF, bbox: &BoundingBox) -> Pattern {
    let center = bbox.center();
    let extent = bbox.width().max(bbox.height()).max(scale(1.0));
    let x0 = center.x - extent;
    let x1 = center.x + extent;
    let y0 = center.y - extent;
    let y1 = center.y + extent;
    let step = scale(spacing).max(1);

    match kind {
        InfillKind::Parallel | InfillKind::Support => {
            // square wave: strokes along Y at every `spacing`, joined
            // alternately at the top and bottom
            let mut points = Vec::new();
            let mut x = x0;
            let mut up = true;
            while x <= x1 {
                if up {
                    points.push(Point::new(x, y0));
                    points.push(Point::new(x, y1));
                } else {
                    points.push(Point::new(x, y1));
                    points.push(Point::new(x, y0));
                }
                up = !up;
                x += step;
            }
            // close outside the covered region so the seam never clips anything
            let last = *points.last().unwrap_or(&Point::new(x1, y0));
            points.push(Point::new(last.x + step, last.y));
            points.push(Point::new(last.x + step, y0 - step));
            points.push(Point::new(x0, y0 - step));

            let mut poly = Polygon::from_points(points, 0.0);
            poly.rotate_around(angle, center);
            Pattern::Polygons(vec![poly])
        }
        InfillKind::Lines => {
            let mut segs = Vec::new();
            let mut x = x0;
            while x <= x1 {
                let a = Point::new(x, y0).rotate_around(angle, center);
                let b = Point::new(x, y1).rotate_around(angle, center);
                segs.push((a, b));
                x += step;
            }
            Pattern::Segments(segs)
        }
    }
}

/// Keep the edges of a clipped ring that lie on the fill axis: the edge
/// direction rotated by `-angle` must be near-vertical.
fn extract_axis_edges(ring: &Polygon, angle: CoordF, out: &mut Vec<(Point, Point)>) {
    let n = ring.len();
    if n < 2 {
        return;
    }
    for i in 0..n {
        let p = ring.points()[i];
        let q = ring.point_circular(i + 1);
        let d = (q - p).to_f64().normalized();
        let (s, c) = (-angle).sin_cos();
        let rx = c * d.x - s * d.y;
        let ry = s * d.x + c * d.y;
        if rx.abs() < AXIS_TOLERANCE && ry.abs() > AXIS_TOLERANCE {
            out.push((p, q));
        }
    }
}
