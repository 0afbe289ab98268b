//! Polygon boolean and offset operations backed by geo-clipper.
//!
//! Everything a layer build needs from computational geometry funnels
//! through here: shell insets, fill region shrinking, bridge and support
//! intersections, infill clipping. Inputs and outputs are this crate's
//! scaled-integer polygons; conversion to geo's floating-point types is
//! internal.

use crate::geometry::{ExPolygon, ExPolygons, Point, Polygon, Polygons};
use crate::{scale, unscale, CoordF};
use geo::{Coord as GeoCoord, LineString, MultiPolygon, Polygon as GeoPolygon};
use geo_clipper::{Clipper, EndType, JoinType};

/// Clipper precision multiplier used for all boolean and offset calls.
const CLIPPER_FACTOR: CoordF = 1000.0;

/// Join type for offset corners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetJoinType {
    /// Square corners
    Square,
    /// Round corners
    #[default]
    Round,
    /// Mitered corners
    Miter,
}

impl From<OffsetJoinType> for JoinType {
    fn from(jt: OffsetJoinType) -> Self {
        match jt {
            OffsetJoinType::Square => JoinType::Square,
            OffsetJoinType::Round => JoinType::Round(0.25), // arc tolerance
            OffsetJoinType::Miter => JoinType::Miter(2.0),  // miter limit
        }
    }
}

fn ring_from_points(points: &[Point]) -> LineString<f64> {
    let mut coords: Vec<GeoCoord<f64>> = points
        .iter()
        .map(|p| GeoCoord {
            x: unscale(p.x),
            y: unscale(p.y),
        })
        .collect();
    if let (Some(first), Some(last)) = (coords.first(), coords.last()) {
        if first != last {
            coords.push(*first);
        }
    }
    LineString::new(coords)
}

fn polygon_to_geo(poly: &Polygon) -> GeoPolygon<f64> {
    GeoPolygon::new(ring_from_points(poly.points()), vec![])
}

fn expolygon_to_geo(expoly: &ExPolygon) -> GeoPolygon<f64> {
    let holes = expoly
        .holes
        .iter()
        .map(|h| ring_from_points(h.points()))
        .collect();
    GeoPolygon::new(ring_from_points(expoly.outer.points()), holes)
}

fn ring_to_polygon(ring: &LineString<f64>, z: CoordF) -> Polygon {
    let mut points: Vec<Point> = ring
        .coords()
        .map(|c| Point::new(scale(c.x), scale(c.y)))
        .collect();
    if points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    Polygon::from_points(points, z)
}

fn geo_to_expolygon(geo_poly: &GeoPolygon<f64>, z: CoordF) -> ExPolygon {
    let outer = ring_to_polygon(geo_poly.exterior(), z);
    let holes = geo_poly
        .interiors()
        .iter()
        .map(|i| ring_to_polygon(i, z))
        .collect();
    ExPolygon::with_holes(outer, holes)
}

fn geo_multi_to_expolygons(multi: &MultiPolygon<f64>, z: CoordF) -> ExPolygons {
    multi.0.iter().map(|p| geo_to_expolygon(p, z)).collect()
}

fn polygons_to_geo_multi(polys: &[Polygon]) -> MultiPolygon<f64> {
    MultiPolygon::new(polys.iter().map(polygon_to_geo).collect())
}

fn expolygons_to_geo_multi(expolys: &[ExPolygon]) -> MultiPolygon<f64> {
    MultiPolygon::new(expolys.iter().map(expolygon_to_geo).collect())
}

fn z_of(expolys: &[ExPolygon]) -> CoordF {
    expolys.first().map(|e| e.outer.z()).unwrap_or(0.0)
}

// ============================================================================
// Boolean operations
// ============================================================================

/// Union of two sets of polygons.
pub fn union(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() {
        return clip.to_vec();
    }
    if clip.is_empty() {
        return subject.to_vec();
    }
    let result = expolygons_to_geo_multi(subject).union(&expolygons_to_geo_multi(clip), CLIPPER_FACTOR);
    geo_multi_to_expolygons(&result, z_of(subject))
}

/// Merge a set of plain polygons into non-overlapping polygons-with-holes.
///
/// Holes must already be wound clockwise; clipper pairs them with the
/// solids that enclose them.
pub fn merge_polygons(polygons: &[Polygon]) -> ExPolygons {
    if polygons.is_empty() {
        return vec![];
    }
    let z = polygons[0].z();
    // A zero offset makes clipper resolve windings and nesting in one pass.
    let result =
        polygons_to_geo_multi(polygons).offset(0.0, JoinType::Miter(2.0), EndType::ClosedPolygon, CLIPPER_FACTOR);
    geo_multi_to_expolygons(&result, z)
}

/// Intersection of two sets of polygons.
pub fn intersection(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() || clip.is_empty() {
        return vec![];
    }
    let result =
        expolygons_to_geo_multi(subject).intersection(&expolygons_to_geo_multi(clip), CLIPPER_FACTOR);
    geo_multi_to_expolygons(&result, z_of(subject))
}

/// Difference of two sets of polygons (subject minus clip).
pub fn difference(subject: &[ExPolygon], clip: &[ExPolygon]) -> ExPolygons {
    if subject.is_empty() {
        return vec![];
    }
    if clip.is_empty() {
        return subject.to_vec();
    }
    let result =
        expolygons_to_geo_multi(subject).difference(&expolygons_to_geo_multi(clip), CLIPPER_FACTOR);
    geo_multi_to_expolygons(&result, z_of(subject))
}

// ============================================================================
// Offset operations
// ============================================================================

/// Offset polygons-with-holes by `delta` millimeters.
///
/// Positive delta grows, negative shrinks. Shrinking past the medial axis
/// returns an empty set.
pub fn offset_expolygons(
    expolygons: &[ExPolygon],
    delta: CoordF,
    join_type: OffsetJoinType,
) -> ExPolygons {
    if expolygons.is_empty() {
        return vec![];
    }
    let result = expolygons_to_geo_multi(expolygons).offset(
        delta,
        join_type.into(),
        EndType::ClosedPolygon,
        CLIPPER_FACTOR,
    );
    geo_multi_to_expolygons(&result, z_of(expolygons))
}

/// Offset plain polygons by `delta` millimeters.
pub fn offset_polygons(polygons: &[Polygon], delta: CoordF, join_type: OffsetJoinType) -> ExPolygons {
    if polygons.is_empty() {
        return vec![];
    }
    let z = polygons[0].z();
    let result = polygons_to_geo_multi(polygons).offset(
        delta,
        join_type.into(),
        EndType::ClosedPolygon,
        CLIPPER_FACTOR,
    );
    geo_multi_to_expolygons(&result, z)
}

// ============================================================================
// Utilities
// ============================================================================

/// Drop polygons whose net area falls below `min_area` (scaled units squared).
pub fn remove_small(expolygons: &[ExPolygon], min_area: CoordF) -> ExPolygons {
    expolygons
        .iter()
        .filter(|e| e.area() > min_area)
        .cloned()
        .collect()
}

/// Total net area of a set of polygons-with-holes (scaled units squared).
pub fn total_area(expolygons: &[ExPolygon]) -> CoordF {
    expolygons.iter().map(|e| e.area()).sum()
}

/// Flatten polygons-with-holes into a plain polygon list, holes clockwise.
pub fn to_polygons(expolygons: &[ExPolygon]) -> Polygons {
    let mut out = Vec::new();
    for e in expolygons {
        out.push(e.outer.clone());
        out.extend(e.holes.iter().cloned());
    }
    out
}

/// Clip line segments to the interior of a set of polygons-with-holes.
///
/// Crossing parameters along each segment are collected against every ring
/// edge, then sub-intervals whose midpoints lie inside are kept. Used for
/// line-style infill, which clipper's closed-polygon booleans cannot carry.
pub fn clip_segments(segments: &[(Point, Point)], clip: &[ExPolygon]) -> Vec<(Point, Point)> {
    if segments.is_empty() || clip.is_empty() {
        return vec![];
    }

    let mut result = Vec::new();
    for &(a, b) in segments {
        let mut ts: Vec<CoordF> = vec![0.0, 1.0];
        for expoly in clip {
            collect_crossings(a, b, expoly.outer.points(), &mut ts);
            for hole in &expoly.holes {
                collect_crossings(a, b, hole.points(), &mut ts);
            }
        }
        ts.sort_by(|x, y| x.total_cmp(y));
        ts.dedup_by(|x, y| (*x - *y).abs() < 1e-12);

        for w in ts.windows(2) {
            let (t0, t1) = (w[0], w[1]);
            if t1 - t0 < 1e-9 {
                continue;
            }
            let mid = lerp(a, b, (t0 + t1) / 2.0);
            if point_in_expolygons(mid, clip) {
                result.push((lerp(a, b, t0), lerp(a, b, t1)));
            }
        }
    }
    result
}

fn lerp(a: Point, b: Point, t: CoordF) -> Point {
    Point::new(
        a.x + ((b.x - a.x) as CoordF * t).round() as crate::Coord,
        a.y + ((b.y - a.y) as CoordF * t).round() as crate::Coord,
    )
}

/// Append the parameters where segment `a`..`b` crosses the ring's edges.
fn collect_crossings(a: Point, b: Point, ring: &[Point], ts: &mut Vec<CoordF>) {
    let n = ring.len();
    if n < 2 {
        return;
    }
    let d = b - a;
    for i in 0..n {
        let p = ring[i];
        let q = ring[(i + 1) % n];
        let e = q - p;
        let denom = d.cross(&e);
        if denom == 0 {
            continue; // parallel
        }
        let ap = p - a;
        let t = ap.cross(&e) as CoordF / denom as CoordF;
        let u = ap.cross(&d) as CoordF / denom as CoordF;
        if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
            ts.push(t);
        }
    }
}

fn point_in_expolygons(pt: Point, expolygons: &[ExPolygon]) -> bool {
    for expoly in expolygons {
        if expoly.outer.contains_point(&pt) && !expoly.holes.iter().any(|h| h.contains_point(&pt)) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SCALING_FACTOR;

    fn square_mm(x: f64, y: f64, size: f64) -> ExPolygon {
        Polygon::rectangle(
            Point::new_scale(x, y),
            Point::new_scale(x + size, y + size),
            0.0,
        )
        .into()
    }

    fn area_mm2(expolys: &[ExPolygon]) -> f64 {
        total_area(expolys) / (SCALING_FACTOR * SCALING_FACTOR)
    }

    #[test]
    fn test_union_overlapping_squares() {
        let result = union(&[square_mm(0.0, 0.0, 10.0)], &[square_mm(5.0, 0.0, 10.0)]);
        assert_eq!(result.len(), 1);
        assert!((area_mm2(&result) - 150.0).abs() < 0.5);
    }

    #[test]
    fn test_intersection_no_overlap() {
        let result = intersection(&[square_mm(0.0, 0.0, 10.0)], &[square_mm(20.0, 0.0, 10.0)]);
        assert!(result.is_empty() || area_mm2(&result) < 1e-6);
    }

    #[test]
    fn test_difference_creates_hole() {
        let result = difference(&[square_mm(0.0, 0.0, 20.0)], &[square_mm(5.0, 5.0, 10.0)]);
        assert!((area_mm2(&result) - 300.0).abs() < 0.5);
        assert!(result.iter().any(|e| !e.holes.is_empty()));
    }

    #[test]
    fn test_offset_shrink_to_nothing() {
        let shrunk = offset_expolygons(&[square_mm(0.0, 0.0, 2.0)], -2.0, OffsetJoinType::Miter);
        assert!(shrunk.is_empty() || area_mm2(&shrunk) < 1e-6);
    }

    #[test]
    fn test_erode_dilate_roundtrip_convex() {
        let original = square_mm(0.0, 0.0, 10.0);
        let eroded = offset_expolygons(&[original.clone()], -0.5, OffsetJoinType::Miter);
        let restored = offset_expolygons(&eroded, 0.5, OffsetJoinType::Miter);
        assert!((area_mm2(&restored) - 100.0).abs() < 0.1);
        // the round trip neither loses nor gains area anywhere
        let lost = difference(&[original.clone()], &restored);
        let gained = difference(&restored, &[original]);
        assert!(area_mm2(&lost) < 0.1);
        assert!(area_mm2(&gained) < 0.1);
    }

    #[test]
    fn test_offset_preserves_z() {
        let mut sq = square_mm(0.0, 0.0, 10.0);
        sq.set_z(1.25);
        let grown = offset_expolygons(&[sq], 1.0, OffsetJoinType::Round);
        assert!(!grown.is_empty());
        assert!((grown[0].outer.z() - 1.25).abs() < 1e-12);
    }

    #[test]
    fn test_merge_polygons_pairs_holes() {
        let outer = Polygon::rectangle(Point::new_scale(0.0, 0.0), Point::new_scale(20.0, 20.0), 0.0);
        let mut hole =
            Polygon::rectangle(Point::new_scale(5.0, 5.0), Point::new_scale(15.0, 15.0), 0.0);
        hole.reverse();
        let merged = merge_polygons(&[outer, hole]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].holes.len(), 1);
        assert!((area_mm2(&merged) - 300.0).abs() < 0.5);
    }

    #[test]
    fn test_clip_segments_through_hole() {
        let outer = Polygon::rectangle(Point::new_scale(0.0, 0.0), Point::new_scale(20.0, 20.0), 0.0);
        let mut hole =
            Polygon::rectangle(Point::new_scale(8.0, 8.0), Point::new_scale(12.0, 12.0), 0.0);
        hole.reverse();
        let clip = vec![ExPolygon::with_holes(outer, vec![hole])];

        // Horizontal line through the middle splits into two pieces.
        let segs = clip_segments(
            &[(Point::new_scale(-5.0, 10.0), Point::new_scale(25.0, 10.0))],
            &clip,
        );
        assert_eq!(segs.len(), 2);
        let total: f64 = segs.iter().map(|(a, b)| a.distance(b)).sum::<f64>() / SCALING_FACTOR;
        assert!((total - 16.0).abs() < 0.01);
    }
}
