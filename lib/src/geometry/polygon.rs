//! Closed polygons and polygons-with-holes.
//!
//! A [`Polygon`] is an ordered, cyclic vertex list tagged with the Z height
//! of the slice it came from. Orientation encodes solidity: counter-clockwise
//! (positive signed area) is solid material, clockwise is a hole.

use super::{BoundingBox, Point};
use crate::{Coord, CoordF, SCALING_FACTOR};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A closed 2D polygon tagged with a Z height.
///
/// The closing edge from the last vertex back to the first is implicit.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    points: Vec<Point>,
    z: CoordF,
}

/// A collection of polygons.
pub type Polygons = Vec<Polygon>;

impl Polygon {
    #[inline]
    pub fn new(z: CoordF) -> Self {
        Self {
            points: Vec::new(),
            z,
        }
    }

    #[inline]
    pub fn from_points(points: Vec<Point>, z: CoordF) -> Self {
        Self { points, z }
    }

    /// Axis-aligned rectangle, counter-clockwise.
    pub fn rectangle(min: Point, max: Point, z: CoordF) -> Self {
        Self {
            points: vec![
                min,
                Point::new(max.x, min.y),
                max,
                Point::new(min.x, max.y),
            ],
            z,
        }
    }

    #[inline]
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn push(&mut self, p: Point) {
        self.points.push(p);
    }

    #[inline]
    pub fn z(&self) -> CoordF {
        self.z
    }

    #[inline]
    pub fn set_z(&mut self, z: CoordF) {
        self.z = z;
    }

    /// Vertex at `index`, wrapping around the end.
    #[inline]
    pub fn point_circular(&self, index: usize) -> Point {
        self.points[index % self.points.len()]
    }

    /// Twice-signed area is accumulated in i128; the result is in scaled
    /// units squared. Positive for counter-clockwise winding.
    pub fn signed_area(&self) -> CoordF {
        if self.points.len() < 3 {
            return 0.0;
        }
        let mut acc: i128 = 0;
        for i in 0..self.points.len() {
            let a = self.points[i];
            let b = self.point_circular(i + 1);
            acc += a.cross(&b);
        }
        acc as CoordF / 2.0
    }

    /// Absolute area in scaled units squared.
    #[inline]
    pub fn area(&self) -> CoordF {
        self.signed_area().abs()
    }

    /// Absolute area in mm².
    #[inline]
    pub fn area_mm2(&self) -> CoordF {
        self.area() / (SCALING_FACTOR * SCALING_FACTOR)
    }

    /// A polygon is a hole when its winding is clockwise.
    #[inline]
    pub fn is_hole(&self) -> bool {
        self.signed_area() < 0.0
    }

    #[inline]
    pub fn reverse(&mut self) {
        self.points.reverse();
    }

    pub fn make_counter_clockwise(&mut self) {
        if self.is_hole() {
            self.reverse();
        }
    }

    /// Arithmetic mean of the vertices.
    pub fn centroid(&self) -> Point {
        if self.points.is_empty() {
            return Point::zero();
        }
        let mut sx: i128 = 0;
        let mut sy: i128 = 0;
        for p in &self.points {
            sx += p.x as i128;
            sy += p.y as i128;
        }
        let n = self.points.len() as i128;
        Point::new((sx / n) as Coord, (sy / n) as Coord)
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let mut bb = BoundingBox::new();
        for p in &self.points {
            bb.merge_point(*p);
        }
        bb
    }

    /// Ray-casting point containment, boundary counts as inside.
    pub fn contains_point(&self, p: &Point) -> bool {
        let n = self.points.len();
        if n < 3 {
            return false;
        }
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let pi = self.points[i];
            let pj = self.points[j];
            if (pi.y > p.y) != (pj.y > p.y) {
                let dy = (pj.y - pi.y) as i128;
                // cross-multiplied comparison to stay in integers
                let lhs = (p.x - pi.x) as i128 * dy;
                let rhs = (pj.x - pi.x) as i128 * (p.y - pi.y) as i128;
                if (dy > 0 && lhs < rhs) || (dy < 0 && lhs > rhs) {
                    inside = !inside;
                }
            }
            j = i;
        }
        inside
    }

    pub fn translate(&mut self, v: Point) {
        for p in &mut self.points {
            *p += v;
        }
    }

    pub fn rotate_around(&mut self, angle: CoordF, center: Point) {
        for p in &mut self.points {
            *p = p.rotate_around(angle, center);
        }
    }

    /// Remove vertices that deviate from the line through their neighbours
    /// by less than `tolerance` (scaled units), and collapse edges shorter
    /// than it. Never reduces the polygon below a triangle.
    pub fn cleanup(&mut self, tolerance: Coord) {
        if self.points.len() <= 3 || tolerance <= 0 {
            return;
        }
        let tol_sq = tolerance as i128 * tolerance as i128;
        loop {
            let n = self.points.len();
            if n <= 3 {
                break;
            }
            let mut removed = false;
            let mut kept: Vec<Point> = Vec::with_capacity(n);
            let mut i = 0;
            while i < n {
                let prev = if let Some(last) = kept.last() {
                    *last
                } else {
                    self.points[n - 1]
                };
                let cur = self.points[i];
                let next = self.points[(i + 1) % n];
                if cur.distance_squared(&prev) < tol_sq
                    || point_segment_distance_sq(cur, prev, next) < tol_sq as CoordF
                {
                    removed = true;
                } else {
                    kept.push(cur);
                }
                i += 1;
            }
            if kept.len() < 3 || !removed {
                break;
            }
            self.points = kept;
        }
    }
}

/// Squared distance of `p` to segment `a`..`b`, in scaled units squared.
fn point_segment_distance_sq(p: Point, a: Point, b: Point) -> CoordF {
    let ab = b - a;
    let len_sq = ab.dot(&ab) as CoordF;
    if len_sq <= 0.0 {
        return p.distance_squared(&a) as CoordF;
    }
    let t = ((p - a).dot(&ab) as CoordF / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(
        a.x + (ab.x as CoordF * t).round() as Coord,
        a.y + (ab.y as CoordF * t).round() as Coord,
    );
    p.distance_squared(&proj) as CoordF
}

impl fmt::Debug for Polygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Polygon({} pts, z={:.3}, {})",
            self.points.len(),
            self.z,
            if self.is_hole() { "hole" } else { "solid" }
        )
    }
}

/// One outer contour paired with the holes it encloses.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExPolygon {
    /// The outer boundary (counter-clockwise).
    pub outer: Polygon,
    /// Interior holes (clockwise).
    pub holes: Vec<Polygon>,
}

/// A collection of polygons-with-holes.
pub type ExPolygons = Vec<ExPolygon>;

impl ExPolygon {
    #[inline]
    pub fn new(outer: Polygon) -> Self {
        Self {
            outer,
            holes: Vec::new(),
        }
    }

    #[inline]
    pub fn with_holes(outer: Polygon, holes: Vec<Polygon>) -> Self {
        Self { outer, holes }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.outer.is_empty()
    }

    /// Outer area minus hole areas (scaled units squared).
    pub fn area(&self) -> CoordF {
        self.outer.area() - self.holes.iter().map(|h| h.area()).sum::<CoordF>()
    }

    #[inline]
    pub fn set_z(&mut self, z: CoordF) {
        self.outer.set_z(z);
        for h in &mut self.holes {
            h.set_z(z);
        }
    }

    /// Flatten to a plain polygon list; holes keep their clockwise winding.
    pub fn to_polygons(&self) -> Polygons {
        let mut out = Vec::with_capacity(1 + self.holes.len());
        out.push(self.outer.clone());
        out.extend(self.holes.iter().cloned());
        out
    }
}

impl From<Polygon> for ExPolygon {
    fn from(p: Polygon) -> Self {
        ExPolygon::new(p)
    }
}

impl fmt::Debug for ExPolygon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ExPolygon({} pts, {} holes)",
            self.outer.len(),
            self.holes.len()
        )
    }
}
