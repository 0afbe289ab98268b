//! Mesh triangles and their slicing-related queries.

use crate::geometry::{PointF, Point3F, Transform3D};
use crate::CoordF;
use serde::{Deserialize, Serialize};

/// One mesh facet: three vertices and an outward normal.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Triangle {
    pub a: Point3F,
    pub b: Point3F,
    pub c: Point3F,
    pub normal: Point3F,
}

impl Triangle {
    /// Build a triangle, deriving the normal from the vertex winding.
    pub fn new(a: Point3F, b: Point3F, c: Point3F) -> Self {
        let normal = (b - a).cross(&(c - a)).normalized();
        Self { a, b, c, normal }
    }

    /// Build a triangle with an explicitly supplied normal.
    pub fn with_normal(a: Point3F, b: Point3F, c: Point3F, normal: Point3F) -> Self {
        Self { a, b, c, normal }
    }

    #[inline]
    pub fn vertices(&self) -> [Point3F; 3] {
        [self.a, self.b, self.c]
    }

    /// Apply a transform to the vertices; the normal is re-derived so that
    /// mirroring transforms keep it consistent with the winding.
    pub fn transformed(&self, t: &Transform3D) -> Triangle {
        Triangle::new(t.apply(self.a), t.apply(self.b), t.apply(self.c))
    }

    /// Flip the winding and the stored normal.
    pub fn invert_normal(&mut self) {
        std::mem::swap(&mut self.b, &mut self.c);
        self.normal = -self.normal;
    }

    pub fn area(&self) -> CoordF {
        0.5 * (self.b - self.a).cross(&(self.c - self.a)).length()
    }

    /// Signed volume of the prism between this triangle (transformed) and
    /// the Z=0 plane. Summed over a closed mesh this gives the enclosed
    /// volume, negative when the normals point inward.
    pub fn projected_volume(&self, t: &Transform3D) -> CoordF {
        let a = t.apply(self.a);
        let b = t.apply(self.b);
        let c = t.apply(self.c);
        let projected_area =
            0.5 * ((b.x - a.x) * (c.y - a.y) - (c.x - a.x) * (b.y - a.y));
        projected_area * (a.z + b.z + c.z) / 3.0
    }

    /// Angle of the transformed facet normal against the XY plane, radians.
    /// Negative means the facet faces downward.
    pub fn slope_angle(&self, t: &Transform3D) -> CoordF {
        let n = t.apply_vector(self.normal).normalized();
        n.z.clamp(-1.0, 1.0).asin()
    }

    /// True if any vertex of `self` lies within `sq_tolerance` (mm²) of a
    /// vertex of `other`.
    pub fn is_connected_to(&self, other: &Triangle, sq_tolerance: CoordF) -> bool {
        for va in self.vertices() {
            for vb in other.vertices() {
                if (va - vb).length_squared() < sq_tolerance {
                    return true;
                }
            }
        }
        false
    }

    /// Z extent of the transformed triangle.
    pub fn z_range(&self, t: &Transform3D) -> (CoordF, CoordF) {
        let zs = [t.apply(self.a).z, t.apply(self.b).z, t.apply(self.c).z];
        let min = zs.iter().cloned().fold(CoordF::MAX, CoordF::min);
        let max = zs.iter().cloned().fold(CoordF::MIN, CoordF::max);
        (min, max)
    }

    /// True if the transformed Z extent overlaps `[z0, z1]`.
    pub fn is_in_z_range(&self, z0: CoordF, z1: CoordF, t: &Transform3D) -> bool {
        let (min, max) = self.z_range(t);
        min <= z1 && max >= z0
    }

    /// Intersect the transformed triangle with the plane at `z`.
    ///
    /// Returns 0, 1 or 2 distinct points in mm. Two points form one segment
    /// of the cross-section; fewer mean the plane only grazes a vertex or
    /// misses entirely.
    pub fn cut_with_plane(&self, z: CoordF, t: &Transform3D) -> Vec<PointF> {
        let verts = [t.apply(self.a), t.apply(self.b), t.apply(self.c)];
        let mut points: Vec<PointF> = Vec::with_capacity(2);

        for i in 0..3 {
            let p1 = verts[i];
            let p2 = verts[(i + 1) % 3];
            if (p1.z <= z && p2.z >= z) || (p1.z >= z && p2.z <= z) {
                let dz = p2.z - p1.z;
                if dz.abs() < 1e-12 {
                    continue; // edge lies in the plane, its neighbours produce the points
                }
                let frac = (z - p1.z) / dz;
                let hit = PointF::new(p1.x + (p2.x - p1.x) * frac, p1.y + (p2.y - p1.y) * frac);
                if !points
                    .iter()
                    .any(|p| p.distance_squared(&hit) < 1e-16)
                {
                    points.push(hit);
                }
            }
        }
        points.truncate(2);
        points
    }

    /// True if the two triangles share an edge (vertices matching within
    /// `sq_tolerance`) and traverse it in the same direction, which means
    /// their windings disagree.
    pub fn wrong_orientation_with(&self, other: &Triangle, sq_tolerance: CoordF) -> bool {
        let mine = self.vertices();
        let theirs = other.vertices();
        for i in 0..3 {
            let (a1, a2) = (mine[i], mine[(i + 1) % 3]);
            for j in 0..3 {
                let (b1, b2) = (theirs[j], theirs[(j + 1) % 3]);
                // consistent winding traverses a shared edge in opposite directions
                if (a1 - b1).length_squared() < sq_tolerance
                    && (a2 - b2).length_squared() < sq_tolerance
                {
                    return true;
                }
            }
        }
        false
    }

    /// True if the two triangles share an edge, in either direction.
    pub fn shares_edge_with(&self, other: &Triangle, sq_tolerance: CoordF) -> bool {
        let mine = self.vertices();
        let theirs = other.vertices();
        let mut matches = 0;
        for va in mine {
            if theirs
                .iter()
                .any(|vb| (va - *vb).length_squared() < sq_tolerance)
            {
                matches += 1;
            }
        }
        matches >= 2
    }
}
