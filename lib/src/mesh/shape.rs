//! A triangle mesh with its placement transform.

use super::Triangle;
use crate::geometry::{BoundingBox3F, Point3F, Transform3D};
use crate::CoordF;
use log::debug;
use serde::{Deserialize, Serialize};

/// One independent solid: an owned triangle list, a mutable placement
/// transform, and the derived world-space bounding box.
///
/// The transform is applied at slice time, never baked into the stored
/// vertices. Triangle data is replace/append-only.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Shape {
    triangles: Vec<Triangle>,
    transform: Transform3D,
    bbox: BoundingBox3F,
}

impl Shape {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the triangle list. If the mesh's signed volume comes out
    /// negative the normals point inward and the whole mesh is inverted.
    pub fn set_triangles(&mut self, triangles: Vec<Triangle>) {
        self.triangles = triangles;
        if self.volume() < 0.0 {
            debug!("negative mesh volume, inverting normals");
            self.invert_normals();
        }
        self.recalc_bbox();
    }

    /// Append triangles without the volume check.
    pub fn add_triangles(&mut self, triangles: &[Triangle]) {
        self.triangles.extend_from_slice(triangles);
        self.recalc_bbox();
    }

    #[inline]
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    #[inline]
    pub fn transform(&self) -> &Transform3D {
        &self.transform
    }

    pub fn set_transform(&mut self, t: Transform3D) {
        self.transform = t;
        self.recalc_bbox();
    }

    #[inline]
    pub fn bounding_box(&self) -> &BoundingBox3F {
        &self.bbox
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    fn recalc_bbox(&mut self) {
        let mut bb = BoundingBox3F::new();
        for tri in &self.triangles {
            for v in tri.vertices() {
                bb.merge_point(self.transform.apply(v));
            }
        }
        self.bbox = bb;
    }

    /// Signed enclosed volume in mm³ under the current transform.
    pub fn volume(&self) -> CoordF {
        self.triangles
            .iter()
            .map(|t| t.projected_volume(&self.transform))
            .sum()
    }

    pub fn invert_normals(&mut self) {
        for tri in &mut self.triangles {
            tri.invert_normal();
        }
    }

    /// Flip every triangle whose winding disagrees with the majority of its
    /// edge-sharing neighbours. Returns the number of triangles flipped.
    pub fn repair_normals(&mut self, sq_tolerance: CoordF) -> usize {
        let n = self.triangles.len();
        let mut flip = Vec::new();
        for i in 0..n {
            let mut agree = 0usize;
            let mut disagree = 0usize;
            for j in 0..n {
                if i == j || !self.triangles[i].shares_edge_with(&self.triangles[j], sq_tolerance)
                {
                    continue;
                }
                if self.triangles[i].wrong_orientation_with(&self.triangles[j], sq_tolerance) {
                    disagree += 1;
                } else {
                    agree += 1;
                }
            }
            if disagree > agree {
                flip.push(i);
            }
        }
        for &i in &flip {
            self.triangles[i].invert_normal();
        }
        if !flip.is_empty() {
            debug!("repaired {} inverted facet normals", flip.len());
        }
        flip.len()
    }

    /// Triangles (world space) whose downward-facing slope exceeds `angle`
    /// radians from vertical, the candidates needing support.
    pub fn triangles_steeper_than(&self, angle: CoordF) -> Vec<Triangle> {
        self.triangles
            .iter()
            .filter(|t| t.slope_angle(&self.transform) < -angle)
            .map(|t| t.transformed(&self.transform))
            .collect()
    }

    // Transform mutators. The triangle data never moves.

    pub fn translate(&mut self, v: Point3F) {
        self.transform = Transform3D::translation(v) * self.transform;
        self.recalc_bbox();
    }

    pub fn rotate_z(&mut self, angle: CoordF) {
        self.transform = Transform3D::rotation_z(angle) * self.transform;
        self.recalc_bbox();
    }

    pub fn scale(&mut self, factor: CoordF) {
        self.transform = Transform3D::scaling(factor) * self.transform;
        self.recalc_bbox();
    }

    /// Drop the shape onto the Z=0 platform.
    pub fn place_on_platform(&mut self) {
        if self.bbox.is_defined() {
            self.translate(Point3F::new(0.0, 0.0, -self.bbox.min.z));
        }
    }

    /// One-line human-readable summary.
    pub fn info(&self) -> String {
        let size = self.bbox.size();
        format!(
            "{} triangles, {:.1} x {:.1} x {:.1} mm, volume {:.1} mm3",
            self.triangles.len(),
            size.x,
            size.y,
            size.z,
            self.volume()
        )
    }

    /// Axis-aligned cube of the given edge length with one corner at the
    /// origin. Test fixture and demo object.
    pub fn cube(size: CoordF) -> Shape {
        let s = size;
        let v = |x: CoordF, y: CoordF, z: CoordF| Point3F::new(x, y, z);
        let quads: [[Point3F; 4]; 6] = [
            // bottom (normal -z)
            [v(0.0, 0.0, 0.0), v(0.0, s, 0.0), v(s, s, 0.0), v(s, 0.0, 0.0)],
            // top (normal +z)
            [v(0.0, 0.0, s), v(s, 0.0, s), v(s, s, s), v(0.0, s, s)],
            // front (normal -y)
            [v(0.0, 0.0, 0.0), v(s, 0.0, 0.0), v(s, 0.0, s), v(0.0, 0.0, s)],
            // back (normal +y)
            [v(0.0, s, 0.0), v(0.0, s, s), v(s, s, s), v(s, s, 0.0)],
            // left (normal -x)
            [v(0.0, 0.0, 0.0), v(0.0, 0.0, s), v(0.0, s, s), v(0.0, s, 0.0)],
            // right (normal +x)
            [v(s, 0.0, 0.0), v(s, s, 0.0), v(s, s, s), v(s, 0.0, s)],
        ];
        let mut triangles = Vec::with_capacity(12);
        for q in quads {
            triangles.push(Triangle::new(q[0], q[1], q[2]));
            triangles.push(Triangle::new(q[0], q[2], q[3]));
        }
        let mut shape = Shape::new();
        shape.set_triangles(triangles);
        shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_volume() {
        let cube = Shape::cube(10.0);
        assert_eq!(cube.triangles().len(), 12);
        assert!((cube.volume() - 1000.0).abs() < 1e-6);
    }

    #[test]
    fn test_set_triangles_auto_inverts() {
        let cube = Shape::cube(10.0);
        let mut inverted: Vec<Triangle> = cube.triangles().to_vec();
        for t in &mut inverted {
            t.invert_normal();
        }
        let mut shape = Shape::new();
        shape.set_triangles(inverted);
        // volume must come out positive after auto-inversion
        assert!(shape.volume() > 0.0);
    }

    #[test]
    fn test_repair_normals_fixes_single_facet() {
        let mut cube = Shape::cube(10.0);
        let before = cube.volume();
        let mut tris = cube.triangles().to_vec();
        tris[0].invert_normal();
        let mut broken = Shape::new();
        broken.add_triangles(&tris);
        let flipped = broken.repair_normals(1e-8);
        assert_eq!(flipped, 1);
        assert!((broken.volume() - before).abs() < 1e-6);
    }

    #[test]
    fn test_place_on_platform() {
        let mut cube = Shape::cube(10.0);
        cube.translate(Point3F::new(0.0, 0.0, 7.5));
        assert!((cube.bounding_box().min.z - 7.5).abs() < 1e-9);
        cube.place_on_platform();
        assert!(cube.bounding_box().min.z.abs() < 1e-9);
    }

    #[test]
    fn test_scale_scales_volume() {
        let mut cube = Shape::cube(10.0);
        cube.scale(2.0);
        assert!((cube.volume() - 8000.0).abs() < 1e-3);
    }

    #[test]
    fn test_steep_triangles_of_cube() {
        let cube = Shape::cube(10.0);
        // only the two bottom facets face straight down
        let steep = cube.triangles_steeper_than(std::f64::consts::FRAC_PI_4);
        assert_eq!(steep.len(), 2);
        for t in steep {
            assert!(t.normal.z < 0.0);
        }
    }
}
