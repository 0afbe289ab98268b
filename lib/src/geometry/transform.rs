//! 3D affine transforms for placing meshes in build-platform space.

use super::Point3F;
use crate::CoordF;
use serde::{Deserialize, Serialize};
use std::ops::Mul;

/// A 3D affine transform stored as a row-major 4x4 matrix.
///
/// The bottom row is kept at `[0, 0, 0, 1]`; only rotation, scaling and
/// translation are representable.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform3D {
    m: [[CoordF; 4]; 4],
}

impl Default for Transform3D {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform3D {
    pub fn identity() -> Self {
        let mut m = [[0.0; 4]; 4];
        for (i, row) in m.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        Self { m }
    }

    pub fn translation(v: Point3F) -> Self {
        let mut t = Self::identity();
        t.m[0][3] = v.x;
        t.m[1][3] = v.y;
        t.m[2][3] = v.z;
        t
    }

    pub fn scaling(factor: CoordF) -> Self {
        let mut t = Self::identity();
        t.m[0][0] = factor;
        t.m[1][1] = factor;
        t.m[2][2] = factor;
        t
    }

    /// Rotation about the Z axis by `angle` radians.
    pub fn rotation_z(angle: CoordF) -> Self {
        let (s, c) = angle.sin_cos();
        let mut t = Self::identity();
        t.m[0][0] = c;
        t.m[0][1] = -s;
        t.m[1][0] = s;
        t.m[1][1] = c;
        t
    }

    /// Apply to a point (translation included).
    pub fn apply(&self, p: Point3F) -> Point3F {
        Point3F::new(
            self.m[0][0] * p.x + self.m[0][1] * p.y + self.m[0][2] * p.z + self.m[0][3],
            self.m[1][0] * p.x + self.m[1][1] * p.y + self.m[1][2] * p.z + self.m[1][3],
            self.m[2][0] * p.x + self.m[2][1] * p.y + self.m[2][2] * p.z + self.m[2][3],
        )
    }

    /// Apply to a direction vector (translation ignored).
    pub fn apply_vector(&self, v: Point3F) -> Point3F {
        Point3F::new(
            self.m[0][0] * v.x + self.m[0][1] * v.y + self.m[0][2] * v.z,
            self.m[1][0] * v.x + self.m[1][1] * v.y + self.m[1][2] * v.z,
            self.m[2][0] * v.x + self.m[2][1] * v.y + self.m[2][2] * v.z,
        )
    }

}

impl Mul for Transform3D {
    type Output = Transform3D;

    fn mul(self, rhs: Transform3D) -> Transform3D {
        let mut m = [[0.0; 4]; 4];
        for (i, row) in m.iter_mut().enumerate() {
            for (j, cell) in row.iter_mut().enumerate() {
                *cell = (0..4).map(|k| self.m[i][k] * rhs.m[k][j]).sum();
            }
        }
        Transform3D { m }
    }
}
