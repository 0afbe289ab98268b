//! Geometric primitives used throughout the slicing pipeline.
//!
//! 2D polygon coordinates are scaled integers (see [`crate::scale`]); mesh
//! vertices and transforms stay in floating-point millimeters.

mod bounding_box;
mod hull;
mod point;
mod polygon;
mod transform;

pub use bounding_box::{BoundingBox, BoundingBox3F};
pub use hull::convex_hull;
pub use point::{Point, Point3F, PointF};
pub use polygon::{ExPolygon, ExPolygons, Polygon, Polygons};
pub use transform::Transform3D;
