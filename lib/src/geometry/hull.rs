//! Convex hull construction (Andrew's monotone chain).

use super::{Point, Polygon};
use crate::CoordF;

/// Convex hull of a point set, returned counter-clockwise.
///
/// Collinear points on the hull boundary are dropped. Degenerate inputs
/// (fewer than three distinct points) yield what is representable: the
/// points themselves.
pub fn convex_hull(points: &[Point], z: CoordF) -> Polygon {
    let mut pts: Vec<Point> = points.to_vec();
    pts.sort_by(|a, b| a.x.cmp(&b.x).then(a.y.cmp(&b.y)));
    pts.dedup();

    if pts.len() < 3 {
        return Polygon::from_points(pts, z);
    }

    let cross = |o: Point, a: Point, b: Point| -> i128 { (a - o).cross(&(b - o)) };

    let mut lower: Vec<Point> = Vec::with_capacity(pts.len());
    for &p in &pts {
        while lower.len() >= 2 && cross(lower[lower.len() - 2], lower[lower.len() - 1], p) <= 0 {
            lower.pop();
        }
        lower.push(p);
    }

    let mut upper: Vec<Point> = Vec::with_capacity(pts.len());
    for &p in pts.iter().rev() {
        while upper.len() >= 2 && cross(upper[upper.len() - 2], upper[upper.len() - 1], p) <= 0 {
            upper.pop();
        }
        upper.push(p);
    }

    // The last point of each chain duplicates the first of the other.
    lower.pop();
    upper.pop();
    lower.extend(upper);

    Polygon::from_points(lower, z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hull_of_square_with_interior_points() {
        let pts = vec![
            Point::new_scale(0.0, 0.0),
            Point::new_scale(10.0, 0.0),
            Point::new_scale(10.0, 10.0),
            Point::new_scale(0.0, 10.0),
            Point::new_scale(5.0, 5.0),
            Point::new_scale(2.0, 7.0),
        ];
        let hull = convex_hull(&pts, 0.2);
        assert_eq!(hull.len(), 4);
        assert!(!hull.is_hole());
        assert!((hull.area_mm2() - 100.0).abs() < 1e-6);
        assert!((hull.z() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_hull_drops_collinear() {
        let pts = vec![
            Point::new_scale(0.0, 0.0),
            Point::new_scale(5.0, 0.0),
            Point::new_scale(10.0, 0.0),
            Point::new_scale(5.0, 5.0),
        ];
        let hull = convex_hull(&pts, 0.0);
        assert_eq!(hull.len(), 3);
    }

    #[test]
    fn test_hull_degenerate() {
        let pts = vec![Point::new(0, 0), Point::new(100, 100)];
        let hull = convex_hull(&pts, 0.0);
        assert_eq!(hull.len(), 2);
    }
}
