//! Splitting a mesh into connected components.

use super::Shape;
use crate::{CancelToken, Result};
use log::debug;
use rayon::prelude::*;

/// How often the flood fill polls for cancellation.
const CANCEL_POLL_INTERVAL: usize = 1024;

/// Split a shape into its connected solids.
///
/// Two triangles belong to the same component when they share a vertex
/// within `sq_tolerance` (mm²), transitively. The adjacency lists are
/// computed data-parallel per triangle; the flood fill itself runs on an
/// explicit worklist so component size never translates into stack depth.
///
/// Each component becomes an independent [`Shape`] carrying the parent's
/// transform. A shape that is already one component comes back as a
/// single-element vector.
pub fn split_shapes(shape: &Shape, sq_tolerance: f64, cancel: &CancelToken) -> Result<Vec<Shape>> {
    let triangles = shape.triangles();
    let n = triangles.len();
    if n == 0 {
        return Ok(vec![]);
    }

    // Adjacency per triangle. Quadratic, but each row is independent.
    // A cancelled row comes back empty; the check below discards the lot.
    let adjacency: Vec<Vec<usize>> = (0..n)
        .into_par_iter()
        .map(|i| {
            if cancel.is_cancelled() {
                return Vec::new();
            }
            (0..n)
                .filter(|&j| j != i && triangles[i].is_connected_to(&triangles[j], sq_tolerance))
                .collect()
        })
        .collect();

    cancel.check()?;

    let mut component = vec![usize::MAX; n];
    let mut component_count = 0usize;
    let mut worklist: Vec<usize> = Vec::new();
    let mut processed = 0usize;

    for seed in 0..n {
        if component[seed] != usize::MAX {
            continue;
        }
        worklist.push(seed);
        component[seed] = component_count;
        while let Some(idx) = worklist.pop() {
            processed += 1;
            if processed % CANCEL_POLL_INTERVAL == 0 {
                cancel.check()?;
            }
            for &next in &adjacency[idx] {
                if component[next] == usize::MAX {
                    component[next] = component_count;
                    worklist.push(next);
                }
            }
        }
        component_count += 1;
    }

    let mut buckets: Vec<Vec<super::Triangle>> = vec![Vec::new(); component_count];
    for (i, &comp) in component.iter().enumerate() {
        buckets[comp].push(triangles[i]);
    }

    debug!("split {} triangles into {} components", n, component_count);

    Ok(buckets
        .into_iter()
        .map(|tris| {
            let mut s = Shape::new();
            s.set_transform(*shape.transform());
            s.set_triangles(tris);
            s
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point3F;

    #[test]
    fn test_single_solid_is_one_component() {
        let cube = Shape::cube(10.0);
        let parts = split_shapes(&cube, 1e-8, &CancelToken::new()).unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].triangles().len(), 12);
    }

    #[test]
    fn test_two_disjoint_solids_split() {
        let mut combined = Shape::cube(10.0);
        let mut far = Shape::cube(5.0);
        far.translate(Point3F::new(100.0, 0.0, 0.0));
        let moved: Vec<_> = far
            .triangles()
            .iter()
            .map(|t| t.transformed(far.transform()))
            .collect();
        combined.add_triangles(&moved);

        let parts = split_shapes(&combined, 1e-8, &CancelToken::new()).unwrap();
        assert_eq!(parts.len(), 2);
        let mut sizes: Vec<usize> = parts.iter().map(|p| p.triangles().len()).collect();
        sizes.sort();
        assert_eq!(sizes, vec![12, 12]);
    }

    #[test]
    fn test_cancellation_aborts() {
        let cube = Shape::cube(10.0);
        let cancel = CancelToken::new();
        cancel.cancel();
        assert!(matches!(
            split_shapes(&cube, 1e-8, &cancel),
            Err(crate::Error::Cancelled)
        ));
    }
}
