//! Cross-section extraction: triangle mesh + cutting plane → closed polygons.
//!
//! Triangle/plane intersections arrive as unordered, floating-point-noisy
//! segments. Recovering topologically valid loops takes four passes:
//! vertex-deduplicated segment collection, shared-segment removal, dangling
//! endpoint reconnection, and greedy chaining. Reconnection can fail on
//! genuinely broken meshes; the layer builder handles that by retrying at a
//! slightly perturbed Z.

use crate::config::SliceSettings;
use crate::geometry::{Point, PointF, Polygon, Polygons};
use crate::mesh::Shape;
use crate::{scale, unscale, CancelToken, CoordF, Error, Result, SCALING_FACTOR};
use log::warn;
use std::collections::{HashMap, HashSet};

/// How often the stitching loops poll for cancellation.
const CANCEL_POLL_INTERVAL: usize = 4096;

/// One directed triangle/plane intersection. Indices into the per-slice
/// vertex pool; solid material lies to the left of start→end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Segment {
    start: usize,
    end: usize,
}

/// Per-slice vertex pool with a quantized spatial grid for deduplication.
struct VertexPool {
    vertices: Vec<Point>,
    grid: HashMap<(i64, i64), Vec<usize>>,
    cell: i64,
    tol_sq: i128,
}

impl VertexPool {
    fn new(merge_tolerance_sq_mm: CoordF) -> Self {
        let tol_mm = merge_tolerance_sq_mm.sqrt();
        // cell edge at least one tolerance radius, so a 3x3 neighbourhood
        // always covers the merge ball
        let cell = scale(tol_mm).max(1);
        let tol_scaled = merge_tolerance_sq_mm * SCALING_FACTOR * SCALING_FACTOR;
        Self {
            vertices: Vec::new(),
            grid: HashMap::new(),
            cell,
            tol_sq: tol_scaled as i128,
        }
    }

    /// Index of an existing vertex within tolerance, or a fresh one.
    fn insert(&mut self, p: Point) -> usize {
        let cx = p.x.div_euclid(self.cell);
        let cy = p.y.div_euclid(self.cell);
        for dx in -1..=1 {
            for dy in -1..=1 {
                if let Some(bucket) = self.grid.get(&(cx + dx, cy + dy)) {
                    for &idx in bucket {
                        if self.vertices[idx].distance_squared(&p) < self.tol_sq {
                            return idx;
                        }
                    }
                }
            }
        }
        let idx = self.vertices.len();
        self.vertices.push(p);
        self.grid.entry((cx, cy)).or_default().push(idx);
        idx
    }
}

/// Closed cross-section polygons of `shape` at height `z`.
///
/// Fails with [`Error::Reconstruction`] when the segment soup cannot be
/// stitched into closed loops; callers retry at a perturbed Z.
pub fn cross_section_at_z(
    shape: &Shape,
    z: CoordF,
    settings: &SliceSettings,
    cancel: &CancelToken,
) -> Result<Polygons> {
    let (pool, segments) = collect_segments(shape, z, settings, cancel)?;
    if segments.is_empty() {
        return Ok(vec![]);
    }
    let segments = cleanup_shared_segments(segments);
    let segments = cleanup_connect_segments(&pool.vertices, segments, settings)?;
    chain_segments(&pool.vertices, &segments, z, cancel)
}

/// Intersect every triangle with the plane and pool the endpoints.
fn collect_segments(
    shape: &Shape,
    z: CoordF,
    settings: &SliceSettings,
    cancel: &CancelToken,
) -> Result<(VertexPool, Vec<Segment>)> {
    let mut pool = VertexPool::new(settings.point_merge_tolerance_sq);
    let mut segments = Vec::new();
    let transform = shape.transform();

    for (i, triangle) in shape.triangles().iter().enumerate() {
        if i % CANCEL_POLL_INTERVAL == 0 {
            cancel.check()?;
        }
        let cut = triangle.cut_with_plane(z, transform);
        if cut.len() != 2 {
            continue;
        }
        let (mut p1, mut p2) = (cut[0], cut[1]);

        // Direct the segment so solid is on its left: the segment's
        // rightward normal must agree with the facet normal's XY part.
        let facet_n = transform.apply_vector(triangle.normal).xy().normalized();
        let dir = (p2 - p1).normalized();
        let seg_n = PointF::new(dir.y, -dir.x);
        if facet_n.distance_squared(&seg_n) > 0.2 {
            std::mem::swap(&mut p1, &mut p2);
        }

        let i1 = pool.insert(p1.to_scaled());
        let i2 = pool.insert(p2.to_scaled());
        if i1 != i2 {
            segments.push(Segment { start: i1, end: i2 });
        }
    }
    Ok((pool, segments))
}

/// Remove duplicate segments between the same vertex pair, in either
/// direction. These appear when the plane passes exactly through a shared
/// mesh edge and both triangles report it.
fn cleanup_shared_segments(segments: Vec<Segment>) -> Vec<Segment> {
    let mut seen: HashSet<(usize, usize)> = HashSet::with_capacity(segments.len());
    let mut out = Vec::with_capacity(segments.len());
    for seg in segments {
        let key = (seg.start.min(seg.end), seg.start.max(seg.end));
        if seen.insert(key) {
            out.push(seg);
        }
    }
    out
}

/// Reconnect dangling endpoints.
///
/// A vertex's signed degree is segments starting there minus segments ending
/// there; nonzero means a gap in the loop. Opposite-sign vertices are paired
/// nearest-first and bridged with a synthetic segment. An odd number of
/// dangling vertices, or a pairing farther than `dangling_join_max`, is
/// unrecoverable at this Z.
fn cleanup_connect_segments(
    vertices: &[Point],
    mut segments: Vec<Segment>,
    settings: &SliceSettings,
) -> Result<Vec<Segment>> {
    let mut degree = vec![0i32; vertices.len()];
    for seg in &segments {
        degree[seg.start] += 1;
        degree[seg.end] -= 1;
    }

    let dangling_count = degree.iter().filter(|&&d| d != 0).count();
    if dangling_count == 0 {
        return Ok(segments);
    }
    if dangling_count % 2 == 1 {
        return Err(Error::Reconstruction(format!(
            "odd number of dangling endpoints ({dangling_count})"
        )));
    }

    loop {
        // pick any vertex still out of balance
        let Some(u) = (0..vertices.len()).find(|&v| degree[v] != 0) else {
            break;
        };
        let want_sign = -degree[u].signum();
        let mut best: Option<(usize, i128)> = None;
        for v in 0..vertices.len() {
            if v == u || degree[v].signum() != want_sign {
                continue;
            }
            let d = vertices[u].distance_squared(&vertices[v]);
            if best.map_or(true, |(_, bd)| d < bd) {
                best = Some((v, d));
            }
        }
        let Some((v, dist_sq)) = best else {
            return Err(Error::Reconstruction(
                "dangling endpoint with no opposite-sign partner".into(),
            ));
        };

        let dist_mm = (dist_sq as CoordF).sqrt() / SCALING_FACTOR;
        if dist_mm > settings.dangling_join_max {
            warn!(
                "dangling endpoints {:.3} mm apart exceed join budget of {} mm",
                dist_mm, settings.dangling_join_max
            );
            return Err(Error::Reconstruction(format!(
                "dangling endpoints {dist_mm:.3} mm apart"
            )));
        }
        if dist_mm > settings.dangling_join_warn {
            warn!(
                "bridging dangling endpoints {:.3} mm apart at ({:.3}, {:.3})",
                dist_mm,
                unscale(vertices[u].x),
                unscale(vertices[u].y)
            );
        }

        // the synthetic segment must end at the positive-degree vertex
        let seg = if degree[u] > 0 {
            Segment { start: v, end: u }
        } else {
            Segment { start: u, end: v }
        };
        degree[seg.start] += 1;
        degree[seg.end] -= 1;
        segments.push(seg);
    }

    Ok(segments)
}

/// Chain segments into closed loops, visiting every segment exactly once.
fn chain_segments(
    vertices: &[Point],
    segments: &[Segment],
    z: CoordF,
    cancel: &CancelToken,
) -> Result<Polygons> {
    let mut by_start: HashMap<usize, Vec<usize>> = HashMap::new();
    for (i, seg) in segments.iter().enumerate() {
        by_start.entry(seg.start).or_default().push(i);
    }

    let mut used = vec![false; segments.len()];
    let mut polygons = Vec::new();
    let mut processed = 0usize;

    for first in 0..segments.len() {
        if used[first] {
            continue;
        }
        let loop_start = segments[first].start;
        let mut points = vec![vertices[loop_start]];
        let mut current = first;

        loop {
            used[current] = true;
            processed += 1;
            if processed % CANCEL_POLL_INTERVAL == 0 {
                cancel.check()?;
            }

            let end = segments[current].end;
            if end == loop_start {
                break; // sealed
            }
            points.push(vertices[end]);

            let next = by_start
                .get(&end)
                .and_then(|cands| cands.iter().copied().find(|&i| !used[i]));
            match next {
                Some(i) => current = i,
                None => {
                    return Err(Error::Reconstruction(format!(
                        "open chain of {} segments at ({:.3}, {:.3})",
                        points.len(),
                        unscale(vertices[end].x),
                        unscale(vertices[end].y)
                    )));
                }
            }
        }

        if points.len() >= 3 {
            polygons.push(Polygon::from_points(points, z));
        }
    }

    Ok(polygons)
}

/// Steep downward-facing triangles whose Z extent overlaps
/// `[z - thickness, z]`, projected onto the plane as 2D polygons.
///
/// Runs independently of cross-section stitching; the layer builder merges
/// the projections and clips them to the part above.
pub fn support_polygons_at_z(
    shape: &Shape,
    z: CoordF,
    thickness: CoordF,
    support_angle: CoordF,
) -> Polygons {
    let mut out = Vec::new();
    for triangle in shape.triangles_steeper_than(support_angle) {
        // already world-space
        if !triangle.is_in_z_range(z - thickness, z, &Default::default()) {
            continue;
        }
        let mut poly = Polygon::from_points(
            triangle
                .vertices()
                .iter()
                .map(|v| Point::new_scale(v.x, v.y))
                .collect(),
            z,
        );
        if poly.area() == 0.0 {
            continue; // vertical facet projects to a line
        }
        poly.make_counter_clockwise();
        out.push(poly);
    }
    out
}
