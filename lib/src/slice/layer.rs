//! Layer building: from raw cross-sections to the categorized region
//! bundle a toolpath generator consumes.
//!
//! The operation order is a hard contract. Shells are derived before fill,
//! full-fill and decor are promoted out of fill (keeping the sets disjoint),
//! bridges claim their area next, support and skirt are independent, and
//! infill runs last over whatever each category ended up with.

use crate::clipper::{self, OffsetJoinType};
use crate::config::{SkirtMode, SliceSettings};
use crate::geometry::{
    convex_hull, BoundingBox, ExPolygon, ExPolygons, Point, Polygon, Polygons,
};
use crate::infill::{Infill, InfillKind, PatternCache};
use crate::mesh::Shape;
use crate::slice::cross_section::cross_section_at_z;
use crate::{scale, CancelToken, CoordF, Error, Result, SCALING_FACTOR};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

/// An infill line segment in scaled coordinates.
pub type InfillLine = (Point, Point);

/// A fill region spanning a gap, with its computed fill direction and the
/// sub-regions where it actually rests on the layer below.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Bridge {
    pub region: ExPolygon,
    /// Fill direction in radians, normalized to [0, π).
    pub angle: CoordF,
    /// Contact patches on the previous layer (diagnostic).
    pub pillars: ExPolygons,
    pub infill: Vec<InfillLine>,
}

/// Full-fill lines for one sub-Z slice of a multi-skin layer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SkinFill {
    pub z: CoordF,
    pub infill: Vec<InfillLine>,
}

/// One Z height's worth of categorized geometry.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Layer {
    layer_no: i32,
    z: CoordF,
    thickness: CoordF,
    skins: u32,

    polygons: Polygons,
    shells: Vec<ExPolygons>,
    thin_polygons: ExPolygons,
    fill_polygons: ExPolygons,
    full_fill_polygons: ExPolygons,
    decor_polygons: ExPolygons,
    bridges: Vec<Bridge>,
    support_polygons: ExPolygons,
    skin_full_fill: ExPolygons,
    hull: Polygon,
    skirt: ExPolygons,
    bbox: BoundingBox,

    normal_infill: Vec<InfillLine>,
    full_infill: Vec<InfillLine>,
    decor_infill: Vec<InfillLine>,
    support_infill: Vec<InfillLine>,
    skirt_infill: Vec<InfillLine>,
    skin_fills: Vec<SkinFill>,
}

impl Layer {
    pub fn new(layer_no: i32, z: CoordF, settings: &SliceSettings) -> Self {
        Self {
            layer_no,
            z,
            thickness: settings.layer_thickness,
            skins: settings.skins,
            hull: Polygon::new(z),
            ..Default::default()
        }
    }

    // ---- accessors for the toolpath consumer --------------------------

    #[inline]
    pub fn layer_no(&self) -> i32 {
        self.layer_no
    }
    #[inline]
    pub fn z(&self) -> CoordF {
        self.z
    }
    #[inline]
    pub fn thickness(&self) -> CoordF {
        self.thickness
    }
    /// Raw cross-section polygons, holes wound clockwise.
    pub fn polygons(&self) -> &Polygons {
        &self.polygons
    }
    /// Shell rings, innermost first.
    pub fn shells(&self) -> &[ExPolygons] {
        &self.shells
    }
    /// Regions too narrow for a double-walled shell, printed single-pass.
    pub fn thin_polygons(&self) -> &ExPolygons {
        &self.thin_polygons
    }
    pub fn fill_polygons(&self) -> &ExPolygons {
        &self.fill_polygons
    }
    pub fn full_fill_polygons(&self) -> &ExPolygons {
        &self.full_fill_polygons
    }
    pub fn decor_polygons(&self) -> &ExPolygons {
        &self.decor_polygons
    }
    pub fn bridges(&self) -> &[Bridge] {
        &self.bridges
    }
    pub fn support_polygons(&self) -> &ExPolygons {
        &self.support_polygons
    }
    pub fn hull(&self) -> &Polygon {
        &self.hull
    }
    pub fn skirt(&self) -> &ExPolygons {
        &self.skirt
    }
    pub fn bounding_box(&self) -> &BoundingBox {
        &self.bbox
    }
    pub fn normal_infill(&self) -> &[InfillLine] {
        &self.normal_infill
    }
    pub fn full_infill(&self) -> &[InfillLine] {
        &self.full_infill
    }
    pub fn decor_infill(&self) -> &[InfillLine] {
        &self.decor_infill
    }
    pub fn support_infill(&self) -> &[InfillLine] {
        &self.support_infill
    }
    pub fn skirt_infill(&self) -> &[InfillLine] {
        &self.skirt_infill
    }
    pub fn skin_fills(&self) -> &[SkinFill] {
        &self.skin_fills
    }

    // ---- accumulation --------------------------------------------------

    /// Add raw cross-section polygons directly (already cut elsewhere).
    pub fn add_polygons(&mut self, polys: Polygons) {
        for p in &polys {
            for pt in p.points() {
                self.bbox.merge_point(*pt);
            }
        }
        self.polygons.extend(polys);
    }

    /// Cut `shape` at this layer's Z and accumulate the result.
    ///
    /// On reconstruction failure the Z is perturbed upward in steps of a
    /// tenth of the layer thickness, giving up after one full thickness;
    /// exhaustion means the shape contributes nothing here, which is logged
    /// and non-fatal.
    pub fn add_shape(
        &mut self,
        shape: &Shape,
        settings: &SliceSettings,
        cancel: &CancelToken,
    ) -> Result<()> {
        let step = self.thickness / 10.0;
        let mut offset = 0.0;
        let tolerance = scale(settings.cleanup_tolerance());

        loop {
            match cross_section_at_z(shape, self.z + offset, settings, cancel) {
                Ok(mut polys) => {
                    for p in &mut polys {
                        p.cleanup(tolerance);
                        p.set_z(self.z);
                    }
                    polys.retain(|p| p.len() >= 3);
                    if offset > 0.0 {
                        debug!(
                            "layer {} recovered at z offset {:.4} mm",
                            self.layer_no, offset
                        );
                    }
                    self.add_polygons(polys);
                    return Ok(());
                }
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    offset += step;
                    if offset > self.thickness {
                        warn!(
                            "layer {} at z {:.3}: reconstruction failed after retries ({e}), \
                             shape contributes no geometry",
                            self.layer_no, self.z
                        );
                        return Ok(());
                    }
                }
            }
        }
    }

    // ---- derivation ----------------------------------------------------

    /// Derive shell rings, thin walls, the fill region, and the hull.
    pub fn make_shells(&mut self, settings: &SliceSettings) {
        let w = settings.extrusion_width;
        let tolerance = scale(settings.cleanup_tolerance());

        let mut current = clipper::merge_polygons(&self.polygons);
        set_z(&mut current, self.z);

        let mut rings_outer_first: Vec<ExPolygons> = Vec::new();
        for ring in 0..settings.shell_count {
            let inset = if ring == 0 {
                0.5 * w + settings.shell_offset
            } else {
                w
            };

            let mut next =
                clipper::offset_expolygons(&current, -inset, OffsetJoinType::Round);
            cleanup_expolygons(&mut next, tolerance);

            // thin walls: what vanishes under the inset and does not come
            // back when re-dilated is too narrow for this ring
            let regrown =
                clipper::offset_expolygons(&next, inset + 0.05 * w, OffsetJoinType::Round);
            let mut thin = clipper::difference(&current, &regrown);
            thin = clipper::offset_expolygons(&thin, -0.05 * w, OffsetJoinType::Round);
            cleanup_expolygons(&mut thin, tolerance);
            self.thin_polygons.extend(thin);

            if next.is_empty() {
                break;
            }
            rings_outer_first.push(next.clone());
            current = next;
        }

        rings_outer_first.reverse();
        self.shells = rings_outer_first;

        // fill region: innermost shell pulled in so fill lines overlap the
        // shell by the configured fraction
        if let Some(innermost) = self.shells.first() {
            self.fill_polygons = clipper::offset_expolygons(
                innermost,
                -(1.0 - settings.infill_overlap) * w,
                OffsetJoinType::Round,
            );
            cleanup_expolygons(&mut self.fill_polygons, tolerance);
        }

        let mut hull_points: Vec<Point> = Vec::new();
        for p in &self.polygons {
            hull_points.extend_from_slice(p.points());
        }
        self.hull = convex_hull(&hull_points, self.z);
    }

    /// Promote explicit full-fill (or decor) regions out of the fill area.
    pub fn add_full_polygons(&mut self, regions: &[ExPolygon], decor: bool) {
        let promoted = clipper::intersection(regions, &self.fill_polygons);
        if promoted.is_empty() {
            return;
        }
        self.fill_polygons = clipper::difference(&self.fill_polygons, &promoted);
        if decor {
            self.decor_polygons.extend(promoted);
        } else {
            self.full_fill_polygons.extend(promoted);
        }
    }

    /// Re-merge accumulated full-fill polygons and keep fill disjoint.
    pub fn merge_full_polygons(&mut self) {
        if self.full_fill_polygons.is_empty() {
            return;
        }
        let flat = clipper::to_polygons(&self.full_fill_polygons);
        self.full_fill_polygons = clipper::merge_polygons(&flat);
        set_z(&mut self.full_fill_polygons, self.z);
        self.fill_polygons =
            clipper::difference(&self.fill_polygons, &self.full_fill_polygons);
    }

    /// Claim bridge candidates out of the fill region.
    pub fn add_bridge_polygons(&mut self, candidates: &[ExPolygon]) {
        let claimed = clipper::intersection(candidates, &self.fill_polygons);
        if claimed.is_empty() {
            return;
        }
        self.fill_polygons = clipper::difference(&self.fill_polygons, &claimed);
        for region in claimed {
            self.bridges.push(Bridge {
                region,
                angle: 0.0,
                pillars: vec![],
                infill: vec![],
            });
        }
    }

    /// Find each bridge's support pillars on the previous layer and derive
    /// its fill direction from them.
    pub fn calc_bridge_angles(&mut self, prev: &Layer) {
        let prev_solid: ExPolygons = if let Some(inner) = prev.shells.first() {
            inner.clone()
        } else {
            clipper::merge_polygons(&prev.polygons)
        };
        if prev_solid.is_empty() {
            return;
        }

        for bridge in &mut self.bridges {
            let grown = clipper::offset_expolygons(
                &[bridge.region.clone()],
                self.thickness,
                OffsetJoinType::Round,
            );
            bridge.pillars = clipper::intersection(&prev_solid, &grown);

            let centroids: Vec<Point> = bridge
                .pillars
                .iter()
                .map(|p| p.outer.centroid())
                .collect();
            if centroids.len() < 2 {
                continue; // keep default direction
            }
            let mut dir_x = 0.0;
            let mut dir_y = 0.0;
            for i in 0..centroids.len() {
                for j in (i + 1)..centroids.len() {
                    dir_x += (centroids[j].x - centroids[i].x) as CoordF;
                    dir_y += (centroids[j].y - centroids[i].y) as CoordF;
                }
            }
            bridge.angle = dir_y.atan2(dir_x).rem_euclid(std::f64::consts::PI);
        }
    }

    /// Merge support candidates, clip away this layer's own solid, drop
    /// slivers, fold into the bounding box. Candidates projected from the
    /// band above may extend under material; support never overlaps it.
    pub fn set_support_polygons(&mut self, candidates: &[Polygon], settings: &SliceSettings) {
        if candidates.is_empty() {
            return;
        }
        let mut merged = clipper::merge_polygons(candidates);
        if !self.polygons.is_empty() {
            merged = clipper::difference(&merged, &clipper::merge_polygons(&self.polygons));
        }
        let min_area = settings.support_min_area() * SCALING_FACTOR * SCALING_FACTOR;
        let kept = clipper::remove_small(&merged, min_area);
        let dropped = merged.len() - kept.len();
        if dropped > 0 {
            debug!("dropped {dropped} support slivers below minimum area");
        }
        for e in &kept {
            for pt in e.outer.points() {
                self.bbox.merge_point(*pt);
            }
        }
        self.support_polygons = kept;
        set_z(&mut self.support_polygons, self.z);
    }

    /// Synthesize the skirt for this layer.
    pub fn make_skirt(&mut self, settings: &SliceSettings) {
        match settings.skirt_mode {
            SkirtMode::Off => {}
            SkirtMode::Single => {
                let mut points: Vec<Point> = self.hull.points().to_vec();
                for e in &self.support_polygons {
                    points.extend_from_slice(e.outer.points());
                }
                if points.len() < 3 {
                    return;
                }
                let hull = convex_hull(&points, self.z);
                self.skirt = clipper::offset_polygons(
                    &[hull],
                    settings.skirt_distance,
                    OffsetJoinType::Round,
                );
            }
            SkirtMode::PerShape => {
                if let Some(outermost) = self.shells.last() {
                    self.skirt = clipper::offset_expolygons(
                        outermost,
                        settings.skirt_distance,
                        OffsetJoinType::Round,
                    );
                }
            }
        }
    }

    /// Snapshot the full-fill regions before skin multiplication.
    pub fn make_skin_polygons(&mut self) {
        if self.skins > 1 && !self.full_fill_polygons.is_empty() {
            self.skin_full_fill = std::mem::take(&mut self.full_fill_polygons);
        }
    }

    /// Generate infill lines for every category.
    pub fn calc_infill(&mut self, cache: &PatternCache, settings: &SliceSettings) {
        let normal = Infill::new(
            InfillKind::Parallel,
            settings.infill_distance,
            settings.infill_angle,
            settings.infill_rotation,
        );
        let layer_angle = normal.angle_for_layer(self.layer_no);
        self.normal_infill = normal.apply(cache, &self.fill_polygons, layer_angle);

        let full = Infill::new(
            InfillKind::Parallel,
            settings.full_infill_distance,
            settings.infill_angle,
            settings.infill_rotation,
        );
        self.full_infill = full.apply(cache, &self.full_fill_polygons, layer_angle);

        let decor = Infill::new(
            InfillKind::Lines,
            settings.decor_infill_distance,
            settings.decor_infill_angle,
            0.0,
        );
        self.decor_infill = decor.apply(cache, &self.decor_polygons, settings.decor_infill_angle);

        // bridges get solid fill along the pillar axis, spacing widened by
        // the extrusion multiplier; the raster's strokes run perpendicular
        // to its rotation angle, so the stored axis angle gets a quarter turn
        let bridge_fill = Infill::new(
            InfillKind::Parallel,
            settings.full_infill_distance * settings.bridge_extrusion,
            0.0,
            0.0,
        );
        for bridge in &mut self.bridges {
            bridge.infill = bridge_fill.apply(
                cache,
                std::slice::from_ref(&bridge.region),
                bridge.angle + std::f64::consts::FRAC_PI_2,
            );
        }

        let support = Infill::new(
            InfillKind::Support,
            settings.support_infill_distance,
            0.0,
            0.0,
        );
        self.support_infill = support.apply(cache, &self.support_polygons, 0.0);

        // skins: the snapshotted full fill repeated at interpolated sub-Z
        // heights, fill direction advancing per sub-slice
        if self.skins > 1 && !self.skin_full_fill.is_empty() {
            self.skin_fills.clear();
            for i in 1..=self.skins {
                let sub_z =
                    self.z - self.thickness + self.thickness * i as CoordF / self.skins as CoordF;
                let mut regions = self.skin_full_fill.clone();
                set_z(&mut regions, sub_z);
                let angle = full.angle_for_layer(self.layer_no) + i as CoordF * settings.infill_rotation;
                let infill = full.apply(cache, &regions, angle);
                self.skin_fills.push(SkinFill { z: sub_z, infill });
            }
        }

        // first-layer priming: fill the band between skirt and outer shell
        if settings.skirt_fill && self.layer_no == 0 && !self.skirt.is_empty() {
            let object = self
                .shells
                .last()
                .cloned()
                .unwrap_or_else(|| clipper::merge_polygons(&self.polygons));
            let mut band = clipper::difference(&self.skirt, &object);
            band = clipper::difference(&band, &self.support_polygons);
            band = clipper::offset_expolygons(
                &band,
                -settings.full_infill_distance,
                OffsetJoinType::Round,
            );
            self.skirt_infill = full.apply(cache, &band, layer_angle);
        }
    }

    /// Regions of this layer not resting on the previous one (diagnostic).
    pub fn overhangs(&self, prev: &Layer) -> ExPolygons {
        let current = clipper::merge_polygons(&self.polygons);
        let below = clipper::offset_expolygons(
            &clipper::merge_polygons(&prev.polygons),
            self.thickness / 2.0,
            OffsetJoinType::Round,
        );
        clipper::difference(&current, &below)
    }
}

fn set_z(expolys: &mut ExPolygons, z: CoordF) {
    for e in expolys {
        e.set_z(z);
    }
}

/// Clean each ring at the given tolerance and drop degenerate results.
fn cleanup_expolygons(expolys: &mut ExPolygons, tolerance: crate::Coord) {
    for e in expolys.iter_mut() {
        e.outer.cleanup(tolerance);
        for h in &mut e.holes {
            h.cleanup(tolerance);
        }
        e.holes.retain(|h| h.len() >= 3);
    }
    expolys.retain(|e| e.outer.len() >= 3);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::unscale;

    fn settings() -> SliceSettings {
        SliceSettings::default()
    }

    fn rect_mm(x0: f64, y0: f64, x1: f64, y1: f64, z: f64) -> Polygon {
        Polygon::rectangle(Point::new_scale(x0, y0), Point::new_scale(x1, y1), z)
    }

    fn area_mm2(expolys: &ExPolygons) -> f64 {
        clipper::total_area(expolys) / (SCALING_FACTOR * SCALING_FACTOR)
    }

    #[test]
    fn test_cube_layer_shells_and_fill() {
        let cfg = settings();
        let cube = Shape::cube(20.0);
        let mut layer = Layer::new(5, 2.0, &cfg);
        layer.add_shape(&cube, &cfg, &CancelToken::new()).unwrap();
        assert_eq!(layer.polygons().len(), 1);

        layer.make_shells(&cfg);
        assert_eq!(layer.shells().len(), 2);

        // rings are innermost first: inner area < outer area < raw area
        let inner = area_mm2(&layer.shells()[0]);
        let outer = area_mm2(&layer.shells()[1]);
        assert!(inner < outer);
        assert!(outer < 400.0);
        // outer ring inset by w/2: (20 - 0.5)^2
        assert!((outer - 380.25).abs() < 1.0);

        let fill = area_mm2(layer.fill_polygons());
        assert!(fill > 0.0 && fill < inner);
        assert_eq!(layer.hull().len(), 4);
    }

    #[test]
    fn test_thin_wall_routed_out_of_shells() {
        let cfg = settings();
        let mut layer = Layer::new(0, 0.2, &cfg);
        // 0.3 mm wide sliver, narrower than the 0.5 mm extrusion width
        layer.add_polygons(vec![rect_mm(0.0, 0.0, 10.0, 0.3, 0.2)]);
        layer.make_shells(&cfg);
        assert!(layer.shells().iter().all(|r| r.is_empty()) || layer.shells().is_empty());
        assert!(!layer.thin_polygons().is_empty());
    }

    #[test]
    fn test_full_fill_promotion_keeps_sets_disjoint() {
        let cfg = settings();
        let mut layer = Layer::new(0, 0.4, &cfg);
        layer.add_polygons(vec![rect_mm(0.0, 0.0, 20.0, 20.0, 0.4)]);
        layer.make_shells(&cfg);

        let request = vec![rect_mm(0.0, 0.0, 20.0, 10.0, 0.4).into()];
        layer.add_full_polygons(&request, false);
        layer.merge_full_polygons();

        assert!(!layer.full_fill_polygons().is_empty());
        let overlap = clipper::intersection(layer.fill_polygons(), layer.full_fill_polygons());
        assert!(area_mm2(&overlap) < 1e-3);
    }

    #[test]
    fn test_bridge_angle_from_two_pillars() {
        let cfg = settings();

        // previous layer: two islands left and right
        let mut prev = Layer::new(0, 0.4, &cfg);
        prev.add_polygons(vec![
            rect_mm(0.0, 3.0, 4.0, 7.0, 0.4),
            rect_mm(16.0, 3.0, 20.0, 7.0, 0.4),
        ]);
        prev.make_shells(&cfg);

        // current layer spans both islands
        let mut layer = Layer::new(1, 0.8, &cfg);
        layer.add_polygons(vec![rect_mm(0.0, 3.0, 20.0, 7.0, 0.8)]);
        layer.make_shells(&cfg);
        let span: ExPolygons = vec![rect_mm(0.0, 3.0, 20.0, 7.0, 0.8).into()];
        layer.add_bridge_polygons(&span);
        assert_eq!(layer.bridges().len(), 1);

        layer.calc_bridge_angles(&prev);
        let bridge = &layer.bridges()[0];
        assert_eq!(bridge.pillars.len(), 2);
        // pillar axis runs along X, so the angle is ~0 (mod pi)
        let a = bridge.angle;
        assert!(a < 0.1 || a > std::f64::consts::PI - 0.1, "angle {a}");
    }

    #[test]
    fn test_bridge_infill_runs_along_pillar_axis() {
        let cfg = settings();
        let cache = PatternCache::new();

        let mut prev = Layer::new(0, 0.4, &cfg);
        prev.add_polygons(vec![
            rect_mm(0.0, 3.0, 4.0, 7.0, 0.4),
            rect_mm(16.0, 3.0, 20.0, 7.0, 0.4),
        ]);
        prev.make_shells(&cfg);

        let mut layer = Layer::new(1, 0.8, &cfg);
        layer.add_polygons(vec![rect_mm(0.0, 3.0, 20.0, 7.0, 0.8)]);
        layer.make_shells(&cfg);
        layer.add_bridge_polygons(&[rect_mm(0.0, 3.0, 20.0, 7.0, 0.8).into()]);
        layer.calc_bridge_angles(&prev);
        layer.calc_infill(&cache, &cfg);

        let bridge = &layer.bridges()[0];
        assert!(bridge.angle < 0.1 || bridge.angle > std::f64::consts::PI - 0.1);
        assert!(!bridge.infill.is_empty());
        // the pillars sit left and right, so every fill line must span in X
        for (a, b) in &bridge.infill {
            let d = *b - *a;
            assert!(
                d.x.abs() > d.y.abs(),
                "bridge line off the pillar axis: {:?}",
                d
            );
        }
    }

    #[test]
    fn test_support_clipped_to_open_area() {
        let cfg = settings();
        let mut layer = Layer::new(0, 0.4, &cfg);
        layer.add_polygons(vec![rect_mm(0.0, 0.0, 10.0, 10.0, 0.4)]);
        // candidate covering the object plus a 10 mm apron around it
        layer.set_support_polygons(&[rect_mm(-10.0, -10.0, 20.0, 20.0, 0.4)], &cfg);
        assert!((area_mm2(layer.support_polygons()) - 800.0).abs() < 0.5);
        let overlap = clipper::intersection(
            layer.support_polygons(),
            &clipper::merge_polygons(layer.polygons()),
        );
        assert!(area_mm2(&overlap) < 1e-3);
    }

    #[test]
    fn test_support_min_area_filter() {
        let cfg = settings();
        let mut layer = Layer::new(0, 0.4, &cfg);
        // min area is 10 * 0.4^2 = 1.6 mm²
        let big = rect_mm(0.0, 0.0, 5.0, 5.0, 0.4);
        let tiny = rect_mm(10.0, 10.0, 11.0, 11.0, 0.4);
        layer.set_support_polygons(&[big, tiny], &cfg);
        assert_eq!(layer.support_polygons().len(), 1);
        assert!((area_mm2(layer.support_polygons()) - 25.0).abs() < 0.1);
    }

    #[test]
    fn test_skirt_encloses_object() {
        let cfg = settings();
        let mut layer = Layer::new(0, 0.4, &cfg);
        layer.add_polygons(vec![rect_mm(0.0, 0.0, 10.0, 10.0, 0.4)]);
        layer.make_shells(&cfg);
        layer.make_skirt(&cfg);
        assert!(!layer.skirt().is_empty());
        // skirt cleared outward by skirt_distance
        let skirt_area = area_mm2(layer.skirt());
        assert!(skirt_area > 100.0);
    }

    #[test]
    fn test_skirt_fill_band_reaches_outer_shell() {
        let mut cfg = settings();
        cfg.skirt_fill = true;
        let cache = PatternCache::new();
        let mut layer = Layer::new(0, 0.4, &cfg);
        layer.add_polygons(vec![rect_mm(0.0, 0.0, 10.0, 10.0, 0.4)]);
        layer.make_shells(&cfg);
        layer.make_skirt(&cfg);
        layer.calc_infill(&cache, &cfg);
        assert!(!layer.skirt_infill().is_empty());

        // the band runs inward to the outer shell, not the raw outline, so
        // its eroded inner edge sits within the fill distance of the object
        let mut min_d = f64::MAX;
        for (a, b) in layer.skirt_infill() {
            for p in [a, b] {
                let (px, py) = (unscale(p.x), unscale(p.y));
                let dx = (0.0 - px).max(px - 10.0).max(0.0);
                let dy = (0.0 - py).max(py - 10.0).max(0.0);
                min_d = min_d.min((dx * dx + dy * dy).sqrt());
            }
        }
        assert!(min_d < 0.6, "band starts {min_d:.3} mm from the object");
    }

    #[test]
    fn test_skin_snapshot_and_sub_z_fill() {
        let mut cfg = settings();
        cfg.skins = 3;
        let cache = PatternCache::new();

        let mut layer = Layer::new(2, 1.2, &cfg);
        layer.add_polygons(vec![rect_mm(0.0, 0.0, 20.0, 20.0, 1.2)]);
        layer.make_shells(&cfg);
        let all: ExPolygons = vec![rect_mm(0.0, 0.0, 20.0, 20.0, 1.2).into()];
        layer.add_full_polygons(&all, false);
        layer.make_skin_polygons();
        assert!(layer.full_fill_polygons().is_empty());

        layer.calc_infill(&cache, &cfg);
        assert_eq!(layer.skin_fills().len(), 3);
        for (i, skin) in layer.skin_fills().iter().enumerate() {
            let expected = 1.2 - 0.4 + 0.4 * (i as f64 + 1.0) / 3.0;
            assert!((skin.z - expected).abs() < 1e-9);
            assert!(!skin.infill.is_empty());
        }
    }

    #[test]
    fn test_calc_infill_fills_categories() {
        let cfg = settings();
        let cache = PatternCache::new();
        let mut layer = Layer::new(0, 0.4, &cfg);
        layer.add_polygons(vec![rect_mm(0.0, 0.0, 20.0, 20.0, 0.4)]);
        layer.make_shells(&cfg);
        layer.set_support_polygons(&[rect_mm(30.0, 0.0, 40.0, 10.0, 0.4)], &cfg);
        layer.calc_infill(&cache, &cfg);
        assert!(!layer.normal_infill().is_empty());
        assert!(!layer.support_infill().is_empty());
    }

    #[test]
    fn test_overhangs() {
        let cfg = settings();
        let mut prev = Layer::new(0, 0.4, &cfg);
        prev.add_polygons(vec![rect_mm(0.0, 0.0, 10.0, 10.0, 0.4)]);
        let mut layer = Layer::new(1, 0.8, &cfg);
        layer.add_polygons(vec![rect_mm(0.0, 0.0, 15.0, 10.0, 0.8)]);
        let over = layer.overhangs(&prev);
        // ~5 x 10 strip hangs over, minus the dilation margin
        let a = area_mm2(&over);
        assert!(a > 40.0 && a < 50.0, "overhang area {a}");
    }
}
