//! Typed slicing configuration.
//!
//! One `SliceSettings` value is built per session and passed by reference
//! into the pipeline stages. The empirically tuned reconstruction tolerances
//! live here too, so they can be adjusted without touching slicing code.

use crate::{CoordF, Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Skirt generation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SkirtMode {
    /// No skirt.
    Off,
    /// One convex-hull skirt around everything, shared by all layers.
    #[default]
    Single,
    /// Per-layer offset of the outer shell.
    PerShape,
}

/// All parameters a slicing session needs, with defaults tuned for a
/// 0.5 mm nozzle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliceSettings {
    /// Physical layer height in mm.
    pub layer_thickness: CoordF,
    /// Number of sub-Z fill slices per layer (1 = no skins).
    pub skins: u32,
    /// Extruded line width in mm.
    pub extrusion_width: CoordF,
    /// Number of perimeter shell rings.
    pub shell_count: u32,
    /// Extra inward offset applied to the first shell, in mm.
    pub shell_offset: CoordF,

    /// Fraction of the extrusion width by which infill may overlap shells.
    pub infill_overlap: CoordF,
    /// Line spacing for sparse fill, mm.
    pub infill_distance: CoordF,
    /// Line spacing for full (solid) fill, mm.
    pub full_infill_distance: CoordF,
    /// Line spacing for decor fill, mm.
    pub decor_infill_distance: CoordF,
    /// Line spacing for support fill, mm.
    pub support_infill_distance: CoordF,
    /// Base fill direction, radians.
    pub infill_angle: CoordF,
    /// Per-layer fill rotation, radians.
    pub infill_rotation: CoordF,
    /// Decor fill direction, radians.
    pub decor_infill_angle: CoordF,

    /// Overhang steepness beyond which support is generated, radians from
    /// horizontal-facing-down.
    pub support_angle: CoordF,

    /// Skirt generation mode.
    pub skirt_mode: SkirtMode,
    /// Clearance between the object and the skirt, mm.
    pub skirt_distance: CoordF,
    /// Fill the band between skirt and object on the first layer.
    pub skirt_fill: bool,

    /// Extrusion multiplier over bridges.
    pub bridge_extrusion: CoordF,

    /// Squared distance (mm²) below which slice vertices are merged.
    pub point_merge_tolerance_sq: CoordF,
    /// Dangling-endpoint pairings beyond this distance (mm) are rejected.
    pub dangling_join_max: CoordF,
    /// Dangling-endpoint pairings beyond this distance (mm) are accepted
    /// with a warning.
    pub dangling_join_warn: CoordF,
    /// Polygon cleanup tolerance is layer thickness divided by this.
    pub cleanup_divisor: CoordF,
}

impl Default for SliceSettings {
    fn default() -> Self {
        Self {
            layer_thickness: 0.4,
            skins: 1,
            extrusion_width: 0.5,
            shell_count: 2,
            shell_offset: 0.0,

            infill_overlap: 0.2,
            infill_distance: 2.0,
            full_infill_distance: 0.7,
            decor_infill_distance: 1.5,
            support_infill_distance: 3.0,
            infill_angle: std::f64::consts::FRAC_PI_4,
            infill_rotation: std::f64::consts::FRAC_PI_2,
            decor_infill_angle: 0.0,

            support_angle: std::f64::consts::FRAC_PI_4,

            skirt_mode: SkirtMode::Single,
            skirt_distance: 3.0,
            skirt_fill: false,

            bridge_extrusion: 1.0,

            point_merge_tolerance_sq: 1e-4,
            dangling_join_max: 10.0,
            dangling_join_warn: 1.0,
            cleanup_divisor: 7.0,
        }
    }
}

impl SliceSettings {
    /// Polygon cleanup tolerance in mm for this layer thickness.
    #[inline]
    pub fn cleanup_tolerance(&self) -> CoordF {
        self.layer_thickness / self.cleanup_divisor
    }

    /// Minimum area (mm²) below which support regions are discarded.
    #[inline]
    pub fn support_min_area(&self) -> CoordF {
        10.0 * self.layer_thickness * self.layer_thickness
    }

    /// Check every field is in its sane range.
    pub fn validate(&self) -> Result<()> {
        fn positive(name: &str, v: CoordF) -> Result<()> {
            if v > 0.0 && v.is_finite() {
                Ok(())
            } else {
                Err(Error::Config(format!("{name} must be positive, got {v}")))
            }
        }
        positive("layer_thickness", self.layer_thickness)?;
        positive("extrusion_width", self.extrusion_width)?;
        positive("infill_distance", self.infill_distance)?;
        positive("full_infill_distance", self.full_infill_distance)?;
        positive("decor_infill_distance", self.decor_infill_distance)?;
        positive("support_infill_distance", self.support_infill_distance)?;
        positive("cleanup_divisor", self.cleanup_divisor)?;
        positive("point_merge_tolerance_sq", self.point_merge_tolerance_sq)?;
        positive("dangling_join_max", self.dangling_join_max)?;
        positive("dangling_join_warn", self.dangling_join_warn)?;
        positive("bridge_extrusion", self.bridge_extrusion)?;
        if self.skins == 0 {
            return Err(Error::Config("skins must be at least 1".into()));
        }
        if self.shell_count == 0 {
            return Err(Error::Config("shell_count must be at least 1".into()));
        }
        if !(0.0..1.0).contains(&self.infill_overlap) {
            return Err(Error::Config(format!(
                "infill_overlap must be in [0, 1), got {}",
                self.infill_overlap
            )));
        }
        if self.skirt_distance < 0.0 {
            return Err(Error::Config("skirt_distance must not be negative".into()));
        }
        if self.dangling_join_warn > self.dangling_join_max {
            return Err(Error::Config(
                "dangling_join_warn must not exceed dangling_join_max".into(),
            ));
        }
        Ok(())
    }

    /// Parse settings from a JSON string and validate them.
    pub fn from_json(json: &str) -> Result<Self> {
        let settings: Self =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }

    /// Load settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&text)
    }

    /// Save settings to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = self.to_json()?;
        fs::write(path, text).map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }
}
