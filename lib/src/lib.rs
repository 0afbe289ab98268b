//! # Lamina
//!
//! A geometry core for converting triangulated 3D solids into stacks of
//! manufacturable 2D layer descriptions.
//!
//! The pipeline:
//! - Cross-section extraction: triangle mesh + cutting plane → closed 2D
//!   polygons ([`slice::cross_section`])
//! - Mesh component splitting: one shape per connected solid ([`mesh::components`])
//! - Layer building: shells, thin walls, fill regions, bridges, support,
//!   skirt ([`slice::Layer`])
//! - Infill pattern generation with a session-wide pattern cache ([`infill`])
//!
//! Downstream toolpath generation, mesh file I/O and rendering are external
//! collaborators; this crate only produces plain polygon data. The one
//! device-facing piece is the firmware reply classifier in [`protocol`].

pub mod clipper;
pub mod config;
pub mod geometry;
pub mod infill;
pub mod mesh;
pub mod progress;
pub mod protocol;
pub mod slice;

pub use config::SliceSettings;
pub use progress::CancelToken;

use thiserror::Error;

/// Scaled integer coordinate type. 1 unit = 1 nanometer.
pub type Coord = i64;

/// Floating-point coordinate type (millimeters).
pub type CoordF = f64;

/// Scaling factor between millimeters and scaled integer units.
pub const SCALING_FACTOR: CoordF = 1_000_000.0;

/// Convert a millimeter value to scaled integer units.
#[inline]
pub fn scale(v: CoordF) -> Coord {
    (v * SCALING_FACTOR).round() as Coord
}

/// Convert a scaled integer value back to millimeters.
#[inline]
pub fn unscale(v: Coord) -> CoordF {
    v as CoordF / SCALING_FACTOR
}

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Segment stitching could not recover a closed cross-section.
    #[error("cross-section reconstruction failed: {0}")]
    Reconstruction(String),

    /// A cooperative cancellation request was observed.
    #[error("operation cancelled")]
    Cancelled,

    /// Configuration is invalid.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scale_roundtrip() {
        assert_eq!(scale(1.0), 1_000_000);
        assert!((unscale(scale(12.345)) - 12.345).abs() < 1e-6);
        assert_eq!(scale(-0.5), -500_000);
    }
}
