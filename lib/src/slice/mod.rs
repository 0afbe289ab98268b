//! Slicing: cross-section extraction and layer building.

pub mod cross_section;
pub mod layer;

pub use cross_section::{cross_section_at_z, support_polygons_at_z};
pub use layer::{Bridge, InfillLine, Layer, SkinFill};
