//! Triangle meshes: facets, shapes, and component splitting.

mod components;
mod shape;
mod triangle;

pub use components::split_shapes;
pub use shape::Shape;
pub use triangle::Triangle;
