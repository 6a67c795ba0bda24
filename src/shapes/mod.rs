pub mod descriptor;
pub mod factory;
pub mod style;

pub use descriptor::{Geometry, ShapeDescriptor, ShapeKind};
pub use factory::{LiveOverlay, OverlayId, ShapeFactory};
pub use style::ShapeStyle;
