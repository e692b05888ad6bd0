//! Coordinate and geometry types shared across batchers and primitive renderers.
//!
//! Canonical CPU space:
//! - Logical pixels
//! - Origin top-left
//! - +X right, +Y down
//!
//! Shaders convert to clip space with the camera's view-projection matrix.

mod color;
mod corner_radii;
mod rect;
mod vec2;
mod viewport;

pub use color::ColorRgba;
pub use corner_radii::CornerRadii;
pub use rect::Rect;
pub use vec2::Vec2;
pub use viewport::Viewport;
