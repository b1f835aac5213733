//! Coordinate and geometry types shared across the scene graph and renderers.
//!
//! Canonical CPU space:
//! - surface pixels
//! - origin top-left
//! - +X right, +Y down
//!
//! Renderers convert to clip space in shaders using a viewport uniform.

mod color;
mod matrix;
mod rect;
mod vec2;
mod viewport;

pub use color::ColorRgba;
pub use matrix::Affine2;
pub use rect::Rect;
pub use vec2::Vec2;
pub use viewport::Viewport;
