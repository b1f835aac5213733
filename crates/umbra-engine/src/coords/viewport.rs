use super::Rect;

/// Pixel size of the target being drawn.
///
/// Shaders divide by it to reach clip space; culling intersects against it.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Viewport {
    #[inline]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn from_size(width: u32, height: u32) -> Self {
        Self::new(width as f32, height as f32)
    }

    /// The whole target as a pixel rectangle.
    #[inline]
    pub fn as_rect(self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}
