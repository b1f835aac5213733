use core::ops::Mul;

/// Straight-alpha RGBA color or channel multiplier set.
///
/// Scene colors are multipliers: a node's effective color is the element-wise
/// product of its own value and its parent's effective value.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ColorRgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ColorRgba {
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Self = Self::new(0.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    #[inline]
    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

impl Default for ColorRgba {
    #[inline]
    fn default() -> Self {
        Self::WHITE
    }
}

impl Mul for ColorRgba {
    type Output = ColorRgba;

    #[inline]
    fn mul(self, rhs: ColorRgba) -> ColorRgba {
        ColorRgba::new(self.r * rhs.r, self.g * rhs.g, self.b * rhs.b, self.a * rhs.a)
    }
}
