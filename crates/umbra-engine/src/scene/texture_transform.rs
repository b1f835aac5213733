use crate::coords::{Affine2, Vec2};
use crate::versioned::{Version, Versioned};

/// Texture-space repeat and offset applied before the crop rectangle.
#[derive(Debug, Clone)]
pub struct TextureTransform {
    repeat: Vec2,
    offset: Vec2,
    version: Version,
}

impl Default for TextureTransform {
    fn default() -> Self {
        Self {
            repeat: Vec2::new(1.0, 1.0),
            offset: Vec2::zero(),
            version: Version::new(1),
        }
    }
}

impl TextureTransform {
    pub fn repeat(&self) -> Vec2 {
        self.repeat
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn set_repeat(&mut self, x: f32, y: f32) -> bool {
        let v = Vec2::new(x, y);
        if self.repeat == v {
            return false;
        }
        self.repeat = v;
        self.version.bump();
        true
    }

    pub fn set_offset(&mut self, x: f32, y: f32) -> bool {
        let v = Vec2::new(x, y);
        if self.offset == v {
            return false;
        }
        self.offset = v;
        self.version.bump();
        true
    }

    /// `uv' = uv * repeat + offset`.
    pub fn matrix(&self) -> Affine2 {
        Affine2::new(self.repeat.x, 0.0, 0.0, self.repeat.y, self.offset.x, self.offset.y)
    }
}

impl Versioned for TextureTransform {
    fn version(&self) -> Version {
        self.version
    }
}
