use crate::coords::ColorRgba;
use crate::versioned::{Version, Versioned};

/// Per-node channel multipliers.
#[derive(Debug, Clone)]
pub struct ColorState {
    value: ColorRgba,
    version: Version,
}

impl Default for ColorState {
    fn default() -> Self {
        Self {
            value: ColorRgba::WHITE,
            version: Version::new(1),
        }
    }
}

impl ColorState {
    pub fn new(value: ColorRgba) -> Self {
        Self { value, version: Version::new(1) }
    }

    #[inline]
    pub fn get(&self) -> ColorRgba {
        self.value
    }

    #[inline]
    pub fn alpha(&self) -> f32 {
        self.value.a
    }

    pub fn set(&mut self, value: ColorRgba) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        self.version.bump();
        true
    }

    pub fn set_rgb(&mut self, r: f32, g: f32, b: f32) -> bool {
        self.set(ColorRgba::new(r, g, b, self.value.a))
    }

    pub fn set_alpha(&mut self, a: f32) -> bool {
        self.set(ColorRgba { a, ..self.value })
    }
}

impl Versioned for ColorState {
    #[inline]
    fn version(&self) -> Version {
        self.version
    }
}
