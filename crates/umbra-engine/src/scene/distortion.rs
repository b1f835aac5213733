use crate::coords::Vec2;
use crate::versioned::{Version, Versioned};

/// Per-corner offsets of a quad in unit-quad space.
///
/// Corner order matches [`Affine2::corners`](crate::coords::Affine2::corners):
/// top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone)]
pub struct Distortion {
    corners: [Vec2; 4],
    version: Version,
}

impl Default for Distortion {
    fn default() -> Self {
        Self {
            corners: [Vec2::zero(); 4],
            version: Version::new(1),
        }
    }
}

impl Distortion {
    pub fn corners(&self) -> [Vec2; 4] {
        self.corners
    }

    pub fn set_corner(&mut self, index: usize, offset: Vec2) -> bool {
        let Some(c) = self.corners.get_mut(index) else { return false };
        if *c == offset {
            return false;
        }
        *c = offset;
        self.version.bump();
        true
    }

    pub fn set_corners(&mut self, corners: [Vec2; 4]) -> bool {
        if self.corners == corners {
            return false;
        }
        self.corners = corners;
        self.version.bump();
        true
    }

    pub fn is_identity(&self) -> bool {
        self.corners.iter().all(|c| *c == Vec2::zero())
    }

    pub fn to_gpu(&self) -> ([f32; 4], [f32; 4]) {
        let c = &self.corners;
        (
            [c[0].x, c[0].y, c[1].x, c[1].y],
            [c[2].x, c[2].y, c[3].x, c[3].y],
        )
    }
}

impl Versioned for Distortion {
    fn version(&self) -> Version {
        self.version
    }
}
