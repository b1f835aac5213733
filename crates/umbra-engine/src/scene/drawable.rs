use crate::coords::{Affine2, Rect, Vec2, Viewport};
use crate::render::{BlendMode, TextureId};
use crate::versioned::{Cached, Version, Versioned};

use super::{Distortion, TextureTransform};

/// How the node color combines with the sampled texel.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum TintMode {
    /// `texel * color`
    #[default]
    Multiply = 0,
    /// Replaces texel rgb with the color, keeps texel alpha.
    Fill = 1,
    /// `texel + color.rgb * texel.a`
    Add = 2,
}

/// Projected footprint of a drawable.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct Bounds {
    /// Clip-space corners (TL, TR, BR, BL) after distortion.
    pub clip: [Vec2; 4],
    /// Axis-aligned box of the same corners in surface pixels.
    pub rect: Rect,
}

/// Payload of an image node.
#[derive(Debug, Clone)]
pub struct Drawable {
    pub texture: Option<TextureId>,
    pub blend: BlendMode,
    pub tint: TintMode,
    texture_transform: TextureTransform,
    texture_matrix: Cached<Affine2, 1>,
    crop: Rect,
    distortion: Distortion,
    bounds: Cached<Bounds, 2>,
    bounds_viewport: Viewport,
}

impl Default for Drawable {
    fn default() -> Self {
        Self::new(None)
    }
}

impl Drawable {
    pub fn new(texture: Option<TextureId>) -> Self {
        Self {
            texture,
            blend: BlendMode::Normal,
            tint: TintMode::Multiply,
            texture_transform: TextureTransform::default(),
            texture_matrix: Cached::new(Affine2::IDENTITY),
            crop: Rect::new(0.0, 0.0, 1.0, 1.0),
            distortion: Distortion::default(),
            bounds: Cached::new(Bounds::default()),
            bounds_viewport: Viewport::default(),
        }
    }

    pub fn texture_transform(&self) -> &TextureTransform {
        &self.texture_transform
    }

    pub fn texture_transform_mut(&mut self) -> &mut TextureTransform {
        &mut self.texture_transform
    }

    /// Texture matrix as of the last scene update.
    pub fn texture_matrix(&self) -> Affine2 {
        *self.texture_matrix.value()
    }

    /// Sub-rectangle of the texture in normalized coordinates.
    pub fn crop(&self) -> Rect {
        self.crop
    }

    pub fn set_crop(&mut self, crop: Rect) {
        self.crop = crop;
    }

    pub fn distortion(&self) -> &Distortion {
        &self.distortion
    }

    pub fn distortion_mut(&mut self) -> &mut Distortion {
        &mut self.distortion
    }

    /// Returns `true` if the texture matrix was recomputed.
    pub(super) fn refresh_texture_matrix(&mut self) -> bool {
        let tt = &self.texture_transform;
        let (input, m) = (tt.version(), tt.matrix());
        self.texture_matrix.refresh([input], |v| *v = m)
    }

    /// Lazily computes corners and bounding box from the quad matrix.
    ///
    /// Keyed on the owner's props version and the distortion version; a
    /// viewport change forces a recompute.
    pub(super) fn refresh_bounds(
        &mut self,
        quad: &Affine2,
        props: Version,
        viewport: Viewport,
    ) -> (bool, Bounds) {
        if self.bounds_viewport != viewport {
            self.bounds_viewport = viewport;
            self.bounds.invalidate();
        }
        let offsets = self.distortion.corners();
        let recomputed = self.bounds.refresh([props, self.distortion.version()], |b| {
            let unit = [
                Vec2::new(0.0, 0.0),
                Vec2::new(1.0, 0.0),
                Vec2::new(1.0, 1.0),
                Vec2::new(0.0, 1.0),
            ];
            let px: [Vec2; 4] =
                core::array::from_fn(|i| quad.transform_point(unit[i] + offsets[i]));
            let w = viewport.width.max(1.0);
            let h = viewport.height.max(1.0);
            b.clip = px.map(|p| Vec2::new(p.x / w * 2.0 - 1.0, 1.0 - p.y / h * 2.0));
            b.rect = Rect::bounding(&px);
        });
        (recomputed, *self.bounds.value())
    }

    pub(super) fn reset_stamps(&mut self) {
        self.texture_matrix.invalidate();
        self.bounds.invalidate();
    }
}
