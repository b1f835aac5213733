use crate::coords::Affine2;
use crate::versioned::{Version, Versioned};

/// A property container that composes into a 2D local matrix.
pub trait Composable2DTransform: Versioned {
    /// Brings lazily derived terms up to date. Returns `true` if anything was recomputed.
    fn refresh(&mut self) -> bool;

    /// Matrix from the node's content space (where children live) to its parent's.
    fn local_matrix(&self) -> Affine2;

    /// Size of the node's quad in content-space pixels.
    fn size(&self) -> (f32, f32);
}

/// Position, rotation, skew, anchor, scale and size of a node.
///
/// Two lazy derivations hang off the setters:
/// - rotation/skew edits invalidate the sine/cosine terms
/// - scale/size edits invalidate the scaled size
///
/// Both chains feed the single [`Version`] the owning node observes.
#[derive(Debug, Clone)]
pub struct TransformState {
    x: f32,
    y: f32,
    rotation: f32,
    skew_x: f32,
    skew_y: f32,
    anchor_x: f32,
    anchor_y: f32,
    scale_x: f32,
    scale_y: f32,
    width: f32,
    height: f32,

    // rotation chain: (cos(r + skew_y), sin(r + skew_y), -sin(r - skew_x), cos(r - skew_x))
    rot_terms: [f32; 4],
    rotation_dirty: bool,

    // scale chain
    scaled_width: f32,
    scaled_height: f32,
    scale_dirty: bool,

    version: Version,
}

impl Default for TransformState {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            rotation: 0.0,
            skew_x: 0.0,
            skew_y: 0.0,
            anchor_x: 0.0,
            anchor_y: 0.0,
            scale_x: 1.0,
            scale_y: 1.0,
            width: 1.0,
            height: 1.0,
            rot_terms: [1.0, 0.0, 0.0, 1.0],
            rotation_dirty: false,
            scaled_width: 1.0,
            scaled_height: 1.0,
            scale_dirty: false,
            version: Version::new(1),
        }
    }
}

#[inline]
fn assign(field: &mut f32, value: f32, version: &mut Version) -> bool {
    if *field == value {
        return false;
    }
    *field = value;
    version.bump();
    true
}

impl TransformState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(width: f32, height: f32) -> Self {
        let mut t = Self::default();
        t.set_size(width, height);
        t.refresh();
        t
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn skew(&self) -> (f32, f32) {
        (self.skew_x, self.skew_y)
    }

    pub fn anchor(&self) -> (f32, f32) {
        (self.anchor_x, self.anchor_y)
    }

    pub fn scale(&self) -> (f32, f32) {
        (self.scale_x, self.scale_y)
    }

    pub fn width(&self) -> f32 {
        self.width
    }

    pub fn height(&self) -> f32 {
        self.height
    }

    /// Width and height multiplied by scale, as of the last refresh.
    pub fn scaled_size(&self) -> (f32, f32) {
        (self.scaled_width, self.scaled_height)
    }

    pub fn set_x(&mut self, v: f32) -> bool {
        assign(&mut self.x, v, &mut self.version)
    }

    pub fn set_y(&mut self, v: f32) -> bool {
        assign(&mut self.y, v, &mut self.version)
    }

    pub fn set_position(&mut self, x: f32, y: f32) -> bool {
        let a = self.set_x(x);
        let b = self.set_y(y);
        a || b
    }

    pub fn set_rotation(&mut self, radians: f32) -> bool {
        let changed = assign(&mut self.rotation, radians, &mut self.version);
        self.rotation_dirty |= changed;
        changed
    }

    pub fn set_skew(&mut self, x: f32, y: f32) -> bool {
        let a = assign(&mut self.skew_x, x, &mut self.version);
        let b = assign(&mut self.skew_y, y, &mut self.version);
        self.rotation_dirty |= a || b;
        a || b
    }

    /// Anchor in unit-quad coordinates; `(0.5, 0.5)` pivots around the center.
    pub fn set_anchor(&mut self, x: f32, y: f32) -> bool {
        let a = assign(&mut self.anchor_x, x, &mut self.version);
        let b = assign(&mut self.anchor_y, y, &mut self.version);
        a || b
    }

    pub fn set_scale(&mut self, x: f32, y: f32) -> bool {
        let a = assign(&mut self.scale_x, x, &mut self.version);
        let b = assign(&mut self.scale_y, y, &mut self.version);
        self.scale_dirty |= a || b;
        a || b
    }

    pub fn set_size(&mut self, width: f32, height: f32) -> bool {
        let a = assign(&mut self.width, width, &mut self.version);
        let b = assign(&mut self.height, height, &mut self.version);
        self.scale_dirty |= a || b;
        a || b
    }

    fn refresh_rotation(&mut self) -> bool {
        if !self.rotation_dirty {
            return false;
        }
        let (sa, ca) = (self.rotation + self.skew_y).sin_cos();
        let (sb, cb) = (self.rotation - self.skew_x).sin_cos();
        self.rot_terms = [ca, sa, -sb, cb];
        self.rotation_dirty = false;
        self.version.bump();
        true
    }

    fn refresh_scale(&mut self) -> bool {
        if !self.scale_dirty {
            return false;
        }
        self.scaled_width = self.width * self.scale_x;
        self.scaled_height = self.height * self.scale_y;
        self.scale_dirty = false;
        self.version.bump();
        true
    }
}

impl Versioned for TransformState {
    #[inline]
    fn version(&self) -> Version {
        self.version
    }
}

impl Composable2DTransform for TransformState {
    fn refresh(&mut self) -> bool {
        let r = self.refresh_rotation();
        let s = self.refresh_scale();
        r || s
    }

    fn local_matrix(&self) -> Affine2 {
        let [ca, sa, cb, sb] = self.rot_terms;
        let a = ca * self.scale_x;
        let b = sa * self.scale_x;
        let c = cb * self.scale_y;
        let d = sb * self.scale_y;
        // The anchor point of the quad lands on (x, y).
        let px = self.anchor_x * self.scaled_width;
        let py = self.anchor_y * self.scaled_height;
        Affine2::new(
            a,
            b,
            c,
            d,
            self.x - (ca * px + cb * py),
            self.y - (sa * px + sb * py),
        )
    }

    fn size(&self) -> (f32, f32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::Vec2;

    #[test]
    fn setter_bumps_version_only_on_change() {
        let mut t = TransformState::new();
        let v0 = t.version();
        assert!(t.set_x(10.0));
        let v1 = t.version();
        assert!(v1 > v0);
        assert!(!t.set_x(10.0));
        assert_eq!(t.version(), v1);
    }

    #[test]
    fn rotation_chain_is_lazy() {
        let mut t = TransformState::new();
        t.set_rotation(core::f32::consts::FRAC_PI_2);
        // Terms still describe the old rotation until refreshed.
        assert_eq!(t.local_matrix().a, 1.0);
        assert!(t.refresh());
        assert!(t.local_matrix().a.abs() < 1e-6);
        assert!(!t.refresh());
    }

    #[test]
    fn refresh_bumps_version() {
        let mut t = TransformState::new();
        t.set_scale(2.0, 2.0);
        let before = t.version();
        t.refresh();
        assert!(t.version() > before);
    }

    #[test]
    fn anchor_point_lands_on_position() {
        let mut t = TransformState::with_size(100.0, 50.0);
        t.set_anchor(0.5, 0.5);
        t.set_position(300.0, 200.0);
        t.set_rotation(0.9);
        t.set_scale(2.0, 3.0);
        t.refresh();
        let quad = t.local_matrix().scale_local(t.width(), t.height());
        let p = quad.transform_point(Vec2::new(0.5, 0.5));
        assert!((p.x - 300.0).abs() < 1e-3);
        assert!((p.y - 200.0).abs() < 1e-3);
    }
}
