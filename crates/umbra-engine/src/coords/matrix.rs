use core::ops::Mul;

use super::Vec2;

/// 2×3 affine matrix.
///
/// Column layout `[a c tx; b d ty]`, i.e. a point maps as
/// `(a*x + c*y + tx, b*x + d*y + ty)`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Affine2 {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl Affine2 {
    pub const IDENTITY: Self = Self::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    #[inline]
    pub const fn new(a: f32, b: f32, c: f32, d: f32, tx: f32, ty: f32) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    #[inline]
    pub const fn translation(x: f32, y: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, x, y)
    }

    #[inline]
    pub const fn scale(sx: f32, sy: f32) -> Self {
        Self::new(sx, 0.0, 0.0, sy, 0.0, 0.0)
    }

    #[inline]
    pub fn rotation(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        Self::new(c, s, -s, c, 0.0, 0.0)
    }

    /// Returns `self * local`: `local` is applied first.
    #[inline]
    pub fn compose(&self, local: &Affine2) -> Affine2 {
        Affine2 {
            a: self.a * local.a + self.c * local.b,
            b: self.b * local.a + self.d * local.b,
            c: self.a * local.c + self.c * local.d,
            d: self.b * local.c + self.d * local.d,
            tx: self.a * local.tx + self.c * local.ty + self.tx,
            ty: self.b * local.tx + self.d * local.ty + self.ty,
        }
    }

    /// Post-multiplies by a scale, i.e. scales the local axes.
    #[inline]
    pub fn scale_local(&self, sx: f32, sy: f32) -> Affine2 {
        Affine2 {
            a: self.a * sx,
            b: self.b * sx,
            c: self.c * sy,
            d: self.d * sy,
            tx: self.tx,
            ty: self.ty,
        }
    }

    #[inline]
    pub fn determinant(&self) -> f32 {
        self.a * self.d - self.b * self.c
    }

    /// Returns the inverse, or `None` for singular / non-finite matrices.
    pub fn invert(&self) -> Option<Affine2> {
        let det = self.determinant();
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv = 1.0 / det;
        Some(Affine2 {
            a: self.d * inv,
            b: -self.b * inv,
            c: -self.c * inv,
            d: self.a * inv,
            tx: (self.c * self.ty - self.d * self.tx) * inv,
            ty: (self.b * self.tx - self.a * self.ty) * inv,
        })
    }

    #[inline]
    pub fn transform_point(&self, p: Vec2) -> Vec2 {
        Vec2::new(
            self.a * p.x + self.c * p.y + self.tx,
            self.b * p.x + self.d * p.y + self.ty,
        )
    }

    #[inline]
    pub fn transform_vector(&self, v: Vec2) -> Vec2 {
        Vec2::new(self.a * v.x + self.c * v.y, self.b * v.x + self.d * v.y)
    }

    /// Images of the unit-quad corners, clockwise from the top-left:
    /// `(0,0)`, `(1,0)`, `(1,1)`, `(0,1)`.
    pub fn corners(&self) -> [Vec2; 4] {
        [
            self.transform_point(Vec2::new(0.0, 0.0)),
            self.transform_point(Vec2::new(1.0, 0.0)),
            self.transform_point(Vec2::new(1.0, 1.0)),
            self.transform_point(Vec2::new(0.0, 1.0)),
        ]
    }

    /// Packs the linear part and the translation as two GPU-friendly arrays.
    #[inline]
    pub fn to_gpu(&self) -> ([f32; 4], [f32; 2]) {
        ([self.a, self.b, self.c, self.d], [self.tx, self.ty])
    }
}

impl Default for Affine2 {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Affine2 {
    type Output = Affine2;

    #[inline]
    fn mul(self, rhs: Affine2) -> Affine2 {
        self.compose(&rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: Vec2, b: Vec2) -> bool {
        (a.x - b.x).abs() < 1e-4 && (a.y - b.y).abs() < 1e-4
    }

    #[test]
    fn identity_is_neutral_for_compose() {
        let m = Affine2::new(2.0, 0.5, -1.0, 3.0, 10.0, -4.0);
        assert_eq!(Affine2::IDENTITY * m, m);
        assert_eq!(m * Affine2::IDENTITY, m);
    }

    #[test]
    fn compose_applies_local_first() {
        let parent = Affine2::translation(100.0, 0.0);
        let local = Affine2::scale(2.0, 2.0);
        let p = (parent * local).transform_point(Vec2::new(1.0, 1.0));
        assert!(close(p, Vec2::new(102.0, 2.0)));
    }

    #[test]
    fn rotation_quarter_turn() {
        let m = Affine2::rotation(core::f32::consts::FRAC_PI_2);
        assert!(close(m.transform_point(Vec2::new(1.0, 0.0)), Vec2::new(0.0, 1.0)));
    }

    #[test]
    fn invert_round_trips_points() {
        let m = Affine2::translation(5.0, 7.0) * Affine2::rotation(0.7) * Affine2::scale(3.0, 0.5);
        let inv = m.invert().unwrap();
        let p = Vec2::new(-2.5, 9.0);
        assert!(close(inv.transform_point(m.transform_point(p)), p));
        let id = m * inv;
        assert!(close(id.transform_point(p), p));
    }

    #[test]
    fn invert_singular_is_none() {
        assert!(Affine2::scale(0.0, 1.0).invert().is_none());
    }

    #[test]
    fn scale_local_matches_compose() {
        let m = Affine2::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0);
        assert_eq!(m.scale_local(2.0, 3.0), m * Affine2::scale(2.0, 3.0));
    }
}
