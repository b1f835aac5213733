use core::ops::BitOr;

use crate::coords::ColorRgba;

/// Light shape.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum LightKind {
    /// Radial falloff around the light position.
    #[default]
    Point = 0,
    /// Cone of `half_angle` around `direction`, with radial falloff.
    Spot = 1,
    /// Parallel rays along `direction`; radius bounds the lit area.
    Directional = 2,
}

/// Per-light feature bits read by the light shader.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub struct LightFlags(pub u32);

impl LightFlags {
    pub const NONE: Self = Self(0);
    pub const CAST_SHADOW: Self = Self(1);
    pub const SPECULAR: Self = Self(2);
    /// Shadows ignore occluder height and extend the full march length.
    pub const FLATTEN_SHADOW: Self = Self(4);
    /// Jitters the shadow march start to trade banding for noise.
    pub const JITTER: Self = Self(8);

    #[inline]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn set(&mut self, other: Self, on: bool) {
        if on {
            self.0 |= other.0;
        } else {
            self.0 &= !other.0;
        }
    }

    #[inline]
    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for LightFlags {
    type Output = LightFlags;

    #[inline]
    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Payload of a light node. Position comes from the node's world matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub kind: LightKind,
    /// Reach in pixels, before world scale.
    pub radius: f32,
    /// Height above the ground plane, in the units of the height map (0..1).
    pub height: f32,
    pub color: ColorRgba,
    pub intensity: f32,
    /// Shadow march length as a fraction of the radius.
    pub shadow_length: f32,
    /// Shadow march sample count.
    pub precision: u32,
    pub specular: f32,
    /// Falloff exponent applied to `1 - d / radius`.
    pub attenuation: f32,
    /// Direction of spot and directional lights, radians, before world rotation.
    pub direction: f32,
    /// Half cone angle of spot lights, radians.
    pub half_angle: f32,
    pub flags: LightFlags,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            kind: LightKind::Point,
            radius: 256.0,
            height: 0.5,
            color: ColorRgba::WHITE,
            intensity: 1.0,
            shadow_length: 1.0,
            precision: 32,
            specular: 0.0,
            attenuation: 2.0,
            direction: 0.0,
            half_angle: core::f32::consts::FRAC_PI_4,
            flags: LightFlags::CAST_SHADOW,
        }
    }
}

impl Light {
    pub fn point(radius: f32, color: ColorRgba) -> Self {
        Self { radius, color, ..Self::default() }
    }

    pub fn spot(radius: f32, direction: f32, half_angle: f32, color: ColorRgba) -> Self {
        Self {
            kind: LightKind::Spot,
            radius,
            direction,
            half_angle,
            color,
            ..Self::default()
        }
    }

    pub fn directional(radius: f32, direction: f32, color: ColorRgba) -> Self {
        Self {
            kind: LightKind::Directional,
            radius,
            direction,
            color,
            ..Self::default()
        }
    }

    pub fn with_flags(mut self, flags: LightFlags) -> Self {
        self.flags = flags;
        self
    }
}
