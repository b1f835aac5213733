use bytemuck::{Pod, Zeroable};

use crate::coords::{Affine2, ColorRgba, Vec2};
use crate::scene::{Light, NodeKind, Scene};

use super::api::{GpuApi, ProgramDesc};
use super::batch::BatchRenderer;
use super::{BlendMode, RenderContext, RenderError, RenderTarget, TextureId};

pub const DEFAULT_MAX_LIGHTS: usize = 64;

#[derive(Debug, Clone)]
pub struct LightConfig {
    /// Lights registered past this count in one frame are ignored.
    pub max_lights: usize,
    /// Seed for the shadow-march jitter hash.
    pub jitter_seed: u32,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            max_lights: DEFAULT_MAX_LIGHTS,
            jitter_seed: 0x9e37_79b9,
        }
    }
}

/// Surface description the lights shade.
///
/// Height map channels: `r` = occluder top, `g` = occluder bottom,
/// `b` = roughness when no roughness map is given.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LightMaps {
    pub height: TextureId,
    pub normal: Option<TextureId>,
    pub roughness: Option<TextureId>,
}

/// Pose and color half of a light record.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct LightPose {
    pub position: [f32; 2],
    pub height: f32,
    pub radius: f32,
    /// `rgb * intensity`, `a` = light alpha × node world alpha.
    pub color: [f32; 4],
    pub direction: f32,
    pub half_angle: f32,
    pub shadow_length: f32,
    pub kind: u32,
}

/// Flags and sampling half of a light record.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct LightExt {
    pub flags: u32,
    pub precision: u32,
    pub specular: f32,
    pub attenuation: f32,
}

/// The two shared arrays lights write into; slot `i` of both belongs to light `i`.
#[derive(Debug, Clone)]
pub struct LightBuffers {
    pose: Vec<LightPose>,
    ext: Vec<LightExt>,
    count: usize,
}

impl LightBuffers {
    pub fn with_capacity(max: usize) -> Self {
        Self {
            pose: vec![LightPose::default(); max],
            ext: vec![LightExt::default(); max],
            count: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.pose.len()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn pose(&self) -> &[LightPose] {
        &self.pose[..self.count]
    }

    pub fn ext(&self) -> &[LightExt] {
        &self.ext[..self.count]
    }

    fn clear(&mut self) {
        self.count = 0;
    }

    /// Writes `light` into the next slot. `None` once full.
    fn write(&mut self, light: &Light, world: &Affine2, world_color: ColorRgba) -> Option<u32> {
        if self.count >= self.capacity() {
            return None;
        }
        let slot = self.count;
        let position = world.transform_point(Vec2::zero());
        let scale = world.transform_vector(Vec2::new(1.0, 0.0)).length();
        let dir = world.transform_vector(Vec2::new(light.direction.cos(), light.direction.sin()));
        let c = light.color;
        self.pose[slot] = LightPose {
            position: [position.x, position.y],
            height: light.height,
            radius: light.radius * scale,
            color: [
                c.r * light.intensity,
                c.g * light.intensity,
                c.b * light.intensity,
                c.a * world_color.a,
            ],
            direction: dir.y.atan2(dir.x),
            half_angle: light.half_angle,
            shadow_length: light.shadow_length,
            kind: light.kind as u32,
        };
        self.ext[slot] = LightExt {
            flags: light.flags.bits(),
            precision: light.precision.max(1),
            specular: light.specular,
            attenuation: light.attenuation,
        };
        self.count += 1;
        Some(slot as u32)
    }
}

/// Interleaved record uploaded as instance data.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LightInstance {
    pub pose: LightPose,
    pub ext: LightExt,
}

impl LightInstance {
    pub const ATTRS: [wgpu::VertexAttribute; 9] = wgpu::vertex_attr_array![
        1 => Float32x2, // position
        2 => Float32,   // height
        3 => Float32,   // radius
        4 => Float32x4, // color
        5 => Float32x2, // direction, half_angle
        6 => Float32,   // shadow_length
        7 => Uint32,    // kind
        8 => Uint32x2,  // flags, precision
        9 => Float32x2  // specular, attenuation
    ];
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct LightUniforms {
    pub viewport: [f32; 2],
    pub seed: u32,
    /// bit 0: normal map bound, bit 1: roughness map bound
    pub maps: u32,
    /// height, normal, roughness units
    pub units: [u32; 4],
}

pub fn light_program() -> ProgramDesc {
    ProgramDesc {
        name: "light",
        source: include_str!("shaders/light.wgsl").into(),
        attributes: &[
            "l_position",
            "l_height",
            "l_radius",
            "l_color",
            "l_cone",
            "l_shadow_length",
            "l_kind",
            "l_flags",
            "l_shading",
        ],
        uniforms: &["u_viewport", "u_seed", "u_maps", "u_units"],
        instance_layout: &LightInstance::ATTRS,
        instance_stride: size_of::<LightInstance>() as u64,
    }
}

/// Accumulates lights each frame and shades them in one additive pass.
#[derive(Debug)]
pub struct LightRenderer {
    batch: BatchRenderer<LightInstance>,
    buffers: LightBuffers,
    config: LightConfig,
    dropped: usize,
}

impl LightRenderer {
    pub fn new<A: GpuApi>(
        ctx: &mut RenderContext<A>,
        config: LightConfig,
    ) -> Result<Self, RenderError> {
        let max = config.max_lights.max(1);
        Ok(Self {
            batch: BatchRenderer::new(ctx, light_program(), max)?,
            buffers: LightBuffers::with_capacity(max),
            config,
            dropped: 0,
        })
    }

    pub fn buffers(&self) -> &LightBuffers {
        &self.buffers
    }

    /// Lights ignored this frame because the buffers were full.
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Empties the buffers for a new frame.
    pub fn begin(&mut self) {
        self.buffers.clear();
        self.dropped = 0;
    }

    /// Registers one light; returns its slot, or `None` once the maximum is reached.
    pub fn register(
        &mut self,
        light: &Light,
        world: &Affine2,
        world_color: ColorRgba,
    ) -> Option<u32> {
        let slot = self.buffers.write(light, world, world_color);
        if slot.is_none() {
            if self.dropped == 0 {
                log::debug!(
                    "light buffer full ({} lights); extra lights ignored this frame",
                    self.buffers.capacity()
                );
            }
            self.dropped += 1;
        }
        slot
    }

    /// Registers every visible light node of an updated scene, in paint order.
    pub fn collect(&mut self, scene: &Scene) -> usize {
        let mut pending = vec![scene.root()];
        let mut added = 0;
        while let Some(id) = pending.pop() {
            let Some(node) = scene.get(id) else { continue };
            if !node.visible {
                continue;
            }
            if let NodeKind::Light(light) = &node.kind {
                if self.register(light, &node.world(), node.world_color()).is_some() {
                    added += 1;
                }
            }
            pending.extend(node.children().iter().rev());
        }
        added
    }

    /// Draws every registered light additively into `target`. Returns the
    /// number of lights drawn.
    ///
    /// A height map without pixel data yet skips the pass.
    pub fn render<A: GpuApi>(
        &mut self,
        ctx: &mut RenderContext<A>,
        maps: &LightMaps,
        target: RenderTarget,
    ) -> Result<usize, RenderError> {
        if self.buffers.is_empty() {
            return Ok(0);
        }
        if !ctx.texture_ready(maps.height) {
            return Ok(0);
        }

        self.batch.base_mut().activate(ctx)?;
        self.batch.base().attach_target(ctx, target, None)?;
        ctx.set_blend_mode(BlendMode::Add);

        let now = ctx.render_time();
        let nothing_pending = |_: &mut RenderContext<A>| Ok(());
        let height = ctx.bind_texture(maps.height, now, nothing_pending)?;
        // optional maps only take units that are left over; reclaiming would evict the height map
        let mut spare = ctx.limits().max_texture_units.saturating_sub(1);
        let mut bind_optional = |ctx: &mut RenderContext<A>, map: Option<TextureId>| {
            let Some(t) = map.filter(|&t| ctx.texture_ready(t)) else { return Ok(None) };
            if spare == 0 {
                log::debug!("no texture unit left for light map {t:?}; skipped");
                return Ok(None);
            }
            spare -= 1;
            ctx.bind_texture(t, now, nothing_pending).map(Some)
        };
        let normal = bind_optional(&mut *ctx, maps.normal)?;
        let roughness = bind_optional(&mut *ctx, maps.roughness)?;

        let viewport = ctx.target_viewport(target);
        self.batch.set_uniforms(&LightUniforms {
            viewport: [viewport.width, viewport.height],
            seed: self.config.jitter_seed,
            maps: normal.is_some() as u32 | (roughness.is_some() as u32) << 1,
            units: [height, normal.unwrap_or(0), roughness.unwrap_or(0), 0],
        });

        let count = self.buffers.len();
        for i in 0..count {
            let instance = LightInstance {
                pose: self.buffers.pose[i],
                ext: self.buffers.ext[i],
            };
            self.batch.push(ctx, instance)?;
        }
        self.batch.flush(ctx)?;
        Ok(count)
    }
}
