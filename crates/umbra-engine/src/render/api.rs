//! Boundary between the render layer and a concrete GPU.
//!
//! [`RenderContext`](super::RenderContext) is the only caller; renderers reach
//! the GPU through it. The trait is a small state machine in the spirit of a
//! classic immediate-mode API: bind program, textures, blend and target, then
//! upload uniforms/instances and draw.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::coords::ColorRgba;

use super::{BlendMode, RenderError};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ProgramHandle(pub u32);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureHandle(pub u32);

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct FramebufferHandle(pub u32);

/// Where draws land.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TargetHandle {
    Screen,
    Framebuffer(FramebufferHandle),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct GpuLimits {
    /// Number of texture units a program can sample in one draw.
    pub max_texture_units: u32,
    pub max_texture_size: u32,
}

impl Default for GpuLimits {
    fn default() -> Self {
        Self { max_texture_units: 8, max_texture_size: 4096 }
    }
}

#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum TextureFilter {
    #[default]
    Linear,
    Nearest,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub filter: TextureFilter,
    /// Wrap instead of clamping outside `0..1`.
    pub repeat: bool,
}

/// A compiled program as handed over by the shader builder.
///
/// `source` is opaque to the render layer. `attributes` and `uniforms` are the
/// names the owning renderer will look up; the backend resolves each one to a
/// location and fails the build if a name is missing.
#[derive(Debug, Clone)]
pub struct ProgramDesc {
    pub name: &'static str,
    pub source: Cow<'static, str>,
    pub attributes: &'static [&'static str],
    pub uniforms: &'static [&'static str],
    /// Per-instance vertex attributes (slot 1). Empty for full-screen programs.
    pub instance_layout: &'static [wgpu::VertexAttribute],
    pub instance_stride: u64,
}

/// A built program plus its name → location table.
#[derive(Debug, Clone)]
pub struct ProgramInfo {
    pub handle: ProgramHandle,
    pub locations: HashMap<&'static str, u32>,
}

impl ProgramInfo {
    pub fn location(&self, name: &str) -> Option<u32> {
        self.locations.get(name).copied()
    }
}

/// Resolves locations the way both bundled backends do: attributes follow the
/// quad position at location 0, uniforms are numbered in declaration order.
pub(crate) fn resolve_locations(
    desc: &ProgramDesc,
) -> Result<HashMap<&'static str, u32>, RenderError> {
    let mut locations = HashMap::with_capacity(desc.attributes.len() + desc.uniforms.len());
    for (i, name) in desc.attributes.iter().enumerate() {
        locations.insert(*name, i as u32 + 1);
    }
    for (i, name) in desc.uniforms.iter().enumerate() {
        locations.insert(*name, i as u32);
    }
    for name in desc.attributes.iter().chain(desc.uniforms) {
        if !desc.source.contains(name) {
            return Err(RenderError::MissingSymbol {
                program: desc.name.to_string(),
                name: name.to_string(),
            });
        }
    }
    Ok(locations)
}

pub trait GpuApi {
    fn limits(&self) -> GpuLimits;

    /// Size of the visible surface in pixels.
    fn surface_size(&self) -> (u32, u32);

    /// Latched once the device reports a loss; stays set until the backend is replaced.
    fn is_context_lost(&self) -> bool;

    /// Start of a frame; backends that record drop anything left from the last one.
    fn begin_frame(&mut self) {}

    fn create_program(&mut self, desc: &ProgramDesc) -> Result<ProgramInfo, RenderError>;

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle, RenderError>;

    /// Replaces the full contents of `texture` with tightly packed RGBA8 rows.
    fn upload_texture(&mut self, texture: TextureHandle, pixels: &[u8]) -> Result<(), RenderError>;

    fn destroy_texture(&mut self, texture: TextureHandle);

    /// Creates an offscreen target and the texture that backs its color attachment.
    fn create_framebuffer(&mut self, desc: &TextureDesc)
    -> Result<(FramebufferHandle, TextureHandle), RenderError>;

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle);

    fn use_program(&mut self, program: ProgramHandle);

    /// `None` leaves the unit empty.
    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>);

    fn set_blend_mode(&mut self, mode: BlendMode);

    fn bind_target(&mut self, target: TargetHandle, clear: Option<ColorRgba>);

    /// Uniform block for the following draws.
    fn set_uniforms(&mut self, bytes: &[u8]);

    /// Instance data for the next draw.
    fn upload_instances(&mut self, bytes: &[u8]);

    fn draw_instanced(&mut self, instance_count: u32);
}
