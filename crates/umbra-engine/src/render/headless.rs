//! GPU-free backend that records every call.
//!
//! Used by the test suite and handy for profiling batching decisions without a
//! device: each draw captures the state it would have been issued with.

use std::collections::{HashMap, HashSet};

use crate::coords::ColorRgba;

use super::api::{
    FramebufferHandle, GpuApi, GpuLimits, ProgramDesc, ProgramHandle, ProgramInfo, TargetHandle,
    TextureDesc, TextureHandle, resolve_locations,
};
use super::{BlendMode, RenderError};

/// State captured at one `draw_instanced` call.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub program: Option<ProgramHandle>,
    pub program_name: Option<&'static str>,
    pub blend: BlendMode,
    pub target: TargetHandle,
    /// Texture per unit at draw time.
    pub units: Vec<Option<TextureHandle>>,
    pub instance_count: u32,
    pub uniforms: Vec<u8>,
    pub instances: Vec<u8>,
}

impl DrawRecord {
    /// Instance bytes reinterpreted as `T` records.
    pub fn instances_as<T: bytemuck::Pod>(&self) -> Vec<T> {
        self.instances
            .chunks_exact(size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
            .collect()
    }

    pub fn uniforms_as<T: bytemuck::Pod>(&self) -> Option<T> {
        self.uniforms
            .get(..size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClearRecord {
    pub target: TargetHandle,
    pub color: ColorRgba,
}

#[derive(Debug, Clone)]
pub struct HeadlessTexture {
    pub desc: TextureDesc,
    pub pixels: Option<Vec<u8>>,
    pub uploads: u32,
}

#[derive(Debug)]
pub struct HeadlessApi {
    limits: GpuLimits,
    surface: (u32, u32),
    lost: bool,
    failing: HashSet<&'static str>,

    next_id: u32,
    programs: HashMap<ProgramHandle, &'static str>,
    textures: HashMap<TextureHandle, HeadlessTexture>,
    framebuffers: HashMap<FramebufferHandle, TextureHandle>,

    program: Option<ProgramHandle>,
    blend: BlendMode,
    target: TargetHandle,
    units: Vec<Option<TextureHandle>>,
    uniforms: Vec<u8>,
    instances: Vec<u8>,

    pub draws: Vec<DrawRecord>,
    pub clears: Vec<ClearRecord>,
    pub programs_created: u32,
    pub texture_binds: u32,
}

impl Default for HeadlessApi {
    fn default() -> Self {
        Self::new(800, 600)
    }
}

impl HeadlessApi {
    pub fn new(width: u32, height: u32) -> Self {
        let limits = GpuLimits::default();
        Self {
            limits,
            surface: (width, height),
            lost: false,
            failing: HashSet::new(),
            next_id: 1,
            programs: HashMap::new(),
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            program: None,
            blend: BlendMode::Normal,
            target: TargetHandle::Screen,
            units: vec![None; limits.max_texture_units as usize],
            uniforms: Vec::new(),
            instances: Vec::new(),
            draws: Vec::new(),
            clears: Vec::new(),
            programs_created: 0,
            texture_binds: 0,
        }
    }

    pub fn with_texture_units(mut self, n: u32) -> Self {
        self.limits.max_texture_units = n;
        self.units = vec![None; n as usize];
        self
    }

    /// Makes every later build of the named program fail to link.
    pub fn fail_program(mut self, name: &'static str) -> Self {
        self.failing.insert(name);
        self
    }

    /// Simulates a device loss; the flag stays set.
    pub fn lose_context(&mut self) {
        self.lost = true;
    }

    pub fn set_surface_size(&mut self, width: u32, height: u32) {
        self.surface = (width, height);
    }

    pub fn texture(&self, handle: TextureHandle) -> Option<&HeadlessTexture> {
        self.textures.get(&handle)
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    /// Backing texture of a framebuffer.
    pub fn framebuffer_texture(&self, fb: FramebufferHandle) -> Option<TextureHandle> {
        self.framebuffers.get(&fb).copied()
    }

    pub fn take_draws(&mut self) -> Vec<DrawRecord> {
        std::mem::take(&mut self.draws)
    }

    fn next(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl GpuApi for HeadlessApi {
    fn limits(&self) -> GpuLimits {
        self.limits
    }

    fn surface_size(&self) -> (u32, u32) {
        self.surface
    }

    fn is_context_lost(&self) -> bool {
        self.lost
    }

    fn create_program(&mut self, desc: &ProgramDesc) -> Result<ProgramInfo, RenderError> {
        if self.lost {
            return Err(RenderError::ContextLost);
        }
        if self.failing.contains(desc.name) {
            return Err(RenderError::ProgramLink {
                program: desc.name.to_string(),
                log: "simulated link failure".to_string(),
            });
        }
        let locations = resolve_locations(desc)?;
        let handle = ProgramHandle(self.next());
        self.programs.insert(handle, desc.name);
        self.programs_created += 1;
        Ok(ProgramInfo { handle, locations })
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle, RenderError> {
        if self.lost {
            return Err(RenderError::ContextLost);
        }
        let handle = TextureHandle(self.next());
        self.textures.insert(handle, HeadlessTexture { desc: *desc, pixels: None, uploads: 0 });
        Ok(handle)
    }

    fn upload_texture(&mut self, texture: TextureHandle, pixels: &[u8]) -> Result<(), RenderError> {
        let tex = self
            .textures
            .get_mut(&texture)
            .ok_or_else(|| RenderError::Backend(format!("upload to unknown texture {texture:?}")))?;
        tex.pixels = Some(pixels.to_vec());
        tex.uploads += 1;
        Ok(())
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        self.textures.remove(&texture);
    }

    fn create_framebuffer(
        &mut self,
        desc: &TextureDesc,
    ) -> Result<(FramebufferHandle, TextureHandle), RenderError> {
        let texture = self.create_texture(desc)?;
        let fb = FramebufferHandle(self.next());
        self.framebuffers.insert(fb, texture);
        Ok((fb, texture))
    }

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        if let Some(tex) = self.framebuffers.remove(&framebuffer) {
            self.textures.remove(&tex);
        }
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.program = Some(program);
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>) {
        if let Some(slot) = self.units.get_mut(unit as usize) {
            *slot = texture;
        }
        if texture.is_some() {
            self.texture_binds += 1;
        }
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend = mode;
    }

    fn bind_target(&mut self, target: TargetHandle, clear: Option<ColorRgba>) {
        self.target = target;
        if let Some(color) = clear {
            self.clears.push(ClearRecord { target, color });
        }
    }

    fn set_uniforms(&mut self, bytes: &[u8]) {
        self.uniforms.clear();
        self.uniforms.extend_from_slice(bytes);
    }

    fn upload_instances(&mut self, bytes: &[u8]) {
        self.instances.clear();
        self.instances.extend_from_slice(bytes);
    }

    fn draw_instanced(&mut self, instance_count: u32) {
        self.draws.push(DrawRecord {
            program: self.program,
            program_name: self.program.and_then(|p| self.programs.get(&p).copied()),
            blend: self.blend,
            target: self.target,
            units: self.units.clone(),
            instance_count,
            uniforms: self.uniforms.clone(),
            instances: self.instances.clone(),
        });
    }
}
