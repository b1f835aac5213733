use slotmap::SlotMap;

use crate::coords::{ColorRgba, Viewport};

use super::api::{GpuApi, GpuLimits, ProgramHandle, TargetHandle};
use super::texture::{TextureId, TextureOptions, TextureResource, TextureSource, expected_len};
use super::{BlendMode, RenderError};

/// Destination of a pass.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum RenderTarget {
    Screen,
    /// A texture created with [`RenderContext::create_render_target`].
    Texture(TextureId),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum FrameStatus {
    Ready,
    /// The frame must be abandoned; call [`RenderContext::restore`] with a new backend.
    ContextLost,
}

/// Per-frame counters, reset by [`RenderContext::begin_frame`].
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct FrameStats {
    pub draw_calls: u32,
    pub instances: u32,
    /// Flushes forced by texture-unit exhaustion.
    pub unit_flushes: u32,
    pub texture_binds: u32,
    /// Bind requests answered by a texture already sitting in a unit.
    pub unit_hits: u32,
    pub uploads: u32,
    pub program_switches: u32,
    pub blend_switches: u32,
    pub target_switches: u32,
    /// Drawables skipped by culling.
    pub culled: u32,
}

/// Callback run after a context restore, with the new generation.
pub type RestoreListener = Box<dyn FnMut(u64)>;

/// Owns the GPU backend and every piece of state shared between renderers:
/// texture units, bound program, blend mode, target and the context generation.
///
/// All unit/program/blend changes go through this type so the bookkeeping and
/// the backend can never disagree.
pub struct RenderContext<A: GpuApi> {
    api: A,
    generation: u64,
    limits: GpuLimits,
    lost: bool,

    textures: SlotMap<TextureId, TextureResource>,
    units: Vec<Option<TextureId>>,
    // popped from the back; kept in descending order so the lowest unit goes first
    free_units: Vec<u32>,

    program: Option<ProgramHandle>,
    blend: Option<BlendMode>,
    target: Option<RenderTarget>,

    render_time: u64,
    stats: FrameStats,
    listeners: Vec<RestoreListener>,
}

impl<A: GpuApi> RenderContext<A> {
    pub fn new(api: A) -> Self {
        let limits = api.limits();
        let n = limits.max_texture_units.max(1);
        log::debug!("render context: {n} texture units");
        Self {
            api,
            generation: 1,
            limits,
            lost: false,
            textures: SlotMap::with_key(),
            units: vec![None; n as usize],
            free_units: (0..n).rev().collect(),
            program: None,
            blend: None,
            target: None,
            render_time: 0,
            stats: FrameStats::default(),
            listeners: Vec::new(),
        }
    }

    #[inline]
    pub fn api(&self) -> &A {
        &self.api
    }

    #[inline]
    pub fn api_mut(&mut self) -> &mut A {
        &mut self.api
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[inline]
    pub fn limits(&self) -> GpuLimits {
        self.limits
    }

    #[inline]
    pub fn stats(&self) -> FrameStats {
        self.stats
    }

    #[inline]
    pub(crate) fn stats_mut(&mut self) -> &mut FrameStats {
        &mut self.stats
    }

    #[inline]
    pub fn render_time(&self) -> u64 {
        self.render_time
    }

    #[inline]
    pub fn blend_mode(&self) -> Option<BlendMode> {
        self.blend
    }

    #[inline]
    pub fn current_target(&self) -> Option<RenderTarget> {
        self.target
    }

    /// Texture currently sitting in `unit`.
    pub fn unit_occupant(&self, unit: u32) -> Option<TextureId> {
        self.units.get(unit as usize).copied().flatten()
    }

    pub fn is_lost(&self) -> bool {
        self.lost
    }

    // ── frame lifecycle ────────────────────────────────────────────────────

    /// Starts a frame at `render_time` (a monotonic frame counter).
    pub fn begin_frame(&mut self, render_time: u64) -> FrameStatus {
        if self.lost || self.api.is_context_lost() {
            if !self.lost {
                log::warn!("GPU context lost (generation {})", self.generation);
                self.lost = true;
            }
            return FrameStatus::ContextLost;
        }
        self.render_time = render_time;
        self.stats = FrameStats::default();
        self.program = None;
        self.blend = None;
        self.target = None;
        self.api.begin_frame();
        FrameStatus::Ready
    }

    pub fn on_restore(&mut self, listener: impl FnMut(u64) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Swaps in a fresh backend after a loss.
    ///
    /// Every GPU object becomes stale: programs, textures and framebuffers are
    /// recreated lazily the next time they are used.
    pub fn restore(&mut self, api: A) {
        self.api = api;
        self.generation += 1;
        self.lost = false;
        self.limits = self.api.limits();
        let n = self.limits.max_texture_units.max(1);
        self.units = vec![None; n as usize];
        self.free_units = (0..n).rev().collect();
        self.program = None;
        self.blend = None;
        self.target = None;
        for tex in self.textures.values_mut() {
            tex.reset_stamps();
        }
        log::info!("GPU context restored (generation {})", self.generation);
        for listener in &mut self.listeners {
            listener(self.generation);
        }
    }

    // ── program / blend / target ───────────────────────────────────────────

    /// Makes `program` current. Switching programs drops all unit occupancy.
    pub fn use_program(&mut self, program: ProgramHandle) {
        if self.program == Some(program) {
            return;
        }
        self.api.use_program(program);
        self.program = Some(program);
        self.stats.program_switches += 1;
        self.clear_units();
    }

    pub fn current_program(&self) -> Option<ProgramHandle> {
        self.program
    }

    /// Returns `true` if the blend state changed.
    pub fn set_blend_mode(&mut self, mode: BlendMode) -> bool {
        if self.blend == Some(mode) {
            return false;
        }
        self.api.set_blend_mode(mode);
        self.blend = Some(mode);
        self.stats.blend_switches += 1;
        true
    }

    /// Routes subsequent draws to `target`, clearing it first if `clear` is set.
    ///
    /// A texture target is evicted from any unit so it is never sampled while
    /// being written.
    pub fn bind_render_target(
        &mut self,
        target: RenderTarget,
        clear: Option<ColorRgba>,
    ) -> Result<(), RenderError> {
        let handle = match target {
            RenderTarget::Screen => TargetHandle::Screen,
            RenderTarget::Texture(id) => {
                let tex = self.textures.get(id).ok_or(RenderError::UnknownTexture(id))?;
                if !tex.is_target() {
                    return Err(RenderError::NotRenderTarget(id));
                }
                self.evict(id);
                self.ensure_gpu_texture(id)?;
                let generation = self.generation;
                let tex = self.textures.get(id).ok_or(RenderError::UnknownTexture(id))?;
                match &tex.source {
                    TextureSource::Target { framebuffer } => framebuffer
                        .get(generation)
                        .map(|fb| TargetHandle::Framebuffer(*fb))
                        .ok_or_else(|| {
                            RenderError::Backend("framebuffer missing after creation".into())
                        })?,
                    TextureSource::Pixels { .. } => return Err(RenderError::NotRenderTarget(id)),
                }
            }
        };
        self.api.bind_target(handle, clear);
        self.target = Some(target);
        self.stats.target_switches += 1;
        Ok(())
    }

    /// Pixel size of `target`.
    pub fn target_size(&self, target: RenderTarget) -> (u32, u32) {
        match target {
            RenderTarget::Screen => self.api.surface_size(),
            RenderTarget::Texture(id) => self.texture_size(id).unwrap_or((1, 1)),
        }
    }

    pub fn target_viewport(&self, target: RenderTarget) -> Viewport {
        let (w, h) = self.target_size(target);
        Viewport::from_size(w, h)
    }

    // ── texture units ──────────────────────────────────────────────────────

    /// Returns the unit holding `id`, binding (and uploading) it if needed.
    ///
    /// When every unit is claimed by the current batch, `flush` is invoked so
    /// the pending draw is issued, all units are reclaimed and the lowest one
    /// is reused. The previous occupant of the chosen unit is evicted.
    pub fn bind_texture<F>(
        &mut self,
        id: TextureId,
        render_time: u64,
        mut flush: F,
    ) -> Result<u32, RenderError>
    where
        F: FnMut(&mut Self) -> Result<(), RenderError>,
    {
        let generation = self.generation;
        let tex = self.textures.get(id).ok_or(RenderError::UnknownTexture(id))?;
        if !tex.is_ready() {
            return Err(RenderError::TextureNotReady(id));
        }
        let needs_upload = tex.needs_upload(generation);

        if let Some(unit) = tex.unit {
            self.claim_unit(unit);
            if needs_upload {
                // in place; the unit keeps pointing at the same GPU texture
                self.upload(id)?;
            } else {
                self.stats.unit_hits += 1;
            }
            self.touch(id, render_time);
            return Ok(unit);
        }

        let unit = match self.free_units.pop() {
            Some(u) => u,
            None => {
                flush(self)?;
                self.stats.unit_flushes += 1;
                self.reclaim_units();
                self.free_units
                    .pop()
                    .ok_or_else(|| RenderError::Backend("no texture units available".into()))?
            }
        };

        if let Some(prev) = self.units[unit as usize].take() {
            if let Some(p) = self.textures.get_mut(prev) {
                p.unit = None;
            }
        }

        let handle = self.ensure_gpu_texture(id)?;
        if needs_upload {
            self.upload(id)?;
        }
        self.api.bind_texture(unit, Some(handle));
        self.stats.texture_binds += 1;

        self.units[unit as usize] = Some(id);
        if let Some(tex) = self.textures.get_mut(id) {
            tex.unit = Some(unit);
        }
        self.touch(id, render_time);
        Ok(unit)
    }

    /// Marks every unit free for the next batch. Occupants stay recorded so a
    /// texture requested again before being overwritten keeps its unit.
    pub fn reclaim_units(&mut self) {
        self.free_units.clear();
        self.free_units.extend((0..self.units.len() as u32).rev());
    }

    /// Empties every unit, on the backend too, so nothing bound for the
    /// previous program can alias a later render target.
    fn clear_units(&mut self) {
        for (unit, slot) in self.units.iter_mut().enumerate() {
            let Some(id) = slot.take() else { continue };
            self.api.bind_texture(unit as u32, None);
            if let Some(tex) = self.textures.get_mut(id) {
                tex.unit = None;
            }
        }
        self.reclaim_units();
    }

    fn claim_unit(&mut self, unit: u32) {
        self.free_units.retain(|&u| u != unit);
    }

    fn evict(&mut self, id: TextureId) {
        let Some(tex) = self.textures.get_mut(id) else { return };
        let Some(unit) = tex.unit.take() else { return };
        self.units[unit as usize] = None;
        self.api.bind_texture(unit, None);
        if !self.free_units.contains(&unit) {
            self.free_units.push(unit);
            self.free_units.sort_unstable_by(|a, b| b.cmp(a));
        }
    }

    fn touch(&mut self, id: TextureId, render_time: u64) {
        if let Some(tex) = self.textures.get_mut(id) {
            tex.last_used = render_time;
        }
    }

    fn ensure_gpu_texture(
        &mut self,
        id: TextureId,
    ) -> Result<super::api::TextureHandle, RenderError> {
        let generation = self.generation;
        let tex = self.textures.get_mut(id).ok_or(RenderError::UnknownTexture(id))?;
        if let Some(handle) = tex.gpu.get(generation) {
            return Ok(*handle);
        }
        let desc = tex.desc();
        let handle = match &mut tex.source {
            TextureSource::Pixels { .. } => self.api.create_texture(&desc)?,
            TextureSource::Target { framebuffer } => {
                let (fb, handle) = self.api.create_framebuffer(&desc)?;
                framebuffer.set(fb, generation);
                handle
            }
        };
        tex.gpu.set(handle, generation);
        Ok(handle)
    }

    fn upload(&mut self, id: TextureId) -> Result<(), RenderError> {
        let handle = self.ensure_gpu_texture(id)?;
        let tex = self.textures.get_mut(id).ok_or(RenderError::UnknownTexture(id))?;
        if let TextureSource::Pixels { data: Some(data), version, uploaded } = &mut tex.source {
            self.api.upload_texture(handle, data)?;
            uploaded.mark(*version);
            self.stats.uploads += 1;
        }
        Ok(())
    }

    fn release_gpu(&mut self, id: TextureId) {
        let generation = self.generation;
        self.evict(id);
        let Some(tex) = self.textures.get_mut(id) else { return };
        let current = tex.gpu.get(generation).is_some();
        if let Some(handle) = tex.gpu.take() {
            if current {
                self.api.destroy_texture(handle);
            }
        }
        match &mut tex.source {
            TextureSource::Target { framebuffer } => {
                let current = framebuffer.get(generation).is_some();
                if let Some(fb) = framebuffer.take() {
                    if current {
                        self.api.destroy_framebuffer(fb);
                    }
                }
            }
            TextureSource::Pixels { uploaded, .. } => uploaded.reset(),
        }
    }

    // ── texture lifecycle ──────────────────────────────────────────────────

    /// Registers RGBA8 pixels; the GPU copy is made on first bind.
    pub fn create_texture(
        &mut self,
        width: u32,
        height: u32,
        pixels: Vec<u8>,
        options: TextureOptions,
    ) -> Result<TextureId, RenderError> {
        let expected = expected_len(width, height);
        if pixels.len() != expected {
            return Err(RenderError::TextureDataSize { expected, actual: pixels.len() });
        }
        Ok(self
            .textures
            .insert(TextureResource::image(width, height, options, Some(pixels))))
    }

    /// Registers a texture whose pixels arrive later through [`Self::update_texture`].
    /// Drawables referencing it are skipped until then.
    pub fn create_pending_texture(
        &mut self,
        width: u32,
        height: u32,
        options: TextureOptions,
    ) -> TextureId {
        self.textures.insert(TextureResource::image(width, height, options, None))
    }

    /// Replaces the pixels; the next bind re-uploads them.
    pub fn update_texture(&mut self, id: TextureId, pixels: Vec<u8>) -> Result<(), RenderError> {
        let tex = self.textures.get_mut(id).ok_or(RenderError::UnknownTexture(id))?;
        let expected = expected_len(tex.width, tex.height);
        if pixels.len() != expected {
            return Err(RenderError::TextureDataSize { expected, actual: pixels.len() });
        }
        match &mut tex.source {
            TextureSource::Pixels { data, version, .. } => {
                *data = Some(pixels);
                version.bump();
                Ok(())
            }
            TextureSource::Target { .. } => Err(RenderError::NotRenderTarget(id)),
        }
    }

    pub fn remove_texture(&mut self, id: TextureId) -> Result<(), RenderError> {
        if !self.textures.contains_key(id) {
            return Err(RenderError::UnknownTexture(id));
        }
        self.release_gpu(id);
        self.textures.remove(id);
        Ok(())
    }

    /// Frees GPU copies of image textures not bound for more than `max_idle`
    /// render ticks. CPU pixels are kept; a later bind re-uploads. Returns the
    /// number of textures released.
    pub fn purge_unused(&mut self, max_idle: u64) -> usize {
        let generation = self.generation;
        let now = self.render_time;
        let idle: Vec<TextureId> = self
            .textures
            .iter()
            .filter(|(_, t)| {
                !t.is_target()
                    && t.gpu.get(generation).is_some()
                    && now.saturating_sub(t.last_used) > max_idle
            })
            .map(|(id, _)| id)
            .collect();
        for &id in &idle {
            self.release_gpu(id);
        }
        if !idle.is_empty() {
            log::debug!("purged {} idle textures", idle.len());
        }
        idle.len()
    }

    pub fn texture_ready(&self, id: TextureId) -> bool {
        self.textures.get(id).is_some_and(TextureResource::is_ready)
    }

    pub fn texture_size(&self, id: TextureId) -> Option<(u32, u32)> {
        self.textures.get(id).map(|t| (t.width, t.height))
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// `true` if `id` has a GPU copy for the current generation.
    pub fn texture_resident(&self, id: TextureId) -> bool {
        self.textures.get(id).is_some_and(|t| t.gpu.get(self.generation).is_some())
    }

    // ── render targets ─────────────────────────────────────────────────────

    pub fn create_render_target(&mut self, width: u32, height: u32) -> TextureId {
        self.textures.insert(TextureResource::target(width.max(1), height.max(1)))
    }

    /// Changes the size of a render target; its GPU objects are rebuilt on next use.
    pub fn resize_render_target(
        &mut self,
        id: TextureId,
        width: u32,
        height: u32,
    ) -> Result<(), RenderError> {
        let tex = self.textures.get(id).ok_or(RenderError::UnknownTexture(id))?;
        if !tex.is_target() {
            return Err(RenderError::NotRenderTarget(id));
        }
        let (width, height) = (width.max(1), height.max(1));
        if (tex.width, tex.height) == (width, height) {
            return Ok(());
        }
        self.release_gpu(id);
        if let Some(tex) = self.textures.get_mut(id) {
            tex.width = width;
            tex.height = height;
        }
        Ok(())
    }

    // ── draw funnel ────────────────────────────────────────────────────────

    pub fn set_uniforms(&mut self, bytes: &[u8]) {
        self.api.set_uniforms(bytes);
    }

    pub fn upload_instances(&mut self, bytes: &[u8]) {
        self.api.upload_instances(bytes);
    }

    pub fn draw_instanced(&mut self, instance_count: u32) {
        if instance_count == 0 {
            return;
        }
        self.api.draw_instanced(instance_count);
        self.stats.draw_calls += 1;
        self.stats.instances += instance_count;
    }
}
