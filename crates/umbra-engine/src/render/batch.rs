use bytemuck::Pod;

use super::api::{GpuApi, ProgramDesc};
use super::{BaseRenderer, RenderContext, RenderError};

/// Default instance ceiling per draw call.
pub const DEFAULT_BATCH_SIZE: usize = 4096;

/// Accumulates `I` records and draws them in as few instanced calls as the
/// ceiling allows.
#[derive(Debug)]
pub struct BatchRenderer<I: Pod> {
    base: BaseRenderer,
    instances: Vec<I>,
    ceiling: usize,
    uniforms: Vec<u8>,
    flushes: u32,
}

impl<I: Pod> BatchRenderer<I> {
    pub fn new<A: GpuApi>(
        ctx: &mut RenderContext<A>,
        desc: ProgramDesc,
        ceiling: usize,
    ) -> Result<Self, RenderError> {
        let ceiling = ceiling.max(1);
        Ok(Self {
            base: BaseRenderer::new(ctx, desc)?,
            instances: Vec::with_capacity(ceiling),
            ceiling,
            uniforms: Vec::new(),
            flushes: 0,
        })
    }

    #[inline]
    pub fn base(&self) -> &BaseRenderer {
        &self.base
    }

    #[inline]
    pub fn base_mut(&mut self) -> &mut BaseRenderer {
        &mut self.base
    }

    #[inline]
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Instances waiting for the next flush.
    #[inline]
    pub fn pending(&self) -> usize {
        self.instances.len()
    }

    /// Draw calls issued since the last [`Self::reset_flushes`].
    #[inline]
    pub fn flushes(&self) -> u32 {
        self.flushes
    }

    pub fn reset_flushes(&mut self) {
        self.flushes = 0;
    }

    /// Uniform block used by subsequent flushes.
    pub fn set_uniforms<U: Pod>(&mut self, uniforms: &U) {
        self.uniforms.clear();
        self.uniforms.extend_from_slice(bytemuck::bytes_of(uniforms));
    }

    /// Appends one record, flushing when the ceiling is reached.
    pub fn push<A: GpuApi>(
        &mut self,
        ctx: &mut RenderContext<A>,
        instance: I,
    ) -> Result<(), RenderError> {
        self.instances.push(instance);
        if self.instances.len() >= self.ceiling {
            self.flush(ctx)?;
        }
        Ok(())
    }

    /// Issues one draw for everything pending. Returns `false` if there was nothing to draw.
    pub fn flush<A: GpuApi>(&mut self, ctx: &mut RenderContext<A>) -> Result<bool, RenderError> {
        if self.instances.is_empty() {
            return Ok(false);
        }
        let count = self.instances.len() as u32;
        self.base
            .draw_instances(ctx, &self.uniforms, bytemuck::cast_slice(&self.instances), count)?;
        self.instances.clear();
        self.flushes += 1;
        // Units used by the drawn batch may be reassigned now.
        ctx.reclaim_units();
        Ok(true)
    }

    /// Drops pending records without drawing, e.g. when a frame is abandoned.
    pub fn discard(&mut self) {
        self.instances.clear();
    }
}
