use crate::coords::ColorRgba;

use super::api::{
    FramebufferHandle, GpuApi, GpuLimits, ProgramDesc, ProgramHandle, ProgramInfo, TargetHandle,
    TextureDesc, TextureHandle,
};
use super::{BlendMode, RenderError};

/// Wraps a backend and logs every call at `trace` level.
///
/// Enable with `RUST_LOG=umbra_engine::render::tracing=trace`.
#[derive(Debug)]
pub struct TracingApi<A> {
    inner: A,
    calls: u64,
}

impl<A: GpuApi> TracingApi<A> {
    pub fn new(inner: A) -> Self {
        Self { inner, calls: 0 }
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut A {
        &mut self.inner
    }

    pub fn into_inner(self) -> A {
        self.inner
    }

    /// Calls forwarded since creation.
    pub fn calls(&self) -> u64 {
        self.calls
    }

    fn log(&mut self, args: std::fmt::Arguments<'_>) {
        self.calls += 1;
        log::trace!("gpu#{} {}", self.calls, args);
    }
}

impl<A: GpuApi> GpuApi for TracingApi<A> {
    fn limits(&self) -> GpuLimits {
        self.inner.limits()
    }

    fn surface_size(&self) -> (u32, u32) {
        self.inner.surface_size()
    }

    fn is_context_lost(&self) -> bool {
        self.inner.is_context_lost()
    }

    fn begin_frame(&mut self) {
        self.log(format_args!("begin_frame"));
        self.inner.begin_frame();
    }

    fn create_program(&mut self, desc: &ProgramDesc) -> Result<ProgramInfo, RenderError> {
        self.log(format_args!("create_program {}", desc.name));
        let result = self.inner.create_program(desc);
        if let Err(e) = &result {
            log::trace!("  -> {e}");
        }
        result
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle, RenderError> {
        self.log(format_args!("create_texture {}x{}", desc.width, desc.height));
        self.inner.create_texture(desc)
    }

    fn upload_texture(&mut self, texture: TextureHandle, pixels: &[u8]) -> Result<(), RenderError> {
        self.log(format_args!("upload_texture {texture:?} ({} bytes)", pixels.len()));
        self.inner.upload_texture(texture, pixels)
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        self.log(format_args!("destroy_texture {texture:?}"));
        self.inner.destroy_texture(texture);
    }

    fn create_framebuffer(
        &mut self,
        desc: &TextureDesc,
    ) -> Result<(FramebufferHandle, TextureHandle), RenderError> {
        self.log(format_args!("create_framebuffer {}x{}", desc.width, desc.height));
        self.inner.create_framebuffer(desc)
    }

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        self.log(format_args!("destroy_framebuffer {framebuffer:?}"));
        self.inner.destroy_framebuffer(framebuffer);
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.log(format_args!("use_program {program:?}"));
        self.inner.use_program(program);
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>) {
        self.log(format_args!("bind_texture unit={unit} {texture:?}"));
        self.inner.bind_texture(unit, texture);
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.log(format_args!("set_blend_mode {mode:?}"));
        self.inner.set_blend_mode(mode);
    }

    fn bind_target(&mut self, target: TargetHandle, clear: Option<ColorRgba>) {
        self.log(format_args!("bind_target {target:?} clear={clear:?}"));
        self.inner.bind_target(target, clear);
    }

    fn set_uniforms(&mut self, bytes: &[u8]) {
        self.log(format_args!("set_uniforms ({} bytes)", bytes.len()));
        self.inner.set_uniforms(bytes);
    }

    fn upload_instances(&mut self, bytes: &[u8]) {
        self.log(format_args!("upload_instances ({} bytes)", bytes.len()));
        self.inner.upload_instances(bytes);
    }

    fn draw_instanced(&mut self, instance_count: u32) {
        self.log(format_args!("draw_instanced {instance_count}"));
        self.inner.draw_instanced(instance_count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HeadlessApi;

    #[test]
    fn forwards_to_inner() {
        let mut api = TracingApi::new(HeadlessApi::default());
        api.set_blend_mode(BlendMode::Add);
        api.draw_instanced(3);
        assert_eq!(api.calls(), 2);
        let inner = api.into_inner();
        assert_eq!(inner.draws.len(), 1);
        assert_eq!(inner.draws[0].blend, BlendMode::Add);
        assert_eq!(inner.draws[0].instance_count, 3);
    }
}
