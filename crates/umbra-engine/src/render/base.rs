use crate::coords::ColorRgba;
use crate::versioned::GpuSlot;

use super::api::{GpuApi, ProgramDesc, ProgramInfo};
use super::{RenderContext, RenderError, RenderTarget};

/// Lifecycle shared by every renderer: one program, built once per context
/// generation, plus target attach and draw helpers.
#[derive(Debug)]
pub struct BaseRenderer {
    desc: ProgramDesc,
    program: GpuSlot<ProgramInfo>,
    unusable: bool,
}

impl BaseRenderer {
    /// Builds the program eagerly. A link failure is logged and returned; the
    /// caller must not keep using the pipeline.
    pub fn new<A: GpuApi>(
        ctx: &mut RenderContext<A>,
        desc: ProgramDesc,
    ) -> Result<Self, RenderError> {
        let mut base = Self {
            desc,
            program: GpuSlot::new(),
            unusable: false,
        };
        base.program(ctx)?;
        base.check_instance_layout()?;
        log::debug!("renderer `{}` ready", base.desc.name);
        Ok(base)
    }

    /// Every declared attribute must feed the instance slot at its resolved location.
    fn check_instance_layout(&self) -> Result<(), RenderError> {
        let desc = &self.desc;
        if desc.attributes.len() != desc.instance_layout.len() {
            return Err(RenderError::Backend(format!(
                "program `{}` declares {} attributes for {} instance slots",
                desc.name,
                desc.attributes.len(),
                desc.instance_layout.len()
            )));
        }
        for (name, slot) in desc.attributes.iter().zip(desc.instance_layout) {
            let location = self.location(name).ok_or_else(|| RenderError::MissingSymbol {
                program: desc.name.to_string(),
                name: name.to_string(),
            })?;
            if location != slot.shader_location {
                return Err(RenderError::Backend(format!(
                    "program `{}`: `{name}` resolves to location {location}, its slot is {}",
                    desc.name, slot.shader_location
                )));
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &'static str {
        self.desc.name
    }

    pub fn is_usable(&self) -> bool {
        !self.unusable
    }

    /// Current program, rebuilding it if the context generation moved on.
    pub fn program<A: GpuApi>(
        &mut self,
        ctx: &mut RenderContext<A>,
    ) -> Result<&ProgramInfo, RenderError> {
        if self.unusable {
            return Err(RenderError::RendererUnusable(self.desc.name.to_string()));
        }
        let generation = ctx.generation();
        let desc = &self.desc;
        let unusable = &mut self.unusable;
        self.program.get_or_try_create(generation, || {
            ctx.api_mut().create_program(desc).inspect_err(|e| {
                if !matches!(e, RenderError::ContextLost) {
                    log::error!("failed to build program `{}`: {e}", desc.name);
                    *unusable = true;
                }
            })
        })
    }

    /// Name → location table of the current program.
    pub fn location(&self, name: &str) -> Option<u32> {
        let generation = self.program.created_at()?;
        self.program.get(generation)?.location(name)
    }

    /// Makes this renderer's program current.
    pub fn activate<A: GpuApi>(&mut self, ctx: &mut RenderContext<A>) -> Result<(), RenderError> {
        let handle = self.program(ctx)?.handle;
        ctx.use_program(handle);
        Ok(())
    }

    /// Binds `target` for drawing, clearing it first if `clear` is set.
    pub fn attach_target<A: GpuApi>(
        &self,
        ctx: &mut RenderContext<A>,
        target: RenderTarget,
        clear: Option<ColorRgba>,
    ) -> Result<(), RenderError> {
        ctx.bind_render_target(target, clear)
    }

    /// One instanced draw of the unit quad.
    pub fn draw_instances<A: GpuApi>(
        &mut self,
        ctx: &mut RenderContext<A>,
        uniforms: &[u8],
        instances: &[u8],
        count: u32,
    ) -> Result<(), RenderError> {
        self.activate(ctx)?;
        ctx.set_uniforms(uniforms);
        ctx.upload_instances(instances);
        ctx.draw_instanced(count);
        Ok(())
    }

    /// Draws the unit quad stretched over the whole target.
    pub fn draw_fullscreen<A: GpuApi>(
        &mut self,
        ctx: &mut RenderContext<A>,
        uniforms: &[u8],
    ) -> Result<(), RenderError> {
        self.draw_instances(ctx, uniforms, &[], 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::HeadlessApi;
    use crate::render::light::light_program;
    use crate::render::stage::stage_program;

    const SWAPPED: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![2 => Float32, 1 => Float32];
    const ORDERED: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![1 => Float32, 2 => Float32];

    fn desc(instance_layout: &'static [wgpu::VertexAttribute]) -> ProgramDesc {
        ProgramDesc {
            name: "pair",
            source: "i_first i_second u_size".into(),
            attributes: &["i_first", "i_second"],
            uniforms: &["u_size"],
            instance_layout,
            instance_stride: 8,
        }
    }

    #[test]
    fn locations_follow_declaration_order() {
        let mut ctx = RenderContext::new(HeadlessApi::new(16, 16));
        let base = BaseRenderer::new(&mut ctx, desc(&ORDERED)).unwrap();
        assert_eq!(base.location("i_first"), Some(1));
        assert_eq!(base.location("i_second"), Some(2));
        assert_eq!(base.location("u_size"), Some(0));
        assert_eq!(base.location("i_missing"), None);
    }

    #[test]
    fn slot_out_of_declaration_order_is_rejected() {
        let mut ctx = RenderContext::new(HeadlessApi::new(16, 16));
        let err = BaseRenderer::new(&mut ctx, desc(&SWAPPED)).unwrap_err();
        assert!(matches!(err, RenderError::Backend(msg) if msg.contains("i_first")));
    }

    #[test]
    fn bundled_programs_match_their_layouts() {
        let mut ctx = RenderContext::new(HeadlessApi::new(16, 16));
        for desc in [stage_program(), light_program()] {
            BaseRenderer::new(&mut ctx, desc).unwrap();
        }
    }
}
