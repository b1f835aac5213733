use std::collections::HashSet;

use bytemuck::{Pod, Zeroable};

use crate::coords::{ColorRgba, Vec2, Viewport};
use crate::input::{InputEvent, InputFrame, InputState, MouseButtonState};
use crate::scene::{Node, NodeEvent, NodeEventKind, NodeId, NodeKind, Scene, SceneVisitor, Visit};

use super::api::{GpuApi, ProgramDesc};
use super::batch::{BatchRenderer, DEFAULT_BATCH_SIZE};
use super::{RenderContext, RenderError, RenderTarget, TextureId};

#[derive(Debug, Clone)]
pub struct StageConfig {
    /// Instance ceiling per draw call.
    pub batch_size: usize,
    /// Skip drawables whose bounds miss the target.
    pub cull: bool,
    /// Clear color applied when the target is attached.
    pub clear: Option<ColorRgba>,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            cull: true,
            clear: Some(ColorRgba::TRANSPARENT),
        }
    }
}

/// Pointer state consumed once per frame for hit-testing.
#[derive(Debug, Copy, Clone, Default)]
pub struct PointerInput<'a> {
    /// Surface pixels; `None` when the pointer is outside the surface.
    pub position: Option<Vec2>,
    pub events: &'a [InputEvent],
}

impl<'a> PointerInput<'a> {
    pub fn new(position: Option<Vec2>, events: &'a [InputEvent]) -> Self {
        Self { position, events }
    }

    pub fn from_input(state: &InputState, frame: &'a InputFrame) -> Self {
        Self {
            position: state.pointer(),
            events: &frame.events,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, Pod, Zeroable)]
pub struct StageUniforms {
    pub viewport: [f32; 2],
    pub _pad: [f32; 2],
}

/// Per-drawable record consumed by `stage.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ImageInstance {
    /// Linear part of the quad matrix (unit quad → pixels).
    pub matrix: [f32; 4],
    pub translate: [f32; 2],
    pub unit: u32,
    pub tint: u32,
    pub tex_matrix: [f32; 4],
    pub tex_translate: [f32; 2],
    /// Normalized `x, y, w, h` of the sampled sub-rectangle.
    pub crop: [f32; 4],
    pub color: [f32; 4],
    /// Corner offsets TL, TR in unit-quad space.
    pub distort0: [f32; 4],
    /// Corner offsets BR, BL.
    pub distort1: [f32; 4],
}

impl ImageInstance {
    pub const ATTRS: [wgpu::VertexAttribute; 10] = wgpu::vertex_attr_array![
        1 => Float32x4,  // matrix
        2 => Float32x2,  // translate
        3 => Uint32,     // unit
        4 => Uint32,     // tint
        5 => Float32x4,  // tex_matrix
        6 => Float32x2,  // tex_translate
        7 => Float32x4,  // crop
        8 => Float32x4,  // color
        9 => Float32x4,  // distort0
        10 => Float32x4  // distort1
    ];

    fn pack(node: &Node, unit: u32) -> Option<Self> {
        let d = node.drawable()?;
        let (matrix, translate) = node.quad_matrix().to_gpu();
        let (tex_matrix, tex_translate) = d.texture_matrix().to_gpu();
        let crop = d.crop();
        let (distort0, distort1) = d.distortion().to_gpu();
        Some(Self {
            matrix,
            translate,
            unit,
            tint: d.tint as u32,
            tex_matrix,
            tex_translate,
            crop: [crop.origin.x, crop.origin.y, crop.size.x, crop.size.y],
            color: node.world_color().to_array(),
            distort0,
            distort1,
        })
    }
}

pub const STAGE_ATTRIBUTES: &[&str] = &[
    "i_matrix",
    "i_translate",
    "i_unit",
    "i_tint",
    "i_tex_matrix",
    "i_tex_translate",
    "i_crop",
    "i_color",
    "i_distort0",
    "i_distort1",
];

pub fn stage_program() -> ProgramDesc {
    ProgramDesc {
        name: "stage",
        source: include_str!("shaders/stage.wgsl").into(),
        attributes: STAGE_ATTRIBUTES,
        uniforms: &["u_viewport"],
        instance_layout: &ImageInstance::ATTRS,
        instance_stride: size_of::<ImageInstance>() as u64,
    }
}

/// Draws a [`Scene`] in one traversal and resolves pointer targets.
#[derive(Debug)]
pub struct StageRenderer {
    batch: BatchRenderer<ImageInstance>,
    config: StageConfig,
    hovered: Option<NodeId>,
    events: Vec<NodeEvent>,
    warned_unknown: HashSet<TextureId>,
}

impl StageRenderer {
    pub fn new<A: GpuApi>(
        ctx: &mut RenderContext<A>,
        config: StageConfig,
    ) -> Result<Self, RenderError> {
        Ok(Self {
            batch: BatchRenderer::new(ctx, stage_program(), config.batch_size)?,
            config,
            hovered: None,
            events: Vec::new(),
            warned_unknown: HashSet::new(),
        })
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    /// Node under the pointer as of the last frame.
    pub fn hovered(&self) -> Option<NodeId> {
        self.hovered
    }

    /// Events produced by the last frames, oldest first.
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, NodeEvent> {
        self.events.drain(..)
    }

    /// Updates `scene` and draws every visible image node into `target`.
    ///
    /// With `pointer` set, interactive nodes are hit-tested during the same
    /// walk and pointer events are queued for [`Self::drain_events`].
    pub fn render<A: GpuApi>(
        &mut self,
        ctx: &mut RenderContext<A>,
        scene: &mut Scene,
        target: RenderTarget,
        pointer: Option<PointerInput<'_>>,
    ) -> Result<(), RenderError> {
        self.batch.base_mut().activate(ctx)?;
        self.batch.base().attach_target(ctx, target, self.config.clear)?;

        let viewport = ctx.target_viewport(target);
        self.batch.set_uniforms(&StageUniforms {
            viewport: [viewport.width, viewport.height],
            _pad: [0.0; 2],
        });

        let mut walk = StageWalk {
            render_time: ctx.render_time(),
            ctx: &mut *ctx,
            batch: &mut self.batch,
            viewport,
            cull: self.config.cull,
            pointer: pointer.and_then(|p| p.position),
            hit: None,
            warned_unknown: &mut self.warned_unknown,
        };
        let walked = scene.update_with(&mut walk);
        let hit = walk.hit;
        if let Err(e) = walked {
            self.batch.discard();
            return Err(e);
        }
        self.batch.flush(ctx)?;

        if let Some(pointer) = pointer {
            self.dispatch(scene, hit, pointer);
        }
        Ok(())
    }

    fn dispatch(&mut self, scene: &Scene, hit: Option<(NodeId, Vec2)>, pointer: PointerInput<'_>) {
        let position = pointer.position.unwrap_or_default();
        let target = hit.map(|(id, _)| id);

        if target != self.hovered {
            if let Some(old) = self.hovered.filter(|&id| scene.contains(id)) {
                self.events.push(NodeEvent {
                    node: old,
                    target: old,
                    kind: NodeEventKind::Leave,
                    position,
                    local: Vec2::zero(),
                });
            }
            if let Some((new, local)) = hit {
                self.events.push(NodeEvent {
                    node: new,
                    target: new,
                    kind: NodeEventKind::Enter,
                    position,
                    local,
                });
            }
            self.hovered = target;
        }

        let Some((target, local)) = hit else { return };
        for ev in pointer.events {
            let kind = match ev {
                InputEvent::PointerMoved(_) => NodeEventKind::Move,
                InputEvent::PointerButton(b) => match b.state {
                    MouseButtonState::Pressed => NodeEventKind::Down(b.button),
                    MouseButtonState::Released => NodeEventKind::Up(b.button),
                },
                InputEvent::MouseWheel { delta } => {
                    let (dx, dy) = delta.xy();
                    NodeEventKind::Wheel { dx, dy }
                }
                _ => continue,
            };
            for node in std::iter::once(target).chain(scene.ancestors(target)) {
                self.events.push(NodeEvent { node, target, kind, position, local });
            }
        }
    }
}

struct StageWalk<'a, A: GpuApi> {
    ctx: &'a mut RenderContext<A>,
    batch: &'a mut BatchRenderer<ImageInstance>,
    viewport: Viewport,
    cull: bool,
    render_time: u64,
    pointer: Option<Vec2>,
    hit: Option<(NodeId, Vec2)>,
    warned_unknown: &'a mut HashSet<TextureId>,
}

impl<A: GpuApi> StageWalk<'_, A> {
    fn draw(&mut self, node: &mut Node) -> Result<(), RenderError> {
        let NodeKind::Image(d) = &node.kind else { return Ok(()) };
        let Some(texture) = d.texture else { return Ok(()) };
        let blend = d.blend;

        if self.ctx.texture_size(texture).is_none() {
            if self.warned_unknown.insert(texture) {
                log::warn!("image node references unknown texture {texture:?}; skipped");
            }
            return Ok(());
        }
        if !self.ctx.texture_ready(texture) {
            return Ok(());
        }

        if self.cull {
            let visible = node
                .bounds(self.viewport)
                .is_some_and(|b| b.rect.intersect(self.viewport.as_rect()).is_some());
            if !visible {
                self.ctx.stats_mut().culled += 1;
                return Ok(());
            }
        }

        if self.ctx.blend_mode() != Some(blend) {
            self.batch.flush(self.ctx)?;
            self.ctx.set_blend_mode(blend);
        }

        let batch = &mut *self.batch;
        let unit = self
            .ctx
            .bind_texture(texture, self.render_time, |ctx| batch.flush(ctx).map(drop))?;

        if let Some(instance) = ImageInstance::pack(node, unit) {
            self.batch.push(self.ctx, instance)?;
        }
        Ok(())
    }
}

impl<A: GpuApi> SceneVisitor for StageWalk<'_, A> {
    type Error = RenderError;

    fn enter(&mut self, id: NodeId, node: &mut Node) -> Result<Visit, RenderError> {
        if let Some(p) = self.pointer {
            if node.interactive {
                if let Some(local) = node.hit_test(p) {
                    self.hit = Some((id, local));
                }
            }
        }
        self.draw(node)?;
        Ok(Visit::Children)
    }
}
