use bytemuck::{Pod, Zeroable};

use crate::coords::{ColorRgba, Vec2};

use super::api::{GpuApi, ProgramDesc};
use super::{BaseRenderer, BlendMode, RenderContext, RenderError, RenderTarget, TextureId};

/// Row-major 3×3 color matrix with a per-channel offset, applied to
/// straight-alpha rgb: `rgb' = M * rgb + offset`.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ColorMatrix {
    pub matrix: [f32; 9],
    pub offset: [f32; 3],
}

const LUMA: [f32; 3] = [0.2126, 0.7152, 0.0722];

impl Default for ColorMatrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ColorMatrix {
    pub const IDENTITY: Self = Self {
        matrix: [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0],
        offset: [0.0; 3],
    };

    pub fn brightness(b: f32) -> Self {
        Self {
            matrix: [b, 0.0, 0.0, 0.0, b, 0.0, 0.0, 0.0, b],
            offset: [0.0; 3],
        }
    }

    pub fn contrast(c: f32) -> Self {
        let o = 0.5 * (1.0 - c);
        Self {
            matrix: [c, 0.0, 0.0, 0.0, c, 0.0, 0.0, 0.0, c],
            offset: [o; 3],
        }
    }

    /// `0` is grayscale, `1` leaves colors unchanged.
    pub fn saturation(s: f32) -> Self {
        let [lr, lg, lb] = LUMA.map(|l| l * (1.0 - s));
        Self {
            matrix: [lr + s, lg, lb, lr, lg + s, lb, lr, lg, lb + s],
            offset: [0.0; 3],
        }
    }

    pub fn grayscale() -> Self {
        Self::saturation(0.0)
    }

    pub fn sepia() -> Self {
        Self {
            matrix: [0.393, 0.769, 0.189, 0.349, 0.686, 0.168, 0.272, 0.534, 0.131],
            offset: [0.0; 3],
        }
    }

    pub fn invert() -> Self {
        Self {
            matrix: [-1.0, 0.0, 0.0, 0.0, -1.0, 0.0, 0.0, 0.0, -1.0],
            offset: [1.0; 3],
        }
    }

    /// Rotates hue by `radians` around the luminance axis.
    pub fn hue(radians: f32) -> Self {
        let (s, c) = radians.sin_cos();
        let [lr, lg, lb] = LUMA;
        Self {
            matrix: [
                lr + c * (1.0 - lr) + s * (-lr),
                lg + c * (-lg) + s * (-lg),
                lb + c * (-lb) + s * (1.0 - lb),
                lr + c * (-lr) + s * 0.143,
                lg + c * (1.0 - lg) + s * 0.140,
                lb + c * (-lb) + s * (-0.283),
                lr + c * (-lr) + s * (-(1.0 - lr)),
                lg + c * (-lg) + s * lg,
                lb + c * (1.0 - lb) + s * lb,
            ],
            offset: [0.0; 3],
        }
    }

    /// `next` applied after `self`.
    pub fn then(&self, next: &ColorMatrix) -> ColorMatrix {
        let a = &next.matrix;
        let b = &self.matrix;
        let mut m = [0.0; 9];
        for r in 0..3 {
            for c in 0..3 {
                m[r * 3 + c] = (0..3).map(|k| a[r * 3 + k] * b[k * 3 + c]).sum();
            }
        }
        let offset = core::array::from_fn(|r| {
            (0..3).map(|k| a[r * 3 + k] * self.offset[k]).sum::<f32>() + next.offset[r]
        });
        ColorMatrix { matrix: m, offset }
    }

    pub fn apply(&self, rgb: [f32; 3]) -> [f32; 3] {
        let m = &self.matrix;
        core::array::from_fn(|r| {
            m[r * 3] * rgb[0] + m[r * 3 + 1] * rgb[1] + m[r * 3 + 2] * rgb[2] + self.offset[r]
        })
    }
}

/// Blend used by [`FilterKind::Tone`] to mix a flat color into the image.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq, Hash)]
pub enum ToneMode {
    #[default]
    Multiply = 0,
    Screen = 1,
    Overlay = 2,
    SoftLight = 3,
}

/// One post-process operation.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterKind {
    /// Copies the source unchanged.
    Passthrough,
    /// 3×3 kernel, row-major, divided by `divisor` (sum of weights if zero).
    Convolution { kernel: [f32; 9], divisor: f32 },
    ColorMatrix(ColorMatrix),
    Tone { color: ColorRgba, mode: ToneMode, amount: f32 },
    /// Radius in source pixels.
    Blur { radius: f32 },
    Glow { radius: f32, strength: f32, color: ColorRgba },
    /// Cell size in source pixels.
    Pixelate { size: f32 },
    /// Offsets lookups by the map's red/green channels (0.5 = none) times `scale` pixels.
    Displacement { map: TextureId, scale: Vec2 },
    /// Multiplies by the mask's alpha (or `1 - alpha` when inverted).
    Mask { mask: TextureId, invert: bool },
    /// Pixel offset of the red channel; blue is offset the opposite way.
    ChromaticAberration { offset: Vec2 },
}

/// A filter in a chain. Disabled filters are skipped without consuming a pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub kind: FilterKind,
    pub on: bool,
}

impl Filter {
    pub fn new(kind: FilterKind) -> Self {
        Self { kind, on: true }
    }

    pub fn disabled(kind: FilterKind) -> Self {
        Self { kind, on: false }
    }
}

impl From<FilterKind> for Filter {
    fn from(kind: FilterKind) -> Self {
        Self::new(kind)
    }
}

/// Uniform block read by `filter.wgsl`.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct FilterUniforms {
    pub kind: u32,
    pub source_unit: u32,
    pub aux_unit: u32,
    pub flags: u32,
    /// xy = 1 / source size, zw = source size
    pub texel: [f32; 4],
    pub params: [f32; 4],
    pub color: [f32; 4],
    /// Color matrix rows, offset in w.
    pub matrix: [[f32; 4]; 3],
    /// Kernel rows, divisor in `kernel[0][3]`.
    pub kernel: [[f32; 4]; 3],
}

/// Parameter record a filter contributes to its pass.
pub trait FilterParams {
    /// Branch selector in the fragment program.
    fn discriminant(&self) -> u32;

    /// Uniforms for a source of `size` pixels; unit fields are filled by the renderer.
    fn uniforms(&self, size: (u32, u32)) -> FilterUniforms;

    /// Second texture sampled by the pass, if any.
    fn aux_texture(&self) -> Option<TextureId> {
        None
    }
}

impl FilterParams for FilterKind {
    fn discriminant(&self) -> u32 {
        match self {
            FilterKind::Passthrough => 0,
            FilterKind::Convolution { .. } => 1,
            FilterKind::ColorMatrix(_) => 2,
            FilterKind::Tone { .. } => 3,
            FilterKind::Blur { .. } => 4,
            FilterKind::Glow { .. } => 5,
            FilterKind::Pixelate { .. } => 6,
            FilterKind::Displacement { .. } => 7,
            FilterKind::Mask { .. } => 8,
            FilterKind::ChromaticAberration { .. } => 9,
        }
    }

    fn uniforms(&self, size: (u32, u32)) -> FilterUniforms {
        let (w, h) = (size.0.max(1) as f32, size.1.max(1) as f32);
        let mut u = FilterUniforms {
            kind: self.discriminant(),
            source_unit: 0,
            aux_unit: 0,
            flags: 0,
            texel: [1.0 / w, 1.0 / h, w, h],
            params: [0.0; 4],
            color: [0.0; 4],
            matrix: [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]],
            kernel: [[0.0; 4]; 3],
        };
        match self {
            FilterKind::Passthrough => {}
            FilterKind::Convolution { kernel, divisor } => {
                let sum: f32 = kernel.iter().sum();
                let div = if *divisor != 0.0 {
                    *divisor
                } else if sum != 0.0 {
                    sum
                } else {
                    1.0
                };
                for r in 0..3 {
                    u.kernel[r] = [kernel[r * 3], kernel[r * 3 + 1], kernel[r * 3 + 2], 0.0];
                }
                u.kernel[0][3] = div;
            }
            FilterKind::ColorMatrix(cm) => {
                for r in 0..3 {
                    u.matrix[r] = [
                        cm.matrix[r * 3],
                        cm.matrix[r * 3 + 1],
                        cm.matrix[r * 3 + 2],
                        cm.offset[r],
                    ];
                }
            }
            FilterKind::Tone { color, mode, amount } => {
                u.color = color.to_array();
                u.flags = *mode as u32;
                u.params[0] = amount.clamp(0.0, 1.0);
            }
            FilterKind::Blur { radius } => {
                u.params[0] = radius.max(0.0);
            }
            FilterKind::Glow { radius, strength, color } => {
                u.params = [radius.max(0.0), *strength, 0.0, 0.0];
                u.color = color.to_array();
            }
            FilterKind::Pixelate { size } => {
                u.params[0] = size.max(1.0);
            }
            FilterKind::Displacement { scale, .. } => {
                u.params = [scale.x, scale.y, 0.0, 0.0];
            }
            FilterKind::Mask { invert, .. } => {
                u.flags = *invert as u32;
            }
            FilterKind::ChromaticAberration { offset } => {
                u.params = [offset.x, offset.y, 0.0, 0.0];
            }
        }
        u
    }

    fn aux_texture(&self) -> Option<TextureId> {
        match self {
            FilterKind::Displacement { map, .. } => Some(*map),
            FilterKind::Mask { mask, .. } => Some(*mask),
            _ => None,
        }
    }
}

pub fn filter_program() -> ProgramDesc {
    ProgramDesc {
        name: "filter",
        source: include_str!("shaders/filter.wgsl").into(),
        attributes: &[],
        uniforms: &[
            "u_kind", "u_source", "u_aux", "u_flags", "u_texel", "u_params", "u_color", "u_matrix",
            "u_kernel",
        ],
        instance_layout: &[],
        instance_stride: 0,
    }
}

/// Runs filter chains through two scratch targets.
#[derive(Debug)]
pub struct FilterRenderer {
    base: BaseRenderer,
    scratch: [Option<TextureId>; 2],
}

impl FilterRenderer {
    pub fn new<A: GpuApi>(ctx: &mut RenderContext<A>) -> Result<Self, RenderError> {
        Ok(Self {
            base: BaseRenderer::new(ctx, filter_program())?,
            scratch: [None, None],
        })
    }

    /// Scratch targets, once the first multi-pass chain allocated them.
    pub fn scratch(&self) -> [Option<TextureId>; 2] {
        self.scratch
    }

    /// Applies the enabled filters of `filters` in order, reading `source` and
    /// writing the last pass to `destination`. With no enabled filter the
    /// source is copied unchanged. Returns the number of passes drawn.
    pub fn apply<A: GpuApi>(
        &mut self,
        ctx: &mut RenderContext<A>,
        source: TextureId,
        filters: &[Filter],
        destination: RenderTarget,
    ) -> Result<usize, RenderError> {
        let size = ctx.texture_size(source).ok_or(RenderError::UnknownTexture(source))?;
        let active: Vec<&FilterKind> = filters.iter().filter(|f| f.on).map(|f| &f.kind).collect();

        if active.is_empty() {
            self.pass(ctx, &FilterKind::Passthrough, source, size, destination)?;
            return Ok(1);
        }
        if active.len() > 1 {
            self.ensure_scratch(ctx, size)?;
        }

        let mut input = source;
        for (i, kind) in active.iter().enumerate() {
            if i + 1 == active.len() {
                self.pass(ctx, kind, input, size, destination)?;
            } else {
                let out = self.scratch[i % 2]
                    .ok_or_else(|| RenderError::Backend("scratch target missing".into()))?;
                self.pass(ctx, kind, input, size, RenderTarget::Texture(out))?;
                input = out;
            }
        }
        Ok(active.len())
    }

    fn ensure_scratch<A: GpuApi>(
        &mut self,
        ctx: &mut RenderContext<A>,
        (w, h): (u32, u32),
    ) -> Result<(), RenderError> {
        for slot in &mut self.scratch {
            match *slot {
                Some(id) => ctx.resize_render_target(id, w, h)?,
                None => *slot = Some(ctx.create_render_target(w, h)),
            }
        }
        Ok(())
    }

    fn pass<A: GpuApi>(
        &mut self,
        ctx: &mut RenderContext<A>,
        kind: &FilterKind,
        input: TextureId,
        size: (u32, u32),
        out: RenderTarget,
    ) -> Result<(), RenderError> {
        self.base.activate(ctx)?;
        self.base.attach_target(ctx, out, Some(ColorRgba::TRANSPARENT))?;
        ctx.set_blend_mode(BlendMode::Normal);

        let now = ctx.render_time();
        let mut u = kind.uniforms(size);
        u.source_unit = ctx.bind_texture(input, now, |_| Ok(()))?;
        match kind.aux_texture() {
            Some(aux) if ctx.texture_ready(aux) => {
                u.aux_unit = ctx.bind_texture(aux, now, |_| Ok(()))?;
            }
            Some(_) => {
                // aux map not loaded yet: degrade to a plain copy
                u.kind = 0;
            }
            None => {}
        }

        self.base.draw_fullscreen(ctx, bytemuck::bytes_of(&u))?;
        ctx.reclaim_units();
        Ok(())
    }
}
