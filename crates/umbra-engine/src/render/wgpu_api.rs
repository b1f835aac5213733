//! [`GpuApi`] over wgpu.
//!
//! Calls between `begin_frame` and [`WgpuApi::end_frame`] are recorded; the
//! whole frame is encoded into the caller's command encoder at the end, one
//! render pass per target switch. Resources (programs, textures, framebuffers)
//! are created immediately.

use std::collections::HashMap;
use std::num::NonZeroU64;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use wgpu::util::DeviceExt;

use crate::coords::ColorRgba;

use super::api::{
    resolve_locations, FramebufferHandle, GpuApi, GpuLimits, ProgramDesc, ProgramHandle,
    ProgramInfo, TargetHandle, TextureDesc, TextureFilter, TextureHandle,
};
use super::{BlendMode, RenderError};

/// Units exposed by the bundled shaders (`t0..t7` / `s0..s7`).
pub const TEXTURE_UNITS: usize = 8;

/// Format of every offscreen target.
pub const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

/// Bytes visible to a shader through the uniform binding.
const UNIFORM_WINDOW: u64 = 256;
const UNIFORM_BINDING: Option<NonZeroU64> = NonZeroU64::new(UNIFORM_WINDOW);

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct QuadVertex {
    pos: [f32; 2],
}

impl QuadVertex {
    const ATTRS: [wgpu::VertexAttribute; 1] = wgpu::vertex_attr_array![0 => Float32x2];

    fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: size_of::<QuadVertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRS,
        }
    }
}

const QUAD_VERTICES: [QuadVertex; 4] = [
    QuadVertex { pos: [0.0, 0.0] },
    QuadVertex { pos: [1.0, 0.0] },
    QuadVertex { pos: [1.0, 1.0] },
    QuadVertex { pos: [0.0, 1.0] },
];

const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

struct Program {
    name: &'static str,
    module: wgpu::ShaderModule,
    instance_layout: &'static [wgpu::VertexAttribute],
    instance_stride: u64,
}

struct GpuTexture {
    desc: TextureDesc,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
}

type Units = [Option<TextureHandle>; TEXTURE_UNITS];

#[derive(Debug, Clone)]
struct DrawOp {
    program: ProgramHandle,
    blend: BlendMode,
    units: Units,
    uniform_offset: u32,
    instances: Range<u64>,
    count: u32,
}

#[derive(Debug, Clone)]
enum Op {
    Target { target: TargetHandle, clear: Option<ColorRgba> },
    Draw(DrawOp),
}

/// wgpu backend recording one frame at a time.
pub struct WgpuApi {
    device: wgpu::Device,
    queue: wgpu::Queue,
    surface_format: wgpu::TextureFormat,
    surface_size: (u32, u32),
    lost: Arc<AtomicBool>,
    uniform_align: u64,

    globals_layout: wgpu::BindGroupLayout,
    textures_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    pipelines: HashMap<(ProgramHandle, BlendMode, wgpu::TextureFormat), wgpu::RenderPipeline>,

    quad_vbo: wgpu::Buffer,
    quad_ibo: wgpu::Buffer,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    instance_buffer: wgpu::Buffer,

    dummy: wgpu::TextureView,
    samplers: HashMap<(TextureFilter, bool), wgpu::Sampler>,

    next_handle: u32,
    programs: HashMap<ProgramHandle, Program>,
    textures: HashMap<TextureHandle, GpuTexture>,
    framebuffers: HashMap<FramebufferHandle, TextureHandle>,
    graveyard: Vec<TextureHandle>,

    // per-frame recording
    program: Option<ProgramHandle>,
    blend: BlendMode,
    units: Units,
    uniform_offset: u32,
    instance_range: Range<u64>,
    uniform_bytes: Vec<u8>,
    instance_bytes: Vec<u8>,
    ops: Vec<Op>,
}

impl WgpuApi {
    /// Wraps an existing device. The device-lost callback is installed here.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        surface_size: (u32, u32),
    ) -> Self {
        let device = device.clone();
        let queue = queue.clone();

        let lost = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&lost);
        device.set_device_lost_callback(move |reason, message| {
            log::error!("wgpu device lost ({reason:?}): {message}");
            flag.store(true, Ordering::SeqCst);
        });

        let uniform_align =
            u64::from(device.limits().min_uniform_buffer_offset_alignment).max(UNIFORM_WINDOW);

        let globals_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("umbra globals bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: UNIFORM_BINDING,
                },
                count: None,
            }],
        });

        let mut entries = Vec::with_capacity(TEXTURE_UNITS * 2);
        for unit in 0..TEXTURE_UNITS as u32 {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: unit,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    view_dimension: wgpu::TextureViewDimension::D2,
                    multisampled: false,
                },
                count: None,
            });
        }
        for unit in 0..TEXTURE_UNITS as u32 {
            entries.push(wgpu::BindGroupLayoutEntry {
                binding: TEXTURE_UNITS as u32 + unit,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            });
        }
        let textures_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("umbra textures bgl"),
            entries: &entries,
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("umbra pipeline layout"),
            bind_group_layouts: &[&globals_layout, &textures_layout],
            immediate_size: 0,
        });

        let quad_vbo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("umbra quad vbo"),
            contents: bytemuck::cast_slice(&QUAD_VERTICES),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let quad_ibo = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("umbra quad ibo"),
            contents: bytemuck::cast_slice(&QUAD_INDICES),
            usage: wgpu::BufferUsages::INDEX,
        });

        let uniform_buffer = create_uniform_buffer(&device, uniform_align * 64);
        let uniform_bind_group =
            create_uniform_bind_group(&device, &globals_layout, &uniform_buffer);
        let instance_buffer = create_instance_buffer(&device, 64 * 1024);

        let dummy_texture = device.create_texture_with_data(
            &queue,
            &wgpu::TextureDescriptor {
                label: Some("umbra empty unit"),
                size: wgpu::Extent3d { width: 1, height: 1, depth_or_array_layers: 1 },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: OFFSCREEN_FORMAT,
                usage: wgpu::TextureUsages::TEXTURE_BINDING,
                view_formats: &[],
            },
            wgpu::util::TextureDataOrder::LayerMajor,
            &[0, 0, 0, 0],
        );
        let dummy = dummy_texture.create_view(&wgpu::TextureViewDescriptor::default());

        Self {
            device,
            queue,
            surface_format,
            surface_size,
            lost,
            uniform_align,
            globals_layout,
            textures_layout,
            pipeline_layout,
            pipelines: HashMap::new(),
            quad_vbo,
            quad_ibo,
            uniform_buffer,
            uniform_bind_group,
            instance_buffer,
            dummy,
            samplers: HashMap::new(),
            next_handle: 1,
            programs: HashMap::new(),
            textures: HashMap::new(),
            framebuffers: HashMap::new(),
            graveyard: Vec::new(),
            program: None,
            blend: BlendMode::Normal,
            units: [None; TEXTURE_UNITS],
            uniform_offset: 0,
            instance_range: 0..0,
            uniform_bytes: Vec::new(),
            instance_bytes: Vec::new(),
            ops: Vec::new(),
        }
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.surface_format
    }

    /// Tracks the surface after a window resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.surface_size = (width, height);
    }

    fn next(&mut self) -> u32 {
        let h = self.next_handle;
        self.next_handle += 1;
        h
    }

    fn sampler(&mut self, filter: TextureFilter, repeat: bool) -> wgpu::Sampler {
        let device = &self.device;
        self.samplers
            .entry((filter, repeat))
            .or_insert_with(|| {
                let address = if repeat {
                    wgpu::AddressMode::Repeat
                } else {
                    wgpu::AddressMode::ClampToEdge
                };
                let mode = match filter {
                    TextureFilter::Linear => wgpu::FilterMode::Linear,
                    TextureFilter::Nearest => wgpu::FilterMode::Nearest,
                };
                device.create_sampler(&wgpu::SamplerDescriptor {
                    label: Some("umbra sampler"),
                    address_mode_u: address,
                    address_mode_v: address,
                    address_mode_w: address,
                    mag_filter: mode,
                    min_filter: mode,
                    mipmap_filter: wgpu::MipmapFilterMode::Nearest,
                    ..Default::default()
                })
            })
            .clone()
    }

    fn make_texture(&mut self, desc: &TextureDesc, usage: wgpu::TextureUsages) -> TextureHandle {
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("umbra texture"),
            size: wgpu::Extent3d {
                width: desc.width.max(1),
                height: desc.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: OFFSCREEN_FORMAT,
            usage,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let handle = TextureHandle(self.next());
        self.textures.insert(handle, GpuTexture { desc: *desc, texture, view });
        handle
    }

    fn pipeline(
        &mut self,
        program: ProgramHandle,
        blend: BlendMode,
        format: wgpu::TextureFormat,
    ) -> Option<wgpu::RenderPipeline> {
        if let Some(p) = self.pipelines.get(&(program, blend, format)) {
            return Some(p.clone());
        }
        let prog = self.programs.get(&program)?;
        let instance_layout = wgpu::VertexBufferLayout {
            array_stride: prog.instance_stride,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: prog.instance_layout,
        };
        let buffers = [QuadVertex::layout(), instance_layout];
        let buffers = if prog.instance_layout.is_empty() { &buffers[..1] } else { &buffers[..] };

        log::debug!("building pipeline `{}` ({blend:?}, {format:?})", prog.name);
        let pipeline = self.device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(prog.name),
            layout: Some(&self.pipeline_layout),
            vertex: wgpu::VertexState {
                module: &prog.module,
                entry_point: Some("vs_main"),
                compilation_options: Default::default(),
                buffers,
            },
            fragment: Some(wgpu::FragmentState {
                module: &prog.module,
                entry_point: Some("fs_main"),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(blend.to_wgpu()),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });
        self.pipelines.insert((program, blend, format), pipeline.clone());
        Some(pipeline)
    }

    fn texture_bind_group(&mut self, units: &Units) -> wgpu::BindGroup {
        let mut views = Vec::with_capacity(TEXTURE_UNITS);
        let mut samplers = Vec::with_capacity(TEXTURE_UNITS);
        for unit in units {
            let tex = unit.and_then(|h| self.textures.get(&h));
            let (view, desc) = match tex {
                Some(t) => (t.view.clone(), Some(t.desc)),
                None => (self.dummy.clone(), None),
            };
            views.push(view);
            let (filter, repeat) =
                desc.map_or((TextureFilter::Nearest, false), |d| (d.filter, d.repeat));
            samplers.push((filter, repeat));
        }
        let samplers: Vec<wgpu::Sampler> =
            samplers.into_iter().map(|(f, r)| self.sampler(f, r)).collect();

        let mut entries = Vec::with_capacity(TEXTURE_UNITS * 2);
        for (i, view) in views.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: i as u32,
                resource: wgpu::BindingResource::TextureView(view),
            });
        }
        for (i, sampler) in samplers.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: (TEXTURE_UNITS + i) as u32,
                resource: wgpu::BindingResource::Sampler(sampler),
            });
        }
        self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("umbra textures"),
            layout: &self.textures_layout,
            entries: &entries,
        })
    }

    fn upload_staging(&mut self) {
        let needed = self.uniform_bytes.len() as u64;
        if needed > self.uniform_buffer.size() {
            let size = needed.next_power_of_two();
            self.uniform_buffer = create_uniform_buffer(&self.device, size);
            self.uniform_bind_group =
                create_uniform_bind_group(&self.device, &self.globals_layout, &self.uniform_buffer);
        }
        if needed > 0 {
            self.queue.write_buffer(&self.uniform_buffer, 0, &self.uniform_bytes);
        }

        let needed = self.instance_bytes.len() as u64;
        if needed > self.instance_buffer.size() {
            self.instance_buffer = create_instance_buffer(&self.device, needed.next_power_of_two());
        }
        if needed > 0 {
            self.queue.write_buffer(&self.instance_buffer, 0, &self.instance_bytes);
        }
    }

    /// Encodes everything recorded since `begin_frame` into `encoder`.
    /// `screen` is the view of the acquired surface texture.
    pub fn end_frame(&mut self, encoder: &mut wgpu::CommandEncoder, screen: &wgpu::TextureView) {
        if self.lost.load(Ordering::SeqCst) {
            self.ops.clear();
            return;
        }
        self.upload_staging();

        let ops = std::mem::take(&mut self.ops);
        let mut i = 0;
        while i < ops.len() {
            let (target, clear) = match &ops[i] {
                Op::Target { target, clear } => {
                    i += 1;
                    (*target, *clear)
                }
                Op::Draw(_) => (TargetHandle::Screen, None),
            };
            let end = ops[i..]
                .iter()
                .position(|op| matches!(op, Op::Target { .. }))
                .map_or(ops.len(), |n| i + n);
            let draws: Vec<&DrawOp> = ops[i..end]
                .iter()
                .filter_map(|op| match op {
                    Op::Draw(d) => Some(d),
                    Op::Target { .. } => None,
                })
                .collect();
            i = end;

            if draws.is_empty() && clear.is_none() {
                continue;
            }
            self.encode_pass(encoder, screen, target, clear, &draws);
        }

        for handle in self.graveyard.drain(..) {
            self.textures.remove(&handle);
        }
    }

    fn encode_pass(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        screen: &wgpu::TextureView,
        target: TargetHandle,
        clear: Option<ColorRgba>,
        draws: &[&DrawOp],
    ) {
        let (view, format) = match target {
            TargetHandle::Screen => (screen.clone(), self.surface_format),
            TargetHandle::Framebuffer(fb) => {
                let Some(tex) = self.framebuffers.get(&fb).and_then(|t| self.textures.get(t)) else {
                    log::warn!("draws into destroyed framebuffer {fb:?} dropped");
                    return;
                };
                (tex.view.clone(), OFFSCREEN_FORMAT)
            }
        };

        // resolve GPU objects before the pass borrows the encoder
        let mut prepared = Vec::with_capacity(draws.len());
        let mut groups: HashMap<Units, wgpu::BindGroup> = HashMap::new();
        for d in draws {
            let Some(pipeline) = self.pipeline(d.program, d.blend, format) else { continue };
            let group = match groups.get(&d.units) {
                Some(g) => g.clone(),
                None => {
                    let g = self.texture_bind_group(&d.units);
                    groups.insert(d.units, g.clone());
                    g
                }
            };
            prepared.push((pipeline, group, *d));
        }

        let load = match clear {
            Some(c) => wgpu::LoadOp::Clear(wgpu::Color {
                r: f64::from(c.r * c.a),
                g: f64::from(c.g * c.a),
                b: f64::from(c.b * c.a),
                a: f64::from(c.a),
            }),
            None => wgpu::LoadOp::Load,
        };

        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("umbra pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &view,
                resolve_target: None,
                ops: wgpu::Operations { load, store: wgpu::StoreOp::Store },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        rpass.set_vertex_buffer(0, self.quad_vbo.slice(..));
        rpass.set_index_buffer(self.quad_ibo.slice(..), wgpu::IndexFormat::Uint16);
        for (pipeline, group, d) in &prepared {
            rpass.set_pipeline(pipeline);
            rpass.set_bind_group(0, &self.uniform_bind_group, &[d.uniform_offset]);
            rpass.set_bind_group(1, group, &[]);
            if !d.instances.is_empty() {
                rpass.set_vertex_buffer(1, self.instance_buffer.slice(d.instances.clone()));
            }
            rpass.draw_indexed(0..6, 0, 0..d.count);
        }
    }
}

impl std::fmt::Debug for WgpuApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuApi")
            .field("surface_format", &self.surface_format)
            .field("surface_size", &self.surface_size)
            .field("programs", &self.programs.len())
            .field("textures", &self.textures.len())
            .field("lost", &self.lost.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

fn create_uniform_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("umbra uniform ring"),
        size: size.max(UNIFORM_WINDOW),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

fn create_uniform_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("umbra globals"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer,
                offset: 0,
                size: UNIFORM_BINDING,
            }),
        }],
    })
}

fn create_instance_buffer(device: &wgpu::Device, size: u64) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("umbra instance vbo"),
        size,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}

impl GpuApi for WgpuApi {
    fn limits(&self) -> GpuLimits {
        GpuLimits {
            max_texture_units: TEXTURE_UNITS as u32,
            max_texture_size: self.device.limits().max_texture_dimension_2d,
        }
    }

    fn surface_size(&self) -> (u32, u32) {
        self.surface_size
    }

    fn is_context_lost(&self) -> bool {
        self.lost.load(Ordering::SeqCst)
    }

    fn begin_frame(&mut self) {
        self.ops.clear();
        self.uniform_bytes.clear();
        self.instance_bytes.clear();
        self.program = None;
        self.blend = BlendMode::Normal;
        self.units = [None; TEXTURE_UNITS];
        self.uniform_offset = 0;
        self.instance_range = 0..0;
    }

    fn create_program(&mut self, desc: &ProgramDesc) -> Result<ProgramInfo, RenderError> {
        let locations = resolve_locations(desc)?;

        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(desc.name),
            source: wgpu::ShaderSource::Wgsl(desc.source.clone()),
        });
        let info = pollster::block_on(module.get_compilation_info());
        let errors: Vec<String> = info
            .messages
            .iter()
            .filter(|m| matches!(m.message_type, wgpu::CompilationMessageType::Error))
            .map(|m| m.message.clone())
            .collect();
        if !errors.is_empty() {
            return Err(RenderError::ProgramLink {
                program: desc.name.to_string(),
                log: errors.join("\n"),
            });
        }

        let handle = ProgramHandle(self.next());
        self.programs.insert(
            handle,
            Program {
                name: desc.name,
                module,
                instance_layout: desc.instance_layout,
                instance_stride: desc.instance_stride,
            },
        );
        Ok(ProgramInfo { handle, locations })
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<TextureHandle, RenderError> {
        let max = self.device.limits().max_texture_dimension_2d;
        if desc.width > max || desc.height > max {
            return Err(RenderError::Backend(format!(
                "texture {}x{} exceeds the device limit of {max}",
                desc.width, desc.height
            )));
        }
        Ok(self.make_texture(
            desc,
            wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        ))
    }

    fn upload_texture(&mut self, texture: TextureHandle, pixels: &[u8]) -> Result<(), RenderError> {
        let tex = self
            .textures
            .get(&texture)
            .ok_or_else(|| {
                RenderError::Backend(format!("upload into unknown texture {texture:?}"))
            })?;
        let (w, h) = (tex.desc.width.max(1), tex.desc.height.max(1));
        let expected = (w * h * 4) as usize;
        if pixels.len() != expected {
            return Err(RenderError::TextureDataSize { expected, actual: pixels.len() });
        }
        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &tex.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(4 * w),
                rows_per_image: Some(h),
            },
            wgpu::Extent3d { width: w, height: h, depth_or_array_layers: 1 },
        );
        Ok(())
    }

    fn destroy_texture(&mut self, texture: TextureHandle) {
        // recorded draws may still sample it
        self.graveyard.push(texture);
    }

    fn create_framebuffer(
        &mut self,
        desc: &TextureDesc,
    ) -> Result<(FramebufferHandle, TextureHandle), RenderError> {
        let tex = self.make_texture(
            desc,
            wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::COPY_DST,
        );
        let fb = FramebufferHandle(self.next());
        self.framebuffers.insert(fb, tex);
        Ok((fb, tex))
    }

    fn destroy_framebuffer(&mut self, framebuffer: FramebufferHandle) {
        if let Some(tex) = self.framebuffers.remove(&framebuffer) {
            self.graveyard.push(tex);
        }
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.program = Some(program);
    }

    fn bind_texture(&mut self, unit: u32, texture: Option<TextureHandle>) {
        if let Some(slot) = self.units.get_mut(unit as usize) {
            *slot = texture;
        }
    }

    fn set_blend_mode(&mut self, mode: BlendMode) {
        self.blend = mode;
    }

    fn bind_target(&mut self, target: TargetHandle, clear: Option<ColorRgba>) {
        self.ops.push(Op::Target { target, clear });
    }

    fn set_uniforms(&mut self, bytes: &[u8]) {
        if bytes.len() as u64 > UNIFORM_WINDOW {
            log::warn!("uniform block of {} bytes truncated to {UNIFORM_WINDOW}", bytes.len());
        }
        let offset = self.uniform_bytes.len();
        let len = bytes.len().min(UNIFORM_WINDOW as usize);
        self.uniform_bytes.extend_from_slice(&bytes[..len]);
        self.uniform_bytes.resize(offset + self.uniform_align as usize, 0);
        self.uniform_offset = offset as u32;
    }

    fn upload_instances(&mut self, bytes: &[u8]) {
        let start = self.instance_bytes.len() as u64;
        self.instance_bytes.extend_from_slice(bytes);
        self.instance_range = start..self.instance_bytes.len() as u64;
    }

    fn draw_instanced(&mut self, instance_count: u32) {
        let Some(program) = self.program else {
            log::warn!("draw without a program dropped");
            return;
        };
        if self.ops.is_empty() {
            self.ops.push(Op::Target { target: TargetHandle::Screen, clear: None });
        }
        self.ops.push(Op::Draw(DrawOp {
            program,
            blend: self.blend,
            units: self.units,
            uniform_offset: self.uniform_offset,
            instances: self.instance_range.clone(),
            count: instance_count,
        }));
    }
}
