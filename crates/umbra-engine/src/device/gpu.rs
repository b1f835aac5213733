use anyhow::{Context, Result};
use winit::dpi::PhysicalSize;
use winit::window::Window;

use super::config::{self, GpuInit};
use super::surface::{self, GpuFrame, SurfaceErrorAction};

/// Device, queue and swapchain of one window.
///
/// The adapter is kept so a lost device can be replaced without recreating the
/// surface.
pub struct Gpu<'w> {
    _instance: wgpu::Instance,
    surface: wgpu::Surface<'w>,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: PhysicalSize<u32>,
    features: wgpu::Features,
    limits: wgpu::Limits,
}

impl<'w> Gpu<'w> {
    pub async fn new(window: &'w Window, init: GpuInit) -> Result<Self> {
        let size = window.inner_size();
        anyhow::ensure!(surface::is_drawable(size), "window has zero size");

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: init.backends,
            ..Default::default()
        });
        let surface = instance.create_surface(window).context("creating window surface")?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: init.power_preference,
                compatible_surface: Some(&surface),
                force_fallback_adapter: init.force_fallback,
            })
            .await
            .context("no adapter can present to this window")?;
        let info = adapter.get_info();
        log::info!("adapter: {} ({:?}, {:?})", info.name, info.backend, info.device_type);

        let (device, queue) =
            open_device(&adapter, init.required_features, init.required_limits.clone()).await?;

        let caps = surface.get_capabilities(&adapter);
        let format = config::surface_format(&caps, init.prefer_srgb)
            .context("surface lists no formats")?;
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width,
            height: size.height,
            present_mode: init.present_mode,
            alpha_mode: config::alpha_mode(&caps, init.alpha_mode),
            view_formats: Vec::new(),
            desired_maximum_frame_latency: init.desired_maximum_frame_latency,
        };
        surface.configure(&device, &config);
        log::debug!("surface configured: {format:?} {}x{}", size.width, size.height);

        Ok(Self {
            _instance: instance,
            surface,
            adapter,
            device,
            queue,
            config,
            size,
            features: init.required_features,
            limits: init.required_limits,
        })
    }

    /// Opens a new device on the same adapter. Everything created on the old
    /// device is invalid afterwards.
    pub fn recreate_device(&mut self) -> Result<()> {
        let (device, queue) =
            pollster::block_on(open_device(&self.adapter, self.features, self.limits.clone()))?;
        self.device = device;
        self.queue = queue;
        self.configure();
        log::info!("device recreated");
        Ok(())
    }

    pub fn surface_format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    pub fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Records the new size; the swapchain is only reconfigured while drawable.
    pub fn resize(&mut self, size: PhysicalSize<u32>) {
        self.size = size;
        if surface::is_drawable(size) {
            self.config.width = size.width;
            self.config.height = size.height;
            self.configure();
        }
    }

    pub fn begin_frame(&self) -> Result<GpuFrame, wgpu::SurfaceError> {
        let surface_texture = self.surface.get_current_texture()?;
        let view = surface_texture.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("umbra frame"),
        });
        Ok(GpuFrame { surface_texture, view, encoder })
    }

    pub fn submit(&self, frame: GpuFrame) {
        let GpuFrame { surface_texture, view, encoder } = frame;
        self.queue.submit([encoder.finish()]);
        drop(view);
        surface_texture.present();
    }

    pub fn handle_surface_error(&mut self, err: wgpu::SurfaceError) -> SurfaceErrorAction {
        let action = SurfaceErrorAction::for_error(&err);
        if action == SurfaceErrorAction::Reconfigured {
            self.configure();
        }
        action
    }

    fn configure(&self) {
        if surface::is_drawable(self.size) {
            self.surface.configure(&self.device, &self.config);
        }
    }
}

async fn open_device(
    adapter: &wgpu::Adapter,
    required_features: wgpu::Features,
    required_limits: wgpu::Limits,
) -> Result<(wgpu::Device, wgpu::Queue)> {
    adapter
        .request_device(&wgpu::DeviceDescriptor {
            label: Some("umbra device"),
            required_features,
            required_limits,
            experimental_features: wgpu::ExperimentalFeatures::disabled(),
            memory_hints: wgpu::MemoryHints::Performance,
            trace: wgpu::Trace::Off,
        })
        .await
        .context("requesting device")
}
