/// Adapter, device and surface preferences.
#[derive(Debug, Clone)]
pub struct GpuInit {
    pub backends: wgpu::Backends,
    pub power_preference: wgpu::PowerPreference,
    /// Ask for a software adapter. Useful on CI machines without a GPU.
    pub force_fallback: bool,

    /// Pick an sRGB swapchain format when the surface offers one.
    pub prefer_srgb: bool,
    pub present_mode: wgpu::PresentMode,
    /// Ignored when the surface does not support it.
    pub alpha_mode: Option<wgpu::CompositeAlphaMode>,
    pub desired_maximum_frame_latency: u32,

    pub required_features: wgpu::Features,
    pub required_limits: wgpu::Limits,
}

impl Default for GpuInit {
    fn default() -> Self {
        Self {
            backends: wgpu::Backends::all(),
            power_preference: wgpu::PowerPreference::HighPerformance,
            force_fallback: false,
            prefer_srgb: true,
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: None,
            desired_maximum_frame_latency: 2,
            required_features: wgpu::Features::empty(),
            required_limits: wgpu::Limits::default(),
        }
    }
}

const SRGB_FORMATS: [wgpu::TextureFormat; 2] =
    [wgpu::TextureFormat::Bgra8UnormSrgb, wgpu::TextureFormat::Rgba8UnormSrgb];

/// First sRGB format the surface lists when preferred, else its first format.
pub(crate) fn surface_format(
    caps: &wgpu::SurfaceCapabilities,
    prefer_srgb: bool,
) -> Option<wgpu::TextureFormat> {
    let srgb = prefer_srgb
        .then(|| SRGB_FORMATS.into_iter().find(|f| caps.formats.contains(f)))
        .flatten();
    srgb.or_else(|| caps.formats.first().copied())
}

pub(crate) fn alpha_mode(
    caps: &wgpu::SurfaceCapabilities,
    requested: Option<wgpu::CompositeAlphaMode>,
) -> wgpu::CompositeAlphaMode {
    match requested {
        Some(mode) if caps.alpha_modes.contains(&mode) => mode,
        _ => caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
    }
}
