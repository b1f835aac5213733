use winit::dpi::PhysicalSize;

/// One acquired swapchain image and the encoder recording into it.
///
/// Drop or submit it before acquiring the next one.
pub struct GpuFrame {
    pub surface_texture: wgpu::SurfaceTexture,
    pub view: wgpu::TextureView,
    pub encoder: wgpu::CommandEncoder,
}

/// What the frame loop should do after a failed acquire.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum SurfaceErrorAction {
    /// The surface was configured again; try next frame.
    Reconfigured,
    SkipFrame,
    /// Out of memory. Close the window.
    Fatal,
}

impl SurfaceErrorAction {
    pub(crate) fn for_error(err: &wgpu::SurfaceError) -> Self {
        match err {
            wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated => {
                SurfaceErrorAction::Reconfigured
            }
            wgpu::SurfaceError::OutOfMemory => SurfaceErrorAction::Fatal,
            wgpu::SurfaceError::Timeout | wgpu::SurfaceError::Other => {
                SurfaceErrorAction::SkipFrame
            }
        }
    }
}

/// A minimized window reports a zero size; the surface cannot be configured then.
pub(crate) fn is_drawable(size: PhysicalSize<u32>) -> bool {
    size.width > 0 && size.height > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lost_and_outdated_reconfigure() {
        assert_eq!(
            SurfaceErrorAction::for_error(&wgpu::SurfaceError::Lost),
            SurfaceErrorAction::Reconfigured
        );
        assert_eq!(
            SurfaceErrorAction::for_error(&wgpu::SurfaceError::Outdated),
            SurfaceErrorAction::Reconfigured
        );
        assert_eq!(
            SurfaceErrorAction::for_error(&wgpu::SurfaceError::Timeout),
            SurfaceErrorAction::SkipFrame
        );
        assert_eq!(
            SurfaceErrorAction::for_error(&wgpu::SurfaceError::OutOfMemory),
            SurfaceErrorAction::Fatal
        );
    }

    #[test]
    fn minimized_is_not_drawable() {
        assert!(!is_drawable(PhysicalSize::new(0, 480)));
        assert!(is_drawable(PhysicalSize::new(1, 1)));
    }
}
