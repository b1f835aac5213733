use winit::window::{CursorIcon, Window, WindowId};

use crate::device::{Gpu, SurfaceErrorAction};
use crate::input::{InputFrame, InputState};
use crate::render::{FrameStatus, PointerInput, RenderContext, RenderError, WgpuApi};
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

use super::app::AppControl;

pub struct WindowCtx<'a> {
    pub id: WindowId,
    pub window: &'a Window,
}

impl WindowCtx<'_> {
    /// Size in physical pixels, the unit of the screen viewport and of pointer positions.
    pub fn physical_size(&self) -> (u32, u32) {
        self.window.inner_size().into()
    }

    pub fn set_cursor(&self, cursor: CursorIcon) {
        self.window.set_cursor(cursor);
    }
}

/// What `App::on_frame` gets for one window and one frame. `'w` is the
/// window borrow held by the device.
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,
    pub render: &'a mut RenderContext<WgpuApi>,
    pub input: &'a InputState,
    pub input_frame: &'a InputFrame,
    pub time: FrameTime,
    pub runtime: &'a mut RuntimeCtx,
}

impl<'a, 'w> FrameCtx<'a, 'w> {
    /// Pointer state of this frame, ready for hit-testing.
    pub fn pointer(&self) -> PointerInput<'a> {
        PointerInput::from_input(self.input, self.input_frame)
    }

    /// Runs `draw` against the render context and presents the result.
    ///
    /// Skips the frame while the context is lost or the swapchain image cannot
    /// be acquired. A failing `draw` is logged and the partial frame still
    /// presented.
    pub fn render<F>(&mut self, draw: F) -> AppControl
    where
        F: FnOnce(&mut RenderContext<WgpuApi>) -> Result<(), RenderError>,
    {
        if self.render.begin_frame(self.time.frame_index) == FrameStatus::ContextLost {
            return AppControl::Continue;
        }

        let mut frame = match self.gpu.begin_frame() {
            Ok(frame) => frame,
            Err(err) => {
                log::debug!("frame {} skipped: {err}", self.time.frame_index);
                return match self.gpu.handle_surface_error(err) {
                    SurfaceErrorAction::Fatal => AppControl::Exit,
                    _ => AppControl::Continue,
                };
            }
        };

        match draw(&mut *self.render) {
            Ok(()) | Err(RenderError::ContextLost) => {}
            Err(e) => log::error!("frame {} failed: {e}", self.time.frame_index),
        }

        self.render.api_mut().end_frame(&mut frame.encoder, &frame.view);
        self.window.window.pre_present_notify();
        self.gpu.submit(frame);
        AppControl::Continue
    }
}
