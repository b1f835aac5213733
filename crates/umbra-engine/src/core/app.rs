use winit::event::WindowEvent;
use winit::window::WindowId;

use super::ctx::FrameCtx;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Implemented by whatever the runtime drives.
///
/// Only `on_frame` is required. Pointer events are already folded into the
/// frame's input by the time `on_frame` runs, so most apps never need
/// `on_window_event`.
pub trait App {
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;

    /// Sees every raw window event before the runtime handles it.
    fn on_window_event(&mut self, _window_id: WindowId, _event: &WindowEvent) -> AppControl {
        AppControl::Continue
    }

    /// The window's device was lost and replaced; `generation` counts
    /// replacements. Texture and renderer ids stay valid and their GPU objects
    /// are rebuilt on next use, so most apps only log this.
    fn on_context_restored(&mut self, _window_id: WindowId, _generation: u64) {}
}
