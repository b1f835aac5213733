//! winit event loop and per-window state.

mod entry;
mod runtime;

pub use runtime::{Runtime, RuntimeConfig, RuntimeCtx};
pub use winit::window::CursorIcon;
