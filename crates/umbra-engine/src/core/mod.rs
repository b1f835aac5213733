//! The contract between the window runtime and the application.
//!
//! An [`App`] receives one [`FrameCtx`] per frame per window. The context hands
//! out the render context for that window's device; everything else about the
//! event loop stays inside `window`.

mod app;
mod ctx;

pub use app::{App, AppControl};
pub use ctx::{FrameCtx, WindowCtx};
