//! Umbra engine crate.
//!
//! A retained 2D scene graph drawn by batching renderers on top of wgpu:
//! image sprites in one instanced pass, an additive light/shadow pass over a
//! height map, and a ping-pong post-process filter chain. The platform
//! runtime (window, device, input, frame clock) lives here too.

pub mod device;
pub mod window;
pub mod input;
pub mod time;
pub mod core;

pub mod logging;
pub mod coords;
pub mod render;
pub mod scene;
pub mod versioned;
