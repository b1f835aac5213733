//! Window surface and wgpu device ownership.
//!
//! [`Gpu`] is the only place that talks to the adapter. The renderers never see
//! it directly; they go through `render::WgpuApi`, which borrows the device and
//! queue for one frame.

mod config;
mod gpu;
mod surface;

pub use config::GpuInit;
pub use gpu::Gpu;
pub use surface::{GpuFrame, SurfaceErrorAction};
