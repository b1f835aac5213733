//! GPU rendering subsystem.
//!
//! Renderers never talk to the GPU directly: every program, texture-unit,
//! blend and target change goes through [`RenderContext`], which forwards to a
//! [`GpuApi`] backend ([`WgpuApi`] on screen, [`HeadlessApi`] in tests).
//!
//! Convention:
//! - Geometry is in target pixels (top-left origin, +Y down).
//! - Vertex shaders convert to NDC using a viewport uniform.
//! - Colors leave every fragment program premultiplied.

pub mod api;
mod base;
mod batch;
mod blend;
mod context;
mod error;
pub mod filter;
pub mod headless;
pub mod light;
pub mod stage;
mod texture;
pub mod tracing;
pub mod wgpu_api;

pub use api::{GpuApi, GpuLimits, ProgramDesc, ProgramInfo, TextureFilter};
pub use base::BaseRenderer;
pub use batch::{BatchRenderer, DEFAULT_BATCH_SIZE};
pub use blend::BlendMode;
pub use context::{FrameStats, FrameStatus, RenderContext, RenderTarget, RestoreListener};
pub use error::RenderError;
pub use filter::{ColorMatrix, Filter, FilterKind, FilterParams, FilterRenderer, ToneMode};
pub use headless::HeadlessApi;
pub use light::{LightConfig, LightMaps, LightRenderer};
pub use stage::{PointerInput, StageConfig, StageRenderer};
pub use texture::{TextureId, TextureOptions};
pub use tracing::TracingApi;
pub use wgpu_api::WgpuApi;
