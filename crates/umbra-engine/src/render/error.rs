use thiserror::Error;

use super::TextureId;

/// Failures surfaced by the render layer.
///
/// Unit exhaustion and full batches never show up here: both are recovered
/// locally by flushing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("program `{program}` failed to link: {log}")]
    ProgramLink { program: String, log: String },

    #[error("program `{program}` has no symbol `{name}`")]
    MissingSymbol { program: String, name: String },

    #[error("renderer `{0}` is unusable after a failed program build")]
    RendererUnusable(String),

    #[error("unknown texture {0:?}")]
    UnknownTexture(TextureId),

    #[error("texture {0:?} has no pixel data yet")]
    TextureNotReady(TextureId),

    #[error("texture {0:?} is not a render target")]
    NotRenderTarget(TextureId),

    #[error("pixel data is {actual} bytes, expected {expected}")]
    TextureDataSize { expected: usize, actual: usize },

    #[error("GPU context lost")]
    ContextLost,

    #[error("backend error: {0}")]
    Backend(String),
}
