//! Retained scene graph.
//!
//! Responsibilities:
//! - own nodes in an arena with parent/child links and paint order
//! - propagate transform and color edits downward lazily, recomputing only
//!   what changed since the last update (see [`crate::versioned`])
//! - answer hit tests and bounds queries from the cached matrices

mod color;
mod distortion;
mod drawable;
mod event;
mod graph;
mod light;
mod node;
mod texture_transform;
mod transform;

pub use color::ColorState;
pub use distortion::Distortion;
pub use drawable::{Bounds, Drawable, TintMode};
pub use event::{NodeEvent, NodeEventKind};
pub use graph::{Ancestors, NodeId, Scene, SceneError, SceneVisitor, UpdateStats, Visit};
pub use light::{Light, LightFlags, LightKind};
pub use node::{Node, NodeKind};
pub use texture_transform::TextureTransform;
pub use transform::{Composable2DTransform, TransformState};
