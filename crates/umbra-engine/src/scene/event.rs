use crate::coords::Vec2;
use crate::input::MouseButton;

use super::NodeId;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum NodeEventKind {
    /// The pointer started hovering `target`.
    Enter,
    /// The pointer stopped hovering `target`.
    Leave,
    Move,
    Down(MouseButton),
    Up(MouseButton),
    Wheel { dx: f32, dy: f32 },
}

/// Pointer notification delivered to one node.
///
/// Enter/Leave go to the target only; the other kinds bubble from the target
/// up through its ancestors, one event per node.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct NodeEvent {
    /// Node receiving this copy of the event.
    pub node: NodeId,
    /// Node that was hit.
    pub target: NodeId,
    pub kind: NodeEventKind,
    /// Pointer position in surface pixels.
    pub position: Vec2,
    /// Pointer position in the target's unit quad, as of the hit test.
    pub local: Vec2,
}
