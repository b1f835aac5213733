//! Pointer input.
//!
//! The runtime translates winit window events into [`InputEvent`]s, folds them
//! into an [`InputState`] and collects the frame's share in an [`InputFrame`].
//! Nothing here exposes winit types.

mod state;
pub(crate) mod translate;
mod types;

pub use state::{InputFrame, InputState};
pub use types::{
    InputEvent, MouseButton, MouseButtonState, MouseWheelDelta, PointerButtonEvent,
    PointerMoveEvent,
};
