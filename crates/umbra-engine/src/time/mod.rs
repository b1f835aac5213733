//! Per-window frame timing.

mod clock;

pub use clock::{FrameClock, FrameTime};
