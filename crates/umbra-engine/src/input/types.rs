#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Back,
    Forward,
    Other(u16),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum MouseButtonState {
    Pressed,
    Released,
}

impl MouseButtonState {
    pub fn is_pressed(self) -> bool {
        matches!(self, MouseButtonState::Pressed)
    }
}

/// Wheel movement in lines (notched wheels) or pixels (touchpads).
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MouseWheelDelta {
    Line { x: f32, y: f32 },
    Pixel { x: f32, y: f32 },
}

impl MouseWheelDelta {
    pub fn xy(self) -> (f32, f32) {
        let (MouseWheelDelta::Line { x, y } | MouseWheelDelta::Pixel { x, y }) = self;
        (x, y)
    }
}

/// Physical pixel position of the pointer.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointerMoveEvent {
    pub x: f32,
    pub y: f32,
}

/// Button transition, stamped with the pointer position at the time it happened.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct PointerButtonEvent {
    pub button: MouseButton,
    pub state: MouseButtonState,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    PointerMoved(PointerMoveEvent),
    PointerButton(PointerButtonEvent),
    MouseWheel { delta: MouseWheelDelta },
    PointerLeft,
    Focused(bool),
}
