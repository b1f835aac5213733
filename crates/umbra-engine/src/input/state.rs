use std::collections::HashSet;

use crate::coords::Vec2;

use super::types::{InputEvent, MouseButton, PointerButtonEvent, PointerMoveEvent};

/// What happened to the pointer since the last frame.
#[derive(Debug, Default)]
pub struct InputFrame {
    /// Events in arrival order; renderers replay them against the hovered node.
    pub events: Vec<InputEvent>,
    pub buttons_pressed: HashSet<MouseButton>,
    pub buttons_released: HashSet<MouseButton>,
    /// Summed wheel movement, lines and pixels mixed.
    pub scroll: (f32, f32),
}

impl InputFrame {
    pub fn clear(&mut self) {
        self.events.clear();
        self.buttons_pressed.clear();
        self.buttons_released.clear();
        self.scroll = (0.0, 0.0);
    }
}

/// Pointer state of one window, folded from [`InputEvent`]s.
#[derive(Debug, Default)]
pub struct InputState {
    pub focused: bool,
    /// Physical pixels; `None` while the pointer is outside the window.
    pub pointer_pos: Option<(f32, f32)>,
    pub buttons_down: HashSet<MouseButton>,
}

impl InputState {
    /// Folds `ev` into the state and records it, with any transition, in `frame`.
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: InputEvent) {
        match &ev {
            InputEvent::Focused(focused) => {
                self.focused = *focused;
                if !focused {
                    // releases are not delivered to unfocused windows
                    self.buttons_down.clear();
                }
            }
            InputEvent::PointerMoved(PointerMoveEvent { x, y }) => {
                self.pointer_pos = Some((*x, *y))
            }
            InputEvent::PointerLeft => self.pointer_pos = None,
            InputEvent::PointerButton(PointerButtonEvent { button, state, x, y }) => {
                self.pointer_pos = Some((*x, *y));
                let (changed, transitions) = if state.is_pressed() {
                    (self.buttons_down.insert(*button), &mut frame.buttons_pressed)
                } else {
                    (self.buttons_down.remove(button), &mut frame.buttons_released)
                };
                if changed {
                    transitions.insert(*button);
                }
            }
            InputEvent::MouseWheel { delta } => {
                let (dx, dy) = delta.xy();
                frame.scroll.0 += dx;
                frame.scroll.1 += dy;
            }
        }
        frame.events.push(ev);
    }

    pub fn button_down(&self, btn: MouseButton) -> bool {
        self.buttons_down.contains(&btn)
    }

    pub fn pointer(&self) -> Option<Vec2> {
        self.pointer_pos.map(Vec2::from)
    }
}
