use winit::event::{ElementState, MouseButton as WinitButton, MouseScrollDelta, WindowEvent};

use super::{
    InputEvent, InputState, MouseButton, MouseButtonState, MouseWheelDelta, PointerButtonEvent,
    PointerMoveEvent,
};

/// Maps the pointer and focus events of a window to [`InputEvent`]s.
///
/// Winit reports button presses without a position; they are stamped with the
/// last known pointer position, or the origin if the pointer never moved.
pub(crate) fn translate_window_event(
    state: &InputState,
    event: &WindowEvent,
) -> Option<InputEvent> {
    let ev = match *event {
        WindowEvent::Focused(focused) => InputEvent::Focused(focused),
        WindowEvent::CursorLeft { .. } => InputEvent::PointerLeft,
        WindowEvent::CursorMoved { position, .. } => InputEvent::PointerMoved(PointerMoveEvent {
            x: position.x as f32,
            y: position.y as f32,
        }),
        WindowEvent::MouseInput { state: element, button, .. } => {
            let (x, y) = state.pointer_pos.unwrap_or_default();
            InputEvent::PointerButton(PointerButtonEvent {
                button: button_of(button),
                state: match element {
                    ElementState::Pressed => MouseButtonState::Pressed,
                    ElementState::Released => MouseButtonState::Released,
                },
                x,
                y,
            })
        }
        WindowEvent::MouseWheel { delta: MouseScrollDelta::LineDelta(x, y), .. } => {
            InputEvent::MouseWheel { delta: MouseWheelDelta::Line { x, y } }
        }
        WindowEvent::MouseWheel { delta: MouseScrollDelta::PixelDelta(p), .. } => {
            InputEvent::MouseWheel {
                delta: MouseWheelDelta::Pixel { x: p.x as f32, y: p.y as f32 },
            }
        }
        _ => return None,
    };
    Some(ev)
}

fn button_of(b: WinitButton) -> MouseButton {
    match b {
        WinitButton::Left => MouseButton::Left,
        WinitButton::Right => MouseButton::Right,
        WinitButton::Middle => MouseButton::Middle,
        WinitButton::Back => MouseButton::Back,
        WinitButton::Forward => MouseButton::Forward,
        WinitButton::Other(code) => MouseButton::Other(code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn focus_is_translated_and_others_are_dropped() {
        let state = InputState::default();
        assert_eq!(
            translate_window_event(&state, &WindowEvent::Focused(true)),
            Some(InputEvent::Focused(true))
        );
        assert_eq!(translate_window_event(&state, &WindowEvent::CloseRequested), None);
    }

    #[test]
    fn other_buttons_keep_their_code() {
        assert_eq!(button_of(WinitButton::Other(7)), MouseButton::Other(7));
    }
}
