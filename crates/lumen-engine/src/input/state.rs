use std::collections::HashSet;

use super::frame::InputFrame;
use super::types::{ButtonState, InputEvent, Key, MouseButton};

/// Current input state for a single window.
///
/// Holds "is down" information and current pointer position.
/// Per-frame transitions are recorded into an `InputFrame`.
#[derive(Debug, Default)]
pub struct InputState {
    /// Whether the window is focused.
    pub focused: bool,

    /// Pointer position in physical pixels.
    pub pointer_pos: Option<(f32, f32)>,

    /// Set of currently held keys.
    pub keys_down: HashSet<Key>,

    /// Set of currently held mouse buttons.
    pub buttons_down: HashSet<MouseButton>,
}

impl InputState {
    /// Applies a platform-agnostic input event to the current state and writes deltas to `frame`.
    pub fn apply_event(&mut self, frame: &mut InputFrame, ev: InputEvent) {
        match ev {
            InputEvent::Focused(f) => {
                self.focused = f;
                if !f {
                    // Avoids stuck keys/buttons when focus changes mid-press.
                    self.keys_down.clear();
                    self.buttons_down.clear();
                }
            }

            InputEvent::PointerMoved { x, y } => {
                if let Some((px, py)) = self.pointer_pos {
                    frame.pointer_delta.0 += x - px;
                    frame.pointer_delta.1 += y - py;
                }
                self.pointer_pos = Some((x, y));
            }

            InputEvent::PointerLeft => {
                self.pointer_pos = None;
            }

            InputEvent::Key { key, state, repeat } => match state {
                ButtonState::Pressed => {
                    if self.keys_down.insert(key) && !repeat {
                        frame.keys_pressed.insert(key);
                    }
                }
                ButtonState::Released => {
                    if self.keys_down.remove(&key) {
                        frame.keys_released.insert(key);
                    }
                }
            },

            InputEvent::PointerButton { button, state } => match state {
                ButtonState::Pressed => {
                    if self.buttons_down.insert(button) {
                        frame.buttons_pressed.insert(button);
                    }
                }
                ButtonState::Released => {
                    if self.buttons_down.remove(&button) {
                        frame.buttons_released.insert(button);
                    }
                }
            },

            InputEvent::MouseWheel { lines } => {
                frame.wheel += lines;
            }
        }
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    pub fn button_down(&self, btn: MouseButton) -> bool {
        self.buttons_down.contains(&btn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(key: Key, state: ButtonState) -> InputEvent {
        InputEvent::Key { key, state, repeat: false }
    }

    #[test]
    fn press_and_release_recorded_once() {
        let mut s = InputState::default();
        let mut f = InputFrame::default();

        s.apply_event(&mut f, key(Key::Space, ButtonState::Pressed));
        s.apply_event(&mut f, key(Key::Space, ButtonState::Pressed));
        assert!(s.key_down(Key::Space));
        assert!(f.key_pressed(Key::Space));
        assert_eq!(f.keys_pressed.len(), 1);

        f.clear();
        s.apply_event(&mut f, key(Key::Space, ButtonState::Released));
        assert!(!s.key_down(Key::Space));
        assert!(f.keys_released.contains(&Key::Space));
        assert!(!f.key_pressed(Key::Space));
    }

    #[test]
    fn pointer_delta_accumulates_after_first_position() {
        let mut s = InputState::default();
        let mut f = InputFrame::default();

        s.apply_event(&mut f, InputEvent::PointerMoved { x: 10.0, y: 10.0 });
        assert_eq!(f.pointer_delta, (0.0, 0.0));
        s.apply_event(&mut f, InputEvent::PointerMoved { x: 13.0, y: 8.0 });
        s.apply_event(&mut f, InputEvent::PointerMoved { x: 15.0, y: 8.0 });
        assert_eq!(f.pointer_delta, (5.0, -2.0));
        assert_eq!(s.pointer_pos, Some((15.0, 8.0)));
    }

    #[test]
    fn focus_loss_clears_held_inputs() {
        let mut s = InputState::default();
        let mut f = InputFrame::default();

        s.apply_event(&mut f, key(Key::W, ButtonState::Pressed));
        s.apply_event(
            &mut f,
            InputEvent::PointerButton { button: MouseButton::Left, state: ButtonState::Pressed },
        );
        s.apply_event(&mut f, InputEvent::Focused(false));
        assert!(s.keys_down.is_empty());
        assert!(s.buttons_down.is_empty());
    }

    #[test]
    fn frame_clear_resets_deltas() {
        let mut f = InputFrame::default();
        f.wheel = 2.0;
        f.pointer_delta = (1.0, 1.0);
        f.keys_pressed.insert(Key::A);
        f.clear();
        assert_eq!(f.wheel, 0.0);
        assert_eq!(f.pointer_delta, (0.0, 0.0));
        assert!(f.keys_pressed.is_empty());
    }
}
