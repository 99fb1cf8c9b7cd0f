//! Keyboard state collected from window events.

use smallvec::SmallVec;
use winit::event::{ElementState, VirtualKeyCode};

const SIMULTANEOUS_KEY_COUNT: usize = 12;

#[derive(Default)]
pub struct InputController {

    pressed: KeySet,
    just_pressed: KeySet,
}

impl InputController {

    pub(crate) fn record_key(&mut self, code: VirtualKeyCode, state: ElementState) {

        match state {
            | ElementState::Pressed => {
                // key repeat sends `Pressed` again, only the first one counts as a new press.
                if !self.pressed.contains(code) {
                    self.just_pressed.insert(code);
                }
                self.pressed.insert(code);
            },
            | ElementState::Released => {
                self.pressed.remove(code);
            },
        }
    }

    /// Whether `code` is held down.
    pub fn is_key_pressed(&self, code: VirtualKeyCode) -> bool {
        self.pressed.contains(code)
    }

    /// Whether `code` went down since the previous frame, used to toggle sample options.
    pub fn is_key_just_pressed(&self, code: VirtualKeyCode) -> bool {
        self.just_pressed.contains(code)
    }

    pub fn is_key_active(&self) -> bool {
        !self.just_pressed.is_empty()
    }

    pub(crate) fn tick_frame(&mut self) {
        self.just_pressed.clear();
    }
}

#[derive(Default)]
struct KeySet {
    keys: SmallVec<[VirtualKeyCode; SIMULTANEOUS_KEY_COUNT]>,
}

impl KeySet {

    fn insert(&mut self, code: VirtualKeyCode) {

        if !self.contains(code) {
            self.keys.push(code);
        }
    }

    fn remove(&mut self, code: VirtualKeyCode) {

        if let Some(index) = self.keys.iter().position(|&key| key == code) {
            self.keys.swap_remove(index);
        }
    }

    fn contains(&self, code: VirtualKeyCode) -> bool {
        self.keys.iter().any(|&key| key == code)
    }

    fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn clear(&mut self) {
        self.keys.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_press_is_not_a_new_press() {

        let mut input = InputController::default();
        input.record_key(VirtualKeyCode::C, ElementState::Pressed);
        assert!(input.is_key_just_pressed(VirtualKeyCode::C));

        input.tick_frame();
        input.record_key(VirtualKeyCode::C, ElementState::Pressed);
        assert!(input.is_key_pressed(VirtualKeyCode::C));
        assert!(!input.is_key_just_pressed(VirtualKeyCode::C));
    }

    #[test]
    fn release_clears_pressed_state() {

        let mut input = InputController::default();
        input.record_key(VirtualKeyCode::F, ElementState::Pressed);
        input.record_key(VirtualKeyCode::F, ElementState::Released);
        assert!(!input.is_key_pressed(VirtualKeyCode::F));
        // the press still happened during this frame.
        assert!(input.is_key_just_pressed(VirtualKeyCode::F));

        input.tick_frame();
        assert!(!input.is_key_active());
    }
}
