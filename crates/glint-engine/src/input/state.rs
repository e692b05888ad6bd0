use std::collections::HashSet;

use crate::coords::Vec2;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Key {
    Escape,
    Enter,
    Space,
    Tab,
    Backspace,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    /// `0`–`9` on the main row.
    Digit(u8),
    /// Uppercase ASCII letter.
    Letter(char),
    Unknown(u32),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Other(u16),
}

/// Input event in logical pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum InputEvent {
    PointerMoved(Vec2),
    PointerLeft,
    Button { button: MouseButton, pressed: bool },
    Key { key: Key, pressed: bool, repeat: bool },
    /// Scroll in lines, +Y away from the user.
    Wheel(Vec2),
    Focused(bool),
}

/// Held keys and buttons plus the transitions of the current frame.
#[derive(Debug, Default)]
pub struct InputState {
    pub pointer: Option<Vec2>,
    pub focused: bool,
    keys_down: HashSet<Key>,
    buttons_down: HashSet<MouseButton>,
    keys_pressed: HashSet<Key>,
    buttons_pressed: HashSet<MouseButton>,
    buttons_released: HashSet<MouseButton>,
    wheel: Vec2,
}

impl InputState {
    pub fn apply(&mut self, event: InputEvent) {
        match event {
            InputEvent::PointerMoved(p) => self.pointer = Some(p),
            InputEvent::PointerLeft => self.pointer = None,
            InputEvent::Button { button, pressed: true } => {
                if self.buttons_down.insert(button) {
                    self.buttons_pressed.insert(button);
                }
            }
            InputEvent::Button { button, pressed: false } => {
                if self.buttons_down.remove(&button) {
                    self.buttons_released.insert(button);
                }
            }
            InputEvent::Key { key, pressed: true, repeat } => {
                if self.keys_down.insert(key) && !repeat {
                    self.keys_pressed.insert(key);
                }
            }
            InputEvent::Key { key, pressed: false, .. } => {
                self.keys_down.remove(&key);
            }
            InputEvent::Wheel(delta) => self.wheel = self.wheel + delta,
            InputEvent::Focused(focused) => {
                self.focused = focused;
                if !focused {
                    // Releases are not delivered while unfocused.
                    self.keys_down.clear();
                    self.buttons_down.clear();
                }
            }
        }
    }

    /// Clears per-frame transitions. Called by the runtime after each frame.
    pub fn end_frame(&mut self) {
        self.keys_pressed.clear();
        self.buttons_pressed.clear();
        self.buttons_released.clear();
        self.wheel = Vec2::zero();
    }

    pub fn key_down(&self, key: Key) -> bool {
        self.keys_down.contains(&key)
    }

    /// Went down this frame.
    pub fn key_pressed(&self, key: Key) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn button_down(&self, button: MouseButton) -> bool {
        self.buttons_down.contains(&button)
    }

    pub fn button_pressed(&self, button: MouseButton) -> bool {
        self.buttons_pressed.contains(&button)
    }

    pub fn button_released(&self, button: MouseButton) -> bool {
        self.buttons_released.contains(&button)
    }

    /// Accumulated scroll this frame.
    pub fn wheel(&self) -> Vec2 {
        self.wheel
    }
}
