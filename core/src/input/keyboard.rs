//! Keyboard messages into the keyboard controller

use hashbrown::HashSet;
use hotframe_shared::InputFrame;
use winit::keyboard::KeyCode;

use super::KeyboardMapping;
use super::buffers::process_keyboard_message;

/// Turns raw key transitions into keyboard-controller edges.
///
/// Keys are tracked individually so repeats, and releases of keys pressed
/// before the window had focus, never reach edge detection.
#[derive(Debug, Clone, Default)]
pub struct KeyboardInput {
    mapping: KeyboardMapping,
    held: HashSet<KeyCode>,
}

impl KeyboardInput {
    pub fn new(mapping: KeyboardMapping) -> Self {
        Self {
            mapping,
            held: HashSet::new(),
        }
    }

    pub fn mapping(&self) -> &KeyboardMapping {
        &self.mapping
    }

    /// Apply one key message to the generation being built.
    pub fn handle_key(&mut self, new: &mut InputFrame, key: KeyCode, is_down: bool) {
        let changed = if is_down {
            self.held.insert(key)
        } else {
            self.held.remove(&key)
        };
        if !changed {
            return;
        }
        if let Some(id) = self.mapping.button_for(key) {
            let button = new.keyboard_mut().button_mut(id);
            if button.is_down() != is_down {
                process_keyboard_message(button, is_down);
            }
        }
    }

    /// Release everything, e.g. when the window loses focus.
    pub fn release_all(&mut self, new: &mut InputFrame) {
        let held: Vec<KeyCode> = self.held.iter().copied().collect();
        for key in held {
            self.handle_key(new, key, false);
        }
    }
}
