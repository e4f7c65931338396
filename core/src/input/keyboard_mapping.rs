//! Keyboard to controller-button mapping

use hashbrown::HashMap;
use hotframe_shared::ButtonId;
use serde::{Deserialize, Serialize};
use winit::keyboard::KeyCode;

/// Which key drives each button of the keyboard controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyboardMapping {
    #[serde(with = "super::keycode_serde")]
    pub move_up: KeyCode,
    #[serde(with = "super::keycode_serde")]
    pub move_down: KeyCode,
    #[serde(with = "super::keycode_serde")]
    pub move_left: KeyCode,
    #[serde(with = "super::keycode_serde")]
    pub move_right: KeyCode,

    #[serde(with = "super::keycode_serde")]
    pub action_up: KeyCode,
    #[serde(with = "super::keycode_serde")]
    pub action_down: KeyCode,
    #[serde(with = "super::keycode_serde")]
    pub action_left: KeyCode,
    #[serde(with = "super::keycode_serde")]
    pub action_right: KeyCode,

    #[serde(with = "super::keycode_serde")]
    pub left_shoulder: KeyCode,
    #[serde(with = "super::keycode_serde")]
    pub right_shoulder: KeyCode,

    #[serde(with = "super::keycode_serde")]
    pub back: KeyCode,
    #[serde(with = "super::keycode_serde")]
    pub start: KeyCode,
}

impl Default for KeyboardMapping {
    fn default() -> Self {
        Self {
            // WASD to move
            move_up: KeyCode::KeyW,
            move_down: KeyCode::KeyS,
            move_left: KeyCode::KeyA,
            move_right: KeyCode::KeyD,

            // Arrows for actions
            action_up: KeyCode::ArrowUp,
            action_down: KeyCode::ArrowDown,
            action_left: KeyCode::ArrowLeft,
            action_right: KeyCode::ArrowRight,

            left_shoulder: KeyCode::KeyQ,
            right_shoulder: KeyCode::KeyE,

            back: KeyCode::Escape,
            start: KeyCode::Space,
        }
    }
}

impl KeyboardMapping {
    /// Every binding, in [`ButtonId`] order.
    pub fn bindings(&self) -> [(ButtonId, KeyCode); 12] {
        [
            (ButtonId::MoveUp, self.move_up),
            (ButtonId::MoveDown, self.move_down),
            (ButtonId::MoveLeft, self.move_left),
            (ButtonId::MoveRight, self.move_right),
            (ButtonId::ActionUp, self.action_up),
            (ButtonId::ActionDown, self.action_down),
            (ButtonId::ActionLeft, self.action_left),
            (ButtonId::ActionRight, self.action_right),
            (ButtonId::LeftShoulder, self.left_shoulder),
            (ButtonId::RightShoulder, self.right_shoulder),
            (ButtonId::Back, self.back),
            (ButtonId::Start, self.start),
        ]
    }

    /// The first button bound to `key`.
    pub fn button_for(&self, key: KeyCode) -> Option<ButtonId> {
        self.bindings().into_iter().find(|(_, k)| *k == key).map(|(id, _)| id)
    }

    /// Keys bound to more than one button, with the buttons they hit.
    pub fn conflicts(&self) -> Vec<(KeyCode, Vec<ButtonId>)> {
        let mut by_key: HashMap<KeyCode, Vec<ButtonId>> = HashMap::new();
        for (id, key) in self.bindings() {
            by_key.entry(key).or_default().push(id);
        }
        let mut conflicts: Vec<_> = by_key.into_iter().filter(|(_, ids)| ids.len() > 1).collect();
        conflicts.sort_by_key(|(_, ids)| ids[0] as usize);
        conflicts
    }
}
