//! Gamepads through gilrs

use gilrs::{Axis, Button, EventType, GamepadId, Gilrs};
use hashbrown::HashMap;
use hotframe_shared::{InputFrame, MAX_GAMEPADS};

use super::InputSource;
use super::pad::{PadState, disconnect, process_pad};

/// Polls gilrs and fills gamepad controllers 1..=4.
pub struct GilrsInput {
    gilrs: Gilrs,
    /// Gamepad id to gamepad slot (0-based, not counting the keyboard)
    slots: HashMap<GamepadId, usize>,
    deadzone: f32,
}

impl GilrsInput {
    /// Returns `None` if the platform has no gamepad support.
    pub fn new(deadzone: f32) -> Option<Self> {
        match Gilrs::new() {
            Ok(gilrs) => {
                let mut input = Self {
                    gilrs,
                    slots: HashMap::new(),
                    deadzone,
                };
                let already_connected: Vec<GamepadId> = input.gilrs.gamepads().map(|(id, _)| id).collect();
                for id in already_connected {
                    input.connect(id);
                }
                Some(input)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to initialize gamepad support: {}. Gamepads will not be available.",
                    e
                );
                None
            }
        }
    }

    fn connect(&mut self, id: GamepadId) {
        if self.slots.contains_key(&id) {
            return;
        }
        let free_slot = (0..MAX_GAMEPADS).find(|slot| !self.slots.values().any(|s| s == slot));
        match free_slot {
            Some(slot) => {
                self.slots.insert(id, slot);
                tracing::info!("Gamepad {} connected as controller {}", id, slot + 1);
            }
            None => tracing::warn!("Gamepad {} connected but all controller slots are taken", id),
        }
    }

    fn snapshot(gamepad: &gilrs::Gamepad) -> PadState {
        let btn = |button: Button| gamepad.is_pressed(button);
        PadState {
            stick_x: gamepad.value(Axis::LeftStickX),
            stick_y: gamepad.value(Axis::LeftStickY),
            dpad_up: btn(Button::DPadUp),
            dpad_down: btn(Button::DPadDown),
            dpad_left: btn(Button::DPadLeft),
            dpad_right: btn(Button::DPadRight),
            // North/South/West/East face buttons
            action_up: btn(Button::North),
            action_down: btn(Button::South),
            action_left: btn(Button::West),
            action_right: btn(Button::East),
            left_shoulder: btn(Button::LeftTrigger),
            right_shoulder: btn(Button::RightTrigger),
            back: btn(Button::Select),
            start: btn(Button::Start),
        }
    }
}

impl InputSource for GilrsInput {
    fn poll(&mut self, old: &InputFrame, new: &mut InputFrame) {
        while let Some(event) = self.gilrs.next_event() {
            match event.event {
                EventType::Connected => self.connect(event.id),
                EventType::Disconnected => {
                    if let Some(slot) = self.slots.remove(&event.id) {
                        tracing::info!("Gamepad {} (controller {}) disconnected", event.id, slot + 1);
                    }
                }
                _ => {}
            }
        }

        for slot in 0..MAX_GAMEPADS {
            let Some(new_controller) = new.gamepad_mut(slot) else {
                continue;
            };
            let pad = self
                .slots
                .iter()
                .find(|&(_, s)| *s == slot)
                .map(|(id, _)| Self::snapshot(&self.gilrs.gamepad(*id)));
            match (pad, old.gamepad(slot)) {
                (Some(pad), Some(old_controller)) => {
                    process_pad(old_controller, new_controller, &pad, self.deadzone)
                }
                _ => disconnect(new_controller),
            }
        }
    }
}
