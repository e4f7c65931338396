//! Gamepad snapshot processing

use hotframe_shared::{ButtonId, ControllerInput};

use super::buffers::process_digital_button;
use super::deadzone::normalize_stick;

/// Stick deflection past which a `move_*` button reads as held.
const STICK_BUTTON_THRESHOLD: f32 = 0.5;

/// Raw state of one gamepad, sampled once per tick.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PadState {
    /// Raw stick axes in `-1..=1`, up positive, before deadzone.
    pub stick_x: f32,
    pub stick_y: f32,
    pub dpad_up: bool,
    pub dpad_down: bool,
    pub dpad_left: bool,
    pub dpad_right: bool,
    pub action_up: bool,
    pub action_down: bool,
    pub action_left: bool,
    pub action_right: bool,
    pub left_shoulder: bool,
    pub right_shoulder: bool,
    pub back: bool,
    pub start: bool,
}

/// Fill `new` from a pad snapshot, counting edges against `old`.
///
/// The d-pad overrides the stick to full deflection and marks the controller
/// digital for the tick. The stick drives the `move_*` buttons either way.
pub fn process_pad(old: &ControllerInput, new: &mut ControllerInput, pad: &PadState, deadzone: f32) {
    new.is_connected = 1;
    new.is_analog = 1;
    new.stick_average_x = normalize_stick(pad.stick_x, deadzone);
    new.stick_average_y = normalize_stick(pad.stick_y, deadzone);

    if pad.dpad_up {
        new.stick_average_y = 1.0;
        new.is_analog = 0;
    }
    if pad.dpad_down {
        new.stick_average_y = -1.0;
        new.is_analog = 0;
    }
    if pad.dpad_left {
        new.stick_average_x = -1.0;
        new.is_analog = 0;
    }
    if pad.dpad_right {
        new.stick_average_x = 1.0;
        new.is_analog = 0;
    }

    let x = new.stick_average_x;
    let y = new.stick_average_y;
    let held = [
        (ButtonId::MoveUp, y > STICK_BUTTON_THRESHOLD),
        (ButtonId::MoveDown, y < -STICK_BUTTON_THRESHOLD),
        (ButtonId::MoveLeft, x < -STICK_BUTTON_THRESHOLD),
        (ButtonId::MoveRight, x > STICK_BUTTON_THRESHOLD),
        (ButtonId::ActionUp, pad.action_up),
        (ButtonId::ActionDown, pad.action_down),
        (ButtonId::ActionLeft, pad.action_left),
        (ButtonId::ActionRight, pad.action_right),
        (ButtonId::LeftShoulder, pad.left_shoulder),
        (ButtonId::RightShoulder, pad.right_shoulder),
        (ButtonId::Back, pad.back),
        (ButtonId::Start, pad.start),
    ];
    for (id, pressed) in held {
        process_digital_button(old.button(id), new.button_mut(id), pressed);
    }
}

/// Mark a controller slot as empty for this tick.
pub fn disconnect(new: &mut ControllerInput) {
    *new = ControllerInput::default();
}
