//! Input handling: double-buffered controller state with edge detection
//!
//! Each tick the new generation is seeded from the old one, keyboard
//! messages and gamepad samples are applied on top, the logic module reads
//! it, and the generations swap.

mod buffers;
mod deadzone;
#[cfg(feature = "gamepad")]
mod gamepad;
mod keyboard;
mod keyboard_mapping;
pub(crate) mod keycode_serde;
mod pad;


pub use buffers::{InputBuffers, process_digital_button, process_keyboard_message};
pub use deadzone::{DEFAULT_STICK_DEADZONE, normalize_stick, normalize_stick_i16};
#[cfg(feature = "gamepad")]
pub use gamepad::GilrsInput;
pub use keyboard::KeyboardInput;
pub use keyboard_mapping::KeyboardMapping;
pub use pad::{PadState, disconnect, process_pad};

use hotframe_shared::InputFrame;
use serde::{Deserialize, Serialize};

/// A device polled once per tick after the platform's event pump.
pub trait InputSource {
    /// Fill this source's controllers in `new`, counting edges against `old`.
    fn poll(&mut self, old: &InputFrame, new: &mut InputFrame);
}

/// Input configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Deadzone for analog sticks (0.0-1.0)
    #[serde(default = "default_deadzone")]
    pub stick_deadzone: f32,

    /// Keyboard controller bindings
    #[serde(default)]
    pub keyboard: KeyboardMapping,
}

fn default_deadzone() -> f32 {
    DEFAULT_STICK_DEADZONE
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            stick_deadzone: default_deadzone(),
            keyboard: KeyboardMapping::default(),
        }
    }
}
