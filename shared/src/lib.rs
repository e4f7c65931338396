//! Shared ABI types for hotframe logic modules.
//!
//! Everything in here crosses the host/module boundary, so every type is
//! `#[repr(C)]`. Input types are also `Pod` so they can be copied byte-for-byte
//! into a WebAssembly guest's linear memory.

use bytemuck::{Pod, Zeroable};

/// Controller slot reserved for the keyboard.
pub const KEYBOARD_CONTROLLER: usize = 0;

/// Number of gamepad slots after the keyboard.
pub const MAX_GAMEPADS: usize = 4;

/// Total controller records in an [`InputFrame`].
pub const MAX_CONTROLLERS: usize = 1 + MAX_GAMEPADS;

/// Number of named digital buttons per controller.
pub const BUTTON_COUNT: usize = 12;

/// Bytes in one interleaved stereo 16-bit sample frame.
pub const BYTES_PER_SAMPLE: u32 = (2 * std::mem::size_of::<i16>()) as u32;

/// Exported symbol for [`UpdateAndRenderFn`] in native modules.
pub const UPDATE_AND_RENDER_SYMBOL: &[u8] = b"game_update_and_render\0";

/// Exported symbol for [`GetSoundSamplesFn`] in native modules.
pub const GET_SOUND_SAMPLES_SYMBOL: &[u8] = b"game_get_sound_samples\0";

/// Export names used by WebAssembly modules.
pub mod wasm_exports {
    pub const MEMORY: &str = "memory";
    /// `(state_ptr, state_len, input_ptr, pixels_ptr, width, height, pitch)`
    pub const UPDATE_AND_RENDER: &str = "update_and_render";
    /// `(state_ptr, state_len, samples_ptr, sample_count, samples_per_second)`
    pub const GET_SOUND_SAMPLES: &str = "get_sound_samples";
}

/// Per-tick update: advance the simulation and draw into `buffer`.
pub type UpdateAndRenderFn =
    unsafe extern "C" fn(memory: *mut GameMemory, input: *const InputFrame, buffer: *mut OffscreenBuffer);

/// Audio fill: write exactly `sound.sample_count` stereo frames into `sound.samples`.
pub type GetSoundSamplesFn = unsafe extern "C" fn(memory: *mut GameMemory, sound: *mut SoundOutputBuffer);

/// One digital button's state for a single tick.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ButtonState {
    /// Up/down edges observed since the previous tick.
    pub half_transition_count: u32,
    /// Nonzero if the button was held when the tick ended.
    pub ended_down: u32,
}

impl ButtonState {
    pub fn is_down(&self) -> bool {
        self.ended_down != 0
    }

    pub fn set_down(&mut self, down: bool) {
        self.ended_down = down as u32;
    }

    /// True if the button went down at least once this tick.
    pub fn was_pressed(&self) -> bool {
        self.half_transition_count > 1 || (self.half_transition_count == 1 && self.is_down())
    }
}

/// Index of a named button inside [`ControllerInput::buttons`].
#[repr(usize)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonId {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    ActionUp,
    ActionDown,
    ActionLeft,
    ActionRight,
    LeftShoulder,
    RightShoulder,
    Back,
    Start,
}

impl ButtonId {
    pub const ALL: [ButtonId; BUTTON_COUNT] = [
        ButtonId::MoveUp,
        ButtonId::MoveDown,
        ButtonId::MoveLeft,
        ButtonId::MoveRight,
        ButtonId::ActionUp,
        ButtonId::ActionDown,
        ButtonId::ActionLeft,
        ButtonId::ActionRight,
        ButtonId::LeftShoulder,
        ButtonId::RightShoulder,
        ButtonId::Back,
        ButtonId::Start,
    ];
}

/// State of one keyboard-style or gamepad-style controller.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct ControllerInput {
    pub is_connected: u32,
    pub is_analog: u32,
    /// Stick X, normalized to -1..1 after deadzone.
    pub stick_average_x: f32,
    /// Stick Y, normalized to -1..1 after deadzone (up is positive).
    pub stick_average_y: f32,
    pub buttons: [ButtonState; BUTTON_COUNT],
}

impl ControllerInput {
    pub fn button(&self, id: ButtonId) -> &ButtonState {
        &self.buttons[id as usize]
    }

    pub fn button_mut(&mut self, id: ButtonId) -> &mut ButtonState {
        &mut self.buttons[id as usize]
    }

    pub fn connected(&self) -> bool {
        self.is_connected != 0
    }

    pub fn analog(&self) -> bool {
        self.is_analog != 0
    }
}

/// All controller records for one tick.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct InputFrame {
    /// Seconds the logic module should advance this tick.
    pub frame_dt: f32,
    pub controllers: [ControllerInput; MAX_CONTROLLERS],
}

impl InputFrame {
    pub fn keyboard(&self) -> &ControllerInput {
        &self.controllers[KEYBOARD_CONTROLLER]
    }

    pub fn keyboard_mut(&mut self) -> &mut ControllerInput {
        &mut self.controllers[KEYBOARD_CONTROLLER]
    }

    /// Gamepad `index` (0-based, not counting the keyboard).
    pub fn gamepad(&self, index: usize) -> Option<&ControllerInput> {
        self.controllers.get(1 + index)
    }

    pub fn gamepad_mut(&mut self, index: usize) -> Option<&mut ControllerInput> {
        self.controllers.get_mut(1 + index)
    }
}

/// Borrowed view of the host's back buffer (32-bit pixels, `0x00RRGGBB`).
#[repr(C)]
#[derive(Debug)]
pub struct OffscreenBuffer {
    pub memory: *mut u8,
    pub width: i32,
    pub height: i32,
    /// Bytes per row.
    pub pitch: i32,
    pub bytes_per_pixel: i32,
}

/// Destination for one audio fill request.
#[repr(C)]
#[derive(Debug)]
pub struct SoundOutputBuffer {
    pub samples_per_second: i32,
    /// Stereo frames requested; `samples` holds twice as many `i16`s.
    pub sample_count: i32,
    pub samples: *mut i16,
}

/// Host-owned memory handed to the logic module on every call.
///
/// The storage pointers are stable for the life of the process; reloading a
/// module swaps code, never these regions.
#[repr(C)]
#[derive(Debug)]
pub struct GameMemory {
    pub is_initialized: u32,
    pub permanent_storage_size: u64,
    pub permanent_storage: *mut u8,
    pub transient_storage_size: u64,
    pub transient_storage: *mut u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_frame_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<ButtonState>(), 8);
        assert_eq!(
            std::mem::size_of::<ControllerInput>(),
            16 + BUTTON_COUNT * std::mem::size_of::<ButtonState>()
        );
        assert_eq!(
            std::mem::size_of::<InputFrame>(),
            4 + MAX_CONTROLLERS * std::mem::size_of::<ControllerInput>()
        );
    }

    #[test]
    fn test_button_ids_cover_every_slot() {
        for (index, id) in ButtonId::ALL.iter().enumerate() {
            assert_eq!(*id as usize, index);
        }
    }

    #[test]
    fn test_was_pressed() {
        let held = ButtonState { half_transition_count: 0, ended_down: 1 };
        assert!(!held.was_pressed());

        let pressed = ButtonState { half_transition_count: 1, ended_down: 1 };
        assert!(pressed.was_pressed());

        let released = ButtonState { half_transition_count: 1, ended_down: 0 };
        assert!(!released.was_pressed());

        let tapped = ButtonState { half_transition_count: 2, ended_down: 0 };
        assert!(tapped.was_pressed());
    }

    #[test]
    fn test_gamepad_index_offsets_past_keyboard() {
        let mut frame = InputFrame::default();
        frame.gamepad_mut(0).unwrap().is_connected = 1;
        assert!(frame.controllers[1].connected());
        assert!(!frame.keyboard().connected());
        assert!(frame.gamepad(MAX_GAMEPADS).is_none());
    }
}
