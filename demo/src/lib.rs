//! Sample logic module
//!
//! Build it, point the player at the resulting shared library, then edit
//! and rebuild while the player runs. The gradient keeps scrolling from
//! where it was because its offsets live in permanent storage.

use std::f32::consts::TAU;

use bytemuck::{Pod, Zeroable};
use hotframe_shared::{ButtonId, ControllerInput, GameMemory, InputFrame, OffscreenBuffer, SoundOutputBuffer};

const BASE_TONE_HZ: f32 = 256.0;
const TONE_VOLUME: f32 = 3000.0;

/// Everything the demo keeps between ticks, at the start of permanent storage.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct DemoState {
    pub x_offset: i32,
    pub y_offset: i32,
    pub tone_hz: f32,
    pub t_sine: f32,
}

impl DemoState {
    fn init(&mut self) {
        *self = DemoState {
            tone_hz: BASE_TONE_HZ,
            ..DemoState::zeroed()
        };
    }

    pub fn update(&mut self, input: &InputFrame) {
        for controller in input.controllers.iter().filter(|c| c.connected()) {
            self.apply(controller);
        }
    }

    fn apply(&mut self, controller: &ControllerInput) {
        if controller.analog() {
            self.tone_hz = BASE_TONE_HZ + 128.0 * controller.stick_average_y;
            self.x_offset += (4.0 * controller.stick_average_x) as i32;
        } else {
            if controller.button(ButtonId::MoveLeft).is_down() {
                self.x_offset -= 1;
            }
            if controller.button(ButtonId::MoveRight).is_down() {
                self.x_offset += 1;
            }
        }
        if controller.button(ButtonId::ActionDown).is_down() {
            self.y_offset += 1;
        }
        if controller.button(ButtonId::Start).was_pressed() {
            self.tone_hz = BASE_TONE_HZ;
        }
    }

    /// Interleaved stereo sine at the current tone.
    pub fn output_sound(&mut self, samples_per_second: u32, samples: &mut [i16]) {
        let step = TAU * self.tone_hz.max(1.0) / samples_per_second.max(1) as f32;
        for frame in samples.chunks_exact_mut(2) {
            let value = (self.t_sine.sin() * TONE_VOLUME) as i16;
            frame[0] = value;
            frame[1] = value;
            self.t_sine += step;
            if self.t_sine > TAU {
                self.t_sine -= TAU;
            }
        }
    }

    /// Gradient in `0x00RRGGBB`, scrolled by the offsets.
    pub fn render(&self, pixels: &mut [u32], width: usize) {
        for (y, row) in pixels.chunks_exact_mut(width.max(1)).enumerate() {
            for (x, pixel) in row.iter_mut().enumerate() {
                let x = x as i32 + self.x_offset;
                let y = y as i32 + self.y_offset;
                let blue = y as u8;
                let green = x as u8;
                let red = (x + y) as u8;
                *pixel = u32::from_be_bytes([0, red, green, blue]);
            }
        }
    }
}

/// Run `f` on the state stored at the start of permanent storage.
///
/// # Safety
///
/// `memory` must be null or point at the host's memory block, whose
/// permanent storage pointer is valid for `permanent_storage_size` bytes.
unsafe fn with_state(memory: *mut GameMemory, f: impl FnOnce(&mut DemoState)) {
    // SAFETY: upheld by the caller
    let Some(memory) = (unsafe { memory.as_mut() }) else {
        return;
    };
    let size = std::mem::size_of::<DemoState>();
    if memory.permanent_storage.is_null() || (memory.permanent_storage_size as usize) < size {
        return;
    }
    // SAFETY: non-null and at least `size` bytes long
    let bytes = unsafe { std::slice::from_raw_parts_mut(memory.permanent_storage, size) };

    let mut state: DemoState = bytemuck::pod_read_unaligned(bytes);
    if memory.is_initialized == 0 {
        state.init();
        memory.is_initialized = 1;
    }
    f(&mut state);
    bytes.copy_from_slice(bytemuck::bytes_of(&state));
}

/// # Safety
///
/// Called by the host with valid, exclusive pointers for the duration of the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn game_update_and_render(
    memory: *mut GameMemory,
    input: *const InputFrame,
    buffer: *mut OffscreenBuffer,
) {
    // SAFETY: upheld by the caller
    let (Some(input), Some(buffer)) = (unsafe { input.as_ref() }, unsafe { buffer.as_ref() }) else {
        return;
    };
    let width = buffer.width.max(0) as usize;
    let height = buffer.height.max(0) as usize;
    let packed = !buffer.memory.is_null() && buffer.bytes_per_pixel == 4 && buffer.pitch as usize == width * 4;

    // SAFETY: upheld by the caller
    unsafe {
        with_state(memory, |state| {
            state.update(input);
            if packed {
                // SAFETY: the host hands over a tightly packed width x height buffer of u32 pixels
                let pixels = std::slice::from_raw_parts_mut(buffer.memory.cast::<u32>(), width * height);
                state.render(pixels, width);
            }
        })
    };
}

/// # Safety
///
/// Called by the host with valid, exclusive pointers for the duration of the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn game_get_sound_samples(memory: *mut GameMemory, sound: *mut SoundOutputBuffer) {
    // SAFETY: upheld by the caller
    let Some(sound) = (unsafe { sound.as_ref() }) else {
        return;
    };
    if sound.samples.is_null() || sound.sample_count <= 0 {
        return;
    }
    // SAFETY: the host provides sample_count stereo frames
    let samples = unsafe { std::slice::from_raw_parts_mut(sound.samples, sound.sample_count as usize * 2) };
    // SAFETY: upheld by the caller
    unsafe { with_state(memory, |state| state.output_sound(sound.samples_per_second.max(0) as u32, samples)) };
}
