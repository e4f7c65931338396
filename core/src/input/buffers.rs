//! Old/new input generations and digital edge detection

use hotframe_shared::{ButtonState, InputFrame};

/// Two input generations; the roles flip every tick without copying.
#[derive(Debug, Clone)]
pub struct InputBuffers {
    frames: [InputFrame; 2],
    new_index: usize,
}

impl Default for InputBuffers {
    fn default() -> Self {
        Self::new()
    }
}

impl InputBuffers {
    pub fn new() -> Self {
        let mut frames = [InputFrame::default(); 2];
        for frame in &mut frames {
            frame.keyboard_mut().is_connected = 1;
        }
        Self { frames, new_index: 0 }
    }

    pub fn old(&self) -> &InputFrame {
        &self.frames[1 - self.new_index]
    }

    pub fn new_frame(&self) -> &InputFrame {
        &self.frames[self.new_index]
    }

    pub fn new_frame_mut(&mut self) -> &mut InputFrame {
        &mut self.frames[self.new_index]
    }

    /// Borrow the previous generation alongside the one being built.
    pub fn split(&mut self) -> (&InputFrame, &mut InputFrame) {
        let [a, b] = &mut self.frames;
        if self.new_index == 0 { (&*b, a) } else { (&*a, b) }
    }

    /// Prepare the new generation for this tick's events.
    ///
    /// Held buttons and connection flags carry over from the old generation;
    /// transition counts and sticks start from zero.
    pub fn begin_frame(&mut self, frame_dt: f32) {
        let (old, new) = self.split();
        *new = InputFrame::default();
        new.frame_dt = frame_dt;
        for (old_controller, new_controller) in old.controllers.iter().zip(&mut new.controllers) {
            new_controller.is_connected = old_controller.is_connected;
            new_controller.is_analog = old_controller.is_analog;
            for (old_button, new_button) in old_controller.buttons.iter().zip(&mut new_controller.buttons) {
                new_button.ended_down = old_button.ended_down;
            }
        }
    }

    /// Hand the new generation over as next tick's old one.
    pub fn swap(&mut self) {
        self.new_index = 1 - self.new_index;
    }
}

/// Apply one keyboard message to a button already seeded for this tick.
///
/// A message that does not change the button is a caller bug; it trips a
/// debug assertion and is ignored otherwise.
pub fn process_keyboard_message(state: &mut ButtonState, is_down: bool) {
    debug_assert!(
        state.is_down() != is_down,
        "keyboard message does not change button state"
    );
    if state.is_down() == is_down {
        return;
    }
    state.set_down(is_down);
    state.half_transition_count = state.half_transition_count.saturating_add(1);
}

/// Set a button from a sampled digital source (one sample per tick).
pub fn process_digital_button(old: &ButtonState, new: &mut ButtonState, pressed: bool) {
    new.set_down(pressed);
    new.half_transition_count = (old.is_down() != pressed) as u32;
}
