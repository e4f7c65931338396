//! Analog stick normalization

/// 7849 / 32767, the conventional left-stick deadzone for XInput pads.
pub const DEFAULT_STICK_DEADZONE: f32 = 0.2395;

/// Rescale a stick axis in `-1..=1` so the deadzone maps to 0 and the rest
/// fills the full range.
pub fn normalize_stick(value: f32, deadzone: f32) -> f32 {
    let deadzone = deadzone.clamp(0.0, 0.99);
    if value.abs() <= deadzone {
        return 0.0;
    }
    let magnitude = (value.abs() - deadzone) / (1.0 - deadzone);
    value.signum() * magnitude.min(1.0)
}

/// [`normalize_stick`] for raw signed 16-bit axis readings.
pub fn normalize_stick_i16(value: i16, deadzone: f32) -> f32 {
    let scaled = if value < 0 {
        value as f32 / 32768.0
    } else {
        value as f32 / 32767.0
    };
    normalize_stick(scaled, deadzone)
}
