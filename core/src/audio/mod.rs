//! Audio output: device abstraction, cursor math and per-tick synchronization
//!
//! - [`SoundDevice`] - ring-buffer device the host writes into
//! - [`AudioSynchronizer`] - decides where and how much to write each tick
//! - [`SyncMarkers`] - optional debug history of cursor observations

mod cursor;
mod device;
mod markers;
mod sync;

pub use cursor::{bytes_to_write, sample_offset};
pub use device::{DeviceError, PlaybackCursors, SoundDevice, WriteSpan};
pub use markers::{DebugTimeMarker, SyncMarkers};
pub use sync::{AudioSynchronizer, AudioTick, Latency, SoundOutput, WritePlan};

#[cfg(test)]
mod tests;
