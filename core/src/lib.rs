//! Hotframe Core - real-time loop with hot-reloadable game logic
//!
//! This crate owns everything between the OS and the logic module: memory,
//! input generations, audio synchronization, frame pacing and module reload.
//!
//! # Architecture
//!
//! - [`Runtime`] - Main loop context, driven one tick at a time
//! - [`Platform`] - Window-system side: event pump and presentation
//! - [`AudioSynchronizer`] - Keeps a ring-buffer [`SoundDevice`] fed a frame ahead
//! - [`FramePacer`] - Sleep-then-spin frame limiter
//! - [`HotReloader`] - Swaps logic modules when their file changes

pub mod audio;
pub mod config;
pub mod frame;
pub mod input;
pub mod memory;
pub mod reload;
pub mod runtime;
#[cfg(test)]
pub mod test_utils;
pub mod timing;

pub use audio::{AudioSynchronizer, AudioTick, DeviceError, PlaybackCursors, SoundDevice, SyncMarkers};
pub use config::Config;
pub use frame::FrameBuffer;
pub use input::{InputBuffers, InputSource, KeyboardInput};
pub use memory::MemoryArena;
pub use reload::{Backend, HotReloader, LoadError, LogicModule, ModuleStatus};
pub use runtime::{AudioOutput, Platform, Runtime, TickReport};
pub use timing::{Clock, FramePacer, FrameTiming, SystemClock};

// Re-export the ABI crate so hosts need only one dependency
pub use hotframe_shared as shared;
