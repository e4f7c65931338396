//! Main loop orchestration
//!
//! [`Runtime`] is the explicit context the loop runs in: memory, back
//! buffer, input generations, reloader, audio and pacer, all owned in one
//! place and driven one tick at a time.

use std::ops::ControlFlow;

use crate::audio::{AudioSynchronizer, AudioTick, SoundDevice, SyncMarkers};
use crate::config::Config;
use crate::frame::FrameBuffer;
use crate::input::{InputBuffers, InputSource};
use crate::memory::MemoryArena;
use crate::reload::{HotReloader, ModuleStatus};
use crate::timing::{Clock, FramePacer, FrameTiming};
use hotframe_shared::InputFrame;

mod game_loop;

#[cfg(test)]
mod tests;

/// The window-system side of the loop.
pub trait Platform {
    /// Drain pending OS events into the new input generation.
    ///
    /// Returning `Break` stops the loop after the current tick.
    fn pump_events(&mut self, old: &InputFrame, new: &mut InputFrame) -> ControlFlow<()>;

    /// Show the finished back buffer.
    fn present(&mut self, frame: &FrameBuffer, markers: Option<&SyncMarkers>);
}

/// A sound device paired with the synchronizer feeding it.
pub struct AudioOutput<D: SoundDevice> {
    pub device: D,
    pub synchronizer: AudioSynchronizer,
}

/// What happened during one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Index of the tick, starting at 0.
    pub frame_index: u64,
    pub timing: FrameTiming,
    /// `None` when running without a sound device.
    pub audio: Option<AudioTick>,
    /// New module status if a reload happened this tick.
    pub reloaded: Option<ModuleStatus>,
    /// False once the platform asked to stop.
    pub running: bool,
}

/// Main loop context.
pub struct Runtime<D: SoundDevice, C: Clock> {
    config: Config,
    memory: MemoryArena,
    frame: FrameBuffer,
    input: InputBuffers,
    sources: Vec<Box<dyn InputSource>>,
    reloader: HotReloader,
    audio: Option<AudioOutput<D>>,
    clock: C,
    pacer: FramePacer,
    running: bool,
    frame_index: u64,
}

impl<D: SoundDevice, C: Clock> Runtime<D, C> {
    /// Build the loop context. Memory is allocated here and never moved.
    pub fn new(config: Config, reloader: HotReloader, device: Option<D>, clock: C) -> Self {
        let update_hz = config.timing.update_hz.max(1);
        let memory = MemoryArena::from_config(&config.memory);
        let frame = FrameBuffer::new(config.video.width, config.video.height);

        let audio = device.map(|mut device| {
            let mut synchronizer = AudioSynchronizer::for_device(&device, update_hz, &config.audio);
            if let Err(e) = synchronizer.clear(&mut device) {
                tracing::warn!("Could not clear sound buffer: {}", e);
            }
            AudioOutput { device, synchronizer }
        });

        let pacer = FramePacer::new(&clock, update_hz, config.timing.sleep_granularity());

        tracing::info!(
            update_hz,
            width = config.video.width,
            height = config.video.height,
            audio = audio.is_some(),
            module = %reloader.source().display(),
            "Runtime initialized"
        );

        Self {
            config,
            memory,
            frame,
            input: InputBuffers::new(),
            sources: Vec::new(),
            reloader,
            audio,
            clock,
            pacer,
            running: true,
            frame_index: 0,
        }
    }

    /// Poll `source` every tick after the platform's event pump.
    pub fn add_input_source(&mut self, source: Box<dyn InputSource>) {
        self.sources.push(source);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn memory(&self) -> &MemoryArena {
        &self.memory
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    pub fn input(&self) -> &InputBuffers {
        &self.input
    }

    pub fn reloader(&self) -> &HotReloader {
        &self.reloader
    }

    pub fn audio(&self) -> Option<&AudioOutput<D>> {
        self.audio.as_ref()
    }

    pub fn audio_mut(&mut self) -> Option<&mut AudioOutput<D>> {
        self.audio.as_mut()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn pacer(&self) -> &FramePacer {
        &self.pacer
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Ticks completed so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Stop after the current tick.
    pub fn stop(&mut self) {
        self.running = false;
    }
}
