//! Shared fakes for unit tests

use std::cell::Cell;
use std::ops::ControlFlow;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

use hotframe_shared::{ButtonId, InputFrame};

use crate::audio::{DeviceError, PlaybackCursors, SoundDevice, SyncMarkers};
use crate::frame::FrameBuffer;
use crate::input::process_keyboard_message;
use crate::memory::MemoryArena;
use crate::reload::{LoadError, LogicCapabilities, ModuleLoader};
use crate::runtime::Platform;
use crate::timing::Clock;

// ============================================================================
// Sound device
// ============================================================================

/// In-memory ring whose cursors are set by the test.
pub struct ScriptedSoundDevice {
    pub ring: Vec<u8>,
    /// Successful lock calls.
    pub locks: u32,
    samples_per_second: u32,
    cursors: PlaybackCursors,
    position_failures: u32,
    lock_failures: u32,
}

impl ScriptedSoundDevice {
    pub fn new(samples_per_second: u32, buffer_size: u32) -> Self {
        Self {
            ring: vec![0; buffer_size as usize],
            locks: 0,
            samples_per_second,
            cursors: PlaybackCursors::default(),
            position_failures: 0,
            lock_failures: 0,
        }
    }

    pub fn set_cursors(&mut self, play_cursor: u32, write_cursor: u32) {
        self.cursors = PlaybackCursors {
            play_cursor,
            write_cursor,
        };
    }

    /// Fail the next `count` position queries.
    pub fn fail_positions(&mut self, count: u32) {
        self.position_failures = count;
    }

    /// Fail the next `count` lock calls.
    pub fn fail_locks(&mut self, count: u32) {
        self.lock_failures = count;
    }
}

impl SoundDevice for ScriptedSoundDevice {
    type Guard<'a> = &'a mut [u8];

    fn buffer_size(&self) -> u32 {
        self.ring.len() as u32
    }

    fn samples_per_second(&self) -> u32 {
        self.samples_per_second
    }

    fn current_position(&mut self) -> Result<PlaybackCursors, DeviceError> {
        if self.position_failures > 0 {
            self.position_failures -= 1;
            return Err(DeviceError::Position("scripted failure".into()));
        }
        Ok(self.cursors)
    }

    fn lock(&mut self) -> Result<Self::Guard<'_>, DeviceError> {
        if self.lock_failures > 0 {
            self.lock_failures -= 1;
            return Err(DeviceError::Lock("scripted failure".into()));
        }
        self.locks += 1;
        Ok(self.ring.as_mut_slice())
    }
}

// ============================================================================
// Clock
// ============================================================================

/// Clock that only moves when told to.
///
/// Every `now()` costs one `resolution` step, so spin loops terminate.
/// Sleeps advance time by the requested amount plus `oversleep`.
pub struct ManualClock {
    origin: Instant,
    offset: Cell<Duration>,
    resolution: Duration,
    oversleep: Duration,
    sleeps: Cell<u32>,
}

impl ManualClock {
    pub const CYCLES_PER_NANO: u64 = 3;

    pub fn new(resolution: Duration) -> Self {
        Self {
            origin: Instant::now(),
            offset: Cell::new(Duration::ZERO),
            resolution,
            oversleep: Duration::ZERO,
            sleeps: Cell::new(0),
        }
    }

    pub fn with_oversleep(mut self, oversleep: Duration) -> Self {
        self.oversleep = oversleep;
        self
    }

    /// Simulate work taking `duration`.
    pub fn advance(&self, duration: Duration) {
        self.offset.set(self.offset.get() + duration);
    }

    pub fn sleeps(&self) -> u32 {
        self.sleeps.get()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let now = self.origin + self.offset.get();
        self.advance(self.resolution);
        now
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.set(self.sleeps.get() + 1);
        self.advance(duration + self.oversleep);
    }

    fn cycles(&self) -> u64 {
        self.offset.get().as_nanos() as u64 * Self::CYCLES_PER_NANO
    }
}

// ============================================================================
// Module loader
// ============================================================================

/// File contents that make [`FakeLoader`] report a missing export.
pub const MISSING_EXPORT_MARKER: &str = "missing-export";

/// Sample value written by [`FakeLogic`].
pub const FAKE_SAMPLE: i16 = 1000;

/// Counters shared between a [`FakeLoader`] and the test.
#[derive(Clone, Default)]
pub struct LoaderStats {
    loads: Rc<Cell<u32>>,
    live: Rc<Cell<u32>>,
    live_at_last_load: Rc<Cell<u32>>,
}

impl LoaderStats {
    /// Load calls that reached the loader.
    pub fn loads(&self) -> u32 {
        self.loads.get()
    }

    /// Logic objects currently alive.
    pub fn live(&self) -> u32 {
        self.live.get()
    }

    /// Logic objects alive when the last load began.
    pub fn live_at_last_load(&self) -> u32 {
        self.live_at_last_load.get()
    }
}

/// Loader that reads the module file as text instead of binding code.
pub struct FakeLoader {
    stats: LoaderStats,
}

impl FakeLoader {
    pub fn new() -> (Self, LoaderStats) {
        let stats = LoaderStats::default();
        (Self { stats: stats.clone() }, stats)
    }
}

impl ModuleLoader for FakeLoader {
    fn load(&mut self, path: &Path) -> Result<Box<dyn LogicCapabilities>, LoadError> {
        self.stats.loads.set(self.stats.loads.get() + 1);
        self.stats.live_at_last_load.set(self.stats.live.get());

        let contents = std::fs::read_to_string(path)?;
        if contents.trim() == MISSING_EXPORT_MARKER {
            return Err(LoadError::MissingExport("update_and_render"));
        }
        self.stats.live.set(self.stats.live.get() + 1);
        Ok(Box::new(FakeLogic {
            live: self.stats.live.clone(),
        }))
    }
}

/// Counts ticks in permanent byte 0, mirrors move-up into the frame, emits a
/// constant tone.
pub struct FakeLogic {
    live: Rc<Cell<u32>>,
}

impl LogicCapabilities for FakeLogic {
    fn update_and_render(&mut self, memory: &mut MemoryArena, input: &InputFrame, frame: &mut FrameBuffer) {
        if let Some(ticks) = memory.permanent_mut().first_mut() {
            *ticks = ticks.wrapping_add(1);
        }
        let up = input.keyboard().button(ButtonId::MoveUp);
        let pixels = frame.pixels_mut();
        if pixels.len() >= 2 {
            pixels[0] = if up.is_down() { 0x00ff_ffff } else { 0x0000_00ff };
            pixels[1] = up.half_transition_count;
        }
    }

    fn get_sound_samples(&mut self, _memory: &mut MemoryArena, _samples_per_second: u32, samples: &mut [i16]) {
        samples.fill(FAKE_SAMPLE);
    }
}

impl Drop for FakeLogic {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

// ============================================================================
// Platform
// ============================================================================

/// Platform that replays keyboard events at fixed ticks.
#[derive(Default)]
pub struct ScriptedPlatform {
    /// `(tick, button, is_down)` messages delivered during that tick's pump.
    pub events: Vec<(u64, ButtonId, bool)>,
    /// Ask the loop to stop during this tick's pump.
    pub stop_at: Option<u64>,
    pub pumps: u64,
    pub presented: u64,
    /// Pixel 0 of each presented frame.
    pub first_pixels: Vec<u32>,
    /// Marker count seen at each present, when markers were passed.
    pub marker_counts: Vec<usize>,
}

impl ScriptedPlatform {
    pub fn new(events: Vec<(u64, ButtonId, bool)>) -> Self {
        Self {
            events,
            ..Self::default()
        }
    }

    pub fn stop_at(mut self, tick: u64) -> Self {
        self.stop_at = Some(tick);
        self
    }
}

impl Platform for ScriptedPlatform {
    fn pump_events(&mut self, _old: &InputFrame, new: &mut InputFrame) -> ControlFlow<()> {
        let tick = self.pumps;
        self.pumps += 1;
        for &(at, button, is_down) in &self.events {
            if at == tick {
                process_keyboard_message(new.keyboard_mut().button_mut(button), is_down);
            }
        }
        if self.stop_at == Some(tick) {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }

    fn present(&mut self, frame: &FrameBuffer, markers: Option<&SyncMarkers>) {
        self.presented += 1;
        self.first_pixels.push(frame.pixels().first().copied().unwrap_or_default());
        if let Some(markers) = markers {
            self.marker_counts.push(markers.len());
        }
    }
}
