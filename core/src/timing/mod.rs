//! Frame pacing
//!
//! Holds the wall-clock frame duration at a fixed target. The remaining time
//! is slept off in one call (leaving a granularity margin), then spun off
//! against the clock so the frame never ends early.

mod clock;


use std::time::{Duration, Instant};

pub use clock::{Clock, SystemClock, read_cycle_counter};

/// Timing of one finished frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTiming {
    /// Time spent before pacing started.
    pub work: Duration,
    /// Full frame duration including the wait.
    pub frame: Duration,
    /// CPU cycles over the whole frame.
    pub cycles: u64,
    /// Work alone exceeded the target.
    pub missed: bool,
}

impl FrameTiming {
    pub fn ms_per_frame(&self) -> f64 {
        self.frame.as_secs_f64() * 1000.0
    }

    pub fn fps(&self) -> f64 {
        let secs = self.frame.as_secs_f64();
        if secs > 0.0 { 1.0 / secs } else { 0.0 }
    }

    pub fn mcycles_per_frame(&self) -> f64 {
        self.cycles as f64 / 1_000_000.0
    }
}

/// Sleep-then-spin frame limiter.
#[derive(Debug)]
pub struct FramePacer {
    target: Duration,
    /// Sleep stops this far short of the target; `None` spins the whole wait.
    sleep_granularity: Option<Duration>,
    frame_start: Instant,
    frame_start_cycles: u64,
    missed_frames: u64,
}

impl FramePacer {
    pub fn new<C: Clock>(clock: &C, update_hz: u32, sleep_granularity: Option<Duration>) -> Self {
        Self {
            target: Duration::from_secs_f64(1.0 / update_hz.max(1) as f64),
            sleep_granularity: sleep_granularity.filter(|g| !g.is_zero()),
            frame_start: clock.now(),
            frame_start_cycles: clock.cycles(),
            missed_frames: 0,
        }
    }

    pub fn target(&self) -> Duration {
        self.target
    }

    pub fn target_seconds(&self) -> f32 {
        self.target.as_secs_f32()
    }

    pub fn missed_frames(&self) -> u64 {
        self.missed_frames
    }

    /// Time elapsed in the current frame.
    pub fn elapsed<C: Clock>(&self, clock: &C) -> Duration {
        clock.now().saturating_duration_since(self.frame_start)
    }

    /// Restart the current frame at `now`, e.g. after a long stall.
    pub fn reset<C: Clock>(&mut self, clock: &C) {
        self.frame_start = clock.now();
        self.frame_start_cycles = clock.cycles();
    }

    /// Wait out the rest of the frame and start the next one.
    ///
    /// The returned frame duration is never shorter than the target.
    pub fn end_frame<C: Clock>(&mut self, clock: &C) -> FrameTiming {
        let mut elapsed = self.elapsed(clock);
        let work = elapsed;
        let missed = work > self.target;

        if missed {
            self.missed_frames += 1;
            tracing::debug!(
                "Missed frame: {:.2} ms of work for a {:.2} ms target",
                work.as_secs_f64() * 1000.0,
                self.target.as_secs_f64() * 1000.0
            );
        } else {
            if let Some(granularity) = self.sleep_granularity {
                let remaining = self.target - elapsed;
                if remaining > granularity {
                    clock.sleep(remaining - granularity);
                }
                elapsed = self.elapsed(clock);
            }
            while elapsed < self.target {
                elapsed = self.elapsed(clock);
            }
        }

        let cycles_now = clock.cycles();
        let timing = FrameTiming {
            work,
            frame: elapsed,
            cycles: cycles_now.wrapping_sub(self.frame_start_cycles),
            missed,
        };

        self.frame_start += elapsed;
        self.frame_start_cycles = cycles_now;
        timing
    }
}
