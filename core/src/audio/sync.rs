//! Per-tick audio synchronization
//!
//! Each tick the synchronizer decides how many bytes of new audio to generate
//! and where they go in the device ring. When the device reports a write
//! cursor comfortably ahead of where playback will be at the next frame flip,
//! audio is aligned to the frame after that flip (low-latency card). Otherwise
//! it writes a frame past the write cursor plus a safety margin (high-latency
//! card).

use hotframe_shared::BYTES_PER_SAMPLE;

use super::cursor::{bytes_to_write, sample_offset};
use super::device::{DeviceError, PlaybackCursors, SoundDevice};
use super::markers::SyncMarkers;
use crate::config::AudioConfig;

/// Device ring state as the synchronizer sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundOutput {
    pub samples_per_second: u32,
    /// Stereo frames queued so far. Only reset when the device is resynchronized.
    pub running_sample_index: u64,
    pub bytes_per_sample: u32,
    pub secondary_buffer_size: u32,
    /// Most samples written in one tick. A larger plan means the index is
    /// either already past the target or has fallen behind the device.
    pub latency_sample_count: u32,
    pub safety_bytes: u32,
}

impl SoundOutput {
    pub fn new(samples_per_second: u32, secondary_buffer_size: u32, update_hz: u32, config: &AudioConfig) -> Self {
        let bytes_per_sample = BYTES_PER_SAMPLE;
        let update_hz = update_hz.max(1);
        let bytes_per_frame = samples_per_second * bytes_per_sample / update_hz;
        let safety_bytes = align_down(bytes_per_frame / config.safety_divisor.max(1), bytes_per_sample);
        Self {
            samples_per_second,
            running_sample_index: 0,
            bytes_per_sample,
            secondary_buffer_size,
            latency_sample_count: config.latency_frames.max(1) * samples_per_second / update_hz,
            safety_bytes,
        }
    }
}

/// Which targeting branch a plan used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Latency {
    /// Write cursor is ahead of the projected flip; sync to the next frame boundary.
    Low,
    /// Write cursor is past the projected flip; buffer a frame past it.
    High,
}

/// Where and how much to write this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritePlan {
    pub cursors: PlaybackCursors,
    pub byte_to_lock: u32,
    pub target_cursor: u32,
    pub bytes_to_write: u32,
    pub expected_flip_play_cursor: u32,
    pub latency: Latency,
    /// The device was (re)synchronized while planning.
    pub resynced: bool,
}

impl WritePlan {
    pub fn sample_count(&self, bytes_per_sample: u32) -> u32 {
        self.bytes_to_write / bytes_per_sample
    }
}

/// Outcome of one tick's audio work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioTick {
    /// Samples were generated and committed to the device.
    Written { plan: WritePlan, samples: u32 },
    /// The device failed this tick; nothing was written.
    Skipped(DeviceError),
}

/// Keeps the device ring fed one tick at a time.
pub struct AudioSynchronizer {
    output: SoundOutput,
    is_valid: bool,
    bytes_per_frame: u32,
    target_seconds_per_frame: f32,
    /// Stereo interleaved scratch, sized for the whole ring so it is never reallocated.
    scratch: Vec<i16>,
    markers: Option<SyncMarkers>,
}

impl AudioSynchronizer {
    pub fn new(output: SoundOutput, update_hz: u32, config: &AudioConfig) -> Self {
        let update_hz = update_hz.max(1);
        let bytes_per_frame = align_down(
            output.samples_per_second * output.bytes_per_sample / update_hz,
            output.bytes_per_sample,
        );
        let scratch = vec![0i16; (output.secondary_buffer_size / 2) as usize];
        let markers = config.sync_markers.then(|| SyncMarkers::new(config.marker_count));

        tracing::debug!(
            samples_per_second = output.samples_per_second,
            buffer_size = output.secondary_buffer_size,
            bytes_per_frame,
            safety_bytes = output.safety_bytes,
            latency_samples = output.latency_sample_count,
            "Audio synchronizer configured"
        );

        Self {
            output,
            is_valid: false,
            bytes_per_frame,
            target_seconds_per_frame: 1.0 / update_hz as f32,
            scratch,
            markers,
        }
    }

    /// Build a synchronizer sized for `device`.
    pub fn for_device<D: SoundDevice>(device: &D, update_hz: u32, config: &AudioConfig) -> Self {
        let output = SoundOutput::new(device.samples_per_second(), device.buffer_size(), update_hz, config);
        Self::new(output, update_hz, config)
    }

    pub fn output(&self) -> &SoundOutput {
        &self.output
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn bytes_per_frame(&self) -> u32 {
        self.bytes_per_frame
    }

    pub fn markers(&self) -> Option<&SyncMarkers> {
        self.markers.as_ref()
    }

    /// Forget the device position; the next successful query resynchronizes.
    pub fn invalidate(&mut self) {
        self.is_valid = false;
    }

    /// Zero the whole device ring.
    pub fn clear<D: SoundDevice>(&mut self, device: &mut D) -> Result<(), DeviceError> {
        let mut ring = device.lock()?;
        ring.fill(0);
        Ok(())
    }

    /// Decide where and how much to write for the given cursors.
    ///
    /// `seconds_since_flip` is how far into the current frame we are.
    pub fn plan(&mut self, cursors: PlaybackCursors, seconds_since_flip: f32) -> WritePlan {
        let mut resynced = false;
        if !self.is_valid {
            self.resync(cursors);
            resynced = true;
        }

        let mut plan = self.compute_plan(cursors, seconds_since_flip, resynced);

        let size = self.output.secondary_buffer_size;
        let max_lookahead = self.output.latency_sample_count * self.output.bytes_per_sample;
        if plan.bytes_to_write > max_lookahead {
            if size - plan.bytes_to_write <= max_lookahead {
                // Already queued past the target; the index only moves forward
                tracing::trace!(
                    ahead = size - plan.bytes_to_write,
                    "Audio already queued past target, nothing to write"
                );
                plan.bytes_to_write = 0;
            } else {
                tracing::debug!(
                    bytes = plan.bytes_to_write,
                    max_lookahead,
                    "Audio fell behind the device, capping write"
                );
                plan.bytes_to_write = max_lookahead;
            }
            plan.target_cursor = (plan.byte_to_lock + plan.bytes_to_write) % size;
        }
        plan
    }

    fn resync(&mut self, cursors: PlaybackCursors) {
        self.output.running_sample_index = (cursors.write_cursor / self.output.bytes_per_sample) as u64;
        self.is_valid = true;
        tracing::debug!(write_cursor = cursors.write_cursor, "Audio resynchronized to device");
    }

    fn compute_plan(&self, cursors: PlaybackCursors, seconds_since_flip: f32, resynced: bool) -> WritePlan {
        let out = &self.output;
        let size = out.secondary_buffer_size;
        let bps = out.bytes_per_sample;

        let byte_to_lock = sample_offset(out.running_sample_index, bps, size);

        let seconds_left = (self.target_seconds_per_frame - seconds_since_flip).max(0.0);
        let expected_bytes_until_flip = align_down(
            ((seconds_left / self.target_seconds_per_frame) * self.bytes_per_frame as f32) as u32,
            bps,
        );
        let expected_frame_boundary_byte = cursors.play_cursor + expected_bytes_until_flip;

        let mut safe_write_cursor = cursors.write_cursor;
        if safe_write_cursor < cursors.play_cursor {
            safe_write_cursor += size;
        }
        safe_write_cursor += out.safety_bytes;

        let latency = if safe_write_cursor < expected_frame_boundary_byte {
            Latency::Low
        } else {
            Latency::High
        };
        let target = match latency {
            Latency::Low => expected_frame_boundary_byte + self.bytes_per_frame,
            Latency::High => cursors.write_cursor + self.bytes_per_frame + out.safety_bytes,
        };
        let target_cursor = align_down(target % size, bps);

        WritePlan {
            cursors,
            byte_to_lock,
            target_cursor,
            bytes_to_write: bytes_to_write(byte_to_lock, target_cursor, size),
            expected_flip_play_cursor: expected_frame_boundary_byte % size,
            latency,
            resynced,
        }
    }

    /// Commit the first `sample_count` scratch frames at the planned location.
    pub fn write<D: SoundDevice>(
        &mut self,
        device: &mut D,
        plan: &WritePlan,
        sample_count: u32,
    ) -> Result<u32, DeviceError> {
        let mut span = device.lock_span(plan.byte_to_lock, plan.bytes_to_write)?;
        let samples = &self.scratch[..sample_count as usize * 2];
        let written = span.write_samples(samples) / 2;
        self.output.running_sample_index += written as u64;
        Ok(written as u32)
    }

    /// Run one tick: query, plan, fill via `fill`, write.
    ///
    /// `fill` receives interleaved stereo storage for exactly the planned
    /// number of frames. Device failures invalidate the sync state and skip
    /// the write; they are never surfaced as errors.
    pub fn sync<D, F>(&mut self, device: &mut D, seconds_since_flip: f32, fill: F) -> AudioTick
    where
        D: SoundDevice,
        F: FnOnce(&mut [i16]),
    {
        let cursors = match device.current_position() {
            Ok(cursors) => cursors,
            Err(e) => return self.skip(e),
        };

        let plan = self.plan(cursors, seconds_since_flip);
        let sample_count = plan.sample_count(self.output.bytes_per_sample);

        let samples = &mut self.scratch[..sample_count as usize * 2];
        samples.fill(0);
        fill(samples);

        match self.write(device, &plan, sample_count) {
            Ok(written) => {
                if let Some(markers) = &mut self.markers {
                    markers.record_output(
                        cursors,
                        plan.byte_to_lock,
                        plan.bytes_to_write,
                        plan.expected_flip_play_cursor,
                    );
                }
                AudioTick::Written { plan, samples: written }
            }
            Err(e) => self.skip(e),
        }
    }

    /// Record the cursors seen at the frame flip into the marker history.
    pub fn record_flip<D: SoundDevice>(&mut self, device: &mut D) {
        if let Some(markers) = &mut self.markers
            && let Ok(cursors) = device.current_position()
        {
            markers.record_flip(cursors);
        }
    }

    fn skip(&mut self, error: DeviceError) -> AudioTick {
        if self.is_valid {
            tracing::debug!("Audio skipped this tick: {}", error);
        }
        self.invalidate();
        AudioTick::Skipped(error)
    }
}

fn align_down(value: u32, align: u32) -> u32 {
    value - value % align.max(1)
}
