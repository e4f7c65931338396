//! cpal-backed ring-buffer sound device
//!
//! cpal pulls audio through a callback, so the ring lives behind a mutex and
//! the callback advances the play cursor as it consumes bytes. The write
//! cursor is the play cursor plus the last chunk the callback took, since
//! that much may already be in flight.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, SizedSample};
use hotframe_core::audio::{DeviceError, PlaybackCursors, SoundDevice};
use hotframe_core::config::AudioConfig;
use hotframe_shared::BYTES_PER_SAMPLE;
use tracing::{debug, error, info};

#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    #[error("no audio output device available")]
    NoDevice,

    #[error("failed to get default output config: {0}")]
    Config(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build audio stream: {0}")]
    Build(#[from] cpal::BuildStreamError),

    #[error("failed to play audio stream: {0}")]
    Play(#[from] cpal::PlayStreamError),

    #[error("unsupported sample format: {0:?}")]
    Format(cpal::SampleFormat),
}

struct SharedRing {
    data: Vec<u8>,
    play_cursor: usize,
    /// Bytes consumed by the most recent callback.
    last_chunk: usize,
}

/// Exclusive access to the ring; the callback waits while it is held.
pub struct RingGuard<'a>(MutexGuard<'a, SharedRing>);

impl Deref for RingGuard<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0.data
    }
}

impl DerefMut for RingGuard<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.0.data
    }
}

/// Default output device playing a looping stereo 16-bit ring.
pub struct CpalSoundDevice {
    shared: Arc<Mutex<SharedRing>>,
    lost: Arc<AtomicBool>,
    buffer_size: u32,
    samples_per_second: u32,
    _stream: cpal::Stream,
}

impl CpalSoundDevice {
    pub fn open(config: &AudioConfig) -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoDevice)?;
        let supported = device.default_output_config()?;

        let samples_per_second = supported.sample_rate().0;
        if samples_per_second != config.samples_per_second {
            debug!(
                "Device rate {} Hz differs from requested {} Hz",
                samples_per_second, config.samples_per_second
            );
        }

        let frames = (samples_per_second as f32 * config.buffer_seconds.max(0.1)) as u32;
        let buffer_size = frames * BYTES_PER_SAMPLE;
        let shared = Arc::new(Mutex::new(SharedRing {
            data: vec![0; buffer_size as usize],
            play_cursor: 0,
            last_chunk: 0,
        }));
        let lost = Arc::new(AtomicBool::new(false));

        let format = supported.sample_format();
        let stream_config: cpal::StreamConfig = supported.into();
        let stream = match format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, &shared, &lost)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, &shared, &lost)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, &shared, &lost)?,
            other => return Err(AudioError::Format(other)),
        };
        stream.play()?;

        info!(
            "Audio output: {} Hz, {} channels, {} byte ring",
            samples_per_second, stream_config.channels, buffer_size
        );

        Ok(Self {
            shared,
            lost,
            buffer_size,
            samples_per_second,
            _stream: stream,
        })
    }

    fn ring(&self) -> Result<MutexGuard<'_, SharedRing>, DeviceError> {
        if self.lost.load(Ordering::Relaxed) {
            return Err(DeviceError::Lost);
        }
        self.shared
            .lock()
            .map_err(|_| DeviceError::Lock("ring mutex poisoned".to_string()))
    }
}

impl SoundDevice for CpalSoundDevice {
    type Guard<'a> = RingGuard<'a>;

    fn buffer_size(&self) -> u32 {
        self.buffer_size
    }

    fn samples_per_second(&self) -> u32 {
        self.samples_per_second
    }

    fn current_position(&mut self) -> Result<PlaybackCursors, DeviceError> {
        let ring = self.ring()?;
        let size = ring.data.len();
        let ahead = ring.last_chunk.max(BYTES_PER_SAMPLE as usize);
        let write_cursor = (ring.play_cursor + ahead) % size;
        Ok(PlaybackCursors {
            play_cursor: ring.play_cursor as u32,
            write_cursor: (write_cursor - write_cursor % BYTES_PER_SAMPLE as usize) as u32,
        })
    }

    fn lock(&mut self) -> Result<Self::Guard<'_>, DeviceError> {
        self.ring().map(RingGuard)
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    shared: &Arc<Mutex<SharedRing>>,
    lost: &Arc<AtomicBool>,
) -> Result<cpal::Stream, AudioError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = config.channels.max(1) as usize;
    let shared = Arc::clone(shared);
    let error_flag = Arc::clone(lost);

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let Ok(mut ring) = shared.lock() else {
                data.fill(T::EQUILIBRIUM);
                return;
            };
            let size = ring.data.len();
            let mut cursor = ring.play_cursor;
            for frame in data.chunks_mut(channels) {
                let left = i16::from_le_bytes([ring.data[cursor], ring.data[cursor + 1]]);
                let right = i16::from_le_bytes([ring.data[cursor + 2], ring.data[cursor + 3]]);
                let left = left as f32 / 32768.0;
                let right = right as f32 / 32768.0;
                match frame {
                    [mono] => *mono = T::from_sample((left + right) * 0.5),
                    [l, r, rest @ ..] => {
                        *l = T::from_sample(left);
                        *r = T::from_sample(right);
                        rest.fill(T::EQUILIBRIUM);
                    }
                    [] => {}
                }
                cursor = (cursor + BYTES_PER_SAMPLE as usize) % size;
            }
            ring.last_chunk = (data.len() / channels) * BYTES_PER_SAMPLE as usize;
            ring.play_cursor = cursor;
        },
        move |err| {
            error!("Audio stream error: {}", err);
            if matches!(err, cpal::StreamError::DeviceNotAvailable) {
                error_flag.store(true, Ordering::Relaxed);
            }
        },
        None,
    )?;
    Ok(stream)
}
