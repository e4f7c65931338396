//! Tests for audio synchronization against a scripted device

use super::*;
use crate::config::AudioConfig;
use crate::test_utils::ScriptedSoundDevice;

const SPS: u32 = 48_000;
const RING: u32 = SPS * 4;
const HZ: u32 = 30;

// With these settings one frame is 6400 bytes, the safety margin 2132 bytes
// and the look-ahead cap 19200 bytes.

fn setup() -> (ScriptedSoundDevice, AudioSynchronizer) {
    let device = ScriptedSoundDevice::new(SPS, RING);
    let sync = AudioSynchronizer::for_device(&device, HZ, &AudioConfig::default());
    (device, sync)
}

fn written(tick: AudioTick) -> (WritePlan, u32) {
    match tick {
        AudioTick::Written { plan, samples } => (plan, samples),
        AudioTick::Skipped(e) => panic!("expected a write, device failed: {e}"),
    }
}

// ============================================================================
// Derived sizes
// ============================================================================

#[test]
fn test_output_sizes_follow_update_rate() {
    let (_, sync) = setup();
    assert_eq!(sync.bytes_per_frame(), 6400);
    assert_eq!(sync.output().safety_bytes, 2132);
    assert_eq!(sync.output().latency_sample_count, 4800);
    assert_eq!(sync.output().secondary_buffer_size, RING);
    assert!(!sync.is_valid());
}

// ============================================================================
// Resynchronization
// ============================================================================

#[test]
fn test_first_valid_query_resyncs_from_write_cursor() {
    let (mut device, mut sync) = setup();
    device.set_cursors(0, 1920);

    let (plan, samples) = written(sync.sync(&mut device, 0.0, |_| {}));

    assert!(plan.resynced);
    assert!(sync.is_valid());
    assert_eq!(plan.byte_to_lock, 1920);
    assert_eq!(plan.latency, Latency::Low);
    assert_eq!(plan.target_cursor, 12_800);
    assert_eq!(plan.bytes_to_write, 10_880);
    assert_eq!(samples, 2720);
    assert_eq!(sync.output().running_sample_index, 480 + 2720);
}

#[test]
fn test_failures_then_resync() {
    let (mut device, mut sync) = setup();
    device.set_cursors(4000, 6000);
    device.fail_positions(3);

    for _ in 0..3 {
        let tick = sync.sync(&mut device, 0.0, |_| panic!("no audio requested while the device fails"));
        assert!(matches!(tick, AudioTick::Skipped(DeviceError::Position(_))));
        assert!(!sync.is_valid());
    }
    assert_eq!(device.locks, 0);

    let (plan, _) = written(sync.sync(&mut device, 0.0, |_| {}));
    assert!(plan.resynced);
    assert_eq!(plan.byte_to_lock, 6000);
}

#[test]
fn test_valid_state_is_not_resynced() {
    let (mut device, mut sync) = setup();
    device.set_cursors(0, 1920);
    written(sync.sync(&mut device, 0.0, |_| {}));

    // Write cursor moved, but the running index still owns the lock position
    device.set_cursors(6400, 8320);
    let (plan, samples) = written(sync.sync(&mut device, 0.0, |_| {}));

    assert!(!plan.resynced);
    assert_eq!(plan.byte_to_lock, 12_800);
    assert_eq!(plan.latency, Latency::Low);
    assert_eq!(plan.target_cursor, 19_200);
    assert_eq!(samples, 1600);
}

#[test]
fn test_valid_index_never_moves_backwards() {
    let (mut device, mut sync) = setup();
    device.set_cursors(0, 1920);
    written(sync.sync(&mut device, 0.0, |_| {}));
    let before = sync.output().running_sample_index;

    // Same cursors later in the frame: the target lands behind what is already queued
    let (plan, samples) = written(sync.sync(&mut device, 0.01, |_| {}));

    assert!(!plan.resynced);
    assert!(sync.is_valid());
    assert_eq!(plan.byte_to_lock, 12_800);
    assert_eq!(plan.bytes_to_write, 0);
    assert_eq!(samples, 0);
    assert_eq!(sync.output().running_sample_index, before);
}

#[test]
fn test_index_behind_device_is_capped_not_reset() {
    let (mut device, mut sync) = setup();
    device.set_cursors(0, 1920);
    written(sync.sync(&mut device, 0.0, |_| {}));
    let before = sync.output().running_sample_index;

    // The device ran far ahead while we were stalled
    device.set_cursors(100_000, 101_920);
    let (plan, samples) = written(sync.sync(&mut device, 0.0, |_| {}));

    assert!(!plan.resynced);
    assert_eq!(plan.byte_to_lock, 12_800);
    assert_eq!(plan.bytes_to_write, 19_200);
    assert_eq!(plan.target_cursor, 32_000);
    assert_eq!(samples, 4800);
    assert_eq!(sync.output().running_sample_index, before + 4800);
}

// ============================================================================
// Latency branches
// ============================================================================

#[test]
fn test_high_latency_buffers_past_write_cursor() {
    let (mut device, mut sync) = setup();
    device.set_cursors(0, 6000);

    let (plan, samples) = written(sync.sync(&mut device, 0.0, |_| {}));

    assert_eq!(plan.latency, Latency::High);
    assert_eq!(plan.target_cursor, 6000 + 6400 + 2132);
    assert_eq!(plan.bytes_to_write, 8532);
    assert_eq!(samples, 2133);
}

#[test]
fn test_late_in_frame_falls_back_to_high_latency() {
    let (mut device, mut sync) = setup();
    device.set_cursors(0, 1920);

    // Past the frame target, the flip is due immediately
    let (plan, _) = written(sync.sync(&mut device, 0.5, |_| {}));

    assert_eq!(plan.expected_flip_play_cursor, 0);
    assert_eq!(plan.latency, Latency::High);
}

#[test]
fn test_requested_samples_match_planned_bytes() {
    let (mut device, mut sync) = setup();
    device.set_cursors(0, 6000);

    let mut requested = 0;
    let (plan, samples) = written(sync.sync(&mut device, 0.0, |buf| requested = buf.len()));

    assert_eq!(requested as u32, plan.bytes_to_write / 4 * 2);
    assert_eq!(samples, plan.bytes_to_write / 4);
}

// ============================================================================
// Writing
// ============================================================================

#[test]
fn test_write_wraps_around_ring_end() {
    let (mut device, mut sync) = setup();
    device.set_cursors(188_000, 190_000);

    let (plan, _) = written(sync.sync(&mut device, 0.0, |buf| buf.fill(0x0101)));

    assert_eq!(plan.byte_to_lock, 190_000);
    assert_eq!(plan.target_cursor, 8800);
    assert_eq!(plan.bytes_to_write, 10_800);
    assert!(device.ring[190_000..].iter().all(|&b| b == 1));
    assert!(device.ring[..8800].iter().all(|&b| b == 1));
    assert!(device.ring[8800..190_000].iter().all(|&b| b == 0));
}

#[test]
fn test_unfilled_samples_are_silent() {
    let (mut device, mut sync) = setup();
    device.ring.fill(0xAA);
    device.set_cursors(0, 1920);

    let (plan, _) = written(sync.sync(&mut device, 0.0, |_| {}));

    let start = plan.byte_to_lock as usize;
    let end = plan.target_cursor as usize;
    assert!(device.ring[start..end].iter().all(|&b| b == 0));
}

#[test]
fn test_lock_failure_skips_and_invalidates() {
    let (mut device, mut sync) = setup();
    device.set_cursors(0, 1920);
    written(sync.sync(&mut device, 0.0, |_| {}));
    let index = sync.output().running_sample_index;

    device.fail_locks(1);
    let tick = sync.sync(&mut device, 0.0, |_| {});

    assert!(matches!(tick, AudioTick::Skipped(DeviceError::Lock(_))));
    assert!(!sync.is_valid());
    assert_eq!(sync.output().running_sample_index, index);

    let (plan, _) = written(sync.sync(&mut device, 0.0, |_| {}));
    assert!(plan.resynced);
}

#[test]
fn test_clear_zeroes_ring() {
    let (mut device, mut sync) = setup();
    device.ring.fill(0x7F);
    sync.clear(&mut device).unwrap();
    assert!(device.ring.iter().all(|&b| b == 0));
}

// ============================================================================
// Debug markers
// ============================================================================

#[test]
fn test_markers_record_write_and_flip() {
    let mut device = ScriptedSoundDevice::new(SPS, RING);
    let config = AudioConfig {
        sync_markers: true,
        marker_count: 4,
        ..AudioConfig::default()
    };
    let mut sync = AudioSynchronizer::for_device(&device, HZ, &config);
    device.set_cursors(0, 1920);

    let (plan, _) = written(sync.sync(&mut device, 0.0, |_| {}));
    device.set_cursors(6400, 8320);
    sync.record_flip(&mut device);

    let markers = sync.markers().unwrap();
    assert_eq!(markers.len(), 1);
    let marker = markers.iter().next().unwrap();
    assert_eq!(marker.output_location, plan.byte_to_lock);
    assert_eq!(marker.output_byte_count, plan.bytes_to_write);
    assert_eq!(marker.flip_play_cursor, 6400);
}

#[test]
fn test_markers_disabled() {
    let device = ScriptedSoundDevice::new(SPS, RING);
    let config = AudioConfig {
        sync_markers: false,
        ..AudioConfig::default()
    };
    let sync = AudioSynchronizer::for_device(&device, HZ, &config);
    assert!(sync.markers().is_none());
}

#[test]
fn test_skipped_tick_records_no_marker() {
    let mut device = ScriptedSoundDevice::new(SPS, RING);
    let config = AudioConfig {
        sync_markers: true,
        ..AudioConfig::default()
    };
    let mut sync = AudioSynchronizer::for_device(&device, HZ, &config);
    device.set_cursors(0, 1920);
    device.fail_locks(1);

    let tick = sync.sync(&mut device, 0.0, |_| {});
    sync.record_flip(&mut device);

    assert!(matches!(tick, AudioTick::Skipped(DeviceError::Lock(_))));
    assert!(sync.markers().unwrap().is_empty());
}
