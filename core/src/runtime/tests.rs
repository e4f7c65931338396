//! Main loop tests with a scripted platform, device and clock

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use hotframe_shared::ButtonId;
use tempfile::TempDir;

use super::*;
use crate::audio::{AudioTick, Latency};
use crate::config::{AudioConfig, VideoConfig};
use crate::memory::MemoryConfig;
use crate::reload::HotReloader;
use crate::test_utils::{FAKE_SAMPLE, FakeLoader, ManualClock, ScriptedPlatform, ScriptedSoundDevice};

const SPS: u32 = 48_000;
const RING: u32 = SPS * 4;

type TestRuntime = Runtime<ScriptedSoundDevice, ManualClock>;

fn test_config() -> Config {
    Config {
        memory: MemoryConfig {
            permanent_mib: 1,
            transient_mib: 1,
        },
        video: VideoConfig {
            width: 8,
            height: 4,
            scale: 1,
        },
        audio: AudioConfig {
            sync_markers: false,
            ..AudioConfig::default()
        },
        ..Config::default()
    }
}

fn module_file(dir: &TempDir, contents: &str) -> PathBuf {
    let path = dir.path().join("logic.so");
    fs::write(&path, contents).unwrap();
    path
}

fn runtime_with(config: Config, dir: &TempDir, device: Option<ScriptedSoundDevice>) -> TestRuntime {
    let (loader, _) = FakeLoader::new();
    let reloader = HotReloader::new(Box::new(loader), module_file(dir, "ok"), 1).unwrap();
    Runtime::new(config, reloader, device, ManualClock::new(Duration::from_micros(100)))
}

fn device() -> ScriptedSoundDevice {
    let mut device = ScriptedSoundDevice::new(SPS, RING);
    device.set_cursors(0, 1920);
    device
}

// ============================================================================
// Loop control
// ============================================================================

#[test]
fn test_run_stops_after_platform_break() {
    let dir = TempDir::new().unwrap();
    let mut runtime = runtime_with(test_config(), &dir, None);
    let mut platform = ScriptedPlatform::default().stop_at(4);

    let ticks = runtime.run(&mut platform);

    // The tick that asked to stop still completes
    assert_eq!(ticks, 5);
    assert_eq!(platform.presented, 5);
    assert!(!runtime.is_running());
    assert_eq!(runtime.frame_index(), 5);
}

#[test]
fn test_run_frames_limits_ticks() {
    let dir = TempDir::new().unwrap();
    let mut runtime = runtime_with(test_config(), &dir, None);
    let mut platform = ScriptedPlatform::default();

    assert_eq!(runtime.run_frames(&mut platform, 3), 3);
    assert!(runtime.is_running());
    assert_eq!(runtime.run_frames(&mut platform, 2), 2);
    assert_eq!(runtime.frame_index(), 5);
}

#[test]
fn test_stop_ends_run_frames() {
    let dir = TempDir::new().unwrap();
    let mut runtime = runtime_with(test_config(), &dir, None);
    runtime.stop();
    assert_eq!(runtime.run_frames(&mut ScriptedPlatform::default(), 3), 0);
}

// ============================================================================
// Module, memory and input
// ============================================================================

#[test]
fn test_permanent_memory_persists_across_ticks() {
    let dir = TempDir::new().unwrap();
    let mut runtime = runtime_with(test_config(), &dir, None);
    runtime.run_frames(&mut ScriptedPlatform::default(), 3);
    assert_eq!(runtime.memory().permanent()[0], 3);
}

#[test]
fn test_held_key_carries_over_and_edges_reset() {
    let dir = TempDir::new().unwrap();
    let mut runtime = runtime_with(test_config(), &dir, None);
    let mut platform = ScriptedPlatform::new(vec![(1, ButtonId::MoveUp, true), (3, ButtonId::MoveUp, false)]);

    runtime.run_frames(&mut platform, 5);

    assert_eq!(platform.first_pixels, vec![0xff, 0x00ff_ffff, 0x00ff_ffff, 0xff, 0xff]);
    let up = runtime.input().old().keyboard().button(ButtonId::MoveUp);
    assert!(!up.is_down());
    assert_eq!(up.half_transition_count, 0);
}

#[test]
fn test_press_and_release_in_one_tick_counts_both_edges() {
    let dir = TempDir::new().unwrap();
    let mut runtime = runtime_with(test_config(), &dir, None);
    let mut platform = ScriptedPlatform::new(vec![(0, ButtonId::MoveUp, true), (0, ButtonId::MoveUp, false)]);

    runtime.tick(&mut platform);

    let up = runtime.input().old().keyboard().button(ButtonId::MoveUp);
    assert_eq!(up.half_transition_count, 2);
    assert!(!up.is_down());
    assert!(up.was_pressed());
    assert_eq!(runtime.frame().pixels()[1], 2);
}

#[test]
fn test_frame_dt_matches_update_rate() {
    let dir = TempDir::new().unwrap();
    let mut runtime = runtime_with(test_config(), &dir, None);
    runtime.tick(&mut ScriptedPlatform::default());
    assert!((runtime.input().old().frame_dt - 1.0 / 30.0).abs() < 1e-6);
}

#[test]
fn test_missing_module_runs_stubs() {
    let dir = TempDir::new().unwrap();
    let (loader, _) = FakeLoader::new();
    let reloader = HotReloader::new(Box::new(loader), dir.path().join("absent.so"), 1).unwrap();
    let mut runtime: TestRuntime =
        Runtime::new(test_config(), reloader, Some(device()), ManualClock::new(Duration::from_micros(100)));

    let report = runtime.tick(&mut ScriptedPlatform::default());

    assert_eq!(runtime.reloader().status(), ModuleStatus::Stubbed);
    assert!(runtime.frame().pixels().iter().all(|&p| p == 0));
    assert!(matches!(report.audio, Some(AudioTick::Written { .. })));
    let ring = &runtime.audio().unwrap().device.ring;
    assert!(ring.iter().all(|&b| b == 0));
}

#[test]
fn test_reload_reported_in_tick() {
    let dir = TempDir::new().unwrap();
    let mut runtime = runtime_with(test_config(), &dir, None);
    let mut platform = ScriptedPlatform::default();

    assert_eq!(runtime.tick(&mut platform).reloaded, None);

    let path = dir.path().join("logic.so");
    let file = fs::File::options().write(true).open(&path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(10)).unwrap();

    let report = runtime.tick(&mut platform);
    assert_eq!(report.reloaded, Some(ModuleStatus::Valid));
    assert_eq!(runtime.reloader().generation(), 2);
    // Memory survives the swap
    assert_eq!(runtime.memory().permanent()[0], 2);
}

// ============================================================================
// Audio and pacing
// ============================================================================

#[test]
fn test_audio_written_from_module() {
    let dir = TempDir::new().unwrap();
    let mut runtime = runtime_with(test_config(), &dir, Some(device()));

    let report = runtime.tick(&mut ScriptedPlatform::default());

    let Some(AudioTick::Written { plan, samples }) = report.audio else {
        panic!("expected audio to be written: {:?}", report.audio);
    };
    assert!(plan.resynced);
    assert_eq!(plan.byte_to_lock, 1920);
    assert!(samples > 0);
    let ring = &runtime.audio().unwrap().device.ring;
    assert_eq!(&ring[1920..1922], &FAKE_SAMPLE.to_le_bytes());
}

#[test]
fn test_audio_low_latency_after_resync() {
    let dir = TempDir::new().unwrap();
    let mut runtime = runtime_with(test_config(), &dir, Some(device()));
    let mut platform = ScriptedPlatform::default();
    runtime.tick(&mut platform);

    runtime.audio_mut().unwrap().device.set_cursors(6400, 8320);
    let report = runtime.tick(&mut platform);

    let Some(AudioTick::Written { plan, .. }) = report.audio else {
        panic!("expected audio to be written: {:?}", report.audio);
    };
    assert!(!plan.resynced);
    assert_eq!(plan.latency, Latency::Low);
}

#[test]
fn test_device_failure_does_not_stop_loop() {
    let dir = TempDir::new().unwrap();
    let mut runtime = runtime_with(test_config(), &dir, Some(device()));
    runtime.audio_mut().unwrap().device.fail_positions(2);
    let mut platform = ScriptedPlatform::default();

    let reports: Vec<TickReport> = (0..3).map(|_| runtime.tick(&mut platform)).collect();

    assert!(matches!(reports[0].audio, Some(AudioTick::Skipped(_))));
    assert!(matches!(reports[1].audio, Some(AudioTick::Skipped(_))));
    assert!(matches!(reports[2].audio, Some(AudioTick::Written { .. })));
    assert!(reports.iter().all(|r| r.running));
}

#[test]
fn test_no_device_means_no_audio() {
    let dir = TempDir::new().unwrap();
    let mut runtime = runtime_with(test_config(), &dir, None);
    let report = runtime.tick(&mut ScriptedPlatform::default());
    assert!(report.audio.is_none());
    assert!(runtime.audio().is_none());
}

#[test]
fn test_ticks_are_paced_to_target() {
    let dir = TempDir::new().unwrap();
    let mut runtime = runtime_with(test_config(), &dir, None);
    let target = runtime.pacer().target();

    let report = runtime.tick(&mut ScriptedPlatform::default());

    assert!(!report.timing.missed);
    assert!(report.timing.frame >= target);
    assert!(report.timing.frame - target <= Duration::from_micros(100));
}

#[test]
fn test_markers_reach_present() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config();
    config.audio.sync_markers = true;
    config.audio.marker_count = 2;
    let mut runtime = runtime_with(config, &dir, Some(device()));
    let mut platform = ScriptedPlatform::default();

    runtime.run_frames(&mut platform, 3);

    assert_eq!(platform.marker_counts, vec![1, 2, 2]);
}
