//! Hotframe - hot-reloading game host
//!
//! Runs a logic module at a fixed frame rate and reloads it whenever the
//! file changes, keeping game memory intact across reloads.
//!
//! # Usage
//!
//! ```bash
//! hotframe target/debug/libhotframe_demo.so
//! hotframe logic.wasm --update-hz 60
//! hotframe logic.so --headless --frames 600
//! ```

mod audio;
mod window;

use std::ops::ControlFlow;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use hotframe_core::audio::SyncMarkers;
use hotframe_core::config::{self, Config};
use hotframe_core::{Backend, FrameBuffer, HotReloader, Platform, Runtime, SoundDevice, SystemClock};
use hotframe_shared::InputFrame;

use audio::CpalSoundDevice;
use window::WindowPlatform;

#[derive(Parser)]
#[command(name = "hotframe")]
#[command(author, version, about = "Fixed-rate game host with hot-reloadable logic")]
struct Args {
    /// Logic module to run (.so/.dylib/.dll or .wasm/.wat); falls back to the config file
    module: Option<PathBuf>,

    /// Config file to use instead of the platform default
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Loader backend (default: inferred from the module extension)
    #[arg(long, value_enum)]
    backend: Option<BackendArg>,

    /// Ticks per second
    #[arg(long)]
    update_hz: Option<u32>,

    /// Run without a sound device
    #[arg(long)]
    no_audio: bool,

    /// Run without a window (implies --no-audio)
    #[arg(long)]
    headless: bool,

    /// Number of ticks to run in headless mode
    #[arg(long, default_value = "300")]
    frames: u64,
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Dylib,
    Wasm,
}

impl From<BackendArg> for Backend {
    fn from(arg: BackendArg) -> Self {
        match arg {
            BackendArg::Dylib => Backend::Dylib,
            BackendArg::Wasm => Backend::Wasm,
        }
    }
}

/// Platform with no window: no events, frames are discarded.
#[derive(Default)]
struct HeadlessPlatform {
    presented: u64,
}

impl Platform for HeadlessPlatform {
    fn pump_events(&mut self, _old: &InputFrame, _new: &mut InputFrame) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }

    fn present(&mut self, _frame: &FrameBuffer, _markers: Option<&SyncMarkers>) {
        self.presented += 1;
    }
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => config::load_from(path)?,
        None => config::load(),
    };
    if let Some(update_hz) = args.update_hz {
        if update_hz == 0 {
            anyhow::bail!("--update-hz must be at least 1");
        }
        config.timing.update_hz = update_hz;
    }
    for warning in config::validate_keybindings(&config) {
        tracing::warn!("{}", warning);
    }

    let module = args
        .module
        .clone()
        .or_else(|| config.reload.module.clone())
        .context("no logic module given on the command line or in the config file")?;
    let backend = args
        .backend
        .map(Backend::from)
        .unwrap_or_else(|| config.reload.backend_for(&module));
    tracing::info!("Logic module: {} ({:?})", module.display(), backend);

    let loader = backend.loader(&config.reload)?;
    let reloader = HotReloader::new(loader, &module, config.reload.poll_every_frames)?;

    if args.headless {
        return run_headless(config, reloader, args.frames);
    }

    let device = if args.no_audio {
        None
    } else {
        match CpalSoundDevice::open(&config.audio) {
            Ok(device) => Some(device),
            Err(e) => {
                tracing::warn!("Audio disabled: {}", e);
                None
            }
        }
    };

    let mut platform = WindowPlatform::new(
        "Hotframe",
        &config.video,
        config.input.keyboard.clone(),
        device.as_ref().map(|d| d.buffer_size()),
    )?;

    let mut runtime = Runtime::new(config, reloader, device, SystemClock);
    add_gamepads(&mut runtime);
    runtime.run(&mut platform);
    Ok(())
}

fn run_headless(config: Config, reloader: HotReloader, frames: u64) -> Result<()> {
    let mut runtime: Runtime<CpalSoundDevice, SystemClock> = Runtime::new(config, reloader, None, SystemClock);
    let mut platform = HeadlessPlatform::default();
    let ticks = runtime.run_frames(&mut platform, frames);
    tracing::info!(
        "Headless run finished: {} ticks, {} presented, {} missed, module {:?}",
        ticks,
        platform.presented,
        runtime.pacer().missed_frames(),
        runtime.reloader().status()
    );
    Ok(())
}

#[cfg(feature = "gamepad")]
fn add_gamepads<D: SoundDevice>(runtime: &mut Runtime<D, SystemClock>) {
    let deadzone = runtime.config().input.stick_deadzone;
    if let Some(gamepads) = hotframe_core::input::GilrsInput::new(deadzone) {
        runtime.add_input_source(Box::new(gamepads));
    }
}

#[cfg(not(feature = "gamepad"))]
fn add_gamepads<D: SoundDevice>(_runtime: &mut Runtime<D, SystemClock>) {}
