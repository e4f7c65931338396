//! Configuration management (`<config dir>/config.toml`)
//!
//! Handles loading, saving, and providing defaults for runtime settings.
//! Every field has a default, so partial files are fine.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::input::InputConfig;
use crate::memory::MemoryConfig;
use crate::reload::ReloadConfig;

const CONFIG_FILE: &str = "config.toml";

/// Errors reading or writing a config file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no configuration directory on this platform")]
    NoConfigDir,
}

/// Runtime configuration, one TOML table per section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Config {
    /// Frame cadence and pacing
    #[serde(default)]
    pub timing: TimingConfig,
    /// Sound output and synchronization
    #[serde(default)]
    pub audio: AudioConfig,
    /// Controllers and key bindings
    #[serde(default)]
    pub input: InputConfig,
    /// Logic module hot reload
    #[serde(default)]
    pub reload: ReloadConfig,
    /// Game memory sizes
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Back buffer and window
    #[serde(default)]
    pub video: VideoConfig,
}

/// Frame timing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Ticks per second (default: 30)
    #[serde(default = "default_update_hz")]
    pub update_hz: u32,
    /// Sleep stops this many ms short of the frame target; 0 spins only (default: 1.0)
    #[serde(default = "default_sleep_granularity_ms")]
    pub sleep_granularity_ms: f32,
    /// Log frame statistics every N frames; 0 disables (default: 120)
    #[serde(default = "default_report_every_frames")]
    pub report_every_frames: u32,
}

/// Audio configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    /// Requested output rate; the device may choose another (default: 48000)
    #[serde(default = "default_samples_per_second")]
    pub samples_per_second: u32,
    /// Device ring size in seconds (default: 1.0)
    #[serde(default = "default_buffer_seconds")]
    pub buffer_seconds: f32,
    /// Maximum look-ahead in frames before the index is resynchronized (default: 3)
    #[serde(default = "default_latency_frames")]
    pub latency_frames: u32,
    /// Safety margin as a fraction of one frame's bytes, 1/N (default: 3)
    #[serde(default = "default_safety_divisor")]
    pub safety_divisor: u32,
    /// Record cursor markers for on-screen debugging (default: on in debug builds)
    #[serde(default = "default_sync_markers")]
    pub sync_markers: bool,
    /// Number of markers kept (default: 15)
    #[serde(default = "default_marker_count")]
    pub marker_count: usize,
}

/// Back buffer and window configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoConfig {
    /// Back buffer width in pixels (default: 960)
    #[serde(default = "default_width")]
    pub width: u32,
    /// Back buffer height in pixels (default: 540)
    #[serde(default = "default_height")]
    pub height: u32,
    /// Initial window scale (default: 2)
    #[serde(default = "default_scale")]
    pub scale: u32,
}

fn default_update_hz() -> u32 {
    30
}
fn default_sleep_granularity_ms() -> f32 {
    1.0
}
fn default_report_every_frames() -> u32 {
    120
}

fn default_samples_per_second() -> u32 {
    48_000
}
fn default_buffer_seconds() -> f32 {
    1.0
}
fn default_latency_frames() -> u32 {
    3
}
fn default_safety_divisor() -> u32 {
    3
}
fn default_sync_markers() -> bool {
    cfg!(debug_assertions)
}
fn default_marker_count() -> usize {
    15
}

fn default_width() -> u32 {
    960
}
fn default_height() -> u32 {
    540
}
fn default_scale() -> u32 {
    2
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            update_hz: default_update_hz(),
            sleep_granularity_ms: default_sleep_granularity_ms(),
            report_every_frames: default_report_every_frames(),
        }
    }
}

impl TimingConfig {
    /// `None` when sleeping is disabled.
    pub fn sleep_granularity(&self) -> Option<Duration> {
        (self.sleep_granularity_ms > 0.0).then(|| Duration::from_secs_f64(self.sleep_granularity_ms as f64 / 1000.0))
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            samples_per_second: default_samples_per_second(),
            buffer_seconds: default_buffer_seconds(),
            latency_frames: default_latency_frames(),
            safety_divisor: default_safety_divisor(),
            sync_markers: default_sync_markers(),
            marker_count: default_marker_count(),
        }
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            scale: default_scale(),
        }
    }
}

/// Returns the platform-specific configuration directory.
///
/// On Windows: `%APPDATA%\Hotframe\config`
/// On macOS: `~/Library/Application Support/io.hotframe.Hotframe`
/// On Linux: `~/.config/hotframe`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("io.hotframe", "", "Hotframe").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Default location of `config.toml`.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join(CONFIG_FILE))
}

/// Read a config file. A missing file yields defaults.
pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads the configuration from the platform config directory.
///
/// Falls back to defaults, with a warning, if the file cannot be parsed.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        return Config::default();
    };
    load_from(&path).unwrap_or_else(|e| {
        tracing::warn!("{}; using default configuration", e);
        Config::default()
    })
}

/// Write `config` as pretty TOML, creating parent directories.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    let content = toml::to_string_pretty(config)?;
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Write {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, content).map_err(|source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Saves the configuration to the platform config directory.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &path)
}

/// Validate that no keybindings conflict with each other.
///
/// Returns a list of warning messages for any conflicts found.
pub fn validate_keybindings(config: &Config) -> Vec<String> {
    config
        .input
        .keyboard
        .conflicts()
        .into_iter()
        .map(|(key, buttons)| {
            let name = crate::input::keycode_serde::key_name(key).unwrap_or("?");
            format!("key '{}' is bound to several buttons: {:?}", name, buttons)
        })
        .collect()
}
