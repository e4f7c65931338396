//! Hot-reloadable logic modules
//!
//! The reloader watches the module file's modification time. On change it
//! copies the file to a private working path, drops the previous module,
//! and tries to bind the new copy. Anything short of both capabilities
//! binds no-op stubs instead, so callers always have something to call.

mod dylib;
mod loader;
mod wasm;


use std::path::{Path, PathBuf};
use std::time::SystemTime;

use hotframe_shared::InputFrame;
use serde::{Deserialize, Serialize};

pub use dylib::DylibLoader;
pub use loader::{LoadError, LogicCapabilities, ModuleLoader, StubLogic};
pub use wasm::{WasmLoader, WasmModule};

use crate::frame::FrameBuffer;
use crate::memory::MemoryArena;

/// How logic modules are loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Native shared library (`.so`, `.dylib`, `.dll`)
    Dylib,
    /// WebAssembly module (`.wasm`, `.wat`)
    Wasm,
}

impl Backend {
    /// Guess the backend from a module's file extension.
    pub fn infer(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("wasm") || ext.eq_ignore_ascii_case("wat") => Backend::Wasm,
            _ => Backend::Dylib,
        }
    }

    pub fn loader(self, config: &ReloadConfig) -> Result<Box<dyn ModuleLoader>, LoadError> {
        Ok(match self {
            Backend::Dylib => Box::new(DylibLoader::new()),
            Backend::Wasm => Box::new(WasmLoader::new(config.wasm_state_bytes)?),
        })
    }
}

/// Reload configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReloadConfig {
    /// Logic module to run (the command line takes precedence)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<PathBuf>,

    /// Loader backend; inferred from the module extension when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<Backend>,

    /// Check the module file every N frames
    #[serde(default = "default_poll_every_frames")]
    pub poll_every_frames: u32,

    /// Bytes of permanent storage visible to WebAssembly modules
    #[serde(default = "default_wasm_state_bytes")]
    pub wasm_state_bytes: usize,
}

fn default_poll_every_frames() -> u32 {
    1
}
fn default_wasm_state_bytes() -> usize {
    64 * 1024
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            module: None,
            backend: None,
            poll_every_frames: default_poll_every_frames(),
            wasm_state_bytes: default_wasm_state_bytes(),
        }
    }
}

impl ReloadConfig {
    /// The configured backend, or the one implied by `module`.
    pub fn backend_for(&self, module: &Path) -> Backend {
        self.backend.unwrap_or_else(|| Backend::infer(module))
    }
}

/// Binding state of the current logic module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleStatus {
    /// Previous module released, next one not probed yet.
    Unloaded,
    /// No valid module; stubs are bound.
    Stubbed,
    /// Both capabilities resolved from the module file.
    Valid,
}

/// Capabilities plus the tag saying where they came from.
///
/// Replaced as a whole on reload, never patched field by field.
pub struct LogicModule {
    status: ModuleStatus,
    capabilities: Box<dyn LogicCapabilities>,
}

impl LogicModule {
    pub fn unloaded() -> Self {
        Self {
            status: ModuleStatus::Unloaded,
            capabilities: Box::new(StubLogic),
        }
    }

    pub fn stubbed() -> Self {
        Self {
            status: ModuleStatus::Stubbed,
            capabilities: Box::new(StubLogic),
        }
    }

    pub fn valid(capabilities: Box<dyn LogicCapabilities>) -> Self {
        Self {
            status: ModuleStatus::Valid,
            capabilities,
        }
    }

    pub fn status(&self) -> ModuleStatus {
        self.status
    }

    pub fn is_valid(&self) -> bool {
        self.status == ModuleStatus::Valid
    }

    pub fn update_and_render(&mut self, memory: &mut MemoryArena, input: &InputFrame, frame: &mut FrameBuffer) {
        self.capabilities.update_and_render(memory, input, frame);
    }

    pub fn get_sound_samples(&mut self, memory: &mut MemoryArena, samples_per_second: u32, samples: &mut [i16]) {
        self.capabilities.get_sound_samples(memory, samples_per_second, samples);
    }
}

impl std::fmt::Debug for LogicModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogicModule").field("status", &self.status).finish_non_exhaustive()
    }
}

/// Watches a module file and swaps fresh copies in between ticks.
pub struct HotReloader {
    loader: Box<dyn ModuleLoader>,
    source: PathBuf,
    work_dir: tempfile::TempDir,
    module: LogicModule,
    last_write_time: Option<SystemTime>,
    working_copy: Option<PathBuf>,
    generation: u64,
    poll_every: u32,
    frames_until_poll: u32,
}

impl HotReloader {
    /// Create a reloader and make the first load attempt.
    pub fn new(loader: Box<dyn ModuleLoader>, source: impl Into<PathBuf>, poll_every: u32) -> Result<Self, LoadError> {
        let work_dir = tempfile::Builder::new().prefix("hotframe-").tempdir()?;
        let mut reloader = Self {
            loader,
            source: source.into(),
            work_dir,
            module: LogicModule::unloaded(),
            last_write_time: None,
            working_copy: None,
            generation: 0,
            poll_every: poll_every.max(1),
            frames_until_poll: poll_every.max(1),
        };
        let write_time = reloader.source_write_time();
        reloader.reload(write_time);
        Ok(reloader)
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn module(&self) -> &LogicModule {
        &self.module
    }

    pub fn module_mut(&mut self) -> &mut LogicModule {
        &mut self.module
    }

    pub fn status(&self) -> ModuleStatus {
        self.module.status()
    }

    /// Path of the copy the current module was loaded from.
    pub fn working_copy(&self) -> Option<&Path> {
        self.working_copy.as_deref()
    }

    /// Number of load attempts so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Called once per tick; checks the file every `poll_every` ticks.
    ///
    /// Returns the new status if a reload happened.
    pub fn poll(&mut self) -> Option<ModuleStatus> {
        self.frames_until_poll -= 1;
        if self.frames_until_poll > 0 {
            return None;
        }
        self.frames_until_poll = self.poll_every;
        self.check_for_changes().then(|| self.status())
    }

    /// Reload if the module file's modification time differs from the last one seen.
    pub fn check_for_changes(&mut self) -> bool {
        let write_time = self.source_write_time();
        if write_time == self.last_write_time {
            return false;
        }
        tracing::info!("Logic module changed: {}", self.source.display());
        self.reload(write_time);
        true
    }

    fn source_write_time(&self) -> Option<SystemTime> {
        std::fs::metadata(&self.source).and_then(|m| m.modified()).ok()
    }

    /// Unload, copy, load. The timestamp is recorded whatever the outcome so a
    /// broken file is not retried every tick.
    fn reload(&mut self, write_time: Option<SystemTime>) {
        self.last_write_time = write_time;

        self.module = LogicModule::unloaded();
        if let Some(stale) = self.working_copy.take() {
            remove_working_copy(&stale);
        }

        self.generation += 1;
        self.module = match self.load_generation() {
            Ok(capabilities) => {
                tracing::info!("Loaded logic module {} (generation {})", self.source.display(), self.generation);
                LogicModule::valid(capabilities)
            }
            Err(e) => {
                tracing::warn!("Logic module rejected, running stubs: {}", e);
                if let Some(copy) = self.working_copy.take() {
                    remove_working_copy(&copy);
                }
                LogicModule::stubbed()
            }
        };
    }

    fn load_generation(&mut self) -> Result<Box<dyn LogicCapabilities>, LoadError> {
        if !self.source.is_file() {
            return Err(LoadError::Missing(self.source.clone()));
        }
        let copy = self.work_dir.path().join(self.copy_name());
        std::fs::copy(&self.source, &copy).map_err(|source| LoadError::Copy {
            path: copy.clone(),
            source,
        })?;
        self.working_copy = Some(copy.clone());
        self.loader.load(&copy)
    }

    /// `<stem>.hot<N>.<ext>`, unique per generation so the OS loader never
    /// hands back a cached handle.
    fn copy_name(&self) -> String {
        let stem = self
            .source
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "module".to_string());
        match self.source.extension() {
            Some(ext) => format!("{}.hot{}.{}", stem, self.generation, ext.to_string_lossy()),
            None => format!("{}.hot{}", stem, self.generation),
        }
    }
}

/// Best effort; a leftover copy is removed with the temp dir at exit.
fn remove_working_copy(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        tracing::debug!("Could not remove module copy {}: {}", path.display(), e);
    }
}
