//! Logic module capabilities and the loader seam

use std::path::{Path, PathBuf};

use hotframe_shared::InputFrame;

use crate::frame::FrameBuffer;
use crate::memory::MemoryArena;

/// Why a logic module could not be bound.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("logic module not found: {}", .0.display())]
    Missing(PathBuf),

    #[error("failed to copy logic module to {}: {source}", .path.display())]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to open logic module {}: {reason}", .path.display())]
    Open { path: PathBuf, reason: String },

    #[error("logic module does not export `{0}`")]
    MissingExport(&'static str),

    #[error("failed to instantiate logic module: {0}")]
    Instantiate(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// The two calls the main loop makes into logic each tick.
pub trait LogicCapabilities {
    /// Advance the simulation and draw into `frame`.
    fn update_and_render(&mut self, memory: &mut MemoryArena, input: &InputFrame, frame: &mut FrameBuffer);

    /// Fill `samples` (interleaved stereo) completely.
    fn get_sound_samples(&mut self, memory: &mut MemoryArena, samples_per_second: u32, samples: &mut [i16]);
}

/// Loads a module file and resolves both capabilities, or fails as a whole.
pub trait ModuleLoader {
    fn load(&mut self, path: &Path) -> Result<Box<dyn LogicCapabilities>, LoadError>;
}

/// Bound whenever no valid module is loaded. Leaves every output untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct StubLogic;

impl LogicCapabilities for StubLogic {
    fn update_and_render(&mut self, _memory: &mut MemoryArena, _input: &InputFrame, _frame: &mut FrameBuffer) {}

    fn get_sound_samples(&mut self, _memory: &mut MemoryArena, _samples_per_second: u32, _samples: &mut [i16]) {}
}
