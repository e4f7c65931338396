//! Native shared-library backend

use std::path::Path;

use hotframe_shared::{
    GET_SOUND_SAMPLES_SYMBOL, GetSoundSamplesFn, InputFrame, SoundOutputBuffer, UPDATE_AND_RENDER_SYMBOL,
    UpdateAndRenderFn,
};
use libloading::Library;

use super::loader::{LoadError, LogicCapabilities, ModuleLoader};
use crate::frame::FrameBuffer;
use crate::memory::MemoryArena;

/// Loads `cdylib` logic modules exporting the C ABI entry points.
#[derive(Debug, Default)]
pub struct DylibLoader;

impl DylibLoader {
    pub fn new() -> Self {
        Self
    }
}

impl ModuleLoader for DylibLoader {
    fn load(&mut self, path: &Path) -> Result<Box<dyn LogicCapabilities>, LoadError> {
        // SAFETY: loading runs the library's initializers. Logic modules are
        // built for this host and are trusted to the same degree as the host.
        let library = unsafe { Library::new(path) }.map_err(|e| LoadError::Open {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        // SAFETY: the symbol types match the exported signatures in hotframe-shared.
        let update_and_render = unsafe { library.get::<UpdateAndRenderFn>(UPDATE_AND_RENDER_SYMBOL) }
            .map(|symbol| *symbol)
            .map_err(|_| LoadError::MissingExport("game_update_and_render"))?;
        let get_sound_samples = unsafe { library.get::<GetSoundSamplesFn>(GET_SOUND_SAMPLES_SYMBOL) }
            .map(|symbol| *symbol)
            .map_err(|_| LoadError::MissingExport("game_get_sound_samples"))?;

        Ok(Box::new(DylibModule {
            update_and_render,
            get_sound_samples,
            _library: library,
        }))
    }
}

/// Resolved entry points. The pointers are only valid while `_library` is loaded.
struct DylibModule {
    update_and_render: UpdateAndRenderFn,
    get_sound_samples: GetSoundSamplesFn,
    _library: Library,
}

impl LogicCapabilities for DylibModule {
    fn update_and_render(&mut self, memory: &mut MemoryArena, input: &InputFrame, frame: &mut FrameBuffer) {
        let mut view = memory.view();
        let mut buffer = frame.as_offscreen();
        // SAFETY: every pointer refers to host storage that outlives the call,
        // and the library is still loaded.
        unsafe { (self.update_and_render)(&mut view, input, &mut buffer) };
        memory.absorb_view(&view);
    }

    fn get_sound_samples(&mut self, memory: &mut MemoryArena, samples_per_second: u32, samples: &mut [i16]) {
        let mut view = memory.view();
        let mut sound = SoundOutputBuffer {
            samples_per_second: samples_per_second as i32,
            sample_count: (samples.len() / 2) as i32,
            samples: samples.as_mut_ptr(),
        };
        // SAFETY: `sound.samples` holds exactly `2 * sample_count` values.
        unsafe { (self.get_sound_samples)(&mut view, &mut sound) };
        memory.absorb_view(&view);
    }
}
