//! WebAssembly backend
//!
//! Guests get no imports. The host appends a scratch region to guest memory
//! and copies a window of permanent storage, the input frame, and the output
//! buffers through it around every call, so persistent state lives on the
//! host side and survives reloads.

use std::path::Path;

use hotframe_shared::{InputFrame, wasm_exports};
use wasmtime::{Config, Engine, Instance, Memory, Module, Store, TypedFunc};

use super::loader::{LoadError, LogicCapabilities, ModuleLoader};
use crate::frame::FrameBuffer;
use crate::memory::MemoryArena;

const WASM_PAGE_SIZE: usize = 64 * 1024;
const SCRATCH_ALIGN: usize = 16;

/// `(state_ptr, state_len, input_ptr, pixels_ptr, width, height, pitch)`
type UpdateParams = (i32, i32, i32, i32, i32, i32, i32);
/// `(state_ptr, state_len, samples_ptr, sample_count, samples_per_second)`
type SoundParams = (i32, i32, i32, i32, i32);

/// Compiles and instantiates `.wasm` logic modules.
pub struct WasmLoader {
    engine: Engine,
    state_bytes: usize,
}

impl WasmLoader {
    /// `state_bytes` is how much of permanent storage each call sees.
    pub fn new(state_bytes: usize) -> Result<Self, LoadError> {
        let engine = Engine::new(&Config::new()).map_err(|e| LoadError::Instantiate(format!("{e:#}")))?;
        Ok(Self { engine, state_bytes })
    }

    /// Instantiate a module from binary or text bytes.
    pub fn instantiate(&self, bytes: &[u8]) -> Result<WasmModule, LoadError> {
        let module = Module::new(&self.engine, bytes).map_err(|e| LoadError::Instantiate(format!("{e:#}")))?;
        let mut store = Store::new(&self.engine, ());
        let instance =
            Instance::new(&mut store, &module, &[]).map_err(|e| LoadError::Instantiate(format!("{e:#}")))?;

        let memory = instance
            .get_memory(&mut store, wasm_exports::MEMORY)
            .ok_or(LoadError::MissingExport(wasm_exports::MEMORY))?;
        let update_and_render = instance
            .get_typed_func::<UpdateParams, ()>(&mut store, wasm_exports::UPDATE_AND_RENDER)
            .map_err(|_| LoadError::MissingExport(wasm_exports::UPDATE_AND_RENDER))?;
        let get_sound_samples = instance
            .get_typed_func::<SoundParams, ()>(&mut store, wasm_exports::GET_SOUND_SAMPLES)
            .map_err(|_| LoadError::MissingExport(wasm_exports::GET_SOUND_SAMPLES))?;

        Ok(WasmModule {
            store,
            memory,
            update_and_render,
            get_sound_samples,
            state_bytes: self.state_bytes,
            scratch_base: 0,
            scratch_len: 0,
            parked: false,
        })
    }
}

impl ModuleLoader for WasmLoader {
    fn load(&mut self, path: &Path) -> Result<Box<dyn LogicCapabilities>, LoadError> {
        let bytes = std::fs::read(path)?;
        Ok(Box::new(self.instantiate(&bytes)?))
    }
}

/// One instantiated guest.
pub struct WasmModule {
    store: Store<()>,
    memory: Memory,
    update_and_render: TypedFunc<UpdateParams, ()>,
    get_sound_samples: TypedFunc<SoundParams, ()>,
    state_bytes: usize,
    scratch_base: usize,
    scratch_len: usize,
    /// Set after a trap; calls are skipped until the module is replaced.
    parked: bool,
}

fn align_up(value: usize) -> usize {
    value.div_ceil(SCRATCH_ALIGN) * SCRATCH_ALIGN
}

impl WasmModule {
    pub fn is_parked(&self) -> bool {
        self.parked
    }

    /// Guest address of a scratch region of at least `needed` bytes.
    fn scratch(&mut self, needed: usize) -> anyhow::Result<usize> {
        if needed > self.scratch_len {
            let pages = needed.div_ceil(WASM_PAGE_SIZE);
            let previous = self
                .memory
                .grow(&mut self.store, pages as u64)
                .map_err(|e| anyhow::anyhow!("Failed to grow guest memory for host scratch: {:#}", e))?;
            self.scratch_base = previous as usize * WASM_PAGE_SIZE;
            self.scratch_len = pages * WASM_PAGE_SIZE;
        }
        Ok(self.scratch_base)
    }

    fn state_len(&self, arena: &MemoryArena) -> usize {
        self.state_bytes.min(arena.permanent().len())
    }

    fn call_update(&mut self, arena: &mut MemoryArena, input: &InputFrame, frame: &mut FrameBuffer) -> anyhow::Result<()> {
        let state_len = self.state_len(arena);
        let input_bytes = bytemuck::bytes_of(input);
        let input_offset = align_up(state_len);
        let pixels_offset = align_up(input_offset + input_bytes.len());
        let pixels_len = frame.as_bytes().len();
        let base = self.scratch(pixels_offset + pixels_len)?;

        {
            let data = self.memory.data_mut(&mut self.store);
            data[base..base + state_len].copy_from_slice(&arena.permanent()[..state_len]);
            data[base + input_offset..base + input_offset + input_bytes.len()].copy_from_slice(input_bytes);
            data[base + pixels_offset..base + pixels_offset + pixels_len].copy_from_slice(frame.as_bytes());
        }

        self.update_and_render.call(
            &mut self.store,
            (
                base as i32,
                state_len as i32,
                (base + input_offset) as i32,
                (base + pixels_offset) as i32,
                frame.width() as i32,
                frame.height() as i32,
                frame.pitch() as i32,
            ),
        )
        .map_err(|e| anyhow::anyhow!("{}() trapped: {:#}", wasm_exports::UPDATE_AND_RENDER, e))?;

        let data = self.memory.data(&self.store);
        arena.permanent_mut()[..state_len].copy_from_slice(&data[base..base + state_len]);
        frame
            .as_bytes_mut()
            .copy_from_slice(&data[base + pixels_offset..base + pixels_offset + pixels_len]);
        Ok(())
    }

    fn call_sound(&mut self, arena: &mut MemoryArena, samples_per_second: u32, samples: &mut [i16]) -> anyhow::Result<()> {
        let state_len = self.state_len(arena);
        let samples_offset = align_up(state_len);
        let samples_len = samples.len() * 2;
        let base = self.scratch(samples_offset + samples_len)?;

        {
            let data = self.memory.data_mut(&mut self.store);
            data[base..base + state_len].copy_from_slice(&arena.permanent()[..state_len]);
            data[base + samples_offset..base + samples_offset + samples_len].fill(0);
        }

        self.get_sound_samples.call(
            &mut self.store,
            (
                base as i32,
                state_len as i32,
                (base + samples_offset) as i32,
                (samples.len() / 2) as i32,
                samples_per_second as i32,
            ),
        )
        .map_err(|e| anyhow::anyhow!("{}() trapped: {:#}", wasm_exports::GET_SOUND_SAMPLES, e))?;

        let data = self.memory.data(&self.store);
        arena.permanent_mut()[..state_len].copy_from_slice(&data[base..base + state_len]);
        let guest_samples = &data[base + samples_offset..base + samples_offset + samples_len];
        for (sample, bytes) in samples.iter_mut().zip(guest_samples.chunks_exact(2)) {
            *sample = i16::from_le_bytes([bytes[0], bytes[1]]);
        }
        Ok(())
    }

    fn park(&mut self, error: anyhow::Error) {
        tracing::error!("Logic module failed: {:#}. Calls are suspended until the next reload.", error);
        self.parked = true;
    }
}

impl LogicCapabilities for WasmModule {
    fn update_and_render(&mut self, memory: &mut MemoryArena, input: &InputFrame, frame: &mut FrameBuffer) {
        if self.parked {
            return;
        }
        if let Err(e) = self.call_update(memory, input, frame) {
            self.park(e);
        }
    }

    fn get_sound_samples(&mut self, memory: &mut MemoryArena, samples_per_second: u32, samples: &mut [i16]) {
        if self.parked {
            return;
        }
        if let Err(e) = self.call_sound(memory, samples_per_second, samples) {
            self.park(e);
        }
    }
}
