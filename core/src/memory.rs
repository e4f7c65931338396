//! Host-owned game memory
//!
//! Both regions are allocated once, zeroed, and never moved, so a reloaded
//! logic module finds its data at the same addresses the previous one used.

use hotframe_shared::GameMemory;
use serde::{Deserialize, Serialize};

const MIB: usize = 1024 * 1024;

/// Memory configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Permanent storage, persists across reloads (MiB)
    #[serde(default = "default_permanent_mib")]
    pub permanent_mib: usize,
    /// Transient scratch storage (MiB)
    #[serde(default = "default_transient_mib")]
    pub transient_mib: usize,
}

fn default_permanent_mib() -> usize {
    64
}
fn default_transient_mib() -> usize {
    256
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            permanent_mib: default_permanent_mib(),
            transient_mib: default_transient_mib(),
        }
    }
}

pub struct MemoryArena {
    permanent: Box<[u8]>,
    transient: Box<[u8]>,
    is_initialized: bool,
}

impl MemoryArena {
    pub fn new(permanent_size: usize, transient_size: usize) -> Self {
        tracing::debug!(permanent_size, transient_size, "Allocating game memory");
        Self {
            permanent: vec![0u8; permanent_size].into_boxed_slice(),
            transient: vec![0u8; transient_size].into_boxed_slice(),
            is_initialized: false,
        }
    }

    pub fn from_config(config: &MemoryConfig) -> Self {
        Self::new(config.permanent_mib * MIB, config.transient_mib * MIB)
    }

    pub fn permanent(&self) -> &[u8] {
        &self.permanent
    }

    pub fn permanent_mut(&mut self) -> &mut [u8] {
        &mut self.permanent
    }

    pub fn transient_mut(&mut self) -> &mut [u8] {
        &mut self.transient
    }

    /// Set once the logic module has initialized its permanent storage.
    pub fn is_initialized(&self) -> bool {
        self.is_initialized
    }

    pub fn set_initialized(&mut self, initialized: bool) {
        self.is_initialized = initialized;
    }

    /// Raw view for a native logic call. Pointers stay valid while `self` lives.
    pub fn view(&mut self) -> GameMemory {
        GameMemory {
            is_initialized: self.is_initialized as u32,
            permanent_storage_size: self.permanent.len() as u64,
            permanent_storage: self.permanent.as_mut_ptr(),
            transient_storage_size: self.transient.len() as u64,
            transient_storage: self.transient.as_mut_ptr(),
        }
    }

    /// Pick up flags the logic module changed through a view.
    pub fn absorb_view(&mut self, view: &GameMemory) {
        self.is_initialized = view.is_initialized != 0;
    }
}

impl std::fmt::Debug for MemoryArena {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryArena")
            .field("permanent", &self.permanent.len())
            .field("transient", &self.transient.len())
            .field("is_initialized", &self.is_initialized)
            .finish()
    }
}
