//! Time sources for the frame pacer

use std::time::{Duration, Instant};

/// Monotonic clock plus the one voluntary yield the loop makes.
pub trait Clock {
    fn now(&self) -> Instant;

    /// Block the thread for roughly `duration`. May oversleep.
    fn sleep(&self, duration: Duration);

    /// Free-running CPU cycle counter, 0 where unsupported.
    fn cycles(&self) -> u64 {
        read_cycle_counter()
    }
}

/// Wall clock backed by [`Instant`] and [`std::thread::sleep`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

#[cfg(target_arch = "x86_64")]
pub fn read_cycle_counter() -> u64 {
    // SAFETY: RDTSC is available on every x86_64 CPU and has no side effects.
    #[allow(unused_unsafe)]
    unsafe {
        std::arch::x86_64::_rdtsc()
    }
}

#[cfg(not(target_arch = "x86_64"))]
pub fn read_cycle_counter() -> u64 {
    0
}
