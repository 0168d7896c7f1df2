//! Monotonic clock abstraction
//!
//! Elapsed narration time is always `clock_now - start_reference`; nothing in
//! the player polls a playback position from the output device.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Monotonic time source in seconds
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// Wall clock based on `Instant`, zeroed at construction
#[derive(Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// Clock that only moves when told to
///
/// Stored as whole microseconds so it can be shared across threads without
/// a lock.
#[derive(Debug, Default)]
pub struct ManualClock {
    micros: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move forward by `seconds` (negative values are ignored)
    pub fn advance(&self, seconds: f64) {
        if seconds > 0.0 {
            let delta = (seconds * 1_000_000.0).round() as u64;
            self.micros.fetch_add(delta, Ordering::SeqCst);
        }
    }

    /// Jump to an absolute time; never moves backwards
    pub fn set(&self, seconds: f64) {
        let target = (seconds.max(0.0) * 1_000_000.0).round() as u64;
        self.micros.fetch_max(target, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.micros.load(Ordering::SeqCst) as f64 / 1_000_000.0
    }
}
