//! Keep-display-awake resource
//!
//! The platform hook is a trait so hosts can plug in whatever inhibits
//! screen sleep on their side. [`WakeLockGuard`] releases on drop, so every
//! teardown path (including unwinding) lets go of it.

use crate::error::Result;
use std::sync::Arc;
use tracing::debug;

/// Platform hook that keeps the display awake
pub trait KeepAwake: Send + Sync {
    fn acquire(&self) -> Result<()>;
    fn release(&self);
}

/// Host without a display to keep awake
#[derive(Debug, Default)]
pub struct NoopWakeLock;

impl KeepAwake for NoopWakeLock {
    fn acquire(&self) -> Result<()> {
        debug!("Wake lock acquired (no-op)");
        Ok(())
    }

    fn release(&self) {
        debug!("Wake lock released (no-op)");
    }
}

/// Held wake lock; released when dropped
pub struct WakeLockGuard {
    lock: Arc<dyn KeepAwake>,
}

impl WakeLockGuard {
    pub fn acquire(lock: Arc<dyn KeepAwake>) -> Result<Self> {
        lock.acquire()?;
        Ok(Self { lock })
    }
}

impl Drop for WakeLockGuard {
    fn drop(&mut self) {
        self.lock.release();
    }
}
