//! Single-flight guard shared by the orchestrator and the pusher

use std::sync::atomic::{AtomicBool, Ordering};

/// Holds the running flag; releases it on drop, including when the owning
/// future is dropped mid-await
pub(crate) struct RunGuard<'a> {
    running: &'a AtomicBool,
}

impl<'a> RunGuard<'a> {
    pub(crate) fn acquire(running: &'a AtomicBool) -> Option<Self> {
        running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { running })
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}
