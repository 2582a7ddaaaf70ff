use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation of running sampling calls.
///
/// Clones share one flag, so a token handed to another thread can stop a call in progress. Work that
/// already started finishes, no new work is started.
#[derive(Debug, Clone, Default)]
pub struct SamplingToken {
    stopped: Arc<AtomicBool>,
}

impl SamplingToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.stopped.store(false, Ordering::SeqCst);
    }

    pub fn is_sampling(&self) -> bool {
        !self.stopped.load(Ordering::SeqCst)
    }
}
