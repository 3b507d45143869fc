use std::sync::atomic::{AtomicBool, Ordering};

use tiercache_core::storage::Connectivity;

/// Connectivity probe driven by the caller, e.g. from a platform reachability
/// callback or a test.
#[derive(Debug)]
pub struct SwitchConnectivity {
    available: AtomicBool,
}

impl SwitchConnectivity {
    pub fn new(available: bool) -> Self {
        Self {
            available: AtomicBool::new(available),
        }
    }

    pub fn online() -> Self {
        Self::new(true)
    }

    pub fn offline() -> Self {
        Self::new(false)
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::Release);
        tracing::debug!(available, "Connectivity changed");
    }
}

impl Default for SwitchConnectivity {
    fn default() -> Self {
        Self::online()
    }
}

impl Connectivity for SwitchConnectivity {
    fn is_available(&self) -> bool {
        self.available.load(Ordering::Acquire)
    }
}
