//! Shared health state for the /health endpoint.
//! Updated by ElasticClient after every store round trip.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Store reachability as seen by the last call. Written by the store client, read by the API.
#[derive(Default)]
pub struct HealthState {
    /// True after a successful store call, false after a failed one.
    pub store_reachable: AtomicBool,
    /// Nanosecond timestamp of last successful store call (0 = none).
    pub last_success_at_ns: AtomicU64,
    /// Failed store calls since startup.
    pub store_failures: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, at_ns: u64) {
        self.store_reachable.store(true, Ordering::Relaxed);
        self.last_success_at_ns.store(at_ns, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.store_reachable.store(false, Ordering::Relaxed);
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn store_reachable(&self) -> bool {
        self.store_reachable.load(Ordering::Relaxed)
    }

    pub fn last_success_at_ns(&self) -> u64 {
        self.last_success_at_ns.load(Ordering::Relaxed)
    }

    pub fn store_failures(&self) -> u64 {
        self.store_failures.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_clears_reachability_but_keeps_last_success() {
        let h = HealthState::new();
        h.record_success(42);
        h.record_failure();
        assert!(!h.store_reachable());
        assert_eq!(h.last_success_at_ns(), 42);
        assert_eq!(h.store_failures(), 1);
    }
}
