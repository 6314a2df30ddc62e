//! Readiness state (spec §7: `StorageUnavailable` "retried by callers with
//! backoff and reported via readiness", spec §6: `GET /ready`). No HTTP
//! layer lives in this workspace, but something has to own the state it
//! would read — this is that seam.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Default)]
pub struct DaemonHealth {
    vuln_db_ready: AtomicBool,
    manager_storage_errors: AtomicU64,
}

impl DaemonHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_vuln_db_ready(&self, ready: bool) {
        self.vuln_db_ready.store(ready, Ordering::SeqCst);
    }

    pub fn is_ready(&self) -> bool {
        self.vuln_db_ready.load(Ordering::SeqCst)
    }

    pub fn record_manager_storage_errors(&self, count: u64) {
        self.manager_storage_errors.store(count, Ordering::SeqCst);
    }

    pub fn manager_storage_errors(&self) -> u64 {
        self.manager_storage_errors.load(Ordering::SeqCst)
    }
}
