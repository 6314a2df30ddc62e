//! Cleanup (spec §4.5): evict Images with no referencing Container
//! Instances and no activity newer than a retention threshold.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sw_store::Store;
use tokio_util::sync::CancellationToken;

use crate::job::ScheduledJob;

/// See SPEC_FULL.md §10.4 for why 24 hours is the default.
pub const DEFAULT_RETENTION_HOURS: i64 = 24;

pub struct CleanupJob {
    store: Arc<Store>,
    retention: Duration,
}

impl CleanupJob {
    pub fn new(store: Arc<Store>, retention: Duration) -> Self {
        Self { store, retention }
    }

    pub fn with_default_retention(store: Arc<Store>) -> Self {
        Self::new(store, Duration::hours(DEFAULT_RETENTION_HOURS))
    }
}

#[async_trait]
impl ScheduledJob for CleanupJob {
    fn name(&self) -> &str {
        "cleanup"
    }

    async fn run(&self, _cancellation: CancellationToken) -> Result<(), String> {
        let threshold = Utc::now() - self.retention;
        let removed = self.store.delete_orphan_images(threshold).map_err(|e| e.to_string())?;
        if removed > 0 {
            tracing::info!(removed, "cleanup evicted orphaned images");
        }
        Ok(())
    }
}
