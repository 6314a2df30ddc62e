//! RefreshImages (spec §4.5): force a reconciliation tick through the
//! Manager even if the runtime watcher has gone quiet, by polling each
//! watcher's one-shot snapshot directly instead of waiting on its stream.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sw_manager::ImageManager;
use sw_watch::RuntimeWatcher;
use tokio_util::sync::CancellationToken;

use crate::job::ScheduledJob;

pub struct RefreshImagesJob {
    watchers: Vec<Arc<dyn RuntimeWatcher>>,
    manager: Arc<ImageManager>,
}

impl RefreshImagesJob {
    pub fn new(watchers: Vec<Arc<dyn RuntimeWatcher>>, manager: Arc<ImageManager>) -> Self {
        Self { watchers, manager }
    }
}

#[async_trait]
impl ScheduledJob for RefreshImagesJob {
    fn name(&self) -> &str {
        "refresh_images"
    }

    async fn run(&self, _cancellation: CancellationToken) -> Result<(), String> {
        // `on_snapshot` replaces the *entire* tracked instance table with what
        // it's given (spec §4.4); a partial listing here would read as "these
        // are the only containers left" and delete every instance belonging
        // to a watcher that failed to list. One failure aborts the whole tick.
        let mut events = Vec::new();
        for watcher in &self.watchers {
            match watcher.snapshot().await {
                Ok(watcher_events) => events.extend(watcher_events),
                Err(error) => return Err(format!("runtime watcher snapshot failed: {error}")),
            }
        }
        self.manager.on_snapshot(events, Utc::now()).await;
        Ok(())
    }
}

#[cfg(test)]
#[path = "refresh_tests.rs"]
mod tests;
