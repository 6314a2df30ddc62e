//! In-memory stand-in for the Scheduler's tests: no runtime socket, a canned
//! snapshot and an optionally-queued sequence of watch events.

use async_trait::async_trait;
use parking_lot::Mutex;
use sw_core::{DiscoveryEvent, WatchEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, WatchError};
use crate::RuntimeWatcher;

/// Returns a canned `snapshot()`; `watch_containers` sends that same
/// snapshot once and then waits for cancellation, mirroring a real watcher's
/// startup snapshot without a live reconnect loop.
#[derive(Default)]
pub struct FakeRuntimeWatcher {
    events: Mutex<Vec<DiscoveryEvent>>,
    fail_snapshot: Mutex<bool>,
}

impl FakeRuntimeWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_events(&self, events: Vec<DiscoveryEvent>) {
        *self.events.lock() = events;
    }

    /// Makes the next (and all subsequent) `snapshot()` calls return `Err`,
    /// simulating a runtime listing failure during reconciliation.
    pub fn fail_next_snapshot(&self) {
        *self.fail_snapshot.lock() = true;
    }
}

#[async_trait]
impl RuntimeWatcher for FakeRuntimeWatcher {
    async fn watch_containers(&self, cancellation: CancellationToken, sink: mpsc::Sender<WatchEvent>) -> Result<()> {
        let _ = sink.send(WatchEvent::Snapshot(self.events.lock().clone())).await;
        cancellation.cancelled().await;
        Ok(())
    }

    async fn snapshot(&self) -> Result<Vec<DiscoveryEvent>> {
        if *self.fail_snapshot.lock() {
            return Err(WatchError::RuntimeUnavailable("simulated snapshot failure".to_string()));
        }
        Ok(self.events.lock().clone())
    }
}
