//! The Image Manager (spec §4.2): canonicalizes watcher discovery events
//! into `Image`/`ContainerInstance` rows and enqueues scans for anything
//! not yet `completed`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sw_core::{ContainerInstance, DiscoveryEvent};
use sw_queue::{ScanJob, ScanQueue};
use sw_store::{ImageFilter, PageResult, Pagination, Store};

/// Holds the Store and Scan Job Queue handles a running daemon wires
/// together; owns no background task of its own — the daemon's watcher
/// fan-in loop calls `on_container_seen`/`on_snapshot` directly as events
/// arrive.
pub struct ImageManager {
    store: Arc<Store>,
    queue: Arc<ScanQueue>,
    /// Serializes `OnContainerSeen` against `OnSnapshot`: a delta event
    /// racing a snapshot replace could otherwise upsert an instance the
    /// snapshot is in the middle of evicting.
    guard: tokio::sync::Mutex<()>,
    storage_errors: AtomicU64,
}

impl ImageManager {
    pub fn new(store: Arc<Store>, queue: Arc<ScanQueue>) -> Arc<Self> {
        Arc::new(Self { store, queue, guard: tokio::sync::Mutex::new(()), storage_errors: AtomicU64::new(0) })
    }

    /// A single container observed (new or re-observed). Upserts the Image
    /// and Container Instance rows, then enqueues a scan; admission (spec
    /// §4.3) silently drops the request if the digest is already
    /// `completed` or in-pipeline, so this is safe to call on every sighting.
    pub async fn on_container_seen(&self, event: DiscoveryEvent, now: DateTime<Utc>) {
        let _guard = self.guard.lock().await;
        if let Err(error) = self.handle_container_seen(&event, now) {
            self.storage_errors.fetch_add(1, Ordering::SeqCst);
            tracing::warn!(digest = %event.digest, %error, "failed to record discovered container");
            return;
        }
        self.enqueue_scan(&event).await;
    }

    fn handle_container_seen(&self, event: &DiscoveryEvent, now: DateTime<Utc>) -> sw_store::Result<()> {
        self.store.upsert_image(&event.digest, now)?;
        let instance = ContainerInstance::from_event(event.clone(), now);
        self.store.upsert_instance(&instance, now)?;
        Ok(())
    }

    /// A full reconciliation snapshot: replaces the live container set
    /// transactionally, then enqueues a scan for every instance in it.
    /// Images whose refcount drops to zero are left for the Cleanup job
    /// (spec §4.7), not deleted here.
    pub async fn on_snapshot(&self, events: Vec<DiscoveryEvent>, now: DateTime<Utc>) {
        let _guard = self.guard.lock().await;
        if let Err(error) = self.handle_snapshot(&events, now) {
            self.storage_errors.fetch_add(1, Ordering::SeqCst);
            tracing::warn!(%error, "failed to record container snapshot");
            return;
        }
        for event in &events {
            self.enqueue_scan(event).await;
        }
    }

    fn handle_snapshot(&self, events: &[DiscoveryEvent], now: DateTime<Utc>) -> sw_store::Result<()> {
        for event in events {
            self.store.upsert_image(&event.digest, now)?;
        }
        let instances: Vec<ContainerInstance> =
            events.iter().cloned().map(|event| ContainerInstance::from_event(event, now)).collect();
        self.store.replace_instance_snapshot(&instances, now)?;
        Ok(())
    }

    async fn enqueue_scan(&self, event: &DiscoveryEvent) {
        let job = ScanJob {
            digest: event.digest.clone(),
            reference: event.reference.clone(),
            node: event.node.clone(),
            runtime_kind: event.runtime_kind.clone(),
            force: false,
        };
        if let Err(error) = self.queue.submit(job).await {
            self.storage_errors.fetch_add(1, Ordering::SeqCst);
            tracing::warn!(digest = %event.digest, %error, "failed to enqueue scan for discovered image");
        }
    }

    /// Delegates straight to the Store's read-only surface (spec §4.4).
    pub fn list_images_for(&self, pagination: Pagination, filter: &ImageFilter) -> sw_store::Result<PageResult<sw_core::Image>> {
        self.store.list_images(pagination, filter)
    }

    /// Count of storage/queue-admission errors encountered while recording
    /// discoveries, for the daemon's health surface.
    pub fn storage_error_count(&self) -> u64 {
        self.storage_errors.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
