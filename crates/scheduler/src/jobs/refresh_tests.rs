use std::sync::Arc;

use chrono::Utc;
use sw_core::{Digest, InstanceIdentity, RuntimeKind, SystemClock};
use sw_providers::fake::{FakeSbomProducer, FakeVulnMatcher};
use sw_queue::{QueueConfig, ScanQueue};
use sw_store::Store;
use sw_watch::fake::FakeRuntimeWatcher;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

use super::*;
use crate::job::ScheduledJob;

fn open_store() -> (Arc<Store>, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let store = Arc::new(Store::open(dir.path().join("scanwatch.db")).unwrap());
    (store, dir)
}

fn spawn_queue(store: Arc<Store>) -> Arc<ScanQueue> {
    ScanQueue::spawn(
        store,
        Arc::new(FakeSbomProducer::new()),
        Arc::new(FakeVulnMatcher::new(Utc::now())),
        SystemClock,
        QueueConfig::default(),
    )
}

fn event(digest: &str, namespace: &str) -> sw_core::DiscoveryEvent {
    sw_core::DiscoveryEvent {
        instance_identity: InstanceIdentity::new(namespace, "pod", "container"),
        reference: "app:latest".to_string(),
        digest: Digest::new(digest),
        node: None,
        runtime_kind: RuntimeKind::Kubernetes,
    }
}

#[tokio::test]
async fn refresh_replaces_instances_from_a_healthy_watcher() {
    let (store, _dir) = open_store();
    let queue = spawn_queue(store.clone());
    let manager = sw_manager::ImageManager::new(store.clone(), queue);

    let watcher = Arc::new(FakeRuntimeWatcher::new());
    watcher.set_events(vec![event("sha256:aaa", "prod")]);

    let job = RefreshImagesJob::new(vec![watcher], manager);
    job.run(CancellationToken::new()).await.unwrap();

    assert!(store.get_image(&Digest::new("sha256:aaa")).unwrap().is_some());
}

#[tokio::test]
async fn refresh_aborts_and_does_not_wipe_instances_when_a_watcher_fails() {
    let (store, _dir) = open_store();
    let queue = spawn_queue(store.clone());
    let manager = sw_manager::ImageManager::new(store.clone(), queue);

    let healthy = Arc::new(FakeRuntimeWatcher::new());
    healthy.set_events(vec![event("sha256:aaa", "prod")]);
    manager
        .on_container_seen(event("sha256:aaa", "prod"), Utc::now())
        .await;

    let failing = Arc::new(FakeRuntimeWatcher::new());
    failing.fail_next_snapshot();

    let job = RefreshImagesJob::new(vec![healthy, failing], manager);
    let outcome = job.run(CancellationToken::new()).await;

    assert!(outcome.is_err(), "a watcher snapshot failure must fail the tick");
    let instances = store.list_instances_for(&Digest::new("sha256:aaa")).unwrap();
    assert_eq!(instances.len(), 1, "surviving instances must not be wiped by the aborted tick");
}
