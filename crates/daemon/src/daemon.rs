//! Wires the Persistence Store, providers, watchers, Scan Job Queue, Image
//! Manager, and Scheduler into one running process, and owns the startup
//! and shutdown ordering spec §5 specifies.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use sw_core::{SystemClock, WatchEvent};
use sw_manager::ImageManager;
use sw_providers::{GrypeMatcher, SbomProducer, SyftProducer, VulnMatcher};
use sw_queue::{FullBehavior, QueueConfig, ScanQueue};
use sw_scheduler::{CleanupJob, JobConfig, RefreshImagesJob, RescanDatabaseJob, Scheduler};
use sw_store::Store;
use sw_watch::{DockerWatcher, KubernetesWatcher, RuntimeWatcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::DaemonConfig;
use crate::error::Result;
use crate::health::DaemonHealth;

/// A running daemon. Holds every background task handle behind a
/// `parking_lot::Mutex` (the same pattern `Scheduler` uses for its own job
/// tasks) so `shutdown` — which only ever needs `&self` — can drain them
/// exactly once.
pub struct ScanwatchDaemon {
    store: Arc<Store>,
    queue: Arc<ScanQueue>,
    manager: Arc<ImageManager>,
    scheduler: Arc<Scheduler<SystemClock>>,
    health: Arc<DaemonHealth>,
    cancellation: CancellationToken,
    watcher_handles: Mutex<Vec<JoinHandle<()>>>,
    fanin_handle: Mutex<Option<JoinHandle<()>>>,
}

impl ScanwatchDaemon {
    /// Builds the real provider/watcher adapters from `config` and starts
    /// the daemon. Splitting the real-adapter construction from [`Self::assemble`]
    /// mirrors the teacher's own `startup()`/`startup_inner()` split: the
    /// outer layer only decides *which* concrete components to use, the
    /// inner layer wires whatever components it is given.
    pub async fn start(config: DaemonConfig) -> Result<Arc<Self>> {
        let store = Arc::new(Store::open(&config.db_path)?);

        let producer: Arc<dyn SbomProducer> = Arc::new(SyftProducer::new(config.syft_binary.clone(), config.sbom_timeout));
        let matcher: Arc<dyn VulnMatcher> =
            Arc::new(GrypeMatcher::new(config.grype_binary.clone(), config.vuln_db_cache_dir.clone(), config.vuln_timeout));
        let watchers = connect_watchers(&config).await;

        Self::assemble(store, producer, matcher, watchers, &config).await
    }

    /// Runs the startup sweep and wires every component together, whatever
    /// their concrete type. Used by [`Self::start`] with the real adapters
    /// and by tests with `sw-providers`/`sw-watch`'s `fake` stand-ins.
    pub(crate) async fn assemble(
        store: Arc<Store>,
        producer: Arc<dyn SbomProducer>,
        matcher: Arc<dyn VulnMatcher>,
        watchers: Vec<Arc<dyn RuntimeWatcher>>,
        config: &DaemonConfig,
    ) -> Result<Arc<Self>> {
        let demoted = store.demote_stale_scans(Utc::now())?;
        if demoted > 0 {
            tracing::warn!(count = demoted, "startup sweep demoted stale in-flight scans back to pending");
        }

        let queue = ScanQueue::spawn(
            store.clone(),
            producer,
            matcher.clone(),
            SystemClock,
            QueueConfig {
                max_depth: config.queue_max_depth,
                full_behavior: FullBehavior::Drop,
                sbom_timeout: config.sbom_timeout,
                vuln_timeout: config.vuln_timeout,
            },
        );

        let manager = ImageManager::new(store.clone(), queue.clone());
        let health = Arc::new(DaemonHealth::new());
        let cancellation = CancellationToken::new();

        let (fanin_handle, watcher_handles) = spawn_watchers(watchers.clone(), manager.clone(), cancellation.clone());

        let scheduler = Scheduler::new(store.clone(), SystemClock);
        scheduler.add_job(
            Arc::new(RescanDatabaseJob::new(store.clone(), matcher, queue.clone())),
            JobConfig { enabled: config.rescan.enabled, interval: config.rescan.interval, timeout: config.rescan.timeout },
        );
        scheduler.add_job(
            Arc::new(RefreshImagesJob::new(watchers, manager.clone())),
            JobConfig { enabled: config.refresh.enabled, interval: config.refresh.interval, timeout: config.refresh.timeout },
        );
        scheduler.add_job(
            Arc::new(CleanupJob::new(store.clone(), config.cleanup_retention)),
            JobConfig { enabled: config.cleanup.enabled, interval: config.cleanup.interval, timeout: config.cleanup.timeout },
        );
        scheduler.start(cancellation.clone());

        health.set_vuln_db_ready(true);
        tracing::info!("scanwatchd started");

        Ok(Arc::new(Self {
            store,
            queue,
            manager,
            scheduler,
            health,
            cancellation,
            watcher_handles: Mutex::new(watcher_handles),
            fanin_handle: Mutex::new(Some(fanin_handle)),
        }))
    }

    pub fn health(&self) -> &DaemonHealth {
        &self.health
    }

    pub fn manager(&self) -> &Arc<ImageManager> {
        &self.manager
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    /// Cancellation order per spec §5: the root token cancels first, so the
    /// Watcher tasks return and the fan-in loop drains and exits; then the
    /// Scheduler stops ticking (a job already running is allowed to finish
    /// within its own timeout); then the Queue stops accepting new jobs and
    /// waits for whatever it is currently processing; the Store, held by
    /// `Arc` from every component above, is only actually closed once the
    /// last of those `Arc`s — this one included — drops.
    pub async fn shutdown(&self) {
        tracing::info!("scanwatchd shutting down");
        self.cancellation.cancel();

        let handles: Vec<_> = self.watcher_handles.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
        if let Some(handle) = self.fanin_handle.lock().take() {
            let _ = handle.await;
        }

        self.scheduler.shutdown().await;
        self.queue.shutdown().await;
        tracing::info!("scanwatchd shutdown complete");
    }
}

async fn connect_watchers(config: &DaemonConfig) -> Vec<Arc<dyn RuntimeWatcher>> {
    let mut watchers: Vec<Arc<dyn RuntimeWatcher>> = Vec::new();

    if config.watchers.docker {
        match DockerWatcher::connect() {
            Ok(watcher) => watchers.push(Arc::new(watcher)),
            Err(error) => tracing::warn!(%error, "docker runtime unavailable at startup, continuing without it"),
        }
    }
    if config.watchers.kubernetes {
        match KubernetesWatcher::connect().await {
            Ok(watcher) => watchers.push(Arc::new(watcher)),
            Err(error) => tracing::warn!(%error, "kubernetes runtime unavailable at startup, continuing without it"),
        }
    }

    watchers
}

/// One task per watcher pushing into a shared channel, plus one fan-in task
/// applying every `WatchEvent` to the Manager — mirrors spec §5's "one
/// watcher task per container runtime" alongside a single Manager mutex.
fn spawn_watchers(
    watchers: Vec<Arc<dyn RuntimeWatcher>>,
    manager: Arc<ImageManager>,
    cancellation: CancellationToken,
) -> (JoinHandle<()>, Vec<JoinHandle<()>>) {
    let (tx, mut rx) = mpsc::channel(256);

    let watcher_handles = watchers
        .into_iter()
        .map(|watcher| {
            let cancellation = cancellation.clone();
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Err(error) = watcher.watch_containers(cancellation, tx).await {
                    tracing::warn!(%error, "runtime watcher exited");
                }
            })
        })
        .collect();
    drop(tx);

    let fanin_handle = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                WatchEvent::ContainerSeen(event) => manager.on_container_seen(event, Utc::now()).await,
                WatchEvent::Snapshot(events) => manager.on_snapshot(events, Utc::now()).await,
            }
        }
    });

    (fanin_handle, watcher_handles)
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
