//! The Scan Job Queue (spec §4.3): a de-duplicating, single-worker pipeline
//! serializing the two-stage SBOM+vuln scan across all discovered images.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use sw_core::{Clock, Digest, ScanStatus};
use sw_providers::{ProduceContext, SbomProducer, VulnMatcher};
use sw_store::Store;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::sbom_meta::extract_os_fields;
use crate::types::{FullBehavior, QueueConfig, ScanJob, SubmitOutcome};

fn now_utc<C: Clock>(clock: &C) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(clock.epoch_ms() as i64).single().unwrap_or_else(Utc::now)
}

enum JobSender {
    Bounded(mpsc::Sender<ScanJob>),
    Unbounded(mpsc::UnboundedSender<ScanJob>),
}

enum JobReceiver {
    Bounded(mpsc::Receiver<ScanJob>),
    Unbounded(mpsc::UnboundedReceiver<ScanJob>),
}

/// Handle to the running queue: `submit` is the only way work enters it; the
/// worker itself runs as a detached background task until `shutdown`.
pub struct ScanQueue {
    store: Arc<Store>,
    config: QueueConfig,
    sender: JobSender,
    depth: Arc<AtomicUsize>,
    current_digest: Arc<parking_lot::Mutex<Option<Digest>>>,
    dropped_full: Arc<AtomicU64>,
    cancellation: CancellationToken,
    worker: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl ScanQueue {
    /// Generic over the clock so tests can drive it with [`sw_core::FakeClock`];
    /// `Clock`'s `Clone` supertrait makes it non-object-safe, so this takes a
    /// concrete type parameter instead of a trait object like the SBOM/vuln
    /// adapters do.
    pub fn spawn<C: Clock + 'static>(
        store: Arc<Store>,
        producer: Arc<dyn SbomProducer>,
        matcher: Arc<dyn VulnMatcher>,
        clock: C,
        config: QueueConfig,
    ) -> Arc<Self> {
        let (sender, receiver) = if config.max_depth == 0 {
            let (tx, rx) = mpsc::unbounded_channel();
            (JobSender::Unbounded(tx), JobReceiver::Unbounded(rx))
        } else {
            let (tx, rx) = mpsc::channel(config.max_depth);
            (JobSender::Bounded(tx), JobReceiver::Bounded(rx))
        };

        let depth = Arc::new(AtomicUsize::new(0));
        let current_digest = Arc::new(parking_lot::Mutex::new(None));
        let dropped_full = Arc::new(AtomicU64::new(0));
        let cancellation = CancellationToken::new();

        let queue = Arc::new(Self {
            store: store.clone(),
            config,
            sender,
            depth: depth.clone(),
            current_digest: current_digest.clone(),
            dropped_full,
            cancellation: cancellation.clone(),
            worker: parking_lot::Mutex::new(None),
        });

        let handle = tokio::spawn(run_worker(
            receiver,
            store,
            producer,
            matcher,
            clock,
            queue.config.clone(),
            depth,
            current_digest,
            cancellation,
        ));
        *queue.worker.lock() = Some(handle);
        queue
    }

    /// Admission: drops silently if a non-`force` job targets a digest that
    /// is already `completed` or in-pipeline; otherwise pushes according to
    /// `QueueConfig::full_behavior`.
    pub async fn submit(&self, job: ScanJob) -> crate::error::Result<SubmitOutcome> {
        if !job.force {
            if let Some(status) = self.store.get_image_status(&job.digest)? {
                if status.blocks_admission(false) {
                    return Ok(SubmitOutcome::DroppedDuplicate);
                }
            }
        }

        match &self.sender {
            JobSender::Unbounded(tx) => {
                if tx.send(job).is_err() {
                    self.dropped_full.fetch_add(1, Ordering::SeqCst);
                    return Ok(SubmitOutcome::DroppedFull);
                }
                self.depth.fetch_add(1, Ordering::SeqCst);
                Ok(SubmitOutcome::Enqueued)
            }
            JobSender::Bounded(tx) => match self.config.full_behavior {
                FullBehavior::Drop => match tx.try_send(job) {
                    Ok(()) => {
                        self.depth.fetch_add(1, Ordering::SeqCst);
                        Ok(SubmitOutcome::Enqueued)
                    }
                    Err(_) => {
                        self.dropped_full.fetch_add(1, Ordering::SeqCst);
                        Ok(SubmitOutcome::DroppedFull)
                    }
                },
                FullBehavior::BlockBounded => {
                    if tx.send(job).await.is_err() {
                        self.dropped_full.fetch_add(1, Ordering::SeqCst);
                        return Ok(SubmitOutcome::DroppedFull);
                    }
                    self.depth.fetch_add(1, Ordering::SeqCst);
                    Ok(SubmitOutcome::Enqueued)
                }
            },
        }
    }

    /// Number of jobs queued but not yet picked up by the worker.
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    /// The digest the worker is presently scanning, if any.
    pub fn currently_processing(&self) -> Option<Digest> {
        self.current_digest.lock().clone()
    }

    /// Total admissions dropped for being full (spec §4.3/§7), since this
    /// queue was spawned.
    pub fn dropped_full_count(&self) -> u64 {
        self.dropped_full.load(Ordering::SeqCst)
    }

    /// Cancels in-flight work and stops accepting further jobs; waits for
    /// the worker to return before resolving, per the drain contract (spec §9).
    pub async fn shutdown(&self) {
        self.cancellation.cancel();
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_worker<C: Clock>(
    mut receiver: JobReceiver,
    store: Arc<Store>,
    producer: Arc<dyn SbomProducer>,
    matcher: Arc<dyn VulnMatcher>,
    clock: C,
    config: QueueConfig,
    depth: Arc<AtomicUsize>,
    current_digest: Arc<parking_lot::Mutex<Option<Digest>>>,
    cancellation: CancellationToken,
) {
    loop {
        let job = tokio::select! {
            biased;
            _ = cancellation.cancelled() => break,
            job = recv(&mut receiver) => match job {
                Some(job) => job,
                None => break,
            },
        };
        depth.fetch_sub(1, Ordering::SeqCst);
        *current_digest.lock() = Some(job.digest.clone());

        process_job(&store, producer.as_ref(), matcher.as_ref(), &clock, &config, &cancellation, job).await;

        *current_digest.lock() = None;
    }
}

async fn recv(receiver: &mut JobReceiver) -> Option<ScanJob> {
    match receiver {
        JobReceiver::Bounded(rx) => rx.recv().await,
        JobReceiver::Unbounded(rx) => rx.recv().await,
    }
}

async fn process_job<C: Clock>(
    store: &Store,
    producer: &dyn SbomProducer,
    matcher: &dyn VulnMatcher,
    clock: &C,
    config: &QueueConfig,
    cancellation: &CancellationToken,
    job: ScanJob,
) {
    let digest = &job.digest;

    match store.try_acquire_for_scan(digest, now_utc(clock)) {
        Ok(true) => {}
        Ok(false) => {
            tracing::debug!(%digest, "scan not acquired, another worker or state change won");
            return;
        }
        Err(e) => {
            tracing::error!(%digest, error = %e, "failed to acquire scan slot");
            return;
        }
    }

    let ctx = ProduceContext {
        digest: digest.clone(),
        reference: job.reference.clone(),
        node: job.node.clone(),
        runtime_kind: job.runtime_kind.clone(),
    };

    let sbom_json = match tokio::time::timeout(config.sbom_timeout, producer.produce(&ctx, cancellation.clone())).await
    {
        Ok(Ok(sbom)) => sbom,
        Ok(Err(e)) => {
            fail_job(store, digest, ScanStatus::GeneratingSbom, ScanStatus::SbomUnavailable, &e.to_string(), clock);
            return;
        }
        Err(_) => {
            fail_job(
                store,
                digest,
                ScanStatus::GeneratingSbom,
                ScanStatus::SbomUnavailable,
                "SBOM production timed out",
                clock,
            );
            return;
        }
    };

    let (os_name, os_version) = extract_os_fields(&sbom_json);
    if let Err(e) = store.store_sbom(digest, &sbom_json, os_name.as_deref(), os_version.as_deref(), now_utc(clock)) {
        tracing::error!(%digest, error = %e, "failed to store SBOM");
        return;
    }

    let vuln_json =
        match tokio::time::timeout(config.vuln_timeout, matcher.match_vulnerabilities(&sbom_json, cancellation.clone()))
            .await
        {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                fail_job(
                    store,
                    digest,
                    ScanStatus::ScanningVulnerabilities,
                    ScanStatus::VulnScanFailed,
                    &e.to_string(),
                    clock,
                );
                return;
            }
            Err(_) => {
                fail_job(
                    store,
                    digest,
                    ScanStatus::ScanningVulnerabilities,
                    ScanStatus::VulnScanFailed,
                    "vulnerability match timed out",
                    clock,
                );
                return;
            }
        };

    let db_built = match matcher.ensure_database().await {
        Ok(info) => info.built_at,
        Err(_) => now_utc(clock),
    };

    if let Err(e) = store.store_vulnerabilities(digest, &vuln_json, db_built, now_utc(clock)) {
        tracing::error!(%digest, error = %e, "failed to store vulnerability report");
    }
}

fn fail_job<C: Clock>(
    store: &Store,
    digest: &Digest,
    expected: ScanStatus,
    new_status: ScanStatus,
    message: &str,
    clock: &C,
) {
    tracing::warn!(%digest, %message, "scan job failed");
    if let Err(e) = store.compare_and_set_status(digest, expected, new_status, Some(message), now_utc(clock)) {
        tracing::error!(%digest, error = %e, "failed to record job failure status");
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
