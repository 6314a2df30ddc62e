//! The Scheduler (spec §4.5): drives periodic jobs with per-job timeout and
//! an overlap guard, recording execution history on the Store.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use sw_core::Clock;
use sw_store::Store;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{Result, SchedulerError};
use crate::job::{outcome, JobConfig, ScheduledJob};

fn now_utc<C: Clock>(clock: &C) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(clock.epoch_ms() as i64).single().unwrap_or_else(Utc::now)
}

fn chrono_interval(interval: std::time::Duration) -> chrono::Duration {
    chrono::Duration::from_std(interval).unwrap_or_else(|_| chrono::Duration::zero())
}

struct RegisteredJob {
    job: Arc<dyn ScheduledJob>,
    config: JobConfig,
    running: AtomicBool,
    next_run: Mutex<DateTime<Utc>>,
}

/// Handle to the set of registered jobs and their ticking tasks. Generic
/// over the clock so tests can drive execution-history timestamps with
/// [`sw_core::FakeClock`]; `Clock`'s `Clone` supertrait makes it
/// non-object-safe, so (as in `sw-queue`) this is a type parameter rather
/// than a trait object.
pub struct Scheduler<C: Clock> {
    store: Arc<Store>,
    clock: C,
    jobs: Mutex<HashMap<String, Arc<RegisteredJob>>>,
    cancellation: Mutex<Option<CancellationToken>>,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<C: Clock + 'static> Scheduler<C> {
    pub fn new(store: Arc<Store>, clock: C) -> Arc<Self> {
        Arc::new(Self {
            store,
            clock,
            jobs: Mutex::new(HashMap::new()),
            cancellation: Mutex::new(None),
            handles: Mutex::new(Vec::new()),
        })
    }

    /// Registers a job. Jobs added after `start()` has already run do not
    /// get a ticking task until `start()` is called again.
    pub fn add_job(&self, job: Arc<dyn ScheduledJob>, config: JobConfig) {
        let name = job.name().to_string();
        let next_run = now_utc(&self.clock) + chrono_interval(config.interval);
        let registered = Arc::new(RegisteredJob { job, config, running: AtomicBool::new(false), next_run: Mutex::new(next_run) });
        self.jobs.lock().insert(name, registered);
    }

    /// Begins ticking every enabled registered job. Each job gets its own
    /// background task sleeping for its configured interval between runs.
    pub fn start(self: &Arc<Self>, cancellation: CancellationToken) {
        *self.cancellation.lock() = Some(cancellation.clone());
        let registered: Vec<Arc<RegisteredJob>> =
            self.jobs.lock().values().filter(|j| j.config.enabled).cloned().collect();

        let mut handles = self.handles.lock();
        for job in registered {
            let scheduler = self.clone();
            let cancellation = cancellation.clone();
            handles.push(tokio::spawn(async move {
                scheduler.job_loop(job, cancellation).await;
            }));
        }
    }

    /// Forces an immediate run of the named job, subject to the same
    /// overlap guard as a normal tick.
    pub async fn run_job_now(&self, name: &str) -> Result<()> {
        let registered =
            self.jobs.lock().get(name).cloned().ok_or_else(|| SchedulerError::UnknownJob(name.to_string()))?;
        let cancellation = self.cancellation.lock().clone().unwrap_or_default();
        self.execute_job(&registered, cancellation).await;
        Ok(())
    }

    /// The next scheduled wall-clock time for a job, if registered.
    pub fn next_run(&self, name: &str) -> Option<DateTime<Utc>> {
        self.jobs.lock().get(name).map(|j| *j.next_run.lock())
    }

    /// Cancels ticking and waits for every spawned job task to return.
    /// A job already executing is allowed to run to completion (bounded by
    /// its own timeout) before its task observes cancellation and exits.
    pub async fn shutdown(&self) {
        if let Some(token) = self.cancellation.lock().clone() {
            token.cancel();
        }
        let handles: Vec<_> = self.handles.lock().drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
    }

    async fn job_loop(&self, registered: Arc<RegisteredJob>, cancellation: CancellationToken) {
        loop {
            tokio::select! {
                _ = cancellation.cancelled() => break,
                _ = tokio::time::sleep(registered.config.interval) => {}
            }
            if cancellation.is_cancelled() {
                break;
            }
            self.execute_job(&registered, cancellation.clone()).await;
        }
    }

    async fn execute_job(&self, registered: &RegisteredJob, cancellation: CancellationToken) {
        if registered.running.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
            let now = now_utc(&self.clock);
            if let Ok(run_id) = self.store.record_job_run_started(registered.job.name(), now) {
                let _ = self.store.record_job_run_finished(run_id, now, outcome::CONCURRENT_SKIP, None);
            }
            return;
        }

        let started_at = now_utc(&self.clock);
        let run_id = match self.store.record_job_run_started(registered.job.name(), started_at) {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(job = registered.job.name(), error = %e, "failed to record job run start");
                registered.running.store(false, Ordering::SeqCst);
                return;
            }
        };

        let (outcome, error) = match tokio::time::timeout(registered.config.timeout, registered.job.run(cancellation)).await
        {
            Ok(Ok(())) => (outcome::SUCCESS, None),
            Ok(Err(message)) => {
                tracing::warn!(job = registered.job.name(), %message, "scheduled job failed");
                (outcome::FAILED, Some(message))
            }
            Err(_) => {
                tracing::warn!(job = registered.job.name(), "scheduled job timed out");
                (outcome::TIMED_OUT, None)
            }
        };

        let finished_at = now_utc(&self.clock);
        if let Err(e) = self.store.record_job_run_finished(run_id, finished_at, outcome, error.as_deref()) {
            tracing::error!(job = registered.job.name(), error = %e, "failed to record job run finish");
        }
        *registered.next_run.lock() = finished_at + chrono_interval(registered.config.interval);
        registered.running.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
