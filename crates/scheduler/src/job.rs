//! The `ScheduledJob` boundary and per-job configuration (spec §4.5).

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Outcome labels recorded in `scheduler_job_runs.outcome`.
pub mod outcome {
    pub const SUCCESS: &str = "success";
    pub const CONCURRENT_SKIP: &str = "concurrent_skip";
    pub const FAILED: &str = "failed";
    pub const TIMED_OUT: &str = "timed_out";
}

/// A unit of periodic work the Scheduler drives. Implementations should
/// observe `cancellation` at safe points so a shutdown mid-run can abort
/// promptly rather than running to the full per-job timeout.
#[async_trait]
pub trait ScheduledJob: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn run(&self, cancellation: CancellationToken) -> std::result::Result<(), String>;
}

/// Per-job schedule and guard configuration.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub enabled: bool,
    pub interval: Duration,
    pub timeout: Duration,
}

impl JobConfig {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { enabled: true, interval, timeout }
    }
}

/// Defaults named in spec §9: 30 min rescan, 10 min refresh, 1 h cleanup.
impl JobConfig {
    pub fn default_rescan() -> Self {
        Self::new(Duration::from_secs(30 * 60), Duration::from_secs(30 * 60))
    }

    pub fn default_refresh() -> Self {
        Self::new(Duration::from_secs(10 * 60), Duration::from_secs(10 * 60))
    }

    pub fn default_cleanup() -> Self {
        Self::new(Duration::from_secs(60 * 60), Duration::from_secs(60 * 60))
    }
}
