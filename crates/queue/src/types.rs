use std::time::Duration;

use sw_core::{Digest, RuntimeKind};

/// A unit of work for the worker: produce an SBOM, then match vulnerabilities,
/// for one image digest.
#[derive(Debug, Clone)]
pub struct ScanJob {
    pub digest: Digest,
    pub reference: String,
    pub node: Option<String>,
    pub runtime_kind: RuntimeKind,
    /// Bypasses the "already completed / already in-pipeline" admission check.
    pub force: bool,
}

/// What happens to a submitted job when the queue is at `max_depth`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FullBehavior {
    /// Discard the job and increment a counter.
    Drop,
    /// Suspend the caller until space frees up or the queue shuts down.
    BlockBounded,
}

#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// 0 means unbounded.
    pub max_depth: usize,
    pub full_behavior: FullBehavior,
    pub sbom_timeout: Duration,
    pub vuln_timeout: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_depth: 0,
            full_behavior: FullBehavior::Drop,
            sbom_timeout: Duration::from_secs(5 * 60),
            vuln_timeout: Duration::from_secs(5 * 60),
        }
    }
}

/// Result of a single `submit` call, for callers (the Image Manager, the
/// Scheduler's rescan job) that want to log or count outcomes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Enqueued,
    /// Status was already `completed` or in-pipeline and `force` was false.
    DroppedDuplicate,
    /// `max_depth` reached with `FullBehavior::Drop`.
    DroppedFull,
}
