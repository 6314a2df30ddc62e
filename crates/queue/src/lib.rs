#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! sw-queue: the Scan Job Queue (spec §4.3) — a de-duplicating, single-worker
//! pipeline serializing SBOM production and vulnerability matching across
//! every discovered image digest.

mod error;
mod queue;
mod sbom_meta;
mod types;

pub use error::{QueueError, Result};
pub use queue::ScanQueue;
pub use types::{FullBehavior, QueueConfig, ScanJob, SubmitOutcome};
