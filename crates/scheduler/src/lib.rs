#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! sw-scheduler: the interval Scheduler (spec §4.5) and its three core
//! jobs — RescanDatabase, RefreshImages, Cleanup.

mod error;
mod job;
mod jobs;
mod scheduler;

pub use error::{Result, SchedulerError};
pub use job::{outcome, JobConfig, ScheduledJob};
pub use jobs::{CleanupJob, RefreshImagesJob, RescanDatabaseJob, DEFAULT_RETENTION_HOURS};
pub use scheduler::Scheduler;
