#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! sw-store: the embedded relational persistence layer (spec §4.4).
//!
//! Everything here is synchronous and blocking by design — a single
//! [`parking_lot::Mutex`]-guarded writer connection serializes every
//! mutation, matching SQLite's own single-writer model, while a pooled set
//! of reader connections serves list/get queries without contending with
//! writes. Every operation is a short local-disk transaction, so async
//! callers (`sw-queue`, `sw-manager`, `sw-scheduler`, `sw-daemon`) call
//! through directly rather than via `spawn_blocking`; none of them run more
//! than one Store call concurrently per task.

mod error;
mod migrations;
mod projection;
mod sql_guard;
mod store;
mod types;

pub use error::{Result, StoreError};
pub use migrations::TARGET_VERSION;
pub use store::Store;
pub use types::{
    DebugQueryResult, ImageFilter, JobRun, LastUpdatedKind, PageResult, Pagination, SortOrder,
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
