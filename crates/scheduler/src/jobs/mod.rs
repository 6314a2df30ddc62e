mod cleanup;
mod refresh;
mod rescan;

pub use cleanup::{CleanupJob, DEFAULT_RETENTION_HOURS};
pub use refresh::RefreshImagesJob;
pub use rescan::RescanDatabaseJob;
