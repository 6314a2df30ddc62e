use sw_core::{ErrorKind, HasErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to open store at {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: rusqlite::Error,
    },

    #[error("failed to acquire a pooled connection: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("migration {version} ({name}) failed: {source}")]
    Migration {
        version: i64,
        name: &'static str,
        #[source]
        source: rusqlite::Error,
    },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("malformed JSON artifact: {0}")]
    Json(#[from] serde_json::Error),

    #[error("query rejected: {0}")]
    ValidationRejected(String),

    #[error("unknown scan status in storage: {0}")]
    UnknownStatus(#[from] sw_core::UnknownScanStatus),
}

impl HasErrorKind for StoreError {
    fn kind(&self) -> ErrorKind {
        match self {
            StoreError::Open { .. } | StoreError::Pool(_) | StoreError::Sqlite(_) => {
                ErrorKind::StorageUnavailable
            }
            StoreError::Migration { .. } => ErrorKind::MigrationFailure,
            StoreError::Json(_) | StoreError::UnknownStatus(_) => ErrorKind::StorageUnavailable,
            StoreError::ValidationRejected(_) => ErrorKind::ValidationRejected,
        }
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
