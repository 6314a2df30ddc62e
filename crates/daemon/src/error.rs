use sw_core::{ErrorKind, HasErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("invalid configuration: {0}")]
    Config(&'static str),
    #[error(transparent)]
    Store(#[from] sw_store::StoreError),
    #[error(transparent)]
    Watch(#[from] sw_watch::WatchError),
}

impl HasErrorKind for DaemonError {
    fn kind(&self) -> ErrorKind {
        match self {
            DaemonError::Config(_) => ErrorKind::ConfigInvalid,
            DaemonError::Store(e) => e.kind(),
            DaemonError::Watch(e) => e.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DaemonError>;
