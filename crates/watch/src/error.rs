use sw_core::{ErrorKind, HasErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("container runtime unreachable: {0}")]
    RuntimeUnavailable(String),
    #[error("watcher misconfigured: {0}")]
    Misconfigured(String),
}

impl HasErrorKind for WatchError {
    fn kind(&self) -> ErrorKind {
        match self {
            WatchError::RuntimeUnavailable(_) => ErrorKind::RuntimeUnavailable,
            WatchError::Misconfigured(_) => ErrorKind::RuntimeUnavailable,
        }
    }
}

pub type Result<T> = std::result::Result<T, WatchError>;
