use sw_core::{ErrorKind, HasErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("no job registered with name {0:?}")]
    UnknownJob(String),
    #[error(transparent)]
    Store(#[from] sw_store::StoreError),
}

impl HasErrorKind for SchedulerError {
    fn kind(&self) -> ErrorKind {
        match self {
            SchedulerError::UnknownJob(_) => ErrorKind::ValidationRejected,
            SchedulerError::Store(e) => e.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
