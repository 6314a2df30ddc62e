use sw_core::{ErrorKind, HasErrorKind};

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error(transparent)]
    Store(#[from] sw_store::StoreError),
}

impl HasErrorKind for QueueError {
    fn kind(&self) -> ErrorKind {
        match self {
            QueueError::Store(e) => e.kind(),
        }
    }
}

pub type Result<T> = std::result::Result<T, QueueError>;
