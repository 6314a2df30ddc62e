use sw_core::{ErrorKind, HasErrorKind, SbomProductionFailure};

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("SBOM production failed: {0}")]
    Sbom(SbomProductionFailure),

    #[error("vulnerability match failed: {0}")]
    VulnMatch(String),
}

impl HasErrorKind for ProviderError {
    fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::Sbom(failure) => ErrorKind::SbomProductionFailed(*failure),
            ProviderError::VulnMatch(_) => ErrorKind::VulnMatchFailed,
        }
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;
