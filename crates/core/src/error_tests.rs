use super::*;

#[derive(Debug, thiserror::Error)]
#[error("boom")]
struct FakeStoreError;

impl HasErrorKind for FakeStoreError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::StorageUnavailable
    }
}

#[test]
fn crate_errors_map_into_the_shared_kind_vocabulary() {
    let err = FakeStoreError;
    assert_eq!(err.kind(), ErrorKind::StorageUnavailable);
}

#[test]
fn sbom_production_failure_display_text() {
    assert_eq!(SbomProductionFailure::NotLocal.to_string(), "image not present in local runtime storage");
    assert_eq!(SbomProductionFailure::Timeout.to_string(), "SBOM production timed out");
}

#[test]
fn error_kind_display_covers_all_variants() {
    let kinds = [
        ErrorKind::ConfigInvalid,
        ErrorKind::StorageUnavailable,
        ErrorKind::MigrationFailure,
        ErrorKind::RuntimeUnavailable,
        ErrorKind::SbomProductionFailed(SbomProductionFailure::Malformed),
        ErrorKind::VulnMatchFailed,
        ErrorKind::QueueFull,
        ErrorKind::ValidationRejected,
    ];
    for kind in kinds {
        assert!(!kind.to_string().is_empty());
    }
}
