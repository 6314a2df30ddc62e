//! Shared error-kind taxonomy (spec §7).
//!
//! Each crate owns its own `thiserror` enum for its own boundary
//! (`StoreError`, `QueueError`, `WatchError`, `ProviderError`,
//! `SchedulerError`); this module is the small, shared vocabulary those
//! enums map into via [`HasErrorKind`], so the worker and the (external)
//! HTTP layer can dispatch on kind without matching every crate's enum.

/// Subkind of a failed SBOM Producer call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SbomProductionFailure {
    /// The image is not present in local runtime storage; a registry pull
    /// would be required, which Producers must never perform.
    NotLocal,
    Timeout,
    /// The Producer returned something that didn't parse as SBOM-JSON.
    Malformed,
    /// Any other Producer-side failure not otherwise categorized.
    Internal,
}

crate::simple_display! {
    SbomProductionFailure {
        NotLocal => "image not present in local runtime storage",
        Timeout => "SBOM production timed out",
        Malformed => "SBOM producer returned malformed output",
        Internal => "SBOM producer failed internally",
    }
}

/// The taxonomy of error kinds named in spec §7. Kinds, not type names:
/// every crate's own error enum exposes one of these via [`HasErrorKind`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Surfaced at startup, fatal.
    ConfigInvalid,
    /// Fatal at startup; at runtime, retried by callers with backoff and
    /// reported via readiness.
    StorageUnavailable,
    /// Fatal; schema left at the last successfully applied version.
    MigrationFailure,
    /// The watcher logs and enters its reconnect loop; does not abort the process.
    RuntimeUnavailable,
    /// Recorded on the image as `sbom_unavailable`; not retried automatically.
    SbomProductionFailed(SbomProductionFailure),
    /// Recorded as `vuln_scan_failed`; retried on the next vuln-DB refresh.
    VulnMatchFailed,
    /// Admission returns immediately; a counter is incremented; the job is not persisted.
    QueueFull,
    /// Debug SQL or a bad path component; a 400-class response; never mutates state.
    ValidationRejected,
}

crate::simple_display! {
    ErrorKind {
        ConfigInvalid => "invalid configuration",
        StorageUnavailable => "storage unavailable",
        MigrationFailure => "schema migration failed",
        RuntimeUnavailable => "container runtime unavailable",
        SbomProductionFailed(_) => "SBOM production failed",
        VulnMatchFailed => "vulnerability match failed",
        QueueFull => "scan queue full",
        ValidationRejected => "request rejected by validation",
    }
}

/// Implemented by each crate's own error enum to expose which shared kind it maps to.
pub trait HasErrorKind {
    fn kind(&self) -> ErrorKind;
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
