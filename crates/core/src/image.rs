//! The `Image` entity (spec §3): the unit the whole pipeline scans.
//!
//! Identity is the content [`Digest`] alone; repository/tag are decoration
//! carried only on [`crate::container_instance::ContainerInstance`] rows.

use chrono::{DateTime, Utc};

use crate::digest::Digest;
use crate::status::ScanStatus;

/// A distinct image content digest and everything the pipeline has learned about it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Image {
    pub digest: Digest,
    pub status: ScanStatus,
    /// Set when `status` is `sbom_unavailable` or `vuln_scan_failed`; cleared on re-enqueue.
    pub status_error: Option<String>,
    /// Opaque SBOM artifact, stored verbatim as returned by the Producer.
    pub sbom_json: Option<String>,
    /// Opaque vulnerability report, stored verbatim as returned by the Matcher.
    pub vulnerabilities_json: Option<String>,
    pub sbom_scanned_at: Option<DateTime<Utc>>,
    pub vulns_scanned_at: Option<DateTime<Utc>>,
    /// Derived from the SBOM's base-OS artifact, if present.
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    /// The vuln-DB build timestamp in effect the last time this image was scanned.
    pub grype_db_built: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Image {
    /// A freshly-discovered image, not yet admitted to the queue.
    pub fn new_pending(digest: Digest, now: DateTime<Utc>) -> Self {
        Self {
            digest,
            status: ScanStatus::Pending,
            status_error: None,
            sbom_json: None,
            vulnerabilities_json: None,
            sbom_scanned_at: None,
            vulns_scanned_at: None,
            os_name: None,
            os_version: None,
            grype_db_built: None,
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
#[path = "image_tests.rs"]
mod tests;
