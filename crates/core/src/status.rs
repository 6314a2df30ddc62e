//! The unified scan status state machine (spec §4.3).
//!
//! The persisted status column is the sole concurrency primitive for
//! de-duplicating scans: there is no in-memory in-flight set anywhere in
//! this workspace. A worker acquires a digest by CAS-ing its status out of
//! a non-active state into `generating_sbom`; a process killed mid-scan
//! simply leaves a stale active row for the startup sweep to demote.

use std::str::FromStr;

/// Per-image scan lifecycle label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanStatus {
    Pending,
    GeneratingSbom,
    ScanningVulnerabilities,
    Completed,
    SbomUnavailable,
    VulnScanFailed,
}

crate::simple_display! {
    ScanStatus {
        Pending => "pending",
        GeneratingSbom => "generating_sbom",
        ScanningVulnerabilities => "scanning_vulnerabilities",
        Completed => "completed",
        SbomUnavailable => "sbom_unavailable",
        VulnScanFailed => "vuln_scan_failed",
    }
}

/// Error returned when parsing an unrecognized status string from storage.
#[derive(Debug, thiserror::Error)]
#[error("unrecognized scan status: {0:?}")]
pub struct UnknownScanStatus(pub String);

impl FromStr for ScanStatus {
    type Err = UnknownScanStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "pending" => Self::Pending,
            "generating_sbom" => Self::GeneratingSbom,
            "scanning_vulnerabilities" => Self::ScanningVulnerabilities,
            "completed" => Self::Completed,
            "sbom_unavailable" => Self::SbomUnavailable,
            "vuln_scan_failed" => Self::VulnScanFailed,
            other => return Err(UnknownScanStatus(other.to_string())),
        })
    }
}

impl ScanStatus {
    /// All variants, in declaration order — used to seed the scan-status lookup table.
    pub const ALL: [ScanStatus; 6] = [
        ScanStatus::Pending,
        ScanStatus::GeneratingSbom,
        ScanStatus::ScanningVulnerabilities,
        ScanStatus::Completed,
        ScanStatus::SbomUnavailable,
        ScanStatus::VulnScanFailed,
    ];

    /// Total ordering used by UI-facing list queries (images sort by this first).
    /// Failing and in-progress images surface before healthy ones; `completed` sorts last.
    pub fn sort_order(self) -> i32 {
        match self {
            ScanStatus::VulnScanFailed => 0,
            ScanStatus::SbomUnavailable => 1,
            ScanStatus::GeneratingSbom => 2,
            ScanStatus::ScanningVulnerabilities => 3,
            ScanStatus::Pending => 4,
            ScanStatus::Completed => 5,
        }
    }

    /// `generating_sbom` or `scanning_vulnerabilities` — the worker holds the image.
    pub fn is_in_pipeline(self) -> bool {
        matches!(self, ScanStatus::GeneratingSbom | ScanStatus::ScanningVulnerabilities)
    }

    /// `completed`, `sbom_unavailable`, or `vuln_scan_failed` — only exited by
    /// an explicit re-enqueue (force, or a vuln-DB refresh).
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ScanStatus::Completed | ScanStatus::SbomUnavailable | ScanStatus::VulnScanFailed
        )
    }

    /// Whether a non-`force` enqueue for a digest currently at this status is a no-op.
    pub fn blocks_admission(self, force: bool) -> bool {
        if force {
            return false;
        }
        self.is_in_pipeline() || self == ScanStatus::Completed
    }

    /// Whether a CAS acquire into `generating_sbom` may start from this status.
    pub fn is_acquirable(self) -> bool {
        !self.is_in_pipeline()
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
