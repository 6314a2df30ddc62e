//! The `Vulnerability` entity (spec §3): projected from a vuln-report blob.

use crate::digest::Digest;

/// Severity rank, ordered worst-first to match the sort CASE in spec §6:
/// `Critical < High < Medium < Low < Negligible < Unknown`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Negligible,
    Unknown,
}

crate::simple_display! {
    Severity {
        Critical => "Critical",
        High => "High",
        Medium => "Medium",
        Low => "Low",
        Negligible => "Negligible",
        Unknown => "Unknown",
    }
}

impl Severity {
    /// Numeric rank used by the `ORDER BY` CASE expression in list queries.
    pub fn sort_order(self) -> i32 {
        self as i32
    }
}

impl std::str::FromStr for Severity {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Critical" => Self::Critical,
            "High" => Self::High,
            "Medium" => Self::Medium,
            "Low" => Self::Low,
            "Negligible" => Self::Negligible,
            _ => Self::Unknown,
        })
    }
}

/// A single `(image, cve_id, package_name, package_version, package_type)` row.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Vulnerability {
    /// Store-assigned row id; `vulnerability_details` keys off this.
    pub id: i64,
    pub image_digest: Digest,
    pub cve_id: String,
    pub package_name: String,
    pub package_version: String,
    pub package_type: String,
    pub severity: Severity,
    /// Free-form fix state as reported by the Matcher (e.g. `fixed`, `not-fixed`, `wont-fix`).
    pub fix_state: String,
    pub fixed_version: Option<String>,
    /// Number of matches collapsed into this row.
    pub count: i64,
    pub risk_score: Option<f64>,
    pub epss_score: Option<f64>,
    pub epss_percentile: Option<f64>,
    pub known_exploited: bool,
}

impl Vulnerability {
    pub fn identity_key(&self) -> (&str, &str, &str, &str) {
        (&self.cve_id, &self.package_name, &self.package_version, &self.package_type)
    }
}

#[cfg(test)]
#[path = "vulnerability_tests.rs"]
mod tests;
