//! Parses opaque SBOM/vuln-report JSON blobs into relational rows.
//!
//! Both parsers are resilient to unknown fields: anything that doesn't match
//! the shape we project is skipped rather than failing the whole document,
//! and the full original JSON value for every item is preserved verbatim in
//! the `_details` tables so no information is lost, only de-normalized
//! twice (spec.md Open Question on vulnerability JSON fidelity).

use indexmap::IndexMap;
use rusqlite::{params, Transaction};

use crate::error::Result;

#[derive(Debug, serde::Deserialize, Default)]
struct SbomDocument {
    #[serde(default)]
    artifacts: Vec<serde_json::Value>,
}

#[derive(Debug, serde::Deserialize)]
struct SbomArtifactShape {
    name: String,
    version: String,
    #[serde(rename = "type")]
    package_type: String,
}

/// Delete-then-insert reprojection of `packages`/`package_details` for `digest`.
/// Idempotent: `reproject_packages(tx, d, B)` run twice leaves the same rows as once.
pub fn reproject_packages(tx: &Transaction, digest: &str, sbom_json: &str) -> Result<()> {
    tx.execute("DELETE FROM packages WHERE image_digest = ?1", [digest])?;

    let doc: SbomDocument = serde_json::from_str(sbom_json)?;
    let mut groups: IndexMap<(String, String, String), Vec<serde_json::Value>> = IndexMap::new();
    for raw in doc.artifacts {
        let Ok(shape) = serde_json::from_value::<SbomArtifactShape>(raw.clone()) else {
            tracing::warn!("skipping SBOM artifact with unrecognized shape");
            continue;
        };
        groups
            .entry((shape.name, shape.version, shape.package_type))
            .or_default()
            .push(raw);
    }

    for ((name, version, package_type), items) in groups {
        tx.execute(
            "INSERT INTO packages (image_digest, name, version, type, number_of_instances)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![digest, name, version, package_type, items.len() as i64],
        )?;
        let package_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO package_details (package_id, details_json) VALUES (?1, ?2)",
            params![package_id, serde_json::to_string(&items)?],
        )?;
    }
    Ok(())
}

#[derive(Debug, serde::Deserialize, Default)]
struct VulnDocument {
    #[serde(default)]
    matches: Vec<serde_json::Value>,
}

#[derive(Debug, serde::Deserialize)]
struct VulnMatchShape {
    vulnerability: VulnShape,
    artifact: SbomArtifactShape,
}

#[derive(Debug, serde::Deserialize, Default)]
struct VulnShape {
    id: String,
    #[serde(default)]
    severity: Option<String>,
    #[serde(default)]
    fix_state: Option<String>,
    #[serde(default)]
    fixed_version: Option<String>,
    #[serde(default)]
    risk_score: Option<f64>,
    #[serde(default)]
    epss_score: Option<f64>,
    #[serde(default)]
    epss_percentile: Option<f64>,
    #[serde(default)]
    known_exploited: Option<bool>,
}

/// Delete-then-insert reprojection of `vulnerabilities`/`vulnerability_details` for `digest`.
pub fn reproject_vulnerabilities(tx: &Transaction, digest: &str, vuln_json: &str) -> Result<()> {
    tx.execute("DELETE FROM vulnerabilities WHERE image_digest = ?1", [digest])?;

    let doc: VulnDocument = serde_json::from_str(vuln_json)?;
    type Key = (String, String, String, String);
    let mut groups: IndexMap<Key, (VulnShape, Vec<serde_json::Value>)> = IndexMap::new();
    for raw in doc.matches {
        let Ok(shape) = serde_json::from_value::<VulnMatchShape>(raw.clone()) else {
            tracing::warn!("skipping vulnerability match with unrecognized shape");
            continue;
        };
        let key = (
            shape.vulnerability.id.clone(),
            shape.artifact.name.clone(),
            shape.artifact.version.clone(),
            shape.artifact.package_type.clone(),
        );
        groups
            .entry(key)
            .or_insert_with(|| (shape.vulnerability, Vec::new()))
            .1
            .push(raw);
    }

    for ((cve_id, package_name, package_version, package_type), (vuln, items)) in groups {
        let severity = vuln
            .severity
            .as_deref()
            .unwrap_or("Unknown")
            .parse::<sw_core::Severity>()
            .unwrap_or(sw_core::Severity::Unknown);
        tx.execute(
            "INSERT INTO vulnerabilities (
                image_digest, cve_id, package_name, package_version, package_type,
                severity, fix_state, fixed_version, count, risk_score,
                epss_score, epss_percentile, known_exploited
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                digest,
                cve_id,
                package_name,
                package_version,
                package_type,
                severity.to_string(),
                vuln.fix_state.unwrap_or_else(|| "unknown".to_string()),
                vuln.fixed_version,
                items.len() as i64,
                vuln.risk_score,
                vuln.epss_score,
                vuln.epss_percentile,
                vuln.known_exploited.unwrap_or(false) as i64,
            ],
        )?;
        let vulnerability_id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO vulnerability_details (vulnerability_id, details_json) VALUES (?1, ?2)",
            params![vulnerability_id, serde_json::to_string(&items)?],
        )?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "projection_tests.rs"]
mod tests;
