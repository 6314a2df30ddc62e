//! The Vulnerability Matcher contract (spec §4.6) and a `grype`-shaped process-exec adapter.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::error::{ProviderError, Result};

/// The vulnerability database's current build state, as reported by the Matcher.
/// The core only ever reads `built_at` to decide whether a mass rescan is due;
/// the database directory itself is owned and written exclusively by the Matcher.
#[derive(Debug, Clone)]
pub struct DbInfo {
    pub built_at: DateTime<Utc>,
    pub schema_version: String,
    pub path: PathBuf,
}

/// Translates an SBOM-JSON document into a vulnerability-report JSON document,
/// and owns the lifecycle of the vulnerability database it matches against.
#[async_trait]
pub trait VulnMatcher: Send + Sync + 'static {
    /// Ensures the vulnerability database is present and current, refreshing
    /// it if needed. On refresh failure, returns the existing build info
    /// rather than an error — the caller logs but does not treat this as fatal.
    async fn ensure_database(&self) -> Result<DbInfo>;

    async fn match_vulnerabilities(&self, sbom_json: &str, cancellation: CancellationToken) -> Result<String>;
}

/// Process-exec adapter around a `grype`-shaped CLI.
pub struct GrypeMatcher {
    binary: String,
    db_cache_dir: PathBuf,
    timeout: Duration,
}

impl GrypeMatcher {
    pub fn new(binary: impl Into<String>, db_cache_dir: PathBuf, timeout: Duration) -> Self {
        Self { binary: binary.into(), db_cache_dir, timeout }
    }

    fn command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.binary);
        cmd.env("GRYPE_DB_CACHE_DIR", &self.db_cache_dir);
        cmd
    }
}

#[async_trait]
impl VulnMatcher for GrypeMatcher {
    async fn ensure_database(&self) -> Result<DbInfo> {
        let update = self.command().args(["db", "update"]).output().await;
        if let Err(e) = &update {
            tracing::warn!(error = %e, "vuln DB update failed, falling back to existing build");
        } else if let Ok(output) = &update {
            if !output.status.success() {
                tracing::warn!(
                    stderr = %String::from_utf8_lossy(&output.stderr),
                    "vuln DB update returned non-zero, falling back to existing build"
                );
            }
        }

        let status = self.command().args(["db", "status", "-o", "json"]).output().await.map_err(|e| {
            tracing::error!(error = %e, "failed to query vuln DB status");
            ProviderError::VulnMatch(e.to_string())
        })?;

        if !status.status.success() {
            return Err(ProviderError::VulnMatch(String::from_utf8_lossy(&status.stderr).into_owned()));
        }

        let parsed: serde_json::Value = serde_json::from_slice(&status.stdout)
            .map_err(|e| ProviderError::VulnMatch(format!("unparseable db status: {e}")))?;

        let built_at = parsed
            .get("built")
            .and_then(|v| v.as_str())
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .ok_or_else(|| ProviderError::VulnMatch("db status missing 'built' timestamp".to_string()))?;
        let schema_version = parsed
            .get("schemaVersion")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
            .to_string();

        Ok(DbInfo { built_at, schema_version, path: self.db_cache_dir.clone() })
    }

    async fn match_vulnerabilities(&self, sbom_json: &str, cancellation: CancellationToken) -> Result<String> {
        let mut child = self
            .command()
            .args(["sbom:-", "-o", "json"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ProviderError::VulnMatch(format!("failed to spawn vuln matcher: {e}")))?;

        if let Some(mut stdin) = child.stdin.take() {
            let sbom = sbom_json.as_bytes().to_vec();
            stdin
                .write_all(&sbom)
                .await
                .map_err(|e| ProviderError::VulnMatch(format!("failed to write SBOM to matcher stdin: {e}")))?;
        }

        let output = tokio::select! {
            result = tokio::time::timeout(self.timeout, child.wait_with_output()) => {
                result.map_err(|_| ProviderError::VulnMatch("vulnerability match timed out".to_string()))?
            }
            _ = cancellation.cancelled() => {
                return Err(ProviderError::VulnMatch("cancelled".to_string()));
            }
        };

        let output = output.map_err(|e| ProviderError::VulnMatch(format!("vuln matcher I/O error: {e}")))?;
        if !output.status.success() {
            return Err(ProviderError::VulnMatch(String::from_utf8_lossy(&output.stderr).into_owned()));
        }

        let raw = String::from_utf8_lossy(&output.stdout).into_owned();
        serde_json::from_str::<serde_json::Value>(&raw)
            .map_err(|e| ProviderError::VulnMatch(format!("unparseable vuln report: {e}")))?;
        Ok(raw)
    }
}

#[cfg(test)]
#[path = "vuln_tests.rs"]
mod tests;
