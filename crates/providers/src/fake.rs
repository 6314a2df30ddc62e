//! In-memory stand-ins for `sw-queue`'s tests: no subprocess, canned responses.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::error::{ProviderError, Result};
use crate::sbom::{ProduceContext, SbomProducer};
use crate::vuln::{DbInfo, VulnMatcher};

/// Returns a canned SBOM per digest, or a canned failure if configured.
#[derive(Default)]
pub struct FakeSbomProducer {
    responses: Mutex<HashMap<String, std::result::Result<String, sw_core::SbomProductionFailure>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeSbomProducer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn succeed_with(&self, digest: &str, sbom_json: impl Into<String>) {
        self.responses.lock().insert(digest.to_string(), Ok(sbom_json.into()));
    }

    pub fn fail_with(&self, digest: &str, failure: sw_core::SbomProductionFailure) {
        self.responses.lock().insert(digest.to_string(), Err(failure));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl SbomProducer for FakeSbomProducer {
    async fn produce(&self, ctx: &ProduceContext, _cancellation: CancellationToken) -> Result<String> {
        self.calls.lock().push(ctx.digest.as_str().to_string());
        match self.responses.lock().get(ctx.digest.as_str()) {
            Some(Ok(json)) => Ok(json.clone()),
            Some(Err(failure)) => Err(ProviderError::Sbom(*failure)),
            None => Err(ProviderError::Sbom(sw_core::SbomProductionFailure::Internal)),
        }
    }
}

/// Returns a canned vuln report and a fixed DB build timestamp.
pub struct FakeVulnMatcher {
    responses: Mutex<HashMap<String, std::result::Result<String, String>>>,
    db_built_at: Mutex<DateTime<Utc>>,
}

impl FakeVulnMatcher {
    pub fn new(db_built_at: DateTime<Utc>) -> Self {
        Self { responses: Mutex::new(HashMap::new()), db_built_at: Mutex::new(db_built_at) }
    }

    pub fn succeed_with(&self, sbom_json: &str, report_json: impl Into<String>) {
        self.responses.lock().insert(sbom_json.to_string(), Ok(report_json.into()));
    }

    pub fn fail_with(&self, sbom_json: &str, message: impl Into<String>) {
        self.responses.lock().insert(sbom_json.to_string(), Err(message.into()));
    }

    pub fn set_db_built_at(&self, built_at: DateTime<Utc>) {
        *self.db_built_at.lock() = built_at;
    }
}

#[async_trait]
impl VulnMatcher for FakeVulnMatcher {
    async fn ensure_database(&self) -> Result<DbInfo> {
        Ok(DbInfo {
            built_at: *self.db_built_at.lock(),
            schema_version: "fake".to_string(),
            path: std::path::PathBuf::from("/tmp/fake-grype-db"),
        })
    }

    async fn match_vulnerabilities(&self, sbom_json: &str, _cancellation: CancellationToken) -> Result<String> {
        match self.responses.lock().get(sbom_json) {
            Some(Ok(json)) => Ok(json.clone()),
            Some(Err(message)) => Err(ProviderError::VulnMatch(message.clone())),
            None => Err(ProviderError::VulnMatch("no canned response for this SBOM".to_string())),
        }
    }
}
