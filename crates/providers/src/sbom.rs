//! The SBOM Producer contract (spec §4.6) and a `syft`-shaped process-exec adapter.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use sw_core::{Digest, RuntimeKind};
use tokio_util::sync::CancellationToken;

use crate::error::{ProviderError, Result};

/// Everything a Producer needs to locate the image in local runtime storage.
/// Mirrors `sw_core::DiscoveryEvent` minus the container-instance identity,
/// which is irrelevant once scanning is keyed by digest alone.
#[derive(Debug, Clone)]
pub struct ProduceContext {
    pub digest: Digest,
    pub reference: String,
    pub node: Option<String>,
    pub runtime_kind: RuntimeKind,
}

/// Generates an opaque SBOM-JSON document for a locally-held image.
///
/// Implementations MUST NOT pull from a remote registry — only the image
/// content the local runtime already holds is authoritative. Must be safe
/// to call concurrently, though the queue worker only ever calls it serially.
#[async_trait]
pub trait SbomProducer: Send + Sync + 'static {
    async fn produce(&self, ctx: &ProduceContext, cancellation: CancellationToken) -> Result<String>;
}

/// Process-exec adapter around a `syft`-shaped CLI.
///
/// Invokes `{binary} <reference> -o syft-json` against the image the local
/// runtime already holds (`--from docker`/`--from podman` selected by
/// `runtime_kind`), capturing stdout as the SBOM document.
pub struct SyftProducer {
    binary: String,
    timeout: Duration,
}

impl SyftProducer {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self { binary: binary.into(), timeout }
    }

    fn source_flag(runtime_kind: &RuntimeKind) -> &'static str {
        match runtime_kind {
            RuntimeKind::Docker => "docker",
            RuntimeKind::Kubernetes => "docker",
            RuntimeKind::Other(_) => "podman",
        }
    }
}

#[async_trait]
impl SbomProducer for SyftProducer {
    async fn produce(&self, ctx: &ProduceContext, cancellation: CancellationToken) -> Result<String> {
        let source = format!("{}:{}", Self::source_flag(&ctx.runtime_kind), ctx.reference);
        tracing::info!(digest = %ctx.digest, %source, "invoking SBOM producer");

        let mut child = tokio::process::Command::new(&self.binary)
            .args([source.as_str(), "-o", "syft-json"])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                tracing::error!(digest = %ctx.digest, error = %e, "failed to spawn SBOM producer");
                ProviderError::Sbom(sw_core::SbomProductionFailure::Internal)
            })?;

        let output = tokio::select! {
            result = tokio::time::timeout(self.timeout, child.wait_with_output()) => {
                result.map_err(|_| {
                    tracing::warn!(digest = %ctx.digest, "SBOM production timed out");
                    ProviderError::Sbom(sw_core::SbomProductionFailure::Timeout)
                })?
            }
            _ = cancellation.cancelled() => {
                return Err(ProviderError::Sbom(sw_core::SbomProductionFailure::Internal));
            }
        };

        let output = output.map_err(|e| {
            tracing::error!(digest = %ctx.digest, error = %e, "SBOM producer I/O error");
            ProviderError::Sbom(sw_core::SbomProductionFailure::Internal)
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.to_lowercase().contains("not found") || stderr.to_lowercase().contains("no such image") {
                tracing::info!(digest = %ctx.digest, "image not present in local runtime storage");
                return Err(ProviderError::Sbom(sw_core::SbomProductionFailure::NotLocal));
            }
            tracing::error!(digest = %ctx.digest, %stderr, "SBOM producer exited non-zero");
            return Err(ProviderError::Sbom(sw_core::SbomProductionFailure::Internal));
        }

        let raw = String::from_utf8_lossy(&output.stdout).into_owned();
        if serde_json::from_str::<serde_json::Value>(&raw).is_err() {
            tracing::warn!(digest = %ctx.digest, "SBOM producer output did not parse as JSON");
            return Err(ProviderError::Sbom(sw_core::SbomProductionFailure::Malformed));
        }
        Ok(raw)
    }
}

#[cfg(test)]
#[path = "sbom_tests.rs"]
mod tests;
