//! Docker runtime watcher (spec §4.1), backed by the Docker Engine API via `bollard`
//! rather than shelling out to the `docker` CLI — a long-lived event subscription
//! doesn't fit the one-shot process-exec pattern the rest of this workspace uses
//! for runtime interaction, so this adapter talks to the daemon socket directly.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bollard::container::ListContainersOptions;
use bollard::system::EventsOptions;
use bollard::Docker;
use futures_util::StreamExt;
use sw_core::{Digest, DiscoveryEvent, InstanceIdentity, RuntimeKind, WatchEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::backoff::Backoff;
use crate::error::{Result, WatchError};
use crate::RuntimeWatcher;

/// `bollard`'s `repo_digests` looks like `["name@sha256:abc...", ...]`; pulls
/// the digest portion out of the first entry that has one.
fn digest_from_repo_digests(repo_digests: &[String]) -> Option<String> {
    repo_digests.iter().find_map(|rd| rd.split_once('@').map(|(_, d)| d.to_string()))
}

pub struct DockerWatcher {
    docker: Docker,
}

impl DockerWatcher {
    pub fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| WatchError::RuntimeUnavailable(e.to_string()))?;
        Ok(Self { docker })
    }

    /// Digest discovery: a container's `Image` field may be a tag; the
    /// authoritative digest comes from inspecting the image itself. A
    /// container whose image has no recorded digest yet (e.g. a load still
    /// in progress) is skipped — the watcher will pick it up on the next
    /// snapshot or event.
    async fn resolve_digest(&self, image_ref: &str) -> Option<Digest> {
        let inspect = self.docker.inspect_image(image_ref).await.ok()?;
        digest_from_repo_digests(&inspect.repo_digests.unwrap_or_default()).map(Digest::from)
    }

    async fn list_snapshot(&self) -> Result<Vec<DiscoveryEvent>> {
        let containers = self
            .docker
            .list_containers(Some(ListContainersOptions::<String> { all: false, ..Default::default() }))
            .await
            .map_err(|e| WatchError::RuntimeUnavailable(e.to_string()))?;

        let mut events = Vec::with_capacity(containers.len());
        for container in containers {
            let Some(id) = container.id.clone() else { continue };
            let Some(image) = container.image.clone() else { continue };
            let Some(digest) = self.resolve_digest(&image).await else { continue };
            let container_name = container
                .names
                .as_ref()
                .and_then(|names| names.first())
                .map(|n| n.trim_start_matches('/').to_string())
                .unwrap_or_else(|| id.clone());

            events.push(DiscoveryEvent {
                instance_identity: InstanceIdentity::new("docker", id, container_name),
                reference: image,
                digest,
                node: None,
                runtime_kind: RuntimeKind::Docker,
            });
        }
        Ok(events)
    }

    /// Runs one live connection: an initial snapshot, then a reconciling
    /// event stream, until the stream ends or cancellation fires. Returns
    /// an error only when the stream itself dies (triggering reconnect);
    /// `Ok(true)` means cancellation, `Ok(false)` means the stream ended
    /// (or the initial snapshot listing failed) and the caller should
    /// reconnect.
    async fn run_connection(
        &self,
        cancellation: &CancellationToken,
        sink: &mpsc::Sender<WatchEvent>,
        backoff: &mut Backoff,
    ) -> bool {
        let snapshot = match self.list_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list containers for snapshot, reconnecting");
                return false;
            }
        };
        if sink.send(WatchEvent::Snapshot(snapshot)).await.is_err() {
            return true;
        }
        // A snapshot landed, so the connection is live; forget prior failures.
        backoff.reset();

        let mut filters = HashMap::new();
        filters.insert("type".to_string(), vec!["container".to_string()]);
        let mut stream =
            self.docker.events(Some(EventsOptions::<String> { filters, ..Default::default() }));

        loop {
            tokio::select! {
                _ = cancellation.cancelled() => return true,
                next = stream.next() => {
                    match next {
                        Some(Ok(message)) => {
                            if message.action.as_deref() != Some("start") {
                                continue;
                            }
                            let Some(actor) = message.actor else { continue };
                            let Some(id) = actor.id else { continue };
                            let attributes = actor.attributes.unwrap_or_default();
                            let Some(image) = attributes.get("image").cloned() else { continue };
                            let Some(digest) = self.resolve_digest(&image).await else { continue };
                            let container_name = attributes.get("name").cloned().unwrap_or_else(|| id.clone());

                            let event = DiscoveryEvent {
                                instance_identity: InstanceIdentity::new("docker", id, container_name),
                                reference: image,
                                digest,
                                node: None,
                                runtime_kind: RuntimeKind::Docker,
                            };
                            if sink.send(WatchEvent::ContainerSeen(event)).await.is_err() {
                                return true;
                            }
                        }
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "docker event stream error");
                            return false;
                        }
                        None => return false,
                    }
                }
            }
        }
    }
}

#[async_trait]
impl RuntimeWatcher for DockerWatcher {
    async fn watch_containers(
        &self,
        cancellation: CancellationToken,
        sink: mpsc::Sender<WatchEvent>,
    ) -> Result<()> {
        self.docker.ping().await.map_err(|e| WatchError::RuntimeUnavailable(e.to_string()))?;

        let mut backoff = Backoff::new(Duration::from_millis(500), Duration::from_secs(30));
        loop {
            if cancellation.is_cancelled() {
                return Ok(());
            }
            let cancelled = self.run_connection(&cancellation, &sink, &mut backoff).await;
            if cancelled {
                return Ok(());
            }
            let delay = backoff.next_delay();
            tracing::info!(delay_ms = %delay.as_millis(), "reconnecting to docker after event stream loss");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancellation.cancelled() => return Ok(()),
            }
        }
    }

    /// Used by the Scheduler's RefreshImages job to force a reconciliation
    /// tick without waiting on the long-lived event stream (spec §4.5).
    async fn snapshot(&self) -> Result<Vec<DiscoveryEvent>> {
        self.list_snapshot().await
    }
}

#[cfg(test)]
#[path = "docker_tests.rs"]
mod tests;
