//! Kubernetes runtime watcher (spec §4.1), built on `kube`/`k8s-openapi` —
//! the same client the teacher's own Kubernetes agent adapter uses for pod
//! lifecycle management, here pointed at a cluster-wide Pod watch instead.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use k8s_openapi::api::core::v1::{ContainerStatus, Pod};
use kube::api::{Api, ListParams};
use kube::runtime::{watcher, WatchStreamExt};
use kube::Client;
use sw_core::{Digest, DiscoveryEvent, InstanceIdentity, RuntimeKind, WatchEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::backoff::Backoff;
use crate::error::{Result, WatchError};
use crate::RuntimeWatcher;

pub struct KubernetesWatcher {
    client: Client,
}

impl KubernetesWatcher {
    pub async fn connect() -> Result<Self> {
        let client = Client::try_default().await.map_err(|e| WatchError::RuntimeUnavailable(e.to_string()))?;
        Ok(Self { client })
    }

    fn pods(&self) -> Api<Pod> {
        Api::all(self.client.clone())
    }

    async fn list_snapshot(&self) -> Result<Vec<DiscoveryEvent>> {
        let list = self
            .pods()
            .list(&ListParams::default())
            .await
            .map_err(|e| WatchError::RuntimeUnavailable(e.to_string()))?;
        Ok(list.items.iter().flat_map(discovery_events_for_pod).collect())
    }

    async fn run_connection(
        &self,
        cancellation: &CancellationToken,
        sink: &mpsc::Sender<WatchEvent>,
        backoff: &mut Backoff,
    ) -> bool {
        let snapshot = match self.list_snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list pods for snapshot, reconnecting");
                return false;
            }
        };
        if sink.send(WatchEvent::Snapshot(snapshot)).await.is_err() {
            return true;
        }
        backoff.reset();

        let mut stream = watcher(self.pods(), watcher::Config::default()).applied_objects().boxed();

        loop {
            tokio::select! {
                _ = cancellation.cancelled() => return true,
                next = stream.next() => {
                    match next {
                        Some(Ok(pod)) => {
                            for event in discovery_events_for_pod(&pod) {
                                if sink.send(WatchEvent::ContainerSeen(event)).await.is_err() {
                                    return true;
                                }
                            }
                        }
                        Some(Err(e)) => {
                            tracing::warn!(error = %e, "kubernetes watch stream error");
                            return false;
                        }
                        None => return false,
                    }
                }
            }
        }
    }
}

/// Digest discovery for Kubernetes: the kubelet reports each container's
/// resolved image back in `status.containerStatuses[].imageID`, already
/// containing the digest — no separate inspection call is needed the way
/// Docker requires one.
fn digest_from_image_id(image_id: &str) -> Option<String> {
    image_id.rsplit_once('@').map(|(_, digest)| digest.to_string())
}

fn discovery_events_for_pod(pod: &Pod) -> Vec<DiscoveryEvent> {
    let Some(metadata_name) = pod.metadata.name.clone() else { return Vec::new() };
    let namespace = pod.metadata.namespace.clone().unwrap_or_else(|| "default".to_string());
    let node = pod.spec.as_ref().and_then(|spec| spec.node_name.clone());

    let Some(statuses) = pod.status.as_ref().and_then(|s| s.container_statuses.as_ref()) else {
        return Vec::new();
    };

    statuses
        .iter()
        .filter_map(|status: &ContainerStatus| {
            let digest = digest_from_image_id(&status.image_id)?;
            Some(DiscoveryEvent {
                instance_identity: InstanceIdentity::new(
                    namespace.clone(),
                    metadata_name.clone(),
                    status.name.clone(),
                ),
                reference: status.image.clone(),
                digest: Digest::from(digest),
                node: node.clone(),
                runtime_kind: RuntimeKind::Kubernetes,
            })
        })
        .collect()
}

#[async_trait]
impl RuntimeWatcher for KubernetesWatcher {
    async fn watch_containers(
        &self,
        cancellation: CancellationToken,
        sink: mpsc::Sender<WatchEvent>,
    ) -> Result<()> {
        // A cheap, cluster-scoped call that fails immediately if the API
        // server is unreachable or the service account lacks pod list access.
        self.pods()
            .list(&ListParams::default().limit(1))
            .await
            .map_err(|e| WatchError::RuntimeUnavailable(e.to_string()))?;

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
            tracing::info!(delay_ms = %delay.as_millis(), "reconnecting to kubernetes after watch stream loss");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancellation.cancelled() => return Ok(()),
            }
        }
    }

    /// Used by the Scheduler's RefreshImages job to force a reconciliation
    /// tick without waiting on the long-lived watch stream (spec §4.5).
    async fn snapshot(&self) -> Result<Vec<DiscoveryEvent>> {
        self.list_snapshot().await
    }
}

#[cfg(test)]
#[path = "kubernetes_tests.rs"]
mod tests;
