//! Shapes emitted by a [Runtime Watcher](crate) and consumed by the Image
//! Manager. Kept in `sw-core`, rather than a dedicated watcher crate, so the
//! manager never has to depend on a specific watcher backend.

use crate::digest::Digest;

/// Which container runtime backend produced a discovery event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuntimeKind {
    Docker,
    Kubernetes,
    /// Reserved for backends outside this workspace (kubelet CRI, containerd direct, etc).
    Other(String),
}

crate::simple_display! {
    RuntimeKind {
        Docker => "docker",
        Kubernetes => "kubernetes",
        Other(_) => "other",
    }
}

/// `(namespace, pod, container-name)` — unique identity of a running container.
///
/// In host-agent mode (bare Docker, no orchestrator) `namespace` is the
/// hostname and `pod` is the container id; there is no real pod concept.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct InstanceIdentity {
    pub namespace: String,
    pub pod: String,
    pub container_name: String,
}

impl InstanceIdentity {
    pub fn new(
        namespace: impl Into<String>,
        pod: impl Into<String>,
        container_name: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            pod: pod.into(),
            container_name: container_name.into(),
        }
    }
}

/// A single normalized observation of a running container, as emitted by a watcher.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct DiscoveryEvent {
    pub instance_identity: InstanceIdentity,
    /// Human-readable `repo:tag`; decoration only, never identity.
    pub reference: String,
    pub digest: Digest,
    pub node: Option<String>,
    pub runtime_kind: RuntimeKind,
}

/// What a watcher pushes into the Image Manager's sink.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum WatchEvent {
    /// A single container seen (new or re-observed).
    ContainerSeen(DiscoveryEvent),
    /// A full reconciliation snapshot: every instance the watcher currently sees.
    /// Supersedes any dropped delta; emitted on startup and after reconnect.
    Snapshot(Vec<DiscoveryEvent>),
}

#[cfg(test)]
#[path = "discovery_tests.rs"]
mod tests;
