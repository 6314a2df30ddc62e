//! The `Container Instance` entity (spec §3): a single running container,
//! keyed by identity rather than digest.

use chrono::{DateTime, Utc};

use crate::digest::Digest;
use crate::discovery::{DiscoveryEvent, InstanceIdentity, RuntimeKind};

/// A running container, as recorded by the Image Manager from watcher events.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ContainerInstance {
    pub identity: InstanceIdentity,
    pub reference: String,
    pub digest: Digest,
    pub node: Option<String>,
    pub runtime_kind: Option<RuntimeKind>,
    pub created_at: DateTime<Utc>,
}

impl ContainerInstance {
    /// Build the row a fresh discovery event should upsert.
    pub fn from_event(event: DiscoveryEvent, now: DateTime<Utc>) -> Self {
        Self {
            identity: event.instance_identity,
            reference: event.reference,
            digest: event.digest,
            node: event.node,
            runtime_kind: Some(event.runtime_kind),
            created_at: now,
        }
    }
}

#[cfg(test)]
#[path = "container_instance_tests.rs"]
mod tests;
