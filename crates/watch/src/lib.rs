#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

//! sw-watch: the Runtime Watcher contract (spec §4.1) and its Docker/Kubernetes
//! adapters, producing normalized discovery events for the Image Manager.

mod backoff;
mod docker;
mod error;
#[cfg(any(test, feature = "fake"))]
pub mod fake;
mod kubernetes;

pub use docker::DockerWatcher;
pub use error::{Result, WatchError};
pub use kubernetes::KubernetesWatcher;

use async_trait::async_trait;
use sw_core::{DiscoveryEvent, WatchEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Subscribes to a container runtime's lifecycle events and pushes normalized
/// [`WatchEvent`]s into `sink` until `cancellation` fires.
///
/// Fails only if the runtime is unreachable at the moment of the call; once
/// started, reconnects internally (backoff with jitter, capped) and never
/// returns except on cancellation or a fatal misconfiguration.
#[async_trait]
pub trait RuntimeWatcher: Send + Sync + 'static {
    async fn watch_containers(&self, cancellation: CancellationToken, sink: mpsc::Sender<WatchEvent>) -> Result<()>;

    /// One-shot reconciliation listing, independent of the long-lived event
    /// stream `watch_containers` maintains. A listing failure is returned as
    /// `Err`, never swallowed into an empty `Vec` — a failed refresh tick
    /// must not be treated as a reconciliation with zero containers.
    async fn snapshot(&self) -> Result<Vec<DiscoveryEvent>>;
}
