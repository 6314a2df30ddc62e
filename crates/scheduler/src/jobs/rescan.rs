//! RescanDatabase (spec §4.5): when the vuln DB has moved on, force every
//! terminal-state image back through the pipeline, staler images first.

use std::sync::Arc;

use async_trait::async_trait;
use sw_core::RuntimeKind;
use sw_providers::VulnMatcher;
use sw_queue::{ScanJob, ScanQueue};
use sw_store::Store;
use tokio_util::sync::CancellationToken;

use crate::job::ScheduledJob;

pub struct RescanDatabaseJob {
    store: Arc<Store>,
    matcher: Arc<dyn VulnMatcher>,
    queue: Arc<ScanQueue>,
}

impl RescanDatabaseJob {
    pub fn new(store: Arc<Store>, matcher: Arc<dyn VulnMatcher>, queue: Arc<ScanQueue>) -> Self {
        Self { store, matcher, queue }
    }
}

#[async_trait]
impl ScheduledJob for RescanDatabaseJob {
    fn name(&self) -> &str {
        "rescan_database"
    }

    async fn run(&self, cancellation: CancellationToken) -> Result<(), String> {
        let info = self.matcher.ensure_database().await.map_err(|e| e.to_string())?;
        let newest = self.store.newest_completed_grype_db_built().map_err(|e| e.to_string())?;

        if newest == Some(info.built_at) {
            return Ok(());
        }

        let digests = self.store.terminal_digests_by_staleness().map_err(|e| e.to_string())?;
        for digest in digests {
            if cancellation.is_cancelled() {
                break;
            }

            let instances = self.store.list_instances_for(&digest).map_err(|e| e.to_string())?;
            let (reference, node, runtime_kind) = match instances.first() {
                Some(instance) => (instance.reference.clone(), instance.node.clone(), instance.runtime_kind.clone()),
                None => (digest.to_string(), None, None),
            };

            let job = ScanJob {
                digest: digest.clone(),
                reference,
                node,
                runtime_kind: runtime_kind.unwrap_or(RuntimeKind::Other("unknown".to_string())),
                force: true,
            };
            if let Err(e) = self.queue.submit(job).await {
                tracing::warn!(%digest, error = %e, "failed to re-enqueue terminal image for rescan");
            }
        }
        Ok(())
    }
}
