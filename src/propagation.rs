//! Pushing a finalized cluster topology to the nodes.
//!
//! Nodes fall into two groups. Best-effort nodes are updated first and
//! their failures are only logged. Required nodes are updated next, all of
//! them, and any failure among them fails the whole call. Nothing is rolled
//! back: nodes that took the new topology keep it, and the caller decides
//! whether to retry.

use crate::admin::AdminClient;
use crate::cluster::Cluster;
use crate::config::RebalanceConfig;
use crate::error::{Error, Result};
use crate::fanout::FanOut;
use crate::types::NodeId;
use crate::versioning::VectorClock;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Nodes that took the new topology in a successful propagation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropagationReport {
    /// Every node now holding the new topology, in id order.
    pub updated: Vec<NodeId>,
    /// Best-effort nodes that did not take it.
    pub skipped: Vec<NodeId>,
}

/// Pushes a topology and its version to a set of nodes.
#[derive(Debug, Clone)]
pub struct PropagationCoordinator {
    admin: Arc<dyn AdminClient>,
    fanout: FanOut,
}

impl PropagationCoordinator {
    pub fn new(admin: Arc<dyn AdminClient>, config: &RebalanceConfig) -> Self {
        Self {
            admin,
            fanout: FanOut::new(config),
        }
    }

    /// Update `attempt` and `required` nodes with `cluster` at `version`.
    ///
    /// Nodes in `attempt` that are not required are best-effort. Every id
    /// in `required` is attempted even if it is missing from `attempt`; one
    /// that is not a member of `cluster` counts as failed.
    pub async fn propagate(
        &self,
        cluster: &Cluster,
        version: &VectorClock,
        attempt: &[NodeId],
        required: &[NodeId],
    ) -> Result<PropagationReport> {
        let required: BTreeSet<NodeId> = required.iter().copied().collect();
        let best_effort: Vec<NodeId> = attempt
            .iter()
            .copied()
            .filter(|id| !required.contains(id))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        info!(
            cluster = cluster.name(),
            %version,
            ?best_effort,
            ?required,
            "Propagating cluster"
        );

        let shared = Arc::new((cluster.clone(), version.clone()));
        let mut report = PropagationReport::default();

        let mut outcome = self.update_nodes("update_best_effort", &best_effort, &shared).await;
        for node_id in best_effort {
            match outcome.take(node_id) {
                Ok(()) => report.updated.push(node_id),
                Err(e) => {
                    debug!(node_id, error = %e, "Failed to update non-required node, ignoring");
                    report.skipped.push(node_id);
                }
            }
        }

        let (members, mut failed): (Vec<NodeId>, Vec<NodeId>) =
            required.iter().partition(|id| cluster.contains_node(**id));
        for node_id in &failed {
            error!(node_id, "Required node is not a member of the cluster being propagated");
        }

        let mut outcome = self.update_nodes("update_required", &members, &shared).await;
        for node_id in members {
            match outcome.take(node_id) {
                Ok(()) => {
                    debug!(node_id, "Updated required node");
                    report.updated.push(node_id);
                }
                Err(e) => {
                    error!(node_id, error = %e, "Failed to update required node");
                    failed.push(node_id);
                }
            }
        }

        if !failed.is_empty() {
            failed.sort_unstable();
            return Err(Error::PropagationFailed {
                cluster: cluster.to_string(),
                version: version.clone(),
                failed,
            });
        }

        report.updated.sort_unstable();
        info!(cluster = cluster.name(), updated = ?report.updated, "Propagated cluster");
        Ok(report)
    }

    /// [`propagate`](Self::propagate) to every node of `cluster`.
    pub async fn propagate_to_all(
        &self,
        cluster: &Cluster,
        version: &VectorClock,
        required: &[NodeId],
    ) -> Result<PropagationReport> {
        self.propagate(cluster, version, &cluster.node_ids(), required)
            .await
    }

    async fn update_nodes(
        &self,
        operation: &'static str,
        node_ids: &[NodeId],
        shared: &Arc<(Cluster, VectorClock)>,
    ) -> crate::fanout::FanOutOutcome<()> {
        let admin = self.admin.clone();
        let shared = shared.clone();
        self.fanout
            .run(operation, node_ids, move |node_id| {
                let admin = admin.clone();
                let shared = shared.clone();
                async move {
                    let (cluster, version) = &*shared;
                    admin.update_remote_cluster(node_id, cluster, version).await
                }
            })
            .await
    }
}
