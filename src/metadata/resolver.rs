//! Resolving the authoritative cluster version.

use crate::admin::AdminClient;
use crate::cluster::Cluster;
use crate::config::RebalanceConfig;
use crate::error::{Error, Result};
use crate::fanout::FanOut;
use crate::store::{rebalance_stores, StoreDefinition};
use crate::types::NodeId;
use crate::versioning::{Occurred, Versioned};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Asks every node for its view of the cluster metadata and settles on the
/// newest one.
#[derive(Debug, Clone)]
pub struct MetadataResolver {
    bootstrap: Cluster,
    admin: Arc<dyn AdminClient>,
    fanout: FanOut,
}

impl MetadataResolver {
    /// `bootstrap` is the topology the admin client was configured with; its
    /// nodes are the ones queried.
    pub fn new(bootstrap: Cluster, admin: Arc<dyn AdminClient>, config: &RebalanceConfig) -> Self {
        Self {
            bootstrap,
            admin,
            fanout: FanOut::new(config),
        }
    }

    pub fn bootstrap(&self) -> &Cluster {
        &self.bootstrap
    }

    /// The newest cluster version held by any node.
    ///
    /// Every node in the bootstrap cluster and every id in `required` is
    /// asked concurrently. A required node that fails or does not answer in
    /// time aborts with `RequiredNodeUnavailable`; other failures are
    /// logged and skipped. Two answers whose versions are concurrent abort
    /// with `MetadataConflict`. If nobody answers, the bootstrap cluster is
    /// returned with an empty version.
    ///
    /// The outcome depends only on the set of answers, never on the order
    /// they arrived in.
    pub async fn resolve_latest(&self, required: &[NodeId]) -> Result<Versioned<Cluster>> {
        let required: BTreeSet<NodeId> = required.iter().copied().collect();
        let targets: Vec<NodeId> = self
            .bootstrap
            .node_ids()
            .into_iter()
            .chain(required.iter().copied())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        info!(
            cluster = self.bootstrap.name(),
            nodes = targets.len(),
            ?required,
            "Resolving latest cluster metadata"
        );

        let admin = self.admin.clone();
        let mut outcome = self
            .fanout
            .run("remote_cluster", &targets, move |node_id| {
                let admin = admin.clone();
                async move { admin.remote_cluster(node_id).await }
            })
            .await;

        let mut answers: Vec<(NodeId, Versioned<Cluster>)> = Vec::with_capacity(targets.len());
        for node_id in targets {
            match outcome.take(node_id) {
                Ok(versioned) => {
                    debug!(node_id, version = %versioned.version(), "Got cluster version");
                    answers.push((node_id, versioned));
                }
                Err(source) if required.contains(&node_id) => {
                    error!(node_id, error = %source, "Required node did not return its cluster");
                    return Err(Error::RequiredNodeUnavailable { node_id, source });
                }
                Err(e) => {
                    info!(node_id, error = %e, "Failed to get cluster version from node, skipping");
                }
            }
        }

        check_not_concurrent(&answers)?;

        let mut latest = Versioned::new(self.bootstrap.clone());
        for (node_id, versioned) in answers {
            if versioned.version().compare(latest.version()) == Occurred::After {
                debug!(node_id, version = %versioned.version(), "Newer cluster version");
                latest = versioned;
            }
        }

        info!(
            cluster = latest.value().name(),
            version = %latest.version(),
            "Resolved latest cluster metadata"
        );
        Ok(latest)
    }

    /// Rebalance-eligible store definitions, which every node of `cluster`
    /// must agree on.
    pub async fn store_definitions(&self, cluster: &Cluster) -> Result<Vec<StoreDefinition>> {
        let node_ids = cluster.node_ids();
        let admin = self.admin.clone();
        let mut outcome = self
            .fanout
            .run("remote_store_definitions", &node_ids, move |node_id| {
                let admin = admin.clone();
                async move { admin.remote_store_definitions(node_id).await }
            })
            .await;

        let mut agreed: Option<Vec<StoreDefinition>> = None;
        for node_id in node_ids {
            let defs = outcome
                .take(node_id)
                .map_err(|source| Error::RequiredNodeUnavailable { node_id, source })?;
            let defs = rebalance_stores(&defs);
            match &agreed {
                None => agreed = Some(defs),
                Some(first) if !same_stores(first, &defs) => {
                    error!(node_id, "Store definitions differ from other nodes");
                    return Err(Error::StoreDefinitionMismatch { node_id });
                }
                Some(_) => {}
            }
        }
        agreed.ok_or(Error::NoStoreDefinitions)
    }
}

/// Fail on the first pair of answers, in node id order, with concurrent
/// versions.
fn check_not_concurrent(answers: &[(NodeId, Versioned<Cluster>)]) -> Result<()> {
    for (i, (first_node, first)) in answers.iter().enumerate() {
        for (second_node, second) in &answers[i + 1..] {
            if first.version().is_concurrent_with(second.version()) {
                error!(
                    first_node,
                    second_node,
                    first = %first.version(),
                    second = %second.version(),
                    "Conflicting cluster versions"
                );
                return Err(Error::MetadataConflict {
                    first_node: *first_node,
                    first: first.version().clone(),
                    second_node: *second_node,
                    second: second.version().clone(),
                });
            }
        }
    }
    Ok(())
}

/// Same definitions regardless of order.
fn same_stores(a: &[StoreDefinition], b: &[StoreDefinition]) -> bool {
    a.len() == b.len() && a.iter().all(|def| b.contains(def))
}
