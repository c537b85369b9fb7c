//! Node to partition mapping, with and without replicas.

use crate::cluster::Cluster;
use crate::error::{Error, Result};
use crate::routing::{DefaultRoutingFactory, RoutingStrategyFactory};
use crate::store::{max_replication_store, StoreDefinition};
use crate::types::{NodeId, PartitionId};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::trace;

/// Partitions each node holds, primary or replica.
pub type NodePartitions = BTreeMap<NodeId, BTreeSet<PartitionId>>;

/// Computes which partitions each node stores once replication is applied.
///
/// Only the store with the highest replication factor is consulted: every
/// other store's replicas are a subset of its own.
#[derive(Debug, Clone)]
pub struct ReplicationMapper {
    factory: Arc<dyn RoutingStrategyFactory>,
}

impl Default for ReplicationMapper {
    fn default() -> Self {
        Self::new(Arc::new(DefaultRoutingFactory))
    }
}

impl ReplicationMapper {
    pub fn new(factory: Arc<dyn RoutingStrategyFactory>) -> Self {
        Self { factory }
    }

    /// Every partition each node holds a copy of.
    ///
    /// Every node of `cluster` appears in the result, possibly with an empty
    /// set. With `include_primary` false, a node is not credited with the
    /// partitions it owns as primary unless it also replicates them.
    pub fn all_owned_partitions(
        &self,
        cluster: &Cluster,
        store_defs: &[StoreDefinition],
        include_primary: bool,
    ) -> Result<NodePartitions> {
        let partition_to_node = current_partition_mapping(cluster)?;
        let store = max_replication_store(store_defs).ok_or(Error::NoStoreDefinitions)?;
        let strategy = self.factory.strategy(store, cluster)?;

        let mut owned: NodePartitions = cluster
            .node_ids()
            .into_iter()
            .map(|id| (id, BTreeSet::new()))
            .collect();

        for node in cluster.nodes() {
            for &primary in node.partition_ids() {
                let mut replicas = strategy.replicating_partitions(primary);
                if !include_primary {
                    replicas.retain(|p| *p != primary);
                }
                for replica in replicas {
                    let holder = partition_to_node
                        .get(&replica)
                        .copied()
                        .ok_or(Error::PartitionNotFound(replica))?;
                    owned.entry(holder).or_default().insert(primary);
                }
            }
        }

        trace!(
            cluster = cluster.name(),
            store = store.name(),
            include_primary,
            "Computed node to partition mapping"
        );
        Ok(owned)
    }

    /// Replica partitions `stealer` gains moving from `current` to `target`,
    /// excluding partitions it already owns as primary in `current`.
    pub fn stolen_replicas(
        &self,
        current: &Cluster,
        target: &Cluster,
        store_defs: &[StoreDefinition],
        stealer: NodeId,
    ) -> Result<BTreeSet<PartitionId>> {
        let current_owned = self.all_owned_partitions(current, store_defs, false)?;
        let target_owned = self.all_owned_partitions(target, store_defs, false)?;

        let mut stolen = super::diff_added(current_owned.get(&stealer), target_owned.get(&stealer));
        if let Some(node) = current.node(stealer) {
            for primary in node.partition_ids() {
                stolen.remove(primary);
            }
        }
        Ok(stolen)
    }
}

/// Primary owner of every partition of `cluster`.
pub fn current_partition_mapping(cluster: &Cluster) -> Result<BTreeMap<PartitionId, NodeId>> {
    cluster.partition_to_node()
}

/// [`ReplicationMapper::all_owned_partitions`] with the default routing.
pub fn all_owned_partitions(
    cluster: &Cluster,
    store_defs: &[StoreDefinition],
    include_primary: bool,
) -> Result<NodePartitions> {
    ReplicationMapper::default().all_owned_partitions(cluster, store_defs, include_primary)
}

/// [`ReplicationMapper::stolen_replicas`] with the default routing.
pub fn stolen_replicas(
    current: &Cluster,
    target: &Cluster,
    store_defs: &[StoreDefinition],
    stealer: NodeId,
) -> Result<BTreeSet<PartitionId>> {
    ReplicationMapper::default().stolen_replicas(current, target, store_defs, stealer)
}
