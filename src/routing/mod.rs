//! Replica placement over a partitioned cluster.
//!
//! A [`RoutingStrategy`] answers which partitions hold copies of a primary
//! partition under a store's replication settings. Rebalancing treats it as
//! a black box: the replication mapper only ever calls
//! [`RoutingStrategy::replicating_partitions`]. Two strategies ship with the
//! crate and a custom ring can be plugged in through
//! [`RoutingStrategyFactory`].
//!
//! ```text
//!  ring:  P0(n0) → P1(n1) → P2(n2) → P3(n0) → ...
//!
//!  replicating_partitions(P1), 2 replicas  = [P1, P2]
//!  route_key("user:1") = owners of replicating_partitions(hash % P)
//! ```

mod consistent;
mod ring;
mod zone;

pub use consistent::ConsistentRoutingStrategy;
pub use zone::ZoneRoutingStrategy;

use crate::cluster::Cluster;
use crate::error::Result;
use crate::store::{RoutingStrategyType, StoreDefinition};
use crate::types::{NodeId, PartitionId};
use std::fmt::Debug;
use std::sync::Arc;

/// Maps primary partitions to the partitions that replicate them.
pub trait RoutingStrategy: Send + Sync + Debug {
    /// Copies kept of every partition, primary included.
    fn num_replicas(&self) -> usize;

    /// Partitions on the ring.
    fn num_partitions(&self) -> usize;

    /// Partitions holding `partition`'s data in replication order, the
    /// primary first. Empty if the partition is unknown.
    fn replicating_partitions(&self, partition: PartitionId) -> Vec<PartitionId>;

    /// Master partition for a key.
    fn partition_for_key(&self, key: &[u8]) -> Option<PartitionId>;

    /// Node owning `partition` as primary.
    fn owner(&self, partition: PartitionId) -> Option<NodeId>;

    /// Nodes holding a key, in replication order.
    fn route_key(&self, key: &[u8]) -> Vec<NodeId> {
        self.partition_for_key(key)
            .map(|master| {
                self.replicating_partitions(master)
                    .into_iter()
                    .filter_map(|p| self.owner(p))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Builds the routing strategy a store uses on a given cluster.
pub trait RoutingStrategyFactory: Send + Sync + Debug {
    fn strategy(&self, store: &StoreDefinition, cluster: &Cluster) -> Result<Arc<dyn RoutingStrategy>>;
}

/// Chooses consistent or zone routing from the store definition.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRoutingFactory;

impl RoutingStrategyFactory for DefaultRoutingFactory {
    fn strategy(&self, store: &StoreDefinition, cluster: &Cluster) -> Result<Arc<dyn RoutingStrategy>> {
        match store.routing() {
            RoutingStrategyType::Consistent => Ok(Arc::new(ConsistentRoutingStrategy::new(
                cluster,
                store.replication_factor(),
            )?)),
            RoutingStrategyType::Zone => Ok(Arc::new(ZoneRoutingStrategy::new(
                cluster,
                store.zone_replication_factor().clone(),
            )?)),
        }
    }
}
