//! Zone-aware replica placement.

use crate::cluster::Cluster;
use crate::error::{Error, Result};
use crate::routing::ring::PartitionRing;
use crate::routing::RoutingStrategy;
use crate::types::{NodeId, PartitionId, ZoneId};
use std::collections::BTreeMap;

/// Places replicas clockwise from the primary until every zone holds its
/// configured number of copies.
#[derive(Debug, Clone)]
pub struct ZoneRoutingStrategy {
    ring: PartitionRing,
    zone_replication_factor: BTreeMap<ZoneId, usize>,
    num_replicas: usize,
}

impl ZoneRoutingStrategy {
    pub fn new(cluster: &Cluster, zone_replication_factor: BTreeMap<ZoneId, usize>) -> Result<Self> {
        for zone in zone_replication_factor.keys() {
            if cluster.zone(*zone).is_none() {
                return Err(Error::Routing(format!(
                    "replication factor given for zone {} which is not in cluster {}",
                    zone,
                    cluster.name()
                )));
            }
        }
        let num_replicas = zone_replication_factor.values().sum();
        Ok(Self {
            ring: PartitionRing::new(cluster)?,
            zone_replication_factor,
            num_replicas,
        })
    }
}

impl RoutingStrategy for ZoneRoutingStrategy {
    fn num_replicas(&self) -> usize {
        self.num_replicas
    }

    fn num_partitions(&self) -> usize {
        self.ring.len()
    }

    fn replicating_partitions(&self, partition: PartitionId) -> Vec<PartitionId> {
        let mut remaining = self.zone_replication_factor.clone();
        let mut nodes: Vec<NodeId> = Vec::with_capacity(self.num_replicas);
        let mut partitions = Vec::with_capacity(self.num_replicas);

        for slot in self.ring.walk_from(partition) {
            if nodes.len() >= self.num_replicas {
                break;
            }
            if nodes.contains(&slot.node) {
                continue;
            }
            if let Some(quota) = remaining.get_mut(&slot.zone).filter(|q| **q > 0) {
                *quota -= 1;
                nodes.push(slot.node);
                partitions.push(slot.partition);
            }
        }
        partitions
    }

    fn partition_for_key(&self, key: &[u8]) -> Option<PartitionId> {
        self.ring.partition_for_key(key)
    }

    fn owner(&self, partition: PartitionId) -> Option<NodeId> {
        self.ring.owner(partition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{Node, Zone};

    fn cluster() -> Cluster {
        Cluster::new(
            "zoned",
            vec![
                Node::new(0, "a0", vec![0, 4]).with_zone(0),
                Node::new(1, "a1", vec![1, 5]).with_zone(0),
                Node::new(2, "b0", vec![2, 6]).with_zone(1),
                Node::new(3, "b1", vec![3, 7]).with_zone(1),
            ],
            vec![Zone::new(0, vec![1]), Zone::new(1, vec![0])],
        )
        .unwrap()
    }

    #[test]
    fn test_one_replica_per_zone() {
        let strategy =
            ZoneRoutingStrategy::new(&cluster(), BTreeMap::from([(0, 1), (1, 1)])).unwrap();
        assert_eq!(strategy.num_replicas(), 2);
        // From partition 0 (zone 0) the next zone-1 slot is partition 2.
        assert_eq!(strategy.replicating_partitions(0), vec![0, 2]);
        assert_eq!(strategy.replicating_partitions(3), vec![3, 4]);
    }

    #[test]
    fn test_two_in_home_zone() {
        let strategy =
            ZoneRoutingStrategy::new(&cluster(), BTreeMap::from([(0, 2), (1, 1)])).unwrap();
        assert_eq!(strategy.replicating_partitions(0), vec![0, 1, 2]);
        assert_eq!(strategy.replicating_partitions(2), vec![2, 4, 5]);
    }

    #[test]
    fn test_unknown_zone_rejected() {
        let result = ZoneRoutingStrategy::new(&cluster(), BTreeMap::from([(9, 1)]));
        assert!(matches!(result, Err(Error::Routing(_))));
    }
}
