//! Zone-unaware replica placement.

use crate::cluster::Cluster;
use crate::error::Result;
use crate::routing::ring::PartitionRing;
use crate::routing::RoutingStrategy;
use crate::types::{NodeId, PartitionId};

/// Places replicas on the next distinct nodes clockwise from the primary.
#[derive(Debug, Clone)]
pub struct ConsistentRoutingStrategy {
    ring: PartitionRing,
    num_replicas: usize,
}

impl ConsistentRoutingStrategy {
    pub fn new(cluster: &Cluster, num_replicas: usize) -> Result<Self> {
        Ok(Self {
            ring: PartitionRing::new(cluster)?,
            num_replicas: num_replicas.max(1),
        })
    }
}

impl RoutingStrategy for ConsistentRoutingStrategy {
    fn num_replicas(&self) -> usize {
        self.num_replicas
    }

    fn num_partitions(&self) -> usize {
        self.ring.len()
    }

    fn replicating_partitions(&self, partition: PartitionId) -> Vec<PartitionId> {
        let mut nodes: Vec<NodeId> = Vec::with_capacity(self.num_replicas);
        let mut partitions = Vec::with_capacity(self.num_replicas);

        for slot in self.ring.walk_from(partition) {
            if !nodes.contains(&slot.node) {
                nodes.push(slot.node);
                partitions.push(slot.partition);
            }
            if nodes.len() >= self.num_replicas {
                break;
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
    use crate::cluster::Node;

    fn cluster() -> Cluster {
        // Partitions 0..12 dealt round-robin over 3 nodes.
        Cluster::new(
            "consistent",
            vec![
                Node::new(0, "h0", vec![0, 3, 6, 9]),
                Node::new(1, "h1", vec![1, 4, 7, 10]),
                Node::new(2, "h2", vec![2, 5, 8, 11]),
            ],
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn test_primary_comes_first() {
        let strategy = ConsistentRoutingStrategy::new(&cluster(), 2).unwrap();
        assert_eq!(strategy.replicating_partitions(4), vec![4, 5]);
        assert_eq!(strategy.replicating_partitions(11), vec![11, 0]);
    }

    #[test]
    fn test_skips_partitions_on_chosen_nodes() {
        let c = Cluster::new(
            "skewed",
            vec![Node::new(0, "h0", vec![0, 1, 2]), Node::new(1, "h1", vec![3])],
            vec![],
        )
        .unwrap();
        let strategy = ConsistentRoutingStrategy::new(&c, 2).unwrap();
        assert_eq!(strategy.replicating_partitions(0), vec![0, 3]);
        assert_eq!(strategy.replicating_partitions(3), vec![3, 0]);
    }

    #[test]
    fn test_fewer_nodes_than_replicas() {
        let strategy = ConsistentRoutingStrategy::new(&cluster(), 5).unwrap();
        assert_eq!(strategy.replicating_partitions(0), vec![0, 1, 2]);
    }

    #[test]
    fn test_route_key_returns_distinct_nodes() {
        let strategy = ConsistentRoutingStrategy::new(&cluster(), 2).unwrap();
        let nodes = strategy.route_key(b"user:42");
        assert_eq!(nodes.len(), 2);
        assert_ne!(nodes[0], nodes[1]);
    }

    #[test]
    fn test_unknown_partition() {
        let strategy = ConsistentRoutingStrategy::new(&cluster(), 2).unwrap();
        assert!(strategy.replicating_partitions(99).is_empty());
    }
}
