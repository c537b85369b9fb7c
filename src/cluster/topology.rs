//! Immutable cluster topology.

use crate::cluster::node::Node;
use crate::cluster::zone::Zone;
use crate::error::{Error, Result};
use crate::types::{NodeId, PartitionId, ZoneId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A named set of nodes and zones.
///
/// Nodes are always kept sorted by id so that equal topologies serialize
/// identically. Equality is structural.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cluster {
    name: String,
    nodes: Vec<Node>,
    zones: Vec<Zone>,
}

impl Cluster {
    /// Create a cluster. Fails if two nodes share an id.
    ///
    /// An empty zone list is replaced by the single default zone.
    pub fn new(name: impl Into<String>, nodes: Vec<Node>, zones: Vec<Zone>) -> Result<Self> {
        let mut seen = BTreeSet::new();
        for node in &nodes {
            if !seen.insert(node.id()) {
                return Err(Error::Config(format!("duplicate node id {}", node.id())));
            }
        }
        Ok(Self::from_unique(name.into(), nodes, zones))
    }

    /// Caller guarantees node ids are unique.
    pub(crate) fn from_unique(name: String, mut nodes: Vec<Node>, zones: Vec<Zone>) -> Self {
        nodes.sort_by_key(Node::id);
        let zones = if zones.is_empty() {
            vec![Zone::default()]
        } else {
            zones
        };
        Self { name, nodes, zones }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Nodes sorted by id.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn zone(&self, zone_id: ZoneId) -> Option<&Zone> {
        self.zones.iter().find(|z| z.id() == zone_id)
    }

    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.iter().map(Node::id).collect()
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Total primary partitions across all nodes.
    pub fn num_partitions(&self) -> usize {
        self.nodes.iter().map(Node::num_partitions).sum()
    }

    /// Every partition id owned by some node, ascending.
    pub fn partition_ids(&self) -> BTreeSet<PartitionId> {
        self.nodes
            .iter()
            .flat_map(|n| n.partition_ids().iter().copied())
            .collect()
    }

    pub fn node(&self, node_id: NodeId) -> Option<&Node> {
        self.nodes
            .binary_search_by_key(&node_id, Node::id)
            .ok()
            .map(|idx| &self.nodes[idx])
    }

    /// Like [`Cluster::node`] but fails with `NodeNotFound`.
    pub fn node_by_id(&self, node_id: NodeId) -> Result<&Node> {
        self.node(node_id).ok_or(Error::NodeNotFound(node_id))
    }

    pub fn contains_node(&self, node_id: NodeId) -> bool {
        self.node(node_id).is_some()
    }

    /// The node owning `partition` as primary, if any.
    pub fn node_owning_partition(&self, partition: PartitionId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.owns(partition))
    }

    /// Map every partition to the node owning it as primary.
    ///
    /// Fails with `InvalidTopology` if two nodes claim the same partition.
    pub fn partition_to_node(&self) -> Result<BTreeMap<PartitionId, NodeId>> {
        let mut mapping = BTreeMap::new();
        for node in &self.nodes {
            for &partition in node.partition_ids() {
                if let Some(previous) = mapping.insert(partition, node.id()) {
                    return Err(Error::InvalidTopology {
                        partition,
                        first_node: previous,
                        second_node: node.id(),
                    });
                }
            }
        }
        Ok(mapping)
    }

    /// Nodes in `zone_id`, sorted by id.
    pub fn nodes_in_zone(&self, zone_id: ZoneId) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(move |n| n.zone_id() == zone_id)
    }

    /// Add every node of `target` this cluster lacks, with no partitions.
    pub fn with_new_nodes(&self, target: &Cluster) -> Cluster {
        let new_nodes = target
            .nodes
            .iter()
            .filter(|n| !self.contains_node(n.id()))
            .map(|n| n.with_partitions(Vec::new()))
            .collect();
        self.with_updated_nodes(new_nodes)
    }

    /// Replace nodes sharing an id with one in `updated`, keep the rest.
    ///
    /// Nodes in `updated` that are not yet members are added. If `updated`
    /// repeats an id the last entry wins.
    pub fn with_updated_nodes(&self, updated: Vec<Node>) -> Cluster {
        let mut by_id: BTreeMap<NodeId, Node> =
            self.nodes.iter().map(|n| (n.id(), n.clone())).collect();
        for node in updated {
            by_id.insert(node.id(), node);
        }
        Self::from_unique(
            self.name.clone(),
            by_id.into_values().collect(),
            self.zones.clone(),
        )
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cluster('{}', nodes: [", self.name)?;
        for (i, node) in self.nodes.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{:?}", node.id(), node.partition_ids())?;
        }
        write!(f, "])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster(nodes: Vec<Node>) -> Cluster {
        Cluster::new("test", nodes, vec![]).unwrap()
    }

    #[test]
    fn test_nodes_sorted_by_id() {
        let c = cluster(vec![
            Node::new(2, "h2", vec![2]),
            Node::new(0, "h0", vec![0]),
            Node::new(1, "h1", vec![1]),
        ]);
        assert_eq!(c.node_ids(), vec![0, 1, 2]);
        assert_eq!(c.zones(), &[Zone::default()]);
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let result = Cluster::new(
            "dup",
            vec![Node::new(1, "a", vec![]), Node::new(1, "b", vec![])],
            vec![],
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_lookup() {
        let c = cluster(vec![Node::new(0, "h0", vec![0, 2]), Node::new(5, "h5", vec![1])]);
        assert!(c.contains_node(5));
        assert!(!c.contains_node(3));
        assert_eq!(c.node_owning_partition(2).map(Node::id), Some(0));
        assert!(c.node_owning_partition(9).is_none());
        assert!(matches!(c.node_by_id(3), Err(Error::NodeNotFound(3))));
        assert_eq!(c.num_partitions(), 3);
        assert_eq!(c.partition_ids(), BTreeSet::from([0, 1, 2]));
    }

    #[test]
    fn test_partition_to_node() {
        let c = cluster(vec![Node::new(0, "h0", vec![0, 2]), Node::new(1, "h1", vec![1])]);
        let mapping = c.partition_to_node().unwrap();
        assert_eq!(mapping, BTreeMap::from([(0, 0), (1, 1), (2, 0)]));
    }

    #[test]
    fn test_partition_on_two_nodes_is_invalid() {
        let c = cluster(vec![Node::new(0, "h0", vec![0, 1]), Node::new(1, "h1", vec![1])]);
        match c.partition_to_node() {
            Err(Error::InvalidTopology {
                partition,
                first_node,
                second_node,
            }) => {
                assert_eq!(partition, 1);
                assert_eq!(first_node, 0);
                assert_eq!(second_node, 1);
            }
            other => panic!("expected InvalidTopology, got {:?}", other),
        }
    }

    #[test]
    fn test_with_new_nodes_adds_empty_nodes() {
        let current = cluster(vec![Node::new(0, "h0", vec![0, 1])]);
        let target = cluster(vec![Node::new(0, "h0", vec![0]), Node::new(1, "h1", vec![1])]);

        let merged = current.with_new_nodes(&target);
        assert_eq!(merged.node_ids(), vec![0, 1]);
        // Existing node keeps its current ownership.
        assert_eq!(merged.node(0).unwrap().partition_ids(), &[0, 1]);
        assert_eq!(merged.node(1).unwrap().num_partitions(), 0);
        assert_eq!(merged.node(1).unwrap().host(), "h1");
    }

    #[test]
    fn test_with_updated_nodes_replaces_by_id() {
        let current = cluster(vec![Node::new(0, "h0", vec![0]), Node::new(1, "h1", vec![1])]);
        let updated = current.with_updated_nodes(vec![Node::new(1, "h1", vec![1, 2])]);

        assert_eq!(updated.node(0), current.node(0));
        assert_eq!(updated.node(1).unwrap().partition_ids(), &[1, 2]);
        // The receiver is untouched.
        assert_eq!(current.node(1).unwrap().partition_ids(), &[1]);
    }

    #[test]
    fn test_merge_then_update_is_idempotent() {
        let current = cluster(vec![Node::new(0, "h0", vec![0, 1]), Node::new(1, "h1", vec![2])]);
        let target = cluster(vec![
            Node::new(0, "h0", vec![0]),
            Node::new(1, "h1", vec![2]),
            Node::new(2, "h2", vec![1]),
        ]);
        let updates = vec![Node::new(1, "h1", vec![2, 3]), Node::new(7, "h7", vec![])];

        let once = current.with_new_nodes(&target).with_updated_nodes(updates.clone());
        let twice = once.with_new_nodes(&target).with_updated_nodes(updates);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_structural_equality() {
        let a = cluster(vec![Node::new(1, "h1", vec![1]), Node::new(0, "h0", vec![0])]);
        let b = cluster(vec![Node::new(0, "h0", vec![0]), Node::new(1, "h1", vec![1])]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_display() {
        let c = cluster(vec![Node::new(0, "h0", vec![0, 1])]);
        assert_eq!(c.to_string(), "Cluster('test', nodes: [0:[0, 1]])");
    }
}
