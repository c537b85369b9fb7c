//! A single storage node and the partitions it owns as primary.

use crate::types::{NodeId, PartitionId, ZoneId, DEFAULT_ZONE_ID};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DEFAULT_HTTP_PORT: u16 = 8081;
pub const DEFAULT_SOCKET_PORT: u16 = 6666;
pub const DEFAULT_ADMIN_PORT: u16 = 6667;

/// A node in the cluster topology.
///
/// Nodes are values: every edit returns a new `Node`. Equality compares all
/// fields, so two nodes with the same id but different partitions are not
/// equal. Use [`Node::is_same_node`] for identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Node {
    id: NodeId,
    host: String,
    http_port: u16,
    socket_port: u16,
    admin_port: u16,
    zone_id: ZoneId,
    /// Primary partitions. Never holds duplicates.
    partitions: Vec<PartitionId>,
}

impl Node {
    /// Create a node in the default zone with default ports.
    pub fn new(id: NodeId, host: impl Into<String>, partitions: Vec<PartitionId>) -> Self {
        Self {
            id,
            host: host.into(),
            http_port: DEFAULT_HTTP_PORT,
            socket_port: DEFAULT_SOCKET_PORT,
            admin_port: DEFAULT_ADMIN_PORT,
            zone_id: DEFAULT_ZONE_ID,
            partitions: dedup(partitions),
        }
    }

    /// Set the service ports.
    pub fn with_ports(mut self, http_port: u16, socket_port: u16, admin_port: u16) -> Self {
        self.http_port = http_port;
        self.socket_port = socket_port;
        self.admin_port = admin_port;
        self
    }

    /// Set the zone.
    pub fn with_zone(mut self, zone_id: ZoneId) -> Self {
        self.zone_id = zone_id;
        self
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub fn socket_port(&self) -> u16 {
        self.socket_port
    }

    pub fn admin_port(&self) -> u16 {
        self.admin_port
    }

    pub fn zone_id(&self) -> ZoneId {
        self.zone_id
    }

    /// Primary partitions in stored order.
    pub fn partition_ids(&self) -> &[PartitionId] {
        &self.partitions
    }

    /// Primary partitions as an ordered set.
    pub fn partition_set(&self) -> BTreeSet<PartitionId> {
        self.partitions.iter().copied().collect()
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    /// Whether this node owns `partition` as primary.
    pub fn owns(&self, partition: PartitionId) -> bool {
        self.partitions.contains(&partition)
    }

    /// Id-based identity, ignoring address and ownership.
    pub fn is_same_node(&self, other: &Node) -> bool {
        self.id == other.id
    }

    /// Same node with a replaced partition list.
    pub fn with_partitions(&self, partitions: Vec<PartitionId>) -> Node {
        Node {
            partitions: dedup(partitions),
            ..self.clone()
        }
    }

    /// Same node with `added` appended where not already present.
    pub fn with_added_partitions<I>(&self, added: I) -> Node
    where
        I: IntoIterator<Item = PartitionId>,
    {
        let mut partitions = self.partitions.clone();
        partitions.extend(added);
        self.with_partitions(partitions)
    }

    /// Same node without any of `removed`. Ids it does not own are ignored.
    pub fn with_removed_partitions(&self, removed: &BTreeSet<PartitionId>) -> Node {
        let partitions = self
            .partitions
            .iter()
            .copied()
            .filter(|p| !removed.contains(p))
            .collect();
        self.with_partitions(partitions)
    }
}

/// Drop repeated ids, keeping the first occurrence.
fn dedup(partitions: Vec<PartitionId>) -> Vec<PartitionId> {
    let mut seen = BTreeSet::new();
    partitions.into_iter().filter(|p| seen.insert(*p)).collect()
}
