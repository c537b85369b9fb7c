//! Partition ring shared by the routing strategies.
//!
//! The ring is the list of partitions in ascending id order, each tagged
//! with its owning node and that node's zone. Replica placement walks the
//! ring clockwise from a primary partition.

use crate::cluster::Cluster;
use crate::error::Result;
use crate::types::{NodeId, PartitionId, ZoneId};
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

/// One slot on the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RingSlot {
    pub partition: PartitionId,
    pub node: NodeId,
    pub zone: ZoneId,
}

/// Partitions ordered by id with their owners.
#[derive(Debug, Clone)]
pub(crate) struct PartitionRing {
    slots: Vec<RingSlot>,
}

impl PartitionRing {
    /// Build the ring. Fails if the cluster assigns a partition twice.
    pub fn new(cluster: &Cluster) -> Result<Self> {
        let mapping = cluster.partition_to_node()?;
        let slots = mapping
            .into_iter()
            .map(|(partition, node)| RingSlot {
                partition,
                node,
                zone: cluster.node(node).map(|n| n.zone_id()).unwrap_or_default(),
            })
            .collect();
        Ok(Self { slots })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Slots clockwise starting at `partition`, one full turn.
    ///
    /// Empty if the partition is not on the ring.
    pub fn walk_from(&self, partition: PartitionId) -> impl Iterator<Item = &RingSlot> {
        let start = self
            .slots
            .binary_search_by_key(&partition, |s| s.partition)
            .ok();
        let len = if start.is_some() { self.slots.len() } else { 0 };
        let start = start.unwrap_or(0);
        (0..len).map(move |i| &self.slots[(start + i) % self.slots.len()])
    }

    pub fn owner(&self, partition: PartitionId) -> Option<NodeId> {
        self.slots
            .binary_search_by_key(&partition, |s| s.partition)
            .ok()
            .map(|idx| self.slots[idx].node)
    }

    /// Master partition for a key: xxHash64 of the key modulo ring size.
    pub fn partition_for_key(&self, key: &[u8]) -> Option<PartitionId> {
        if self.slots.is_empty() {
            return None;
        }
        let idx = (hash_key(key) % self.slots.len() as u64) as usize;
        Some(self.slots[idx].partition)
    }
}

/// Calculate the hash of a key using xxHash64.
fn hash_key(key: &[u8]) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    key.hash(&mut hasher);
    hasher.finish()
}
