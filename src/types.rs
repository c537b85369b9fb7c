//! Core identifiers and small enums shared across the crate.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Node identifier in the cluster.
pub type NodeId = u64;

/// Partition identifier. Partitions span `[0, P)` for a cluster of `P` partitions.
pub type PartitionId = u32;

/// Zone identifier used for replication-aware placement.
pub type ZoneId = u32;

/// Zone every node lives in unless configured otherwise.
pub const DEFAULT_ZONE_ID: ZoneId = 0;

/// Execution state a server reports through its admin interface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerState {
    /// Serving traffic, no rebalance in progress.
    Normal,
    /// Acting as a stealer or donor in a running rebalance.
    RebalancingMaster,
    /// Forwarding writes for partitions it is handing off.
    Grandfathering,
    /// Reachable but not serving.
    Offline,
}

impl ServerState {
    /// Whether a rebalance may start while the server is in this state.
    pub fn is_normal(&self) -> bool {
        matches!(self, ServerState::Normal)
    }
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerState::Normal => write!(f, "NORMAL_SERVER"),
            ServerState::RebalancingMaster => write!(f, "REBALANCING_MASTER_SERVER"),
            ServerState::Grandfathering => write!(f, "GRANDFATHERING_SERVER"),
            ServerState::Offline => write!(f, "OFFLINE_SERVER"),
        }
    }
}
