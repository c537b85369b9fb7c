//! Testing utilities for rebalance planning.
//!
//! This module provides:
//! - An in-memory [`AdminClient`](crate::admin::AdminClient) with failure
//!   and latency injection
//! - Cluster builders for tests
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                 InMemoryAdminClient                  │
//! │                                                      │
//! │   node 0 ─ Versioned<Cluster>, state, stores, RO fmt │
//! │   node 1 ─ ...                  fail_node(1)         │
//! │   node 2 ─ ...                  set_delay(2, 50ms)   │
//! │                                                      │
//! │   calls(): [(0, GetCluster), (2, UpdateCluster) ...] │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use rebalance_core::testing::{cluster_fixture, InMemoryAdminClient};
//!
//! let cluster = cluster_fixture(3, 4);
//! let admin = InMemoryAdminClient::with_cluster(&cluster);
//! admin.fail_node(2);
//! ```

mod admin;

pub use admin::{AdminCall, AdminOperation, InMemoryAdminClient};

use crate::cluster::{Cluster, Node};
use crate::types::{NodeId, PartitionId};

/// Host every fixture node is given.
pub const FIXTURE_HOST: &str = "localhost";

/// A cluster of `num_nodes` nodes, each owning `partitions_per_node`
/// consecutive partitions: node 0 owns `0..k`, node 1 owns `k..2k` and so on.
pub fn cluster_fixture(num_nodes: usize, partitions_per_node: usize) -> Cluster {
    let nodes = (0..num_nodes)
        .map(|i| {
            let first = (i * partitions_per_node) as PartitionId;
            let partitions = (first..first + partitions_per_node as PartitionId).collect();
            let port_offset = (i * 3) as u16;
            Node::new(i as NodeId, FIXTURE_HOST, partitions).with_ports(
                8081 + port_offset,
                6666 + port_offset,
                6667 + port_offset,
            )
        })
        .collect();
    Cluster::from_unique("test-cluster".to_string(), nodes, Vec::new())
}
