//! Planning and consistency core for partition rebalancing.
//!
//! This crate computes how a partitioned, replicated key-value cluster moves
//! from one topology to another, and keeps the cluster metadata consistent
//! while it does:
//! - **Topology model**: immutable [`Cluster`], [`Node`] and [`Zone`] values
//! - **Version vectors** for causal ordering of cluster metadata
//! - **Replication mapping** through pluggable routing strategies
//! - **Diff engine** for stolen primaries and replicas, moves and donations
//! - **Metadata resolution** and **propagation** over a bounded worker pool
//!
//! Moving the data itself is out of scope. Remote nodes are reached only
//! through the [`AdminClient`] trait.
//!
//! # Example
//!
//! ```rust,no_run
//! use rebalance_core::testing::InMemoryAdminClient;
//! use rebalance_core::{
//!     stolen_primaries, Cluster, MetadataResolver, Node, PropagationCoordinator,
//!     RebalanceConfig,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let current = Cluster::new(
//!         "prod",
//!         vec![Node::new(0, "a", vec![0, 1]), Node::new(1, "b", vec![2, 3])],
//!         vec![],
//!     )?;
//!     let admin = Arc::new(InMemoryAdminClient::with_cluster(&current));
//!     let config = RebalanceConfig::for_cluster_width(current.num_nodes());
//!
//!     // Agree on the authoritative topology first.
//!     let resolver = MetadataResolver::new(current.clone(), admin.clone(), &config);
//!     let latest = resolver.resolve_latest(&current.node_ids()).await?;
//!
//!     // Plan: node 2 joins and takes partition 1.
//!     let target = latest
//!         .value()
//!         .with_updated_nodes(vec![Node::new(0, "a", vec![0]), Node::new(2, "c", vec![1])]);
//!     let stolen = stolen_primaries(latest.value(), &target, 2)?;
//!     assert_eq!(stolen.len(), 1);
//!
//!     // Once data has moved, publish the target under a newer version.
//!     let version = latest.version().tick(0);
//!     PropagationCoordinator::new(admin, &config)
//!         .propagate_to_all(&target, &version, &[0, 1])
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │        Rebalance orchestrator (caller)      │
//! └─────────────────────────────────────────────┘
//!        │                │                 │
//!        ▼                ▼                 ▼
//! ┌─────────────┐  ┌─────────────┐  ┌──────────────┐
//! │  Metadata   │  │  Rebalance  │  │ Propagation  │
//! │  Resolver   │  │ diff / plan │  │ Coordinator  │
//! └─────────────┘  └─────────────┘  └──────────────┘
//!        │                │                 │
//!        │         ┌─────────────┐          │
//!        │         │   Routing   │          │
//!        │         └─────────────┘          │
//!        └──────────► FanOut ◄──────────────┘
//!                       │
//!                       ▼
//!                ┌─────────────┐
//!                │ AdminClient │
//!                └─────────────┘
//! ```
//!
//! # Consistency Model
//!
//! - **Resolution**: the newest version wins; two concurrent versions are a
//!   conflict and are never merged
//! - **Propagation**: best-effort nodes first, then required nodes; no
//!   rollback on failure
//! - **Planning**: pure functions over immutable values

pub mod admin;
pub mod cluster;
pub mod config;
pub mod error;
mod fanout;
pub mod metadata;
pub mod propagation;
pub mod rebalance;
pub mod routing;
pub mod store;
pub mod testing;
pub mod types;
pub mod versioning;

// Re-exports for convenience
pub use admin::{AdminClient, AdminResult};
pub use cluster::{Cluster, Node, Zone};
pub use config::{AdminClientConfig, RebalanceConfig};
pub use error::{AdminError, Error, Result};
pub use metadata::MetadataResolver;
pub use propagation::{PropagationCoordinator, PropagationReport};
pub use types::{NodeId, PartitionId, ServerState, ZoneId};
pub use versioning::{Occurred, VectorClock, Versioned};

pub use rebalance::{
    all_owned_partitions, apply_donation, apply_move, assert_all_nodes_normal_state,
    assert_read_only_stores_compatible, current_partition_mapping, diff_added, diff_deleted,
    stolen_primaries, stolen_replicas, update_plans_with_stores, RebalancePartitionsInfo,
    ReplicationMapper,
};

pub use routing::{
    ConsistentRoutingStrategy, DefaultRoutingFactory, RoutingStrategy, RoutingStrategyFactory,
    ZoneRoutingStrategy,
};

pub use store::{ReadOnlyStorageFormat, RoutingStrategyType, StoreDefinition};
