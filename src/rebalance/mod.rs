//! Rebalance planning.
//!
//! Everything here is computed from cluster values, apart from the
//! pre-flight checks in [`validation`] which ask live nodes for their state.
//!
//! ```text
//!  current ──┐                       ┌── stolen_primaries(stealer)
//!            ├── ReplicationMapper ──┼── stolen_replicas(stealer)
//!  target ───┘                       └── apply_move / apply_donation
//!                                           │
//!                                           ▼
//!                               RebalancePartitionsInfo
//! ```

mod diff;
mod plan;
mod replication;
pub mod validation;

pub use diff::{apply_donation, apply_move, diff_added, diff_deleted, stolen_primaries};
pub use plan::{update_plans_with_stores, RebalancePartitionsInfo};
pub use replication::{
    all_owned_partitions, current_partition_mapping, stolen_replicas, NodePartitions,
    ReplicationMapper,
};
pub use validation::{assert_all_nodes_normal_state, assert_read_only_stores_compatible};
