//! Remote administration of cluster nodes.
//!
//! The resolver, the propagation coordinator and the pre-flight checks
//! reach nodes only through [`AdminClient`]. The transport behind it is up
//! to the implementor; [`crate::testing::InMemoryAdminClient`] keeps every
//! node in memory.

use crate::cluster::Cluster;
use crate::error::AdminError;
use crate::store::StoreDefinition;
use crate::types::{NodeId, ServerState};
use crate::versioning::{VectorClock, Versioned};
use std::collections::BTreeMap;

/// Result of a single remote call.
pub type AdminResult<T> = std::result::Result<T, AdminError>;

/// Metadata operations against one node at a time.
///
/// Implementations must be safe to call from many tasks at once; the crate
/// issues calls to different nodes concurrently.
#[async_trait::async_trait]
pub trait AdminClient: Send + Sync + std::fmt::Debug {
    /// The cluster topology stored on `node_id`, with its version.
    async fn remote_cluster(&self, node_id: NodeId) -> AdminResult<Versioned<Cluster>>;

    /// Overwrite the cluster topology stored on `node_id`.
    async fn update_remote_cluster(
        &self,
        node_id: NodeId,
        cluster: &Cluster,
        version: &VectorClock,
    ) -> AdminResult<()>;

    /// Every store defined on `node_id`.
    async fn remote_store_definitions(&self, node_id: NodeId) -> AdminResult<Vec<StoreDefinition>>;

    /// The server state `node_id` reports.
    async fn remote_server_state(&self, node_id: NodeId) -> AdminResult<ServerState>;

    /// Storage format code of each named read-only store on `node_id`.
    async fn read_only_storage_format(
        &self,
        node_id: NodeId,
        store_names: &[String],
    ) -> AdminResult<BTreeMap<String, String>>;
}
