//! Error types for rebalance planning and metadata propagation.

use crate::types::{NodeId, PartitionId, ServerState};
use crate::versioning::VectorClock;
use thiserror::Error;

/// Result type alias for rebalance operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// Two nodes hold concurrent versions of the cluster metadata.
    #[error(
        "cluster is in inconsistent state, got conflicting clocks {first} (node {first_node}) and {second} (node {second_node})"
    )]
    MetadataConflict {
        first_node: NodeId,
        first: VectorClock,
        second_node: NodeId,
        second: VectorClock,
    },

    /// A node whose answer is needed did not give one.
    #[error("required node {node_id} did not answer: {source}")]
    RequiredNodeUnavailable {
        node_id: NodeId,
        #[source]
        source: AdminError,
    },

    /// A partition is owned by more than one node.
    #[error("partition id {partition} found on two nodes: {first_node} and {second_node}")]
    InvalidTopology {
        partition: PartitionId,
        first_node: NodeId,
        second_node: NodeId,
    },

    /// No node owns the partition.
    #[error("no node owns partition {0}")]
    PartitionNotFound(PartitionId),

    /// Node is not a member of the cluster.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// One or more required nodes did not accept the new cluster.
    #[error("failed to propagate cluster {cluster} at version {version} to required nodes {failed:?}")]
    PropagationFailed {
        cluster: String,
        version: VectorClock,
        failed: Vec<NodeId>,
    },

    /// A node is not in the normal server state.
    #[error("cannot rebalance since node {node_id} ({host}) is not in normal state, but in {state}")]
    NodeNotReady {
        node_id: NodeId,
        host: String,
        state: ServerState,
    },

    /// A read-only store is not in the format rebalancing understands.
    #[error("cannot rebalance since node {node_id} has store {store} not using format {expected} (found {format})")]
    IncompatibleStorageFormat {
        node_id: NodeId,
        store: String,
        format: String,
        expected: String,
    },

    /// A node reports store definitions different from the rest of the cluster.
    #[error("store definitions on node {node_id} do not match those on other nodes")]
    StoreDefinitionMismatch { node_id: NodeId },

    /// Store definitions could not be collected from any node.
    #[error("could not retrieve list of store definitions")]
    NoStoreDefinitions,

    /// A routing strategy could not be built for the store.
    #[error("routing error: {0}")]
    Routing(String),

    /// Admin collaborator error.
    #[error("admin error: {0}")]
    Admin(#[from] AdminError),

    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),

    /// Encoding or decoding failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Node ids named by the error, for callers that retry per node.
    pub fn node_ids(&self) -> Vec<NodeId> {
        match self {
            Error::MetadataConflict {
                first_node,
                second_node,
                ..
            } => vec![*first_node, *second_node],
            Error::RequiredNodeUnavailable { node_id, .. }
            | Error::NodeNotReady { node_id, .. }
            | Error::IncompatibleStorageFormat { node_id, .. }
            | Error::StoreDefinitionMismatch { node_id } => vec![*node_id],
            Error::InvalidTopology {
                first_node,
                second_node,
                ..
            } => vec![*first_node, *second_node],
            Error::NodeNotFound(node_id) => vec![*node_id],
            Error::PropagationFailed { failed, .. } => failed.clone(),
            _ => Vec::new(),
        }
    }
}

/// Errors returned by the admin collaborator for a single remote call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdminError {
    /// The node could not be reached.
    #[error("node {0} unreachable")]
    Unreachable(NodeId),

    /// The call did not finish in time.
    #[error("call to node {0} timed out")]
    Timeout(NodeId),

    /// The node answered with an error.
    #[error("remote error: {0}")]
    Remote(String),

    /// The node refused the request.
    #[error("rejected: {0}")]
    Rejected(String),
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
