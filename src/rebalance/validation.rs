//! Checks run against live nodes before a rebalance starts.

use crate::admin::AdminClient;
use crate::cluster::Cluster;
use crate::error::{Error, Result};
use crate::store::{filter_stores, store_names, ReadOnlyStorageFormat, StoreDefinition};
use tracing::info;

/// Fail unless every node of `cluster` reports the normal server state.
///
/// Nodes are checked in id order; the first one not ready is reported.
pub async fn assert_all_nodes_normal_state(cluster: &Cluster, admin: &dyn AdminClient) -> Result<()> {
    for node in cluster.nodes() {
        let state = admin
            .remote_server_state(node.id())
            .await
            .map_err(|source| Error::RequiredNodeUnavailable {
                node_id: node.id(),
                source,
            })?;
        if !state.is_normal() {
            return Err(Error::NodeNotReady {
                node_id: node.id(),
                host: node.host().to_string(),
                state,
            });
        }
        info!(node_id = node.id(), host = node.host(), "Node is ready for rebalance");
    }
    Ok(())
}

/// Fail unless every read-only store uses the format rebalancing supports.
///
/// Nodes without partitions hold no read-only data and are skipped.
pub async fn assert_read_only_stores_compatible(
    cluster: &Cluster,
    store_defs: &[StoreDefinition],
    admin: &dyn AdminClient,
) -> Result<()> {
    let read_only = filter_stores(store_defs, true);
    if read_only.is_empty() {
        return Ok(());
    }

    let names = store_names(&read_only);
    let expected = ReadOnlyStorageFormat::ReadOnlyV2;
    for node in cluster.nodes().iter().filter(|n| n.num_partitions() > 0) {
        let formats = admin
            .read_only_storage_format(node.id(), &names)
            .await
            .map_err(|source| Error::RequiredNodeUnavailable {
                node_id: node.id(),
                source,
            })?;
        for (store, format) in formats {
            if ReadOnlyStorageFormat::from_code(&format) != Some(expected) {
                return Err(Error::IncompatibleStorageFormat {
                    node_id: node.id(),
                    store,
                    format,
                    expected: expected.code().to_string(),
                });
            }
        }
    }
    Ok(())
}
