//! Plan and publish a rebalance where a fourth node joins a three node cluster.

use rebalance_core::rebalance::NodePartitions;
use rebalance_core::store::BDB_TYPE;
use rebalance_core::testing::{cluster_fixture, InMemoryAdminClient};
use rebalance_core::{
    all_owned_partitions, apply_move, assert_all_nodes_normal_state, stolen_primaries,
    stolen_replicas, update_plans_with_stores, AdminClientConfig, Cluster, MetadataResolver, Node,
    NodeId, PartitionId, PropagationCoordinator, RebalanceConfig, RebalancePartitionsInfo,
    StoreDefinition,
};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter("rebalance_core=debug,info")
        .init();

    // Three nodes with four partitions each.
    let current = cluster_fixture(3, 4);
    let stores = vec![
        StoreDefinition::new("users", BDB_TYPE, 2),
        StoreDefinition::new("sessions", BDB_TYPE, 1),
    ];

    let config = RebalanceConfig::for_cluster_width(current.num_nodes())
        .with_admin_config(AdminClientConfig::for_rebalance(current.num_nodes(), 1));
    let admin = Arc::new(
        InMemoryAdminClient::with_cluster(&current).with_admin_config(config.admin.clone()),
    );
    for node_id in current.node_ids() {
        admin.set_store_definitions(node_id, stores.clone());
    }

    println!("Current cluster: {}", current);

    // Agree on the authoritative topology and store list.
    let resolver = MetadataResolver::new(current.clone(), admin.clone(), &config);
    let latest = resolver.resolve_latest(&current.node_ids()).await?;
    let store_defs = resolver.store_definitions(latest.value()).await?;
    assert_all_nodes_normal_state(latest.value(), admin.as_ref()).await?;
    println!("Latest version: {}", latest.version());

    // Node 3 joins and takes partitions 0, 1 and 2 from node 0.
    let target = latest.value().with_updated_nodes(vec![
        latest.value().node_by_id(0)?.with_partitions(vec![3]),
        Node::new(3, "localhost", vec![0, 1, 2]),
    ]);
    println!("Target cluster:  {}", target);

    let staged = latest.value().with_new_nodes(&target);
    let mut plans = Vec::new();
    let mut moved = staged.clone();
    for stealer in target.nodes() {
        let primaries = stolen_primaries(&staged, &target, stealer.id())?;
        let replicas = stolen_replicas(&staged, &target, &store_defs, stealer.id())?;
        if primaries.is_empty() && replicas.is_empty() {
            continue;
        }
        println!(
            "Node {} steals primaries {:?} and replicas {:?}",
            stealer.id(),
            primaries,
            replicas
        );

        for (donor_id, partitions) in by_donor(&staged, &primaries) {
            let thief = moved.node_by_id(stealer.id())?.clone();
            let donor = moved.node_by_id(donor_id)?.clone();
            moved = apply_move(&moved, &thief, &donor, &partitions);
            plans.push(RebalancePartitionsInfo::new(stealer.id(), donor_id, partitions, vec![]));
        }
    }

    for plan in update_plans_with_stores(&plans, &store_defs) {
        println!("Plan: {}", plan);
    }

    let replicas: NodePartitions = all_owned_partitions(&moved, &store_defs, true)?;
    println!("\nPartitions held per node after the move:");
    for (node_id, partitions) in &replicas {
        println!("  Node {}: {:?}", node_id, partitions);
    }

    // Publish the new topology under a newer version.
    let version = latest.version().tick(0);
    let report = PropagationCoordinator::new(admin.clone(), &config)
        .propagate_to_all(&moved, &version, &current.node_ids())
        .await?;
    println!("\nPropagated {} to nodes {:?}", version, report.updated);
    if !report.skipped.is_empty() {
        println!("Not yet reachable: {:?}", report.skipped);
    }

    Ok(())
}

/// Group stolen partitions by the node currently owning them.
fn by_donor(
    cluster: &Cluster,
    partitions: &BTreeSet<PartitionId>,
) -> BTreeMap<NodeId, BTreeSet<PartitionId>> {
    let mut donors: BTreeMap<NodeId, BTreeSet<PartitionId>> = BTreeMap::new();
    for &partition in partitions {
        if let Some(owner) = cluster.node_owning_partition(partition) {
            donors.entry(owner.id()).or_default().insert(partition);
        }
    }
    donors
}
