//! Partition movement between a current and a target cluster.

use crate::cluster::{Cluster, Node};
use crate::error::{Error, Result};
use crate::types::{NodeId, PartitionId};
use std::collections::BTreeSet;
use tracing::debug;

/// Primary partitions `stealer` owns in `target` but not in `current`.
///
/// A stealer that is not yet in `current` owns nothing there.
pub fn stolen_primaries(
    current: &Cluster,
    target: &Cluster,
    stealer: NodeId,
) -> Result<BTreeSet<PartitionId>> {
    let target_node = target.node_by_id(stealer)?;
    let owned_now = current.node(stealer).map(Node::partition_set);
    Ok(diff_added(owned_now.as_ref(), Some(&target_node.partition_set())))
}

/// Move `partitions` from `donor` to `stealer`.
///
/// The stealer keeps what it owns in `cluster` and what `stealer` already
/// lists; the donor loses the moved ids. Both lists come back sorted. A
/// stealer missing from `cluster` is added.
pub fn apply_move(
    cluster: &Cluster,
    stealer: &Node,
    donor: &Node,
    partitions: &BTreeSet<PartitionId>,
) -> Cluster {
    let mut stealer_owned = stealer.partition_set();
    if let Some(existing) = cluster.node(stealer.id()) {
        stealer_owned.extend(existing.partition_ids());
    }
    stealer_owned.extend(partitions);

    let updated_stealer = stealer.with_partitions(stealer_owned.into_iter().collect());
    if stealer.is_same_node(donor) {
        return cluster.with_updated_nodes(vec![updated_stealer]);
    }

    let donor_owned: BTreeSet<PartitionId> = cluster
        .node(donor.id())
        .unwrap_or(donor)
        .partition_ids()
        .iter()
        .copied()
        .filter(|p| !partitions.contains(p))
        .collect();
    let updated_donor = donor.with_partitions(donor_owned.into_iter().collect());

    debug!(
        stealer = stealer.id(),
        donor = donor.id(),
        ?partitions,
        "Moved partitions"
    );
    cluster.with_updated_nodes(vec![updated_stealer, updated_donor])
}

/// Give one partition to `stealer`, taking it from whichever node owns it.
pub fn apply_donation(cluster: &Cluster, stealer: &Node, partition: PartitionId) -> Result<Cluster> {
    let donor = cluster
        .node_owning_partition(partition)
        .ok_or(Error::PartitionNotFound(partition))?;
    if donor.id() == stealer.id() {
        return Ok(cluster.clone());
    }

    let stealer = cluster.node(stealer.id()).unwrap_or(stealer);
    let updated_stealer = stealer.with_added_partitions([partition]);
    let updated_donor = donor.with_removed_partitions(&BTreeSet::from([partition]));

    debug!(
        stealer = stealer.id(),
        donor = donor.id(),
        partition,
        "Donated partition"
    );
    Ok(cluster.with_updated_nodes(vec![updated_stealer, updated_donor]))
}

/// Ids present in `target` but not in `current`. A missing side is empty.
pub fn diff_added(
    current: Option<&BTreeSet<PartitionId>>,
    target: Option<&BTreeSet<PartitionId>>,
) -> BTreeSet<PartitionId> {
    match (current, target) {
        (_, None) => BTreeSet::new(),
        (None, Some(target)) => target.clone(),
        (Some(current), Some(target)) => target.difference(current).copied().collect(),
    }
}

/// Ids present in `current` but not in `target`. A missing side is empty.
pub fn diff_deleted(
    current: Option<&BTreeSet<PartitionId>>,
    target: Option<&BTreeSet<PartitionId>>,
) -> BTreeSet<PartitionId> {
    diff_added(target, current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::cluster_fixture;

    fn set(ids: &[PartitionId]) -> BTreeSet<PartitionId> {
        ids.iter().copied().collect()
    }

    #[test]
    fn test_diff_with_missing_sides() {
        let s = set(&[5, 6]);
        assert_eq!(diff_added(None, Some(&s)), s);
        assert!(diff_added(Some(&s), None).is_empty());
        assert!(diff_deleted(None, Some(&s)).is_empty());
        assert_eq!(diff_deleted(Some(&s), None), s);
        assert!(diff_added(None, None).is_empty());
    }

    #[test]
    fn test_diff_is_symmetric_difference() {
        let current = set(&[1, 2, 3, 4]);
        let target = set(&[3, 4, 5, 6]);
        let added = diff_added(Some(&current), Some(&target));
        let deleted = diff_deleted(Some(&current), Some(&target));

        assert_eq!(added, set(&[5, 6]));
        assert_eq!(deleted, set(&[1, 2]));
        assert!(added.is_disjoint(&deleted));
        let union: BTreeSet<_> = added.union(&deleted).copied().collect();
        let symmetric: BTreeSet<_> = current.symmetric_difference(&target).copied().collect();
        assert_eq!(union, symmetric);
    }

    #[test]
    fn test_new_node_steals_from_node_zero() {
        // n0 [0..4], n1 [4..8], n2 [8..12]; node 3 joins and takes 0, 1, 2.
        let current = cluster_fixture(3, 4);
        let target = current.with_updated_nodes(vec![
            current.node(0).unwrap().with_partitions(vec![3]),
            Node::new(3, "localhost", vec![0, 1, 2]),
        ]);

        let stolen = stolen_primaries(&current, &target, 3).unwrap();
        assert_eq!(stolen, set(&[0, 1, 2]));

        let staged = current.with_new_nodes(&target);
        let moved = apply_move(
            &staged,
            staged.node(3).unwrap(),
            staged.node(0).unwrap(),
            &stolen,
        );
        assert_eq!(moved.node(3).unwrap().partition_ids(), &[0, 1, 2]);
        assert_eq!(moved.node(0).unwrap().partition_ids(), &[3]);
        assert_eq!(moved.node(1).unwrap().partition_ids(), &[4, 5, 6, 7]);
        assert_eq!(moved.partition_to_node().unwrap(), target.partition_to_node().unwrap());
    }

    #[test]
    fn test_stolen_primaries_skip_partitions_already_owned() {
        // n0 [0..4], n1 [4..8], n2 [8..12]; node 1 keeps 4 and 5, gives 6
        // and 7 to node 2 and takes 0 and 1 from node 0.
        let current = cluster_fixture(3, 4);
        let target = current.with_updated_nodes(vec![
            current.node(0).unwrap().with_partitions(vec![2, 3]),
            current.node(1).unwrap().with_partitions(vec![0, 1, 4, 5]),
            current.node(2).unwrap().with_partitions(vec![6, 7, 8, 9, 10, 11]),
        ]);

        let stolen = stolen_primaries(&current, &target, 1).unwrap();
        assert_eq!(stolen, set(&[0, 1]));
        let owned_now = current.node(1).unwrap().partition_set();
        assert!(stolen.is_disjoint(&owned_now));

        assert_eq!(stolen_primaries(&current, &target, 2).unwrap(), set(&[6, 7]));
        assert!(stolen_primaries(&current, &target, 0).unwrap().is_empty());
    }

    #[test]
    fn test_stolen_primaries_unknown_in_target() {
        let current = cluster_fixture(2, 1);
        assert!(matches!(
            stolen_primaries(&current, &current, 9),
            Err(Error::NodeNotFound(9))
        ));
    }

    #[test]
    fn test_move_keeps_lists_sorted() {
        let cluster = Cluster::new(
            "m",
            vec![Node::new(0, "h0", vec![9, 1, 5]), Node::new(1, "h1", vec![7, 2])],
            vec![],
        )
        .unwrap();
        let moved = apply_move(
            &cluster,
            cluster.node(1).unwrap(),
            cluster.node(0).unwrap(),
            &set(&[5, 9]),
        );
        assert_eq!(moved.node(1).unwrap().partition_ids(), &[2, 5, 7, 9]);
        assert_eq!(moved.node(0).unwrap().partition_ids(), &[1]);
    }

    #[test]
    fn test_move_to_self_loses_nothing() {
        let cluster = cluster_fixture(2, 2);
        let node = cluster.node(0).unwrap();
        let moved = apply_move(&cluster, node, node, &set(&[0]));
        assert_eq!(moved.node(0).unwrap().partition_ids(), &[0, 1]);
    }

    #[test]
    fn test_donation() {
        let cluster = cluster_fixture(2, 2);
        let newcomer = Node::new(5, "h5", vec![]);

        let donated = apply_donation(&cluster, &newcomer, 3).unwrap();
        assert_eq!(donated.node(5).unwrap().partition_ids(), &[3]);
        assert_eq!(donated.node(1).unwrap().partition_ids(), &[2]);
        assert_eq!(donated.num_partitions(), 4);

        // Already the owner.
        let same = apply_donation(&donated, donated.node(5).unwrap(), 3).unwrap();
        assert_eq!(same, donated);
    }

    #[test]
    fn test_donation_of_unowned_partition() {
        let cluster = cluster_fixture(2, 2);
        let stealer = cluster.node(0).unwrap().clone();
        assert!(matches!(
            apply_donation(&cluster, &stealer, 40),
            Err(Error::PartitionNotFound(40))
        ));
    }

    #[test]
    fn test_primary_mapping_idempotent_after_move() {
        let cluster = cluster_fixture(3, 2);
        let moved = apply_move(
            &cluster,
            cluster.node(2).unwrap(),
            cluster.node(0).unwrap(),
            &set(&[1]),
        );
        assert_eq!(moved.with_updated_nodes(moved.nodes().to_vec()), moved);
        assert_eq!(moved.num_partitions(), cluster.num_partitions());
    }
}
