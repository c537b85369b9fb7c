//! Store definitions and the filters rebalancing applies to them.
//!
//! Many stores share one cluster. Rebalancing moves partitions for every
//! eligible store at once, so the replica fan-out it must respect is the one
//! of the store with the highest replication factor.

use crate::types::ZoneId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Berkeley DB backed read-write store.
pub const BDB_TYPE: &str = "bdb";
/// Read-only store built offline and swapped in.
pub const READ_ONLY_TYPE: &str = "read-only";
/// MySQL backed store.
pub const MYSQL_TYPE: &str = "mysql";
/// Heap-only store.
pub const MEMORY_TYPE: &str = "memory";

/// Engines whose data cannot be migrated online.
pub const REBALANCE_ENGINE_BLACKLIST: &[&str] = &[MYSQL_TYPE, MEMORY_TYPE];

/// How replicas of a partition are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoutingStrategyType {
    /// Walk the ring, one replica per distinct node.
    Consistent,
    /// Walk the ring honouring a per-zone replica count.
    Zone,
}

/// Definition of one store hosted by the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreDefinition {
    name: String,
    engine_type: String,
    replication_factor: usize,
    routing: RoutingStrategyType,
    /// Replicas per zone, used by zone routing.
    zone_replication_factor: BTreeMap<ZoneId, usize>,
    required_reads: usize,
    required_writes: usize,
    /// Name of the store this one is a view of.
    view_of: Option<String>,
}

impl StoreDefinition {
    /// A consistent-routing store.
    pub fn new(name: impl Into<String>, engine_type: impl Into<String>, replication_factor: usize) -> Self {
        Self {
            name: name.into(),
            engine_type: engine_type.into(),
            replication_factor,
            routing: RoutingStrategyType::Consistent,
            zone_replication_factor: BTreeMap::new(),
            required_reads: 1,
            required_writes: 1,
            view_of: None,
        }
    }

    /// Switch to zone routing with the given per-zone replica counts.
    ///
    /// The replication factor becomes the sum of the per-zone counts.
    pub fn with_zone_replication(mut self, per_zone: BTreeMap<ZoneId, usize>) -> Self {
        self.routing = RoutingStrategyType::Zone;
        self.replication_factor = per_zone.values().sum();
        self.zone_replication_factor = per_zone;
        self
    }

    /// Set quorum sizes.
    pub fn with_quorum(mut self, required_reads: usize, required_writes: usize) -> Self {
        self.required_reads = required_reads;
        self.required_writes = required_writes;
        self
    }

    /// Mark this store as a view over `target`.
    pub fn as_view_of(mut self, target: impl Into<String>) -> Self {
        self.view_of = Some(target.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn engine_type(&self) -> &str {
        &self.engine_type
    }

    /// Copies kept of every partition. Zone routing always places the sum
    /// of its per-zone counts, whatever factor was declared.
    pub fn replication_factor(&self) -> usize {
        match self.routing {
            RoutingStrategyType::Consistent => self.replication_factor,
            RoutingStrategyType::Zone => self.zone_replication_factor.values().sum(),
        }
    }

    pub fn routing(&self) -> RoutingStrategyType {
        self.routing
    }

    pub fn zone_replication_factor(&self) -> &BTreeMap<ZoneId, usize> {
        &self.zone_replication_factor
    }

    pub fn required_reads(&self) -> usize {
        self.required_reads
    }

    pub fn required_writes(&self) -> usize {
        self.required_writes
    }

    pub fn is_view(&self) -> bool {
        self.view_of.is_some()
    }

    pub fn view_of(&self) -> Option<&str> {
        self.view_of.as_deref()
    }

    pub fn is_read_only(&self) -> bool {
        self.engine_type == READ_ONLY_TYPE
    }

    /// Whether the engine supports online partition migration.
    pub fn is_rebalance_eligible(&self) -> bool {
        !self.is_view() && !REBALANCE_ENGINE_BLACKLIST.contains(&self.engine_type.as_str())
    }
}

/// On-disk layout of a read-only store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReadOnlyStorageFormat {
    ReadOnlyV0,
    ReadOnlyV1,
    /// The only layout partitions can be moved in.
    ReadOnlyV2,
}

impl ReadOnlyStorageFormat {
    pub fn code(&self) -> &'static str {
        match self {
            ReadOnlyStorageFormat::ReadOnlyV0 => "ro0",
            ReadOnlyStorageFormat::ReadOnlyV1 => "ro1",
            ReadOnlyStorageFormat::ReadOnlyV2 => "ro2",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "ro0" => Some(ReadOnlyStorageFormat::ReadOnlyV0),
            "ro1" => Some(ReadOnlyStorageFormat::ReadOnlyV1),
            "ro2" => Some(ReadOnlyStorageFormat::ReadOnlyV2),
            _ => None,
        }
    }
}

impl fmt::Display for ReadOnlyStorageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Stores rebalancing supports: no views, no black-listed engines.
pub fn rebalance_stores(defs: &[StoreDefinition]) -> Vec<StoreDefinition> {
    defs.iter()
        .filter(|def| {
            let eligible = def.is_rebalance_eligible();
            if !eligible {
                debug!(store = def.name(), "Ignoring store for rebalancing");
            }
            eligible
        })
        .cloned()
        .collect()
}

/// Keep only read-only stores, or only the rest.
pub fn filter_stores(defs: &[StoreDefinition], read_only: bool) -> Vec<StoreDefinition> {
    defs.iter()
        .filter(|def| def.is_read_only() == read_only)
        .cloned()
        .collect()
}

pub fn store_names(defs: &[StoreDefinition]) -> Vec<String> {
    defs.iter().map(|def| def.name().to_string()).collect()
}

/// The store with the highest replication factor; the first one wins ties.
pub fn max_replication_store(defs: &[StoreDefinition]) -> Option<&StoreDefinition> {
    defs.iter().fold(None, |best: Option<&StoreDefinition>, def| match best {
        Some(b) if b.replication_factor() >= def.replication_factor() => Some(b),
        _ => Some(def),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defs() -> Vec<StoreDefinition> {
        vec![
            StoreDefinition::new("users", BDB_TYPE, 2),
            StoreDefinition::new("sessions", MEMORY_TYPE, 3),
            StoreDefinition::new("legacy", MYSQL_TYPE, 1),
            StoreDefinition::new("search", READ_ONLY_TYPE, 3),
            StoreDefinition::new("users-view", BDB_TYPE, 2).as_view_of("users"),
            StoreDefinition::new("events", BDB_TYPE, 3),
        ]
    }

    #[test]
    fn test_rebalance_stores_filters_views_and_blacklist() {
        let eligible = rebalance_stores(&defs());
        assert_eq!(store_names(&eligible), vec!["users", "search", "events"]);
    }

    #[test]
    fn test_filter_read_only() {
        let all = defs();
        assert_eq!(store_names(&filter_stores(&all, true)), vec!["search"]);
        assert_eq!(filter_stores(&all, false).len(), 5);
    }

    #[test]
    fn test_max_replication_first_wins_ties() {
        let eligible = rebalance_stores(&defs());
        let max = max_replication_store(&eligible).unwrap();
        assert_eq!(max.name(), "search");
        assert_eq!(max.replication_factor(), 3);
    }

    #[test]
    fn test_max_replication_empty() {
        assert!(max_replication_store(&[]).is_none());
    }

    #[test]
    fn test_read_only_format_codes() {
        assert_eq!(ReadOnlyStorageFormat::ReadOnlyV2.code(), "ro2");
        assert_eq!(
            ReadOnlyStorageFormat::from_code("ro1"),
            Some(ReadOnlyStorageFormat::ReadOnlyV1)
        );
        assert_eq!(ReadOnlyStorageFormat::from_code("bogus"), None);
    }

    #[test]
    fn test_zone_replication_switches_routing() {
        let def = StoreDefinition::new("z", BDB_TYPE, 3)
            .with_zone_replication(BTreeMap::from([(0, 2), (1, 1)]));
        assert_eq!(def.routing(), RoutingStrategyType::Zone);
        assert_eq!(def.zone_replication_factor().get(&0), Some(&2));
    }

    #[test]
    fn test_zone_store_replication_factor_is_zone_sum() {
        let zoned = StoreDefinition::new("zoned", BDB_TYPE, 1)
            .with_zone_replication(BTreeMap::from([(0, 2), (1, 1)]));
        assert_eq!(zoned.replication_factor(), 3);

        let defs = vec![StoreDefinition::new("plain", BDB_TYPE, 2), zoned];
        assert_eq!(max_replication_store(&defs).unwrap().name(), "zoned");
    }

    #[test]
    fn test_deserialized_zone_store_ignores_declared_factor() {
        let mut zoned = StoreDefinition::new("zoned", BDB_TYPE, 1)
            .with_zone_replication(BTreeMap::from([(0, 1), (1, 1)]));
        zoned.replication_factor = 5;
        let bytes = bincode::serialize(&zoned).unwrap();
        let decoded: StoreDefinition = bincode::deserialize(&bytes).unwrap();
        assert_eq!(decoded.replication_factor(), 2);
    }
}
