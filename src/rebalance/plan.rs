//! Partition migration plans.

use crate::error::Result;
use crate::store::{store_names, StoreDefinition};
use crate::types::{NodeId, PartitionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One migration: `partitions` move from the donor to the stealer for
/// every store in `stores`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebalancePartitionsInfo {
    stealer_id: NodeId,
    donor_id: NodeId,
    partitions: BTreeSet<PartitionId>,
    stores: Vec<String>,
}

impl RebalancePartitionsInfo {
    pub fn new(
        stealer_id: NodeId,
        donor_id: NodeId,
        partitions: impl IntoIterator<Item = PartitionId>,
        stores: Vec<String>,
    ) -> Self {
        Self {
            stealer_id,
            donor_id,
            partitions: partitions.into_iter().collect(),
            stores,
        }
    }

    pub fn stealer_id(&self) -> NodeId {
        self.stealer_id
    }

    pub fn donor_id(&self) -> NodeId {
        self.donor_id
    }

    pub fn partitions(&self) -> &BTreeSet<PartitionId> {
        &self.partitions
    }

    pub fn stores(&self) -> &[String] {
        &self.stores
    }

    /// Copy of this plan with its store list replaced.
    pub fn with_stores(&self, stores: Vec<String>) -> Self {
        Self {
            stores,
            ..self.clone()
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(data)?)
    }
}

impl fmt::Display for RebalancePartitionsInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RebalancePartitionsInfo(stealer {} <- donor {}, partitions {:?}, stores {:?})",
            self.stealer_id, self.donor_id, self.partitions, self.stores
        )
    }
}

/// New plans that apply to exactly the stores in `store_defs`.
pub fn update_plans_with_stores(
    plans: &[RebalancePartitionsInfo],
    store_defs: &[StoreDefinition],
) -> Vec<RebalancePartitionsInfo> {
    let names = store_names(store_defs);
    plans.iter().map(|plan| plan.with_stores(names.clone())).collect()
}
