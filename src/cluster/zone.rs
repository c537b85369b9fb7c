//! Zone descriptors.

use crate::types::{ZoneId, DEFAULT_ZONE_ID};
use serde::{Deserialize, Serialize};

/// A group of nodes sharing a failure domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Zone {
    id: ZoneId,
    /// Other zones ordered from nearest to farthest.
    proximity: Vec<ZoneId>,
}

impl Zone {
    pub fn new(id: ZoneId, proximity: Vec<ZoneId>) -> Self {
        Self { id, proximity }
    }

    pub fn id(&self) -> ZoneId {
        self.id
    }

    pub fn proximity(&self) -> &[ZoneId] {
        &self.proximity
    }
}

impl Default for Zone {
    fn default() -> Self {
        Self::new(DEFAULT_ZONE_ID, Vec::new())
    }
}
