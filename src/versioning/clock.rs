//! Vector clock implementation.
//!
//! Each entry counts the updates a node has issued for one metadata key.
//! Two clocks are ordered when one dominates the other entry-wise; when each
//! has an entry the other lacks they are concurrent.

use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Causal relation of one version to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Occurred {
    /// The receiver happened before the argument.
    Before,
    /// The receiver happened after the argument.
    After,
    /// Neither dominates: the versions were written independently.
    Concurrent,
    /// Identical counters.
    Equal,
}

impl Occurred {
    /// The same relation seen from the other side.
    pub fn reverse(self) -> Self {
        match self {
            Occurred::Before => Occurred::After,
            Occurred::After => Occurred::Before,
            other => other,
        }
    }
}

/// A per-node logical counter vector.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VectorClock {
    entries: BTreeMap<NodeId, u64>,
    /// Wall clock millis of the last increment. Informational only, never
    /// consulted by [`VectorClock::compare`].
    timestamp: u64,
}

impl VectorClock {
    /// An empty clock, which happens before every non-empty clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a clock from explicit `(node, counter)` pairs.
    pub fn from_entries<I>(entries: I, timestamp: u64) -> Self
    where
        I: IntoIterator<Item = (NodeId, u64)>,
    {
        Self {
            entries: entries.into_iter().filter(|(_, c)| *c > 0).collect(),
            timestamp,
        }
    }

    /// Counter for a node, zero when absent.
    pub fn counter(&self, node_id: NodeId) -> u64 {
        self.entries.get(&node_id).copied().unwrap_or(0)
    }

    /// All non-zero entries, ordered by node id.
    pub fn entries(&self) -> impl Iterator<Item = (NodeId, u64)> + '_ {
        self.entries.iter().map(|(&n, &c)| (n, c))
    }

    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bump `node_id`'s counter in place.
    pub fn increment(&mut self, node_id: NodeId, timestamp: u64) {
        *self.entries.entry(node_id).or_insert(0) += 1;
        self.timestamp = timestamp;
    }

    /// Return a copy with `node_id`'s counter bumped.
    pub fn incremented(&self, node_id: NodeId, timestamp: u64) -> Self {
        let mut next = self.clone();
        next.increment(node_id, timestamp);
        next
    }

    /// Bump `node_id`'s counter stamped with the current wall clock.
    pub fn tick(&self, node_id: NodeId) -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        self.incremented(node_id, now)
    }

    /// Entry-wise maximum of two clocks. The result is after or equal to both.
    pub fn merge(&self, other: &VectorClock) -> Self {
        let mut entries = self.entries.clone();
        for (&node, &counter) in &other.entries {
            let slot = entries.entry(node).or_insert(0);
            *slot = (*slot).max(counter);
        }
        Self {
            entries,
            timestamp: self.timestamp.max(other.timestamp),
        }
    }

    /// How `self` relates to `other`.
    pub fn compare(&self, other: &VectorClock) -> Occurred {
        let mut self_bigger = false;
        let mut other_bigger = false;

        for (&node, &counter) in &self.entries {
            let theirs = other.counter(node);
            if counter > theirs {
                self_bigger = true;
            } else if counter < theirs {
                other_bigger = true;
            }
        }
        // Entries only `other` carries.
        if other
            .entries
            .iter()
            .any(|(node, &c)| c > 0 && !self.entries.contains_key(node))
        {
            other_bigger = true;
        }

        match (self_bigger, other_bigger) {
            (true, true) => Occurred::Concurrent,
            (true, false) => Occurred::After,
            (false, true) => Occurred::Before,
            (false, false) => Occurred::Equal,
        }
    }

    /// Whether the two clocks were written independently.
    pub fn is_concurrent_with(&self, other: &VectorClock) -> bool {
        self.compare(other) == Occurred::Concurrent
    }
}

impl fmt::Display for VectorClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "version(")?;
        for (i, (node, counter)) in self.entries.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", node, counter)?;
        }
        write!(f, ") ts:{}", self.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(entries: &[(NodeId, u64)]) -> VectorClock {
        VectorClock::from_entries(entries.iter().copied(), 0)
    }

    #[test]
    fn test_empty_clocks_are_equal() {
        assert_eq!(VectorClock::new().compare(&VectorClock::new()), Occurred::Equal);
    }

    #[test]
    fn test_empty_is_before_everything() {
        let c = clock(&[(1, 1)]);
        assert_eq!(VectorClock::new().compare(&c), Occurred::Before);
        assert_eq!(c.compare(&VectorClock::new()), Occurred::After);
    }

    #[test]
    fn test_dominating_clock_is_after() {
        let a = clock(&[(1, 2), (2, 1)]);
        let b = clock(&[(1, 1), (2, 1)]);
        assert_eq!(a.compare(&b), Occurred::After);
        assert_eq!(b.compare(&a), Occurred::Before);
    }

    #[test]
    fn test_extra_entry_is_after() {
        let a = clock(&[(1, 1), (2, 1)]);
        let b = clock(&[(1, 1)]);
        assert_eq!(a.compare(&b), Occurred::After);
        assert_eq!(b.compare(&a), Occurred::Before);
    }

    #[test]
    fn test_concurrent_clocks() {
        let a = clock(&[(1, 2)]);
        let b = clock(&[(2, 1)]);
        assert_eq!(a.compare(&b), Occurred::Concurrent);
        assert_eq!(b.compare(&a), Occurred::Concurrent);
        assert!(a.is_concurrent_with(&b));

        let c = clock(&[(1, 2), (2, 1)]);
        let d = clock(&[(1, 1), (2, 2)]);
        assert_eq!(c.compare(&d), Occurred::Concurrent);
    }

    #[test]
    fn test_timestamp_ignored_in_compare() {
        let a = VectorClock::from_entries([(1, 1)], 10);
        let b = VectorClock::from_entries([(1, 1)], 99);
        assert_eq!(a.compare(&b), Occurred::Equal);
    }

    #[test]
    fn test_increment_and_merge() {
        let base = VectorClock::new().incremented(1, 5);
        let left = base.incremented(1, 6);
        let right = base.incremented(2, 7);
        assert_eq!(left.compare(&right), Occurred::Concurrent);

        let merged = left.merge(&right);
        assert_eq!(merged.compare(&left), Occurred::After);
        assert_eq!(merged.compare(&right), Occurred::After);
        assert_eq!(merged.counter(1), 2);
        assert_eq!(merged.counter(2), 1);
        assert_eq!(merged.timestamp(), 7);
    }

    #[test]
    fn test_zero_entries_dropped() {
        let c = VectorClock::from_entries([(1, 0), (2, 3)], 0);
        assert_eq!(c.entries().collect::<Vec<_>>(), vec![(2, 3)]);
        assert_eq!(c.compare(&clock(&[(2, 3)])), Occurred::Equal);
    }

    #[test]
    fn test_reverse() {
        assert_eq!(Occurred::Before.reverse(), Occurred::After);
        assert_eq!(Occurred::Concurrent.reverse(), Occurred::Concurrent);
    }

    #[test]
    fn test_display() {
        let c = VectorClock::from_entries([(1, 2), (3, 1)], 42);
        assert_eq!(c.to_string(), "version(1:2, 3:1) ts:42");
    }
}
