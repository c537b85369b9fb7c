//! A value paired with the causal version it was written at.

use crate::error::Result;
use crate::versioning::clock::{Occurred, VectorClock};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Payload plus vector clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Versioned<T> {
    value: T,
    version: VectorClock,
}

impl<T> Versioned<T> {
    /// Wrap a value at the empty version.
    pub fn new(value: T) -> Self {
        Self {
            value,
            version: VectorClock::new(),
        }
    }

    /// Wrap a value at an explicit version.
    pub fn with_version(value: T, version: VectorClock) -> Self {
        Self { value, version }
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn version(&self) -> &VectorClock {
        &self.version
    }

    pub fn into_inner(self) -> T {
        self.value
    }

    pub fn into_parts(self) -> (T, VectorClock) {
        (self.value, self.version)
    }

    /// Compare versions, ignoring payloads.
    pub fn compare(&self, other: &Versioned<T>) -> Occurred {
        self.version.compare(&other.version)
    }

    /// Transform the payload, keeping the version.
    pub fn map<U, F>(self, f: F) -> Versioned<U>
    where
        F: FnOnce(T) -> U,
    {
        Versioned {
            value: f(self.value),
            version: self.version,
        }
    }
}

impl<T: Serialize> Versioned<T> {
    /// Serialize to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }
}

impl<T: DeserializeOwned> Versioned<T> {
    /// Deserialize from bytes.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_empty_version() {
        let v = Versioned::new("cluster");
        assert!(v.version().is_empty());
        assert_eq!(*v.value(), "cluster");
    }

    #[test]
    fn test_compare_ignores_payload() {
        let clock = VectorClock::new().incremented(1, 1);
        let a = Versioned::with_version("a".to_string(), clock.clone());
        let b = Versioned::with_version("b".to_string(), clock);
        assert_eq!(a.compare(&b), Occurred::Equal);
    }

    #[test]
    fn test_map_keeps_version() {
        let clock = VectorClock::new().incremented(2, 1);
        let v = Versioned::with_version(3u32, clock.clone()).map(|n| n * 2);
        assert_eq!(*v.value(), 6);
        assert_eq!(v.version(), &clock);
    }

    #[test]
    fn test_bytes() {
        let v = Versioned::with_version(vec![1u32, 2, 3], VectorClock::new().incremented(7, 9));
        let decoded: Versioned<Vec<u32>> = Versioned::from_bytes(&v.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, v);
    }
}
