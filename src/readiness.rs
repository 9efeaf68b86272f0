//! Per-partition readiness exposed to the placement layer

use dashmap::DashMap;
use std::collections::BTreeMap;

/// Partition -> readiness map owned by one [`SessionEngine`](crate::SessionEngine).
///
/// A partition is `true` only while its claim loop is running and its
/// most recent dispatch did not fail; it flips to `false` on handler
/// error and at session cleanup. Readiness is deliberately not restored
/// after a mid-claim recovery: the `false` latches until the partition's
/// claim loop restarts in a later generation, so the scheduler keeps
/// seeing the degraded-health signal.
///
/// Mutated only by the engine; safe for concurrent external readers.
#[derive(Debug, Default)]
pub struct ReadinessMap {
    partitions: DashMap<u32, bool>,
}

impl ReadinessMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set(&self, partition: u32, ready: bool) {
        self.partitions.insert(partition, ready);
    }

    /// Whether a partition is currently ready.
    ///
    /// Unknown partitions are not ready.
    pub fn is_ready(&self, partition: u32) -> bool {
        self.partitions
            .get(&partition)
            .map(|entry| *entry)
            .unwrap_or(false)
    }

    /// Sorted list of partitions currently ready
    pub fn ready_partitions(&self) -> Vec<u32> {
        let mut ready: Vec<u32> = self
            .partitions
            .iter()
            .filter(|entry| *entry.value())
            .map(|entry| *entry.key())
            .collect();
        ready.sort_unstable();
        ready
    }

    /// True if every tracked partition is ready (vacuously true when empty)
    pub fn all_ready(&self) -> bool {
        self.partitions.iter().all(|entry| *entry.value())
    }

    /// Deterministic copy of the full map
    pub fn snapshot(&self) -> BTreeMap<u32, bool> {
        self.partitions
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_partitions_are_not_ready() {
        let map = ReadinessMap::new();
        assert!(!map.is_ready(0));
        assert!(map.ready_partitions().is_empty());
        assert!(map.all_ready());
    }

    #[test]
    fn test_transitions() {
        let map = ReadinessMap::new();
        map.set(0, true);
        map.set(3, true);
        map.set(1, false);

        assert!(map.is_ready(0));
        assert!(!map.is_ready(1));
        assert_eq!(map.ready_partitions(), vec![0, 3]);
        assert!(!map.all_ready());

        map.set(0, false);
        assert_eq!(map.ready_partitions(), vec![3]);
        assert_eq!(
            map.snapshot(),
            BTreeMap::from([(0, false), (1, false), (3, true)])
        );
    }
}
