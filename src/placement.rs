//! Placement value model
//!
//! Read-only operations over the placement list the scheduler produces
//! when it assigns replica capacity to pods. The bin-packing algorithm
//! itself is external; this module only consumes its output type, so
//! everything here is pure and performs no I/O.
//!
//! Caller-enforced invariant (not validated here): pod names are unique
//! within one placement list.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Replica capacity assigned to one pod for one workload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    /// Name of the pod hosting the replicas
    pub pod_name: String,

    /// Identity of the source/channel the capacity belongs to
    pub resource: String,

    /// Number of virtual replicas placed on the pod
    pub replicas: u32,
}

impl Placement {
    /// Create a placement entry
    pub fn new(pod_name: impl Into<String>, resource: impl Into<String>, replicas: u32) -> Self {
        Self {
            pod_name: pod_name.into(),
            resource: resource.into(),
            replicas,
        }
    }
}

/// Sum of replica counts across all entries; an empty list yields 0
pub fn total_replicas(placements: &[Placement]) -> u32 {
    placements.iter().map(|p| p.replicas).sum()
}

/// First entry (in list order) whose pod name matches, if any
pub fn placement_for_pod<'a>(
    placements: &'a [Placement],
    pod_name: &str,
) -> Option<&'a Placement> {
    placements.iter().find(|p| p.pod_name == pod_name)
}

/// Independent copy of the list.
///
/// The result is value-equal to the input but shares no backing storage,
/// so callers may mutate their copy without aliasing the scheduler's
/// original.
pub fn copy_placements(placements: &[Placement]) -> Vec<Placement> {
    placements.to_vec()
}

/// A workload the scheduler can place: exposes an identity and the
/// replica capacity it wants.
pub trait Schedulable {
    /// Stable identity of the workload (e.g. namespace/name)
    fn key(&self) -> &str;

    /// Desired number of virtual replicas
    fn desired_replicas(&self) -> u32;
}

/// Scheduler contract, implemented externally.
///
/// Only the output type and call shape are consumed here; the placement
/// algorithm is out of scope.
pub trait Scheduler: Send + Sync {
    /// Compute placements for the given workload
    fn schedule(&self, entity: &dyn Schedulable) -> Result<Vec<Placement>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Placement> {
        vec![
            Placement::new("pod-a", "default/source-1", 1),
            Placement::new("pod-b", "default/source-1", 2),
        ]
    }

    #[test]
    fn test_total_replicas() {
        assert_eq!(total_replicas(&sample()), 3);
        assert_eq!(total_replicas(&[]), 0);
    }

    #[test]
    fn test_placement_for_pod() {
        let placements = sample();
        let found = placement_for_pod(&placements, "pod-b").unwrap();
        assert_eq!(found.replicas, 2);
        assert!(placement_for_pod(&placements, "missing").is_none());
    }

    #[test]
    fn test_placement_for_pod_returns_first_match() {
        // Uniqueness is caller-enforced; with duplicates, list order wins
        let placements = vec![
            Placement::new("pod-a", "default/source-1", 1),
            Placement::new("pod-a", "default/source-1", 5),
        ];
        assert_eq!(placement_for_pod(&placements, "pod-a").unwrap().replicas, 1);
    }

    #[test]
    fn test_copy_is_independent() {
        let original = sample();
        let mut copy = copy_placements(&original);
        assert_eq!(copy, original);

        copy[0].replicas = 99;
        assert_eq!(original[0].replicas, 1);
    }
}
