//! Predicate evaluation over resource snapshots.
//!
//! Pure functions, no I/O. The waiter engine calls these once per poll
//! cycle against the snapshots the query adapter returned.

use crate::types::{Predicate, ResourceSnapshot};

/// Whether a single snapshot satisfies the predicate.
///
/// `ReadyCountMatchesDesired` requires the desired count to be known:
/// a snapshot with an unknown desired count is never satisfied, so a
/// transiently missing status field cannot produce a false positive.
/// A desired count of zero is satisfied by a ready count of zero.
pub fn satisfied(snapshot: &ResourceSnapshot, predicate: Predicate) -> bool {
    match predicate {
        Predicate::ReadyCountMatchesDesired => match snapshot.desired {
            Some(desired) => snapshot.exists && snapshot.ready == Some(desired),
            None => false,
        },
        Predicate::Absent => !snapshot.exists,
    }
}

/// Whether a full poll cycle's snapshot set satisfies the predicate.
///
/// For `Absent`, an empty set is satisfied: nothing matched, so the
/// target is gone. For `ReadyCountMatchesDesired`, an empty set is
/// not satisfied: a group with no observed resources yet cannot count
/// as ready.
pub fn all_satisfied(snapshots: &[ResourceSnapshot], predicate: Predicate) -> bool {
    match predicate {
        Predicate::ReadyCountMatchesDesired => {
            !snapshots.is_empty() && snapshots.iter().all(|s| satisfied(s, predicate))
        }
        Predicate::Absent => snapshots.iter().all(|s| satisfied(s, predicate)),
    }
}

/// Sum of ready and known-desired counts across a snapshot set, for
/// progress reporting.
pub fn totals(snapshots: &[ResourceSnapshot]) -> (u32, u32) {
    let ready = snapshots.iter().filter_map(|s| s.ready).sum();
    let desired = snapshots.iter().filter_map(|s| s.desired).sum();
    (ready, desired)
}
