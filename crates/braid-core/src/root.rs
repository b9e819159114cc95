//! Roots - per-participant checkpoints
//!
//! A root stands in for the part of a participant's history that is not held
//! locally. It describes the event immediately preceding the checkpoint (the
//! self-parent marker), the round to give the first event built on it, and
//! descriptors of other-parents that lie outside the checkpointed set.
//!
//! ```text
//!     ┌────────── Root(P) ───────────┐
//!     │ self_parent: (h, P, i, lt, r) │◄── first event of P after the checkpoint
//!     │ next_round:  r'               │
//!     │ others: { ev -> (h', Q, ...) }│◄── other-parents outside the frame
//!     └───────────────────────────────┘
//! ```

use braid_crypto::IncrementalHasher;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::{constants, EventHash, ParticipantId};

/// Compact descriptor of an event referenced by a root
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RootEvent {
    pub hash: EventHash,
    pub creator_id: ParticipantId,
    pub index: i64,
    pub lamport_timestamp: i64,
    pub round: i64,
}

impl RootEvent {
    /// Self-parent marker of a genesis root
    pub fn base(creator_id: ParticipantId) -> Self {
        Self {
            hash: EventHash::root_marker(creator_id),
            creator_id,
            index: constants::ROOT_SENTINEL,
            lamport_timestamp: constants::ROOT_SENTINEL,
            round: constants::ROOT_SENTINEL,
        }
    }

    fn hash_into(&self, hasher: &mut IncrementalHasher) {
        hasher
            .update(self.hash.as_bytes())
            .update_u64(self.creator_id as u64)
            .update_i64(self.index)
            .update_i64(self.lamport_timestamp)
            .update_i64(self.round);
    }
}

/// Checkpoint for one participant
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Root {
    /// Round of the first event attached directly to this root
    pub next_round: i64,

    /// Event immediately preceding the checkpoint
    pub self_parent: RootEvent,

    /// Event hash -> descriptor of its other-parent outside the checkpoint
    pub others: BTreeMap<EventHash, RootEvent>,
}

impl Root {
    /// Genesis root: empty history, next round 0
    pub fn base(creator_id: ParticipantId) -> Self {
        Self {
            next_round: 0,
            self_parent: RootEvent::base(creator_id),
            others: BTreeMap::new(),
        }
    }

    /// Other-parent descriptor for `event`, if it matches `other_parent`
    pub fn other_for(&self, event: &EventHash, other_parent: &EventHash) -> Option<&RootEvent> {
        self.others
            .get(event)
            .filter(|other| other.hash == *other_parent)
    }

    pub(crate) fn hash_into(&self, hasher: &mut IncrementalHasher) {
        hasher.update_i64(self.next_round);
        self.self_parent.hash_into(hasher);
        hasher.update_u64(self.others.len() as u64);
        for (event, other) in &self.others {
            hasher.update(event.as_bytes());
            other.hash_into(hasher);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_root() {
        let root = Root::base(42);
        assert_eq!(root.next_round, 0);
        assert_eq!(root.self_parent.index, -1);
        assert_eq!(root.self_parent.round, -1);
        assert_eq!(root.self_parent.lamport_timestamp, -1);
        assert_eq!(root.self_parent.hash, EventHash::root_marker(42));
        assert!(root.others.is_empty());
    }

    #[test]
    fn test_other_for_requires_matching_parent() {
        let mut root = Root::base(1);
        let ev = EventHash::new([1u8; 32]);
        let op = EventHash::new([2u8; 32]);
        root.others.insert(
            ev,
            RootEvent {
                hash: op,
                creator_id: 2,
                index: 4,
                lamport_timestamp: 9,
                round: 2,
            },
        );
        assert!(root.other_for(&ev, &op).is_some());
        assert!(root.other_for(&ev, &EventHash::new([3u8; 32])).is_none());
        assert!(root.other_for(&op, &op).is_none());
    }
}
