//! Frames - the snapshot of one received round
//!
//! A frame is enough to restart an engine at its round: the roots give each
//! participant's checkpoint and the frame events carry the consensus values
//! (round, lamport timestamp, witness flag) they were assigned, so they can
//! be reinserted without their history.

use braid_crypto::IncrementalHasher;
use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::root::Root;

/// An event together with the consensus values it was assigned
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameEvent {
    pub core: Event,
    pub round: i64,
    pub lamport_timestamp: i64,
    pub witness: bool,
}

impl FrameEvent {
    pub fn transactions(&self) -> &[Vec<u8>] {
        self.core.transactions()
    }
}

/// Roots (ascending participant id) plus the events received in `round`,
/// in consensus order
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub round: i64,
    pub roots: Vec<Root>,
    pub events: Vec<FrameEvent>,
}

impl Frame {
    pub fn new(round: i64, roots: Vec<Root>, events: Vec<FrameEvent>) -> Self {
        Self { round, roots, events }
    }

    /// Digest over round, roots and event contents.
    ///
    /// Node-local annotations (topological index, coordinate tables) are
    /// excluded; every node derives the same hash for the same frame.
    pub fn hash(&self) -> [u8; 32] {
        let mut hasher = IncrementalHasher::new();
        hasher
            .update_i64(self.round)
            .update_u64(self.roots.len() as u64);
        for root in &self.roots {
            root.hash_into(&mut hasher);
        }
        hasher.update_u64(self.events.len() as u64);
        for event in &self.events {
            hasher
                .update(event.core.hash().as_bytes())
                .update_bytes(event.core.signature())
                .update_i64(event.round)
                .update_i64(event.lamport_timestamp)
                .update(&[event.witness as u8]);
        }
        hasher.finalize()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventHash;
    use braid_crypto::KeyPair;

    fn frame_event(seed: u8) -> FrameEvent {
        FrameEvent {
            core: signed_event(seed),
            round: 0,
            lamport_timestamp: 0,
            witness: true,
        }
    }

    fn signed_event(seed: u8) -> Event {
        let kp = KeyPair::from_seed([seed; 32]);
        let mut ev = Event::new(
            vec![vec![seed]],
            vec![],
            EventHash::root_marker(seed as u32),
            None,
            kp.public_key(),
            0,
        );
        ev.sign(&kp);
        ev
    }

    #[test]
    fn test_hash_ignores_local_annotations() {
        let ev = frame_event(1);
        let mut annotated = ev.clone();
        annotated.core.set_round(3);
        annotated.core.set_topological_index(12);

        let a = Frame::new(2, vec![Root::base(1)], vec![ev.clone()]);
        let b = Frame::new(2, vec![Root::base(1)], vec![annotated]);
        assert_eq!(a.hash(), b.hash());

        let mut promoted = ev;
        promoted.round = 1;
        let c = Frame::new(2, vec![Root::base(1)], vec![promoted]);
        assert_ne!(a.hash(), c.hash());
    }

    #[test]
    fn test_hash_depends_on_order_and_roots() {
        let (x, y) = (frame_event(1), frame_event(2));
        let a = Frame::new(2, vec![Root::base(1)], vec![x.clone(), y.clone()]);
        let b = Frame::new(2, vec![Root::base(1)], vec![y, x.clone()]);
        assert_ne!(a.hash(), b.hash());

        let c = Frame::new(2, vec![Root::base(2)], vec![x]);
        let d = Frame::new(2, vec![Root::base(1)], c.events.clone());
        assert_ne!(c.hash(), d.hash());
    }
}
