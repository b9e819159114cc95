//! Round assignment
//!
//! ```text
//!   round(x)   = max(round(self_parent), round(other_parent))
//!                + 1 if x strongly sees a supermajority of that round's witnesses
//!   witness(x) = round(x) > round(self_parent)
//!   lamport(x) = max(lamport(self_parent), lamport(other_parent)) + 1
//! ```
//!
//! Parents that lie behind a root resolve through the root: its self-parent
//! marker for the self-parent, its `others` map for the other-parent. An
//! event attached directly to its root whose other-parent is absent or
//! recorded in the root takes the root's `next_round`.

use braid_core::{constants, BraidError, Event, EventHash, PendingRound, Result, RoundInfo};
use tracing::debug;

use crate::hashgraph::Hashgraph;

impl Hashgraph {
    /// Assign round, witness flag and lamport timestamp to every
    /// undetermined event that lacks them
    pub fn divide_rounds(&mut self) -> Result<()> {
        let undetermined = self.undetermined_events.clone();
        for hash in undetermined {
            let mut event = self.store.get_event(&hash)?;
            let mut updated = false;

            if event.round().is_none() {
                let round = self.round(&hash)?;
                let witness = self.witness(&hash)?;
                self.record_in_round(hash, round, witness)?;
                event.set_round(round);
                updated = true;
            }

            if event.lamport_timestamp().is_none() {
                let lamport = self.lamport_timestamp(&hash)?;
                event.set_lamport_timestamp(lamport);
                updated = true;
            }

            if updated {
                self.store.set_event(event)?;
            }
        }
        Ok(())
    }

    fn record_in_round(&mut self, hash: EventHash, round: i64, witness: bool) -> Result<()> {
        let mut info = match self.store.get_round(round) {
            Ok(info) => info,
            Err(e) if e.is_not_found() => RoundInfo::new(),
            Err(e) => return Err(e),
        };

        let committed = self
            .last_consensus_round
            .map_or(false, |last| round <= last);
        if witness && committed {
            // Fame of a committed round is final
            debug!(event = %hash, round, "Late witness recorded as not famous");
            info.add_decided_witness(hash, false);
        } else {
            info.add_event(hash, witness);
        }

        let eligible = self
            .last_consensus_round
            .map_or(true, |last| round >= last);
        if !info.is_queued() && eligible {
            info.set_queued();
            self.enqueue_pending_round(round);
        }

        self.store.set_round(round, info)
    }

    /// Insert keeping the queue sorted by round
    fn enqueue_pending_round(&mut self, round: i64) {
        if self.pending_rounds.iter().any(|p| p.index == round) {
            return;
        }
        let position = self
            .pending_rounds
            .iter()
            .position(|p| p.index > round)
            .unwrap_or(self.pending_rounds.len());
        self.pending_rounds.insert(
            position,
            PendingRound {
                index: round,
                decided: false,
            },
        );
    }

    pub fn round(&mut self, hash: &EventHash) -> Result<i64> {
        if let Some(round) = self.caches.round.get(hash) {
            return Ok(*round);
        }
        let event = self.store.get_event(hash)?;
        let round = match event.round() {
            Some(round) => round,
            None => self.compute_round(&event)?,
        };
        self.caches.round.insert(*hash, round);
        Ok(round)
    }

    fn compute_round(&mut self, event: &Event) -> Result<i64> {
        let hash = event.hash();
        let attached = self
            .roots_by_self_parent
            .get(event.self_parent())
            .map(|root| {
                let authoritative = match event.other_parent() {
                    None => true,
                    Some(op) => root.other_for(&hash, op).is_some(),
                };
                (root.next_round, root.self_parent.round, authoritative)
            });

        let self_parent_round = match attached {
            Some((next_round, _, true)) => return Ok(next_round),
            Some((_, marker_round, false)) => marker_round,
            None => self.round(event.self_parent())?,
        };

        let other_parent_round = match event.other_parent() {
            None => constants::ROOT_SENTINEL,
            Some(op) => match self.store.get_event(op) {
                Ok(_) => self.round(op)?,
                Err(e) if e.is_not_found() => {
                    self.store
                        .get_root(event.creator())?
                        .other_for(&hash, op)
                        .ok_or(BraidError::UnknownParent(*op))?
                        .round
                }
                Err(e) => return Err(e),
            },
        };

        let parent_round = self_parent_round.max(other_parent_round);
        let mut strongly_seen = 0;
        for witness in self.store.round_witnesses(parent_round) {
            if self.strongly_see(&hash, &witness)? {
                strongly_seen += 1;
            }
        }

        if strongly_seen >= self.participants.super_majority() {
            Ok(parent_round + 1)
        } else {
            Ok(parent_round)
        }
    }

    /// First event of its creator in its round
    pub fn witness(&mut self, hash: &EventHash) -> Result<bool> {
        let event = self.store.get_event(hash)?;
        let round = self.round(hash)?;
        let self_parent_round = match self.roots_by_self_parent.get(event.self_parent()) {
            Some(root) => root.self_parent.round,
            None => self.round(event.self_parent())?,
        };
        Ok(round > self_parent_round)
    }

    pub fn lamport_timestamp(&mut self, hash: &EventHash) -> Result<i64> {
        if let Some(lamport) = self.caches.lamport.get(hash) {
            return Ok(*lamport);
        }
        let event = self.store.get_event(hash)?;
        let lamport = match event.lamport_timestamp() {
            Some(lamport) => lamport,
            None => self.compute_lamport_timestamp(&event)?,
        };
        self.caches.lamport.insert(*hash, lamport);
        Ok(lamport)
    }

    fn compute_lamport_timestamp(&mut self, event: &Event) -> Result<i64> {
        let marker = self
            .roots_by_self_parent
            .get(event.self_parent())
            .map(|root| root.self_parent.lamport_timestamp);
        let self_parent_lamport = match marker {
            Some(lamport) => lamport,
            None => self.lamport_timestamp(event.self_parent())?,
        };

        let other_parent_lamport = match event.other_parent() {
            None => constants::ROOT_SENTINEL,
            Some(op) => match self.store.get_event(op) {
                Ok(_) => self.lamport_timestamp(op)?,
                Err(e) if e.is_not_found() => {
                    self.store
                        .get_root(event.creator())?
                        .other_for(&event.hash(), op)
                        .ok_or(BraidError::UnknownParent(*op))?
                        .lamport_timestamp
                }
                Err(e) => return Err(e),
            },
        };

        Ok(self_parent_lamport.max(other_parent_lamport) + 1)
    }
}
