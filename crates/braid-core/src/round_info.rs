//! Per-round bookkeeping for fame decisions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::EventHash;

/// Three-valued fame
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trilean {
    #[default]
    Undefined,
    True,
    False,
}

impl From<bool> for Trilean {
    fn from(value: bool) -> Self {
        if value {
            Trilean::True
        } else {
            Trilean::False
        }
    }
}

/// Status of one event within its round
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundEvent {
    pub witness: bool,
    pub famous: Trilean,
}

/// Everything known about one round
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundInfo {
    /// Events assigned this round, witnesses flagged
    events: BTreeMap<EventHash, RoundEvent>,

    /// Events whose round-received is this round, in discovery order
    consensus_events: Vec<EventHash>,

    /// Whether the round has been scheduled for fame decision
    queued: bool,
}

impl RoundInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an event in this round (first insertion wins)
    pub fn add_event(&mut self, hash: EventHash, witness: bool) {
        self.events.entry(hash).or_insert(RoundEvent {
            witness,
            famous: Trilean::Undefined,
        });
    }

    /// Record a witness whose fame is already known
    pub fn add_decided_witness(&mut self, hash: EventHash, famous: bool) {
        self.events.insert(
            hash,
            RoundEvent {
                witness: true,
                famous: famous.into(),
            },
        );
    }

    /// Set a witness's fame; non-witnesses are ignored
    pub fn set_fame(&mut self, hash: &EventHash, famous: bool) {
        if let Some(event) = self.events.get_mut(hash) {
            if event.witness {
                event.famous = famous.into();
            }
        }
    }

    pub fn set_consensus_event(&mut self, hash: EventHash) {
        if !self.consensus_events.contains(&hash) {
            self.consensus_events.push(hash);
        }
    }

    pub fn consensus_events(&self) -> &[EventHash] {
        &self.consensus_events
    }

    pub fn is_queued(&self) -> bool {
        self.queued
    }

    pub fn set_queued(&mut self) {
        self.queued = true;
    }

    pub fn fame(&self, hash: &EventHash) -> Trilean {
        self.events
            .get(hash)
            .map(|e| e.famous)
            .unwrap_or_default()
    }

    /// Witness hashes in ascending hash order
    pub fn witnesses(&self) -> Vec<EventHash> {
        self.events
            .iter()
            .filter(|(_, e)| e.witness)
            .map(|(h, _)| *h)
            .collect()
    }

    pub fn famous_witnesses(&self) -> Vec<EventHash> {
        self.events
            .iter()
            .filter(|(_, e)| e.witness && e.famous == Trilean::True)
            .map(|(h, _)| *h)
            .collect()
    }

    /// True when `hash` is a witness whose fame is settled
    pub fn is_decided(&self, hash: &EventHash) -> bool {
        self.events
            .get(hash)
            .map(|e| e.witness && e.famous != Trilean::Undefined)
            .unwrap_or(false)
    }

    /// True when every witness of the round has a settled fame
    pub fn witnesses_decided(&self) -> bool {
        self.events
            .values()
            .all(|e| !e.witness || e.famous != Trilean::Undefined)
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }
}

/// Entry of the pending-round queue
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingRound {
    pub index: i64,
    pub decided: bool,
}
