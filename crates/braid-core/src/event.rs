//! Events - nodes of the gossip DAG
//!
//! An event has immutable signed content ([`EventBody`] + signature) and
//! local consensus annotations (round, lamport timestamp, round received,
//! topological index, coordinate tables). Only the content travels on the
//! wire or into logs; annotations are recomputed by each engine.
//!
//! ```text
//!   self-parent ──┐   ┌── other-parent
//!                 ▼   ▼
//!               ┌───────┐
//!               │ event │  last_ancestors[p]    = latest event of p it reaches
//!               └───────┘  first_descendants[p] = earliest event of p reaching it
//! ```

use braid_crypto::{verify, IncrementalHasher, KeyPair};
use serde::{Deserialize, Serialize};

use crate::block::{BlockSignature, WireBlockSignature};
use crate::error::{BraidError, Result};
use crate::types::{EventHash, ParticipantId, PublicKey};

// ============================================================================
// Coordinates
// ============================================================================

/// Position of an event in its creator's sequence
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventCoordinates {
    /// `None` for the sentinels (no ancestor / no descendant yet)
    pub hash: Option<EventHash>,
    pub index: i64,
}

/// One participant's slot in a coordinate table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinateEntry {
    pub participant_id: ParticipantId,
    pub event: EventCoordinates,
}

/// Coordinates per participant, in ascending participant-id order
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinateTable(Vec<CoordinateEntry>);

impl CoordinateTable {
    /// Table with the same coordinates for every participant
    pub fn filled(ids: &[ParticipantId], index: i64) -> Self {
        Self(
            ids.iter()
                .map(|&participant_id| CoordinateEntry {
                    participant_id,
                    event: EventCoordinates { hash: None, index },
                })
                .collect(),
        )
    }

    pub fn get_by_id(&self, id: ParticipantId) -> Option<&EventCoordinates> {
        self.0
            .iter()
            .find(|entry| entry.participant_id == id)
            .map(|entry| &entry.event)
    }

    /// Overwrite the slot of `id`; false if the table has no such slot
    pub fn set_by_id(&mut self, id: ParticipantId, event: EventCoordinates) -> bool {
        match self.0.iter_mut().find(|entry| entry.participant_id == id) {
            Some(entry) => {
                entry.event = event;
                true
            }
            None => false,
        }
    }

    /// Keep, per slot, whichever of the two entries has the higher index
    pub fn merge_max(&mut self, other: &CoordinateTable) {
        for (mine, theirs) in self.0.iter_mut().zip(other.0.iter()) {
            if mine.event.index < theirs.event.index {
                mine.event = theirs.event;
            }
        }
    }

    pub fn entries(&self) -> &[CoordinateEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ============================================================================
// Event body
// ============================================================================

/// Signed content of an event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBody {
    /// Opaque application payloads
    pub transactions: Vec<Vec<u8>>,

    /// Block signatures piggybacked on this event
    pub block_signatures: Vec<BlockSignature>,

    /// Creator's previous event, or its root marker
    pub self_parent: EventHash,

    /// Event from another participant, if any
    pub other_parent: Option<EventHash>,

    /// Creator's public key
    pub creator: PublicKey,

    /// Position in the creator's sequence (0 for the first event)
    pub index: i64,

    /// Creation time, UTC milliseconds
    pub timestamp: i64,
}

impl EventBody {
    /// Content hash
    pub fn hash(&self) -> EventHash {
        let mut hasher = IncrementalHasher::new();
        hasher
            .update(self.creator.as_bytes())
            .update(self.self_parent.as_bytes());
        match &self.other_parent {
            Some(op) => hasher.update(&[1]).update(op.as_bytes()),
            None => hasher.update(&[0]),
        };
        hasher.update_u64(self.transactions.len() as u64);
        for tx in &self.transactions {
            hasher.update_bytes(tx);
        }
        hasher.update_u64(self.block_signatures.len() as u64);
        for bs in &self.block_signatures {
            hasher
                .update(bs.validator.as_bytes())
                .update_i64(bs.index)
                .update_bytes(&bs.signature);
        }
        hasher.update_i64(self.timestamp).update_i64(self.index);
        EventHash::new(hasher.finalize())
    }
}

// ============================================================================
// Wire format
// ============================================================================

/// Integer parent coordinates used on the wire instead of hashes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireInfo {
    pub creator_id: ParticipantId,
    pub self_parent_index: i64,
    pub other_parent: Option<WireParent>,
}

/// Other-parent reference by (creator id, index)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireParent {
    pub creator_id: ParticipantId,
    pub index: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireBody {
    pub transactions: Vec<Vec<u8>>,
    pub block_signatures: Vec<WireBlockSignature>,
    pub creator_id: ParticipantId,
    pub index: i64,
    pub self_parent_index: i64,
    pub other_parent: Option<WireParent>,
    pub timestamp: i64,
}

/// Compact event representation exchanged between nodes
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEvent {
    pub body: WireBody,
    pub signature: Vec<u8>,
}

// ============================================================================
// Event
// ============================================================================

/// Serialized form of an event: content and signature only
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignedEvent {
    pub body: EventBody,
    pub signature: Vec<u8>,
}

/// A DAG node with its consensus annotations
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(from = "SignedEvent", into = "SignedEvent")]
pub struct Event {
    body: EventBody,
    signature: Vec<u8>,
    hash: EventHash,

    round: Option<i64>,
    lamport_timestamp: Option<i64>,
    round_received: Option<i64>,
    topological_index: u64,
    last_ancestors: CoordinateTable,
    first_descendants: CoordinateTable,
    wire_info: Option<WireInfo>,
}

impl From<SignedEvent> for Event {
    fn from(signed: SignedEvent) -> Self {
        let mut event = Event::from_body(signed.body);
        event.signature = signed.signature;
        event
    }
}

impl From<Event> for SignedEvent {
    fn from(event: Event) -> Self {
        SignedEvent {
            body: event.body,
            signature: event.signature,
        }
    }
}

impl Event {
    /// Create an unsigned event stamped with the current time
    pub fn new(
        transactions: Vec<Vec<u8>>,
        block_signatures: Vec<BlockSignature>,
        self_parent: EventHash,
        other_parent: Option<EventHash>,
        creator: PublicKey,
        index: i64,
    ) -> Self {
        Self::from_body(EventBody {
            transactions,
            block_signatures,
            self_parent,
            other_parent,
            creator,
            index,
            timestamp: chrono::Utc::now().timestamp_millis(),
        })
    }

    /// Wrap a body; the signature is left empty
    pub fn from_body(body: EventBody) -> Self {
        let hash = body.hash();
        Self {
            body,
            signature: Vec::new(),
            hash,
            round: None,
            lamport_timestamp: None,
            round_received: None,
            topological_index: 0,
            last_ancestors: CoordinateTable::default(),
            first_descendants: CoordinateTable::default(),
            wire_info: None,
        }
    }

    /// Same content and signature, all local annotations cleared
    pub fn without_annotations(&self) -> Self {
        SignedEvent {
            body: self.body.clone(),
            signature: self.signature.clone(),
        }
        .into()
    }

    pub fn hash(&self) -> EventHash {
        self.hash
    }

    pub fn body(&self) -> &EventBody {
        &self.body
    }

    pub fn creator(&self) -> &PublicKey {
        &self.body.creator
    }

    pub fn self_parent(&self) -> &EventHash {
        &self.body.self_parent
    }

    pub fn other_parent(&self) -> Option<&EventHash> {
        self.body.other_parent.as_ref()
    }

    pub fn index(&self) -> i64 {
        self.body.index
    }

    pub fn timestamp(&self) -> i64 {
        self.body.timestamp
    }

    pub fn transactions(&self) -> &[Vec<u8>] {
        &self.body.transactions
    }

    pub fn block_signatures(&self) -> &[BlockSignature] {
        &self.body.block_signatures
    }

    /// True if the event carries a payload worth committing
    pub fn is_loaded(&self) -> bool {
        !self.body.transactions.is_empty() || !self.body.block_signatures.is_empty()
    }

    // === Signature ===

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Sign the content hash with the creator's key
    pub fn sign(&mut self, keypair: &KeyPair) {
        self.signature = keypair.sign(self.hash.as_bytes());
    }

    /// Verify the signature against the creator's key
    pub fn verify(&self) -> Result<bool> {
        Ok(verify(&self.body.creator, self.hash.as_bytes(), &self.signature)?)
    }

    // === Consensus annotations ===

    pub fn round(&self) -> Option<i64> {
        self.round
    }

    pub fn set_round(&mut self, round: i64) {
        self.round = Some(round);
    }

    pub fn lamport_timestamp(&self) -> Option<i64> {
        self.lamport_timestamp
    }

    pub fn set_lamport_timestamp(&mut self, lamport_timestamp: i64) {
        self.lamport_timestamp = Some(lamport_timestamp);
    }

    pub fn round_received(&self) -> Option<i64> {
        self.round_received
    }

    pub fn set_round_received(&mut self, round_received: i64) {
        self.round_received = Some(round_received);
    }

    pub fn topological_index(&self) -> u64 {
        self.topological_index
    }

    pub fn set_topological_index(&mut self, index: u64) {
        self.topological_index = index;
    }

    pub fn last_ancestors(&self) -> &CoordinateTable {
        &self.last_ancestors
    }

    pub fn first_descendants(&self) -> &CoordinateTable {
        &self.first_descendants
    }

    /// Install freshly computed coordinate tables
    pub fn set_coordinates(&mut self, last_ancestors: CoordinateTable, first_descendants: CoordinateTable) {
        self.last_ancestors = last_ancestors;
        self.first_descendants = first_descendants;
    }

    /// Record the first descendant created by `participant`, unless one is
    /// already known. Returns whether the table changed.
    pub fn set_first_descendant(&mut self, participant: ParticipantId, event: EventCoordinates) -> bool {
        match self.first_descendants.get_by_id(participant) {
            Some(existing) if existing.hash.is_none() => {
                self.first_descendants.set_by_id(participant, event)
            }
            _ => false,
        }
    }

    // === Wire ===

    pub fn wire_info(&self) -> Option<&WireInfo> {
        self.wire_info.as_ref()
    }

    pub fn set_wire_info(&mut self, info: WireInfo) {
        self.wire_info = Some(info);
    }

    /// Compact form for gossip; requires wire info
    pub fn to_wire(&self) -> Result<WireEvent> {
        let info = self
            .wire_info
            .ok_or(BraidError::MissingWireInfo(self.hash))?;
        Ok(WireEvent {
            body: WireBody {
                transactions: self.body.transactions.clone(),
                block_signatures: self
                    .body
                    .block_signatures
                    .iter()
                    .map(BlockSignature::to_wire)
                    .collect(),
                creator_id: info.creator_id,
                index: self.body.index,
                self_parent_index: info.self_parent_index,
                other_parent: info.other_parent,
                timestamp: self.body.timestamp,
            },
            signature: self.signature.clone(),
        })
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.signature == other.signature
    }
}

impl Eq for Event {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::constants;

    fn keypair() -> KeyPair {
        KeyPair::from_seed([1u8; 32])
    }

    fn event(kp: &KeyPair) -> Event {
        Event::new(
            vec![b"abc".to_vec()],
            vec![],
            EventHash::root_marker(1),
            None,
            kp.public_key(),
            0,
        )
    }

    #[test]
    fn test_sign_and_verify() {
        let kp = keypair();
        let mut ev = event(&kp);
        ev.sign(&kp);
        assert!(ev.verify().unwrap());

        let other = KeyPair::from_seed([2u8; 32]);
        ev.sign(&other);
        assert!(!ev.verify().unwrap());
    }

    #[test]
    fn test_unsigned_event_fails_verification() {
        let ev = event(&keypair());
        assert!(ev.verify().is_err());
    }

    #[test]
    fn test_hash_covers_content() {
        let kp = keypair();
        let a = event(&kp);
        let mut body = a.body().clone();
        body.transactions.push(b"more".to_vec());
        assert_ne!(Event::from_body(body).hash(), a.hash());

        let mut body = a.body().clone();
        body.other_parent = Some(EventHash::new([3u8; 32]));
        assert_ne!(Event::from_body(body).hash(), a.hash());
    }

    #[test]
    fn test_serde_drops_annotations() {
        let kp = keypair();
        let mut ev = event(&kp);
        ev.sign(&kp);
        ev.set_round(4);
        ev.set_topological_index(9);

        let bytes = bincode::serialize(&ev).unwrap();
        let back: Event = bincode::deserialize(&bytes).unwrap();
        assert_eq!(back.hash(), ev.hash());
        assert_eq!(back.round(), None);
        assert_eq!(back.topological_index(), 0);
        assert!(back.verify().unwrap());
    }

    #[test]
    fn test_first_descendant_set_once() {
        let mut ev = event(&keypair());
        let ids = [1, 2];
        ev.set_coordinates(
            CoordinateTable::filled(&ids, constants::NO_ANCESTOR),
            CoordinateTable::filled(&ids, constants::NO_DESCENDANT),
        );
        let first = EventCoordinates {
            hash: Some(EventHash::new([7u8; 32])),
            index: 3,
        };
        let later = EventCoordinates {
            hash: Some(EventHash::new([8u8; 32])),
            index: 4,
        };
        assert!(ev.set_first_descendant(2, first));
        assert!(!ev.set_first_descendant(2, later));
        assert_eq!(ev.first_descendants().get_by_id(2), Some(&first));
        assert!(!ev.set_first_descendant(9, first));
    }

    #[test]
    fn test_merge_max() {
        let ids = [1, 2, 3];
        let mut a = CoordinateTable::filled(&ids, -1);
        let mut b = CoordinateTable::filled(&ids, -1);
        a.set_by_id(1, EventCoordinates { hash: None, index: 5 });
        b.set_by_id(1, EventCoordinates { hash: None, index: 2 });
        b.set_by_id(3, EventCoordinates { hash: None, index: 7 });
        a.merge_max(&b);
        assert_eq!(a.get_by_id(1).unwrap().index, 5);
        assert_eq!(a.get_by_id(2).unwrap().index, -1);
        assert_eq!(a.get_by_id(3).unwrap().index, 7);
    }

    #[test]
    fn test_to_wire_requires_info() {
        let kp = keypair();
        let mut ev = event(&kp);
        assert!(matches!(ev.to_wire(), Err(BraidError::MissingWireInfo(_))));
        ev.set_wire_info(WireInfo {
            creator_id: 1,
            self_parent_index: -1,
            other_parent: None,
        });
        let wire = ev.to_wire().unwrap();
        assert_eq!(wire.body.index, 0);
        assert_eq!(wire.body.timestamp, ev.timestamp());
    }
}
