//! Participant set
//!
//! Every coordinate table and every frame lists participants in ascending
//! id order, so the id must be derived identically on every node.

use braid_crypto::hash_blake3;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::{BraidError, Result};
use crate::types::{super_majority, trust_count, ParticipantId, PublicKey};

/// A member of the peer set
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    /// Stable id (first four bytes of BLAKE3(public key))
    pub id: ParticipantId,

    /// Signing key
    pub pub_key: PublicKey,

    /// Network address, opaque to consensus
    pub net_addr: String,
}

impl Peer {
    /// Create a peer, deriving its id from the public key
    pub fn new(pub_key: PublicKey, net_addr: impl Into<String>) -> Self {
        Self {
            id: Self::id_for(&pub_key),
            pub_key,
            net_addr: net_addr.into(),
        }
    }

    /// Id derived from a public key
    pub fn id_for(pub_key: &PublicKey) -> ParticipantId {
        let digest = hash_blake3(pub_key.as_bytes());
        u32::from_le_bytes([digest[0], digest[1], digest[2], digest[3]])
    }
}

/// The fixed peer set consensus runs over
#[derive(Clone, Debug, Default)]
pub struct Participants {
    by_id: BTreeMap<ParticipantId, Peer>,
    by_pub_key: HashMap<PublicKey, ParticipantId>,
}

impl Participants {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list of peers
    pub fn from_peers(peers: impl IntoIterator<Item = Peer>) -> Result<Self> {
        let mut participants = Self::new();
        for peer in peers {
            participants.add(peer)?;
        }
        Ok(participants)
    }

    /// Add a peer; ids and keys must be unique
    pub fn add(&mut self, peer: Peer) -> Result<()> {
        if self.by_id.contains_key(&peer.id) || self.by_pub_key.contains_key(&peer.pub_key) {
            return Err(BraidError::InvalidInput(format!(
                "duplicate participant {} (id {})",
                peer.pub_key, peer.id
            )));
        }
        self.by_pub_key.insert(peer.pub_key, peer.id);
        self.by_id.insert(peer.id, peer);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    pub fn by_id(&self, id: ParticipantId) -> Option<&Peer> {
        self.by_id.get(&id)
    }

    pub fn by_pub_key(&self, pub_key: &PublicKey) -> Option<&Peer> {
        self.by_pub_key.get(pub_key).and_then(|id| self.by_id.get(id))
    }

    /// Id of a participant, or `UnknownParticipant`
    pub fn id_of(&self, pub_key: &PublicKey) -> Result<ParticipantId> {
        self.by_pub_key
            .get(pub_key)
            .copied()
            .ok_or_else(|| BraidError::UnknownParticipant(pub_key.to_hex()))
    }

    /// Ids in ascending order
    pub fn ids(&self) -> Vec<ParticipantId> {
        self.by_id.keys().copied().collect()
    }

    /// Peers in ascending id order
    pub fn peers(&self) -> impl Iterator<Item = &Peer> {
        self.by_id.values()
    }

    /// Public keys in ascending id order
    pub fn pub_keys(&self) -> Vec<PublicKey> {
        self.by_id.values().map(|p| p.pub_key).collect()
    }

    pub fn super_majority(&self) -> usize {
        super_majority(self.len())
    }

    pub fn trust_count(&self) -> usize {
        trust_count(self.len())
    }
}
