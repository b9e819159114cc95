//! Core type definitions for Braid
//!
//! Identifiers and protocol thresholds shared by every other module.

use braid_crypto::{hash_concat, CryptoError};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use braid_crypto::PublicKey;

/// Stable integer identifier of a participant, derived from its public key
pub type ParticipantId = u32;

/// EventHash - content hash identifying an event
///
/// EventHash = BLAKE3(creator || parents || transactions || signatures || timestamp || index)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct EventHash {
    /// 256-bit BLAKE3 hash
    hash: [u8; 32],
}

impl EventHash {
    /// Create a new EventHash from raw bytes
    pub fn new(hash: [u8; 32]) -> Self {
        Self { hash }
    }

    /// Pseudo-hash naming the self-parent marker of a participant's base root
    pub fn root_marker(creator_id: ParticipantId) -> Self {
        Self::new(hash_concat(&[b"braid-root", &creator_id.to_le_bytes()]))
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.hash
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.hash)
    }

    /// Parse from hex string
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        let hash: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidHex("expected 32 bytes".to_string()))?;
        Ok(Self { hash })
    }

    /// Middle byte of the hash, read as a bit: `false` iff it is zero.
    ///
    /// Deterministic pseudo-random vote used in coin rounds. The selection
    /// rule is part of the protocol and must not change.
    pub fn middle_bit(&self) -> bool {
        self.hash[self.hash.len() / 2] != 0
    }
}

impl fmt::Debug for EventHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for EventHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

/// Smallest number of participants that forms a supermajority: ⌊2n/3⌋ + 1
pub fn super_majority(participants: usize) -> usize {
    2 * participants / 3 + 1
}

/// ⌈n/3⌉: a block signed by more validators than this can anchor a fast-sync
pub fn trust_count(participants: usize) -> usize {
    participants.div_ceil(3)
}

/// Protocol constants
pub mod constants {
    /// Index, round and lamport timestamp of a base root's self-parent marker
    pub const ROOT_SENTINEL: i64 = -1;

    /// Last-ancestor index meaning "no event from this participant"
    pub const NO_ANCESTOR: i64 = -1;

    /// First-descendant index meaning "no descendant from this participant yet"
    pub const NO_DESCENDANT: i64 = i64::MAX;
}
