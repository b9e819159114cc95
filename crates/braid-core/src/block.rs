//! Blocks - the unit of committed output
//!
//! A block packages the transactions of one frame in consensus order.
//! Its body is immutable once created; validator signatures accumulate on it
//! afterwards and travel inside events as [`BlockSignature`] records.

use braid_crypto::{verify, IncrementalHasher, KeyPair};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::frame::Frame;
use crate::types::PublicKey;

/// A validator's signature over a block hash
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSignature {
    /// Signing validator
    pub validator: PublicKey,

    /// Index of the signed block
    pub index: i64,

    /// Ed25519 signature over the block hash
    pub signature: Vec<u8>,
}

impl BlockSignature {
    /// Wire form; the validator is implied by the carrying event's creator
    pub fn to_wire(&self) -> WireBlockSignature {
        WireBlockSignature {
            index: self.index,
            signature: self.signature.clone(),
        }
    }
}

/// Block signature as carried on the wire
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireBlockSignature {
    pub index: i64,
    pub signature: Vec<u8>,
}

impl WireBlockSignature {
    pub fn into_signature(self, validator: PublicKey) -> BlockSignature {
        BlockSignature {
            validator,
            index: self.index,
            signature: self.signature,
        }
    }
}

/// Immutable block content
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockBody {
    /// Sequential block index, starting at 0
    pub index: i64,

    /// Round in which the block's events were received
    pub round_received: i64,

    /// Hash of the frame the block was built from
    pub frame_hash: [u8; 32],

    /// Transactions in consensus order
    pub transactions: Vec<Vec<u8>>,
}

impl BlockBody {
    /// BLAKE3 digest of the body
    pub fn hash(&self) -> [u8; 32] {
        let mut hasher = IncrementalHasher::new();
        hasher
            .update_i64(self.index)
            .update_i64(self.round_received)
            .update(&self.frame_hash)
            .update_u64(self.transactions.len() as u64);
        for tx in &self.transactions {
            hasher.update_bytes(tx);
        }
        hasher.finalize()
    }
}

/// A committed block
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub body: BlockBody,

    /// Validator hex key -> signature
    pub signatures: BTreeMap<String, Vec<u8>>,
}

impl Block {
    pub fn new(
        index: i64,
        round_received: i64,
        frame_hash: [u8; 32],
        transactions: Vec<Vec<u8>>,
    ) -> Self {
        Self {
            body: BlockBody {
                index,
                round_received,
                frame_hash,
                transactions,
            },
            signatures: BTreeMap::new(),
        }
    }

    /// Build a block from a frame: transactions concatenated in frame order
    pub fn from_frame(index: i64, frame: &Frame) -> Self {
        let transactions = frame
            .events
            .iter()
            .flat_map(|e| e.transactions().iter().cloned())
            .collect();
        Self::new(index, frame.round, frame.hash(), transactions)
    }

    pub fn index(&self) -> i64 {
        self.body.index
    }

    pub fn round_received(&self) -> i64 {
        self.body.round_received
    }

    pub fn frame_hash(&self) -> &[u8; 32] {
        &self.body.frame_hash
    }

    pub fn transactions(&self) -> &[Vec<u8>] {
        &self.body.transactions
    }

    /// Hash signed by validators
    pub fn hash(&self) -> [u8; 32] {
        self.body.hash()
    }

    /// Sign the block hash
    pub fn sign(&self, keypair: &KeyPair) -> BlockSignature {
        BlockSignature {
            validator: keypair.public_key(),
            index: self.index(),
            signature: keypair.sign(&self.hash()),
        }
    }

    /// Check a signature against this block.
    ///
    /// `Ok(false)` for a signature over another block or a non-matching one;
    /// `Err` when the key or signature bytes are malformed.
    pub fn verify(&self, signature: &BlockSignature) -> Result<bool> {
        if signature.index != self.index() {
            return Ok(false);
        }
        Ok(verify(&signature.validator, &self.hash(), &signature.signature)?)
    }

    /// Record a signature (idempotent per validator)
    pub fn set_signature(&mut self, signature: BlockSignature) {
        self.signatures
            .insert(signature.validator.to_hex(), signature.signature);
    }

    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }
}
