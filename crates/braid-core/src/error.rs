//! Error types for Braid consensus operations

use crate::types::{EventHash, PublicKey};
use braid_crypto::CryptoError;
use thiserror::Error;

/// Result type alias for Braid operations
pub type Result<T> = std::result::Result<T, BraidError>;

/// Errors that can occur while building or querying the hashgraph
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BraidError {
    // === Insertion ===
    /// Event signature does not verify against its creator
    #[error("Invalid signature on event: {0}")]
    InvalidSignature(EventHash),

    /// Self-parent is not the creator's last known event
    #[error("Fork detected for creator {creator} at index {index}: {reason}")]
    ForkDetected {
        creator: PublicKey,
        index: i64,
        reason: String,
    },

    /// Other-parent neither stored nor referenced by the creator's root
    #[error("Unknown other-parent: {0}")]
    UnknownParent(EventHash),

    /// Event already inserted
    #[error("Event already inserted: {0}")]
    DuplicateEvent(EventHash),

    // === Lookup ===
    /// Event not resolvable in the store
    #[error("Unknown event: {0}")]
    UnknownEvent(EventHash),

    /// Participant not part of the peer set
    #[error("Unknown participant: {0}")]
    UnknownParticipant(String),

    /// Store miss for rounds, blocks, frames or roots
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    /// No block has gathered enough signatures yet
    #[error("No anchor block")]
    NoAnchorBlock,

    /// Event lacks the integer parent coordinates needed on the wire
    #[error("Wire info not set on event: {0}")]
    MissingWireInfo(EventHash),

    // === Collaborators ===
    /// Cryptographic failure
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Commit channel receiver dropped
    #[error("Commit channel closed")]
    CommitChannelClosed,

    // === General ===
    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BraidError {
    /// Stable numeric code for the error
    pub fn code(&self) -> u32 {
        match self {
            Self::InvalidSignature(_) => 2001,
            Self::ForkDetected { .. } => 2002,
            Self::UnknownParent(_) => 2003,
            Self::DuplicateEvent(_) => 2004,
            Self::UnknownEvent(_) => 2101,
            Self::UnknownParticipant(_) => 2102,
            Self::NotFound { .. } => 2103,
            Self::NoAnchorBlock => 2104,
            Self::MissingWireInfo(_) => 2105,
            Self::Crypto(_) => 2201,
            Self::Storage(_) | Self::Serialization(_) => 2301,
            _ => 9999,
        }
    }

    /// Check if the error can be cured by fetching more data and retrying
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::UnknownEvent(_)
                | Self::UnknownParent(_)
                | Self::NotFound { .. }
                | Self::NoAnchorBlock
        )
    }

    /// Check if the error is a store miss of any kind
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::UnknownEvent(_) | Self::NotFound { .. })
    }

    /// Shorthand for a `NotFound` error
    pub fn not_found(kind: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            kind,
            key: key.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = BraidError::UnknownEvent(EventHash::new([1u8; 32]));
        assert_eq!(err.code(), 2101);
        assert_eq!(BraidError::NoAnchorBlock.code(), 2104);
    }

    #[test]
    fn test_error_display() {
        let err = BraidError::not_found("Round", 7);
        assert_eq!(format!("{}", err), "Round not found: 7");
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(BraidError::NoAnchorBlock.is_recoverable());
        assert!(BraidError::UnknownParent(EventHash::default()).is_recoverable());
        assert!(!BraidError::InvalidSignature(EventHash::default()).is_recoverable());
    }

    #[test]
    fn test_crypto_error_conversion() {
        let err: BraidError = CryptoError::InvalidSignature("short".into()).into();
        assert!(matches!(err, BraidError::Crypto(_)));
    }
}
