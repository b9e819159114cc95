//! Cryptographic error types

use thiserror::Error;

/// Result type for cryptographic operations
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Errors in cryptographic operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Invalid public key
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Malformed signature bytes
    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    /// Hex decoding failed
    #[error("Invalid hex encoding: {0}")]
    InvalidHex(String),
}
