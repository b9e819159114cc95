//! # Braid Cryptography
//!
//! The narrow cryptographic surface consumed by the hashgraph engine:
//! - BLAKE3 hashing for event, frame and block identities
//! - Ed25519 key pairs for event and block signatures
//!
//! | Function | Algorithm | Output |
//! |----------|-----------|--------|
//! | Hashing | BLAKE3 | 256-bit |
//! | Signatures | Ed25519 | 64 bytes |

pub mod error;
pub mod hash;
pub mod keys;

pub use error::*;
pub use hash::*;
pub use keys::*;

/// Cryptographic prelude
pub mod prelude {
    pub use crate::error::{CryptoError, Result};
    pub use crate::hash::{hash_blake3, hash_concat, IncrementalHasher};
    pub use crate::keys::{verify, KeyPair, PublicKey};
}
