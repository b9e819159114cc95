//! Key management for Braid participants
//!
//! Participants are identified by their Ed25519 public key. Events and block
//! signatures are signed over their 32-byte content hash.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{CryptoError, Result};

/// Ed25519 public key (32 bytes)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    /// Wrap raw key bytes
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string
    pub fn from_hex(s: &str) -> Result<Self> {
        let bytes = hex::decode(s).map_err(|e| CryptoError::InvalidHex(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidPublicKey("expected 32 bytes".to_string()))?;
        Ok(Self(bytes))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..12])
    }
}

/// Signing key pair for a participant
pub struct KeyPair {
    signing_key: SigningKey,
}

impl KeyPair {
    /// Generate a new random keypair
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        Self::from_seed(seed)
    }

    /// Deterministic keypair from a 32-byte seed
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Get the public key
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message, returning the 64-byte signature
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key())
            .finish_non_exhaustive()
    }
}

/// Verify `signature` over `message` under `public_key`.
///
/// Returns `Ok(false)` when the signature is well formed but does not match,
/// and an error when the key or signature bytes cannot be decoded at all.
pub fn verify(public_key: &PublicKey, message: &[u8], signature: &[u8]) -> Result<bool> {
    let key = VerifyingKey::from_bytes(public_key.as_bytes())
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;
    let signature =
        Signature::from_slice(signature).map_err(|e| CryptoError::InvalidSignature(e.to_string()))?;
    Ok(key.verify(message, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_keypair_signing() {
        let keypair = KeyPair::generate();
        let message = b"Test message";

        let signature = keypair.sign(message);
        assert_eq!(signature.len(), 64);
        assert!(verify(&keypair.public_key(), message, &signature).unwrap());
        assert!(!verify(&keypair.public_key(), b"other", &signature).unwrap());
    }

    #[test]
    fn test_from_seed_is_deterministic() {
        let a = KeyPair::from_seed([7u8; 32]);
        let b = KeyPair::from_seed([7u8; 32]);
        assert_eq!(a.public_key(), b.public_key());
    }

    #[test]
    fn test_malformed_signature_is_error() {
        let keypair = KeyPair::from_seed([1u8; 32]);
        let result = verify(&keypair.public_key(), b"msg", &[0u8; 10]);
        assert!(matches!(result, Err(CryptoError::InvalidSignature(_))));
    }

    #[test]
    fn test_public_key_hex() {
        let key = KeyPair::from_seed([3u8; 32]).public_key();
        assert_eq!(PublicKey::from_hex(&key.to_hex()).unwrap(), key);
        assert!(PublicKey::from_hex("abcd").is_err());
    }

    proptest! {
        #[test]
        fn signatures_verify_for_any_message(seed in any::<[u8; 32]>(), msg in proptest::collection::vec(any::<u8>(), 0..256)) {
            let keypair = KeyPair::from_seed(seed);
            let sig = keypair.sign(&msg);
            prop_assert!(verify(&keypair.public_key(), &msg, &sig).unwrap());
        }
    }
}
