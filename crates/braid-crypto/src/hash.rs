//! BLAKE3 hashing utilities
//!
//! All identities in Braid (events, frames, blocks) are 256-bit BLAKE3
//! digests. Hashes are built field by field so that identical content yields
//! identical digests on every node regardless of in-memory layout.

/// Hash data using BLAKE3 (256-bit output)
pub fn hash_blake3(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Hash multiple items together
pub fn hash_concat(items: &[&[u8]]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for item in items {
        hasher.update(item);
    }
    *hasher.finalize().as_bytes()
}

/// Incremental hasher for structured content
///
/// Variable-length fields are length-prefixed so that concatenation
/// ambiguities (`["ab", "c"]` vs `["a", "bc"]`) cannot collide.
pub struct IncrementalHasher {
    hasher: blake3::Hasher,
}

impl IncrementalHasher {
    /// Create new incremental hasher
    pub fn new() -> Self {
        Self {
            hasher: blake3::Hasher::new(),
        }
    }

    /// Update with raw bytes
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.hasher.update(data);
        self
    }

    /// Update with a length-prefixed byte string
    pub fn update_bytes(&mut self, data: &[u8]) -> &mut Self {
        self.hasher.update(&(data.len() as u64).to_le_bytes());
        self.hasher.update(data);
        self
    }

    /// Update with a signed integer (little endian)
    pub fn update_i64(&mut self, value: i64) -> &mut Self {
        self.hasher.update(&value.to_le_bytes());
        self
    }

    /// Update with an unsigned integer (little endian)
    pub fn update_u64(&mut self, value: u64) -> &mut Self {
        self.hasher.update(&value.to_le_bytes());
        self
    }

    /// Finalize and get hash
    pub fn finalize(&self) -> [u8; 32] {
        *self.hasher.finalize().as_bytes()
    }
}

impl Default for IncrementalHasher {
    fn default() -> Self {
        Self::new()
    }
}
