//! BLAKE3 hashing utilities
//!
//! Checkpoint chains and claim digests are all BLAKE3 with 256-bit output.
//! Every digest that gets signed starts with a domain tag so a signature over
//! one kind of message can never be replayed as another.

/// Domain tag for claim digests
pub const CLAIM_DOMAIN: &[u8] = b"pyt/claim/v1";

/// Domain tag for checkpoint chaining
pub const CHECKPOINT_DOMAIN: &[u8] = b"pyt/checkpoint/v1";

/// Incremental hasher with length-prefixed fields
///
/// Each field is prefixed with its length so `("ab", "c")` and `("a", "bc")`
/// produce different digests.
pub struct DigestBuilder {
    hasher: blake3::Hasher,
}

impl DigestBuilder {
    /// Start a digest under `domain`
    pub fn new(domain: &[u8]) -> Self {
        let mut builder = Self {
            hasher: blake3::Hasher::new(),
        };
        builder.field(domain);
        builder
    }

    /// Append a length-prefixed field
    pub fn field(&mut self, data: &[u8]) -> &mut Self {
        self.hasher.update(&(data.len() as u64).to_le_bytes());
        self.hasher.update(data);
        self
    }

    /// Append a u64 field
    pub fn u64(&mut self, value: u64) -> &mut Self {
        self.field(&value.to_le_bytes())
    }

    /// Finalize and get hash
    pub fn finalize(&self) -> [u8; 32] {
        *self.hasher.finalize().as_bytes()
    }
}
