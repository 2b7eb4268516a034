//! # Perpetual Yield Cryptography
//!
//! Primitives behind the claim-ordering protection:
//! - BLAKE3 hashing with domain-separated, length-prefixed digests
//! - Hash-chained checkpoints acting as unpredictable claim entropy
//! - Ed25519 claim proofs bound to a checkpoint
//!
//! | Function | Algorithm |
//! |----------|-----------|
//! | Claim signatures | Ed25519 (strict verification) |
//! | Digests, checkpoint chain | BLAKE3-256 |

pub mod checkpoint;
pub mod hash;
pub mod proof;

pub use checkpoint::*;
pub use hash::*;
pub use proof::*;

