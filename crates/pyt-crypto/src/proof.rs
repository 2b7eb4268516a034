//! Claim proofs
//!
//! A claim proof is an Ed25519 signature by the claimant over
//! `BLAKE3(domain || asset || owner || slot || checkpoint_hash)`.
//! Because the checkpoint hash is unpredictable until its slot is produced,
//! a valid proof can only be built after that slot, and the gate only
//! accepts recent slots.

use crate::checkpoint::Checkpoint;
use crate::hash::{DigestBuilder, CLAIM_DOMAIN};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use pyt_core::error::{PytError, Result};
use pyt_core::types::{AccountId, AssetId};
use serde::{Deserialize, Serialize};

/// Ed25519 signature length
pub const SIGNATURE_LEN: usize = 64;

/// Proof that a claim was built against a specific checkpoint
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimProof {
    /// Checkpoint slot the claim commits to
    pub slot: u64,
    /// Checkpoint hash the claim commits to
    pub checkpoint_hash: [u8; 32],
    /// Owner's Ed25519 signature over the claim digest
    pub signature: Vec<u8>,
}

/// Digest a claimant signs
pub fn claim_digest(
    asset: &AssetId,
    owner: &AccountId,
    slot: u64,
    checkpoint_hash: &[u8; 32],
) -> [u8; 32] {
    DigestBuilder::new(CLAIM_DOMAIN)
        .field(asset.as_bytes())
        .field(owner.as_bytes())
        .u64(slot)
        .field(checkpoint_hash)
        .finalize()
}

impl ClaimProof {
    /// Check the signature against `owner`'s key
    ///
    /// Parse failures are `MevProofMalformed`; a well-formed signature that
    /// does not verify is `MevProofInvalid`.
    pub fn verify_signature(&self, asset: &AssetId, owner: &AccountId) -> Result<()> {
        let verifying_key = VerifyingKey::from_bytes(owner.as_bytes()).map_err(|e| {
            PytError::MevProofMalformed(format!("owner {} is not an ed25519 key: {}", owner, e))
        })?;

        let signature = Signature::from_slice(&self.signature).map_err(|_| {
            PytError::MevProofMalformed(format!(
                "signature must be {} bytes, got {}",
                SIGNATURE_LEN,
                self.signature.len()
            ))
        })?;

        let digest = claim_digest(asset, owner, self.slot, &self.checkpoint_hash);
        verifying_key
            .verify_strict(&digest, &signature)
            .map_err(|_| PytError::MevProofInvalid("signature does not match claim digest".into()))
    }
}

/// Claimant-side key that produces claim proofs
pub struct ClaimSigner {
    signing_key: SigningKey,
}

impl ClaimSigner {
    /// Deterministic signer from a 32-byte seed
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(&seed),
        }
    }

    /// Account id of this signer (its verifying key)
    pub fn account_id(&self) -> AccountId {
        AccountId::new(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a claim bound to `checkpoint`
    pub fn sign_claim(&self, asset: &AssetId, checkpoint: &Checkpoint) -> ClaimProof {
        let digest = claim_digest(asset, &self.account_id(), checkpoint.slot, &checkpoint.hash);
        let signature = self.signing_key.sign(&digest);

        ClaimProof {
            slot: checkpoint.slot,
            checkpoint_hash: checkpoint.hash,
            signature: signature.to_bytes().to_vec(),
        }
    }
}
