//! # Claim Ordering Gate
//!
//! Rejects claims that could have been prepared ahead of time. A claim must
//! carry a [`ClaimProof`] signed by the owner over a recent checkpoint.
//!
//! Checks run in this order:
//!
//! 1. the slot is not ahead of the latest checkpoint (`MevProofInvalid`)
//! 2. the checkpoint is retained and inside the freshness window (`MevProofExpired`)
//! 3. the hash matches the checkpoint at that slot (`MevProofInvalid`)
//! 4. the slot is newer than the owner's last accepted claim (`MevProofInvalid`)
//! 5. the owner's signature verifies (`MevProofMalformed` / `MevProofInvalid`)
//!
//! Steps 1 to 3 need nothing but the proof and the clock and run before the
//! claimant's position is loaded, so a stale proof fails as expired
//! whatever state the claimant is in. Steps 4 and 5 need the position.

use crate::config::MevConfig;
use pyt_core::clock::elapsed_secs;
use pyt_core::error::{PytError, Result};
use pyt_core::types::{AccountId, AssetId, Timestamp};
use pyt_crypto::checkpoint::{Checkpoint, CheckpointSource};
use pyt_crypto::proof::ClaimProof;
use tracing::debug;

/// Validates claim proofs against a checkpoint source
pub struct MevProofGate<K> {
    source: K,
    config: MevConfig,
}

impl<K: CheckpointSource> MevProofGate<K> {
    pub fn new(source: K, config: MevConfig) -> Self {
        Self { source, config }
    }

    pub fn source(&self) -> &K {
        &self.source
    }

    /// Resolve the checkpoint `proof` is bound to, if it is still fresh
    pub fn admit(&self, proof: &ClaimProof, now: Timestamp) -> Result<Checkpoint> {
        let latest = self
            .source
            .latest()
            .ok_or_else(|| PytError::MevProofInvalid("no checkpoint has been produced".into()))?;

        if proof.slot > latest.slot {
            return Err(PytError::MevProofInvalid(format!(
                "slot {} is ahead of latest checkpoint {}",
                proof.slot, latest.slot
            )));
        }

        let slot_age = latest.slot - proof.slot;
        let checkpoint = self.source.checkpoint(proof.slot);

        // A pruned checkpoint is at least as old as the latest one
        let age_secs = elapsed_secs(checkpoint.unwrap_or(latest).timestamp, now);

        let fresh = slot_age <= self.config.max_checkpoint_age_slots
            && age_secs <= self.config.max_checkpoint_age_secs;
        let checkpoint = match checkpoint {
            Some(cp) if fresh => cp,
            _ => {
                debug!(slot = proof.slot, slot_age, age_secs, "stale claim proof");
                return Err(PytError::MevProofExpired {
                    checkpoint_slot: proof.slot,
                    slot_age,
                    age_secs,
                });
            }
        };

        if checkpoint.hash != proof.checkpoint_hash {
            return Err(PytError::MevProofInvalid(format!(
                "hash does not match checkpoint at slot {}",
                proof.slot
            )));
        }
        Ok(checkpoint)
    }

    /// Bind an admitted proof to `owner`: no replayed slot, valid signature
    pub fn authorize(
        &self,
        asset: &AssetId,
        owner: &AccountId,
        proof: &ClaimProof,
        last_claim_slot: Option<u64>,
    ) -> Result<()> {
        if let Some(last) = last_claim_slot {
            if proof.slot <= last {
                return Err(PytError::MevProofInvalid(format!(
                    "slot {} already used by a claim at slot {}",
                    proof.slot, last
                )));
            }
        }

        proof.verify_signature(asset, owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pyt_crypto::checkpoint::CheckpointLog;
    use pyt_crypto::proof::ClaimSigner;

    fn verify(
        gate: &MevProofGate<CheckpointLog>,
        asset: &AssetId,
        owner: &AccountId,
        proof: &ClaimProof,
        now: Timestamp,
        last_claim_slot: Option<u64>,
    ) -> Result<Checkpoint> {
        let checkpoint = gate.admit(proof, now)?;
        gate.authorize(asset, owner, proof, last_claim_slot)?;
        Ok(checkpoint)
    }

    fn setup() -> (MevProofGate<CheckpointLog>, ClaimSigner, AssetId) {
        let log = CheckpointLog::new(64);
        for i in 0..10u64 {
            log.append(&i.to_le_bytes(), 1_000 + i as Timestamp);
        }
        let gate = MevProofGate::new(
            log,
            MevConfig {
                max_checkpoint_age_slots: 4,
                max_checkpoint_age_secs: 10,
            },
        );
        (gate, ClaimSigner::from_seed([5u8; 32]), AssetId::from_symbol("PYT"))
    }

    #[test]
    fn test_fresh_proof_accepted() {
        let (gate, signer, asset) = setup();
        let latest = gate.source().latest().unwrap();
        let proof = signer.sign_claim(&asset, &latest);

        let checkpoint = verify(&gate, &asset, &signer.account_id(), &proof, 1_010, None).unwrap();
        assert_eq!(checkpoint, latest);
    }

    #[test]
    fn test_old_slot_expired() {
        let (gate, signer, asset) = setup();
        let old = gate.source().checkpoint(2).unwrap();
        let proof = signer.sign_claim(&asset, &old);

        assert!(matches!(
            verify(&gate, &asset, &signer.account_id(), &proof, 1_009, None),
            Err(PytError::MevProofExpired {
                checkpoint_slot: 2,
                slot_age: 7,
                ..
            })
        ));
    }

    #[test]
    fn test_old_timestamp_expired() {
        let (gate, signer, asset) = setup();
        let latest = gate.source().latest().unwrap();
        let proof = signer.sign_claim(&asset, &latest);

        assert!(matches!(
            verify(&gate, &asset, &signer.account_id(), &proof, 1_100, None),
            Err(PytError::MevProofExpired { slot_age: 0, .. })
        ));
    }

    #[test]
    fn test_stale_beats_bad_signature() {
        let (gate, signer, asset) = setup();
        let old = gate.source().checkpoint(0).unwrap();
        let mut proof = signer.sign_claim(&asset, &old);
        proof.signature.clear();

        assert!(matches!(
            verify(&gate, &asset, &signer.account_id(), &proof, 1_009, None),
            Err(PytError::MevProofExpired { .. })
        ));
    }

    #[test]
    fn test_admit_needs_no_owner() {
        let (gate, signer, asset) = setup();
        let old = gate.source().checkpoint(1).unwrap();
        let mut proof = signer.sign_claim(&asset, &old);
        proof.signature.clear();

        assert!(matches!(
            gate.admit(&proof, 1_009),
            Err(PytError::MevProofExpired {
                checkpoint_slot: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_future_slot_invalid() {
        let (gate, signer, asset) = setup();
        let future = Checkpoint {
            slot: 99,
            hash: [0u8; 32],
            timestamp: 1_009,
        };
        let proof = signer.sign_claim(&asset, &future);

        assert!(matches!(
            verify(&gate, &asset, &signer.account_id(), &proof, 1_009, None),
            Err(PytError::MevProofInvalid(_))
        ));
    }

    #[test]
    fn test_hash_mismatch_invalid() {
        let (gate, signer, asset) = setup();
        let mut forged = gate.source().latest().unwrap();
        forged.hash = [1u8; 32];
        let proof = signer.sign_claim(&asset, &forged);

        assert!(matches!(
            verify(&gate, &asset, &signer.account_id(), &proof, 1_009, None),
            Err(PytError::MevProofInvalid(_))
        ));
    }

    #[test]
    fn test_replayed_slot_invalid() {
        let (gate, signer, asset) = setup();
        let latest = gate.source().latest().unwrap();
        let proof = signer.sign_claim(&asset, &latest);

        assert!(matches!(
            verify(&gate, &asset, &signer.account_id(), &proof, 1_009, Some(latest.slot)),
            Err(PytError::MevProofInvalid(_))
        ));
    }

    #[test]
    fn test_malformed_signature() {
        let (gate, signer, asset) = setup();
        let mut proof = signer.sign_claim(&asset, &gate.source().latest().unwrap());
        proof.signature.truncate(3);

        assert!(matches!(
            verify(&gate, &asset, &signer.account_id(), &proof, 1_009, None),
            Err(PytError::MevProofMalformed(_))
        ));
    }

    #[test]
    fn test_no_checkpoints() {
        let gate = MevProofGate::new(CheckpointLog::new(4), MevConfig::default());
        let signer = ClaimSigner::from_seed([5u8; 32]);
        let asset = AssetId::from_symbol("PYT");
        let proof = signer.sign_claim(
            &asset,
            &Checkpoint {
                slot: 0,
                hash: [0u8; 32],
                timestamp: 0,
            },
        );

        assert!(matches!(
            verify(&gate, &asset, &signer.account_id(), &proof, 0, None),
            Err(PytError::MevProofInvalid(_))
        ));
    }
}
