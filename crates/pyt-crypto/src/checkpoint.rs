//! Chain checkpoints used as claim entropy
//!
//! A checkpoint is a (slot, hash, timestamp) triple published by the host
//! chain. Its hash is unknown until the slot is produced, so a claim signed
//! over it cannot have been prepared earlier.

use crate::hash::{DigestBuilder, CHECKPOINT_DOMAIN};
use parking_lot::RwLock;
use pyt_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A recent, unpredictable chain state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Monotonic slot number
    pub slot: u64,
    /// Slot hash
    pub hash: [u8; 32],
    /// Production time
    pub timestamp: Timestamp,
}

/// Provider of checkpoints the claim gate binds proofs to
pub trait CheckpointSource: Send + Sync {
    /// Most recent checkpoint, if any has been produced
    fn latest(&self) -> Option<Checkpoint>;

    /// Checkpoint at `slot`, if still retained
    fn checkpoint(&self, slot: u64) -> Option<Checkpoint>;
}

impl<T: CheckpointSource + ?Sized> CheckpointSource for Arc<T> {
    fn latest(&self) -> Option<Checkpoint> {
        (**self).latest()
    }

    fn checkpoint(&self, slot: u64) -> Option<Checkpoint> {
        (**self).checkpoint(slot)
    }
}

/// In-memory hash-chained checkpoint log with bounded retention
pub struct CheckpointLog {
    checkpoints: RwLock<BTreeMap<u64, Checkpoint>>,
    retention: usize,
}

impl CheckpointLog {
    /// Create a log that keeps the last `retention` checkpoints
    pub fn new(retention: usize) -> Self {
        Self {
            checkpoints: RwLock::new(BTreeMap::new()),
            retention: retention.max(1),
        }
    }

    /// Produce the next checkpoint from fresh `entropy`
    ///
    /// The hash chains over the previous checkpoint hash, so every hash
    /// depends on all entropy seen so far.
    pub fn append(&self, entropy: &[u8], timestamp: Timestamp) -> Checkpoint {
        let mut checkpoints = self.checkpoints.write();
        let (slot, prev_hash) = match checkpoints.values().next_back() {
            Some(prev) => (prev.slot + 1, prev.hash),
            None => (0, [0u8; 32]),
        };

        let hash = DigestBuilder::new(CHECKPOINT_DOMAIN)
            .field(&prev_hash)
            .u64(slot)
            .field(entropy)
            .field(&timestamp.to_le_bytes())
            .finalize();

        let checkpoint = Checkpoint {
            slot,
            hash,
            timestamp,
        };
        checkpoints.insert(slot, checkpoint);

        while checkpoints.len() > self.retention {
            checkpoints.pop_first();
        }

        checkpoint
    }

    /// Number of retained checkpoints
    pub fn len(&self) -> usize {
        self.checkpoints.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.read().is_empty()
    }
}

impl Default for CheckpointLog {
    fn default() -> Self {
        Self::new(256)
    }
}

impl CheckpointSource for CheckpointLog {
    fn latest(&self) -> Option<Checkpoint> {
        self.checkpoints.read().values().next_back().copied()
    }

    fn checkpoint(&self, slot: u64) -> Option<Checkpoint> {
        self.checkpoints.read().get(&slot).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_increments_slot() {
        let log = CheckpointLog::new(8);
        let a = log.append(b"e0", 100);
        let b = log.append(b"e1", 101);

        assert_eq!(a.slot, 0);
        assert_eq!(b.slot, 1);
        assert_ne!(a.hash, b.hash);
        assert_eq!(log.latest(), Some(b));
        assert_eq!(log.checkpoint(0), Some(a));
    }

    #[test]
    fn test_hash_depends_on_history() {
        let left = CheckpointLog::new(8);
        left.append(b"x", 1);
        let l = left.append(b"same", 2);

        let right = CheckpointLog::new(8);
        right.append(b"y", 1);
        let r = right.append(b"same", 2);

        assert_eq!(l.slot, r.slot);
        assert_ne!(l.hash, r.hash);
    }

    #[test]
    fn test_retention_prunes_oldest() {
        let log = CheckpointLog::new(2);
        log.append(b"a", 1);
        log.append(b"b", 2);
        log.append(b"c", 3);

        assert_eq!(log.len(), 2);
        assert!(log.checkpoint(0).is_none());
        assert!(log.checkpoint(2).is_some());
    }

    #[test]
    fn test_empty_log() {
        let log = CheckpointLog::default();
        assert!(log.is_empty());
        assert!(log.latest().is_none());
    }
}
