//! Core type definitions for the Perpetual Yield engine
//!
//! Identities are 32-byte values. An `AccountId` doubles as the participant's
//! Ed25519 verifying key, which is what claim proofs are checked against.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unix timestamp in seconds
pub type Timestamp = i64;

/// Token amount in the smallest unit of the staked asset
pub type Amount = u64;

/// Duration in seconds
pub type Seconds = u64;

/// Basis points (1/100 of a percent)
pub type BasisPoints = u64;

/// AccountId - identity of a participant or of the governance principal
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct AccountId {
    /// Raw Ed25519 verifying key bytes
    id: [u8; 32],
}

impl AccountId {
    pub fn new(id: [u8; 32]) -> Self {
        Self { id }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.id
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.id)
    }

    /// Parse from a 64-character hex string
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let mut id = [0u8; 32];
        hex::decode_to_slice(s, &mut id)?;
        Ok(Self { id })
    }

    /// Storage key prefix for this account's position record
    pub fn storage_key(&self, prefix: &[u8]) -> Vec<u8> {
        let mut key = Vec::with_capacity(prefix.len() + 32);
        key.extend_from_slice(prefix);
        key.extend_from_slice(&self.id);
        key
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..12])
    }
}

/// AssetId - identifier of the staked fungible asset
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AssetId {
    hash: [u8; 32],
}

impl AssetId {
    pub fn new(hash: [u8; 32]) -> Self {
        Self { hash }
    }

    /// Derive an asset id from its ticker symbol using BLAKE3
    pub fn from_symbol(symbol: &str) -> Self {
        Self {
            hash: *blake3::hash(symbol.as_bytes()).as_bytes(),
        }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.hash
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

impl fmt::Debug for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssetId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_hex_roundtrip() {
        let account = AccountId::new([7u8; 32]);
        let parsed = AccountId::from_hex(&account.to_hex()).unwrap();
        assert_eq!(account, parsed);
    }

    #[test]
    fn test_account_from_short_hex_rejected() {
        assert!(AccountId::from_hex("abcd").is_err());
    }

    #[test]
    fn test_asset_from_symbol_is_deterministic() {
        assert_eq!(AssetId::from_symbol("PYT"), AssetId::from_symbol("PYT"));
        assert_ne!(AssetId::from_symbol("PYT"), AssetId::from_symbol("USDC"));
    }

    #[test]
    fn test_storage_key_prefix() {
        let account = AccountId::new([1u8; 32]);
        let key = account.storage_key(b"position/");
        assert!(key.starts_with(b"position/"));
        assert_eq!(key.len(), 9 + 32);
    }
}
