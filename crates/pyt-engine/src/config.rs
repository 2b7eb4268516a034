//! Engine configuration
//!
//! Loaded from TOML; every section and field is optional.
//!
//! ```toml
//! [genesis]
//! cooldown_period = 604800
//! early_withdrawal_penalty_bps = 500
//!
//! [mev]
//! max_checkpoint_age_slots = 32
//! max_checkpoint_age_secs = 30
//!
//! [limits]
//! max_batch_len = 16
//! ```

use crate::params::GovernanceParams;
use pyt_core::error::PytError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration loading failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(#[from] PytError),
}

/// Complete engine configuration
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Governance parameters applied at initialization
    #[serde(default)]
    pub genesis: GovernanceParams,

    /// Claim proof freshness window
    #[serde(default)]
    pub mev: MevConfig,

    /// Input limits
    #[serde(default)]
    pub limits: LimitsConfig,
}

/// Freshness window for claim proofs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MevConfig {
    /// Oldest accepted checkpoint, in slots behind the latest
    #[serde(default = "default_max_checkpoint_age_slots")]
    pub max_checkpoint_age_slots: u64,

    /// Oldest accepted checkpoint, in seconds before now
    #[serde(default = "default_max_checkpoint_age_secs")]
    pub max_checkpoint_age_secs: u64,
}

fn default_max_checkpoint_age_slots() -> u64 {
    32
}

fn default_max_checkpoint_age_secs() -> u64 {
    30
}

impl Default for MevConfig {
    fn default() -> Self {
        Self {
            max_checkpoint_age_slots: default_max_checkpoint_age_slots(),
            max_checkpoint_age_secs: default_max_checkpoint_age_secs(),
        }
    }
}

/// Bounds on caller-supplied input
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Most entries accepted by one batch stake or unstake
    #[serde(default = "default_max_batch_len")]
    pub max_batch_len: usize,
}

fn default_max_batch_len() -> usize {
    16
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_batch_len: default_max_batch_len(),
        }
    }
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn validate(&self) -> Result<(), PytError> {
        self.genesis.validate()?;
        if self.mev.max_checkpoint_age_slots == 0 {
            return Err(PytError::invalid(
                "max_checkpoint_age_slots",
                0,
                "freshness window must be positive",
            ));
        }
        if self.mev.max_checkpoint_age_secs == 0 {
            return Err(PytError::invalid(
                "max_checkpoint_age_secs",
                0,
                "freshness window must be positive",
            ));
        }
        if self.limits.max_batch_len == 0 {
            return Err(PytError::invalid("max_batch_len", 0, "must be positive"));
        }
        Ok(())
    }
}
