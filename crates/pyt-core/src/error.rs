//! Error types for Perpetual Yield engine operations

use crate::types::{AccountId, Amount, Timestamp};
use std::fmt;
use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, PytError>;

/// Time gate that rejected an operation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeGate {
    /// Minimum spacing between a stake/withdrawal and the next withdrawal
    MinWithdrawInterval,
    /// Minimum spacing between two claims
    MinClaimDelay,
    /// Minimum holding time between the last stake and a claim
    MinStakePeriod,
}

impl fmt::Display for TimeGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MinWithdrawInterval => write!(f, "min_withdraw_interval"),
            Self::MinClaimDelay => write!(f, "min_claim_delay"),
            Self::MinStakePeriod => write!(f, "min_stake_period"),
        }
    }
}

/// Errors that can occur in engine operations
///
/// Every variant aborts the whole operation; nothing is committed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PytError {
    // === Input Validation ===
    /// Out-of-range governance value or zero amount
    #[error("Invalid parameter {field}={value}: {reason}")]
    InvalidParameter {
        field: &'static str,
        value: u64,
        reason: &'static str,
    },

    /// Caller is not the governance principal
    #[error("Caller {caller} is not authorized to {operation}")]
    Unauthorized {
        caller: AccountId,
        operation: &'static str,
    },

    /// Unstake amount exceeds principal
    #[error("Insufficient stake: requested {requested}, available {available}")]
    InsufficientStake { requested: Amount, available: Amount },

    /// Claim with nothing to pay out
    #[error("No pending reward for {0}")]
    NoPendingReward(AccountId),

    /// Participant has no position
    #[error("Position not found: {0}")]
    PositionNotFound(AccountId),

    // === Time Gates ===
    /// Withdraw interval, claim delay or stake period not satisfied
    #[error("{gate} not elapsed: need {required}s, elapsed {elapsed}s")]
    CooldownNotElapsed {
        gate: TimeGate,
        required: u64,
        elapsed: u64,
    },

    /// Time source returned a timestamp before the last sync
    #[error("Clock went backwards: last sync at {last}, now {now}")]
    ClockWentBackwards { last: Timestamp, now: Timestamp },

    // === Claim Proofs ===
    /// Proof could not be parsed
    #[error("Malformed MEV proof: {0}")]
    MevProofMalformed(String),

    /// Proof does not bind to a known checkpoint or has a bad signature
    #[error("Invalid MEV proof: {0}")]
    MevProofInvalid(String),

    /// Proof checkpoint is outside the freshness window
    #[error("Expired MEV proof: checkpoint slot {checkpoint_slot} is {slot_age} slots / {age_secs}s old")]
    MevProofExpired {
        checkpoint_slot: u64,
        slot_age: u64,
        age_secs: u64,
    },

    // === Arithmetic ===
    /// Fixed-point math would overflow, underflow or divide by zero
    #[error("Arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),

    // === Value Movement ===
    /// External custody transfer failed; the operation was rolled back
    #[error("Custody transfer failed: {0}")]
    CustodyTransferFailed(String),

    /// Drawdown larger than the insurance fund balance
    #[error("Insufficient insurance fund: requested {requested}, available {available}")]
    InsufficientInsuranceFund { requested: Amount, available: Amount },

    // === Lifecycle ===
    /// Engine has no GlobalState yet
    #[error("Protocol not initialized")]
    NotInitialized,

    /// `initialize` called twice
    #[error("Protocol already initialized")]
    AlreadyInitialized,

    // === Storage Errors ===
    /// Storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl PytError {
    /// Stable numeric code for callers that log or forward errors
    pub fn code(&self) -> u32 {
        match self {
            Self::InvalidParameter { .. } => 1001,
            Self::Unauthorized { .. } => 1002,
            Self::InsufficientStake { .. } => 1003,
            Self::NoPendingReward(_) => 1004,
            Self::PositionNotFound(_) => 1005,
            Self::CooldownNotElapsed { .. } => 1101,
            Self::ClockWentBackwards { .. } => 1102,
            Self::MevProofMalformed(_) => 1201,
            Self::MevProofInvalid(_) => 1202,
            Self::MevProofExpired { .. } => 1203,
            Self::ArithmeticOverflow(_) => 1301,
            Self::CustodyTransferFailed(_) => 1401,
            Self::InsufficientInsuranceFund { .. } => 1402,
            Self::NotInitialized => 1501,
            Self::AlreadyInitialized => 1502,
            Self::Storage(_) | Self::Serialization(_) => 9999,
        }
    }

    /// Check if the same request may succeed later without changes
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::CooldownNotElapsed { .. }
                | Self::MevProofExpired { .. }
                | Self::CustodyTransferFailed(_)
        )
    }

    /// Shorthand for an out-of-range value
    pub fn invalid(field: &'static str, value: u64, reason: &'static str) -> Self {
        Self::InvalidParameter {
            field,
            value,
            reason,
        }
    }
}
