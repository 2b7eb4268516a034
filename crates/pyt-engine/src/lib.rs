//! # Perpetual Yield Engine
//!
//! Reward and stake accounting for a perpetual yield token. Participants
//! stake principal, reward income is spread pro-rata through a global
//! reward-per-share accumulator, and claims are gated against front-running
//! by checkpoint-bound proofs.
//!
//! ## Value Flows
//!
//! ```text
//!                 deposit_rewards
//!                        │
//!          total_staked > 0 ?──no──────────────┐
//!                        │yes                  │
//!                        ▼                     ▼
//!  stake ──► principal   reward reserve    insurance fund ◄── penalties
//!               │              │                │  ▲         claim fees
//!     unstake ◄─┘              ▼   boost > 1x   │  │         withheld reward
//!  (net of penalty)  claim / compound ◄─────────┘  └── governance drawdown
//!                    (net of fee)
//! ```
//!
//! A claim takes at most its base share from the reward reserve. Anything a
//! multiplier adds on top is paid by the insurance fund, up to its balance,
//! so one position's boost can never consume another position's share.
//!
//! ## Error Classes
//!
//! | Class | Errors |
//! |-------|--------|
//! | Input | `InvalidParameter`, `Unauthorized`, `InsufficientStake`, `NoPendingReward` |
//! | Time gates | `CooldownNotElapsed`, `ClockWentBackwards` |
//! | Claim proofs | `MevProofMalformed`, `MevProofInvalid`, `MevProofExpired` |
//! | Value movement | `CustodyTransferFailed`, `InsufficientInsuranceFund` |
//! | Fatal | `ArithmeticOverflow`, `Storage`, `Serialization` |
//!
//! Every error aborts the whole operation with no state change.

pub mod accumulator;
pub mod config;
pub mod custody;
pub mod engine;
pub mod gate;
pub mod insurance;
pub mod ledger;
pub mod params;
pub mod policy;
pub mod position;
pub mod state;

// Re-exports
pub use accumulator::{RewardAccumulator, SyncOutcome};
pub use config::{ConfigError, EngineConfig, LimitsConfig, MevConfig};
pub use custody::{Custody, InMemoryCustody, Transfer};
pub use engine::{ClaimReceipt, DepositReceipt, ProtocolEngine, StakeReceipt, UnstakeReceipt};
pub use gate::MevProofGate;
pub use insurance::{Drawdown, InsuranceFund, SkimSource};
pub use params::{GovernanceParams, ParameterChange};
pub use policy::WithdrawalQuote;
pub use position::{PositionStatus, StakePosition};
pub use state::{GlobalState, RewardQuote};

/// Protocol constants
pub mod constants {
    use pyt_core::types::{BasisPoints, Seconds};

    pub const SECONDS_IN_HOUR: Seconds = 3_600;

    pub const SECONDS_IN_DAY: Seconds = 24 * SECONDS_IN_HOUR;

    /// Longest allowed cooldown: one year
    pub const MAX_COOLDOWN_PERIOD: Seconds = 365 * SECONDS_IN_DAY;

    /// Longest withdraw interval or claim delay: 30 days
    pub const MAX_GATE_INTERVAL: Seconds = 30 * SECONDS_IN_DAY;

    /// 100%
    pub const MAX_BPS: BasisPoints = 10_000;

    /// 10x
    pub const MAX_UTILIZATION_MULTIPLIER: u64 = 1_000;

    /// 5% bonus for liquidity providers
    pub const DEFAULT_LP_BONUS_BPS: BasisPoints = 500;

    /// Holding time after which claims earn the first loyalty tier
    pub const LOYALTY_TIER_1_AGE: Seconds = 30 * SECONDS_IN_DAY;

    pub const LOYALTY_TIER_1_MULTIPLIER: u64 = 120;

    /// Holding time after which claims earn the second loyalty tier
    pub const LOYALTY_TIER_2_AGE: Seconds = 90 * SECONDS_IN_DAY;

    pub const LOYALTY_TIER_2_MULTIPLIER: u64 = 150;
}

pub use constants::*;
