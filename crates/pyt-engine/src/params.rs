//! # Governance Parameters
//!
//! Process-wide knobs that only the governance principal may change.
//!
//! | Field | Unit | Range | Default |
//! |-------|------|-------|---------|
//! | cooldown_period | seconds | 0 - 365 days | 7 days |
//! | early_withdrawal_penalty_bps | bps | 0 - 10000 | 500 (5%) |
//! | min_withdraw_interval | seconds | 0 - 30 days | 1 hour |
//! | min_claim_delay | seconds | 0 - 30 days | 60 |
//! | insurance_fee_bps | bps | 0 - 10000 | 100 (1%) |
//! | utilization_multiplier | percent | 0 - 1000 | 100 (1x) |
//! | lp_bonus_bps | bps | 0 - 10000 | 500 (5%) |
//!
//! Changes apply to every operation after the update. Rewards that were
//! already settled are never recomputed.

use crate::constants::*;
use pyt_core::error::{PytError, Result};
use pyt_core::types::{AccountId, BasisPoints, Seconds};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Bounded configuration set by governance
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceParams {
    /// Holding time below which a withdrawal is penalized
    pub cooldown_period: Seconds,

    /// Penalty on withdrawn principal inside the cooldown
    pub early_withdrawal_penalty_bps: BasisPoints,

    /// Hard floor between stake/withdraw and the next withdrawal
    pub min_withdraw_interval: Seconds,

    /// Minimum spacing between claims
    pub min_claim_delay: Seconds,

    /// Share of each claim skimmed to the insurance fund
    pub insurance_fee_bps: BasisPoints,

    /// Payout rate lever in percent (100 = 1x)
    pub utilization_multiplier: u64,

    /// Extra reward for liquidity-provider positions
    pub lp_bonus_bps: BasisPoints,
}

impl Default for GovernanceParams {
    fn default() -> Self {
        Self {
            cooldown_period: 7 * SECONDS_IN_DAY,
            early_withdrawal_penalty_bps: 500,
            min_withdraw_interval: SECONDS_IN_HOUR,
            min_claim_delay: 60,
            insurance_fee_bps: 100,
            utilization_multiplier: 100,
            lp_bonus_bps: DEFAULT_LP_BONUS_BPS,
        }
    }
}

/// One field that changed in a governance update
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParameterChange {
    pub field: &'static str,
    pub old: u64,
    pub new: u64,
}

impl GovernanceParams {
    /// Field name, value and inclusive upper bound for every parameter
    fn fields(&self) -> [(&'static str, u64, u64); 7] {
        [
            ("cooldown_period", self.cooldown_period, MAX_COOLDOWN_PERIOD),
            (
                "early_withdrawal_penalty_bps",
                self.early_withdrawal_penalty_bps,
                MAX_BPS,
            ),
            ("min_withdraw_interval", self.min_withdraw_interval, MAX_GATE_INTERVAL),
            ("min_claim_delay", self.min_claim_delay, MAX_GATE_INTERVAL),
            ("insurance_fee_bps", self.insurance_fee_bps, MAX_BPS),
            (
                "utilization_multiplier",
                self.utilization_multiplier,
                MAX_UTILIZATION_MULTIPLIER,
            ),
            ("lp_bonus_bps", self.lp_bonus_bps, MAX_BPS),
        ]
    }

    /// Reject the first out-of-range field
    pub fn validate(&self) -> Result<()> {
        for (field, value, max) in self.fields() {
            if value > max {
                warn!(field, value, max, "rejected out-of-range governance parameter");
                return Err(PytError::invalid(field, value, "above allowed maximum"));
            }
        }
        Ok(())
    }

    /// Fields that differ between `self` and `next`
    pub fn diff(&self, next: &GovernanceParams) -> Vec<ParameterChange> {
        self.fields()
            .into_iter()
            .zip(next.fields())
            .filter(|((_, old, _), (_, new, _))| old != new)
            .map(|((field, old, _), (_, new, _))| ParameterChange { field, old, new })
            .collect()
    }
}

/// Fail unless `caller` is the governance principal
pub fn authorize(
    governance: &AccountId,
    caller: &AccountId,
    operation: &'static str,
) -> Result<()> {
    if governance != caller {
        warn!(%caller, operation, "unauthorized governance call");
        return Err(PytError::Unauthorized {
            caller: *caller,
            operation,
        });
    }
    Ok(())
}
