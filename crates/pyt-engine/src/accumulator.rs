//! # Reward Accumulator
//!
//! Global reward-per-share accounting.
//!
//! ```text
//! acc_reward_per_share += floor(income * SCALE / total_staked)
//! pending(position)     = floor(principal * (acc - debt) / SCALE) + accrued
//! ```
//!
//! Distribution is O(1) per income event regardless of staker count. Every
//! floor leaves dust in the pool, so the sum of pending rewards can never
//! exceed the income that was distributed.

use crate::constants::{
    LOYALTY_TIER_1_AGE, LOYALTY_TIER_1_MULTIPLIER, LOYALTY_TIER_2_AGE, LOYALTY_TIER_2_MULTIPLIER,
};
use crate::params::GovernanceParams;
use crate::position::StakePosition;
use pyt_core::error::{PytError, Result};
use pyt_core::math::{accrued_for, bps_of, percent_of, reward_per_share, SafeMath};
use pyt_core::types::{Amount, Seconds, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// What a sync did with the income it was given
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncOutcome {
    /// Nothing to distribute
    Idle,
    /// Income spread across stakers
    Distributed { income: Amount, per_share_delta: u128 },
    /// No stake to credit; income belongs to the insurance fund
    RoutedToInsurance(Amount),
}

/// Cumulative per-share reward index
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardAccumulator {
    /// Reward per staked unit, scaled by `SCALE`; never decreases
    pub acc_reward_per_share: u128,
    /// Sum of all position principals
    pub total_staked: Amount,
    /// Time of the last sync; never decreases
    pub last_sync_timestamp: Timestamp,
}

impl RewardAccumulator {
    pub fn new(now: Timestamp) -> Self {
        Self {
            acc_reward_per_share: 0,
            total_staked: 0,
            last_sync_timestamp: now,
        }
    }

    /// Fold `income` observed up to `now` into the index
    pub fn sync(&mut self, now: Timestamp, income: Amount) -> Result<SyncOutcome> {
        if now < self.last_sync_timestamp {
            return Err(PytError::ClockWentBackwards {
                last: self.last_sync_timestamp,
                now,
            });
        }
        self.last_sync_timestamp = now;

        if income == 0 {
            return Ok(SyncOutcome::Idle);
        }
        if self.total_staked == 0 {
            debug!(income, "no stake to credit, routing income to insurance");
            return Ok(SyncOutcome::RoutedToInsurance(income));
        }

        let per_share_delta = reward_per_share(income, self.total_staked)?;
        self.acc_reward_per_share = self.acc_reward_per_share.safe_add(per_share_delta)?;

        debug!(
            income,
            per_share_delta,
            total_staked = self.total_staked,
            "distributed reward income"
        );
        Ok(SyncOutcome::Distributed {
            income,
            per_share_delta,
        })
    }

    /// Unmultiplied reward owed to `position`
    pub fn base_pending(&self, position: &StakePosition) -> Result<Amount> {
        let delta = self
            .acc_reward_per_share
            .safe_sub(position.reward_debt_per_share)?;
        accrued_for(position.principal, delta)?.safe_add(position.accrued_reward)
    }

    /// Bank reward earned so far into `accrued_reward` and reset the debt
    ///
    /// Must run before any principal change so the new principal does not
    /// earn retroactively.
    pub fn accrue(&self, position: &mut StakePosition) -> Result<()> {
        position.accrued_reward = self.base_pending(position)?;
        position.reward_debt_per_share = self.acc_reward_per_share;
        Ok(())
    }

    /// Take the whole base pending reward out of `position`
    ///
    /// A second call without a new sync returns zero.
    pub fn settle(&self, position: &mut StakePosition) -> Result<Amount> {
        let base = self.base_pending(position)?;
        position.accrued_reward = 0;
        position.reward_debt_per_share = self.acc_reward_per_share;
        Ok(base)
    }

    pub fn add_stake(&mut self, amount: Amount) -> Result<()> {
        self.total_staked = self.total_staked.safe_add(amount)?;
        Ok(())
    }

    pub fn remove_stake(&mut self, amount: Amount) -> Result<()> {
        self.total_staked = self.total_staked.safe_sub(amount)?;
        Ok(())
    }
}

/// Loyalty multiplier in percent for principal held `held` seconds
pub fn time_multiplier(held: Seconds) -> u64 {
    if held < LOYALTY_TIER_1_AGE {
        100
    } else if held < LOYALTY_TIER_2_AGE {
        LOYALTY_TIER_1_MULTIPLIER
    } else {
        LOYALTY_TIER_2_MULTIPLIER
    }
}

/// Scale a base reward by holding time, utilization and the LP bonus
///
/// Each step floors. The result is what the position is owed; how much of
/// it can actually be funded is decided by the claim.
pub fn apply_multipliers(
    base: Amount,
    params: &GovernanceParams,
    position: &StakePosition,
    now: Timestamp,
) -> Result<Amount> {
    let aged = percent_of(base, time_multiplier(position.held_for(now)))?;
    let scaled = percent_of(aged, params.utilization_multiplier)?;
    if !position.is_liquidity_provider {
        return Ok(scaled);
    }
    scaled.safe_add(bps_of(scaled, params.lp_bonus_bps)?)
}
