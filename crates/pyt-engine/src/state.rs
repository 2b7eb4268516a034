//! Process-wide protocol state

use crate::accumulator::{apply_multipliers, RewardAccumulator, SyncOutcome};
use crate::insurance::{InsuranceFund, SkimSource};
use crate::params::GovernanceParams;
use crate::position::StakePosition;
use pyt_core::error::Result;
use pyt_core::math::SafeMath;
use pyt_core::types::{AccountId, Amount, AssetId, Timestamp};
use serde::{Deserialize, Serialize};

/// How a claim's reward is funded
///
/// The reward reserve pays at most the base share. A boost above 1x comes
/// out of the insurance fund and is clamped to its balance; base withheld by
/// a multiplier below 1x goes to the insurance fund.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RewardQuote {
    /// Unmultiplied entitlement
    pub base: Amount,
    /// Entitlement after multipliers
    pub owed: Amount,
    pub from_reserve: Amount,
    pub from_insurance: Amount,
    pub withheld: Amount,
}

impl RewardQuote {
    /// Reward actually payable, before the claim fee
    pub fn gross(&self) -> Amount {
        self.from_reserve + self.from_insurance
    }

    /// Boost the insurance fund could not cover
    pub fn shortfall(&self) -> Amount {
        self.owed - self.gross()
    }
}

/// Everything shared across positions
///
/// The vault backing this state always holds
/// `total_staked + insurance.balance + reward_reserve`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalState {
    pub governance: AccountId,
    pub asset_id: AssetId,
    pub accumulator: RewardAccumulator,
    pub params: GovernanceParams,
    pub insurance: InsuranceFund,
    /// Distributed income not yet claimed, including rounding dust
    pub reward_reserve: Amount,
    /// Positions with non-zero principal
    pub staker_count: u64,
    pub total_reward_income: u128,
    /// Net reward paid out or compounded
    pub total_rewards_distributed: u128,
    pub initialized_at: Timestamp,
}

impl GlobalState {
    pub fn new(
        governance: AccountId,
        asset_id: AssetId,
        params: GovernanceParams,
        now: Timestamp,
    ) -> Self {
        Self {
            governance,
            asset_id,
            accumulator: RewardAccumulator::new(now),
            params,
            insurance: InsuranceFund::new(),
            reward_reserve: 0,
            staker_count: 0,
            total_reward_income: 0,
            total_rewards_distributed: 0,
            initialized_at: now,
        }
    }

    /// Sync the accumulator and book `income` where it landed
    pub fn sync(&mut self, now: Timestamp, income: Amount) -> Result<SyncOutcome> {
        let outcome = self.accumulator.sync(now, income)?;
        match outcome {
            SyncOutcome::Idle => {}
            SyncOutcome::Distributed { income, .. } => {
                self.reward_reserve = self.reward_reserve.safe_add(income)?;
            }
            SyncOutcome::RoutedToInsurance(income) => {
                self.insurance.skim(SkimSource::UnallocatedIncome, income)?;
            }
        }
        self.total_reward_income = self.total_reward_income.safe_add(income as u128)?;
        Ok(outcome)
    }

    /// Price the payout of `base` to `position` at `now`
    pub fn quote_reward(
        &self,
        base: Amount,
        position: &StakePosition,
        now: Timestamp,
    ) -> Result<RewardQuote> {
        let owed = apply_multipliers(base, &self.params, position, now)?;
        let from_reserve = owed.min(base);
        let boost = owed - from_reserve;
        Ok(RewardQuote {
            base,
            owed,
            from_reserve,
            from_insurance: boost.min(self.insurance.balance),
            withheld: base - from_reserve,
        })
    }

    /// Move the funds behind `quote` out of the reserve and insurance fund
    pub fn fund_reward(&mut self, quote: &RewardQuote) -> Result<()> {
        self.reward_reserve = self.reward_reserve.safe_sub(quote.base)?;
        self.insurance.skim(SkimSource::WithheldReward, quote.withheld)?;
        self.insurance.fund_boost(quote.from_insurance)
    }

    pub fn total_staked(&self) -> Amount {
        self.accumulator.total_staked
    }

    /// Tokens the vault must hold for this state to be solvent
    pub fn vault_liabilities(&self) -> u128 {
        self.accumulator.total_staked as u128
            + self.insurance.balance as u128
            + self.reward_reserve as u128
    }
}
