//! Per-participant stake positions

use crate::params::GovernanceParams;
use pyt_core::clock::elapsed_secs;
use pyt_core::error::Result;
use pyt_core::math::SafeMath;
use pyt_core::types::{AccountId, Amount, Timestamp};
use serde::{Deserialize, Serialize};

/// Lifecycle of a position as seen at a given time
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PositionStatus {
    /// Created but never funded
    Uninitialized,
    /// Staked, withdrawals still carry the early penalty
    Cooling,
    /// Staked past the cooldown, withdrawals are penalty-free
    Claimable,
    /// No principal left; unclaimed reward may remain
    Withdrawn,
}

/// One participant's stake and reward bookkeeping
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakePosition {
    pub owner: AccountId,
    pub principal: Amount,
    /// Accumulator value at the last accrue or settle
    pub reward_debt_per_share: u128,
    /// Banked, not yet claimed base reward
    pub accrued_reward: Amount,
    pub last_stake_timestamp: Timestamp,
    pub last_claim_timestamp: Timestamp,
    /// Zero until the first withdrawal
    pub last_withdraw_timestamp: Timestamp,
    /// Checkpoint slot of the last accepted claim proof
    pub last_claim_slot: Option<u64>,
    /// Net reward paid or compounded over the position's life
    pub total_rewards_claimed: u128,
    pub auto_compound: bool,
    pub is_liquidity_provider: bool,
}

impl StakePosition {
    /// Empty position opened at `now`
    ///
    /// The claim clock starts at creation, so a fresh position must wait
    /// `min_claim_delay` before its first claim.
    pub fn new(owner: AccountId, now: Timestamp) -> Self {
        Self {
            owner,
            principal: 0,
            reward_debt_per_share: 0,
            accrued_reward: 0,
            last_stake_timestamp: now,
            last_claim_timestamp: now,
            last_withdraw_timestamp: 0,
            last_claim_slot: None,
            total_rewards_claimed: 0,
            auto_compound: false,
            is_liquidity_provider: false,
        }
    }

    /// Add principal; the stake clock restarts
    pub fn add_principal(&mut self, amount: Amount, now: Timestamp) -> Result<()> {
        self.principal = self.principal.safe_add(amount)?;
        self.last_stake_timestamp = now;
        Ok(())
    }

    pub fn remove_principal(&mut self, amount: Amount, now: Timestamp) -> Result<()> {
        self.principal = self.principal.safe_sub(amount)?;
        self.last_withdraw_timestamp = now;
        Ok(())
    }

    /// Nothing left to track
    ///
    /// Governance and owner flags and the replay slot are state too, so a
    /// fully withdrawn position that carries any of them is kept.
    pub fn is_empty(&self) -> bool {
        self.principal == 0
            && self.accrued_reward == 0
            && self.last_claim_slot.is_none()
            && !self.auto_compound
            && !self.is_liquidity_provider
    }

    /// Seconds since the last stake
    pub fn held_for(&self, now: Timestamp) -> u64 {
        elapsed_secs(self.last_stake_timestamp, now)
    }

    pub fn status(&self, now: Timestamp, params: &GovernanceParams) -> PositionStatus {
        if self.principal > 0 {
            if self.held_for(now) < params.cooldown_period {
                PositionStatus::Cooling
            } else {
                PositionStatus::Claimable
            }
        } else if self.last_withdraw_timestamp == 0 && self.accrued_reward == 0 {
            PositionStatus::Uninitialized
        } else {
            PositionStatus::Withdrawn
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> AccountId {
        AccountId::new([7u8; 32])
    }

    #[test]
    fn test_new_position_is_uninitialized() {
        let position = StakePosition::new(alice(), 100);
        assert!(position.is_empty());
        assert_eq!(
            position.status(100, &GovernanceParams::default()),
            PositionStatus::Uninitialized
        );
    }

    #[test]
    fn test_flags_keep_withdrawn_position() {
        let mut position = StakePosition::new(alice(), 0);
        position.add_principal(10, 0).unwrap();
        position.remove_principal(10, 1).unwrap();
        assert!(position.is_empty());

        position.is_liquidity_provider = true;
        assert!(!position.is_empty());

        position.is_liquidity_provider = false;
        position.last_claim_slot = Some(3);
        assert!(!position.is_empty());
    }

    #[test]
    fn test_status_transitions() {
        let params = GovernanceParams {
            cooldown_period: 100,
            ..Default::default()
        };
        let mut position = StakePosition::new(alice(), 0);
        position.add_principal(50, 0).unwrap();

        assert_eq!(position.status(10, &params), PositionStatus::Cooling);
        assert_eq!(position.status(100, &params), PositionStatus::Claimable);

        position.remove_principal(50, 200).unwrap();
        assert_eq!(position.status(200, &params), PositionStatus::Withdrawn);
        assert_eq!(position.last_withdraw_timestamp, 200);
    }

    #[test]
    fn test_restake_restarts_clock() {
        let mut position = StakePosition::new(alice(), 0);
        position.add_principal(10, 0).unwrap();
        position.add_principal(10, 500).unwrap();

        assert_eq!(position.principal, 20);
        assert_eq!(position.held_for(600), 100);
    }

    #[test]
    fn test_remove_more_than_principal_fails() {
        let mut position = StakePosition::new(alice(), 0);
        position.add_principal(10, 0).unwrap();
        assert!(position.remove_principal(11, 1).is_err());
        assert_eq!(position.principal, 10);
    }
}
