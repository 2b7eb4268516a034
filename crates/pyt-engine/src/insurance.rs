//! # Insurance Fund
//!
//! Absorbs early-withdrawal penalties, claim fees, income that arrived
//! while nothing was staked and reward withheld by a throttling multiplier.
//! It also funds the part of a claim that multipliers lift above the base
//! share. Only governance may draw from it directly, with a recorded reason.

use pyt_core::error::{PytError, Result};
use pyt_core::math::SafeMath;
use pyt_core::types::{AccountId, Amount, Timestamp};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Where an insurance inflow came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkimSource {
    EarlyWithdrawalPenalty,
    ClaimFee,
    UnallocatedIncome,
    /// Base reward a multiplier below 1x did not pay out
    WithheldReward,
}

/// Governance-approved outflow
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drawdown {
    pub recipient: AccountId,
    pub amount: Amount,
    pub reason: String,
    pub timestamp: Timestamp,
}

/// Insurance balance with per-source totals
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsuranceFund {
    pub balance: Amount,
    pub total_penalties: u128,
    pub total_claim_fees: u128,
    pub total_unallocated_income: u128,
    pub total_withheld_rewards: u128,
    /// Paid to claimants above their base share
    pub total_boosts_paid: u128,
    pub total_drawn: u128,
    /// Most recent drawdown, kept for audit
    pub last_drawdown: Option<Drawdown>,
}

impl InsuranceFund {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit `amount` from `source`
    pub fn skim(&mut self, source: SkimSource, amount: Amount) -> Result<()> {
        if amount == 0 {
            return Ok(());
        }
        self.balance = self.balance.safe_add(amount)?;

        let total = match source {
            SkimSource::EarlyWithdrawalPenalty => &mut self.total_penalties,
            SkimSource::ClaimFee => &mut self.total_claim_fees,
            SkimSource::UnallocatedIncome => &mut self.total_unallocated_income,
            SkimSource::WithheldReward => &mut self.total_withheld_rewards,
        };
        *total = total.safe_add(amount as u128)?;
        Ok(())
    }

    /// Debit the boosted part of a claim
    pub fn fund_boost(&mut self, amount: Amount) -> Result<()> {
        if amount > self.balance {
            return Err(PytError::InsufficientInsuranceFund {
                requested: amount,
                available: self.balance,
            });
        }
        self.balance -= amount;
        self.total_boosts_paid = self.total_boosts_paid.safe_add(amount as u128)?;
        Ok(())
    }

    /// Debit a drawdown; caller must already be authorized
    pub fn draw(
        &mut self,
        recipient: AccountId,
        amount: Amount,
        reason: &str,
        now: Timestamp,
    ) -> Result<Drawdown> {
        if amount == 0 {
            return Err(PytError::invalid("amount", 0, "drawdown must be positive"));
        }
        if reason.trim().is_empty() {
            return Err(PytError::invalid(
                "reason",
                0,
                "drawdown requires a recorded reason",
            ));
        }
        if amount > self.balance {
            return Err(PytError::InsufficientInsuranceFund {
                requested: amount,
                available: self.balance,
            });
        }

        self.balance -= amount;
        self.total_drawn = self.total_drawn.safe_add(amount as u128)?;

        let drawdown = Drawdown {
            recipient,
            amount,
            reason: reason.to_string(),
            timestamp: now,
        };
        self.last_drawdown = Some(drawdown.clone());

        info!(%recipient, amount, reason, "insurance drawdown");
        Ok(drawdown)
    }
}
