//! # Withdrawal and Claim Policy
//!
//! Pure rules over a position and the current time. Nothing here mutates
//! state.
//!
//! | Rule | Condition | Failure |
//! |------|-----------|---------|
//! | Withdraw interval | `now - max(last stake, last withdraw) >= min_withdraw_interval` | `CooldownNotElapsed` |
//! | Claim delay | `now - last claim >= min_claim_delay` | `CooldownNotElapsed` |
//! | Stake period | `now - last stake >= cooldown_period` before a claim | `CooldownNotElapsed` |
//! | Early penalty | held `< cooldown_period` | penalty `max(1, floor(amount * bps / 10000))` |
//!
//! The one-unit floor on the penalty keeps dust-sized withdrawals from
//! leaving the cooldown for free.

use crate::params::GovernanceParams;
use crate::position::StakePosition;
use pyt_core::clock::elapsed_secs;
use pyt_core::error::{PytError, Result, TimeGate};
use pyt_core::math::{bps_of, SafeMath};
use pyt_core::types::{Amount, BasisPoints, Seconds, Timestamp};

/// Penalty on withdrawing `amount` after holding it `held` seconds
pub fn penalty(
    amount: Amount,
    held: Seconds,
    cooldown_period: Seconds,
    penalty_bps: BasisPoints,
) -> Result<Amount> {
    if held >= cooldown_period || amount == 0 || penalty_bps == 0 {
        return Ok(0);
    }
    Ok(bps_of(amount, penalty_bps)?.max(1))
}

/// Split of a withdrawal between the participant and the insurance fund
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WithdrawalQuote {
    pub amount: Amount,
    pub penalty: Amount,
    pub net: Amount,
    pub held: Seconds,
}

/// Price a withdrawal of `amount` from `position` at `now`
pub fn quote_withdrawal(
    position: &StakePosition,
    amount: Amount,
    now: Timestamp,
    params: &GovernanceParams,
) -> Result<WithdrawalQuote> {
    let held = position.held_for(now);
    let penalty = penalty(
        amount,
        held,
        params.cooldown_period,
        params.early_withdrawal_penalty_bps,
    )?;
    Ok(WithdrawalQuote {
        amount,
        penalty,
        net: amount.safe_sub(penalty)?,
        held,
    })
}

/// Enforce the hard floor between withdrawals
///
/// Measured from the later of the last stake and the last withdrawal.
pub fn check_withdraw_interval(
    position: &StakePosition,
    now: Timestamp,
    min_interval: Seconds,
) -> Result<()> {
    let since = position
        .last_stake_timestamp
        .max(position.last_withdraw_timestamp);
    check_gate(TimeGate::MinWithdrawInterval, since, now, min_interval)
}

/// Enforce the spacing between claims
pub fn check_claim_delay(
    position: &StakePosition,
    now: Timestamp,
    min_delay: Seconds,
) -> Result<()> {
    check_gate(
        TimeGate::MinClaimDelay,
        position.last_claim_timestamp,
        now,
        min_delay,
    )
}

/// Keep freshly staked principal from claiming before the cooldown
pub fn check_stake_period(
    position: &StakePosition,
    now: Timestamp,
    cooldown_period: Seconds,
) -> Result<()> {
    check_gate(
        TimeGate::MinStakePeriod,
        position.last_stake_timestamp,
        now,
        cooldown_period,
    )
}

fn check_gate(gate: TimeGate, since: Timestamp, now: Timestamp, required: Seconds) -> Result<()> {
    let elapsed = elapsed_secs(since, now);
    if elapsed < required {
        return Err(PytError::CooldownNotElapsed {
            gate,
            required,
            elapsed,
        });
    }
    Ok(())
}
