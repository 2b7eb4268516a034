//! Fixed-point arithmetic for accumulator and share math
//!
//! All values are unsigned integers. Multiplications run in `u128` and every
//! step is checked: overflow, underflow and division by zero surface as
//! [`PytError::ArithmeticOverflow`] and abort the operation. Every division
//! floors, so rounding dust stays in the pool and is never paid out.

use crate::error::{PytError, Result};
use crate::types::{Amount, BasisPoints};

/// Precision of `acc_reward_per_share` (10^12)
pub const SCALE: u128 = 1_000_000_000_000;

/// Denominator for basis-point fields
pub const BPS_DENOMINATOR: BasisPoints = 10_000;

/// Denominator for percentage multipliers (100 = 1x)
pub const PERCENT_DENOMINATOR: u64 = 100;

/// Checked arithmetic returning engine errors instead of `Option`
pub trait SafeMath: Sized {
    fn safe_add(self, rhs: Self) -> Result<Self>;
    fn safe_sub(self, rhs: Self) -> Result<Self>;
    fn safe_mul(self, rhs: Self) -> Result<Self>;
    fn safe_div(self, rhs: Self) -> Result<Self>;
}

macro_rules! checked_impl {
    ($t:ty) => {
        impl SafeMath for $t {
            #[inline(always)]
            fn safe_add(self, rhs: $t) -> Result<$t> {
                self.checked_add(rhs)
                    .ok_or(PytError::ArithmeticOverflow("add"))
            }

            #[inline(always)]
            fn safe_sub(self, rhs: $t) -> Result<$t> {
                self.checked_sub(rhs)
                    .ok_or(PytError::ArithmeticOverflow("sub"))
            }

            #[inline(always)]
            fn safe_mul(self, rhs: $t) -> Result<$t> {
                self.checked_mul(rhs)
                    .ok_or(PytError::ArithmeticOverflow("mul"))
            }

            #[inline(always)]
            fn safe_div(self, rhs: $t) -> Result<$t> {
                self.checked_div(rhs)
                    .ok_or(PytError::ArithmeticOverflow("div"))
            }
        }
    };
}

checked_impl!(u64);
checked_impl!(u128);

/// Narrow a widened intermediate back into a token amount
pub fn to_amount(value: u128) -> Result<Amount> {
    Amount::try_from(value).map_err(|_| PytError::ArithmeticOverflow("narrow to u64"))
}

/// `floor(value * numerator / denominator)` with a `u128` intermediate
pub fn mul_div_floor(value: u128, numerator: u128, denominator: u128) -> Result<u128> {
    if denominator == 0 {
        return Err(PytError::ArithmeticOverflow("div by zero"));
    }
    value.safe_mul(numerator)?.safe_div(denominator)
}

/// `floor(amount * bps / 10_000)`
pub fn bps_of(amount: Amount, bps: BasisPoints) -> Result<Amount> {
    to_amount(mul_div_floor(
        amount as u128,
        bps as u128,
        BPS_DENOMINATOR as u128,
    )?)
}

/// `floor(amount * percent / 100)`
pub fn percent_of(amount: Amount, percent: u64) -> Result<Amount> {
    to_amount(mul_div_floor(
        amount as u128,
        percent as u128,
        PERCENT_DENOMINATOR as u128,
    )?)
}

/// Accumulator increment for `income` spread over `total_staked` units
pub fn reward_per_share(income: Amount, total_staked: Amount) -> Result<u128> {
    mul_div_floor(income as u128, SCALE, total_staked as u128)
}

/// Reward earned by `principal` units over an accumulator delta
pub fn accrued_for(principal: Amount, per_share_delta: u128) -> Result<Amount> {
    to_amount(mul_div_floor(principal as u128, per_share_delta, SCALE)?)
}
