//! Allocation calculator.
//!
//! Bridged revenue is distributed among four partitions:
//!
//! - **Reserve**: Default 40.00% (4000 bps)
//! - **Liquidity**: Default 30.00% (3000 bps)
//! - **Enterprise**: Default 20.00% (2000 bps)
//! - **Staking**: Default 10.00% (1000 bps), plus the rounding remainder
//!
//! Reserve, liquidity and enterprise are truncated proportional shares.
//! Staking receives `amount - reserve - liquidity - enterprise`, not its own
//! proportional share, so the four buckets always sum to the input exactly.
//! With the default weights, 99 splits as 39/29/19/12.

use revbridge_types::{Allocation, AllocationConfig, Amount, BPS_DENOMINATOR};

use crate::{AllocationError, Result};

/// Default reserve weight in bps.
pub const DEFAULT_RESERVE_BPS: u16 = 4000;

/// Default liquidity weight in bps.
pub const DEFAULT_LIQUIDITY_BPS: u16 = 3000;

/// Default enterprise weight in bps.
pub const DEFAULT_ENTERPRISE_BPS: u16 = 2000;

/// Default staking weight in bps.
pub const DEFAULT_STAKING_BPS: u16 = 1000;

/// Default allocation: 4000/3000/2000/1000.
pub const DEFAULT_ALLOCATION: AllocationConfig = AllocationConfig::new(
    DEFAULT_RESERVE_BPS,
    DEFAULT_LIQUIDITY_BPS,
    DEFAULT_ENTERPRISE_BPS,
    DEFAULT_STAKING_BPS,
);

/// Validate an allocation configuration.
///
/// # Errors
///
/// - [`AllocationError::InvalidPercentages`] if weights do not sum to 10000
pub fn validate_allocation(config: &AllocationConfig) -> Result<()> {
    let total = config.total_bps();
    if total != u32::from(BPS_DENOMINATOR) {
        return Err(AllocationError::InvalidPercentages { total });
    }
    Ok(())
}

/// Split `amount` across the four partitions.
///
/// A zero amount yields an all-zero allocation; rejecting zero is the
/// caller's job.
///
/// # Errors
///
/// - [`AllocationError::InvalidPercentages`] if the config is invalid
pub fn allocate(amount: Amount, config: &AllocationConfig) -> Result<Allocation> {
    validate_allocation(config)?;

    let reserve = proportional_share(amount, config.reserve_bps)?;
    let liquidity = proportional_share(amount, config.liquidity_bps)?;
    let enterprise = proportional_share(amount, config.enterprise_bps)?;

    // Staking takes the remainder so no dust is lost
    let staking = amount
        .checked_sub(reserve)
        .and_then(|rest| rest.checked_sub(liquidity))
        .and_then(|rest| rest.checked_sub(enterprise))
        .ok_or(AllocationError::Overflow)?;

    Ok(Allocation {
        reserve,
        liquidity,
        enterprise,
        staking,
    })
}

/// `amount * bps / 10000`, truncating. Computed in 128 bits.
fn proportional_share(amount: Amount, bps: u16) -> Result<Amount> {
    let share = u128::from(amount) * u128::from(bps) / u128::from(BPS_DENOMINATOR);
    Amount::try_from(share).map_err(|_| AllocationError::Overflow)
}
