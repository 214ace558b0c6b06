//! Allocation configuration and per-partition splits.

use serde::{Deserialize, Serialize};

use crate::{Amount, Partition};

/// Four-way partition weights in basis points. Valid configs sum to 10000.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationConfig {
    pub reserve_bps: u16,
    pub liquidity_bps: u16,
    pub enterprise_bps: u16,
    pub staking_bps: u16,
}

impl AllocationConfig {
    pub const fn new(reserve_bps: u16, liquidity_bps: u16, enterprise_bps: u16, staking_bps: u16) -> Self {
        Self {
            reserve_bps,
            liquidity_bps,
            enterprise_bps,
            staking_bps,
        }
    }

    /// Sum of all four weights, widened so an invalid config cannot overflow.
    pub fn total_bps(&self) -> u32 {
        u32::from(self.reserve_bps)
            + u32::from(self.liquidity_bps)
            + u32::from(self.enterprise_bps)
            + u32::from(self.staking_bps)
    }
}

/// The concrete per-partition amounts issued for one settlement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub reserve: Amount,
    pub liquidity: Amount,
    pub enterprise: Amount,
    pub staking: Amount,
}

impl Allocation {
    pub fn amount(&self, partition: Partition) -> Amount {
        match partition {
            Partition::Reserve => self.reserve,
            Partition::Liquidity => self.liquidity,
            Partition::Enterprise => self.enterprise,
            Partition::Staking => self.staking,
        }
    }

    /// `(partition, amount)` pairs in allocation order, zero amounts included.
    pub fn entries(&self) -> [(Partition, Amount); 4] {
        Partition::ALL.map(|p| (p, self.amount(p)))
    }

    /// Pairs with a non-zero amount, in allocation order.
    pub fn non_zero(&self) -> impl Iterator<Item = (Partition, Amount)> {
        self.entries().into_iter().filter(|(_, amount)| *amount > 0)
    }

    /// Sum of the four buckets, or `None` on overflow.
    pub fn checked_total(&self) -> Option<Amount> {
        self.reserve
            .checked_add(self.liquidity)?
            .checked_add(self.enterprise)?
            .checked_add(self.staking)
    }
}
