//! In-memory partition store.

use std::collections::HashMap;

use revbridge_types::{AccountId, Amount, Partition};

use crate::{PartitionError, PartitionStore, Result};

/// Partition balances held in a `HashMap`. Lost on drop.
#[derive(Debug, Default)]
pub struct MemoryPartitionStore {
    balances: HashMap<(Partition, AccountId), Amount>,
    supply: HashMap<Partition, Amount>,
}

impl MemoryPartitionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PartitionStore for MemoryPartitionStore {
    fn issue(&mut self, partition: Partition, account: &AccountId, amount: Amount) -> Result<()> {
        if account.is_zero() {
            return Err(PartitionError::ZeroAccount);
        }
        if amount == 0 {
            return Ok(());
        }

        let overflow = || PartitionError::Overflow {
            partition,
            account: *account,
        };
        let balance = self.balances.get(&(partition, *account)).copied().unwrap_or(0);
        let supply = self.supply.get(&partition).copied().unwrap_or(0);
        let new_balance = balance.checked_add(amount).ok_or_else(overflow)?;
        let new_supply = supply.checked_add(amount).ok_or_else(overflow)?;

        self.balances.insert((partition, *account), new_balance);
        self.supply.insert(partition, new_supply);
        Ok(())
    }

    fn burn(&mut self, partition: Partition, account: &AccountId, amount: Amount) -> Result<()> {
        if account.is_zero() {
            return Err(PartitionError::ZeroAccount);
        }
        if amount == 0 {
            return Ok(());
        }

        let balance = self.balances.get(&(partition, *account)).copied().unwrap_or(0);
        if balance < amount {
            return Err(PartitionError::InsufficientBalance {
                partition,
                account: *account,
                balance,
                requested: amount,
            });
        }

        let remaining = balance - amount;
        if remaining == 0 {
            self.balances.remove(&(partition, *account));
        } else {
            self.balances.insert((partition, *account), remaining);
        }
        // Supply is at least any single balance
        let supply = self.supply.entry(partition).or_insert(0);
        *supply = supply.saturating_sub(amount);
        Ok(())
    }

    fn balance_of(&self, partition: Partition, account: &AccountId) -> Result<Amount> {
        Ok(self.balances.get(&(partition, *account)).copied().unwrap_or(0))
    }

    fn total_supply(&self, partition: Partition) -> Result<Amount> {
        Ok(self.supply.get(&partition).copied().unwrap_or(0))
    }
}
