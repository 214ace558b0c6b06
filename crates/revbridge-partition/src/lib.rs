//! # revbridge-partition
//!
//! Token partition store: per-partition, per-account balances that the
//! bridge issues into when revenue settles and burns from on reversal.
//!
//! ## Modules
//!
//! - [`memory`] — [`MemoryPartitionStore`], a `HashMap`-backed store
//! - [`sqlite`] — [`SqlitePartitionStore`], a durable store in its own database file

pub mod memory;
pub mod sqlite;

pub use memory::MemoryPartitionStore;
pub use sqlite::SqlitePartitionStore;

use revbridge_types::{AccountId, Amount, Partition};

/// Error types for partition store operations.
#[derive(Debug, thiserror::Error)]
pub enum PartitionError {
    /// Burn exceeds the account's balance in that partition.
    #[error("insufficient {partition} balance for {account}: have {balance}, need {requested}")]
    InsufficientBalance {
        partition: Partition,
        account: AccountId,
        balance: Amount,
        requested: Amount,
    },

    /// Issuing would overflow a balance or the partition supply.
    #[error("{partition} balance overflow for {account}")]
    Overflow { partition: Partition, account: AccountId },

    /// Issue or burn into the zero account.
    #[error("zero account is not a valid holder")]
    ZeroAccount,

    #[error("partition storage error: {0}")]
    Storage(String),
}

impl From<rusqlite::Error> for PartitionError {
    fn from(err: rusqlite::Error) -> Self {
        PartitionError::Storage(err.to_string())
    }
}

impl From<revbridge_db::DbError> for PartitionError {
    fn from(err: revbridge_db::DbError) -> Self {
        PartitionError::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PartitionError>;

/// Balance store keyed by partition and account.
///
/// Issue and burn are individually atomic. A zero amount is a no-op.
pub trait PartitionStore {
    /// Credit `amount` to `account` in `partition`.
    fn issue(&mut self, partition: Partition, account: &AccountId, amount: Amount) -> Result<()>;

    /// Debit `amount` from `account` in `partition`.
    ///
    /// # Errors
    ///
    /// - [`PartitionError::InsufficientBalance`] if the balance is short; nothing is debited
    fn burn(&mut self, partition: Partition, account: &AccountId, amount: Amount) -> Result<()>;

    /// Current balance of `account` in `partition`.
    fn balance_of(&self, partition: Partition, account: &AccountId) -> Result<Amount>;

    /// Sum of all balances in `partition`.
    fn total_supply(&self, partition: Partition) -> Result<Amount>;
}

impl<S: PartitionStore + ?Sized> PartitionStore for Box<S> {
    fn issue(&mut self, partition: Partition, account: &AccountId, amount: Amount) -> Result<()> {
        (**self).issue(partition, account, amount)
    }

    fn burn(&mut self, partition: Partition, account: &AccountId, amount: Amount) -> Result<()> {
        (**self).burn(partition, account, amount)
    }

    fn balance_of(&self, partition: Partition, account: &AccountId) -> Result<Amount> {
        (**self).balance_of(partition, account)
    }

    fn total_supply(&self, partition: Partition) -> Result<Amount> {
        (**self).total_supply(partition)
    }
}
