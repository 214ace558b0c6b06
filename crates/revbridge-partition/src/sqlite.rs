//! Durable partition store backed by SQLite.
//!
//! Lives in its own database file (`partitions.db`) so the token side can be
//! inspected and backed up independently of the settlement ledger.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use revbridge_types::{AccountId, Amount, Partition};

use crate::{PartitionError, PartitionStore, Result};

/// Current partition schema version.
pub const PARTITION_SCHEMA_VERSION: u32 = 1;

const PARTITION_SCHEMA_V1: &str = r#"
CREATE TABLE IF NOT EXISTS partition_balances (
    partition TEXT NOT NULL CHECK (partition IN ('reserve', 'liquidity', 'enterprise', 'staking')),
    account   BLOB NOT NULL CHECK (length(account) = 20),
    balance   INTEGER NOT NULL CHECK (balance >= 0),
    PRIMARY KEY (partition, account)
);

CREATE TABLE IF NOT EXISTS partition_supply (
    partition TEXT PRIMARY KEY CHECK (partition IN ('reserve', 'liquidity', 'enterprise', 'staking')),
    supply    INTEGER NOT NULL CHECK (supply >= 0)
);
"#;

/// Partition balances persisted in SQLite.
pub struct SqlitePartitionStore {
    conn: Connection,
}

impl SqlitePartitionStore {
    /// Open or create the store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open an in-memory store (for testing).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        revbridge_db::configure(&conn)?;

        let version: u32 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        if version == 0 {
            tracing::info!("Initializing partition schema v{PARTITION_SCHEMA_VERSION}");
            conn.execute_batch(PARTITION_SCHEMA_V1)?;
            conn.pragma_update(None, "user_version", PARTITION_SCHEMA_VERSION)?;
        } else if version > PARTITION_SCHEMA_VERSION {
            return Err(PartitionError::Storage(format!(
                "partition database version {version} is newer than supported {PARTITION_SCHEMA_VERSION}"
            )));
        }

        Ok(Self { conn })
    }
}

fn to_sql(value: Amount, partition: Partition, account: &AccountId) -> Result<i64> {
    i64::try_from(value).map_err(|_| PartitionError::Overflow {
        partition,
        account: *account,
    })
}

fn read_balance(conn: &Connection, partition: Partition, account: &AccountId) -> Result<Amount> {
    let raw: Option<i64> = conn
        .query_row(
            "SELECT balance FROM partition_balances WHERE partition = ?1 AND account = ?2",
            rusqlite::params![partition.as_str(), account.as_bytes().as_slice()],
            |row| row.get(0),
        )
        .optional()?;
    u64::try_from(raw.unwrap_or(0)).map_err(|e| PartitionError::Storage(e.to_string()))
}

fn read_supply(conn: &Connection, partition: Partition) -> Result<Amount> {
    let raw: Option<i64> = conn
        .query_row(
            "SELECT supply FROM partition_supply WHERE partition = ?1",
            [partition.as_str()],
            |row| row.get(0),
        )
        .optional()?;
    u64::try_from(raw.unwrap_or(0)).map_err(|e| PartitionError::Storage(e.to_string()))
}

fn write_balances(
    conn: &Connection,
    partition: Partition,
    account: &AccountId,
    balance: Amount,
    supply: Amount,
) -> Result<()> {
    conn.execute(
        "INSERT INTO partition_balances (partition, account, balance) VALUES (?1, ?2, ?3)
         ON CONFLICT(partition, account) DO UPDATE SET balance = excluded.balance",
        rusqlite::params![
            partition.as_str(),
            account.as_bytes().as_slice(),
            to_sql(balance, partition, account)?,
        ],
    )?;
    conn.execute(
        "INSERT INTO partition_supply (partition, supply) VALUES (?1, ?2)
         ON CONFLICT(partition) DO UPDATE SET supply = excluded.supply",
        rusqlite::params![partition.as_str(), to_sql(supply, partition, account)?],
    )?;
    Ok(())
}

impl PartitionStore for SqlitePartitionStore {
    fn issue(&mut self, partition: Partition, account: &AccountId, amount: Amount) -> Result<()> {
        if account.is_zero() {
            return Err(PartitionError::ZeroAccount);
        }
        if amount == 0 {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        let overflow = || PartitionError::Overflow {
            partition,
            account: *account,
        };
        let balance = read_balance(&tx, partition, account)?
            .checked_add(amount)
            .ok_or_else(overflow)?;
        let supply = read_supply(&tx, partition)?
            .checked_add(amount)
            .ok_or_else(overflow)?;
        write_balances(&tx, partition, account, balance, supply)?;
        tx.commit()?;

        debug!(%partition, %account, amount, "partition issued");
        Ok(())
    }

    fn burn(&mut self, partition: Partition, account: &AccountId, amount: Amount) -> Result<()> {
        if account.is_zero() {
            return Err(PartitionError::ZeroAccount);
        }
        if amount == 0 {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        let balance = read_balance(&tx, partition, account)?;
        if balance < amount {
            return Err(PartitionError::InsufficientBalance {
                partition,
                account: *account,
                balance,
                requested: amount,
            });
        }
        let supply = read_supply(&tx, partition)?.saturating_sub(amount);
        write_balances(&tx, partition, account, balance - amount, supply)?;
        tx.commit()?;

        debug!(%partition, %account, amount, "partition burned");
        Ok(())
    }

    fn balance_of(&self, partition: Partition, account: &AccountId) -> Result<Amount> {
        read_balance(&self.conn, partition, account)
    }

    fn total_supply(&self, partition: Partition) -> Result<Amount> {
        read_supply(&self.conn, partition)
    }
}
