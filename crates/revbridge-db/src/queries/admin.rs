//! Control-plane row: owner, operator, allocation weights, pause flag.

use rusqlite::{Connection, OptionalExtension};

use revbridge_types::{AccountId, AllocationConfig};

use crate::{blob_err, column_u64, to_sql_int, DbError, Result};

/// Contents of the single `bridge_admin` row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AdminState {
    pub owner: AccountId,
    pub operator: AccountId,
    pub allocation: AllocationConfig,
    pub paused: bool,
    /// Environment discriminator mixed into settlement IDs.
    pub chain_id: u64,
    pub updated_at: u64,
}

/// Load the control-plane row, if it has been initialized.
pub fn get(conn: &Connection) -> Result<Option<AdminState>> {
    let state = conn
        .query_row(
            "SELECT owner, operator, reserve_bps, liquidity_bps, enterprise_bps, staking_bps,
                    paused, chain_id, updated_at
             FROM bridge_admin WHERE id = 1",
            [],
            |row| {
                let owner: Vec<u8> = row.get(0)?;
                let operator: Vec<u8> = row.get(1)?;
                Ok(AdminState {
                    owner: AccountId::from_slice(&owner).map_err(|e| blob_err(0, e))?,
                    operator: AccountId::from_slice(&operator).map_err(|e| blob_err(1, e))?,
                    allocation: AllocationConfig {
                        reserve_bps: row.get(2)?,
                        liquidity_bps: row.get(3)?,
                        enterprise_bps: row.get(4)?,
                        staking_bps: row.get(5)?,
                    },
                    paused: row.get::<_, i64>(6)? != 0,
                    chain_id: column_u64(row, 7)?,
                    updated_at: column_u64(row, 8)?,
                })
            },
        )
        .optional()?;
    Ok(state)
}

/// Write the control-plane row, creating it on first use.
pub fn put(conn: &Connection, state: &AdminState) -> Result<()> {
    let c = &state.allocation;
    conn.execute(
        "INSERT INTO bridge_admin
            (id, owner, operator, reserve_bps, liquidity_bps, enterprise_bps, staking_bps,
             paused, chain_id, updated_at)
         VALUES (1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
         ON CONFLICT(id) DO UPDATE SET
             owner = excluded.owner,
             operator = excluded.operator,
             reserve_bps = excluded.reserve_bps,
             liquidity_bps = excluded.liquidity_bps,
             enterprise_bps = excluded.enterprise_bps,
             staking_bps = excluded.staking_bps,
             paused = excluded.paused,
             chain_id = excluded.chain_id,
             updated_at = excluded.updated_at",
        rusqlite::params![
            state.owner.as_bytes().as_slice(),
            state.operator.as_bytes().as_slice(),
            c.reserve_bps,
            c.liquidity_bps,
            c.enterprise_bps,
            c.staking_bps,
            i64::from(state.paused),
            to_sql_int(state.chain_id, "chain_id")?,
            to_sql_int(state.updated_at, "updated_at")?,
        ],
    )
    .map_err(DbError::Sqlite)?;
    Ok(())
}
