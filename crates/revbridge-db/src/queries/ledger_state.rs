//! Ledger-state row: running totals and the settlement nonce.

use rusqlite::Connection;

use revbridge_types::RevenueTotals;

use crate::{column_u64, to_sql_int, DbError, Result};

/// Contents of the single `ledger_state` row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LedgerState {
    pub totals: RevenueTotals,
    /// Last nonce handed out. The next settlement uses `nonce + 1`.
    pub nonce: u64,
}

/// Load the ledger state.
pub fn get(conn: &Connection) -> Result<LedgerState> {
    conn.query_row(
        "SELECT total_revenue_bridged, total_revenue_reversed, settlement_count, nonce
         FROM ledger_state WHERE id = 1",
        [],
        |row| {
            Ok(LedgerState {
                totals: RevenueTotals {
                    total_revenue_bridged: column_u64(row, 0)?,
                    total_revenue_reversed: column_u64(row, 1)?,
                    settlement_count: column_u64(row, 2)?,
                },
                nonce: column_u64(row, 3)?,
            })
        },
    )
    .map_err(|e| match e {
        rusqlite::Error::QueryReturnedNoRows => DbError::NotFound("ledger state row".into()),
        other => DbError::Sqlite(other),
    })
}

/// Overwrite the ledger state.
pub fn put(conn: &Connection, state: &LedgerState) -> Result<()> {
    let updated = conn.execute(
        "UPDATE ledger_state
         SET total_revenue_bridged = ?1,
             total_revenue_reversed = ?2,
             settlement_count = ?3,
             nonce = ?4
         WHERE id = 1",
        rusqlite::params![
            to_sql_int(state.totals.total_revenue_bridged, "total_revenue_bridged")?,
            to_sql_int(state.totals.total_revenue_reversed, "total_revenue_reversed")?,
            to_sql_int(state.totals.settlement_count, "settlement_count")?,
            to_sql_int(state.nonce, "nonce")?,
        ],
    )?;
    if updated == 0 {
        return Err(DbError::NotFound("ledger state row".into()));
    }
    Ok(())
}
