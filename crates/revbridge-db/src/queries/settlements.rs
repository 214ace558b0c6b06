//! Settlement and invoice-index query functions.

use rusqlite::{Connection, OptionalExtension, Row};

use revbridge_types::{AccountId, Allocation, AllocationConfig, RevenueEntry, SettlementId, SettlementStatus};

use crate::{blob_err, column_opt_u64, column_parse, column_u64, is_unique_violation, to_sql_int, DbError, Result};

const ENTRY_COLUMNS: &str = "settlement_id, invoice_id, payer, beneficiary, amount, currency,
    source_system, destination_system, status,
    reserve_amount, liquidity_amount, enterprise_amount, staking_amount,
    reserve_bps, liquidity_bps, enterprise_bps, staking_bps,
    nonce, bridged_at, settled_at, reversal_reason, reversed_at, disputed_at";

/// Insert a new settlement row.
///
/// # Errors
///
/// - [`DbError::Constraint`] if the settlement ID, invoice ID or nonce already exists
pub fn insert(conn: &Connection, entry: &RevenueEntry) -> Result<()> {
    let a = &entry.allocation;
    let c = &entry.allocation_config;
    conn.execute(
        &format!(
            "INSERT INTO settlements ({ENTRY_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
                     ?18, ?19, ?20, ?21, ?22, ?23)"
        ),
        rusqlite::params![
            entry.settlement_id.as_bytes().as_slice(),
            entry.invoice_id,
            entry.payer.as_ref().map(|p| p.as_bytes().to_vec()),
            entry.beneficiary.as_bytes().as_slice(),
            to_sql_int(entry.amount, "amount")?,
            entry.currency.as_str(),
            entry.source_system.as_str(),
            entry.destination_system.as_str(),
            entry.status.as_str(),
            to_sql_int(a.reserve, "reserve amount")?,
            to_sql_int(a.liquidity, "liquidity amount")?,
            to_sql_int(a.enterprise, "enterprise amount")?,
            to_sql_int(a.staking, "staking amount")?,
            c.reserve_bps,
            c.liquidity_bps,
            c.enterprise_bps,
            c.staking_bps,
            to_sql_int(entry.nonce, "nonce")?,
            to_sql_int(entry.bridged_at, "bridged_at")?,
            to_sql_int(entry.settled_at, "settled_at")?,
            entry.reversal_reason,
            entry.reversed_at.map(|t| to_sql_int(t, "reversed_at")).transpose()?,
            entry.disputed_at.map(|t| to_sql_int(t, "disputed_at")).transpose()?,
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            DbError::Constraint(format!("settlement for invoice '{}' already stored", entry.invoice_id))
        } else {
            DbError::Sqlite(e)
        }
    })?;
    Ok(())
}

/// Fetch a settlement by ID.
pub fn get(conn: &Connection, settlement_id: &SettlementId) -> Result<Option<RevenueEntry>> {
    let entry = conn
        .query_row(
            &format!("SELECT {ENTRY_COLUMNS} FROM settlements WHERE settlement_id = ?1"),
            [settlement_id.as_bytes().as_slice()],
            entry_from_row,
        )
        .optional()?;
    Ok(entry)
}

/// Update status and audit columns of an existing settlement.
///
/// Returns the number of rows touched (0 if the settlement does not exist).
pub fn update_status(
    conn: &Connection,
    settlement_id: &SettlementId,
    status: SettlementStatus,
    reversal_reason: Option<&str>,
    reversed_at: Option<u64>,
    disputed_at: Option<u64>,
) -> Result<usize> {
    let updated = conn.execute(
        "UPDATE settlements
         SET status = ?1,
             reversal_reason = COALESCE(?2, reversal_reason),
             reversed_at = COALESCE(?3, reversed_at),
             disputed_at = COALESCE(?4, disputed_at)
         WHERE settlement_id = ?5",
        rusqlite::params![
            status.as_str(),
            reversal_reason,
            reversed_at.map(|t| to_sql_int(t, "reversed_at")).transpose()?,
            disputed_at.map(|t| to_sql_int(t, "disputed_at")).transpose()?,
            settlement_id.as_bytes().as_slice(),
        ],
    )?;
    Ok(updated)
}

/// Most recently bridged settlements, newest first.
pub fn recent(conn: &Connection, limit: u32) -> Result<Vec<RevenueEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM settlements ORDER BY nonce DESC LIMIT ?1"
    ))?;
    let rows = stmt
        .query_map([limit], entry_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Settlements paid to one beneficiary, newest first.
pub fn for_beneficiary(conn: &Connection, beneficiary: &AccountId, limit: u32) -> Result<Vec<RevenueEntry>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLUMNS} FROM settlements WHERE beneficiary = ?1 ORDER BY nonce DESC LIMIT ?2"
    ))?;
    let rows = stmt
        .query_map(
            rusqlite::params![beneficiary.as_bytes().as_slice(), limit],
            entry_from_row,
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Record the permanent invoice → settlement mapping.
///
/// # Errors
///
/// - [`DbError::Constraint`] if the invoice is already indexed
pub fn index_invoice(
    conn: &Connection,
    invoice_id: &str,
    settlement_id: &SettlementId,
    indexed_at: u64,
) -> Result<()> {
    conn.execute(
        "INSERT INTO invoice_index (invoice_id, settlement_id, indexed_at) VALUES (?1, ?2, ?3)",
        rusqlite::params![
            invoice_id,
            settlement_id.as_bytes().as_slice(),
            to_sql_int(indexed_at, "indexed_at")?,
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            DbError::Constraint(format!("invoice '{invoice_id}' already indexed"))
        } else {
            DbError::Sqlite(e)
        }
    })?;
    Ok(())
}

/// Look up the settlement recorded for an invoice.
pub fn settlement_for_invoice(conn: &Connection, invoice_id: &str) -> Result<Option<SettlementId>> {
    let id = conn
        .query_row(
            "SELECT settlement_id FROM invoice_index WHERE invoice_id = ?1",
            [invoice_id],
            |row| {
                let raw: Vec<u8> = row.get(0)?;
                SettlementId::from_slice(&raw).map_err(|e| blob_err(0, e))
            },
        )
        .optional()?;
    Ok(id)
}

fn entry_from_row(row: &Row<'_>) -> rusqlite::Result<RevenueEntry> {
    let settlement_id: Vec<u8> = row.get(0)?;
    let payer: Option<Vec<u8>> = row.get(2)?;
    let beneficiary: Vec<u8> = row.get(3)?;

    Ok(RevenueEntry {
        settlement_id: SettlementId::from_slice(&settlement_id).map_err(|e| blob_err(0, e))?,
        invoice_id: row.get(1)?,
        payer: payer
            .map(|p| AccountId::from_slice(&p).map_err(|e| blob_err(2, e)))
            .transpose()?,
        beneficiary: AccountId::from_slice(&beneficiary).map_err(|e| blob_err(3, e))?,
        amount: column_u64(row, 4)?,
        currency: column_parse(row, 5)?,
        source_system: column_parse(row, 6)?,
        destination_system: column_parse(row, 7)?,
        status: column_parse(row, 8)?,
        allocation: Allocation {
            reserve: column_u64(row, 9)?,
            liquidity: column_u64(row, 10)?,
            enterprise: column_u64(row, 11)?,
            staking: column_u64(row, 12)?,
        },
        allocation_config: AllocationConfig {
            reserve_bps: row.get(13)?,
            liquidity_bps: row.get(14)?,
            enterprise_bps: row.get(15)?,
            staking_bps: row.get(16)?,
        },
        nonce: column_u64(row, 17)?,
        bridged_at: column_u64(row, 18)?,
        settled_at: column_u64(row, 19)?,
        reversal_reason: row.get(20)?,
        reversed_at: column_opt_u64(row, 21)?,
        disputed_at: column_opt_u64(row, 22)?,
    })
}
