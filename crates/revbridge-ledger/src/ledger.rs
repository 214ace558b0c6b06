//! Settlement ledger operations.
//!
//! [`SettlementLedger`] is a view over a SQLite connection. Each mutating
//! call runs inside its own savepoint, so it is atomic on a bare connection
//! and nests cleanly inside a caller's transaction. Callers that need
//! several ledger calls (plus their own writes) to commit together pass a
//! `rusqlite::Transaction`.

use rusqlite::Connection;
use tracing::{debug, info};

use revbridge_db::queries::{ledger_state, settlements};
use revbridge_types::{AccountId, RevenueEntry, RevenueTotals, SettlementId, SettlementStatus, MAX_INVOICE_ID_LEN};

use crate::{LedgerError, Result};

/// Savepoint name used for every mutating ledger call.
const SAVEPOINT: &str = "settlement_ledger";

/// Settlement ledger bound to one connection or transaction.
pub struct SettlementLedger<'c> {
    conn: &'c Connection,
}

impl<'c> SettlementLedger<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    /// Consume and return the next settlement nonce.
    ///
    /// Nonces start at 1 and strictly increase; a nonce consumed by a call
    /// that later rolls back is handed out again.
    pub fn next_nonce(&self) -> Result<u64> {
        self.atomically(|| {
            let mut state = ledger_state::get(self.conn)?;
            state.nonce = state.nonce.checked_add(1).ok_or(LedgerError::Overflow)?;
            ledger_state::put(self.conn, &state)?;
            Ok(state.nonce)
        })
    }

    /// Record a new settlement.
    ///
    /// Persists the entry, indexes its invoice and adds its amount to
    /// `total_revenue_bridged`, all or nothing.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::DuplicateInvoice`] if the invoice already has a settlement
    /// - [`LedgerError::InvalidEntry`] if the entry is not a well-formed new settlement
    /// - [`LedgerError::Overflow`] if a total would overflow
    pub fn create_settlement(&self, entry: &RevenueEntry) -> Result<SettlementId> {
        validate_new_entry(entry)?;

        self.atomically(|| {
            if settlements::settlement_for_invoice(self.conn, &entry.invoice_id)?.is_some() {
                return Err(LedgerError::DuplicateInvoice {
                    invoice_id: entry.invoice_id.clone(),
                });
            }

            settlements::insert(self.conn, entry)?;
            settlements::index_invoice(self.conn, &entry.invoice_id, &entry.settlement_id, entry.bridged_at)?;

            let mut state = ledger_state::get(self.conn)?;
            state.totals.total_revenue_bridged = state
                .totals
                .total_revenue_bridged
                .checked_add(entry.amount)
                .ok_or(LedgerError::Overflow)?;
            state.totals.settlement_count = state
                .totals
                .settlement_count
                .checked_add(1)
                .ok_or(LedgerError::Overflow)?;
            ledger_state::put(self.conn, &state)?;

            debug!(
                settlement_id = %entry.settlement_id,
                invoice_id = %entry.invoice_id,
                amount = entry.amount,
                "settlement recorded"
            );
            Ok(entry.settlement_id)
        })
    }

    /// Fetch a settlement.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::SettlementNotFound`] if unknown
    pub fn get_settlement(&self, settlement_id: &SettlementId) -> Result<RevenueEntry> {
        settlements::get(self.conn, settlement_id)?.ok_or(LedgerError::SettlementNotFound {
            settlement_id: *settlement_id,
        })
    }

    /// Settlement ID recorded for an invoice.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvoiceNotFound`] if the invoice was never bridged
    pub fn get_by_invoice(&self, invoice_id: &str) -> Result<SettlementId> {
        settlements::settlement_for_invoice(self.conn, invoice_id)?.ok_or_else(|| {
            LedgerError::InvoiceNotFound {
                invoice_id: invoice_id.to_string(),
            }
        })
    }

    /// Whether the invoice has ever been bridged, reversed or not.
    pub fn is_invoice_processed(&self, invoice_id: &str) -> Result<bool> {
        Ok(settlements::settlement_for_invoice(self.conn, invoice_id)?.is_some())
    }

    /// Move a SETTLED settlement to REVERSED.
    ///
    /// Adds the original amount to `total_revenue_reversed` and records the
    /// reason. Returns the updated entry.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::SettlementNotFound`] if unknown
    /// - [`LedgerError::InvalidStatus`] if the settlement is not SETTLED
    pub fn mark_reversed(&self, settlement_id: &SettlementId, reason: &str, at: u64) -> Result<RevenueEntry> {
        self.atomically(|| {
            let mut entry = self.get_settlement(settlement_id)?;
            if entry.status != SettlementStatus::Settled {
                return Err(LedgerError::InvalidStatus {
                    settlement_id: *settlement_id,
                    current: entry.status,
                    required: SettlementStatus::Settled,
                });
            }

            settlements::update_status(
                self.conn,
                settlement_id,
                SettlementStatus::Reversed,
                Some(reason),
                Some(at),
                None,
            )?;

            let mut state = ledger_state::get(self.conn)?;
            state.totals.total_revenue_reversed = state
                .totals
                .total_revenue_reversed
                .checked_add(entry.amount)
                .ok_or(LedgerError::Overflow)?;
            ledger_state::put(self.conn, &state)?;

            entry.status = SettlementStatus::Reversed;
            entry.reversal_reason = Some(reason.to_string());
            entry.reversed_at = Some(at);

            info!(settlement_id = %settlement_id, amount = entry.amount, reason, "settlement reversed");
            Ok(entry)
        })
    }

    /// Mark a settlement DISPUTED. No status precondition and no monetary
    /// effect. Returns the status it had before.
    ///
    /// Re-marking a DISPUTED entry is accepted and writes nothing; the
    /// original `disputed_at` is kept.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::SettlementNotFound`] if unknown
    pub fn mark_disputed(&self, settlement_id: &SettlementId, at: u64) -> Result<SettlementStatus> {
        self.atomically(|| {
            let entry = self.get_settlement(settlement_id)?;
            if entry.status == SettlementStatus::Disputed {
                return Ok(entry.status);
            }
            settlements::update_status(
                self.conn,
                settlement_id,
                SettlementStatus::Disputed,
                None,
                None,
                Some(at),
            )?;

            info!(settlement_id = %settlement_id, from = %entry.status, "settlement disputed");
            Ok(entry.status)
        })
    }

    /// Running totals.
    pub fn totals(&self) -> Result<RevenueTotals> {
        Ok(ledger_state::get(self.conn)?.totals)
    }

    /// Most recently created settlements, newest first.
    pub fn recent_settlements(&self, limit: u32) -> Result<Vec<RevenueEntry>> {
        Ok(settlements::recent(self.conn, limit)?)
    }

    /// Settlements paid to `beneficiary`, newest first.
    pub fn settlements_for_beneficiary(&self, beneficiary: &AccountId, limit: u32) -> Result<Vec<RevenueEntry>> {
        Ok(settlements::for_beneficiary(self.conn, beneficiary, limit)?)
    }

    /// Run `f` inside a savepoint: released on success, rolled back on error.
    fn atomically<T>(&self, f: impl FnOnce() -> Result<T>) -> Result<T> {
        self.conn.execute_batch(&format!("SAVEPOINT {SAVEPOINT}"))?;
        match f() {
            Ok(value) => {
                self.conn.execute_batch(&format!("RELEASE {SAVEPOINT}"))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = self
                    .conn
                    .execute_batch(&format!("ROLLBACK TO {SAVEPOINT}; RELEASE {SAVEPOINT}"))
                {
                    tracing::error!(error = %rollback_err, "ledger savepoint rollback failed");
                }
                Err(err)
            }
        }
    }
}

/// Check the record invariants of a settlement about to be created.
fn validate_new_entry(entry: &RevenueEntry) -> Result<()> {
    if entry.invoice_id.is_empty() || entry.invoice_id.len() > MAX_INVOICE_ID_LEN {
        return Err(LedgerError::InvalidEntry(format!(
            "invoice id must be 1..={MAX_INVOICE_ID_LEN} bytes"
        )));
    }
    if entry.amount == 0 {
        return Err(LedgerError::InvalidEntry("amount must be positive".into()));
    }
    if entry.beneficiary.is_zero() {
        return Err(LedgerError::InvalidEntry("beneficiary is the zero account".into()));
    }
    if entry.status != SettlementStatus::Settled {
        return Err(LedgerError::InvalidEntry(format!(
            "new settlements must be settled, got {}",
            entry.status
        )));
    }
    if entry.allocation.checked_total() != Some(entry.amount) {
        return Err(LedgerError::InvalidEntry(format!(
            "allocation does not sum to amount {}",
            entry.amount
        )));
    }
    if entry.reversal_reason.is_some() || entry.reversed_at.is_some() || entry.disputed_at.is_some() {
        return Err(LedgerError::InvalidEntry("new settlement carries reversal or dispute data".into()));
    }
    Ok(())
}
