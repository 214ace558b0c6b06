//! # revbridge-ledger
//!
//! The settlement ledger: durable, idempotent bookkeeping of every bridged
//! payment.
//!
//! The ledger owns four guarantees:
//!
//! - an invoice maps to at most one settlement, forever
//! - totals move only with successful creates and reversals
//! - status transitions follow `SETTLED → {REVERSED | DISPUTED}`
//! - every operation applies fully or not at all
//!
//! ## Modules
//!
//! - [`ledger`] — [`SettlementLedger`] operations over a SQLite connection

pub mod ledger;

pub use ledger::SettlementLedger;

use revbridge_db::DbError;
use revbridge_types::{SettlementId, SettlementStatus};

/// Error types for ledger operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The invoice already has a settlement.
    #[error("invoice '{invoice_id}' already has a settlement")]
    DuplicateInvoice { invoice_id: String },

    /// No settlement with this ID.
    #[error("settlement {settlement_id} not found")]
    SettlementNotFound { settlement_id: SettlementId },

    /// No settlement recorded for this invoice.
    #[error("no settlement for invoice '{invoice_id}'")]
    InvoiceNotFound { invoice_id: String },

    /// The requested transition is not allowed from the current status.
    #[error("settlement {settlement_id} is {current}, requires {required}")]
    InvalidStatus {
        settlement_id: SettlementId,
        current: SettlementStatus,
        required: SettlementStatus,
    },

    /// The entry handed to `create_settlement` breaks a record invariant.
    #[error("invalid entry: {0}")]
    InvalidEntry(String),

    /// A running total or the nonce would overflow.
    #[error("arithmetic overflow in ledger totals")]
    Overflow,

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<rusqlite::Error> for LedgerError {
    fn from(err: rusqlite::Error) -> Self {
        LedgerError::Db(DbError::Sqlite(err))
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
