//! # revbridge-bridge
//!
//! The bridge operator gateway and its control plane.
//!
//! [`RevenueBridge`] is the only write path into the settlement ledger. Each
//! mutating call authorizes the caller, validates its input, then applies
//! ledger writes, event-log appends and partition issues/burns as one unit:
//! either all of it lands or none of it does. Events reach the
//! [`EventSink`] only after the SQLite transaction commits.
//!
//! ## Modules
//!
//! - [`bridge`] — [`RevenueBridge`] construction, shared plumbing and read-only queries
//! - [`gateway`] — bridging, reversal and dispute
//! - [`admin`] — owner-only operator, allocation, pause and ownership controls
//! - [`sink`] — post-commit event delivery

pub mod admin;
pub mod bridge;
pub mod gateway;
pub mod sink;

pub use bridge::{BridgeConfig, BridgeStatus, RequestDefaults, RevenueBridge};
pub use sink::{EventSink, NoopSink, RecordingSink};

use revbridge_allocation::AllocationError;
use revbridge_db::DbError;
use revbridge_ledger::LedgerError;
use revbridge_partition::PartitionError;
use revbridge_types::{AccountId, SettlementId, SettlementStatus};

/// Error types for bridge operations.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Caller lacks the required role.
    #[error("{caller} is not authorized for this operation")]
    Unauthorized { caller: AccountId },

    /// The bridge is paused.
    #[error("bridge is paused")]
    OperationPaused,

    /// A role was set to the zero identity.
    #[error("zero address is not allowed")]
    ZeroAddress,

    #[error("beneficiary must be a non-zero account")]
    InvalidBeneficiary,

    #[error("amount must be greater than zero")]
    ZeroAmount,

    /// Invoice ID empty or too long.
    #[error("invoice id must be 1..={max} bytes, got {len}")]
    InvalidInvoiceId { len: usize, max: usize },

    /// The invoice was already bridged (reversed or not).
    #[error("invoice '{invoice_id}' already processed")]
    InvoiceAlreadyProcessed { invoice_id: String },

    #[error("settlement {settlement_id} not found")]
    SettlementNotFound { settlement_id: SettlementId },

    #[error("no settlement for invoice '{invoice_id}'")]
    InvoiceNotFound { invoice_id: String },

    #[error("settlement {settlement_id} is {current}, requires {required}")]
    InvalidSettlementStatus {
        settlement_id: SettlementId,
        current: SettlementStatus,
        required: SettlementStatus,
    },

    /// Allocation weights do not sum to 10000 bps.
    #[error("allocation weights must sum to 10000 bps, got {total}")]
    InvalidPercentages { total: u32 },

    /// Partition store rejected an issue or burn; the call was rolled back.
    #[error("partition store: {0}")]
    Partition(#[from] PartitionError),

    /// Ledger database failure; the call was rolled back.
    #[error("storage: {0}")]
    Storage(#[from] DbError),

    /// A total, the nonce or a balance would overflow.
    #[error("arithmetic overflow")]
    Overflow,

    /// A ledger invariant was violated by the bridge itself.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<LedgerError> for BridgeError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::DuplicateInvoice { invoice_id } => BridgeError::InvoiceAlreadyProcessed { invoice_id },
            LedgerError::SettlementNotFound { settlement_id } => BridgeError::SettlementNotFound { settlement_id },
            LedgerError::InvoiceNotFound { invoice_id } => BridgeError::InvoiceNotFound { invoice_id },
            LedgerError::InvalidStatus {
                settlement_id,
                current,
                required,
            } => BridgeError::InvalidSettlementStatus {
                settlement_id,
                current,
                required,
            },
            LedgerError::InvalidEntry(reason) => BridgeError::Internal(reason),
            LedgerError::Overflow => BridgeError::Overflow,
            LedgerError::Db(err) => BridgeError::Storage(err),
        }
    }
}

impl From<AllocationError> for BridgeError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::InvalidPercentages { total } => BridgeError::InvalidPercentages { total },
            AllocationError::Overflow => BridgeError::Overflow,
        }
    }
}

impl From<rusqlite::Error> for BridgeError {
    fn from(err: rusqlite::Error) -> Self {
        BridgeError::Storage(DbError::Sqlite(err))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
pub(crate) mod test_support {
    use revbridge_partition::{MemoryPartitionStore, PartitionError, PartitionStore};
    use revbridge_types::{AccountId, Amount, Partition};

    use crate::{BridgeConfig, RecordingSink, RevenueBridge};

    pub const OWNER: AccountId = AccountId([0x01; 20]);
    pub const OPERATOR: AccountId = AccountId([0x02; 20]);
    pub const STRANGER: AccountId = AccountId([0x03; 20]);
    pub const BENEFICIARY: AccountId = AccountId([0xBE; 20]);
    pub const BASE_TIME: u64 = 1_700_000_000;

    /// Memory store that fails the Nth issue or burn it sees (1-based).
    #[derive(Default)]
    pub struct FlakyStore {
        pub inner: MemoryPartitionStore,
        pub fail_on_call: Option<usize>,
        pub calls: usize,
    }

    impl FlakyStore {
        fn tick(&mut self) -> revbridge_partition::Result<()> {
            self.calls += 1;
            if self.fail_on_call == Some(self.calls) {
                return Err(PartitionError::Storage("injected failure".into()));
            }
            Ok(())
        }
    }

    impl PartitionStore for FlakyStore {
        fn issue(&mut self, partition: Partition, account: &AccountId, amount: Amount) -> revbridge_partition::Result<()> {
            self.tick()?;
            self.inner.issue(partition, account, amount)
        }

        fn burn(&mut self, partition: Partition, account: &AccountId, amount: Amount) -> revbridge_partition::Result<()> {
            self.tick()?;
            self.inner.burn(partition, account, amount)
        }

        fn balance_of(&self, partition: Partition, account: &AccountId) -> revbridge_partition::Result<Amount> {
            self.inner.balance_of(partition, account)
        }

        fn total_supply(&self, partition: Partition) -> revbridge_partition::Result<Amount> {
            self.inner.total_supply(partition)
        }
    }

    pub fn config() -> BridgeConfig {
        BridgeConfig {
            owner: OWNER,
            operator: OPERATOR,
            chain_id: 31337,
            ..BridgeConfig::default()
        }
    }

    pub fn test_bridge() -> (RevenueBridge<FlakyStore>, RecordingSink) {
        let conn = revbridge_db::open_memory().expect("open test db");
        let sink = RecordingSink::default();
        let bridge = RevenueBridge::new(conn, FlakyStore::default(), config(), BASE_TIME)
            .expect("create bridge")
            .with_sink(sink.clone());
        (bridge, sink)
    }
}
