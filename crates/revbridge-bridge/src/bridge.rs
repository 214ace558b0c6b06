//! [`RevenueBridge`] construction, shared write plumbing and read-only queries.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use revbridge_allocation::{allocate, validate_allocation, DEFAULT_ALLOCATION};
use revbridge_db::queries::{admin, events};
use revbridge_db::queries::admin::AdminState;
use revbridge_ledger::SettlementLedger;
use revbridge_partition::PartitionStore;
use revbridge_types::{
    AccountId, Allocation, AllocationConfig, Amount, BridgeEvent, Currency, DestinationSystem,
    EventRecord, Partition, RevenueEntry, RevenueTotals, SettlementId, SourceSystem,
};

use crate::sink::{EventSink, NoopSink};
use crate::{BridgeError, Result};

/// Field values used by `bridge_revenue_simple`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDefaults {
    pub currency: Currency,
    pub source_system: SourceSystem,
    pub destination_system: DestinationSystem,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            currency: Currency::Native,
            source_system: SourceSystem::Manual,
            destination_system: DestinationSystem::Treasury,
        }
    }
}

/// Initial control-plane settings.
///
/// Applied only when the database has no control-plane row yet; afterwards
/// the persisted state wins and changes go through the admin calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BridgeConfig {
    pub owner: AccountId,
    /// May be zero, in which case only the owner can bridge.
    pub operator: AccountId,
    pub chain_id: u64,
    pub allocation: AllocationConfig,
    pub defaults: RequestDefaults,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            owner: AccountId::ZERO,
            operator: AccountId::ZERO,
            chain_id: 1,
            allocation: DEFAULT_ALLOCATION,
            defaults: RequestDefaults::default(),
        }
    }
}

/// Snapshot of the control plane and ledger totals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeStatus {
    pub owner: AccountId,
    pub operator: AccountId,
    pub allocation: AllocationConfig,
    pub paused: bool,
    pub chain_id: u64,
    pub totals: RevenueTotals,
    pub net_revenue: Amount,
    pub last_event_sequence: u64,
}

/// A partition side effect applied inside a bridge call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum PartitionOp {
    Issue(Partition, AccountId, Amount),
    Burn(Partition, AccountId, Amount),
}

/// The bridge operator gateway.
///
/// Mutating methods take `&mut self`; callers sharing a bridge across tasks
/// hold it behind a single mutex, which totally orders every write.
pub struct RevenueBridge<P: PartitionStore> {
    pub(crate) conn: Connection,
    pub(crate) store: P,
    pub(crate) sink: Box<dyn EventSink>,
    pub(crate) defaults: RequestDefaults,
}

impl<P: PartitionStore> RevenueBridge<P> {
    /// Wrap an opened ledger database and a partition store.
    ///
    /// Seeds the control plane from `config` on first use. On later opens the
    /// stored state is kept and a differing `chain_id` in `config` is ignored
    /// with a warning.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::ZeroAddress`] if seeding with a zero owner
    /// - [`BridgeError::InvalidPercentages`] if seeding with invalid weights
    pub fn new(conn: Connection, store: P, config: BridgeConfig, now: u64) -> Result<Self> {
        match admin::get(&conn)? {
            Some(state) => {
                if state.chain_id != config.chain_id {
                    warn!(
                        stored = state.chain_id,
                        configured = config.chain_id,
                        "chain id differs from stored control plane, keeping stored value"
                    );
                }
            }
            None => {
                if config.owner.is_zero() {
                    return Err(BridgeError::ZeroAddress);
                }
                validate_allocation(&config.allocation)?;
                admin::put(
                    &conn,
                    &AdminState {
                        owner: config.owner,
                        operator: config.operator,
                        allocation: config.allocation,
                        paused: false,
                        chain_id: config.chain_id,
                        updated_at: now,
                    },
                )?;
                info!(owner = %config.owner, operator = %config.operator, chain_id = config.chain_id, "control plane initialized");
            }
        }

        Ok(Self {
            conn,
            store,
            sink: Box::new(NoopSink),
            defaults: config.defaults,
        })
    }

    /// Replace the post-commit event sink.
    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// Defaults used by `bridge_revenue_simple`.
    pub fn defaults(&self) -> RequestDefaults {
        self.defaults
    }

    pub fn partition_store(&self) -> &P {
        &self.store
    }

    // ------------------------------------------------------------------
    // Read-only queries. None of these are gated by pause.
    // ------------------------------------------------------------------

    pub fn get_settlement(&self, settlement_id: &SettlementId) -> Result<RevenueEntry> {
        Ok(SettlementLedger::new(&self.conn).get_settlement(settlement_id)?)
    }

    /// The settlement recorded for an invoice.
    pub fn settlement_by_invoice(&self, invoice_id: &str) -> Result<RevenueEntry> {
        let ledger = SettlementLedger::new(&self.conn);
        let settlement_id = ledger.get_by_invoice(invoice_id)?;
        Ok(ledger.get_settlement(&settlement_id)?)
    }

    pub fn is_invoice_processed(&self, invoice_id: &str) -> Result<bool> {
        Ok(SettlementLedger::new(&self.conn).is_invoice_processed(invoice_id)?)
    }

    pub fn totals(&self) -> Result<RevenueTotals> {
        Ok(SettlementLedger::new(&self.conn).totals()?)
    }

    /// Allocation weights applied to the next bridged settlement.
    pub fn allocation(&self) -> Result<AllocationConfig> {
        Ok(self.admin_state()?.allocation)
    }

    pub fn operator(&self) -> Result<AccountId> {
        Ok(self.admin_state()?.operator)
    }

    pub fn owner(&self) -> Result<AccountId> {
        Ok(self.admin_state()?.owner)
    }

    pub fn is_paused(&self) -> Result<bool> {
        Ok(self.admin_state()?.paused)
    }

    pub fn chain_id(&self) -> Result<u64> {
        Ok(self.admin_state()?.chain_id)
    }

    /// Split `amount` under the current weights without touching state.
    pub fn preview(&self, amount: Amount) -> Result<Allocation> {
        Ok(allocate(amount, &self.admin_state()?.allocation)?)
    }

    pub fn partition_balance(&self, partition: Partition, account: &AccountId) -> Result<Amount> {
        Ok(self.store.balance_of(partition, account)?)
    }

    /// Most recent settlements, newest first.
    pub fn recent_settlements(&self, limit: u32) -> Result<Vec<RevenueEntry>> {
        Ok(SettlementLedger::new(&self.conn).recent_settlements(limit)?)
    }

    pub fn settlements_for_beneficiary(&self, beneficiary: &AccountId, limit: u32) -> Result<Vec<RevenueEntry>> {
        Ok(SettlementLedger::new(&self.conn).settlements_for_beneficiary(beneficiary, limit)?)
    }

    /// Persisted events with `sequence > after`, oldest first.
    pub fn events_since(&self, after: u64, limit: u32) -> Result<Vec<EventRecord>> {
        Ok(events::list_since(&self.conn, after, limit)?)
    }

    /// Re-verify the event log hash chain. Returns the number of events.
    pub fn verify_event_log(&self) -> Result<u64> {
        let chain_id = self.admin_state()?.chain_id;
        Ok(events::verify_chain(&self.conn, chain_id)?)
    }

    pub fn status(&self) -> Result<BridgeStatus> {
        let state = self.admin_state()?;
        let totals = self.totals()?;
        Ok(BridgeStatus {
            owner: state.owner,
            operator: state.operator,
            allocation: state.allocation,
            paused: state.paused,
            chain_id: state.chain_id,
            totals,
            net_revenue: totals.net_revenue(),
            last_event_sequence: events::last_sequence(&self.conn)?,
        })
    }

    // ------------------------------------------------------------------
    // Shared write plumbing
    // ------------------------------------------------------------------

    pub(crate) fn admin_state(&self) -> Result<AdminState> {
        admin::get(&self.conn)?.ok_or_else(|| {
            BridgeError::Storage(revbridge_db::DbError::NotFound("bridge control plane".into()))
        })
    }

    pub(crate) fn publish(&self, records: &[EventRecord]) {
        for record in records {
            self.sink.publish(record);
        }
    }
}

/// Caller must be the owner or the (non-zero) operator.
pub(crate) fn require_operator(state: &AdminState, caller: &AccountId) -> Result<()> {
    let is_operator = !state.operator.is_zero() && *caller == state.operator;
    if *caller == state.owner || is_operator {
        Ok(())
    } else {
        warn!(%caller, "rejected operator call");
        Err(BridgeError::Unauthorized { caller: *caller })
    }
}

pub(crate) fn require_owner(state: &AdminState, caller: &AccountId) -> Result<()> {
    if *caller == state.owner {
        Ok(())
    } else {
        warn!(%caller, "rejected owner call");
        Err(BridgeError::Unauthorized { caller: *caller })
    }
}

pub(crate) fn require_not_paused(state: &AdminState) -> Result<()> {
    if state.paused {
        Err(BridgeError::OperationPaused)
    } else {
        Ok(())
    }
}

/// Append `batch` to the event log in order.
pub(crate) fn append_events(
    conn: &Connection,
    chain_id: u64,
    now: u64,
    batch: &[BridgeEvent],
) -> Result<Vec<EventRecord>> {
    batch
        .iter()
        .map(|event| Ok(events::append(conn, chain_id, now, event)?))
        .collect()
}

/// Apply `ops` in order. On the first failure, undo the ones already applied
/// and return the failure.
pub(crate) fn apply_partition_ops<P: PartitionStore>(store: &mut P, ops: &[PartitionOp]) -> Result<()> {
    for (applied, op) in ops.iter().enumerate() {
        let outcome = match *op {
            PartitionOp::Issue(partition, account, amount) => store.issue(partition, &account, amount),
            PartitionOp::Burn(partition, account, amount) => store.burn(partition, &account, amount),
        };
        if let Err(err) = outcome {
            warn!(error = %err, applied, "partition operation failed, compensating");
            undo_partition_ops(store, &ops[..applied]);
            return Err(err.into());
        }
    }
    Ok(())
}

/// Reverse already-applied `ops`, newest first.
pub(crate) fn undo_partition_ops<P: PartitionStore>(store: &mut P, ops: &[PartitionOp]) {
    for op in ops.iter().rev() {
        let outcome = match *op {
            PartitionOp::Issue(partition, account, amount) => store.burn(partition, &account, amount),
            PartitionOp::Burn(partition, account, amount) => store.issue(partition, &account, amount),
        };
        if let Err(err) = outcome {
            error!(error = %err, ?op, "partition compensation failed, store needs reconciliation");
        }
    }
}
