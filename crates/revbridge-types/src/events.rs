//! Audit events consumed by external indexers.
//!
//! Every state transition produces exactly one [`BridgeEvent`] per effect.
//! Events are persisted in sequence order and are the canonical external
//! record of the ledger.

use serde::{Deserialize, Serialize};

use crate::{
    AccountId, AllocationConfig, Amount, Partition, RevenueEntry, SettlementId, SettlementStatus,
    Timestamp,
};

/// A persisted event with its gap-free sequence number.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    pub sequence: u64,
    pub timestamp: Timestamp,
    pub event: BridgeEvent,
}

/// All bridge event kinds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type")]
pub enum BridgeEvent {
    /// Carries every field of the new entry, settlement ID included.
    RevenueBridged(RevenueEntry),
    PartitionIssued {
        settlement_id: SettlementId,
        partition: Partition,
        account: AccountId,
        amount: Amount,
    },
    PartitionBurned {
        settlement_id: SettlementId,
        partition: Partition,
        account: AccountId,
        amount: Amount,
    },
    RevenueReversed {
        settlement_id: SettlementId,
        invoice_id: String,
        beneficiary: AccountId,
        amount: Amount,
        reason: String,
    },
    SettlementStatusChanged {
        settlement_id: SettlementId,
        from: SettlementStatus,
        to: SettlementStatus,
    },
    OperatorUpdated {
        previous: AccountId,
        current: AccountId,
    },
    AllocationUpdated {
        previous: AllocationConfig,
        current: AllocationConfig,
    },
    OwnershipTransferred {
        previous: AccountId,
        current: AccountId,
    },
    Paused {
        by: AccountId,
    },
    Unpaused {
        by: AccountId,
    },
}

impl BridgeEvent {
    /// Event type name as stored in the event log.
    pub fn event_type(&self) -> &'static str {
        match self {
            BridgeEvent::RevenueBridged(_) => "RevenueBridged",
            BridgeEvent::PartitionIssued { .. } => "PartitionIssued",
            BridgeEvent::PartitionBurned { .. } => "PartitionBurned",
            BridgeEvent::RevenueReversed { .. } => "RevenueReversed",
            BridgeEvent::SettlementStatusChanged { .. } => "SettlementStatusChanged",
            BridgeEvent::OperatorUpdated { .. } => "OperatorUpdated",
            BridgeEvent::AllocationUpdated { .. } => "AllocationUpdated",
            BridgeEvent::OwnershipTransferred { .. } => "OwnershipTransferred",
            BridgeEvent::Paused { .. } => "Paused",
            BridgeEvent::Unpaused { .. } => "Unpaused",
        }
    }

    /// The settlement this event concerns, if any.
    pub fn settlement_id(&self) -> Option<SettlementId> {
        match self {
            BridgeEvent::RevenueBridged(entry) => Some(entry.settlement_id),
            BridgeEvent::PartitionIssued { settlement_id, .. }
            | BridgeEvent::PartitionBurned { settlement_id, .. }
            | BridgeEvent::RevenueReversed { settlement_id, .. }
            | BridgeEvent::SettlementStatusChanged { settlement_id, .. } => Some(*settlement_id),
            _ => None,
        }
    }
}
