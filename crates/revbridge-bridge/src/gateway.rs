//! Bridging, reversal and dispute.
//!
//! Every call follows the same shape: authorize, check pause, validate, then
//! open one SQLite transaction for the ledger writes and event-log appends,
//! apply partition side effects, and commit. A failing partition operation
//! is compensated and the transaction is dropped, so nothing persists.

use tracing::{debug, info};

use revbridge_allocation::allocate;
use revbridge_crypto::ids;
use revbridge_ledger::SettlementLedger;
use revbridge_partition::PartitionStore;
use revbridge_types::{
    AccountId, Amount, BridgeEvent, BridgeRequest, RevenueEntry, SettlementId, SettlementStatus,
    MAX_INVOICE_ID_LEN,
};

use crate::bridge::{
    append_events, apply_partition_ops, require_not_paused, require_operator, undo_partition_ops,
    PartitionOp, RevenueBridge,
};
use crate::{BridgeError, Result};

impl<P: PartitionStore> RevenueBridge<P> {
    /// Record an off-chain payment and issue its partition split to the
    /// beneficiary.
    ///
    /// Returns the new settlement ID. The settlement ID is derived from the
    /// invoice ID, `now`, the ledger nonce and the chain ID.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::Unauthorized`] unless `caller` is operator or owner
    /// - [`BridgeError::OperationPaused`] while paused
    /// - [`BridgeError::ZeroAmount`], [`BridgeError::InvalidBeneficiary`],
    ///   [`BridgeError::InvalidInvoiceId`] on bad input
    /// - [`BridgeError::InvoiceAlreadyProcessed`] if the invoice was bridged before
    /// - [`BridgeError::Partition`] if issuing fails; nothing is persisted
    pub fn bridge_revenue(&mut self, caller: &AccountId, request: BridgeRequest, now: u64) -> Result<SettlementId> {
        let state = self.admin_state()?;
        require_operator(&state, caller)?;
        require_not_paused(&state)?;
        validate_request(&request)?;

        let allocation = allocate(request.amount, &state.allocation)?;

        let tx = self.conn.transaction()?;
        let ledger = SettlementLedger::new(&tx);

        // Checked before consuming a nonce so a replay has no side effects
        if ledger.is_invoice_processed(&request.invoice_id)? {
            return Err(BridgeError::InvoiceAlreadyProcessed {
                invoice_id: request.invoice_id,
            });
        }

        let nonce = ledger.next_nonce()?;
        let settlement_id = SettlementId(ids::settlement_id(&request.invoice_id, now, nonce, state.chain_id));

        let entry = RevenueEntry {
            settlement_id,
            invoice_id: request.invoice_id,
            payer: request.payer.filter(|payer| !payer.is_zero()),
            beneficiary: request.beneficiary,
            amount: request.amount,
            currency: request.currency,
            source_system: request.source_system,
            destination_system: request.destination_system,
            status: SettlementStatus::Settled,
            allocation,
            allocation_config: state.allocation,
            nonce,
            bridged_at: now,
            settled_at: now,
            reversal_reason: None,
            reversed_at: None,
            disputed_at: None,
        };
        ledger.create_settlement(&entry)?;

        let ops: Vec<PartitionOp> = allocation
            .non_zero()
            .map(|(partition, amount)| PartitionOp::Issue(partition, entry.beneficiary, amount))
            .collect();

        let mut batch = Vec::with_capacity(ops.len() + 1);
        batch.push(BridgeEvent::RevenueBridged(entry.clone()));
        batch.extend(allocation.non_zero().map(|(partition, amount)| BridgeEvent::PartitionIssued {
            settlement_id,
            partition,
            account: entry.beneficiary,
            amount,
        }));
        let records = append_events(&tx, state.chain_id, now, &batch)?;

        apply_partition_ops(&mut self.store, &ops)?;
        if let Err(err) = tx.commit() {
            undo_partition_ops(&mut self.store, &ops);
            return Err(err.into());
        }
        self.publish(&records);

        info!(
            %settlement_id,
            invoice_id = %entry.invoice_id,
            amount = entry.amount,
            beneficiary = %entry.beneficiary,
            nonce,
            "revenue bridged"
        );
        Ok(settlement_id)
    }

    /// [`bridge_revenue`](Self::bridge_revenue) with an unknown payer and the
    /// configured currency and source/destination systems.
    pub fn bridge_revenue_simple(
        &mut self,
        caller: &AccountId,
        invoice_id: &str,
        amount: Amount,
        beneficiary: &AccountId,
        now: u64,
    ) -> Result<SettlementId> {
        let request = BridgeRequest {
            invoice_id: invoice_id.to_string(),
            amount,
            payer: None,
            beneficiary: *beneficiary,
            currency: self.defaults.currency,
            source_system: self.defaults.source_system,
            destination_system: self.defaults.destination_system,
        };
        self.bridge_revenue(caller, request, now)
    }

    /// Reverse a SETTLED settlement (refund or chargeback).
    ///
    /// Burns exactly the split recorded on the entry at bridge time, even if
    /// the allocation weights have changed since. Returns the updated entry.
    ///
    /// # Errors
    ///
    /// - [`BridgeError::Unauthorized`], [`BridgeError::OperationPaused`]
    /// - [`BridgeError::SettlementNotFound`] if unknown
    /// - [`BridgeError::InvalidSettlementStatus`] unless SETTLED
    /// - [`BridgeError::Partition`] if the beneficiary no longer holds the split
    pub fn reverse_settlement(
        &mut self,
        caller: &AccountId,
        settlement_id: &SettlementId,
        reason: &str,
        now: u64,
    ) -> Result<RevenueEntry> {
        let state = self.admin_state()?;
        require_operator(&state, caller)?;
        require_not_paused(&state)?;

        let tx = self.conn.transaction()?;
        let entry = SettlementLedger::new(&tx).mark_reversed(settlement_id, reason, now)?;

        let ops: Vec<PartitionOp> = entry
            .allocation
            .non_zero()
            .map(|(partition, amount)| PartitionOp::Burn(partition, entry.beneficiary, amount))
            .collect();

        let mut batch = vec![
            BridgeEvent::RevenueReversed {
                settlement_id: *settlement_id,
                invoice_id: entry.invoice_id.clone(),
                beneficiary: entry.beneficiary,
                amount: entry.amount,
                reason: reason.to_string(),
            },
            BridgeEvent::SettlementStatusChanged {
                settlement_id: *settlement_id,
                from: SettlementStatus::Settled,
                to: SettlementStatus::Reversed,
            },
        ];
        batch.extend(entry.allocation.non_zero().map(|(partition, amount)| BridgeEvent::PartitionBurned {
            settlement_id: *settlement_id,
            partition,
            account: entry.beneficiary,
            amount,
        }));
        let records = append_events(&tx, state.chain_id, now, &batch)?;

        apply_partition_ops(&mut self.store, &ops)?;
        if let Err(err) = tx.commit() {
            undo_partition_ops(&mut self.store, &ops);
            return Err(err.into());
        }
        self.publish(&records);

        Ok(entry)
    }

    /// Flag a settlement as DISPUTED.
    ///
    /// Accepted from any status. No monetary effect: totals and partition
    /// balances are untouched. Returns the status it had before. Flagging an
    /// entry that is already DISPUTED changes nothing and emits no event.
    pub fn dispute_settlement(
        &mut self,
        caller: &AccountId,
        settlement_id: &SettlementId,
        now: u64,
    ) -> Result<SettlementStatus> {
        let state = self.admin_state()?;
        require_operator(&state, caller)?;
        require_not_paused(&state)?;

        let tx = self.conn.transaction()?;
        let previous = SettlementLedger::new(&tx).mark_disputed(settlement_id, now)?;
        if previous == SettlementStatus::Disputed {
            debug!(%settlement_id, "settlement already disputed");
            return Ok(previous);
        }
        let records = append_events(
            &tx,
            state.chain_id,
            now,
            &[BridgeEvent::SettlementStatusChanged {
                settlement_id: *settlement_id,
                from: previous,
                to: SettlementStatus::Disputed,
            }],
        )?;
        tx.commit()?;
        self.publish(&records);

        Ok(previous)
    }
}

/// Amount, beneficiary and invoice ID checks, in that order.
fn validate_request(request: &BridgeRequest) -> Result<()> {
    if request.amount == 0 {
        return Err(BridgeError::ZeroAmount);
    }
    if request.beneficiary.is_zero() {
        return Err(BridgeError::InvalidBeneficiary);
    }
    let len = request.invoice_id.len();
    if len == 0 || len > MAX_INVOICE_ID_LEN {
        return Err(BridgeError::InvalidInvoiceId {
            len,
            max: MAX_INVOICE_ID_LEN,
        });
    }
    Ok(())
}
