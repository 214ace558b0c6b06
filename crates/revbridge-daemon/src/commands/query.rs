//! Read-only command handlers. Available while paused.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use revbridge_types::{AccountId, Amount, Partition, SettlementId};

use super::{parse_params, to_json, Result};
use crate::rpc::RpcError;
use crate::DaemonState;

/// Upper bound on list sizes returned in one call.
const MAX_PAGE: u32 = 500;

const DEFAULT_PAGE: u32 = 50;

fn default_page() -> u32 {
    DEFAULT_PAGE
}

#[derive(Deserialize)]
struct SettlementParams {
    settlement_id: SettlementId,
}

#[derive(Deserialize)]
struct InvoiceParams {
    invoice_id: String,
}

#[derive(Deserialize)]
struct PreviewParams {
    amount: Amount,
}

#[derive(Deserialize)]
struct BalanceParams {
    partition: Partition,
    account: AccountId,
}

#[derive(Deserialize)]
struct RecentParams {
    #[serde(default = "default_page")]
    limit: u32,
    /// Restrict to one beneficiary.
    #[serde(default)]
    beneficiary: Option<AccountId>,
}

#[derive(Deserialize)]
struct EventsParams {
    /// Return events with a sequence strictly greater than this.
    #[serde(default)]
    after: u64,
    #[serde(default = "default_page")]
    limit: u32,
}

fn page(limit: u32) -> std::result::Result<u32, RpcError> {
    if limit == 0 || limit > MAX_PAGE {
        return Err(RpcError::invalid_params(&format!("limit must be 1..={MAX_PAGE}")));
    }
    Ok(limit)
}

pub async fn get_settlement(state: &Arc<DaemonState>, params: &Value) -> Result {
    let p: SettlementParams = parse_params(params)?;
    let entry = state.bridge.lock().await.get_settlement(&p.settlement_id)?;
    to_json(&entry)
}

pub async fn get_settlement_by_invoice(state: &Arc<DaemonState>, params: &Value) -> Result {
    let p: InvoiceParams = parse_params(params)?;
    let entry = state.bridge.lock().await.settlement_by_invoice(&p.invoice_id)?;
    to_json(&entry)
}

pub async fn is_invoice_processed(state: &Arc<DaemonState>, params: &Value) -> Result {
    let p: InvoiceParams = parse_params(params)?;
    let processed = state.bridge.lock().await.is_invoice_processed(&p.invoice_id)?;
    Ok(serde_json::json!({ "invoice_id": p.invoice_id, "processed": processed }))
}

pub async fn get_totals(state: &Arc<DaemonState>) -> Result {
    let totals = state.bridge.lock().await.totals()?;
    Ok(serde_json::json!({
        "total_revenue_bridged": totals.total_revenue_bridged,
        "total_revenue_reversed": totals.total_revenue_reversed,
        "net_revenue": totals.net_revenue(),
        "settlement_count": totals.settlement_count,
    }))
}

pub async fn get_allocation(state: &Arc<DaemonState>) -> Result {
    let allocation = state.bridge.lock().await.allocation()?;
    to_json(&allocation)
}

/// Split an amount under the current weights without recording anything.
pub async fn preview_allocation(state: &Arc<DaemonState>, params: &Value) -> Result {
    let p: PreviewParams = parse_params(params)?;
    let split = state.bridge.lock().await.preview(p.amount)?;
    to_json(&split)
}

pub async fn get_partition_balance(state: &Arc<DaemonState>, params: &Value) -> Result {
    let p: BalanceParams = parse_params(params)?;
    let balance = state.bridge.lock().await.partition_balance(p.partition, &p.account)?;
    Ok(serde_json::json!({
        "partition": p.partition,
        "account": p.account,
        "balance": balance,
    }))
}

pub async fn get_recent_settlements(state: &Arc<DaemonState>, params: &Value) -> Result {
    let p: RecentParams = parse_params(params)?;
    let limit = page(p.limit)?;
    let bridge = state.bridge.lock().await;
    let entries = match p.beneficiary {
        Some(beneficiary) => bridge.settlements_for_beneficiary(&beneficiary, limit)?,
        None => bridge.recent_settlements(limit)?,
    };
    to_json(&entries)
}

/// Persisted events after a sequence number, for backfill.
pub async fn get_events(state: &Arc<DaemonState>, params: &Value) -> Result {
    let p: EventsParams = parse_params(params)?;
    let limit = page(p.limit)?;
    let records = state.bridge.lock().await.events_since(p.after, limit)?;
    to_json(&records)
}

pub async fn get_status(state: &Arc<DaemonState>) -> Result {
    let status = state.bridge.lock().await.status()?;
    let mut value = to_json(&status)?;
    value["version"] = serde_json::json!(env!("CARGO_PKG_VERSION"));
    value["events_published"] = serde_json::json!(state.event_bus.published());
    value["data_dir"] = serde_json::json!(state.config.data_dir());
    Ok(value)
}
