//! Control-plane command handlers. All owner-only.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use revbridge_types::{AccountId, AllocationConfig};

use super::{parse_params, unix_now, Result};
use crate::DaemonState;

#[derive(Deserialize)]
struct OperatorParams {
    operator: AccountId,
}

#[derive(Deserialize)]
struct AllocationParams {
    reserve_bps: u16,
    liquidity_bps: u16,
    enterprise_bps: u16,
    staking_bps: u16,
}

#[derive(Deserialize)]
struct OwnershipParams {
    new_owner: AccountId,
}

pub async fn set_operator(state: &Arc<DaemonState>, caller: &AccountId, params: &Value) -> Result {
    let p: OperatorParams = parse_params(params)?;
    state.bridge.lock().await.set_operator(caller, &p.operator, unix_now())?;
    Ok(serde_json::json!({ "operator": p.operator }))
}

pub async fn set_allocation(state: &Arc<DaemonState>, caller: &AccountId, params: &Value) -> Result {
    let p: AllocationParams = parse_params(params)?;
    let config = AllocationConfig::new(p.reserve_bps, p.liquidity_bps, p.enterprise_bps, p.staking_bps);
    state.bridge.lock().await.set_allocation(caller, config, unix_now())?;
    Ok(serde_json::json!({ "allocation": config }))
}

pub async fn pause(state: &Arc<DaemonState>, caller: &AccountId) -> Result {
    state.bridge.lock().await.pause(caller, unix_now())?;
    Ok(serde_json::json!({ "paused": true }))
}

pub async fn unpause(state: &Arc<DaemonState>, caller: &AccountId) -> Result {
    state.bridge.lock().await.unpause(caller, unix_now())?;
    Ok(serde_json::json!({ "paused": false }))
}

pub async fn transfer_ownership(state: &Arc<DaemonState>, caller: &AccountId, params: &Value) -> Result {
    let p: OwnershipParams = parse_params(params)?;
    state
        .bridge
        .lock()
        .await
        .transfer_ownership(caller, &p.new_owner, unix_now())?;
    Ok(serde_json::json!({ "owner": p.new_owner }))
}
