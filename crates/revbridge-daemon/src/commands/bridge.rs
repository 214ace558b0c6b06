//! Gateway command handlers: bridge, reverse, dispute.
//!
//! `caller` is the account authenticated by [`crate::auth`]; the `caller`
//! field in `params` has already been checked against the signing key.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use revbridge_types::{AccountId, Amount, BridgeRequest, SettlementId};

use super::{parse_params, to_json, unix_now, Result};
use crate::DaemonState;

#[derive(Deserialize)]
struct BridgeRevenueParams {
    #[serde(flatten)]
    request: BridgeRequest,
}

#[derive(Deserialize)]
struct BridgeSimpleParams {
    invoice_id: String,
    amount: Amount,
    beneficiary: AccountId,
}

#[derive(Deserialize)]
struct ReverseParams {
    settlement_id: SettlementId,
    #[serde(default)]
    reason: String,
}

#[derive(Deserialize)]
struct DisputeParams {
    settlement_id: SettlementId,
}

/// Bridge a fully specified payment.
pub async fn bridge_revenue(state: &Arc<DaemonState>, caller: &AccountId, params: &Value) -> Result {
    let p: BridgeRevenueParams = parse_params(params)?;
    let mut bridge = state.bridge.lock().await;
    let settlement_id = bridge.bridge_revenue(caller, p.request, unix_now())?;
    Ok(serde_json::json!({ "settlement_id": settlement_id }))
}

/// Bridge with configured defaults for payer, currency and systems.
pub async fn bridge_revenue_simple(state: &Arc<DaemonState>, caller: &AccountId, params: &Value) -> Result {
    let p: BridgeSimpleParams = parse_params(params)?;
    let mut bridge = state.bridge.lock().await;
    let settlement_id =
        bridge.bridge_revenue_simple(caller, &p.invoice_id, p.amount, &p.beneficiary, unix_now())?;
    Ok(serde_json::json!({ "settlement_id": settlement_id }))
}

/// Reverse a settled payment. Returns the updated entry.
pub async fn reverse_settlement(state: &Arc<DaemonState>, caller: &AccountId, params: &Value) -> Result {
    let p: ReverseParams = parse_params(params)?;
    let mut bridge = state.bridge.lock().await;
    let entry = bridge.reverse_settlement(caller, &p.settlement_id, &p.reason, unix_now())?;
    to_json(&entry)
}

/// Flag a settlement as disputed.
pub async fn dispute_settlement(state: &Arc<DaemonState>, caller: &AccountId, params: &Value) -> Result {
    let p: DisputeParams = parse_params(params)?;
    let mut bridge = state.bridge.lock().await;
    let previous = bridge.dispute_settlement(caller, &p.settlement_id, unix_now())?;
    Ok(serde_json::json!({ "previous_status": previous }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{operator, stranger, test_state, BENEFICIARY};

    fn full_request(invoice: &str) -> Value {
        serde_json::json!({
            "invoice_id": invoice,
            "amount": 10_000,
            "payer": "0x7777777777777777777777777777777777777777",
            "beneficiary": BENEFICIARY,
            "currency": "usdc",
            "source_system": "stripe",
            "destination_system": "operating_account",
        })
    }

    #[tokio::test]
    async fn test_bridge_and_reverse() {
        let state = test_state();
        let result = bridge_revenue(&state, &operator(), &full_request("inv_1"))
            .await
            .expect("bridge");
        let settlement_id = result["settlement_id"].clone();

        let entry = reverse_settlement(
            &state,
            &operator(),
            &serde_json::json!({
                "settlement_id": settlement_id,
                "reason": "refund",
            }),
        )
        .await
        .expect("reverse");
        assert_eq!(entry["status"], "reversed");
        assert_eq!(entry["reversal_reason"], "refund");
        assert_eq!(entry["source_system"], "stripe");
    }

    #[tokio::test]
    async fn test_duplicate_maps_to_code() {
        let state = test_state();
        bridge_revenue(&state, &operator(), &full_request("inv_1"))
            .await
            .expect("bridge");
        let err = bridge_revenue(&state, &operator(), &full_request("inv_1"))
            .await
            .expect_err("duplicate");
        assert_eq!(err.code, -32010);
    }

    #[tokio::test]
    async fn test_unauthorized_caller() {
        let state = test_state();
        let err = bridge_revenue(&state, &stranger(), &full_request("inv_1"))
            .await
            .expect_err("unauthorized");
        assert_eq!(err.code, -32001);
    }

    #[tokio::test]
    async fn test_missing_params() {
        let state = test_state();
        let err = bridge_revenue_simple(&state, &operator(), &serde_json::json!({}))
            .await
            .expect_err("invalid params");
        assert_eq!(err.code, -32602);

        let err = dispute_settlement(&state, &operator(), &Value::Null)
            .await
            .expect_err("invalid params");
        assert_eq!(err.code, -32602);
    }

    #[tokio::test]
    async fn test_dispute_returns_previous_status() {
        let state = test_state();
        let result = bridge_revenue(&state, &operator(), &full_request("inv_1"))
            .await
            .expect("bridge");
        let params = serde_json::json!({ "settlement_id": result["settlement_id"] });
        let disputed = dispute_settlement(&state, &operator(), &params)
            .await
            .expect("dispute");
        assert_eq!(disputed["previous_status"], "settled");

        // Already disputed: reported, nothing changes
        let again = dispute_settlement(&state, &operator(), &params)
            .await
            .expect("re-dispute");
        assert_eq!(again["previous_status"], "disputed");
    }
}
