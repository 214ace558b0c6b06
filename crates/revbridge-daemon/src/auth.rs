//! Signed requests for RPC writes.
//!
//! Every state-changing method carries an `auth` object beside its params:
//!
//! ```json
//! "auth": { "public_key": "<64 hex>", "signature": "<128 hex>", "issued_at": 1700000000 }
//! ```
//!
//! The signature covers [`ids::request_digest`] over the method name, the
//! canonical JSON of the remaining params (keys sorted, no whitespace), the
//! ledger's chain ID and `issued_at`. The signing key must derive to the
//! `caller` account named in the params. Requests outside the configured age
//! window are rejected, and each signature is accepted once.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use revbridge_crypto::ed25519::{derive_account_id, Signature, VerifyingKey};
use revbridge_crypto::ids;
use revbridge_types::AccountId;

use crate::commands::parse_params;
use crate::rpc::RpcError;
use crate::DaemonState;

/// Params key holding the request signature.
pub const AUTH_FIELD: &str = "auth";

#[derive(Debug, Deserialize)]
struct RequestAuth {
    public_key: String,
    signature: String,
    issued_at: u64,
}

#[derive(Deserialize)]
struct CallerParams {
    caller: AccountId,
}

/// Signatures accepted inside the age window.
#[derive(Debug, Default)]
pub struct ReplayGuard {
    seen: HashMap<[u8; 64], u64>,
}

impl ReplayGuard {
    /// Record `signature`. Returns false if it was already accepted.
    ///
    /// Entries older than `max_age` are dropped first; such requests fail the
    /// age check before reaching the guard.
    pub fn admit(&mut self, signature: [u8; 64], issued_at: u64, now: u64, max_age: u64) -> bool {
        self.seen.retain(|_, at| at.saturating_add(max_age) >= now);
        self.seen.insert(signature, issued_at).is_none()
    }
}

/// Canonical signed body: `params` without [`AUTH_FIELD`], object keys
/// sorted at every level.
pub fn canonical_body(params: &Value) -> Vec<u8> {
    let stripped = match params {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(key, _)| key.as_str() != AUTH_FIELD)
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
        other => other.clone(),
    };
    canonicalize(&stripped).to_string().into_bytes()
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key.clone(), canonicalize(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Verify the signature on a write and return the authenticated caller.
///
/// # Errors
///
/// - `UNAUTHORIZED` (-32001) for a missing, stale, replayed or invalid
///   signature, or a key that does not belong to `caller`
/// - `INVALID_PARAMS` (-32602) if `auth` or `caller` is malformed
pub async fn authenticate(state: &DaemonState, method: &str, params: &Value, now: u64) -> Result<AccountId, RpcError> {
    let auth: RequestAuth = match params.get(AUTH_FIELD) {
        Some(value) => serde_json::from_value(value.clone()).map_err(|e| RpcError::invalid_params(&e.to_string()))?,
        None => return Err(reject(method, "missing request signature")),
    };
    let CallerParams { caller } = parse_params(params)?;

    let public_key = decode_hex::<32>(&auth.public_key)
        .and_then(|bytes| VerifyingKey::from_bytes(&bytes).ok())
        .ok_or_else(|| reject(method, "malformed public key"))?;
    if AccountId(derive_account_id(&public_key)) != caller {
        return Err(reject(method, "signing key does not belong to caller"));
    }
    let signature = decode_hex::<64>(&auth.signature)
        .map(|bytes| Signature::from_bytes(&bytes))
        .ok_or_else(|| reject(method, "malformed signature"))?;

    let max_age = state.config.advanced.request_max_age_secs;
    if auth.issued_at.saturating_add(max_age) < now || auth.issued_at > now.saturating_add(max_age) {
        return Err(reject(method, "request outside age window"));
    }

    let chain_id = state.bridge.lock().await.chain_id()?;
    let digest = ids::request_digest(method, &canonical_body(params), chain_id, auth.issued_at);
    public_key
        .verify(&digest, &signature)
        .map_err(|_| reject(method, "bad signature"))?;

    if !state
        .replay_guard
        .lock()
        .await
        .admit(signature.to_bytes(), auth.issued_at, now, max_age)
    {
        return Err(reject(method, "request already used"));
    }
    Ok(caller)
}

fn reject(method: &str, reason: &str) -> RpcError {
    warn!(method, reason, "rejected unauthenticated request");
    RpcError::unauthenticated(reason)
}

fn decode_hex<const N: usize>(text: &str) -> Option<[u8; N]> {
    let bytes = hex::decode(text.trim_start_matches("0x")).ok()?;
    bytes.try_into().ok()
}
