//! Deterministic identifier and digest derivation.

use crate::blake3::{contexts, derive_key, encode_multi_field};

/// Derive a settlement identifier.
///
/// A pure function of `(invoice_id, timestamp, nonce, chain_id)`. The nonce is
/// strictly increasing per ledger, so two settlements on the same chain can
/// never share an ID even when invoice and timestamp coincide.
pub fn settlement_id(invoice_id: &str, timestamp: u64, nonce: u64, chain_id: u64) -> [u8; 32] {
    let material = encode_multi_field(&[
        invoice_id.as_bytes(),
        timestamp.to_le_bytes().as_slice(),
        nonce.to_le_bytes().as_slice(),
        chain_id.to_le_bytes().as_slice(),
    ]);
    derive_key(contexts::SETTLEMENT_ID, &material)
}

/// Link digest that precedes the first event of a chain.
pub fn event_chain_genesis(chain_id: u64) -> [u8; 32] {
    derive_key(contexts::EVENT_CHAIN_GENESIS, &chain_id.to_le_bytes())
}

/// Digest of one event-log record, chained to its predecessor.
///
/// Rewriting or dropping any earlier record changes every later digest.
pub fn event_digest(previous: &[u8; 32], sequence: u64, timestamp: u64, payload: &[u8]) -> [u8; 32] {
    let material = encode_multi_field(&[
        previous.as_slice(),
        sequence.to_le_bytes().as_slice(),
        timestamp.to_le_bytes().as_slice(),
        payload,
    ]);
    derive_key(contexts::EVENT_CHAIN, &material)
}

/// Digest an operator signs to authorize one RPC write.
///
/// Binds the method name, the canonical parameter body, the ledger's chain ID
/// and the time the request was issued.
pub fn request_digest(method: &str, body: &[u8], chain_id: u64, issued_at: u64) -> [u8; 32] {
    let material = encode_multi_field(&[
        method.as_bytes(),
        body,
        chain_id.to_le_bytes().as_slice(),
        issued_at.to_le_bytes().as_slice(),
    ]);
    derive_key(contexts::RPC_REQUEST, &material)
}
