//! Domain-separated BLAKE3 hashing for Revbridge.
//!
//! Every derived identifier uses BLAKE3's key-derivation mode with a
//! registered context string, so identifiers from different domains can never
//! collide even when their inputs are byte-identical.

/// Registered BLAKE3 context strings. Using an unregistered context is a bug.
pub mod contexts {
    pub const SETTLEMENT_ID: &str = "Revbridge v1 settlement-id";
    pub const EVENT_CHAIN: &str = "Revbridge v1 event-chain";
    pub const EVENT_CHAIN_GENESIS: &str = "Revbridge v1 event-chain-genesis";
    pub const ACCOUNT_ID: &str = "Revbridge v1 account-id";
    pub const RPC_REQUEST: &str = "Revbridge v1 rpc-request";
}

/// Derive a 32-byte value using BLAKE3's key derivation mode.
///
/// # Arguments
///
/// * `context` - A registered context string (must start with "Revbridge v1 ")
/// * `key_material` - The input material
pub fn derive_key(context: &str, key_material: &[u8]) -> [u8; 32] {
    let mut hasher = ::blake3::Hasher::new_derive_key(context);
    hasher.update(key_material);
    *hasher.finalize().as_bytes()
}

/// Encode multiple dynamic fields using length-prefixed encoding.
///
/// `LE32(len(field1)) || field1 || LE32(len(field2)) || field2 || ...`
///
/// Prevents ambiguity between e.g. `("ab", "c")` and `("a", "bc")`.
pub fn encode_multi_field(fields: &[&[u8]]) -> Vec<u8> {
    let total_len: usize = fields.iter().map(|f| 4 + f.len()).sum();
    let mut output = Vec::with_capacity(total_len);
    for field in fields {
        output.extend_from_slice(&(field.len() as u32).to_le_bytes());
        output.extend_from_slice(field);
    }
    output
}
