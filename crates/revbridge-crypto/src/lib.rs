//! # revbridge-crypto
//!
//! Hashing and signature primitives for Revbridge.
//!
//! ## Modules
//!
//! - [`blake3`] — Domain-separated BLAKE3 hashing and registered contexts
//! - [`ed25519`] — Operator request signatures and account ID derivation
//! - [`ids`] — Settlement ID derivation, event-chain and request digests

pub mod blake3;
pub mod ed25519;
pub mod ids;

/// Errors from cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid public key")]
    InvalidKey,

    #[error("signature verification failed")]
    SignatureVerification,
}

pub type Result<T> = std::result::Result<T, CryptoError>;
