//! Ed25519 signing and verification (RFC 8032).
//!
//! Operators and the owner authenticate RPC writes with an Ed25519 key. Their
//! ledger [`account ID`](derive_account_id) is derived from the public key, so
//! a request can only act as the account whose key signed it.
//!
//! This module wraps `ed25519-dalek` with Revbridge-specific types.

use ed25519_dalek::Signer;

use crate::blake3::{contexts, derive_key};
use crate::{CryptoError, Result};

/// An Ed25519 signing key (private key). Zeroized on drop.
pub struct SigningKey {
    inner: ed25519_dalek::SigningKey,
}

/// An Ed25519 verification key (public key).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerifyingKey {
    inner: ed25519_dalek::VerifyingKey,
}

/// An Ed25519 signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Signature {
    inner: ed25519_dalek::Signature,
}

/// An Ed25519 keypair.
pub struct KeyPair {
    pub signing_key: SigningKey,
    pub verifying_key: VerifyingKey,
}

impl SigningKey {
    /// Create a signing key from raw bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            inner: ed25519_dalek::SigningKey::from_bytes(bytes),
        }
    }

    /// Get the corresponding verifying key.
    pub fn verifying_key(&self) -> VerifyingKey {
        VerifyingKey {
            inner: self.inner.verifying_key(),
        }
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature {
            inner: self.inner.sign(message),
        }
    }
}

impl VerifyingKey {
    /// Create a verifying key from raw bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        let inner = ed25519_dalek::VerifyingKey::from_bytes(bytes).map_err(|_| CryptoError::InvalidKey)?;
        Ok(Self { inner })
    }

    /// Get the raw bytes of this verifying key.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.inner.to_bytes()
    }

    /// Get the raw bytes as a slice.
    pub fn as_bytes(&self) -> &[u8; 32] {
        self.inner.as_bytes()
    }

    /// Verify a signature on a message.
    ///
    /// Uses strict verification, which rejects small-order keys and
    /// non-canonical signature encodings.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<()> {
        self.inner
            .verify_strict(message, &signature.inner)
            .map_err(|_| CryptoError::SignatureVerification)
    }
}

impl Signature {
    /// Create a signature from raw bytes.
    pub fn from_bytes(bytes: &[u8; 64]) -> Self {
        Self {
            inner: ed25519_dalek::Signature::from_bytes(bytes),
        }
    }

    /// Get the raw bytes of this signature.
    pub fn to_bytes(&self) -> [u8; 64] {
        self.inner.to_bytes()
    }
}

impl KeyPair {
    /// Create a keypair from a signing key's raw bytes.
    pub fn from_bytes(secret: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(secret);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Ledger account controlled by this keypair.
    pub fn account_id(&self) -> [u8; 20] {
        derive_account_id(&self.verifying_key)
    }
}

/// Derive the 20-byte ledger account ID of a public key.
///
/// `account_id = BLAKE3::derive_key("Revbridge v1 account-id", public_key)[:20]`
pub fn derive_account_id(public_key: &VerifyingKey) -> [u8; 20] {
    let digest = derive_key(contexts::ACCOUNT_ID, public_key.as_bytes());
    let mut account = [0u8; 20];
    account.copy_from_slice(&digest[..20]);
    account
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("public", &self.verifying_key())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_verify_roundtrip() {
        let kp = KeyPair::from_bytes(&[7u8; 32]);
        let msg = b"Revbridge request";
        let sig = kp.signing_key.sign(msg);
        assert!(kp.verifying_key.verify(msg, &sig).is_ok());
    }

    #[test]
    fn test_wrong_message_fails() {
        let kp = KeyPair::from_bytes(&[7u8; 32]);
        let sig = kp.signing_key.sign(b"correct message");
        assert!(matches!(
            kp.verifying_key.verify(b"wrong message", &sig),
            Err(CryptoError::SignatureVerification)
        ));
    }

    #[test]
    fn test_wrong_key_fails() {
        let kp1 = KeyPair::from_bytes(&[1u8; 32]);
        let kp2 = KeyPair::from_bytes(&[2u8; 32]);
        let sig = kp1.signing_key.sign(b"test");
        assert!(kp2.verifying_key.verify(b"test", &sig).is_err());
    }

    #[test]
    fn test_signature_bytes_roundtrip() {
        let kp = KeyPair::from_bytes(&[3u8; 32]);
        let sig = kp.signing_key.sign(b"test");
        assert_eq!(Signature::from_bytes(&sig.to_bytes()), sig);
    }

    #[test]
    fn test_verifying_key_bytes_roundtrip() {
        let kp = KeyPair::from_bytes(&[3u8; 32]);
        let restored = VerifyingKey::from_bytes(&kp.verifying_key.to_bytes()).expect("valid key");
        assert_eq!(kp.verifying_key, restored);
    }

    #[test]
    fn test_account_id_derivation() {
        let kp = KeyPair::from_bytes(&[42u8; 32]);
        assert_eq!(kp.account_id(), derive_account_id(&kp.verifying_key));
        assert_ne!(kp.account_id(), KeyPair::from_bytes(&[43u8; 32]).account_id());
        assert_ne!(kp.account_id(), [0u8; 20]);
    }
}
