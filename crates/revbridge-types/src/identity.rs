//! Account identities.

use std::fmt;
use std::str::FromStr;

use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::{decode_fixed, TypesError};

/// A 20-byte account identity (owner, operator, payer or beneficiary).
///
/// The all-zero identity is the null account and is rejected wherever a
/// real identity is required. Text form is `0x`-prefixed lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, SerializeDisplay, DeserializeFromStr)]
pub struct AccountId(pub [u8; 20]);

impl AccountId {
    /// The null account.
    pub const ZERO: AccountId = AccountId([0u8; 20]);

    pub fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Build an identity from a byte slice (e.g. a database BLOB).
    pub fn from_slice(bytes: &[u8]) -> crate::Result<Self> {
        let array: [u8; 20] = bytes.try_into().map_err(|_| TypesError::InvalidLength {
            kind: "account id",
            expected: 20,
            actual: bytes.len(),
        })?;
        Ok(Self(array))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({self})")
    }
}

impl FromStr for AccountId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fixed::<20>("account id", s).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_account() {
        assert!(AccountId::ZERO.is_zero());
        assert!(!AccountId([1u8; 20]).is_zero());
    }

    #[test]
    fn test_display_parse() {
        let id = AccountId([0xab; 20]);
        let text = id.to_string();
        assert!(text.starts_with("0x"));
        assert_eq!(text.len(), 42);
        let parsed: AccountId = text.parse().expect("parse");
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_parse_rejects_short() {
        assert!("0x1234".parse::<AccountId>().is_err());
        assert!("not-hex".parse::<AccountId>().is_err());
    }

    #[test]
    fn test_json_form_is_hex_string() {
        let id = AccountId([7u8; 20]);
        let json = serde_json::to_string(&id).expect("serialize");
        assert_eq!(json, format!("\"{id}\""));
        let back: AccountId = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, id);
    }

    #[test]
    fn test_from_slice_length() {
        assert!(AccountId::from_slice(&[1u8; 20]).is_ok());
        assert!(AccountId::from_slice(&[1u8; 32]).is_err());
    }
}
