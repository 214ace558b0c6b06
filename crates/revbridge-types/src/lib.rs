//! # revbridge-types
//!
//! Shared domain types used across the Revbridge workspace: identities,
//! partitions, allocation splits, settlement records and the audit event feed.

pub mod allocation;
pub mod events;
pub mod identity;
pub mod partition;
pub mod settlement;

pub use allocation::{Allocation, AllocationConfig};
pub use events::{BridgeEvent, EventRecord};
pub use identity::AccountId;
pub use partition::Partition;
pub use settlement::{
    BridgeRequest, Currency, DestinationSystem, RevenueEntry, RevenueTotals, SettlementId,
    SettlementStatus, SourceSystem,
};

/// Fixed-point token amount with [`AMOUNT_DECIMALS`] implied decimals.
pub type Amount = u64;
/// Unix epoch seconds.
pub type Timestamp = u64;

/// Implied decimal places of every [`Amount`] (stablecoin convention).
pub const AMOUNT_DECIMALS: u32 = 6;

/// Base units per whole token (10^6).
pub const UNITS_PER_TOKEN: Amount = 1_000_000;

/// Basis points in 100.00%.
pub const BPS_DENOMINATOR: u16 = 10_000;

/// Longest accepted external invoice identifier, in bytes.
pub const MAX_INVOICE_ID_LEN: usize = 128;

/// Errors raised while parsing domain types from their text forms.
#[derive(Debug, thiserror::Error)]
pub enum TypesError {
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("invalid length for {kind}: expected {expected} bytes, got {actual}")]
    InvalidLength {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}

pub type Result<T> = std::result::Result<T, TypesError>;

/// Decode a fixed-size byte array from hex, accepting an optional `0x` prefix.
pub(crate) fn decode_fixed<const N: usize>(kind: &'static str, s: &str) -> Result<[u8; N]> {
    let trimmed = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(trimmed)?;
    let actual = bytes.len();
    bytes.try_into().map_err(|_| TypesError::InvalidLength {
        kind,
        expected: N,
        actual,
    })
}
