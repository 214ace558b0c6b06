//! Settlement records and their classification tags.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};

use crate::{decode_fixed, AccountId, Allocation, AllocationConfig, Amount, Timestamp, TypesError};

/// Globally unique 32-byte settlement identifier. Text form is `0x`-prefixed hex.
#[derive(Clone, Copy, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub struct SettlementId(pub [u8; 32]);

impl SettlementId {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_slice(bytes: &[u8]) -> crate::Result<Self> {
        let array: [u8; 32] = bytes.try_into().map_err(|_| TypesError::InvalidLength {
            kind: "settlement id",
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self(array))
    }
}

impl fmt::Display for SettlementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for SettlementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SettlementId({self})")
    }
}

impl FromStr for SettlementId {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode_fixed::<32>("settlement id", s).map(Self)
    }
}

/// Declares a closed, string-coded enum with `as_str`, `Display` and `FromStr`.
macro_rules! coded_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal { $($variant:ident => $code:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $code),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = TypesError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($code => Ok($name::$variant),)+
                    other => Err(TypesError::UnknownVariant {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

coded_enum! {
    /// Settlement lifecycle status.
    ///
    /// `Pending` is reserved for an asynchronous confirmation flow; the bridge
    /// currently creates every entry directly as `Settled`.
    SettlementStatus, "settlement status" {
        Pending => "pending",
        Settled => "settled",
        Reversed => "reversed",
        Disputed => "disputed",
    }
}

coded_enum! {
    /// Unit of account. `Native` is the placeholder used when the billing
    /// system does not report a currency.
    Currency, "currency" {
        Native => "native",
        Usd => "usd",
        Eur => "eur",
        Gbp => "gbp",
        Usdc => "usdc",
    }
}

coded_enum! {
    /// Originating billing system.
    SourceSystem, "source system" {
        Stripe => "stripe",
        Paddle => "paddle",
        Chargebee => "chargebee",
        Manual => "manual",
    }
}

coded_enum! {
    /// Destination treasury account class.
    DestinationSystem, "destination system" {
        Treasury => "treasury",
        OperatingAccount => "operating_account",
        Escrow => "escrow",
    }
}

/// One off-chain payment confirmation submitted for bridging.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeRequest {
    pub invoice_id: String,
    pub amount: Amount,
    #[serde(default)]
    pub payer: Option<AccountId>,
    pub beneficiary: AccountId,
    pub currency: Currency,
    pub source_system: SourceSystem,
    pub destination_system: DestinationSystem,
}

/// The ledger record of one settlement. Never deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueEntry {
    pub settlement_id: SettlementId,
    pub invoice_id: String,
    pub payer: Option<AccountId>,
    pub beneficiary: AccountId,
    pub amount: Amount,
    pub currency: Currency,
    pub source_system: SourceSystem,
    pub destination_system: DestinationSystem,
    pub status: SettlementStatus,
    /// Split issued at bridge time; reversal burns exactly this.
    pub allocation: Allocation,
    /// Weights in force at bridge time.
    pub allocation_config: AllocationConfig,
    /// Ledger nonce consumed by this settlement.
    pub nonce: u64,
    pub bridged_at: Timestamp,
    pub settled_at: Timestamp,
    pub reversal_reason: Option<String>,
    pub reversed_at: Option<Timestamp>,
    pub disputed_at: Option<Timestamp>,
}

/// Running ledger totals.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevenueTotals {
    pub total_revenue_bridged: Amount,
    pub total_revenue_reversed: Amount,
    pub settlement_count: u64,
}

impl RevenueTotals {
    /// Bridged minus reversed. Reversals never exceed what was bridged.
    pub fn net_revenue(&self) -> Amount {
        self.total_revenue_bridged
            .saturating_sub(self.total_revenue_reversed)
    }
}
