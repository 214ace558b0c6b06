//! Token partitions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::TypesError;

/// A labeled sub-ledger of the token balance.
///
/// Declaration order is the allocation order; [`Partition::Staking`] is last
/// and absorbs the rounding remainder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Partition {
    Reserve,
    Liquidity,
    Enterprise,
    Staking,
}

impl Partition {
    /// All partitions in allocation order.
    pub const ALL: [Partition; 4] = [
        Partition::Reserve,
        Partition::Liquidity,
        Partition::Enterprise,
        Partition::Staking,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Partition::Reserve => "reserve",
            Partition::Liquidity => "liquidity",
            Partition::Enterprise => "enterprise",
            Partition::Staking => "staking",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Partition {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Partition::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| TypesError::UnknownVariant {
                kind: "partition",
                value: s.to_string(),
            })
    }
}
