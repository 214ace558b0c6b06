//! # revbridge-allocation
//!
//! Partition allocation for bridged revenue.
//!
//! Every bridged amount is split across four partitions (reserve, liquidity,
//! enterprise, staking) by basis-point weights. The split never loses dust:
//! the staking partition absorbs the entire truncation remainder.
//!
//! ## Modules
//!
//! - [`calculator`] — Allocation config validation and the split itself

pub mod calculator;

pub use calculator::{allocate, validate_allocation, DEFAULT_ALLOCATION};

/// Error types for allocation operations.
#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    /// Weights do not sum to 10000 bps.
    #[error("allocation weights must sum to 10000 bps, got {total}")]
    InvalidPercentages {
        /// The actual total.
        total: u32,
    },

    /// Arithmetic overflow.
    #[error("arithmetic overflow in allocation")]
    Overflow,
}

/// Convenience result type for allocation operations.
pub type Result<T> = std::result::Result<T, AllocationError>;
