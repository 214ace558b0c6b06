//! Database query functions organized by domain.

pub mod admin;
pub mod events;
pub mod ledger_state;
pub mod settlements;
