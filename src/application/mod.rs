//! Application layer orchestrating ledger operations.
//!
//! [`ledger::PaymentLedger`] is the entry point for callers. Every storage
//! access it makes goes through [`isolation::ScopedStore`], so row visibility
//! is decided by the active tenant context on every single call.

pub mod isolation;
pub mod ledger;
