//! Adapters between external representations and the ledger.

pub mod csv;
