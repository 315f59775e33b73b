//! CSV adapters for the replay binary: an operation stream in, the final
//! visible rows out.

pub mod ledger_writer;
pub mod operation_reader;
