//! Storage backends implementing the [`crate::domain::ports::PaymentStore`]
//! port. Both are tenant-blind; isolation is applied above them.

pub mod in_memory;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
