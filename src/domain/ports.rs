use async_trait::async_trait;

use crate::domain::payment::{Payment, PaymentId, TransactionId};
use crate::error::Result;

/// Raw row storage beneath the isolation layer.
///
/// Implementations are tenant-blind: filtering and visibility decisions live
/// in [`crate::application::isolation::ScopedStore`], which is the only way
/// the application layer reaches a `PaymentStore`. Implementations must:
///
/// - reject `insert` of an already-recorded `transaction_id`
///   (`DuplicateTransaction`), ledger-wide, not per tenant;
/// - make `update` an atomic compare-and-set against `expected_version`,
///   bumping `version` and `updated_at` inside the same atomic step and
///   failing with `ConcurrentModification` on a version mismatch.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn insert(&self, payment: Payment) -> Result<()>;
    async fn get(&self, id: PaymentId) -> Result<Option<Payment>>;
    async fn find_by_transaction(&self, transaction_id: TransactionId) -> Result<Option<Payment>>;
    async fn all(&self) -> Result<Vec<Payment>>;
    async fn update(&self, payment: Payment, expected_version: u64) -> Result<Payment>;
}

pub type PaymentStoreBox = Box<dyn PaymentStore>;
