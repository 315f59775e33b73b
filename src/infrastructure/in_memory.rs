use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::payment::{Payment, PaymentId, TransactionId};
use crate::domain::ports::PaymentStore;
use crate::error::{LedgerError, Result};

#[derive(Default)]
struct Inner {
    rows: HashMap<PaymentId, Payment>,
    by_transaction: HashMap<TransactionId, PaymentId>,
}

/// A thread-safe in-memory payment store.
///
/// Uses `Arc<RwLock<..>>` to allow shared concurrent access; the write lock
/// makes each insert and compare-and-set update atomic, so concurrent
/// transitions on the same row serialize. Ideal for tests and for callers
/// that do not need persistence.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert(&self, payment: Payment) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.by_transaction.contains_key(&payment.transaction_id) {
            return Err(LedgerError::DuplicateTransaction(payment.transaction_id));
        }
        if inner.rows.contains_key(&payment.id) {
            return Err(LedgerError::Storage(format!(
                "payment id collision: {}",
                payment.id
            )));
        }
        inner.by_transaction.insert(payment.transaction_id, payment.id);
        inner.rows.insert(payment.id, payment);
        Ok(())
    }

    async fn get(&self, id: PaymentId) -> Result<Option<Payment>> {
        let inner = self.inner.read().await;
        Ok(inner.rows.get(&id).cloned())
    }

    async fn find_by_transaction(&self, transaction_id: TransactionId) -> Result<Option<Payment>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_transaction
            .get(&transaction_id)
            .and_then(|id| inner.rows.get(id))
            .cloned())
    }

    async fn all(&self) -> Result<Vec<Payment>> {
        let inner = self.inner.read().await;
        Ok(inner.rows.values().cloned().collect())
    }

    async fn update(&self, mut payment: Payment, expected_version: u64) -> Result<Payment> {
        let mut inner = self.inner.write().await;
        let current = inner.rows.get(&payment.id).ok_or(LedgerError::NotFound)?;
        if current.version != expected_version {
            return Err(LedgerError::ConcurrentModification(payment.id));
        }
        if payment.tenant_id != current.tenant_id
            || payment.transaction_id != current.transaction_id
            || payment.created_at != current.created_at
        {
            return Err(LedgerError::Storage(format!(
                "immutable field changed on payment {}",
                payment.id
            )));
        }
        // updated_at must strictly increase even if the clock did not move.
        let mut now = Utc::now();
        if now <= current.updated_at {
            now = current.updated_at + Duration::nanoseconds(1);
        }
        payment.updated_at = now;
        payment.version = expected_version + 1;
        inner.rows.insert(payment.id, payment.clone());
        Ok(payment)
    }
}
