use crate::domain::payment::{Payment, PaymentId, TransactionId};
use crate::domain::ports::PaymentStore;
use crate::domain::tenant::TenantContext;
use crate::error::{LedgerError, Result};

/// Tenant-scoped view over a raw [`PaymentStore`].
///
/// Every read and write is conditional on `row.tenant_id` matching the active
/// context; with no active context the tenant check fails before storage is
/// touched (fail-closed). Rows of other tenants are indistinguishable from
/// absent rows, so a caller can never observe the true row count or confirm
/// that a foreign identifier exists.
///
/// A `ScopedStore` is constructed per operation and borrows its context; the
/// predicate is re-evaluated on each access rather than cached. There is no
/// alternative constructor that skips the check, whatever the caller's
/// privilege level.
pub struct ScopedStore<'a> {
    store: &'a dyn PaymentStore,
    ctx: &'a TenantContext,
}

impl<'a> ScopedStore<'a> {
    pub fn new(store: &'a dyn PaymentStore, ctx: &'a TenantContext) -> Self {
        Self { store, ctx }
    }

    /// The single visibility predicate, applied to both reads and writes.
    fn can_access(&self, payment: &Payment) -> bool {
        match self.ctx.require() {
            Ok(tenant_id) => payment.tenant_id == tenant_id,
            Err(_) => false,
        }
    }

    /// Inserts a row after verifying it targets the active tenant.
    pub async fn insert(&self, payment: Payment) -> Result<()> {
        let tenant_id = self.ctx.require()?;
        if payment.tenant_id != tenant_id {
            return Err(LedgerError::TenantMismatch {
                expected: tenant_id,
                actual: payment.tenant_id,
            });
        }
        self.store.insert(payment).await
    }

    pub async fn get(&self, id: PaymentId) -> Result<Option<Payment>> {
        self.ctx.require()?;
        Ok(self
            .store
            .get(id)
            .await?
            .filter(|payment| self.can_access(payment)))
    }

    pub async fn find_by_transaction(
        &self,
        transaction_id: TransactionId,
    ) -> Result<Option<Payment>> {
        self.ctx.require()?;
        Ok(self
            .store
            .find_by_transaction(transaction_id)
            .await?
            .filter(|payment| self.can_access(payment)))
    }

    /// All rows of the active tenant, as if no other tenant's rows exist.
    pub async fn all(&self) -> Result<Vec<Payment>> {
        self.ctx.require()?;
        let mut rows = self.store.all().await?;
        rows.retain(|payment| self.can_access(payment));
        Ok(rows)
    }

    /// Persists a mutation of a visible row via compare-and-set.
    ///
    /// Visibility is decided against the stored row, not the caller-supplied
    /// one, so a forged `tenant_id` cannot turn the update path into an
    /// existence probe: a foreign row and an absent row both report
    /// `NotFound`.
    pub async fn update(&self, payment: Payment, expected_version: u64) -> Result<Payment> {
        self.ctx.require()?;
        match self.store.get(payment.id).await? {
            Some(current) if self.can_access(&current) => {
                self.store.update(payment, expected_version).await
            }
            _ => Err(LedgerError::NotFound),
        }
    }
}
