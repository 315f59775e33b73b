use rust_decimal::Decimal;

use crate::application::isolation::ScopedStore;
use crate::domain::payment::{
    Currency, Payment, PaymentId, PaymentRequest, TransactionId,
};
use crate::domain::ports::PaymentStoreBox;
use crate::domain::tenant::TenantContext;
use crate::error::{LedgerError, Result};

/// Ledger-wide configuration.
#[derive(Debug, Clone, Default)]
pub struct LedgerConfig {
    pub default_currency: Currency,
}

/// The main entry point of the crate.
///
/// `PaymentLedger` records payments, looks them up, and drives their status
/// lifecycle. Every operation takes the tenant context explicitly and routes
/// all storage access through a per-call [`ScopedStore`], so nothing here can
/// reach a row without the isolation predicate holding.
///
/// Transitions are read-validate-write with a version compare-and-set; a lost
/// race surfaces as [`LedgerError::ConcurrentModification`], which the caller
/// may retry by re-reading.
pub struct PaymentLedger {
    store: PaymentStoreBox,
    config: LedgerConfig,
}

impl PaymentLedger {
    pub fn new(store: PaymentStoreBox) -> Self {
        Self::with_config(store, LedgerConfig::default())
    }

    pub fn with_config(store: PaymentStoreBox, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    fn scoped<'a>(&'a self, ctx: &'a TenantContext) -> ScopedStore<'a> {
        ScopedStore::new(self.store.as_ref(), ctx)
    }

    /// Records a new payment in `Pending` status.
    ///
    /// Generates the row id and the processor transaction id, validates the
    /// amount, applies the configured currency default, and refuses requests
    /// that target a tenant other than the active one.
    pub async fn create(&self, ctx: &TenantContext, request: PaymentRequest) -> Result<Payment> {
        // Context absence is the first failure mode, before any validation.
        ctx.require()?;
        let payment = Payment::record(request, self.config.default_currency.clone())?;
        self.scoped(ctx).insert(payment.clone()).await?;
        tracing::debug!(
            payment_id = %payment.id,
            transaction_id = %payment.transaction_id,
            tenant_id = %payment.tenant_id,
            amount = %payment.amount,
            "payment recorded"
        );
        Ok(payment)
    }

    /// Fetches a payment by row id. Rows of other tenants report `NotFound`.
    pub async fn get(&self, ctx: &TenantContext, id: PaymentId) -> Result<Payment> {
        self.scoped(ctx).get(id).await?.ok_or(LedgerError::NotFound)
    }

    /// Fetches a payment by its processor transaction id, the lookup key
    /// external callers hold. Same visibility rules as [`Self::get`].
    pub async fn find_by_transaction(
        &self,
        ctx: &TenantContext,
        transaction_id: TransactionId,
    ) -> Result<Payment> {
        self.scoped(ctx)
            .find_by_transaction(transaction_id)
            .await?
            .ok_or(LedgerError::NotFound)
    }

    /// All payments of the active tenant, oldest first.
    pub async fn list(&self, ctx: &TenantContext) -> Result<Vec<Payment>> {
        let mut rows = self.scoped(ctx).all().await?;
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(rows)
    }

    /// Transitions `Pending -> Completed`.
    pub async fn complete(&self, ctx: &TenantContext, id: PaymentId) -> Result<Payment> {
        self.transition(ctx, id, |payment| payment.complete()).await
    }

    /// Transitions `Pending -> Failed`, recording the error message.
    pub async fn fail(
        &self,
        ctx: &TenantContext,
        id: PaymentId,
        error_message: impl Into<String>,
    ) -> Result<Payment> {
        let error_message = error_message.into();
        self.transition(ctx, id, move |payment| payment.fail(error_message))
            .await
    }

    /// Transitions `Completed -> Refunded`. `None` or zero means a full
    /// refund of the original amount.
    pub async fn refund(
        &self,
        ctx: &TenantContext,
        id: PaymentId,
        amount: Option<Decimal>,
        reason: impl Into<String>,
    ) -> Result<Payment> {
        let reason = reason.into();
        self.transition(ctx, id, move |payment| payment.refund(amount, reason))
            .await
    }

    /// Refund keyed by transaction id instead of row id.
    pub async fn refund_by_transaction(
        &self,
        ctx: &TenantContext,
        transaction_id: TransactionId,
        amount: Option<Decimal>,
        reason: impl Into<String>,
    ) -> Result<Payment> {
        let payment = self.find_by_transaction(ctx, transaction_id).await?;
        self.refund(ctx, payment.id, amount, reason).await
    }

    /// Read-validate-write cycle shared by all transitions. The precondition
    /// check and the write commit or fail as one unit: the store rejects the
    /// write if the row moved underneath us.
    async fn transition<F>(&self, ctx: &TenantContext, id: PaymentId, apply: F) -> Result<Payment>
    where
        F: FnOnce(&mut Payment) -> Result<()>,
    {
        let scoped = self.scoped(ctx);
        let mut payment = scoped.get(id).await?.ok_or(LedgerError::NotFound)?;
        let expected_version = payment.version;
        let from = payment.status;
        apply(&mut payment)?;
        let updated = scoped.update(payment, expected_version).await?;
        tracing::debug!(
            payment_id = %updated.id,
            %from,
            to = %updated.status,
            "payment transitioned"
        );
        Ok(updated)
    }
}
