use rust_decimal::Decimal;
use thiserror::Error;

use crate::domain::payment::{PaymentId, PaymentStatus, TransactionId};
use crate::domain::tenant::TenantId;

/// Errors surfaced by ledger operations.
///
/// `ConcurrentModification` is safe to retry after re-reading the row; the
/// remaining variants require corrected input. `NotFound` covers both rows
/// that do not exist and rows owned by another tenant, so callers cannot
/// distinguish the two.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("no tenant context established for this operation")]
    UnauthorizedContext,
    #[error("payment targets tenant {actual} but the active context is {expected}")]
    TenantMismatch { expected: TenantId, actual: TenantId },
    #[error("amount must be positive, got {0}")]
    InvalidAmount(Decimal),
    #[error("illegal status transition {from} -> {to}")]
    IllegalTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },
    #[error("payment {0} was modified concurrently")]
    ConcurrentModification(PaymentId),
    #[error("payment not found")]
    NotFound,
    #[error("transaction id {0} already recorded in the ledger")]
    DuplicateTransaction(TransactionId),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    /// Whether the caller may retry the same operation after re-reading state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::ConcurrentModification(_))
    }
}

pub type Result<T> = std::result::Result<T, LedgerError>;
