use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::{LedgerError, Result};
use crate::domain::tenant::TenantId;

/// Maximum length of a stored refund reason.
const MAX_REFUND_REASON_LEN: usize = 500;

macro_rules! uuid_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new(id: Uuid) -> Self {
                Self(id)
            }

            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn parse(raw: &str) -> Option<Self> {
                Uuid::parse_str(raw.trim()).ok().map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

uuid_id!(
    /// Primary key of a payment row. System-generated, immutable.
    PaymentId
);
uuid_id!(
    /// Ledger-wide unique correlation key for external payment processors.
    /// System-generated, immutable once set.
    TransactionId
);
uuid_id!(
    /// Opaque reference to a reservation owned by another service.
    ReservationId
);
uuid_id!(
    /// Opaque reference to a user owned by another service.
    UserId
);

/// A positive monetary amount.
///
/// Wraps `rust_decimal::Decimal` so that non-positive values cannot enter the
/// ledger in the first place.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(LedgerError::InvalidAmount(value))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = LedgerError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A 3-letter ISO currency code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency(String);

impl Currency {
    pub const EUR: &'static str = "EUR";

    /// Accepts exactly three ASCII letters, normalized to upper case.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.len() == 3 && raw.chars().all(|c| c.is_ascii_alphabetic()) {
            Some(Self(raw.to_ascii_uppercase()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for Currency {
    fn default() -> Self {
        Self(Self::EUR.to_string())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle states of a payment.
///
/// `Pending` is the initial state, `Failed` and `Refunded` are terminal.
/// `Completed` is not terminal because a completed payment may still be
/// refunded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Failed | PaymentStatus::Refunded)
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
            PaymentStatus::Refunded => "REFUNDED",
        };
        f.write_str(s)
    }
}

/// Refund bookkeeping, present only on refunded payments. Grouping the four
/// fields in one optional struct keeps half-populated refunds unrepresentable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Refund {
    pub refund_id: Uuid,
    pub amount: Amount,
    pub reason: String,
    pub refunded_at: DateTime<Utc>,
}

/// Caller-supplied fields for recording a new payment. The upstream request
/// layer has already authenticated the caller; the ledger still re-validates
/// the amount and the tenant targeting.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub reservation_id: ReservationId,
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub amount: Decimal,
    pub currency: Option<Currency>,
}

/// One row of the ledger.
///
/// Rows are created in `Pending` and mutated only through the transition
/// methods below; they are never physically deleted. `updated_at` and
/// `version` belong to the store and are refreshed on every persisted
/// mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub reservation_id: ReservationId,
    pub user_id: UserId,
    pub tenant_id: TenantId,
    pub amount: Amount,
    pub currency: Currency,
    pub status: PaymentStatus,
    pub transaction_id: TransactionId,
    pub error_message: Option<String>,
    pub refund: Option<Refund>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency counter, bumped by the store on every write.
    pub version: u64,
}

impl Payment {
    /// Builds a fresh `Pending` row from a validated request, generating the
    /// primary key and the processor correlation key.
    pub fn record(request: PaymentRequest, default_currency: Currency) -> Result<Self> {
        let amount = Amount::new(request.amount)?;
        let now = Utc::now();
        Ok(Self {
            id: PaymentId::generate(),
            reservation_id: request.reservation_id,
            user_id: request.user_id,
            tenant_id: request.tenant_id,
            amount,
            currency: request.currency.unwrap_or(default_currency),
            status: PaymentStatus::Pending,
            transaction_id: TransactionId::generate(),
            error_message: None,
            refund: None,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    fn illegal(&self, to: PaymentStatus) -> LedgerError {
        LedgerError::IllegalTransition {
            from: self.status,
            to,
        }
    }

    /// `Pending -> Completed`.
    pub fn complete(&mut self) -> Result<()> {
        match self.status {
            PaymentStatus::Pending => {
                self.status = PaymentStatus::Completed;
                Ok(())
            }
            _ => Err(self.illegal(PaymentStatus::Completed)),
        }
    }

    /// `Pending -> Failed`, recording the processor error. A failure without
    /// an error message is rejected.
    pub fn fail(&mut self, error_message: impl Into<String>) -> Result<()> {
        match self.status {
            PaymentStatus::Pending => {
                let error_message = error_message.into();
                if error_message.trim().is_empty() {
                    return Err(LedgerError::InvalidOperation(
                        "a failed payment requires an error message".into(),
                    ));
                }
                self.status = PaymentStatus::Failed;
                self.error_message = Some(error_message);
                Ok(())
            }
            _ => Err(self.illegal(PaymentStatus::Failed)),
        }
    }

    /// `Completed -> Refunded`.
    ///
    /// A missing or zero amount means a full refund of the original amount;
    /// anything above the original amount is rejected.
    pub fn refund(&mut self, amount: Option<Decimal>, reason: impl Into<String>) -> Result<()> {
        if self.status != PaymentStatus::Completed {
            return Err(self.illegal(PaymentStatus::Refunded));
        }
        let requested = match amount {
            None => self.amount,
            Some(value) if value == Decimal::ZERO => self.amount,
            Some(value) => Amount::new(value)?,
        };
        if requested > self.amount {
            return Err(LedgerError::InvalidAmount(requested.value()));
        }
        let mut reason = reason.into();
        if reason.chars().count() > MAX_REFUND_REASON_LEN {
            reason = reason.chars().take(MAX_REFUND_REASON_LEN).collect();
        }
        self.status = PaymentStatus::Refunded;
        self.refund = Some(Refund {
            refund_id: Uuid::new_v4(),
            amount: requested,
            reason,
            refunded_at: Utc::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn request(amount: Decimal) -> PaymentRequest {
        PaymentRequest {
            reservation_id: ReservationId::generate(),
            user_id: UserId::generate(),
            tenant_id: TenantId::new(Uuid::new_v4()),
            amount,
            currency: None,
        }
    }

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(1.0)).is_ok());
        assert!(matches!(
            Amount::new(dec!(0.0)),
            Err(LedgerError::InvalidAmount(_))
        ));
        assert!(matches!(
            Amount::new(dec!(-1.0)),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!(Currency::parse("eur").unwrap().as_str(), "EUR");
        assert_eq!(Currency::parse(" USD ").unwrap().as_str(), "USD");
        assert!(Currency::parse("EURO").is_none());
        assert!(Currency::parse("E1R").is_none());
        assert!(Currency::parse("").is_none());
    }

    #[test]
    fn test_record_defaults() {
        let payment = Payment::record(request(dec!(50.0)), Currency::default()).unwrap();
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(payment.currency.as_str(), "EUR");
        assert_eq!(payment.amount.value(), dec!(50.0));
        assert!(payment.refund.is_none());
        assert!(payment.error_message.is_none());
        assert_eq!(payment.created_at, payment.updated_at);
    }

    #[test]
    fn test_record_rejects_non_positive_amount() {
        assert!(matches!(
            Payment::record(request(dec!(0.0)), Currency::default()),
            Err(LedgerError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_complete_then_refund_full() {
        let mut payment = Payment::record(request(dec!(50.0)), Currency::default()).unwrap();
        payment.complete().unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);

        payment.refund(None, "customer request").unwrap();
        assert_eq!(payment.status, PaymentStatus::Refunded);
        let refund = payment.refund.as_ref().unwrap();
        assert_eq!(refund.amount.value(), dec!(50.0));
        assert_eq!(refund.reason, "customer request");
    }

    #[test]
    fn test_refund_zero_means_full() {
        let mut payment = Payment::record(request(dec!(25.0)), Currency::default()).unwrap();
        payment.complete().unwrap();
        payment.refund(Some(dec!(0.0)), "").unwrap();
        assert_eq!(
            payment.refund.as_ref().unwrap().amount.value(),
            dec!(25.0)
        );
    }

    #[test]
    fn test_partial_refund() {
        let mut payment = Payment::record(request(dec!(50.0)), Currency::default()).unwrap();
        payment.complete().unwrap();
        payment.refund(Some(dec!(20.0)), "partial").unwrap();
        assert_eq!(
            payment.refund.as_ref().unwrap().amount.value(),
            dec!(20.0)
        );
    }

    #[test]
    fn test_refund_exceeding_amount_rejected() {
        let mut payment = Payment::record(request(dec!(50.0)), Currency::default()).unwrap();
        payment.complete().unwrap();
        let result = payment.refund(Some(dec!(60.0)), "too much");
        assert!(matches!(result, Err(LedgerError::InvalidAmount(_))));
        // Row unchanged on rejection
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert!(payment.refund.is_none());
    }

    #[test]
    fn test_fail_records_message() {
        let mut payment = Payment::record(request(dec!(10.0)), Currency::default()).unwrap();
        payment.fail("processor declined").unwrap();
        assert_eq!(payment.status, PaymentStatus::Failed);
        assert_eq!(payment.error_message.as_deref(), Some("processor declined"));
    }

    #[test]
    fn test_fail_rejects_blank_message() {
        let mut payment = Payment::record(request(dec!(10.0)), Currency::default()).unwrap();
        assert!(matches!(
            payment.fail(""),
            Err(LedgerError::InvalidOperation(_))
        ));
        assert!(matches!(
            payment.fail("   "),
            Err(LedgerError::InvalidOperation(_))
        ));
        // Row unchanged on rejection
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert!(payment.error_message.is_none());
    }

    #[test]
    fn test_illegal_edges() {
        let mut payment = Payment::record(request(dec!(10.0)), Currency::default()).unwrap();

        // Pending -> Refunded is not an edge
        assert!(matches!(
            payment.refund(None, ""),
            Err(LedgerError::IllegalTransition {
                from: PaymentStatus::Pending,
                to: PaymentStatus::Refunded,
            })
        ));

        payment.fail("declined").unwrap();
        assert!(matches!(
            payment.complete(),
            Err(LedgerError::IllegalTransition {
                from: PaymentStatus::Failed,
                to: PaymentStatus::Completed,
            })
        ));
        assert!(matches!(
            payment.refund(None, ""),
            Err(LedgerError::IllegalTransition {
                from: PaymentStatus::Failed,
                to: PaymentStatus::Refunded,
            })
        ));
    }

    #[test]
    fn test_refunded_is_terminal() {
        let mut payment = Payment::record(request(dec!(10.0)), Currency::default()).unwrap();
        payment.complete().unwrap();
        payment.refund(None, "dup").unwrap();
        assert!(payment.status.is_terminal());
        assert!(matches!(
            payment.complete(),
            Err(LedgerError::IllegalTransition { .. })
        ));
        assert!(matches!(
            payment.refund(None, "again"),
            Err(LedgerError::IllegalTransition { .. })
        ));
    }

    #[test]
    fn test_refund_reason_capped() {
        let mut payment = Payment::record(request(dec!(10.0)), Currency::default()).unwrap();
        payment.complete().unwrap();
        payment.refund(None, "x".repeat(600)).unwrap();
        assert_eq!(payment.refund.as_ref().unwrap().reason.len(), 500);
    }
}
