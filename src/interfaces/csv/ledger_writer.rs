use rust_decimal::Decimal;
use serde::Serialize;
use std::io::Write;

use crate::domain::payment::Payment;
use crate::error::Result;

/// The caller-stable projection of a ledger row: generated ids are omitted so
/// the output of a replay is deterministic.
#[derive(Debug, Serialize, PartialEq)]
pub struct LedgerRow {
    pub tenant: String,
    pub reservation: String,
    pub user: String,
    pub amount: Decimal,
    pub currency: String,
    pub status: String,
    pub refund_amount: Option<Decimal>,
}

impl From<&Payment> for LedgerRow {
    fn from(payment: &Payment) -> Self {
        Self {
            tenant: payment.tenant_id.to_string(),
            reservation: payment.reservation_id.to_string(),
            user: payment.user_id.to_string(),
            amount: payment.amount.value(),
            currency: payment.currency.as_str().to_string(),
            status: payment.status.to_string(),
            refund_amount: payment.refund.as_ref().map(|r| r.amount.value()),
        }
    }
}

/// Writes the final visible rows as CSV.
pub struct LedgerWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> LedgerWriter<W> {
    pub fn new(destination: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(destination),
        }
    }

    pub fn write_payments<'a>(
        &mut self,
        payments: impl IntoIterator<Item = &'a Payment>,
    ) -> Result<()> {
        for payment in payments {
            self.writer.serialize(LedgerRow::from(payment))?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
