use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

use crate::error::{LedgerError, Result};

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Complete,
    Fail,
    Refund,
}

/// One row of an operations file.
///
/// `ref` is a file-local label: a `create` binds it, later operations use it
/// to address the created payment. `detail` carries the failure message or
/// refund reason; `amount` doubles as the refund amount on `refund` rows.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct OperationRecord {
    pub op: OperationKind,
    pub r#ref: String,
    pub tenant: String,
    pub reservation: Option<String>,
    pub user: Option<String>,
    pub amount: Option<Decimal>,
    pub currency: Option<String>,
    pub detail: Option<String>,
}

/// Reads ledger operations from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths,
/// yielding records lazily so large files stream without loading fully into
/// memory.
pub struct OperationReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OperationReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn operations(self) -> impl Iterator<Item = Result<OperationRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(LedgerError::from))
    }
}
