use async_trait::async_trait;
use chrono::{Duration, Utc};
use rocksdb::{ColumnFamilyDescriptor, DB, Options, WriteBatch};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::domain::payment::{Payment, PaymentId, TransactionId};
use crate::domain::ports::PaymentStore;
use crate::error::{LedgerError, Result};

/// Column family for payment rows, keyed by payment id.
pub const CF_PAYMENTS: &str = "payments";
/// Column family mapping transaction id -> payment id, backing the
/// ledger-wide uniqueness of transaction ids.
pub const CF_TX_INDEX: &str = "tx_index";

impl From<rocksdb::Error> for LedgerError {
    fn from(e: rocksdb::Error) -> Self {
        LedgerError::Storage(e.to_string())
    }
}

/// A persistent payment store backed by RocksDB.
///
/// Rows and the transaction-id index live in separate column families and are
/// written in one `WriteBatch`. RocksDB has no native compare-and-set, so a
/// mutation mutex serializes the read-compare-write step of `insert` and
/// `update`; reads stay lock-free. The mutex is never held across an await
/// point.
///
/// `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDbPaymentStore {
    db: Arc<DB>,
    mutation_lock: Arc<Mutex<()>>,
}

impl RocksDbPaymentStore {
    /// Opens or creates a database at `path`, ensuring both column families
    /// exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_payments = ColumnFamilyDescriptor::new(CF_PAYMENTS, Options::default());
        let cf_tx_index = ColumnFamilyDescriptor::new(CF_TX_INDEX, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_payments, cf_tx_index])?;
        Ok(Self {
            db: Arc::new(db),
            mutation_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| LedgerError::Storage(format!("column family {name} not found")))
    }

    fn encode(payment: &Payment) -> Result<Vec<u8>> {
        serde_json::to_vec(payment)
            .map_err(|e| LedgerError::Storage(format!("failed to serialize payment: {e}")))
    }

    fn decode(bytes: &[u8]) -> Result<Payment> {
        serde_json::from_slice(bytes)
            .map_err(|e| LedgerError::Storage(format!("failed to deserialize payment: {e}")))
    }

    fn read_row(&self, id: PaymentId) -> Result<Option<Payment>> {
        let cf = self.cf(CF_PAYMENTS)?;
        match self.db.get_cf(cf, id.to_string().as_bytes())? {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl PaymentStore for RocksDbPaymentStore {
    async fn insert(&self, payment: Payment) -> Result<()> {
        let cf_payments = self.cf(CF_PAYMENTS)?;
        let cf_tx_index = self.cf(CF_TX_INDEX)?;
        let guard = self
            .mutation_lock
            .lock()
            .map_err(|_| LedgerError::Storage("mutation lock poisoned".into()))?;

        let tx_key = payment.transaction_id.to_string();
        if self.db.get_pinned_cf(cf_tx_index, tx_key.as_bytes())?.is_some() {
            return Err(LedgerError::DuplicateTransaction(payment.transaction_id));
        }

        let row_key = payment.id.to_string();
        let mut batch = WriteBatch::default();
        batch.put_cf(cf_payments, row_key.as_bytes(), Self::encode(&payment)?);
        batch.put_cf(cf_tx_index, tx_key.as_bytes(), row_key.as_bytes());
        self.db.write(batch)?;

        drop(guard);
        Ok(())
    }

    async fn get(&self, id: PaymentId) -> Result<Option<Payment>> {
        self.read_row(id)
    }

    async fn find_by_transaction(&self, transaction_id: TransactionId) -> Result<Option<Payment>> {
        let cf = self.cf(CF_TX_INDEX)?;
        let row_key = match self.db.get_cf(cf, transaction_id.to_string().as_bytes())? {
            Some(bytes) => bytes,
            None => return Ok(None),
        };
        let id = std::str::from_utf8(&row_key)
            .ok()
            .and_then(PaymentId::parse)
            .ok_or_else(|| LedgerError::Storage("corrupt transaction index entry".into()))?;
        self.read_row(id)
    }

    async fn all(&self) -> Result<Vec<Payment>> {
        let cf = self.cf(CF_PAYMENTS)?;
        let mut rows = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            rows.push(Self::decode(&value)?);
        }
        Ok(rows)
    }

    async fn update(&self, mut payment: Payment, expected_version: u64) -> Result<Payment> {
        let cf = self.cf(CF_PAYMENTS)?;
        let guard = self
            .mutation_lock
            .lock()
            .map_err(|_| LedgerError::Storage("mutation lock poisoned".into()))?;

        let current = self.read_row(payment.id)?.ok_or(LedgerError::NotFound)?;
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

        let mut now = Utc::now();
        if now <= current.updated_at {
            now = current.updated_at + Duration::nanoseconds(1);
        }
        payment.updated_at = now;
        payment.version = expected_version + 1;
        self.db
            .put_cf(cf, payment.id.to_string().as_bytes(), Self::encode(&payment)?)?;

        drop(guard);
        Ok(payment)
    }
}
