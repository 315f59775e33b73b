use clap::Parser;
use miette::{IntoDiagnostic, Result, miette};
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tenant_ledger::application::ledger::{LedgerConfig, PaymentLedger};
use tenant_ledger::domain::payment::{
    Currency, PaymentId, PaymentRequest, ReservationId, UserId,
};
use tenant_ledger::domain::ports::PaymentStoreBox;
use tenant_ledger::domain::tenant::TenantContext;
use tenant_ledger::error::LedgerError;
use tenant_ledger::infrastructure::in_memory::InMemoryPaymentStore;
use tenant_ledger::interfaces::csv::ledger_writer::LedgerWriter;
use tenant_ledger::interfaces::csv::operation_reader::{
    OperationKind, OperationRecord, OperationReader,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input operations CSV file
    input: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the resulting ledger rows.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tenant_ledger=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let store: PaymentStoreBox = match cli.db_path {
        Some(db_path) => open_persistent_store(db_path)?,
        None => Box::new(InMemoryPaymentStore::new()),
    };

    let mut config = LedgerConfig::default();
    if let Ok(raw) = std::env::var("LEDGER_DEFAULT_CURRENCY") {
        config.default_currency =
            Currency::parse(&raw).ok_or_else(|| miette!("invalid LEDGER_DEFAULT_CURRENCY: {raw}"))?;
    }
    let ledger = PaymentLedger::with_config(store, config);

    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = OperationReader::new(file);

    // File-local payment labels and the tenants seen in the file.
    let mut refs: HashMap<String, PaymentId> = HashMap::new();
    let mut tenants: Vec<String> = Vec::new();

    for record in reader.operations() {
        match record {
            Ok(record) => {
                if !tenants.contains(&record.tenant) {
                    tenants.push(record.tenant.clone());
                }
                if let Err(e) = apply_operation(&ledger, &mut refs, record).await {
                    tracing::warn!(error = %e, "skipping operation");
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable row");
            }
        }
    }

    // Rows come out sorted by tenant, then creation order within a tenant.
    tenants.sort();
    let stdout = io::stdout();
    let mut writer = LedgerWriter::new(stdout.lock());
    for raw_tenant in tenants {
        let Ok(ctx) = TenantContext::establish(&raw_tenant) else {
            continue;
        };
        let rows = ledger.list(&ctx).await.into_diagnostic()?;
        writer.write_payments(&rows).into_diagnostic()?;
    }

    Ok(())
}

#[cfg(feature = "storage-rocksdb")]
fn open_persistent_store(db_path: PathBuf) -> Result<PaymentStoreBox> {
    use tenant_ledger::infrastructure::rocksdb::RocksDbPaymentStore;
    let store = RocksDbPaymentStore::open(db_path).into_diagnostic()?;
    Ok(Box::new(store))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn open_persistent_store(_db_path: PathBuf) -> Result<PaymentStoreBox> {
    Err(miette!(
        "--db-path requires building with the storage-rocksdb feature"
    ))
}

/// Replays one operation against the ledger, binding `create` labels for
/// later rows.
async fn apply_operation(
    ledger: &PaymentLedger,
    refs: &mut HashMap<String, PaymentId>,
    record: OperationRecord,
) -> tenant_ledger::error::Result<()> {
    let ctx = TenantContext::establish(&record.tenant)?;
    match record.op {
        OperationKind::Create => {
            let reservation_id = record
                .reservation
                .as_deref()
                .and_then(ReservationId::parse)
                .ok_or_else(|| missing(&record.r#ref, "reservation"))?;
            let user_id = record
                .user
                .as_deref()
                .and_then(UserId::parse)
                .ok_or_else(|| missing(&record.r#ref, "user"))?;
            let amount = record
                .amount
                .ok_or_else(|| missing(&record.r#ref, "amount"))?;
            let currency = match record.currency.as_deref() {
                None => None,
                Some(raw) => Some(
                    Currency::parse(raw)
                        .ok_or_else(|| {
                            LedgerError::InvalidOperation(format!("invalid currency {raw}"))
                        })?,
                ),
            };
            let payment = ledger
                .create(
                    &ctx,
                    PaymentRequest {
                        reservation_id,
                        user_id,
                        tenant_id: ctx.require()?,
                        amount,
                        currency,
                    },
                )
                .await?;
            refs.insert(record.r#ref, payment.id);
        }
        OperationKind::Complete => {
            let id = lookup(refs, &record.r#ref)?;
            ledger.complete(&ctx, id).await?;
        }
        OperationKind::Fail => {
            let id = lookup(refs, &record.r#ref)?;
            let message = record
                .detail
                .filter(|d| !d.is_empty())
                .ok_or_else(|| missing(&record.r#ref, "detail"))?;
            ledger.fail(&ctx, id, message).await?;
        }
        OperationKind::Refund => {
            let id = lookup(refs, &record.r#ref)?;
            ledger
                .refund(&ctx, id, record.amount, record.detail.unwrap_or_default())
                .await?;
        }
    }
    Ok(())
}

fn lookup(refs: &HashMap<String, PaymentId>, label: &str) -> tenant_ledger::error::Result<PaymentId> {
    refs.get(label)
        .copied()
        .ok_or_else(|| LedgerError::InvalidOperation(format!("unknown payment ref {label}")))
}

fn missing(label: &str, field: &str) -> LedgerError {
    LedgerError::InvalidOperation(format!("row {label} is missing {field}"))
}
