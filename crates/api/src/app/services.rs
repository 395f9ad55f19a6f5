use std::sync::Arc;

use stockpile_core::{LedgerError, LedgerResult};
use stockpile_infra::store::{AuditTrailStore, StockRecordStore, TransactionLogStore};
use stockpile_infra::store::{InMemoryAuditTrail, InMemoryStockRecordStore, InMemoryTransactionLog};
use stockpile_infra::StockLedger;

#[cfg(feature = "postgres")]
use stockpile_infra::store::{PostgresAuditTrail, PostgresStockRecordStore, PostgresTransactionLog};

/// Type-erased ledger: routes don't care which backend is wired in.
pub type LedgerHandle = StockLedger<
    Arc<dyn StockRecordStore>,
    Arc<dyn TransactionLogStore>,
    Arc<dyn AuditTrailStore>,
>;

pub struct AppServices {
    ledger: LedgerHandle,
}

impl AppServices {
    /// In-memory backend (dev/tests).
    pub fn in_memory() -> Self {
        Self {
            ledger: StockLedger::new(
                Arc::new(InMemoryStockRecordStore::new()) as Arc<dyn StockRecordStore>,
                Arc::new(InMemoryTransactionLog::new()) as Arc<dyn TransactionLogStore>,
                Arc::new(InMemoryAuditTrail::new()) as Arc<dyn AuditTrailStore>,
            ),
        }
    }

    /// Postgres backend; all three stores share one pool.
    #[cfg(feature = "postgres")]
    pub fn postgres(pool: sqlx::PgPool) -> Self {
        let pool = Arc::new(pool);
        Self {
            ledger: StockLedger::new(
                Arc::new(PostgresStockRecordStore::new(pool.clone())) as Arc<dyn StockRecordStore>,
                Arc::new(PostgresTransactionLog::new(pool.clone())) as Arc<dyn TransactionLogStore>,
                Arc::new(PostgresAuditTrail::new(pool)) as Arc<dyn AuditTrailStore>,
            ),
        }
    }

    pub fn ledger(&self) -> &LedgerHandle {
        &self.ledger
    }

    /// Run a ledger call off the async workers.
    ///
    /// Engine calls are synchronous; the Postgres stores bridge into sqlx via
    /// the runtime handle, which must not happen on an async worker thread.
    pub async fn with_ledger<F, T>(self: &Arc<Self>, f: F) -> LedgerResult<T>
    where
        F: FnOnce(&LedgerHandle) -> LedgerResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let services = self.clone();
        tokio::task::spawn_blocking(move || f(services.ledger()))
            .await
            .map_err(|e| LedgerError::storage(format!("ledger task failed: {e}")))?
    }
}

/// Build the service graph for the process.
///
/// Defaults to the in-memory backend; with the `postgres` feature enabled and
/// `DATABASE_URL` set, wires the Postgres stores instead.
pub async fn build_services() -> AppServices {
    #[cfg(feature = "postgres")]
    if let Ok(url) = std::env::var("DATABASE_URL") {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(16)
            .connect(&url)
            .await
            .expect("failed to connect to DATABASE_URL");
        tracing::info!("using postgres-backed stores");
        return AppServices::postgres(pool);
    }

    AppServices::in_memory()
}
