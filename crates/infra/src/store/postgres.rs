//! Postgres-backed store implementations.
//!
//! Uniqueness and optimistic concurrency are enforced at the database level:
//! the SKU carries a unique index (error code `23505` maps to
//! [`StoreError::DuplicateKey`]) and the conditional write compares the
//! version token in the `WHERE` clause, so a stale token updates zero rows
//! and surfaces as [`StoreError::Conflict`].
//!
//! The store traits are synchronous; like the rest of the adapter stack these
//! implementations bridge into async sqlx via the ambient tokio runtime
//! handle. Schema lives in `crates/infra/migrations/`.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Row};
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

use stockpile_core::{StockRecordId, UnitPrice, Version};
use stockpile_inventory::{
    AuditAction, AuditLogEntry, StockRecord, StockStatus, StockTransaction, TransactionType,
};

use super::r#trait::{AuditTrailStore, StockRecordStore, StoreError, TransactionLogStore};

/// Run an async store operation from a sync trait method.
///
/// Requires an ambient tokio runtime (the API binary provides one).
fn run_blocking<T>(fut: impl Future<Output = Result<T, StoreError>>) -> Result<T, StoreError> {
    let handle = tokio::runtime::Handle::try_current().map_err(|_| {
        StoreError::Unavailable(
            "Postgres stores require a tokio runtime context".to_string(),
        )
    })?;
    handle.block_on(fut)
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                // Unique violation (SKU index)
                Some("23505") => StoreError::DuplicateKey(msg),
                _ => StoreError::Unavailable(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            StoreError::Unavailable(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Unavailable(format!("sqlx error in {operation}: {other}")),
    }
}

fn status_to_str(status: StockStatus) -> &'static str {
    match status {
        StockStatus::Available => "AVAILABLE",
        StockStatus::LowStock => "LOW_STOCK",
        StockStatus::OutOfStock => "OUT_OF_STOCK",
        StockStatus::Discontinued => "DISCONTINUED",
    }
}

fn status_from_str(s: &str) -> Result<StockStatus, StoreError> {
    match s {
        "AVAILABLE" => Ok(StockStatus::Available),
        "LOW_STOCK" => Ok(StockStatus::LowStock),
        "OUT_OF_STOCK" => Ok(StockStatus::OutOfStock),
        "DISCONTINUED" => Ok(StockStatus::Discontinued),
        other => Err(StoreError::Serialization(format!("unknown stock status '{other}'"))),
    }
}

fn transaction_type_to_str(t: TransactionType) -> &'static str {
    match t {
        TransactionType::StockIn => "STOCK_IN",
        TransactionType::StockOut => "STOCK_OUT",
        TransactionType::Adjustment => "ADJUSTMENT",
        TransactionType::Transfer => "TRANSFER",
        TransactionType::Return => "RETURN",
        TransactionType::Damage => "DAMAGE",
    }
}

fn transaction_type_from_str(s: &str) -> Result<TransactionType, StoreError> {
    match s {
        "STOCK_IN" => Ok(TransactionType::StockIn),
        "STOCK_OUT" => Ok(TransactionType::StockOut),
        "ADJUSTMENT" => Ok(TransactionType::Adjustment),
        "TRANSFER" => Ok(TransactionType::Transfer),
        "RETURN" => Ok(TransactionType::Return),
        "DAMAGE" => Ok(TransactionType::Damage),
        other => Err(StoreError::Serialization(format!(
            "unknown transaction type '{other}'"
        ))),
    }
}

fn action_to_str(action: AuditAction) -> &'static str {
    match action {
        AuditAction::Create => "CREATE",
        AuditAction::Update => "UPDATE",
        AuditAction::Delete => "DELETE",
        AuditAction::StockAdjustment => "STOCK_ADJUSTMENT",
        AuditAction::DamagedGoods => "DAMAGED_GOODS",
    }
}

fn action_from_str(s: &str) -> Result<AuditAction, StoreError> {
    match s {
        "CREATE" => Ok(AuditAction::Create),
        "UPDATE" => Ok(AuditAction::Update),
        "DELETE" => Ok(AuditAction::Delete),
        "STOCK_ADJUSTMENT" => Ok(AuditAction::StockAdjustment),
        "DAMAGED_GOODS" => Ok(AuditAction::DamagedGoods),
        other => Err(StoreError::Serialization(format!("unknown audit action '{other}'"))),
    }
}

const RECORD_COLUMNS: &str = "id, sku, product_name, quantity, reorder_level, damaged_quantity, \
     unit_price_cents, location, status, created_at, updated_at, version";

#[derive(Debug)]
struct StockRecordRow {
    id: Uuid,
    sku: String,
    product_name: String,
    quantity: i64,
    reorder_level: i64,
    damaged_quantity: i64,
    unit_price_cents: Option<i64>,
    location: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for StockRecordRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StockRecordRow {
            id: row.try_get("id")?,
            sku: row.try_get("sku")?,
            product_name: row.try_get("product_name")?,
            quantity: row.try_get("quantity")?,
            reorder_level: row.try_get("reorder_level")?,
            damaged_quantity: row.try_get("damaged_quantity")?,
            unit_price_cents: row.try_get("unit_price_cents")?,
            location: row.try_get("location")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            version: row.try_get("version")?,
        })
    }
}

impl TryFrom<StockRecordRow> for StockRecord {
    type Error = StoreError;

    fn try_from(row: StockRecordRow) -> Result<Self, StoreError> {
        let unit_price = row
            .unit_price_cents
            .map(UnitPrice::from_cents)
            .transpose()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        Ok(StockRecord {
            id: StockRecordId::from_uuid(row.id),
            sku: row.sku,
            product_name: row.product_name,
            quantity: row.quantity,
            reorder_level: row.reorder_level,
            damaged_quantity: row.damaged_quantity,
            unit_price,
            location: row.location,
            status: status_from_str(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            version: Version::from_u64(row.version as u64),
        })
    }
}

/// Postgres-backed stock record store.
#[derive(Debug, Clone)]
pub struct PostgresStockRecordStore {
    pool: Arc<PgPool>,
}

impl PostgresStockRecordStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn fetch_where(
        &self,
        predicate: &str,
        operation: &str,
    ) -> Result<Vec<StockRecord>, StoreError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM product_stock WHERE {predicate}");
        let rows = sqlx::query(&sql)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        rows.into_iter()
            .map(|row| {
                StockRecordRow::from_row(&row)
                    .map_err(|e| StoreError::Serialization(e.to_string()))
                    .and_then(StockRecord::try_from)
            })
            .collect()
    }

    async fn get_async(&self, id: StockRecordId) -> Result<Option<StockRecord>, StoreError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM product_stock WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get", e))?;

        row.map(|row| {
            StockRecordRow::from_row(&row)
                .map_err(|e| StoreError::Serialization(e.to_string()))
                .and_then(StockRecord::try_from)
        })
        .transpose()
    }

    async fn insert_async(&self, record: StockRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO product_stock (
                id, sku, product_name, quantity, reorder_level, damaged_quantity,
                unit_price_cents, location, status, created_at, updated_at, version
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(&record.sku)
        .bind(&record.product_name)
        .bind(record.quantity)
        .bind(record.reorder_level)
        .bind(record.damaged_quantity)
        .bind(record.unit_price.map(UnitPrice::as_cents))
        .bind(&record.location)
        .bind(status_to_str(record.status))
        .bind(record.created_at)
        .bind(record.updated_at)
        .bind(record.version.as_u64() as i64)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert", e))?;

        Ok(())
    }

    async fn update_async(&self, record: StockRecord, expected: Version) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE product_stock SET
                sku = $2,
                product_name = $3,
                quantity = $4,
                reorder_level = $5,
                damaged_quantity = $6,
                unit_price_cents = $7,
                location = $8,
                status = $9,
                updated_at = $10,
                version = $11
            WHERE id = $1 AND version = $12
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(&record.sku)
        .bind(&record.product_name)
        .bind(record.quantity)
        .bind(record.reorder_level)
        .bind(record.damaged_quantity)
        .bind(record.unit_price.map(UnitPrice::as_cents))
        .bind(&record.location)
        .bind(status_to_str(record.status))
        .bind(record.updated_at)
        .bind(record.version.as_u64() as i64)
        .bind(expected.as_u64() as i64)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!(
                "no row with id {} at version {expected}",
                record.id
            )));
        }
        Ok(())
    }
}

impl StockRecordStore for PostgresStockRecordStore {
    fn get(&self, id: StockRecordId) -> Result<Option<StockRecord>, StoreError> {
        run_blocking(self.get_async(id))
    }

    fn get_by_sku(&self, sku: &str) -> Result<Option<StockRecord>, StoreError> {
        run_blocking(async {
            let sql = format!("SELECT {RECORD_COLUMNS} FROM product_stock WHERE sku = $1");
            let row = sqlx::query(&sql)
                .bind(sku)
                .fetch_optional(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("get_by_sku", e))?;

            row.map(|row| {
                StockRecordRow::from_row(&row)
                    .map_err(|e| StoreError::Serialization(e.to_string()))
                    .and_then(StockRecord::try_from)
            })
            .transpose()
        })
    }

    fn sku_exists(&self, sku: &str) -> Result<bool, StoreError> {
        run_blocking(async {
            let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM product_stock WHERE sku = $1) AS present")
                .bind(sku)
                .fetch_one(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("sku_exists", e))?;
            row.try_get("present")
                .map_err(|e| StoreError::Serialization(e.to_string()))
        })
    }

    fn insert(&self, record: StockRecord) -> Result<(), StoreError> {
        run_blocking(self.insert_async(record))
    }

    fn update(&self, record: StockRecord, expected: Version) -> Result<(), StoreError> {
        run_blocking(self.update_async(record, expected))
    }

    fn delete(&self, id: StockRecordId) -> Result<bool, StoreError> {
        run_blocking(async {
            let result = sqlx::query("DELETE FROM product_stock WHERE id = $1")
                .bind(id.as_uuid())
                .execute(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("delete", e))?;
            Ok(result.rows_affected() > 0)
        })
    }

    fn list_all(&self) -> Result<Vec<StockRecord>, StoreError> {
        run_blocking(self.fetch_where("TRUE", "list_all"))
    }

    fn list_low_stock(&self) -> Result<Vec<StockRecord>, StoreError> {
        run_blocking(self.fetch_where("quantity <= reorder_level", "list_low_stock"))
    }

    fn list_damaged(&self) -> Result<Vec<StockRecord>, StoreError> {
        run_blocking(self.fetch_where("damaged_quantity > 0", "list_damaged"))
    }

    fn list_by_status(&self, status: StockStatus) -> Result<Vec<StockRecord>, StoreError> {
        run_blocking(async {
            let sql = format!("SELECT {RECORD_COLUMNS} FROM product_stock WHERE status = $1");
            let rows = sqlx::query(&sql)
                .bind(status_to_str(status))
                .fetch_all(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("list_by_status", e))?;

            rows.into_iter()
                .map(|row| {
                    StockRecordRow::from_row(&row)
                        .map_err(|e| StoreError::Serialization(e.to_string()))
                        .and_then(StockRecord::try_from)
                })
                .collect()
        })
    }
}

const TRANSACTION_COLUMNS: &str = "id, product_stock_id, transaction_type, quantity, \
     quantity_before, quantity_after, reason, reference, transaction_date";

fn transaction_from_row(row: &sqlx::postgres::PgRow) -> Result<StockTransaction, StoreError> {
    let transaction_type: String = row
        .try_get("transaction_type")
        .map_err(|e| StoreError::Serialization(e.to_string()))?;

    Ok(StockTransaction {
        id: row
            .try_get::<Uuid, _>("id")
            .map_err(|e| StoreError::Serialization(e.to_string()))?
            .into(),
        product_stock_id: row
            .try_get::<Uuid, _>("product_stock_id")
            .map_err(|e| StoreError::Serialization(e.to_string()))?
            .into(),
        transaction_type: transaction_type_from_str(&transaction_type)?,
        quantity: row
            .try_get("quantity")
            .map_err(|e| StoreError::Serialization(e.to_string()))?,
        quantity_before: row
            .try_get("quantity_before")
            .map_err(|e| StoreError::Serialization(e.to_string()))?,
        quantity_after: row
            .try_get("quantity_after")
            .map_err(|e| StoreError::Serialization(e.to_string()))?,
        reason: row
            .try_get("reason")
            .map_err(|e| StoreError::Serialization(e.to_string()))?,
        reference: row
            .try_get("reference")
            .map_err(|e| StoreError::Serialization(e.to_string()))?,
        transaction_date: row
            .try_get("transaction_date")
            .map_err(|e| StoreError::Serialization(e.to_string()))?,
    })
}

/// Postgres-backed append-only transaction log.
///
/// `product_stock_id` is intentionally not a foreign key: rows outlive the
/// record they reference (retention policy, not an oversight).
#[derive(Debug, Clone)]
pub struct PostgresTransactionLog {
    pool: Arc<PgPool>,
}

impl PostgresTransactionLog {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

impl TransactionLogStore for PostgresTransactionLog {
    fn append(&self, transaction: StockTransaction) -> Result<(), StoreError> {
        run_blocking(async {
            sqlx::query(
                r#"
                INSERT INTO stock_transaction (
                    id, product_stock_id, transaction_type, quantity,
                    quantity_before, quantity_after, reason, reference, transaction_date
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(transaction.id.as_uuid())
            .bind(transaction.product_stock_id.as_uuid())
            .bind(transaction_type_to_str(transaction.transaction_type))
            .bind(transaction.quantity)
            .bind(transaction.quantity_before)
            .bind(transaction.quantity_after)
            .bind(&transaction.reason)
            .bind(&transaction.reference)
            .bind(transaction.transaction_date)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("append_transaction", e))?;
            Ok(())
        })
    }

    fn for_product(&self, id: StockRecordId) -> Result<Vec<StockTransaction>, StoreError> {
        run_blocking(async {
            let sql = format!(
                "SELECT {TRANSACTION_COLUMNS} FROM stock_transaction \
                 WHERE product_stock_id = $1 ORDER BY transaction_date DESC, id DESC"
            );
            let rows = sqlx::query(&sql)
                .bind(id.as_uuid())
                .fetch_all(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("transactions_for_product", e))?;
            rows.iter().map(transaction_from_row).collect()
        })
    }

    fn by_type(&self, transaction_type: TransactionType) -> Result<Vec<StockTransaction>, StoreError> {
        run_blocking(async {
            let sql = format!(
                "SELECT {TRANSACTION_COLUMNS} FROM stock_transaction \
                 WHERE transaction_type = $1 ORDER BY transaction_date DESC, id DESC"
            );
            let rows = sqlx::query(&sql)
                .bind(transaction_type_to_str(transaction_type))
                .fetch_all(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("transactions_by_type", e))?;
            rows.iter().map(transaction_from_row).collect()
        })
    }

    fn between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StockTransaction>, StoreError> {
        run_blocking(async {
            let sql = format!(
                "SELECT {TRANSACTION_COLUMNS} FROM stock_transaction \
                 WHERE transaction_date BETWEEN $1 AND $2 ORDER BY transaction_date DESC, id DESC"
            );
            let rows = sqlx::query(&sql)
                .bind(start)
                .bind(end)
                .fetch_all(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("transactions_between", e))?;
            rows.iter().map(transaction_from_row).collect()
        })
    }
}

const AUDIT_COLUMNS: &str =
    "id, entity_type, entity_id, action, old_value, new_value, performed_by, timestamp, source_address";

fn audit_from_row(row: &sqlx::postgres::PgRow) -> Result<AuditLogEntry, StoreError> {
    let action: String = row
        .try_get("action")
        .map_err(|e| StoreError::Serialization(e.to_string()))?;

    Ok(AuditLogEntry {
        id: row
            .try_get::<Uuid, _>("id")
            .map_err(|e| StoreError::Serialization(e.to_string()))?
            .into(),
        entity_type: row
            .try_get("entity_type")
            .map_err(|e| StoreError::Serialization(e.to_string()))?,
        entity_id: row
            .try_get("entity_id")
            .map_err(|e| StoreError::Serialization(e.to_string()))?,
        action: action_from_str(&action)?,
        old_value: row
            .try_get("old_value")
            .map_err(|e| StoreError::Serialization(e.to_string()))?,
        new_value: row
            .try_get("new_value")
            .map_err(|e| StoreError::Serialization(e.to_string()))?,
        performed_by: row
            .try_get("performed_by")
            .map_err(|e| StoreError::Serialization(e.to_string()))?,
        timestamp: row
            .try_get("timestamp")
            .map_err(|e| StoreError::Serialization(e.to_string()))?,
        source_address: row
            .try_get("source_address")
            .map_err(|e| StoreError::Serialization(e.to_string()))?,
    })
}

/// Postgres-backed append-only audit trail.
#[derive(Debug, Clone)]
pub struct PostgresAuditTrail {
    pool: Arc<PgPool>,
}

impl PostgresAuditTrail {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

impl AuditTrailStore for PostgresAuditTrail {
    fn append(&self, entry: AuditLogEntry) -> Result<(), StoreError> {
        run_blocking(async {
            sqlx::query(
                r#"
                INSERT INTO audit_log (
                    id, entity_type, entity_id, action, old_value, new_value,
                    performed_by, timestamp, source_address
                )
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                "#,
            )
            .bind(entry.id.as_uuid())
            .bind(&entry.entity_type)
            .bind(entry.entity_id)
            .bind(action_to_str(entry.action))
            .bind(&entry.old_value)
            .bind(&entry.new_value)
            .bind(&entry.performed_by)
            .bind(entry.timestamp)
            .bind(&entry.source_address)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("append_audit", e))?;
            Ok(())
        })
    }

    fn for_entity(&self, entity_type: &str, entity_id: Uuid) -> Result<Vec<AuditLogEntry>, StoreError> {
        run_blocking(async {
            let sql = format!(
                "SELECT {AUDIT_COLUMNS} FROM audit_log \
                 WHERE entity_type = $1 AND entity_id = $2 ORDER BY timestamp ASC, id ASC"
            );
            let rows = sqlx::query(&sql)
                .bind(entity_type)
                .bind(entity_id)
                .fetch_all(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("audit_for_entity", e))?;
            rows.iter().map(audit_from_row).collect()
        })
    }

    fn by_action(&self, action: AuditAction) -> Result<Vec<AuditLogEntry>, StoreError> {
        run_blocking(async {
            let sql = format!(
                "SELECT {AUDIT_COLUMNS} FROM audit_log WHERE action = $1 ORDER BY timestamp ASC, id ASC"
            );
            let rows = sqlx::query(&sql)
                .bind(action_to_str(action))
                .fetch_all(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("audit_by_action", e))?;
            rows.iter().map(audit_from_row).collect()
        })
    }

    fn between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AuditLogEntry>, StoreError> {
        run_blocking(async {
            let sql = format!(
                "SELECT {AUDIT_COLUMNS} FROM audit_log \
                 WHERE timestamp BETWEEN $1 AND $2 ORDER BY timestamp ASC, id ASC"
            );
            let rows = sqlx::query(&sql)
                .bind(start)
                .bind(end)
                .fetch_all(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("audit_between", e))?;
            rows.iter().map(audit_from_row).collect()
        })
    }

    fn list_all(&self) -> Result<Vec<AuditLogEntry>, StoreError> {
        run_blocking(async {
            let sql =
                format!("SELECT {AUDIT_COLUMNS} FROM audit_log ORDER BY timestamp ASC, id ASC");
            let rows = sqlx::query(&sql)
                .fetch_all(&*self.pool)
                .await
                .map_err(|e| map_sqlx_error("audit_list_all", e))?;
            rows.iter().map(audit_from_row).collect()
        })
    }
}
