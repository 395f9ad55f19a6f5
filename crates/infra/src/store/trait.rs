use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use std::sync::Arc;

use stockpile_core::{StockRecordId, Version};
use stockpile_inventory::{AuditAction, AuditLogEntry, StockRecord, StockStatus, StockTransaction, TransactionType};

/// Store operation error.
///
/// These are **infrastructure errors** (concurrency, key collisions, IO), as
/// opposed to the business failures in `stockpile_core::LedgerError`. The
/// engine maps them into the public taxonomy.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Conditional write rejected: the stored version token did not match the
    /// token the caller supplied. Retry the whole read-modify-write.
    #[error("version conflict: {0}")]
    Conflict(String),

    /// Unique-key violation (SKU collision on insert).
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// A persisted row could not be encoded/decoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The backing store is unavailable or an IO error occurred.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Keyed storage for current stock records.
///
/// Mutations are compare-and-swap style: `update` succeeds only if the stored
/// version token equals `expected`; otherwise it fails with
/// [`StoreError::Conflict`] and the caller must retry from a fresh read. This
/// is the only isolation mechanism the ledger relies on.
pub trait StockRecordStore: Send + Sync {
    fn get(&self, id: StockRecordId) -> Result<Option<StockRecord>, StoreError>;

    fn get_by_sku(&self, sku: &str) -> Result<Option<StockRecord>, StoreError>;

    fn sku_exists(&self, sku: &str) -> Result<bool, StoreError>;

    /// Insert a new record. Fails with `DuplicateKey` if the SKU is taken.
    fn insert(&self, record: StockRecord) -> Result<(), StoreError>;

    /// Conditional write: persist `record` only if the stored version equals
    /// `expected`. The record carries the advanced token; `expected` is the
    /// token the caller read.
    fn update(&self, record: StockRecord, expected: Version) -> Result<(), StoreError>;

    /// Hard delete. Returns whether a record existed.
    fn delete(&self, id: StockRecordId) -> Result<bool, StoreError>;

    fn list_all(&self) -> Result<Vec<StockRecord>, StoreError>;

    /// Records with `quantity <= reorder_level`.
    fn list_low_stock(&self) -> Result<Vec<StockRecord>, StoreError>;

    /// Records with `damaged_quantity > 0`.
    fn list_damaged(&self) -> Result<Vec<StockRecord>, StoreError>;

    fn list_by_status(&self, status: StockStatus) -> Result<Vec<StockRecord>, StoreError>;
}

/// Append-only log of stock transactions.
///
/// No update or delete is exposed; a transaction written here is a permanent
/// historical fact, retained even after the referenced record is deleted.
pub trait TransactionLogStore: Send + Sync {
    fn append(&self, transaction: StockTransaction) -> Result<(), StoreError>;

    /// All transactions for one product, most recent first.
    fn for_product(&self, id: StockRecordId) -> Result<Vec<StockTransaction>, StoreError>;

    fn by_type(&self, transaction_type: TransactionType) -> Result<Vec<StockTransaction>, StoreError>;

    /// Transactions within `[start, end]`, most recent first.
    fn between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StockTransaction>, StoreError>;
}

/// Append-only audit trail.
pub trait AuditTrailStore: Send + Sync {
    fn append(&self, entry: AuditLogEntry) -> Result<(), StoreError>;

    fn for_entity(&self, entity_type: &str, entity_id: Uuid) -> Result<Vec<AuditLogEntry>, StoreError>;

    fn by_action(&self, action: AuditAction) -> Result<Vec<AuditLogEntry>, StoreError>;

    fn between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AuditLogEntry>, StoreError>;

    fn list_all(&self) -> Result<Vec<AuditLogEntry>, StoreError>;
}

impl<S> StockRecordStore for Arc<S>
where
    S: StockRecordStore + ?Sized,
{
    fn get(&self, id: StockRecordId) -> Result<Option<StockRecord>, StoreError> {
        (**self).get(id)
    }

    fn get_by_sku(&self, sku: &str) -> Result<Option<StockRecord>, StoreError> {
        (**self).get_by_sku(sku)
    }

    fn sku_exists(&self, sku: &str) -> Result<bool, StoreError> {
        (**self).sku_exists(sku)
    }

    fn insert(&self, record: StockRecord) -> Result<(), StoreError> {
        (**self).insert(record)
    }

    fn update(&self, record: StockRecord, expected: Version) -> Result<(), StoreError> {
        (**self).update(record, expected)
    }

    fn delete(&self, id: StockRecordId) -> Result<bool, StoreError> {
        (**self).delete(id)
    }

    fn list_all(&self) -> Result<Vec<StockRecord>, StoreError> {
        (**self).list_all()
    }

    fn list_low_stock(&self) -> Result<Vec<StockRecord>, StoreError> {
        (**self).list_low_stock()
    }

    fn list_damaged(&self) -> Result<Vec<StockRecord>, StoreError> {
        (**self).list_damaged()
    }

    fn list_by_status(&self, status: StockStatus) -> Result<Vec<StockRecord>, StoreError> {
        (**self).list_by_status(status)
    }
}

impl<S> TransactionLogStore for Arc<S>
where
    S: TransactionLogStore + ?Sized,
{
    fn append(&self, transaction: StockTransaction) -> Result<(), StoreError> {
        (**self).append(transaction)
    }

    fn for_product(&self, id: StockRecordId) -> Result<Vec<StockTransaction>, StoreError> {
        (**self).for_product(id)
    }

    fn by_type(&self, transaction_type: TransactionType) -> Result<Vec<StockTransaction>, StoreError> {
        (**self).by_type(transaction_type)
    }

    fn between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StockTransaction>, StoreError> {
        (**self).between(start, end)
    }
}

impl<S> AuditTrailStore for Arc<S>
where
    S: AuditTrailStore + ?Sized,
{
    fn append(&self, entry: AuditLogEntry) -> Result<(), StoreError> {
        (**self).append(entry)
    }

    fn for_entity(&self, entity_type: &str, entity_id: Uuid) -> Result<Vec<AuditLogEntry>, StoreError> {
        (**self).for_entity(entity_type, entity_id)
    }

    fn by_action(&self, action: AuditAction) -> Result<Vec<AuditLogEntry>, StoreError> {
        (**self).by_action(action)
    }

    fn between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AuditLogEntry>, StoreError> {
        (**self).between(start, end)
    }

    fn list_all(&self) -> Result<Vec<AuditLogEntry>, StoreError> {
        (**self).list_all()
    }
}
