use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use stockpile_core::{StockRecordId, Version};
use stockpile_inventory::{AuditAction, AuditLogEntry, StockRecord, StockStatus, StockTransaction, TransactionType};

use super::r#trait::{AuditTrailStore, StockRecordStore, StoreError, TransactionLogStore};

fn poisoned() -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

/// In-memory stock record store.
///
/// Intended for tests/dev. Not optimized for performance; SKU lookups scan.
#[derive(Debug, Default)]
pub struct InMemoryStockRecordStore {
    records: RwLock<HashMap<StockRecordId, StockRecord>>,
}

impl InMemoryStockRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StockRecordStore for InMemoryStockRecordStore {
    fn get(&self, id: StockRecordId) -> Result<Option<StockRecord>, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.get(&id).cloned())
    }

    fn get_by_sku(&self, sku: &str) -> Result<Option<StockRecord>, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.values().find(|r| r.sku == sku).cloned())
    }

    fn sku_exists(&self, sku: &str) -> Result<bool, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.values().any(|r| r.sku == sku))
    }

    fn insert(&self, record: StockRecord) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        if records.values().any(|r| r.sku == record.sku) {
            return Err(StoreError::DuplicateKey(format!(
                "sku '{}' already exists",
                record.sku
            )));
        }
        records.insert(record.id, record);
        Ok(())
    }

    fn update(&self, record: StockRecord, expected: Version) -> Result<(), StoreError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        let stored = records
            .get(&record.id)
            .ok_or_else(|| StoreError::Conflict("record no longer exists".to_string()))?;

        if stored.version != expected {
            return Err(StoreError::Conflict(format!(
                "expected version {expected}, found {}",
                stored.version
            )));
        }
        if stored.sku != record.sku
            && records.values().any(|r| r.id != record.id && r.sku == record.sku)
        {
            return Err(StoreError::DuplicateKey(format!(
                "sku '{}' already exists",
                record.sku
            )));
        }

        records.insert(record.id, record);
        Ok(())
    }

    fn delete(&self, id: StockRecordId) -> Result<bool, StoreError> {
        let mut records = self.records.write().map_err(|_| poisoned())?;
        Ok(records.remove(&id).is_some())
    }

    fn list_all(&self) -> Result<Vec<StockRecord>, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.values().cloned().collect())
    }

    fn list_low_stock(&self) -> Result<Vec<StockRecord>, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.values().filter(|r| r.is_low_stock()).cloned().collect())
    }

    fn list_damaged(&self) -> Result<Vec<StockRecord>, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records
            .values()
            .filter(|r| r.has_damaged_stock())
            .cloned()
            .collect())
    }

    fn list_by_status(&self, status: StockStatus) -> Result<Vec<StockRecord>, StoreError> {
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.values().filter(|r| r.status == status).cloned().collect())
    }
}

/// In-memory append-only transaction log.
///
/// Append order is commit order: the engine assigns `transaction_date` at the
/// moment of commit, so iterating in reverse yields "most recent first" as a
/// total order even when timestamps collide.
#[derive(Debug, Default)]
pub struct InMemoryTransactionLog {
    entries: RwLock<Vec<StockTransaction>>,
}

impl InMemoryTransactionLog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TransactionLogStore for InMemoryTransactionLog {
    fn append(&self, transaction: StockTransaction) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.push(transaction);
        Ok(())
    }

    fn for_product(&self, id: StockRecordId) -> Result<Vec<StockTransaction>, StoreError> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries
            .iter()
            .rev()
            .filter(|t| t.product_stock_id == id)
            .cloned()
            .collect())
    }

    fn by_type(&self, transaction_type: TransactionType) -> Result<Vec<StockTransaction>, StoreError> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries
            .iter()
            .rev()
            .filter(|t| t.transaction_type == transaction_type)
            .cloned()
            .collect())
    }

    fn between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StockTransaction>, StoreError> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries
            .iter()
            .rev()
            .filter(|t| t.transaction_date >= start && t.transaction_date <= end)
            .cloned()
            .collect())
    }
}

/// In-memory append-only audit trail.
#[derive(Debug, Default)]
pub struct InMemoryAuditTrail {
    entries: RwLock<Vec<AuditLogEntry>>,
}

impl InMemoryAuditTrail {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AuditTrailStore for InMemoryAuditTrail {
    fn append(&self, entry: AuditLogEntry) -> Result<(), StoreError> {
        let mut entries = self.entries.write().map_err(|_| poisoned())?;
        entries.push(entry);
        Ok(())
    }

    fn for_entity(&self, entity_type: &str, entity_id: Uuid) -> Result<Vec<AuditLogEntry>, StoreError> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries
            .iter()
            .filter(|e| e.entity_type == entity_type && e.entity_id == entity_id)
            .cloned()
            .collect())
    }

    fn by_action(&self, action: AuditAction) -> Result<Vec<AuditLogEntry>, StoreError> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.iter().filter(|e| e.action == action).cloned().collect())
    }

    fn between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<AuditLogEntry>, StoreError> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries
            .iter()
            .filter(|e| e.timestamp >= start && e.timestamp <= end)
            .cloned()
            .collect())
    }

    fn list_all(&self) -> Result<Vec<AuditLogEntry>, StoreError> {
        let entries = self.entries.read().map_err(|_| poisoned())?;
        Ok(entries.clone())
    }
}
