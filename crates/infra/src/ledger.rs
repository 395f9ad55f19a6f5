//! Stock ledger engine (application-level orchestration).
//!
//! Every public operation executes as one unit of work over the three stores:
//!
//! ```text
//! Request
//!   ↓
//! 1. Validate input (drafts re-validate even after the adapter did)
//!   ↓
//! 2. Read the current record + capture its before-image snapshot
//!   ↓
//! 3. Compute the new state (pure domain methods; sufficiency checks here)
//!   ↓
//! 4. Conditional write to the record store (version token CAS — commit point)
//!   ↓
//! 5. Append the transaction + audit entry
//! ```
//!
//! Everything that can fail deterministically — validation, sufficiency,
//! snapshot serialization — happens before step 4, so a unit of work either
//! commits fully or leaves no trace. On a version conflict the operation fails
//! with `ConcurrencyConflict`; the engine never auto-retries, the caller
//! retries from a fresh read so genuine double-failures stay visible.

use chrono::Utc;

use stockpile_core::{LedgerError, LedgerResult, StockRecordId};
use stockpile_inventory::{
    AuditAction, AuditActor, AuditLogEntry, DamagedGoodsReport, StockAdjustment, StockRecord,
    StockRecordDraft, StockSnapshot, StockStatus, StockTransaction, TransactionType,
    PRODUCT_STOCK_ENTITY,
};

use crate::store::{AuditTrailStore, StockRecordStore, StoreError, TransactionLogStore};

impl From<StoreError> for LedgerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Conflict(msg) => LedgerError::ConcurrencyConflict(msg),
            StoreError::DuplicateKey(msg) => LedgerError::DuplicateKey(msg),
            StoreError::Serialization(msg) => LedgerError::Storage(msg),
            StoreError::Unavailable(msg) => LedgerError::Storage(msg),
        }
    }
}

/// The stock ledger and adjustment engine.
///
/// Generic over the three store traits so tests run against the in-memory
/// backend and production against Postgres, with identical semantics. Safe
/// under parallel invocation: the record store's conditional write is the
/// only isolation required.
#[derive(Debug)]
pub struct StockLedger<R, T, A> {
    records: R,
    transactions: T,
    audits: A,
}

impl<R, T, A> StockLedger<R, T, A> {
    pub fn new(records: R, transactions: T, audits: A) -> Self {
        Self {
            records,
            transactions,
            audits,
        }
    }
}

impl<R, T, A> StockLedger<R, T, A>
where
    R: StockRecordStore,
    T: TransactionLogStore,
    A: AuditTrailStore,
{
    /// Create a new stock record.
    ///
    /// Fails with `DuplicateKey` if the SKU is already taken. The created
    /// record starts with `damaged_quantity = 0` and a status derived from the
    /// initial quantity (defaulting to `AVAILABLE` when the draft supplies
    /// none).
    pub fn create_stock(&self, draft: StockRecordDraft, actor: &AuditActor) -> LedgerResult<StockRecord> {
        let now = Utc::now();
        let record = StockRecord::create(draft, now)?;

        if self.records.sku_exists(&record.sku)? {
            return Err(LedgerError::duplicate_key(format!(
                "product with SKU {} already exists",
                record.sku
            )));
        }

        let after = record.snapshot();
        self.records.insert(record.clone())?;
        self.write_audit(AuditAction::Create, record.id, None, Some(&after), actor)?;

        tracing::info!(sku = %record.sku, id = %record.id, "created product stock");
        Ok(record)
    }

    pub fn get_by_id(&self, id: StockRecordId) -> LedgerResult<StockRecord> {
        self.require(id)
    }

    pub fn get_by_sku(&self, sku: &str) -> LedgerResult<StockRecord> {
        self.records.get_by_sku(sku)?.ok_or_else(LedgerError::not_found)
    }

    pub fn list_all(&self) -> LedgerResult<Vec<StockRecord>> {
        Ok(self.records.list_all()?)
    }

    /// Records at or below their reorder level.
    pub fn list_low_stock(&self) -> LedgerResult<Vec<StockRecord>> {
        Ok(self.records.list_low_stock()?)
    }

    /// Records with damaged goods on hand.
    pub fn list_damaged(&self) -> LedgerResult<Vec<StockRecord>> {
        Ok(self.records.list_damaged()?)
    }

    pub fn list_by_status(&self, status: StockStatus) -> LedgerResult<Vec<StockRecord>> {
        Ok(self.records.list_by_status(status)?)
    }

    /// Full-record update.
    ///
    /// Overwrites sku, product name, quantity, reorder level, unit price and
    /// location; status only when the draft supplies one. The status rule is
    /// re-derived afterwards either way. A SKU change collides with
    /// `DuplicateKey` when another record already owns the new SKU.
    pub fn update_stock(
        &self,
        id: StockRecordId,
        draft: StockRecordDraft,
        actor: &AuditActor,
    ) -> LedgerResult<StockRecord> {
        let now = Utc::now();
        let current = self.require(id)?;
        let expected = current.version;
        let before = current.snapshot();

        if draft.sku != current.sku && self.records.sku_exists(&draft.sku)? {
            return Err(LedgerError::duplicate_key(format!(
                "product with SKU {} already exists",
                draft.sku
            )));
        }

        let mut updated = current;
        updated.apply_draft(draft, now)?;
        let after = updated.snapshot();

        self.records.update(updated.clone(), expected)?;
        self.write_audit(AuditAction::Update, id, Some(&before), Some(&after), actor)?;

        tracing::info!(id = %id, "updated product stock");
        Ok(updated)
    }

    /// Apply a quantity-changing event and append it to the transaction log.
    ///
    /// `STOCK_IN`, `RETURN` and `ADJUSTMENT` add the requested quantity;
    /// `STOCK_OUT`, `DAMAGE` and `TRANSFER` subtract it and fail with
    /// `InsufficientStock` when the available quantity is smaller — no
    /// partial fulfillment.
    pub fn adjust_stock(
        &self,
        id: StockRecordId,
        adjustment: StockAdjustment,
        actor: &AuditActor,
    ) -> LedgerResult<StockTransaction> {
        adjustment.validate()?;

        let now = Utc::now();
        let current = self.require(id)?;
        let expected = current.version;
        let before = current.snapshot();
        let quantity_before = current.quantity;

        let mut updated = current;
        let delta = adjustment.transaction_type.signed_delta(adjustment.quantity);
        updated.apply_delta(delta, now)?;

        let transaction = StockTransaction::record(
            id,
            adjustment.transaction_type,
            adjustment.quantity,
            quantity_before,
            updated.quantity,
            adjustment.reason,
            adjustment.reference,
            now,
        );
        let after = updated.snapshot();

        self.records.update(updated, expected)?;
        self.transactions.append(transaction.clone())?;
        self.write_audit(AuditAction::StockAdjustment, id, Some(&before), Some(&after), actor)?;

        tracing::info!(
            id = %id,
            transaction_type = ?transaction.transaction_type,
            quantity = transaction.quantity,
            quantity_after = transaction.quantity_after,
            "stock adjusted"
        );
        Ok(transaction)
    }

    /// Move stock into the damaged counter.
    ///
    /// Subtracts from usable quantity and adds to `damaged_quantity` in
    /// lockstep, appending a `DAMAGE` transaction for the movement.
    pub fn record_damaged_goods(
        &self,
        id: StockRecordId,
        report: DamagedGoodsReport,
        actor: &AuditActor,
    ) -> LedgerResult<StockTransaction> {
        report.validate()?;

        let now = Utc::now();
        let current = self.require(id)?;
        let expected = current.version;
        let before = current.snapshot();
        let quantity_before = current.quantity;

        let mut updated = current;
        updated.record_damage(report.damaged_quantity, now)?;

        let transaction = StockTransaction::record(
            id,
            TransactionType::Damage,
            report.damaged_quantity,
            quantity_before,
            updated.quantity,
            report.reason,
            report.reference,
            now,
        );
        let after = updated.snapshot();

        self.records.update(updated, expected)?;
        self.transactions.append(transaction.clone())?;
        self.write_audit(AuditAction::DamagedGoods, id, Some(&before), Some(&after), actor)?;

        tracing::info!(
            id = %id,
            damaged_quantity = transaction.quantity,
            "recorded damaged goods"
        );
        Ok(transaction)
    }

    /// Hard-delete a stock record.
    ///
    /// The audit entry (with the full before-image) is written in the same
    /// unit of work, then the record is removed. Transactions and audit rows
    /// referencing the id are deliberately retained as history.
    pub fn delete_stock(&self, id: StockRecordId, actor: &AuditActor) -> LedgerResult<()> {
        let current = self.require(id)?;
        let before = current.snapshot();

        self.write_audit(AuditAction::Delete, id, Some(&before), None, actor)?;
        if !self.records.delete(id)? {
            return Err(LedgerError::not_found());
        }

        tracing::info!(id = %id, sku = %current.sku, "deleted product stock");
        Ok(())
    }

    /// Transactions for a product, most recent first.
    ///
    /// The existence check is point-in-time only: once the record is deleted
    /// this fails with `NotFound`, while the underlying log still holds the
    /// orphaned rows.
    pub fn transactions_for_product(&self, id: StockRecordId) -> LedgerResult<Vec<StockTransaction>> {
        self.require(id)?;
        Ok(self.transactions.for_product(id)?)
    }

    /// Audit entries for a product (entity type `"ProductStock"`).
    pub fn audit_logs_for_product(&self, id: StockRecordId) -> LedgerResult<Vec<AuditLogEntry>> {
        self.require(id)?;
        Ok(self.audits.for_entity(PRODUCT_STOCK_ENTITY, *id.as_uuid())?)
    }

    pub fn all_audit_logs(&self) -> LedgerResult<Vec<AuditLogEntry>> {
        Ok(self.audits.list_all()?)
    }

    fn require(&self, id: StockRecordId) -> LedgerResult<StockRecord> {
        self.records.get(id)?.ok_or_else(LedgerError::not_found)
    }

    /// Append one audit entry for a mutation.
    ///
    /// Snapshot serialization failures are logged and swallowed — audit is
    /// best-effort relative to the primary mutation. Append failures do
    /// propagate.
    fn write_audit(
        &self,
        action: AuditAction,
        id: StockRecordId,
        old: Option<&StockSnapshot>,
        new: Option<&StockSnapshot>,
        actor: &AuditActor,
    ) -> LedgerResult<()> {
        let old_value = match old.map(StockSnapshot::to_json).transpose() {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, id = %id, "failed to serialize audit before-image; skipping audit entry");
                return Ok(());
            }
        };
        let new_value = match new.map(StockSnapshot::to_json).transpose() {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, id = %id, "failed to serialize audit after-image; skipping audit entry");
                return Ok(());
            }
        };

        let entry = AuditLogEntry::record(
            PRODUCT_STOCK_ENTITY,
            *id.as_uuid(),
            action,
            old_value,
            new_value,
            actor,
            Utc::now(),
        );
        self.audits.append(entry)?;
        Ok(())
    }
}
