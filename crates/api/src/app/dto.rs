use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::json;

use stockpile_core::UnitPrice;
use stockpile_inventory::{
    AuditLogEntry, DamagedGoodsReport, StockAdjustment, StockRecord, StockRecordDraft, StockStatus,
    StockTransaction, TransactionType,
};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ProductStockRequest {
    pub sku: String,
    pub product_name: String,
    pub quantity: i64,
    pub reorder_level: i64,
    pub unit_price_cents: Option<i64>,
    pub location: Option<String>,
    pub status: Option<StockStatus>,
}

impl ProductStockRequest {
    /// Validate primitive constraints and build the engine draft.
    pub fn into_draft(self) -> Result<StockRecordDraft, axum::response::Response> {
        let unit_price = self
            .unit_price_cents
            .map(UnitPrice::from_cents)
            .transpose()
            .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()))?;

        let draft = StockRecordDraft {
            sku: self.sku,
            product_name: self.product_name,
            quantity: self.quantity,
            reorder_level: self.reorder_level,
            unit_price,
            location: self.location,
            status: self.status,
        };
        draft
            .validate()
            .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()))?;
        Ok(draft)
    }
}

#[derive(Debug, Deserialize)]
pub struct StockAdjustmentRequest {
    pub transaction_type: TransactionType,
    pub quantity: i64,
    pub reason: Option<String>,
    pub reference: Option<String>,
}

impl StockAdjustmentRequest {
    pub fn into_adjustment(self) -> Result<StockAdjustment, axum::response::Response> {
        let adjustment = StockAdjustment {
            transaction_type: self.transaction_type,
            quantity: self.quantity,
            reason: self.reason,
            reference: self.reference,
        };
        adjustment
            .validate()
            .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()))?;
        Ok(adjustment)
    }
}

#[derive(Debug, Deserialize)]
pub struct DamagedGoodsRequest {
    pub damaged_quantity: i64,
    pub reason: Option<String>,
    pub reference: Option<String>,
}

impl DamagedGoodsRequest {
    pub fn into_report(self) -> Result<DamagedGoodsReport, axum::response::Response> {
        let report = DamagedGoodsReport {
            damaged_quantity: self.damaged_quantity,
            reason: self.reason,
            reference: self.reference,
        };
        report
            .validate()
            .map_err(|e| errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()))?;
        Ok(report)
    }
}

// -------------------------
// Response JSON mapping
// -------------------------

pub fn stock_to_json(record: &StockRecord) -> serde_json::Value {
    json!({
        "id": record.id.to_string(),
        "sku": record.sku,
        "product_name": record.product_name,
        "quantity": record.quantity,
        "reorder_level": record.reorder_level,
        "damaged_quantity": record.damaged_quantity,
        "unit_price_cents": record.unit_price.map(UnitPrice::as_cents),
        "location": record.location,
        "status": record.status,
        "created_at": record.created_at.to_rfc3339(),
        "updated_at": record.updated_at.to_rfc3339(),
        "version": record.version.as_u64(),
    })
}

pub fn transaction_to_json(transaction: &StockTransaction) -> serde_json::Value {
    json!({
        "id": transaction.id.to_string(),
        "product_stock_id": transaction.product_stock_id.to_string(),
        "transaction_type": transaction.transaction_type,
        "quantity": transaction.quantity,
        "quantity_before": transaction.quantity_before,
        "quantity_after": transaction.quantity_after,
        "reason": transaction.reason,
        "reference": transaction.reference,
        "transaction_date": transaction.transaction_date.to_rfc3339(),
    })
}

pub fn audit_to_json(entry: &AuditLogEntry) -> serde_json::Value {
    json!({
        "id": entry.id.to_string(),
        "entity_type": entry.entity_type,
        "entity_id": entry.entity_id.to_string(),
        "action": entry.action,
        "old_value": entry.old_value,
        "new_value": entry.new_value,
        "performed_by": entry.performed_by,
        "timestamp": entry.timestamp.to_rfc3339(),
        "source_address": entry.source_address,
    })
}

pub fn stocks_to_json(records: &[StockRecord]) -> serde_json::Value {
    json!(records.iter().map(stock_to_json).collect::<Vec<_>>())
}

pub fn transactions_to_json(transactions: &[StockTransaction]) -> serde_json::Value {
    json!(transactions.iter().map(transaction_to_json).collect::<Vec<_>>())
}

pub fn audits_to_json(entries: &[AuditLogEntry]) -> serde_json::Value {
    json!(entries.iter().map(audit_to_json).collect::<Vec<_>>())
}
