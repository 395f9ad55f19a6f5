use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use stockpile_core::AuditEntryId;

/// Entity-type tag for stock records in the audit trail.
pub const PRODUCT_STOCK_ENTITY: &str = "ProductStock";

/// What kind of mutation an audit entry describes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,
    Update,
    Delete,
    StockAdjustment,
    DamagedGoods,
}

/// Who performed a mutation, and from where.
///
/// Supplied by the adapter layer; defaults cover internal callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditActor {
    pub performed_by: String,
    pub source_address: String,
}

impl Default for AuditActor {
    fn default() -> Self {
        Self {
            performed_by: "system".to_string(),
            source_address: "127.0.0.1".to_string(),
        }
    }
}

/// Immutable fact describing one mutation to a tracked entity.
///
/// Written in the same unit of work as the mutation it describes and never
/// updated afterwards. `old_value`/`new_value` hold serialized record
/// snapshots; either may be absent (CREATE has no before-image, DELETE no
/// after-image).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: AuditEntryId,
    pub entity_type: String,
    pub entity_id: Uuid,
    pub action: AuditAction,
    pub old_value: Option<JsonValue>,
    pub new_value: Option<JsonValue>,
    pub performed_by: String,
    pub timestamp: DateTime<Utc>,
    pub source_address: String,
}

impl AuditLogEntry {
    /// Capture a mutation. Id and timestamp are server-assigned at commit.
    pub fn record(
        entity_type: impl Into<String>,
        entity_id: Uuid,
        action: AuditAction,
        old_value: Option<JsonValue>,
        new_value: Option<JsonValue>,
        actor: &AuditActor,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditEntryId::new(),
            entity_type: entity_type.into(),
            entity_id,
            action,
            old_value,
            new_value,
            performed_by: actor.performed_by.clone(),
            timestamp: now,
            source_address: actor.source_address.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_entries_have_no_before_image() {
        let entry = AuditLogEntry::record(
            PRODUCT_STOCK_ENTITY,
            Uuid::now_v7(),
            AuditAction::Create,
            None,
            Some(serde_json::json!({"sku": "A1"})),
            &AuditActor::default(),
            Utc::now(),
        );
        assert_eq!(entry.entity_type, "ProductStock");
        assert!(entry.old_value.is_none());
        assert!(entry.new_value.is_some());
        assert_eq!(entry.performed_by, "system");
    }

    #[test]
    fn action_wire_names() {
        assert_eq!(
            serde_json::to_string(&AuditAction::StockAdjustment).unwrap(),
            "\"STOCK_ADJUSTMENT\""
        );
        assert_eq!(
            serde_json::to_string(&AuditAction::DamagedGoods).unwrap(),
            "\"DAMAGED_GOODS\""
        );
    }
}
