use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpile_core::{LedgerError, LedgerResult, StockRecordId, TransactionId};

/// Kind of quantity-changing event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    StockIn,
    StockOut,
    Adjustment,
    Transfer,
    Return,
    Damage,
}

impl TransactionType {
    /// Signed quantity delta this type applies for a requested magnitude.
    ///
    /// Canonical rule: `ADJUSTMENT` is always additive. A correction that
    /// should decrease stock has to go through `STOCK_OUT`.
    pub fn signed_delta(self, quantity: i64) -> i64 {
        match self {
            Self::StockIn | Self::Return | Self::Adjustment => quantity,
            Self::StockOut | Self::Damage | Self::Transfer => -quantity,
        }
    }

    /// Whether this type subtracts from usable stock (and therefore requires
    /// sufficient quantity up front).
    pub fn consumes_stock(self) -> bool {
        matches!(self, Self::StockOut | Self::Damage | Self::Transfer)
    }
}

/// Immutable fact describing one quantity-changing event.
///
/// `product_stock_id` is a plain reference, not an enforced foreign key: the
/// record it points at may be deleted later while the transaction persists as
/// history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockTransaction {
    pub id: TransactionId,
    pub product_stock_id: StockRecordId,
    pub transaction_type: TransactionType,
    /// Requested magnitude, always > 0; the sign lives in `transaction_type`.
    pub quantity: i64,
    pub quantity_before: i64,
    pub quantity_after: i64,
    pub reason: Option<String>,
    pub reference: Option<String>,
    pub transaction_date: DateTime<Utc>,
}

impl StockTransaction {
    /// Capture a committed quantity change. Id and date are server-assigned.
    pub fn record(
        product_stock_id: StockRecordId,
        transaction_type: TransactionType,
        quantity: i64,
        quantity_before: i64,
        quantity_after: i64,
        reason: Option<String>,
        reference: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TransactionId::new(),
            product_stock_id,
            transaction_type,
            quantity,
            quantity_before,
            quantity_after,
            reason,
            reference,
            transaction_date: now,
        }
    }
}

/// Input for `AdjustStock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub transaction_type: TransactionType,
    pub quantity: i64,
    pub reason: Option<String>,
    pub reference: Option<String>,
}

impl StockAdjustment {
    pub fn validate(&self) -> LedgerResult<()> {
        if self.quantity <= 0 {
            return Err(LedgerError::invalid_argument("quantity must be at least 1"));
        }
        validate_trail_fields(self.reason.as_deref(), self.reference.as_deref())
    }
}

/// Input for `RecordDamagedGoods`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamagedGoodsReport {
    pub damaged_quantity: i64,
    pub reason: Option<String>,
    pub reference: Option<String>,
}

impl DamagedGoodsReport {
    pub fn validate(&self) -> LedgerResult<()> {
        if self.damaged_quantity <= 0 {
            return Err(LedgerError::invalid_argument("damaged quantity must be at least 1"));
        }
        validate_trail_fields(self.reason.as_deref(), self.reference.as_deref())
    }
}

fn validate_trail_fields(reason: Option<&str>, reference: Option<&str>) -> LedgerResult<()> {
    if reason.is_some_and(|r| r.len() > 500) {
        return Err(LedgerError::invalid_argument("reason must not exceed 500 characters"));
    }
    if reference.is_some_and(|r| r.len() > 100) {
        return Err(LedgerError::invalid_argument("reference must not exceed 100 characters"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn additive_and_subtracting_types() {
        assert_eq!(TransactionType::StockIn.signed_delta(5), 5);
        assert_eq!(TransactionType::Return.signed_delta(5), 5);
        assert_eq!(TransactionType::Adjustment.signed_delta(5), 5);
        assert_eq!(TransactionType::StockOut.signed_delta(5), -5);
        assert_eq!(TransactionType::Damage.signed_delta(5), -5);
        assert_eq!(TransactionType::Transfer.signed_delta(5), -5);
    }

    #[test]
    fn only_subtracting_types_consume_stock() {
        for t in [
            TransactionType::StockOut,
            TransactionType::Damage,
            TransactionType::Transfer,
        ] {
            assert!(t.consumes_stock());
        }
        for t in [
            TransactionType::StockIn,
            TransactionType::Return,
            TransactionType::Adjustment,
        ] {
            assert!(!t.consumes_stock());
        }
    }

    #[test]
    fn recorded_transaction_preserves_the_delta_invariant() {
        let id = StockRecordId::new();
        let tx = StockTransaction::record(
            id,
            TransactionType::StockOut,
            5,
            12,
            7,
            Some("order #81".to_string()),
            None,
            Utc::now(),
        );
        assert_eq!(tx.product_stock_id, id);
        assert_eq!(
            tx.quantity_after,
            tx.quantity_before + tx.transaction_type.signed_delta(tx.quantity)
        );
    }

    #[test]
    fn adjustment_inputs_require_positive_quantity() {
        let adj = StockAdjustment {
            transaction_type: TransactionType::StockIn,
            quantity: 0,
            reason: None,
            reference: None,
        };
        assert!(adj.validate().is_err());

        let report = DamagedGoodsReport {
            damaged_quantity: -2,
            reason: None,
            reference: None,
        };
        assert!(report.validate().is_err());
    }

    #[test]
    fn trail_fields_are_length_limited() {
        let adj = StockAdjustment {
            transaction_type: TransactionType::StockIn,
            quantity: 1,
            reason: Some("x".repeat(501)),
            reference: None,
        };
        assert!(adj.validate().is_err());

        let adj = StockAdjustment {
            transaction_type: TransactionType::StockIn,
            quantity: 1,
            reason: None,
            reference: Some("x".repeat(101)),
        };
        assert!(adj.validate().is_err());
    }

    #[test]
    fn wire_names_are_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&TransactionType::StockIn).unwrap(),
            "\"STOCK_IN\""
        );
        assert_eq!(
            serde_json::to_string(&TransactionType::StockOut).unwrap(),
            "\"STOCK_OUT\""
        );
    }
}
