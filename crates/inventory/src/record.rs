use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockpile_core::{Entity, LedgerError, LedgerResult, StockRecordId, UnitPrice, ValueObject, Version};

/// Derived availability state of a stock record.
///
/// `DISCONTINUED` is a terminal override: quantity changes never promote a
/// discontinued record back to `AVAILABLE`, only an explicit update that sets
/// a different status does.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StockStatus {
    Available,
    LowStock,
    OutOfStock,
    Discontinued,
}

impl StockStatus {
    /// Status derivation rule, in priority order:
    ///
    /// 1. `quantity == 0` → `OUT_OF_STOCK`
    /// 2. `quantity <= reorder_level` → `LOW_STOCK`
    /// 3. otherwise `AVAILABLE`, unless `current` is the sticky
    ///    `DISCONTINUED` override.
    pub fn derive(quantity: i64, reorder_level: i64, current: StockStatus) -> StockStatus {
        if quantity == 0 {
            StockStatus::OutOfStock
        } else if quantity <= reorder_level {
            StockStatus::LowStock
        } else if current != StockStatus::Discontinued {
            StockStatus::Available
        } else {
            StockStatus::Discontinued
        }
    }
}

/// Current, mutable quantity/status state for one product.
///
/// The invariants `quantity >= 0` and `damaged_quantity >= 0` are enforced by
/// the mutating methods below; stores persist the struct field-for-field,
/// including the `version` token used for conditional writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecord {
    pub id: StockRecordId,
    pub sku: String,
    pub product_name: String,
    pub quantity: i64,
    pub reorder_level: i64,
    pub damaged_quantity: i64,
    pub unit_price: Option<UnitPrice>,
    pub location: Option<String>,
    pub status: StockStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: Version,
}

impl Entity for StockRecord {
    type Id = StockRecordId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl StockRecord {
    /// Build a fresh record from a validated draft.
    ///
    /// Damaged quantity starts at 0; status defaults to `AVAILABLE` unless the
    /// draft supplies one, and is then re-derived from the initial quantity.
    pub fn create(draft: StockRecordDraft, now: DateTime<Utc>) -> LedgerResult<Self> {
        draft.validate()?;

        let mut record = Self {
            id: StockRecordId::new(),
            sku: draft.sku,
            product_name: draft.product_name,
            quantity: draft.quantity,
            reorder_level: draft.reorder_level,
            damaged_quantity: 0,
            unit_price: draft.unit_price,
            location: draft.location,
            status: draft.status.unwrap_or(StockStatus::Available),
            created_at: now,
            updated_at: now,
            version: Version::initial(),
        };
        record.refresh_status();
        Ok(record)
    }

    /// Overwrite the record from a full-record update draft.
    ///
    /// Status is only overwritten when the draft supplies one, and the
    /// derivation rule runs afterwards either way.
    pub fn apply_draft(&mut self, draft: StockRecordDraft, now: DateTime<Utc>) -> LedgerResult<()> {
        draft.validate()?;

        self.sku = draft.sku;
        self.product_name = draft.product_name;
        self.quantity = draft.quantity;
        self.reorder_level = draft.reorder_level;
        self.unit_price = draft.unit_price;
        self.location = draft.location;
        if let Some(status) = draft.status {
            self.status = status;
        }
        self.refresh_status();
        self.touch(now);
        Ok(())
    }

    /// Apply a signed quantity delta.
    ///
    /// Rejects any delta that would take the quantity negative — this is the
    /// sufficiency check for stock-out operations; no partial fulfillment.
    pub fn apply_delta(&mut self, delta: i64, now: DateTime<Utc>) -> LedgerResult<()> {
        let next = self.quantity + delta;
        if next < 0 {
            return Err(LedgerError::InsufficientStock {
                available: self.quantity,
                requested: -delta,
            });
        }
        self.quantity = next;
        self.refresh_status();
        self.touch(now);
        Ok(())
    }

    /// Move `damaged` units from usable stock into the damaged counter.
    ///
    /// The two counters move in lockstep: damaged goods leave usable stock but
    /// stay tracked, they are not discarded.
    pub fn record_damage(&mut self, damaged: i64, now: DateTime<Utc>) -> LedgerResult<()> {
        if self.quantity < damaged {
            return Err(LedgerError::InsufficientStock {
                available: self.quantity,
                requested: damaged,
            });
        }
        self.quantity -= damaged;
        self.damaged_quantity += damaged;
        self.refresh_status();
        self.touch(now);
        Ok(())
    }

    /// Re-run the status derivation rule against the current quantities.
    pub fn refresh_status(&mut self) {
        self.status = StockStatus::derive(self.quantity, self.reorder_level, self.status);
    }

    /// Immutable image of the full record, for audit before/after values.
    pub fn snapshot(&self) -> StockSnapshot {
        StockSnapshot(self.clone())
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }

    pub fn has_damaged_stock(&self) -> bool {
        self.damaged_quantity > 0
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
        self.version = self.version.next();
    }
}

/// Point-in-time image of a whole stock record.
///
/// Wraps the full record rather than copying fields one by one, so a field
/// added to `StockRecord` can never be silently missing from audit snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct StockSnapshot(StockRecord);

impl ValueObject for StockSnapshot {}

impl StockSnapshot {
    pub fn as_record(&self) -> &StockRecord {
        &self.0
    }

    pub fn to_json(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Create/update payload for a stock record.
///
/// The adapter layer validates primitive constraints before invoking the
/// engine; the engine validates again through this type, so the rules hold no
/// matter who calls it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockRecordDraft {
    pub sku: String,
    pub product_name: String,
    pub quantity: i64,
    pub reorder_level: i64,
    pub unit_price: Option<UnitPrice>,
    pub location: Option<String>,
    pub status: Option<StockStatus>,
}

impl StockRecordDraft {
    pub fn validate(&self) -> LedgerResult<()> {
        if self.sku.trim().is_empty() {
            return Err(LedgerError::invalid_argument("sku is required"));
        }
        if self.sku.len() > 100 {
            return Err(LedgerError::invalid_argument("sku must not exceed 100 characters"));
        }
        if self.product_name.trim().is_empty() {
            return Err(LedgerError::invalid_argument("product name is required"));
        }
        if self.product_name.len() > 200 {
            return Err(LedgerError::invalid_argument(
                "product name must not exceed 200 characters",
            ));
        }
        if self.quantity < 0 {
            return Err(LedgerError::invalid_argument("quantity must be non-negative"));
        }
        if self.reorder_level < 0 {
            return Err(LedgerError::invalid_argument("reorder level must be non-negative"));
        }
        if let Some(location) = &self.location {
            if location.len() > 100 {
                return Err(LedgerError::invalid_argument(
                    "location must not exceed 100 characters",
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn draft(sku: &str, quantity: i64, reorder_level: i64) -> StockRecordDraft {
        StockRecordDraft {
            sku: sku.to_string(),
            product_name: "Widget".to_string(),
            quantity,
            reorder_level,
            unit_price: None,
            location: None,
            status: None,
        }
    }

    #[test]
    fn derivation_priority_order() {
        assert_eq!(StockStatus::derive(0, 5, StockStatus::Available), StockStatus::OutOfStock);
        assert_eq!(StockStatus::derive(3, 5, StockStatus::Available), StockStatus::LowStock);
        assert_eq!(StockStatus::derive(6, 5, StockStatus::Available), StockStatus::Available);
    }

    #[test]
    fn quantity_equal_to_reorder_level_is_low_stock() {
        // quantity == reorder_level triggers rule 2, not rule 3
        let record = StockRecord::create(draft("A1", 5, 5), Utc::now()).unwrap();
        assert_eq!(record.status, StockStatus::LowStock);
    }

    #[test]
    fn discontinued_is_sticky_across_quantity_changes() {
        let mut record = StockRecord::create(
            StockRecordDraft {
                status: Some(StockStatus::Discontinued),
                ..draft("D1", 50, 5)
            },
            Utc::now(),
        )
        .unwrap();
        assert_eq!(record.status, StockStatus::Discontinued);

        record.apply_delta(10, Utc::now()).unwrap();
        assert_eq!(record.status, StockStatus::Discontinued);

        // Rules 1 and 2 still take priority over the override.
        record.apply_delta(-58, Utc::now()).unwrap();
        assert_eq!(record.status, StockStatus::LowStock);
    }

    #[test]
    fn discontinued_is_cleared_by_explicit_status_update() {
        let mut record = StockRecord::create(
            StockRecordDraft {
                status: Some(StockStatus::Discontinued),
                ..draft("D2", 50, 5)
            },
            Utc::now(),
        )
        .unwrap();

        record
            .apply_draft(
                StockRecordDraft {
                    status: Some(StockStatus::Available),
                    ..draft("D2", 50, 5)
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(record.status, StockStatus::Available);
    }

    #[test]
    fn create_starts_with_no_damage_and_initial_version() {
        let record = StockRecord::create(draft("B1", 10, 2), Utc::now()).unwrap();
        assert_eq!(record.damaged_quantity, 0);
        assert_eq!(record.version, Version::initial());
        assert_eq!(record.status, StockStatus::Available);
    }

    #[test]
    fn apply_delta_rejects_going_negative() {
        let mut record = StockRecord::create(draft("C1", 3, 0), Utc::now()).unwrap();
        let before = record.clone();

        let err = record.apply_delta(-4, Utc::now()).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientStock {
                available: 3,
                requested: 4
            }
        );
        // Rejected mutation leaves the record untouched.
        assert_eq!(record, before);
    }

    #[test]
    fn draining_to_zero_is_out_of_stock() {
        let mut record = StockRecord::create(draft("C2", 5, 0), Utc::now()).unwrap();
        record.apply_delta(-5, Utc::now()).unwrap();
        assert_eq!(record.quantity, 0);
        assert_eq!(record.status, StockStatus::OutOfStock);
    }

    #[test]
    fn record_damage_moves_counters_in_lockstep() {
        let mut record = StockRecord::create(draft("C3", 10, 0), Utc::now()).unwrap();
        record.record_damage(3, Utc::now()).unwrap();
        assert_eq!(record.quantity, 7);
        assert_eq!(record.damaged_quantity, 3);

        let err = record.record_damage(8, Utc::now()).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientStock { available: 7, requested: 8 }));
    }

    #[test]
    fn mutations_advance_the_version_token() {
        let mut record = StockRecord::create(draft("C4", 10, 0), Utc::now()).unwrap();
        let v1 = record.version;
        record.apply_delta(1, Utc::now()).unwrap();
        assert_eq!(record.version, v1.next());
    }

    #[test]
    fn draft_validation_rejects_bad_fields() {
        assert!(draft("  ", 1, 0).validate().is_err());
        assert!(draft("A", -1, 0).validate().is_err());
        assert!(draft("A", 1, -1).validate().is_err());
        assert!(
            StockRecordDraft {
                product_name: String::new(),
                ..draft("A", 1, 0)
            }
            .validate()
            .is_err()
        );
        assert!(
            StockRecordDraft {
                sku: "x".repeat(101),
                ..draft("A", 1, 0)
            }
            .validate()
            .is_err()
        );
        assert!(draft("A", 0, 0).validate().is_ok());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: status is a pure function of quantity, reorder level and
        /// the prior status, and follows the priority order exactly.
        #[test]
        fn derivation_is_pure_and_ordered(
            quantity in 0i64..10_000,
            reorder_level in 0i64..10_000,
            current in prop_oneof![
                Just(StockStatus::Available),
                Just(StockStatus::LowStock),
                Just(StockStatus::OutOfStock),
                Just(StockStatus::Discontinued),
            ],
        ) {
            let derived = StockStatus::derive(quantity, reorder_level, current);
            prop_assert_eq!(derived, StockStatus::derive(quantity, reorder_level, current));

            if quantity == 0 {
                prop_assert_eq!(derived, StockStatus::OutOfStock);
            } else if quantity <= reorder_level {
                prop_assert_eq!(derived, StockStatus::LowStock);
            } else if current == StockStatus::Discontinued {
                prop_assert_eq!(derived, StockStatus::Discontinued);
            } else {
                prop_assert_eq!(derived, StockStatus::Available);
            }
        }

        /// Property: an accepted delta never leaves a negative quantity, and a
        /// rejected delta leaves the record unchanged.
        #[test]
        fn quantity_never_goes_negative(
            initial in 0i64..1_000,
            delta in -2_000i64..2_000,
        ) {
            let mut record = StockRecord::create(
                StockRecordDraft {
                    sku: "P1".to_string(),
                    product_name: "Widget".to_string(),
                    quantity: initial,
                    reorder_level: 0,
                    unit_price: None,
                    location: None,
                    status: None,
                },
                Utc::now(),
            ).unwrap();
            let before = record.clone();

            match record.apply_delta(delta, Utc::now()) {
                Ok(()) => prop_assert!(record.quantity >= 0),
                Err(_) => prop_assert_eq!(record, before),
            }
        }
    }
}
