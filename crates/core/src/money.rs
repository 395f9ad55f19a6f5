//! Fixed-point money value for unit prices.

use serde::{Deserialize, Serialize};

use crate::error::{LedgerError, LedgerResult};

/// Non-negative unit price with two decimal places, stored as integer cents.
///
/// No floating point anywhere; `12.34` is `UnitPrice(1234)`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitPrice(i64);

impl UnitPrice {
    pub fn from_cents(cents: i64) -> LedgerResult<Self> {
        if cents < 0 {
            return Err(LedgerError::invalid_argument(format!(
                "unit price must be non-negative, got {cents} cents"
            )));
        }
        Ok(Self(cents))
    }

    pub fn as_cents(self) -> i64 {
        self.0
    }
}

impl crate::ValueObject for UnitPrice {}

impl core::fmt::Display for UnitPrice {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}
