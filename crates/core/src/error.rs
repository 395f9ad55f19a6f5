//! Ledger error model.

use thiserror::Error;

/// Result type used across the ledger.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Typed failure surfaced by every ledger operation.
///
/// Deterministic business failures (`NotFound`, `DuplicateKey`,
/// `InsufficientStock`, `InvalidArgument`) are not retryable without changing
/// the request. `ConcurrencyConflict` and `Storage` are transient and safe to
/// retry from a fresh read.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The referenced stock record (or other entity) does not exist.
    #[error("not found")]
    NotFound,

    /// A record with the given SKU already exists.
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    /// A stock-out operation requested more than the available quantity.
    #[error("insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: i64, requested: i64 },

    /// A value failed validation (e.g. non-positive adjustment quantity).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Optimistic concurrency check failed; retry from a fresh read.
    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// The underlying store was unavailable or failed.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl LedgerError {
    pub fn not_found() -> Self {
        Self::NotFound
    }

    pub fn duplicate_key(msg: impl Into<String>) -> Self {
        Self::DuplicateKey(msg.into())
    }

    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::ConcurrencyConflict(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Whether the caller may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict(_) | Self::Storage(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability_follows_the_taxonomy() {
        assert!(LedgerError::conflict("stale").is_retryable());
        assert!(LedgerError::storage("down").is_retryable());

        assert!(!LedgerError::not_found().is_retryable());
        assert!(!LedgerError::duplicate_key("SKU-1").is_retryable());
        assert!(!LedgerError::invalid_argument("quantity").is_retryable());
        assert!(
            !LedgerError::InsufficientStock {
                available: 1,
                requested: 2
            }
            .is_retryable()
        );
    }
}
