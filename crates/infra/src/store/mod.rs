//! Storage boundary for the stock ledger.
//!
//! This module defines infrastructure-facing abstractions for the three kinds
//! of persistent state — current stock records, the transaction log and the
//! audit trail — without making any storage assumptions. The log and audit
//! interfaces expose append and read only; immutability of history is a
//! property of the interface, not a convention.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::{InMemoryAuditTrail, InMemoryStockRecordStore, InMemoryTransactionLog};
pub use postgres::{PostgresAuditTrail, PostgresStockRecordStore, PostgresTransactionLog};
pub use r#trait::{AuditTrailStore, StockRecordStore, StoreError, TransactionLogStore};
