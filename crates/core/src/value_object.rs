//! Value object trait: equality by value, not identity.

/// Marker trait for immutable domain values compared by their attributes.
///
/// A `UnitPrice` of 1234 cents equals any other `UnitPrice` of 1234 cents;
/// a stock record only equals itself. To "change" a value object, build a
/// new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
