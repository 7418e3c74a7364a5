//! Entity traits shared by every resource exposed over HTTP

use crate::core::field::FieldValue;

/// Base trait for all stored entities.
///
/// Ids are assigned by the store and are stable for the life of the row.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Get the unique identifier for this entity instance
    fn id(&self) -> i64;
}

/// Trait for entities the query layer can filter, search and order.
///
/// `field_value` resolves a query field name, including related lookups
/// such as `author__name`, to the value it compares against.
pub trait Data: Entity {
    /// Get the value of a specific field by name
    fn field_value(&self, field: &str) -> Option<FieldValue>;
}
