//! Macros for reducing boilerplate when defining entities

/// Implement [`Entity`](crate::core::entity::Entity) for a struct with an `id: i64` field
///
/// # Example
/// ```rust,ignore
/// impl_entity!(Book);
///
/// assert_eq!(book.id(), 1);
/// ```
#[macro_export]
macro_rules! impl_entity {
    ($type:ty) => {
        impl $crate::core::entity::Entity for $type {
            fn id(&self) -> i64 {
                self.id
            }
        }
    };
}

/// Implement [`Data`](crate::core::entity::Data) by mapping query field names to struct fields
///
/// Each mapping is `"query_field" => |row| expression`, where the expression
/// converts into a [`FieldValue`](crate::core::field::FieldValue).
///
/// # Example
/// ```rust,ignore
/// impl_data_fields!(Author, {
///     "name" => |author| author.name.as_str(),
/// });
/// ```
#[macro_export]
macro_rules! impl_data_fields {
    ($type:ty, { $($field:literal => |$row:ident| $value:expr),* $(,)? }) => {
        impl $crate::core::entity::Data for $type {
            fn field_value(&self, field: &str) -> Option<$crate::core::field::FieldValue> {
                match field {
                    "id" => Some($crate::core::field::FieldValue::Integer(self.id)),
                    $($field => {
                        let $row = self;
                        Some($crate::core::field::FieldValue::from($value))
                    })*
                    _ => None,
                }
            }
        }
    };
}
