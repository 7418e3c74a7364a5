//! Partial-update fields
//!
//! A PATCH body distinguishes a missing key (keep the stored value) from an
//! explicit `null` (rejected, since no column of the model is nullable).

use crate::core::error::{ApiError, FieldValidationError, ValidationError};
use serde::{Deserialize, Deserializer};

/// One field of a PATCH body; use with `#[serde(default)]`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PatchField<T> {
    #[default]
    Absent,
    Null,
    Value(T),
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for PatchField<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<T>::deserialize(deserializer)?.map_or(PatchField::Null, PatchField::Value))
    }
}

impl<T> PatchField<T> {
    /// The patched value, or `current()` when the key was absent
    pub fn or_current(self, current: impl FnOnce() -> T) -> Option<T> {
        match self {
            PatchField::Absent => Some(current()),
            PatchField::Null => None,
            PatchField::Value(value) => Some(value),
        }
    }

    fn is_null(&self) -> bool {
        matches!(self, PatchField::Null)
    }
}

/// Fail with one error per field that was sent as `null`
pub(crate) fn reject_nulls(fields: &[(&str, bool)]) -> Result<(), ApiError> {
    let mut errors: Vec<FieldValidationError> = fields
        .iter()
        .filter(|(_, null)| *null)
        .map(|(field, _)| FieldValidationError::new(*field, "This field may not be null."))
        .collect();
    if errors.is_empty() {
        return Ok(());
    }
    errors.sort_by(|a, b| a.field.cmp(&b.field));
    Err(ValidationError::FieldErrors(errors).into())
}

/// `(name, sent as null)` pair for [`reject_nulls`]
pub(crate) fn null_check<'a, T>(name: &'a str, field: &PatchField<T>) -> (&'a str, bool) {
    (name, field.is_null())
}
