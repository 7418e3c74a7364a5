//! Author entity

use super::patch::{PatchField, null_check, reject_nulls};
use crate::core::error::{ApiError, FieldValidationError, ValidationError};
use crate::{impl_data_fields, impl_entity};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// An author; referenced by many books
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub name: String,
}

impl_entity!(Author);

impl_data_fields!(Author, {
    "name" => |author| author.name.as_str(),
});

/// Validated values for creating or replacing an author
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorDraft {
    pub name: String,
}

/// Body of `POST /api/authors/` and `PUT /api/authors/{id}/`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct AuthorPayload {
    #[validate(
        required(message = "This field is required."),
        length(min = 1, max = 100, message = "Ensure this field has between 1 and 100 characters.")
    )]
    pub name: Option<String>,
}

impl AuthorPayload {
    pub fn into_draft(self) -> Result<AuthorDraft, ApiError> {
        self.validate()?;
        let Some(name) = self.name else {
            return Err(missing(&["name"]));
        };
        Ok(AuthorDraft { name })
    }
}

/// Body of `PATCH /api/authors/{id}/`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthorPatch {
    pub name: PatchField<String>,
}

impl AuthorPatch {
    /// Merge the patch over the stored author
    pub fn apply_to(self, current: &Author) -> Result<AuthorDraft, ApiError> {
        reject_nulls(&[null_check("name", &self.name)])?;
        AuthorPayload {
            name: self.name.or_current(|| current.name.clone()),
        }
        .into_draft()
    }
}

pub(crate) fn missing(fields: &[&str]) -> ApiError {
    ValidationError::FieldErrors(
        fields
            .iter()
            .map(|f| FieldValidationError::new(*f, "This field is required."))
            .collect(),
    )
    .into()
}
