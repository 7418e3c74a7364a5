//! Typed error handling for the bookshelf API
//!
//! Every handler returns [`ApiResult`], so a failure anywhere in the request
//! pipeline becomes a structured JSON body with a matching HTTP status:
//!
//! ```json
//! { "code": "VALIDATION_ERROR", "message": "...", "details": { "fields": [...] } }
//! ```
//!
//! # Error Categories
//!
//! - [`EntityError`]: lookups of books and authors
//! - [`ValidationError`]: request bodies, query parameters, referential checks
//! - [`RequestError`]: authentication and authorization outcomes
//! - [`StorageError`]: failures reported by a storage backend
//! - [`ConfigError`]: configuration that cannot be loaded

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

/// The main error type returned by handlers
#[derive(Debug)]
pub enum ApiError {
    /// Entity lookups (retrieve, update, delete)
    Entity(EntityError),

    /// Invalid input
    Validation(ValidationError),

    /// Authentication / authorization outcomes
    Request(RequestError),

    /// Storage backend errors
    Storage(StorageError),

    /// Configuration errors
    Config(ConfigError),

    /// Anything else (should not happen in normal operation)
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Entity(e) => write!(f, "{}", e),
            ApiError::Validation(e) => write!(f, "{}", e),
            ApiError::Request(e) => write!(f, "{}", e),
            ApiError::Storage(e) => write!(f, "{}", e),
            ApiError::Config(e) => write!(f, "{}", e),
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Entity(e) => Some(e),
            ApiError::Validation(e) => Some(e),
            ApiError::Request(e) => Some(e),
            ApiError::Storage(e) => Some(e),
            ApiError::Config(e) => Some(e),
            ApiError::Internal(_) => None,
        }
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Entity(e) => e.status_code(),
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Request(e) => e.status_code(),
            ApiError::Storage(e) => e.status_code(),
            ApiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Entity(e) => e.error_code(),
            ApiError::Validation(e) => e.error_code(),
            ApiError::Request(e) => e.error_code(),
            ApiError::Storage(e) => e.error_code(),
            ApiError::Config(_) => "CONFIG_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            ApiError::Entity(EntityError::NotFound { entity_type, id }) => {
                Some(serde_json::json!({
                    "entity_type": entity_type,
                    "id": id
                }))
            }
            ApiError::Entity(EntityError::PageNotFound { page }) => {
                Some(serde_json::json!({ "page": page }))
            }
            ApiError::Validation(ValidationError::FieldError { field, message }) => {
                Some(serde_json::json!({
                    "fields": [FieldValidationError::new(field, message)]
                }))
            }
            ApiError::Validation(ValidationError::FieldErrors(errors)) => {
                Some(serde_json::json!({ "fields": errors }))
            }
            _ => None,
        }
    }

    /// Shorthand for a single-field validation error
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        ApiError::Validation(ValidationError::FieldError {
            field: field.into(),
            message: message.into(),
        })
    }

    /// Shorthand for a missing entity
    pub fn not_found(entity_type: impl Into<String>, id: impl fmt::Display) -> Self {
        ApiError::Entity(EntityError::NotFound {
            entity_type: entity_type.into(),
            id: id.to_string(),
        })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        let body = Json(self.to_response());
        let mut response = (status, body).into_response();

        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Token"));
        }

        response
    }
}

// =============================================================================
// Entity Errors
// =============================================================================

/// Errors related to entity lookups
#[derive(Debug)]
pub enum EntityError {
    /// Entity was not found.
    ///
    /// The id is kept as the raw path segment so that non-numeric ids
    /// report the same way as unknown ones.
    NotFound { entity_type: String, id: String },

    /// Requested page lies past the last page of a non-empty result
    PageNotFound { page: usize },
}

impl fmt::Display for EntityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityError::NotFound { entity_type, id } => {
                write!(f, "{} with id '{}' not found", entity_type, id)
            }
            EntityError::PageNotFound { .. } => write!(f, "Invalid page."),
        }
    }
}

impl std::error::Error for EntityError {}

impl EntityError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EntityError::NotFound { .. } | EntityError::PageNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            EntityError::NotFound { .. } => "ENTITY_NOT_FOUND",
            EntityError::PageNotFound { .. } => "PAGE_NOT_FOUND",
        }
    }
}

impl From<EntityError> for ApiError {
    fn from(err: EntityError) -> Self {
        ApiError::Entity(err)
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors related to input validation
#[derive(Debug)]
pub enum ValidationError {
    /// Single field validation error
    FieldError { field: String, message: String },

    /// Multiple field validation errors
    FieldErrors(Vec<FieldValidationError>),

    /// Body is not valid JSON or does not match the expected shape
    InvalidJson { message: String },
}

/// A single field validation error
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FieldValidationError {
    pub field: String,
    pub message: String,
}

impl FieldValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::FieldError { field, message } => {
                write!(f, "Validation error for field '{}': {}", field, message)
            }
            ValidationError::FieldErrors(errors) => {
                let msgs: Vec<String> = errors
                    .iter()
                    .map(|e| format!("{}: {}", e.field, e.message))
                    .collect();
                write!(f, "Validation errors: {}", msgs.join(", "))
            }
            ValidationError::InvalidJson { message } => {
                write!(f, "Invalid JSON: {}", message)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::FieldError { .. } | ValidationError::FieldErrors(_) => {
                "VALIDATION_ERROR"
            }
            ValidationError::InvalidJson { .. } => "INVALID_JSON",
        }
    }

    /// Names of the offending fields, in report order
    pub fn fields(&self) -> Vec<&str> {
        match self {
            ValidationError::FieldError { field, .. } => vec![field.as_str()],
            ValidationError::FieldErrors(errors) => {
                errors.iter().map(|e| e.field.as_str()).collect()
            }
            ValidationError::InvalidJson { .. } => vec![],
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<FieldValidationError> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                let field = field.to_string();
                errs.iter().map(move |e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| default_message(&e.code));
                    FieldValidationError::new(field.clone(), message)
                })
            })
            .collect();

        fields.sort_by(|a, b| a.field.cmp(&b.field));
        ValidationError::FieldErrors(fields)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(errors.into())
    }
}

fn default_message(code: &str) -> String {
    match code {
        "required" => "This field is required.".to_string(),
        "length" => "Ensure this field has a valid length.".to_string(),
        other => format!("Invalid value ({}).", other),
    }
}

// =============================================================================
// Request Errors
// =============================================================================

/// Authentication and authorization failures
#[derive(Debug)]
pub enum RequestError {
    /// A write was attempted without any credential
    NotAuthenticated,

    /// A credential was presented but is invalid or insufficient
    Forbidden { message: String },
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::NotAuthenticated => {
                write!(f, "Authentication credentials were not provided.")
            }
            RequestError::Forbidden { message } => write!(f, "Forbidden: {}", message),
        }
    }
}

impl std::error::Error for RequestError {}

impl RequestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::NotAuthenticated => StatusCode::UNAUTHORIZED,
            RequestError::Forbidden { .. } => StatusCode::FORBIDDEN,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RequestError::NotAuthenticated => "NOT_AUTHENTICATED",
            RequestError::Forbidden { .. } => "FORBIDDEN",
        }
    }
}

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        ApiError::Request(err)
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors reported by storage backends
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Row addressed by id does not exist
    #[error("{entity_type} with id '{id}' not found")]
    NotFound { entity_type: String, id: i64 },

    /// A write would break referential integrity
    #[error("{field}: {message}")]
    Integrity { field: String, message: String },

    /// A write would duplicate a unique value
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// The backend itself failed
    #[error("{backend} error: {message}")]
    Backend { backend: String, message: String },
}

impl StorageError {
    pub fn not_found(entity_type: &str, id: i64) -> Self {
        StorageError::NotFound {
            entity_type: entity_type.to_string(),
            id,
        }
    }

    pub fn backend(backend: &str, message: impl fmt::Display) -> Self {
        StorageError::Backend {
            backend: backend.to_string(),
            message: message.to_string(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            StorageError::NotFound { .. } => StatusCode::NOT_FOUND,
            StorageError::Integrity { .. } => StatusCode::BAD_REQUEST,
            StorageError::Conflict { .. } => StatusCode::CONFLICT,
            StorageError::Backend { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            StorageError::NotFound { .. } => "ENTITY_NOT_FOUND",
            StorageError::Integrity { .. } => "VALIDATION_ERROR",
            StorageError::Conflict { .. } => "CONFLICT",
            StorageError::Backend { .. } => "STORAGE_ERROR",
        }
    }
}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound { entity_type, id } => ApiError::not_found(entity_type, id),
            StorageError::Integrity { field, message } => ApiError::field(field, message),
            other => ApiError::Storage(other),
        }
    }
}

/// Result type used by storage backends
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to parse configuration
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Invalid value in configuration
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError { file, message } => {
                if let Some(file) = file {
                    write!(f, "Failed to parse config file '{}': {}", file, message)
                } else {
                    write!(f, "Failed to parse config: {}", message)
                }
            }
            ConfigError::InvalidValue {
                field,
                value,
                message,
            } => {
                write!(
                    f,
                    "Invalid value '{}' for field '{}': {}",
                    value, field, message
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::Config(err)
    }
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

/// A specialized Result type for handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_error_display() {
        let err = EntityError::NotFound {
            entity_type: "book".to_string(),
            id: "42".to_string(),
        };
        assert!(err.to_string().contains("book"));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::not_found("book", 1).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::field("author", "missing").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(RequestError::NotAuthenticated).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(RequestError::Forbidden {
                message: "Invalid token.".to_string()
            })
            .status_code(),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_validation_error_multiple_fields() {
        let err = ValidationError::FieldErrors(vec![
            FieldValidationError::new("title", "required"),
            FieldValidationError::new("author", "required"),
        ]);
        let display = err.to_string();
        assert!(display.contains("title"));
        assert!(display.contains("author"));
        assert_eq!(err.fields(), vec!["title", "author"]);
    }

    #[test]
    fn test_field_error_response_names_field() {
        let response = ApiError::field("author", "does not exist").to_response();
        assert_eq!(response.code, "VALIDATION_ERROR");
        let details = response.details.expect("details should be present");
        assert_eq!(details["fields"][0]["field"], "author");
    }

    #[test]
    fn test_storage_integrity_becomes_validation() {
        let err: ApiError = StorageError::Integrity {
            field: "author".to_string(),
            message: "Invalid pk \"9\" - object does not exist.".to_string(),
        }
        .into();
        assert!(matches!(
            err,
            ApiError::Validation(ValidationError::FieldError { ref field, .. }) if field == "author"
        ));
    }

    #[test]
    fn test_storage_not_found_becomes_entity_error() {
        let err: ApiError = StorageError::NotFound {
            entity_type: "book".to_string(),
            id: 7,
        }
        .into();
        assert_eq!(err.error_code(), "ENTITY_NOT_FOUND");
    }

    #[test]
    fn test_unauthorized_sets_www_authenticate() {
        let response = ApiError::from(RequestError::NotAuthenticated).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::WWW_AUTHENTICATE),
            Some(&HeaderValue::from_static("Token"))
        );
    }
}
