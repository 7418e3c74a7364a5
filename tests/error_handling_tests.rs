//! Tests for the typed error handling system
//!
//! These tests verify that:
//! - Errors return correct HTTP status codes
//! - Error responses are properly formatted
//! - Storage errors convert into the right API errors

use axum::body::to_bytes;
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use bookshelf::core::error::{
    ConfigError, EntityError, FieldValidationError, RequestError, ValidationError,
};
use bookshelf::prelude::*;
use serde_json::Value;

async fn body_json(err: ApiError) -> (StatusCode, Value, axum::http::HeaderMap) {
    let response = err.into_response();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should be readable");
    let body = serde_json::from_slice(&bytes).expect("body should be JSON");
    (status, body, headers)
}

// =============================================================================
// HTTP Status Code Tests
// =============================================================================

mod status_code_tests {
    use super::*;

    #[test]
    fn test_entity_not_found_returns_404() {
        let err = ApiError::Entity(EntityError::NotFound {
            entity_type: "book".to_string(),
            id: "7".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_validation_error_returns_400() {
        let err = ApiError::field("title", "This field is required.");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_not_authenticated_returns_401() {
        let err = ApiError::Request(RequestError::NotAuthenticated);
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_forbidden_returns_403() {
        let err = ApiError::Request(RequestError::Forbidden {
            message: "Invalid token.".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_conflict_returns_409() {
        let err = ApiError::Storage(StorageError::Conflict {
            message: "username taken".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_backend_and_config_errors_return_500() {
        let err = ApiError::Storage(StorageError::backend("postgres", "connection reset"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

        let err = ApiError::Config(ConfigError::InvalidValue {
            field: "port".to_string(),
            value: "x".to_string(),
            message: "expected a port number".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

// =============================================================================
// Error Response Tests
// =============================================================================

mod error_response_tests {
    use super::*;

    #[tokio::test]
    async fn test_not_authenticated_carries_challenge() {
        let (status, body, headers) =
            body_json(ApiError::Request(RequestError::NotAuthenticated)).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["code"], "NOT_AUTHENTICATED");
        assert_eq!(
            body["message"],
            "Authentication credentials were not provided."
        );
        assert_eq!(headers[header::WWW_AUTHENTICATE], "Token");
    }

    #[tokio::test]
    async fn test_forbidden_has_no_challenge() {
        let (_, body, headers) = body_json(ApiError::Request(RequestError::Forbidden {
            message: "Invalid token.".to_string(),
        }))
        .await;

        assert_eq!(body["code"], "FORBIDDEN");
        assert!(headers.get(header::WWW_AUTHENTICATE).is_none());
    }

    #[tokio::test]
    async fn test_not_found_details() {
        let (_, body, _) = body_json(ApiError::not_found("book", 42)).await;

        assert_eq!(body["code"], "ENTITY_NOT_FOUND");
        assert_eq!(body["details"]["entity_type"], "book");
        assert_eq!(body["details"]["id"], "42");
    }

    #[tokio::test]
    async fn test_validation_errors_include_field_details() {
        let err = ApiError::Validation(ValidationError::FieldErrors(vec![
            FieldValidationError::new("author", "This field is required."),
            FieldValidationError::new("title", "This field is required."),
        ]));
        let (_, body, _) = body_json(err).await;

        assert_eq!(body["code"], "VALIDATION_ERROR");
        let fields = body["details"]["fields"].as_array().unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0]["field"], "author");
        assert_eq!(fields[1]["message"], "This field is required.");
    }

    #[tokio::test]
    async fn test_storage_error_has_no_details() {
        let (_, body, _) =
            body_json(ApiError::Storage(StorageError::backend("in-memory", "poisoned"))).await;

        assert_eq!(body["code"], "STORAGE_ERROR");
        assert!(body.get("details").is_none());
    }
}

// =============================================================================
// Error Conversion Tests
// =============================================================================

mod error_conversion_tests {
    use super::*;

    #[test]
    fn test_storage_not_found_becomes_entity_error() {
        let err: ApiError = StorageError::NotFound {
            entity_type: "author".to_string(),
            id: 3,
        }
        .into();

        assert!(matches!(err, ApiError::Entity(EntityError::NotFound { .. })));
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_integrity_becomes_field_error() {
        let err: ApiError = StorageError::Integrity {
            field: "author".to_string(),
            message: "object does not exist".to_string(),
        }
        .into();

        match err {
            ApiError::Validation(e) => assert_eq!(e.fields(), vec!["author"]),
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}

// =============================================================================
// Storage Error Tests
// =============================================================================

mod storage_error_tests {
    use super::*;

    #[tokio::test]
    async fn test_update_nonexistent_book_returns_typed_error() {
        let store = InMemoryStore::new();

        let result = store
            .update_book(
                99,
                BookDraft {
                    title: "Nowhere".to_string(),
                    author: 1,
                    publication_year: 2000,
                },
            )
            .await;

        assert!(matches!(result, Err(StorageError::NotFound { id: 99, .. })));
    }

    #[tokio::test]
    async fn test_duplicate_user_is_conflict() {
        let store = InMemoryStore::new();
        store.create_user("reader", "hash").await.unwrap();

        let err = store.create_user("reader", "hash").await.unwrap_err();

        assert!(matches!(err, StorageError::Conflict { .. }));
        assert_eq!(ApiError::from(err).error_code(), "CONFLICT");
    }
}
