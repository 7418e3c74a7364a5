//! Axum extractors and middleware shared by every resource
//!
//! - [`Payload`] deserializes a JSON body, rejecting with an [`ApiError`]
//! - [`Auth`] reads the [`AuthContext`] resolved by the guard
//! - [`require_permission`] resolves credentials and applies the
//!   resource's [`PermissionTable`] before the handler (and its body
//!   extractor) runs

use crate::core::auth::{AuthContext, AuthProvider, Operation, PermissionTable, Target};
use crate::core::error::{ApiError, ValidationError};
use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::Response;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// JSON request body
///
/// Syntax errors and a missing JSON content type become `INVALID_JSON`.
/// A well-formed body whose values do not fit `T` is a validation error on
/// the offending field.
#[derive(Debug, Clone)]
pub struct Payload<T>(pub T);

impl<S, T> FromRequest<S> for Payload<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<serde_json::Value>::from_request(req, state)
            .await
            .map_err(invalid_json)?;
        serde_path_to_error::deserialize(value)
            .map(Payload)
            .map_err(invalid_field)
    }
}

fn invalid_json(rejection: JsonRejection) -> ApiError {
    ValidationError::InvalidJson {
        message: rejection.body_text(),
    }
    .into()
}

fn invalid_field(error: serde_path_to_error::Error<serde_json::Error>) -> ApiError {
    let field = match error.path().to_string() {
        path if path == "." => "non_field_errors".to_string(),
        path => path,
    };
    ApiError::field(field, error.into_inner().to_string())
}

/// Auth context of the current request; anonymous when no guard ran
#[derive(Debug, Clone)]
pub struct Auth(pub AuthContext);

impl<S> FromRequestParts<S> for Auth
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Auth(
            parts
                .extensions
                .get::<AuthContext>()
                .cloned()
                .unwrap_or(AuthContext::Anonymous),
        ))
    }
}

/// State of one guarded route: which table applies to which target
#[derive(Clone)]
pub struct PermissionGuard {
    pub auth: Arc<dyn AuthProvider>,
    pub permissions: PermissionTable,
    pub target: Target,
}

impl PermissionGuard {
    pub fn new(auth: Arc<dyn AuthProvider>, permissions: PermissionTable, target: Target) -> Self {
        Self {
            auth,
            permissions,
            target,
        }
    }
}

/// Middleware resolving credentials and enforcing the permission table
pub async fn require_permission(
    State(guard): State<PermissionGuard>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let context = guard.auth.authenticate(req.headers()).await?;

    if let Some(operation) = Operation::from_method(req.method(), guard.target) {
        if let Err(e) = guard.permissions.authorize(operation, &context) {
            tracing::warn!(
                method = %req.method(),
                path = %req.uri().path(),
                principal = context.principal(),
                "Permission denied"
            );
            return Err(e);
        }
    }

    req.extensions_mut().insert(context);
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::StorageResult;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{HeaderMap, Method, StatusCode, header};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Named {
        name: String,
    }

    fn json_request(body: &'static str) -> Request {
        axum::http::Request::builder()
            .method(Method::POST)
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_payload_accepts_valid_json() {
        let Payload(body) = Payload::<Named>::from_request(json_request(r#"{"name":"x"}"#), &())
            .await
            .unwrap();
        assert_eq!(body.name, "x");
    }

    #[tokio::test]
    async fn test_payload_rejects_malformed_json() {
        let err = Payload::<Named>::from_request(json_request("{nope"), &())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "INVALID_JSON");
    }

    #[tokio::test]
    async fn test_payload_wrong_type_names_the_field() {
        let err = Payload::<Named>::from_request(json_request(r#"{"name":5}"#), &())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
        match err {
            ApiError::Validation(e) => assert_eq!(e.fields(), vec!["name"]),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_payload_non_object_is_non_field_error() {
        let err = Payload::<Named>::from_request(json_request("[1, 2]"), &())
            .await
            .unwrap_err();
        match err {
            ApiError::Validation(e) => assert_eq!(e.fields(), vec!["non_field_errors"]),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_payload_requires_json_content_type() {
        let request = axum::http::Request::builder()
            .method(Method::POST)
            .uri("/")
            .body(Body::from(r#"{"name":"x"}"#))
            .unwrap();
        let err = Payload::<Named>::from_request(request, &()).await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_JSON");
    }

    struct Fixed(AuthContext);

    #[async_trait]
    impl AuthProvider for Fixed {
        async fn authenticate(&self, _: &HeaderMap) -> StorageResult<AuthContext> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_auth_extractor_defaults_to_anonymous() {
        let (mut parts, _) = Request::new(Body::empty()).into_parts();
        let Auth(context) = Auth::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(context, AuthContext::Anonymous);
    }

    #[tokio::test]
    async fn test_guard_blocks_anonymous_writes() {
        use axum::Router;
        use axum::routing::get;
        use axum_test::TestServer;

        let guard = PermissionGuard::new(
            Arc::new(Fixed(AuthContext::Anonymous)),
            PermissionTable::default(),
            Target::Collection,
        );
        let app = Router::new()
            .route("/", get(|| async { "read" }).post(|| async { "write" }))
            .route_layer(axum::middleware::from_fn_with_state(guard, require_permission));
        let server = TestServer::new(app).unwrap();

        server.get("/").await.assert_status_ok();
        let response = server.post("/").await;
        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.header(header::WWW_AUTHENTICATE).to_str().unwrap(),
            "Token"
        );
    }
}
