//! REST API exposure
//!
//! The REST exposure consumes a `ServerHost` plus the entity registry and
//! produces an Axum `Router`:
//!
//! - `/api/books_all/`, `/api/books_all/{id}/`
//! - `/api/authors/`, `/api/authors/{id}/`
//! - `POST /api-token-auth/`
//! - `GET /api/info/`
//! - `GET /health`, `GET /healthz`

pub mod authors;
pub mod books;
pub mod info;
pub mod token;

use super::super::entity_registry::EntityRegistry;
use super::super::host::ServerHost;
use crate::core::error::{ApiError, ApiResult};
use crate::core::query::Page;
use anyhow::Result;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{Value, json};
use std::sync::Arc;

pub use authors::AuthorsResource;
pub use books::BooksResource;

/// REST API exposure implementation
pub struct RestExposure;

impl RestExposure {
    /// Registry of the resources served by default
    pub fn default_registry() -> EntityRegistry {
        let mut registry = EntityRegistry::new();
        registry.register(Box::new(BooksResource));
        registry.register(Box::new(AuthorsResource));
        registry
    }

    /// Build the REST router from a host
    ///
    /// Returns a fully configured Axum router with:
    /// - Health check routes
    /// - Entity CRUD routes
    /// - Token and info routes
    /// - Custom routes
    pub fn build_router(
        host: Arc<ServerHost>,
        registry: &EntityRegistry,
        custom_routes: Vec<Router>,
    ) -> Result<Router> {
        let api_routes = registry
            .build_routes(&host)
            .route("/api-token-auth/", post(token::obtain_token))
            .route("/api/info/", get(info::api_info))
            .with_state(host);

        let mut app = Self::health_routes().merge(api_routes);

        for custom_router in custom_routes {
            app = app.merge(custom_router);
        }

        Ok(app)
    }

    /// Build health check routes
    fn health_routes() -> Router {
        Router::new()
            .route("/health", get(Self::health_check))
            .route("/healthz", get(Self::health_check))
    }

    /// Health check endpoint handler
    async fn health_check() -> Json<Value> {
        Json(json!({
            "status": "ok",
            "service": "bookshelf"
        }))
    }
}

/// Parse a path id; anything but an integer addresses nothing
pub(crate) fn parse_id(raw: &str, entity_type: &str) -> ApiResult<i64> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::not_found(entity_type, raw))
}

/// Bare array, or the pagination envelope when a page was requested
pub(crate) fn list_response<T: Serialize>(rows: Vec<T>, page: Option<Page>) -> ApiResult<Response> {
    match page {
        Some(page) => Ok(Json(page.paginate(rows)?).into_response()),
        None => Ok(Json(rows).into_response()),
    }
}
