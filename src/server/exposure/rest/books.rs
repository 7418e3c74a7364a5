//! Book endpoints

use super::{list_response, parse_id};
use crate::core::auth::PermissionTable;
use crate::core::error::{ApiError, ApiResult};
use crate::core::extractors::{Auth, Payload};
use crate::entities::{Book, BookPatch, BookPayload};
use crate::server::entity_registry::EntityDescriptor;
use crate::server::host::ServerHost;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{MethodRouter, get};
use std::collections::HashMap;
use std::sync::Arc;

const ENTITY: &str = "book";

/// `/api/books_all/` resource
pub struct BooksResource;

impl EntityDescriptor for BooksResource {
    fn entity_type(&self) -> &str {
        ENTITY
    }

    fn collection_path(&self) -> &str {
        "/api/books_all/"
    }

    fn item_path(&self) -> &str {
        "/api/books_all/{id}/"
    }

    fn permissions(&self, host: &ServerHost) -> PermissionTable {
        host.permissions.books
    }

    fn collection_routes(&self) -> MethodRouter<Arc<ServerHost>> {
        get(list_books).post(create_book)
    }

    fn item_routes(&self) -> MethodRouter<Arc<ServerHost>> {
        get(get_book)
            .put(update_book)
            .patch(partial_update_book)
            .delete(delete_book)
    }
}

/// List books with filters, search, ordering and optional pagination
pub async fn list_books(
    State(host): State<Arc<ServerHost>>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Response> {
    let query = host.book_query.parse(&params)?;
    let books = host.books.list_books(&query).await?;
    list_response(books, query.page)
}

pub async fn get_book(
    State(host): State<Arc<ServerHost>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Book>> {
    let id = parse_id(&id, ENTITY)?;
    let book = host
        .books
        .get_book(id)
        .await?
        .ok_or_else(|| ApiError::not_found(ENTITY, id))?;
    Ok(Json(book))
}

pub async fn create_book(
    State(host): State<Arc<ServerHost>>,
    Auth(auth): Auth,
    Payload(payload): Payload<BookPayload>,
) -> ApiResult<(StatusCode, Json<Book>)> {
    let draft = payload.into_draft()?;
    let book = host.books.create_book(draft).await?;
    tracing::info!(book_id = %book.id, user = %auth.principal(), "Book created");
    Ok((StatusCode::CREATED, Json(book)))
}

pub async fn update_book(
    State(host): State<Arc<ServerHost>>,
    Auth(auth): Auth,
    Path(id): Path<String>,
    Payload(payload): Payload<BookPayload>,
) -> ApiResult<Json<Book>> {
    let id = parse_id(&id, ENTITY)?;
    let draft = payload.into_draft()?;
    let book = host.books.update_book(id, draft).await?;
    tracing::info!(book_id = %id, user = %auth.principal(), "Book updated");
    Ok(Json(book))
}

pub async fn partial_update_book(
    State(host): State<Arc<ServerHost>>,
    Auth(auth): Auth,
    Path(id): Path<String>,
    Payload(patch): Payload<BookPatch>,
) -> ApiResult<Json<Book>> {
    let id = parse_id(&id, ENTITY)?;
    let current = host
        .books
        .get_book(id)
        .await?
        .ok_or_else(|| ApiError::not_found(ENTITY, id))?;
    let draft = patch.apply_to(&current)?;
    let book = host.books.update_book(id, draft).await?;
    tracing::info!(book_id = %id, user = %auth.principal(), "Book partially updated");
    Ok(Json(book))
}

pub async fn delete_book(
    State(host): State<Arc<ServerHost>>,
    Auth(auth): Auth,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id, ENTITY)?;
    host.books.delete_book(id).await?;
    tracing::info!(book_id = %id, user = %auth.principal(), "Book deleted");
    Ok(StatusCode::NO_CONTENT)
}
