//! Author endpoints

use super::{list_response, parse_id};
use crate::core::auth::PermissionTable;
use crate::core::error::{ApiError, ApiResult};
use crate::core::extractors::{Auth, Payload};
use crate::entities::{Author, AuthorPatch, AuthorPayload};
use crate::server::entity_registry::EntityDescriptor;
use crate::server::host::ServerHost;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{MethodRouter, get};
use std::collections::HashMap;
use std::sync::Arc;

const ENTITY: &str = "author";

/// `/api/authors/` resource
pub struct AuthorsResource;

impl EntityDescriptor for AuthorsResource {
    fn entity_type(&self) -> &str {
        ENTITY
    }

    fn collection_path(&self) -> &str {
        "/api/authors/"
    }

    fn item_path(&self) -> &str {
        "/api/authors/{id}/"
    }

    fn permissions(&self, host: &ServerHost) -> PermissionTable {
        host.permissions.authors
    }

    fn collection_routes(&self) -> MethodRouter<Arc<ServerHost>> {
        get(list_authors).post(create_author)
    }

    fn item_routes(&self) -> MethodRouter<Arc<ServerHost>> {
        get(get_author)
            .put(update_author)
            .patch(partial_update_author)
            .delete(delete_author)
    }
}

/// List authors, filterable and searchable by name
pub async fn list_authors(
    State(host): State<Arc<ServerHost>>,
    Query(params): Query<HashMap<String, String>>,
) -> ApiResult<Response> {
    let query = host.author_query.parse(&params)?;
    let authors = host.authors.list_authors(&query).await?;
    list_response(authors, query.page)
}

pub async fn get_author(
    State(host): State<Arc<ServerHost>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Author>> {
    let id = parse_id(&id, ENTITY)?;
    let author = host
        .authors
        .get_author(id)
        .await?
        .ok_or_else(|| ApiError::not_found(ENTITY, id))?;
    Ok(Json(author))
}

pub async fn create_author(
    State(host): State<Arc<ServerHost>>,
    Auth(auth): Auth,
    Payload(payload): Payload<AuthorPayload>,
) -> ApiResult<(StatusCode, Json<Author>)> {
    let draft = payload.into_draft()?;
    let author = host.authors.create_author(draft).await?;
    tracing::info!(author_id = %author.id, user = %auth.principal(), "Author created");
    Ok((StatusCode::CREATED, Json(author)))
}

pub async fn update_author(
    State(host): State<Arc<ServerHost>>,
    Auth(auth): Auth,
    Path(id): Path<String>,
    Payload(payload): Payload<AuthorPayload>,
) -> ApiResult<Json<Author>> {
    let id = parse_id(&id, ENTITY)?;
    let draft = payload.into_draft()?;
    let author = host.authors.update_author(id, draft).await?;
    tracing::info!(author_id = %id, user = %auth.principal(), "Author updated");
    Ok(Json(author))
}

pub async fn partial_update_author(
    State(host): State<Arc<ServerHost>>,
    Auth(auth): Auth,
    Path(id): Path<String>,
    Payload(patch): Payload<AuthorPatch>,
) -> ApiResult<Json<Author>> {
    let id = parse_id(&id, ENTITY)?;
    let current = host
        .authors
        .get_author(id)
        .await?
        .ok_or_else(|| ApiError::not_found(ENTITY, id))?;
    let draft = patch.apply_to(&current)?;
    let author = host.authors.update_author(id, draft).await?;
    tracing::info!(author_id = %id, user = %auth.principal(), "Author partially updated");
    Ok(Json(author))
}

pub async fn delete_author(
    State(host): State<Arc<ServerHost>>,
    Auth(auth): Auth,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_id(&id, ENTITY)?;
    host.authors.delete_author(id).await?;
    tracing::info!(author_id = %id, user = %auth.principal(), "Author and their books deleted");
    Ok(StatusCode::NO_CONTENT)
}
