//! Router builder utilities for guarded resource routes

use super::host::ServerHost;
use crate::core::auth::{PermissionTable, Target};
use crate::core::extractors::{PermissionGuard, require_permission};
use axum::Router;
use axum::middleware::from_fn_with_state;
use axum::routing::MethodRouter;
use std::sync::Arc;

/// Mount `routes` at `path` behind the permission guard
///
/// The guard is a route layer: it only runs for matched methods, so
/// unsupported verbs still answer 405 and unknown paths 404.
pub fn guarded_routes(
    host: &Arc<ServerHost>,
    path: &str,
    target: Target,
    permissions: PermissionTable,
    routes: MethodRouter<Arc<ServerHost>>,
) -> Router<Arc<ServerHost>> {
    let guard = PermissionGuard::new(host.auth.clone(), permissions, target);
    Router::new().route(
        path,
        routes.route_layer(from_fn_with_state(guard, require_permission)),
    )
}
