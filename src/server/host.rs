//! Server host for transport-agnostic API exposure
//!
//! The host holds every piece of shared state a handler may need: the
//! storage services as trait objects, the auth provider, and the per
//! resource permission tables and query policies. It is built once and
//! shared as `Arc<ServerHost>`.

use crate::config::{PaginationConfig, PermissionsConfig};
use crate::core::auth::{AuthProvider, TokenAuthProvider};
use crate::core::query::QueryPolicy;
use crate::core::service::{AuthorService, BookService, Datastore, UserService};
use std::sync::Arc;

/// Host context containing all framework state
pub struct ServerHost {
    pub authors: Arc<dyn AuthorService>,
    pub books: Arc<dyn BookService>,
    pub users: Arc<dyn UserService>,

    /// Resolves request credentials
    pub auth: Arc<dyn AuthProvider>,

    pub permissions: PermissionsConfig,
    pub book_query: QueryPolicy,
    pub author_query: QueryPolicy,
}

impl ServerHost {
    /// Build the host from individual services
    pub fn from_parts(
        authors: Arc<dyn AuthorService>,
        books: Arc<dyn BookService>,
        users: Arc<dyn UserService>,
        auth: Arc<dyn AuthProvider>,
        permissions: PermissionsConfig,
        pagination: PaginationConfig,
    ) -> Self {
        Self {
            authors,
            books,
            users,
            auth,
            permissions,
            book_query: QueryPolicy::books()
                .with_page_sizes(pagination.default_page_size, pagination.max_page_size),
            author_query: QueryPolicy::authors()
                .with_page_sizes(pagination.default_page_size, pagination.max_page_size),
        }
    }

    /// Build the host around one datastore, authenticating with its tokens
    pub fn from_store(
        store: Arc<impl Datastore>,
        permissions: PermissionsConfig,
        pagination: PaginationConfig,
    ) -> Self {
        let users: Arc<dyn UserService> = store.clone();
        Self::from_parts(
            store.clone(),
            store,
            users.clone(),
            Arc::new(TokenAuthProvider::new(users)),
            permissions,
            pagination,
        )
    }
}
