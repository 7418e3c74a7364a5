//! # Bookshelf API
//!
//! A REST API over a catalogue of books and their authors, with token
//! authentication.
//!
//! ## Features
//!
//! - **CRUD resources**: books (`/api/books_all/`) and authors (`/api/authors/`)
//! - **Query layer**: exact filters, multi-term search, ordering and optional
//!   pagination, declared per resource as a [`QueryPolicy`](core::QueryPolicy)
//! - **Token auth**: `POST /api-token-auth/` issues an opaque token; writes
//!   require `Authorization: Token <key>`
//! - **Permission tables**: one policy per operation, overridable from YAML
//! - **Storage backends**: in-memory, or PostgreSQL with the `postgres` feature
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bookshelf::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     ServerBuilder::new()
//!         .with_store(InMemoryStore::new())
//!         .serve("127.0.0.1:8000")
//!         .await
//! }
//! ```

pub mod config;
pub mod core;
pub mod entities;
pub mod server;
pub mod storage;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core ===
    pub use crate::core::{
        ApiError, ApiResult, AuthContext, AuthPolicy, AuthProvider, AuthorService, BookService,
        Data, Datastore, Entity, FieldValue, ListQuery, Operation, PermissionTable, QueryPolicy,
        StorageError, StorageResult, TokenAuthProvider, UserService,
    };

    // === Entities ===
    pub use crate::entities::{Author, AuthorDraft, Book, BookDraft, User};

    // === Storage ===
    pub use crate::storage::InMemoryStore;
    #[cfg(feature = "postgres")]
    pub use crate::storage::PostgresStore;

    // === Config ===
    pub use crate::config::AppConfig;

    // === Server ===
    pub use crate::server::{EntityDescriptor, EntityRegistry, ServerBuilder, ServerHost};

    // === External dependencies ===
    pub use anyhow::Result;
    pub use async_trait::async_trait;
}
