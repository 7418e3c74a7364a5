//! Core module containing fundamental traits and types of the API

pub mod auth;
pub mod entity;
pub mod error;
pub mod extractors;
pub mod field;
pub mod query;
pub mod service;

pub use auth::{
    AuthContext, AuthPolicy, AuthProvider, Operation, PermissionTable, Target, TokenAuthProvider,
};
pub use entity::{Data, Entity};
pub use error::{ApiError, ApiResult, StorageError, StorageResult};
pub use extractors::{Auth, Payload, PermissionGuard, require_permission};
pub use field::FieldValue;
pub use query::{ListQuery, PaginatedResponse, QueryPolicy};
pub use service::{AuthorService, BookService, Datastore, UserService};
