//! Service traits implemented by every storage backend
//!
//! Handlers only ever see these traits, through the `Arc<dyn ...>` handles
//! held by the server host. The framework is agnostic to the underlying
//! storage mechanism.

use crate::core::error::StorageResult;
use crate::core::query::ListQuery;
use crate::entities::{AuthToken, Author, AuthorDraft, Book, BookDraft, User};
use async_trait::async_trait;

/// Storage of authors
#[async_trait]
pub trait AuthorService: Send + Sync {
    /// Create a new author
    async fn create_author(&self, draft: AuthorDraft) -> StorageResult<Author>;

    /// Get an author by ID
    async fn get_author(&self, id: i64) -> StorageResult<Option<Author>>;

    /// List authors matching a query, in query order
    async fn list_authors(&self, query: &ListQuery) -> StorageResult<Vec<Author>>;

    /// Replace an author's fields
    async fn update_author(&self, id: i64, draft: AuthorDraft) -> StorageResult<Author>;

    /// Delete an author and every book referencing it
    async fn delete_author(&self, id: i64) -> StorageResult<()>;
}

/// Storage of books
///
/// Writes must fail with `StorageError::Integrity { field: "author", .. }`
/// when the referenced author does not exist, atomically with the write.
#[async_trait]
pub trait BookService: Send + Sync {
    /// Create a new book
    async fn create_book(&self, draft: BookDraft) -> StorageResult<Book>;

    /// Get a book by ID
    async fn get_book(&self, id: i64) -> StorageResult<Option<Book>>;

    /// List books matching a query, in query order
    async fn list_books(&self, query: &ListQuery) -> StorageResult<Vec<Book>>;

    /// Replace a book's fields
    async fn update_book(&self, id: i64, draft: BookDraft) -> StorageResult<Book>;

    /// Delete a book
    async fn delete_book(&self, id: i64) -> StorageResult<()>;
}

/// Storage of users and their tokens
#[async_trait]
pub trait UserService: Send + Sync {
    /// Create a user; fails with `StorageError::Conflict` on a taken username
    async fn create_user(&self, username: &str, password_hash: &str) -> StorageResult<User>;

    /// Get a user by ID
    async fn get_user(&self, id: i64) -> StorageResult<Option<User>>;

    /// Find a user by exact username
    async fn find_user_by_username(&self, username: &str) -> StorageResult<Option<User>>;

    /// Return the user's token, issuing one on first call
    async fn get_or_create_token(&self, user_id: i64) -> StorageResult<AuthToken>;

    /// Resolve a token key
    async fn find_token(&self, key: &str) -> StorageResult<Option<AuthToken>>;
}

/// A complete backend: one schema, one connection lifecycle
pub trait Datastore: AuthorService + BookService + UserService + 'static {}

impl<T> Datastore for T where T: AuthorService + BookService + UserService + 'static {}
