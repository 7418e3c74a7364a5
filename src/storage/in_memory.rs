//! In-memory datastore for testing and development

use crate::core::error::{StorageError, StorageResult};
use crate::core::query::ListQuery;
use crate::core::service::{AuthorService, BookService, UserService};
use crate::entities::{AuthToken, Author, AuthorDraft, Book, BookDraft, BookRecord, User};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

const BACKEND: &str = "in-memory";

/// All tables, guarded together so reference checks and writes are atomic
#[derive(Debug, Default)]
struct Tables {
    authors: BTreeMap<i64, Author>,
    books: BTreeMap<i64, Book>,
    users: BTreeMap<i64, User>,
    tokens: BTreeMap<String, AuthToken>,
    next_author_id: i64,
    next_book_id: i64,
    next_user_id: i64,
}

impl Tables {
    fn require_author(&self, id: i64) -> StorageResult<&Author> {
        self.authors.get(&id).ok_or_else(|| StorageError::Integrity {
            field: "author".to_string(),
            message: format!("Invalid pk \"{}\" - object does not exist.", id),
        })
    }

    fn record(&self, book: &Book) -> BookRecord {
        let author_name = self
            .authors
            .get(&book.author)
            .map(|a| a.name.clone())
            .unwrap_or_default();
        BookRecord::new(book.clone(), author_name)
    }
}

fn next_id(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

/// In-memory implementation of every service trait
///
/// Useful for testing and development. Uses RwLock for thread-safe access.
/// Clones share the same tables.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    /// Create a new, empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|e| StorageError::backend(BACKEND, format!("Failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|e| StorageError::backend(BACKEND, format!("Failed to acquire write lock: {}", e)))
    }
}

#[async_trait]
impl AuthorService for InMemoryStore {
    async fn create_author(&self, draft: AuthorDraft) -> StorageResult<Author> {
        let mut tables = self.write()?;
        let author = Author {
            id: next_id(&mut tables.next_author_id),
            name: draft.name,
        };
        tables.authors.insert(author.id, author.clone());
        Ok(author)
    }

    async fn get_author(&self, id: i64) -> StorageResult<Option<Author>> {
        Ok(self.read()?.authors.get(&id).cloned())
    }

    async fn list_authors(&self, query: &ListQuery) -> StorageResult<Vec<Author>> {
        let tables = self.read()?;
        Ok(query.apply(tables.authors.values().cloned()))
    }

    async fn update_author(&self, id: i64, draft: AuthorDraft) -> StorageResult<Author> {
        let mut tables = self.write()?;
        let author = tables
            .authors
            .get_mut(&id)
            .ok_or_else(|| StorageError::not_found("author", id))?;
        author.name = draft.name;
        Ok(author.clone())
    }

    async fn delete_author(&self, id: i64) -> StorageResult<()> {
        let mut tables = self.write()?;
        if tables.authors.remove(&id).is_none() {
            return Err(StorageError::not_found("author", id));
        }
        tables.books.retain(|_, book| book.author != id);
        Ok(())
    }
}

#[async_trait]
impl BookService for InMemoryStore {
    async fn create_book(&self, draft: BookDraft) -> StorageResult<Book> {
        let mut tables = self.write()?;
        tables.require_author(draft.author)?;
        let book = Book {
            id: next_id(&mut tables.next_book_id),
            title: draft.title,
            author: draft.author,
            publication_year: draft.publication_year,
        };
        tables.books.insert(book.id, book.clone());
        Ok(book)
    }

    async fn get_book(&self, id: i64) -> StorageResult<Option<Book>> {
        Ok(self.read()?.books.get(&id).cloned())
    }

    async fn list_books(&self, query: &ListQuery) -> StorageResult<Vec<Book>> {
        let tables = self.read()?;
        let records = tables.books.values().map(|book| tables.record(book));
        Ok(query
            .apply(records)
            .into_iter()
            .map(BookRecord::into_book)
            .collect())
    }

    async fn update_book(&self, id: i64, draft: BookDraft) -> StorageResult<Book> {
        let mut tables = self.write()?;
        if !tables.books.contains_key(&id) {
            return Err(StorageError::not_found("book", id));
        }
        tables.require_author(draft.author)?;
        let book = Book {
            id,
            title: draft.title,
            author: draft.author,
            publication_year: draft.publication_year,
        };
        tables.books.insert(id, book.clone());
        Ok(book)
    }

    async fn delete_book(&self, id: i64) -> StorageResult<()> {
        self.write()?
            .books
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found("book", id))
    }
}

#[async_trait]
impl UserService for InMemoryStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> StorageResult<User> {
        let mut tables = self.write()?;
        if tables.users.values().any(|u| u.username == username) {
            return Err(StorageError::Conflict {
                message: format!("A user with username \"{}\" already exists.", username),
            });
        }
        let user = User {
            id: next_id(&mut tables.next_user_id),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            is_active: true,
            date_joined: Utc::now(),
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> StorageResult<Option<User>> {
        Ok(self.read()?.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn get_or_create_token(&self, user_id: i64) -> StorageResult<AuthToken> {
        let mut tables = self.write()?;
        if !tables.users.contains_key(&user_id) {
            return Err(StorageError::not_found("user", user_id));
        }
        if let Some(token) = tables.tokens.values().find(|t| t.user_id == user_id) {
            return Ok(token.clone());
        }
        let token = AuthToken::generate(user_id);
        tables.tokens.insert(token.key.clone(), token.clone());
        Ok(token)
    }

    async fn find_token(&self, key: &str) -> StorageResult<Option<AuthToken>> {
        Ok(self.read()?.tokens.get(key).cloned())
    }
}
