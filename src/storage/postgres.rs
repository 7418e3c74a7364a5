//! PostgreSQL storage backend using sqlx.
//!
//! # Feature flag
//!
//! This module is gated behind the `postgres` feature flag:
//! ```toml
//! [dependencies]
//! bookshelf-api = { version = "0.1", features = ["postgres"] }
//! ```
//!
//! Filters, search and ordering are translated into SQL with
//! `sqlx::QueryBuilder`; only whitelisted columns from
//! [`schema`](super::schema) ever reach the query text, values are bound.

use super::schema::{self, author_column, book_column};
use crate::core::error::{StorageError, StorageResult};
use crate::core::query::{FilterValue, ListQuery};
use crate::core::service::{AuthorService, BookService, UserService};
use crate::entities::{AuthToken, Author, AuthorDraft, Book, BookDraft, User};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};

const BACKEND: &str = "postgres";

const FOREIGN_KEY_VIOLATION: &str = "23503";
const UNIQUE_VIOLATION: &str = "23505";

type BookRow = (i64, String, i64, i32);
type UserRow = (i64, String, String, bool, DateTime<Utc>);
type TokenRow = (String, i64, DateTime<Utc>);

/// Apply the required tables and indexes (idempotent).
///
/// Safe to call on every startup.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for statement in schema::STATEMENTS {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| anyhow!("Failed to apply schema: {}", e))?;
    }
    Ok(())
}

fn book_from_row((id, title, author, publication_year): BookRow) -> Book {
    Book {
        id,
        title,
        author,
        publication_year,
    }
}

fn user_from_row((id, username, password_hash, is_active, date_joined): UserRow) -> User {
    User {
        id,
        username,
        password_hash,
        is_active,
        date_joined,
    }
}

fn token_from_row((key, user_id, created): TokenRow) -> AuthToken {
    AuthToken {
        key,
        user_id,
        created,
    }
}

/// Translate driver errors, turning constraint violations into domain errors
fn storage_error(e: sqlx::Error) -> StorageError {
    if let sqlx::Error::Database(db) = &e {
        match db.code().as_deref() {
            Some(FOREIGN_KEY_VIOLATION) => {
                return StorageError::Integrity {
                    field: "author".to_string(),
                    message: "Invalid pk - object does not exist.".to_string(),
                };
            }
            Some(UNIQUE_VIOLATION) => {
                return StorageError::Conflict {
                    message: db.message().to_string(),
                };
            }
            _ => {}
        }
    }
    StorageError::backend(BACKEND, e)
}

/// Escape LIKE wildcards so search terms match literally
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// Append WHERE and ORDER BY clauses for a list query
fn push_list_clauses(
    builder: &mut QueryBuilder<'_, Postgres>,
    query: &ListQuery,
    column: fn(&str) -> Option<&'static str>,
    tie_breaker: &str,
) {
    builder.push(" WHERE TRUE");

    for filter in &query.filters {
        let Some(col) = column(filter.field) else {
            continue;
        };
        builder.push(" AND ").push(col).push(" = ");
        match &filter.value {
            FilterValue::Text(value) => builder.push_bind(value.clone()),
            FilterValue::Integer(value) => builder.push_bind(*value),
        };
    }

    let search_columns: Vec<&str> = query
        .search_fields
        .iter()
        .filter_map(|field| column(field))
        .collect();
    if !search_columns.is_empty() {
        for term in &query.search_terms {
            builder.push(" AND (");
            for (i, col) in search_columns.iter().enumerate() {
                if i > 0 {
                    builder.push(" OR ");
                }
                builder
                    .push(*col)
                    .push(" ILIKE ")
                    .push_bind(like_pattern(term));
            }
            builder.push(")");
        }
    }

    builder.push(" ORDER BY ");
    for term in &query.ordering {
        if let Some(col) = column(term.field) {
            builder
                .push(col)
                .push(if term.descending { " DESC, " } else { " ASC, " });
        }
    }
    builder.push(tie_breaker).push(" ASC");
}

/// Datastore backed by a PostgreSQL connection pool
#[derive(Clone, Debug)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new `PostgresStore` with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect, then apply the schema
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| anyhow!("Failed to connect to PostgreSQL: {}", e))?;
        ensure_schema(&pool).await?;
        tracing::info!(max_connections, "Connected to PostgreSQL");
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl AuthorService for PostgresStore {
    async fn create_author(&self, draft: AuthorDraft) -> StorageResult<Author> {
        let (id, name) = sqlx::query_as::<_, (i64, String)>(
            "INSERT INTO authors (name) VALUES ($1) RETURNING id, name",
        )
        .bind(&draft.name)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(Author { id, name })
    }

    async fn get_author(&self, id: i64) -> StorageResult<Option<Author>> {
        let row = sqlx::query_as::<_, (i64, String)>("SELECT id, name FROM authors WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(row.map(|(id, name)| Author { id, name }))
    }

    async fn list_authors(&self, query: &ListQuery) -> StorageResult<Vec<Author>> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT id, name FROM authors");
        push_list_clauses(&mut builder, query, author_column, "id");
        let rows = builder
            .build_query_as::<(i64, String)>()
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(rows
            .into_iter()
            .map(|(id, name)| Author { id, name })
            .collect())
    }

    async fn update_author(&self, id: i64, draft: AuthorDraft) -> StorageResult<Author> {
        let row = sqlx::query_as::<_, (i64, String)>(
            "UPDATE authors SET name = $2 WHERE id = $1 RETURNING id, name",
        )
        .bind(id)
        .bind(&draft.name)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        row.map(|(id, name)| Author { id, name })
            .ok_or_else(|| StorageError::not_found("author", id))
    }

    async fn delete_author(&self, id: i64) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM authors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("author", id));
        }
        Ok(())
    }
}

#[async_trait]
impl BookService for PostgresStore {
    async fn create_book(&self, draft: BookDraft) -> StorageResult<Book> {
        let row = sqlx::query_as::<_, BookRow>(
            "INSERT INTO books (title, author_id, publication_year) VALUES ($1, $2, $3)
             RETURNING id, title, author_id, publication_year",
        )
        .bind(&draft.title)
        .bind(draft.author)
        .bind(draft.publication_year)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(book_from_row(row))
    }

    async fn get_book(&self, id: i64) -> StorageResult<Option<Book>> {
        let row = sqlx::query_as::<_, BookRow>(
            "SELECT id, title, author_id, publication_year FROM books WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(row.map(book_from_row))
    }

    async fn list_books(&self, query: &ListQuery) -> StorageResult<Vec<Book>> {
        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT b.id, b.title, b.author_id, b.publication_year \
             FROM books b JOIN authors a ON a.id = b.author_id",
        );
        push_list_clauses(&mut builder, query, book_column, "b.id");
        let rows = builder
            .build_query_as::<BookRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(rows.into_iter().map(book_from_row).collect())
    }

    async fn update_book(&self, id: i64, draft: BookDraft) -> StorageResult<Book> {
        let row = sqlx::query_as::<_, BookRow>(
            "UPDATE books SET title = $2, author_id = $3, publication_year = $4 WHERE id = $1
             RETURNING id, title, author_id, publication_year",
        )
        .bind(id)
        .bind(&draft.title)
        .bind(draft.author)
        .bind(draft.publication_year)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        row.map(book_from_row)
            .ok_or_else(|| StorageError::not_found("book", id))
    }

    async fn delete_book(&self, id: i64) -> StorageResult<()> {
        let result = sqlx::query("DELETE FROM books WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found("book", id));
        }
        Ok(())
    }
}

#[async_trait]
impl UserService for PostgresStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> StorageResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (username, password_hash) VALUES ($1, $2)
             RETURNING id, username, password_hash, is_active, date_joined",
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(user_from_row(row))
    }

    async fn get_user(&self, id: i64) -> StorageResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, is_active, date_joined FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(row.map(user_from_row))
    }

    async fn find_user_by_username(&self, username: &str) -> StorageResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, is_active, date_joined FROM users
             WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(row.map(user_from_row))
    }

    async fn get_or_create_token(&self, user_id: i64) -> StorageResult<AuthToken> {
        if self.get_user(user_id).await?.is_none() {
            return Err(StorageError::not_found("user", user_id));
        }

        let candidate = AuthToken::generate(user_id);
        sqlx::query(
            "INSERT INTO auth_tokens (key, user_id, created) VALUES ($1, $2, $3)
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(&candidate.key)
        .bind(candidate.user_id)
        .bind(candidate.created)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;

        let row = sqlx::query_as::<_, TokenRow>(
            "SELECT key, user_id, created FROM auth_tokens WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(token_from_row(row))
    }

    async fn find_token(&self, key: &str) -> StorageResult<Option<AuthToken>> {
        let row = sqlx::query_as::<_, TokenRow>(
            "SELECT key, user_id, created FROM auth_tokens WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(row.map(token_from_row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::query::QueryPolicy;
    use std::collections::HashMap;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("austen"), "%austen%");
    }

    #[test]
    fn test_list_clauses_bind_values() {
        let params = HashMap::from([
            ("publication_year".to_string(), "1813".to_string()),
            ("search".to_string(), "pride".to_string()),
            ("ordering".to_string(), "-publication_year,title".to_string()),
        ]);
        let query = QueryPolicy::books().parse(&params).unwrap();

        let mut builder = QueryBuilder::<Postgres>::new("SELECT b.id FROM books b");
        push_list_clauses(&mut builder, &query, book_column, "b.id");
        let sql = builder.sql();

        assert!(sql.contains("b.publication_year = $1"));
        assert!(sql.contains("(b.title ILIKE $2 OR a.name ILIKE $3)"));
        assert!(sql.ends_with("ORDER BY b.publication_year DESC, b.title ASC, b.id ASC"));
        assert!(!sql.contains("1813"));
    }
}
