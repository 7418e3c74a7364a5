//! Relational schema owned by the storage layer
//!
//! Statements are idempotent and applied in order on every startup.

/// DDL applied by SQL backends, in dependency order
pub const STATEMENTS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS authors (
        id BIGSERIAL PRIMARY KEY,
        name VARCHAR(100) NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS books (
        id BIGSERIAL PRIMARY KEY,
        title VARCHAR(200) NOT NULL,
        author_id BIGINT NOT NULL REFERENCES authors(id) ON DELETE CASCADE,
        publication_year INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_books_author_id ON books (author_id)",
    "CREATE INDEX IF NOT EXISTS idx_books_title ON books (title)",
    "CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        username VARCHAR(150) NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        is_active BOOLEAN NOT NULL DEFAULT TRUE,
        date_joined TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE TABLE IF NOT EXISTS auth_tokens (
        key CHAR(32) PRIMARY KEY,
        user_id BIGINT NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE,
        created TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
];

/// Map an API field name to its SQL column expression
///
/// Book queries join `authors a` onto `books b`.
pub fn book_column(field: &str) -> Option<&'static str> {
    match field {
        "id" => Some("b.id"),
        "title" => Some("b.title"),
        "author" => Some("b.author_id"),
        "author__name" => Some("a.name"),
        "publication_year" => Some("b.publication_year"),
        _ => None,
    }
}

/// Map an API field name to its SQL column on `authors`
pub fn author_column(field: &str) -> Option<&'static str> {
    match field {
        "id" => Some("id"),
        "name" => Some("name"),
        _ => None,
    }
}
