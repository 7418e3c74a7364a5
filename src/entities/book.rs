//! Book entity

use super::author::missing;
use super::patch::{PatchField, null_check, reject_nulls};
use crate::core::error::ApiError;
use crate::{impl_data_fields, impl_entity};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A book; `author` holds the id of an existing [`Author`](super::Author)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: i64,
    pub title: String,
    pub author: i64,
    pub publication_year: i32,
}

impl_entity!(Book);

/// A book joined with its author's name.
///
/// This is the row shape the query layer works on, so that `author__name`
/// can be filtered and searched without a second lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookRecord {
    pub id: i64,
    pub book: Book,
    pub author_name: String,
}

impl BookRecord {
    pub fn new(book: Book, author_name: impl Into<String>) -> Self {
        Self {
            id: book.id,
            book,
            author_name: author_name.into(),
        }
    }

    pub fn into_book(self) -> Book {
        self.book
    }
}

impl_entity!(BookRecord);

impl_data_fields!(BookRecord, {
    "title" => |row| row.book.title.as_str(),
    "author" => |row| row.book.author,
    "author__name" => |row| row.author_name.as_str(),
    "publication_year" => |row| row.book.publication_year,
});

/// Validated values for creating or replacing a book
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookDraft {
    pub title: String,
    pub author: i64,
    pub publication_year: i32,
}

/// Body of `POST /api/books_all/` and `PUT /api/books_all/{id}/`
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct BookPayload {
    #[validate(
        required(message = "This field is required."),
        length(min = 1, max = 200, message = "Ensure this field has between 1 and 200 characters.")
    )]
    pub title: Option<String>,

    #[validate(required(message = "This field is required."))]
    pub author: Option<i64>,

    #[validate(required(message = "This field is required."))]
    pub publication_year: Option<i32>,
}

impl BookPayload {
    pub fn into_draft(self) -> Result<BookDraft, ApiError> {
        self.validate()?;
        match (self.title, self.author, self.publication_year) {
            (Some(title), Some(author), Some(publication_year)) => Ok(BookDraft {
                title,
                author,
                publication_year,
            }),
            _ => Err(missing(&["title", "author", "publication_year"])),
        }
    }
}

/// Body of `PATCH /api/books_all/{id}/`; absent fields keep their value
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BookPatch {
    pub title: PatchField<String>,
    pub author: PatchField<i64>,
    pub publication_year: PatchField<i32>,
}

impl BookPatch {
    /// Merge the patch over the stored book, then validate the result
    pub fn apply_to(self, current: &Book) -> Result<BookDraft, ApiError> {
        reject_nulls(&[
            null_check("title", &self.title),
            null_check("author", &self.author),
            null_check("publication_year", &self.publication_year),
        ])?;
        BookPayload {
            title: self.title.or_current(|| current.title.clone()),
            author: self.author.or_current(|| current.author),
            publication_year: self.publication_year.or_current(|| current.publication_year),
        }
        .into_draft()
    }
}
