//! Entities exposed by the API and their request payloads

pub mod author;
pub mod book;
pub mod macros;
pub mod patch;
pub mod user;

pub use author::{Author, AuthorDraft, AuthorPatch, AuthorPayload};
pub use book::{Book, BookDraft, BookPatch, BookPayload, BookRecord};
pub use patch::PatchField;
pub use user::{AuthToken, TokenRequest, TokenResponse, User};
