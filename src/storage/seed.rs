//! Startup data seeding
//!
//! Applying the same seed twice leaves the store unchanged: users are
//! matched by username, authors by name, books by title and author.

use crate::config::SeedConfig;
use crate::core::auth::hash_password;
use crate::core::query::{FilterValue, ListQuery};
use crate::core::service::Datastore;
use crate::entities::{AuthorDraft, BookDraft};
use anyhow::{Result, anyhow};
use std::collections::HashMap;

/// Counts of rows created by one seeding pass
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub users: usize,
    pub authors: usize,
    pub books: usize,
}

pub async fn apply_seed<S: Datastore + ?Sized>(store: &S, seed: &SeedConfig) -> Result<SeedReport> {
    let mut report = SeedReport::default();
    if seed.is_empty() {
        tracing::debug!("No seed data configured");
        return Ok(report);
    }

    for user in &seed.users {
        if store.find_user_by_username(&user.username).await?.is_some() {
            continue;
        }
        let password = user.password.clone();
        let hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;
        store.create_user(&user.username, &hash).await?;
        tracing::info!(user = %user.username, "Seeded user");
        report.users += 1;
    }

    let mut author_ids: HashMap<String, i64> = HashMap::new();
    let author_names = seed
        .authors
        .iter()
        .map(|a| a.name.as_str())
        .chain(seed.books.iter().map(|b| b.author.as_str()));

    for name in author_names {
        if author_ids.contains_key(name) {
            continue;
        }
        let query = ListQuery::default().with_filter("name", FilterValue::Text(name.to_string()));
        let id = match store.list_authors(&query).await?.into_iter().next() {
            Some(existing) => existing.id,
            None => {
                let author = store
                    .create_author(AuthorDraft {
                        name: name.to_string(),
                    })
                    .await?;
                tracing::info!(author_id = author.id, name, "Seeded author");
                report.authors += 1;
                author.id
            }
        };
        author_ids.insert(name.to_string(), id);
    }

    for book in &seed.books {
        let author = *author_ids
            .get(&book.author)
            .ok_or_else(|| anyhow!("Seed book '{}' has no author", book.title))?;
        let query = ListQuery::default()
            .with_filter("title", FilterValue::Text(book.title.clone()))
            .with_filter("author", FilterValue::Integer(author));
        if !store.list_books(&query).await?.is_empty() {
            continue;
        }
        let created = store
            .create_book(BookDraft {
                title: book.title.clone(),
                author,
                publication_year: book.publication_year,
            })
            .await?;
        tracing::info!(book_id = created.id, title = %created.title, "Seeded book");
        report.books += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SeedAuthor, SeedBook, SeedUser};
    use crate::core::auth::verify_password;
    use crate::core::service::{AuthorService, BookService, UserService};
    use crate::storage::InMemoryStore;

    fn seed() -> SeedConfig {
        SeedConfig {
            users: vec![SeedUser {
                username: "admin".to_string(),
                password: "secret".to_string(),
            }],
            authors: vec![SeedAuthor {
                name: "Charlotte Brontë".to_string(),
            }],
            books: vec![
                SeedBook {
                    title: "Pride and Prejudice".to_string(),
                    author: "Jane Austen".to_string(),
                    publication_year: 1813,
                },
                SeedBook {
                    title: "Emma".to_string(),
                    author: "Jane Austen".to_string(),
                    publication_year: 1815,
                },
            ],
        }
    }

    #[tokio::test]
    async fn test_seed_creates_rows() {
        let store = InMemoryStore::new();
        let report = apply_seed(&store, &seed()).await.unwrap();
        assert_eq!(
            report,
            SeedReport {
                users: 1,
                authors: 2,
                books: 2
            }
        );

        let admin = store.find_user_by_username("admin").await.unwrap().unwrap();
        assert!(verify_password(&admin.password_hash, "secret"));
        assert_eq!(store.list_authors(&ListQuery::default()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_seed_leaves_store_untouched() {
        let store = InMemoryStore::new();
        let report = apply_seed(&store, &SeedConfig::default()).await.unwrap();
        assert_eq!(report, SeedReport::default());
        assert!(store.list_authors(&ListQuery::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let store = InMemoryStore::new();
        apply_seed(&store, &seed()).await.unwrap();
        let second = apply_seed(&store, &seed()).await.unwrap();
        assert_eq!(second, SeedReport::default());
        assert_eq!(store.list_books(&ListQuery::default()).await.unwrap().len(), 2);
    }
}
