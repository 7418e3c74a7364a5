//! Query policy, list query parsing and pagination
//!
//! A [`QueryPolicy`] states which fields of a collection may be filtered,
//! searched and ordered. Parsing the raw query string against that policy
//! yields a [`ListQuery`] that every storage backend knows how to execute:
//! the in-memory store evaluates it directly, the SQL store translates it.
//!
//! ```text
//! GET /api/books_all/?author__name=Jane%20Austen&search=pride&ordering=-publication_year
//! ```
//!
//! - Filters are exact matches and compose with AND.
//! - The search term is split on whitespace and commas; every term must match
//!   at least one search field (case-insensitive substring).
//! - Ordering accepts a comma-separated list, `-` for descending. Fields not
//!   allowed by the policy are dropped; when nothing valid remains the
//!   policy's default ordering applies.
//! - Unknown parameters are ignored.

use crate::core::entity::Data;
use crate::core::error::{EntityError, ValidationError};
use crate::core::field::FieldValue;
use regex::Regex;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Query parameter carrying the search term
pub const SEARCH_PARAM: &str = "search";
/// Query parameter carrying the ordering expression
pub const ORDERING_PARAM: &str = "ordering";
/// Query parameter enabling pagination
pub const PAGE_PARAM: &str = "page";
/// Query parameter overriding the page size
pub const PAGE_SIZE_PARAM: &str = "page_size";

/// How a filter value is parsed from the query string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
}

/// A field that accepts exact-match filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterField {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// Filter, search and ordering capabilities of one collection
#[derive(Debug, Clone)]
pub struct QueryPolicy {
    pub filter_fields: &'static [FilterField],
    pub search_fields: &'static [&'static str],
    pub ordering_fields: &'static [&'static str],
    pub default_ordering: &'static [&'static str],
    pub default_page_size: usize,
    pub max_page_size: usize,
}

const BOOK_FILTERS: &[FilterField] = &[
    FilterField {
        name: "title",
        kind: FieldKind::Text,
    },
    FilterField {
        name: "author__name",
        kind: FieldKind::Text,
    },
    FilterField {
        name: "publication_year",
        kind: FieldKind::Integer,
    },
];

const AUTHOR_FILTERS: &[FilterField] = &[FilterField {
    name: "name",
    kind: FieldKind::Text,
}];

impl QueryPolicy {
    /// Policy of the book collection
    pub const fn books() -> Self {
        Self {
            filter_fields: BOOK_FILTERS,
            search_fields: &["title", "author__name"],
            ordering_fields: &["title", "publication_year"],
            default_ordering: &["title"],
            default_page_size: 20,
            max_page_size: 100,
        }
    }

    /// Policy of the author collection
    pub const fn authors() -> Self {
        Self {
            filter_fields: AUTHOR_FILTERS,
            search_fields: &["name"],
            ordering_fields: &["name"],
            default_ordering: &["name"],
            default_page_size: 20,
            max_page_size: 100,
        }
    }

    /// Override the page sizes (from configuration)
    pub fn with_page_sizes(mut self, default_page_size: usize, max_page_size: usize) -> Self {
        self.max_page_size = max_page_size.max(1);
        self.default_page_size = default_page_size.clamp(1, self.max_page_size);
        self
    }

    /// Parse raw query parameters into a [`ListQuery`]
    pub fn parse(&self, params: &HashMap<String, String>) -> Result<ListQuery, ValidationError> {
        let mut filters = Vec::new();
        for field in self.filter_fields {
            let Some(raw) = params.get(field.name) else {
                continue;
            };
            // NUL bytes cannot be stored in any column
            let raw = raw.replace('\0', "");
            if raw.is_empty() {
                continue;
            }
            let value = match field.kind {
                FieldKind::Text => FilterValue::Text(raw),
                FieldKind::Integer => {
                    let parsed = raw.trim().parse::<i64>().map_err(|_| {
                        ValidationError::FieldError {
                            field: field.name.to_string(),
                            message: "Enter a whole number.".to_string(),
                        }
                    })?;
                    FilterValue::Integer(parsed)
                }
            };
            filters.push(Filter {
                field: field.name,
                value,
            });
        }

        let search_terms = params
            .get(SEARCH_PARAM)
            .map(|raw| split_search_terms(raw))
            .unwrap_or_default();

        let ordering = params
            .get(ORDERING_PARAM)
            .map(|raw| self.parse_ordering(raw))
            .filter(|terms| !terms.is_empty())
            .unwrap_or_else(|| self.default_ordering_terms());

        let page = match params.get(PAGE_PARAM) {
            Some(raw) => Some(self.parse_page(raw, params.get(PAGE_SIZE_PARAM))?),
            None => None,
        };

        Ok(ListQuery {
            filters,
            search_terms,
            search_fields: self.search_fields,
            ordering,
            page,
        })
    }

    fn parse_ordering(&self, raw: &str) -> Vec<OrderingTerm> {
        raw.split(',')
            .filter_map(|term| {
                let term = term.trim();
                let (name, descending) = match term.strip_prefix('-') {
                    Some(name) => (name, true),
                    None => (term, false),
                };
                self.ordering_fields
                    .iter()
                    .find(|allowed| **allowed == name)
                    .map(|field| OrderingTerm {
                        field: *field,
                        descending,
                    })
            })
            .collect()
    }

    fn default_ordering_terms(&self) -> Vec<OrderingTerm> {
        self.default_ordering
            .iter()
            .map(|field| OrderingTerm {
                field: *field,
                descending: false,
            })
            .collect()
    }

    fn parse_page(&self, raw: &str, size: Option<&String>) -> Result<Page, ValidationError> {
        let number = raw
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|n| *n >= 1)
            .ok_or_else(|| ValidationError::FieldError {
                field: PAGE_PARAM.to_string(),
                message: "Invalid page.".to_string(),
            })?;

        // An unparsable page size falls back to the default
        let size = size
            .and_then(|s| s.trim().parse::<usize>().ok())
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size);

        Ok(Page { number, size })
    }
}

fn search_separator() -> &'static Regex {
    static SEPARATOR: OnceLock<Regex> = OnceLock::new();
    SEPARATOR.get_or_init(|| Regex::new(r"[\s,]+").expect("valid search separator regex"))
}

fn split_search_terms(raw: &str) -> Vec<String> {
    let cleaned = raw.replace('\0', "");
    search_separator()
        .split(&cleaned)
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

/// A parsed filter value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Integer(i64),
}

impl FilterValue {
    /// Exact match against a field value
    pub fn matches(&self, value: &FieldValue) -> bool {
        match (self, value) {
            (FilterValue::Text(expected), FieldValue::String(actual)) => expected == actual,
            (FilterValue::Integer(expected), FieldValue::Integer(actual)) => expected == actual,
            _ => false,
        }
    }
}

/// One exact-match constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub field: &'static str,
    pub value: FilterValue,
}

/// One ordering key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderingTerm {
    pub field: &'static str,
    pub descending: bool,
}

/// Requested page (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub size: usize,
}

impl Page {
    /// Slice an already filtered and ordered collection
    ///
    /// The first page always exists, even when empty; any other page past
    /// the end is [`EntityError::PageNotFound`].
    pub fn paginate<T>(&self, rows: Vec<T>) -> Result<PaginatedResponse<T>, EntityError> {
        let total = rows.len();
        let start = (self.number - 1).saturating_mul(self.size);
        if self.number > 1 && start >= total {
            return Err(EntityError::PageNotFound { page: self.number });
        }
        let data = rows.into_iter().skip(start).take(self.size).collect();

        Ok(PaginatedResponse {
            data,
            pagination: PaginationMeta::new(self.number, self.size, total),
        })
    }
}

/// A backend-independent list query
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub filters: Vec<Filter>,
    pub search_terms: Vec<String>,
    pub search_fields: &'static [&'static str],
    pub ordering: Vec<OrderingTerm>,
    pub page: Option<Page>,
}

impl ListQuery {
    /// Add an exact-match constraint
    pub fn with_filter(mut self, field: &'static str, value: FilterValue) -> Self {
        self.filters.push(Filter { field, value });
        self
    }

    /// Does a row satisfy every filter and every search term?
    pub fn matches<T: Data>(&self, row: &T) -> bool {
        let filtered = self.filters.iter().all(|filter| {
            row.field_value(filter.field)
                .is_some_and(|value| filter.value.matches(&value))
        });

        filtered
            && self.search_terms.iter().all(|term| {
                self.search_fields.iter().any(|field| {
                    row.field_value(field)
                        .is_some_and(|value| value.contains_ignore_case(term))
                })
            })
    }

    /// Order rows by the ordering terms; ties break on ascending id
    pub fn sort<T: Data>(&self, rows: &mut [T]) {
        rows.sort_by(|a, b| {
            for term in &self.ordering {
                let left = a.field_value(term.field).unwrap_or(FieldValue::Null);
                let right = b.field_value(term.field).unwrap_or(FieldValue::Null);
                let ordering = left.compare(&right);
                let ordering = if term.descending {
                    ordering.reverse()
                } else {
                    ordering
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            a.id().cmp(&b.id())
        });
    }

    /// Filter, search and order in one pass (pagination is left to the caller)
    pub fn apply<T: Data>(&self, rows: impl IntoIterator<Item = T>) -> Vec<T> {
        let mut matched: Vec<T> = rows.into_iter().filter(|row| self.matches(row)).collect();
        self.sort(&mut matched);
        matched
    }
}

/// Paginated response structure
#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    /// The paginated data
    pub data: Vec<T>,

    /// Pagination metadata
    pub pagination: PaginationMeta,
}

/// Pagination metadata
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    /// Current page number (starts at 1)
    pub page: usize,

    /// Number of items per page
    pub limit: usize,

    /// Total number of items (after filters)
    pub total: usize,

    /// Total number of pages
    pub total_pages: usize,

    /// Whether there is a next page
    pub has_next: bool,

    /// Whether there is a previous page
    pub has_prev: bool,
}

impl PaginationMeta {
    /// Create pagination metadata from calculation
    pub fn new(page: usize, limit: usize, total: usize) -> Self {
        let limit = limit.max(1);
        let total_pages = if total == 0 { 0 } else { total.div_ceil(limit) };
        let start = (page.max(1) - 1).saturating_mul(limit);

        Self {
            page,
            limit,
            total,
            total_pages,
            has_next: start.saturating_add(limit) < total,
            has_prev: page > 1,
        }
    }
}
