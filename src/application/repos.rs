//! Storage traits describing the primary catalog store.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{AuthorRecord, BookRecord, PageRecord};

/// Ceiling applied to every list operation, including the `-1` sentinel.
pub const DEFAULT_LIST_CAP: i64 = 1000;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no {entity} found for `{key}`")]
    NotFound { entity: &'static str, key: String },
    #[error("query `{op}` failed: {message}")]
    Query { op: &'static str, message: String },
    #[error("decoding rows in `{op}` failed: {message}")]
    Scan { op: &'static str, message: String },
    #[error("duplicate record violates unique constraint `{constraint}`")]
    Duplicate { constraint: String },
    #[error("invalid input for `{op}`: {message}")]
    InvalidInput { op: &'static str, message: String },
}

impl StoreError {
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }

    pub fn query(op: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Query {
            op,
            message: err.to_string(),
        }
    }

    pub fn scan(op: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Scan {
            op,
            message: err.to_string(),
        }
    }
}

/// Window over an ordered listing.
///
/// A negative limit selects [`DEFAULT_LIST_CAP`] rather than an unbounded
/// read, and explicit limits are capped at the same ceiling. This is a fixed
/// policy, not a true unbounded mode; callers that need everything page
/// through it. A non-positive offset reads from the start.
#[derive(Debug, Clone, Copy)]
pub struct ListWindow {
    limit: i64,
    offset: i64,
}

impl ListWindow {
    pub fn new(limit: i64, offset: i64) -> Self {
        Self { limit, offset }
    }

    pub fn limit(&self) -> i64 {
        if self.limit < 0 {
            DEFAULT_LIST_CAP
        } else {
            self.limit.min(DEFAULT_LIST_CAP)
        }
    }

    pub fn offset(&self) -> i64 {
        self.offset.max(0)
    }
}

impl Default for ListWindow {
    fn default() -> Self {
        Self::new(-1, 0)
    }
}

#[derive(Debug, Clone)]
pub struct NewBook {
    pub title: String,
    pub publication_year: Option<i32>,
    pub page_count: i32,
    pub file: Option<String>,
    pub source: Option<String>,
    pub author_id: Option<Uuid>,
}

#[derive(Debug, Clone)]
pub struct NewAuthor {
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct NewPage {
    pub page_number: i32,
    pub body: String,
    pub book_id: Option<Uuid>,
}

#[async_trait]
pub trait BooksStore: Send + Sync {
    /// Books ordered by title ascending.
    async fn list_books(&self, window: ListWindow) -> Result<Vec<BookRecord>, StoreError>;

    async fn book_by_id(&self, id: Uuid) -> Result<BookRecord, StoreError>;

    async fn book_by_slug(&self, slug: &str) -> Result<BookRecord, StoreError>;

    /// Filter by the author's display name, not their slug.
    async fn books_by_author(&self, author_name: &str) -> Result<Vec<BookRecord>, StoreError>;

    async fn create_book(&self, params: NewBook) -> Result<BookRecord, StoreError>;
}

#[async_trait]
pub trait AuthorsStore: Send + Sync {
    /// Authors ordered by name ascending.
    async fn list_authors(&self, window: ListWindow) -> Result<Vec<AuthorRecord>, StoreError>;

    async fn author_by_id(&self, id: Uuid) -> Result<AuthorRecord, StoreError>;

    async fn author_by_slug(&self, slug: &str) -> Result<AuthorRecord, StoreError>;

    async fn create_author(&self, params: NewAuthor) -> Result<AuthorRecord, StoreError>;
}

#[async_trait]
pub trait PagesStore: Send + Sync {
    async fn list_pages(&self, window: ListWindow) -> Result<Vec<PageRecord>, StoreError>;

    async fn page_by_id(&self, id: Uuid) -> Result<PageRecord, StoreError>;

    async fn page_by_book_and_number(
        &self,
        book_id: Uuid,
        number: i32,
    ) -> Result<PageRecord, StoreError>;

    /// All pages of one book, ordered by page number.
    async fn pages_for_book(&self, book_id: Uuid) -> Result<Vec<PageRecord>, StoreError>;

    async fn create_page(&self, params: NewPage) -> Result<PageRecord, StoreError>;
}

/// Everything the read-through layer needs from the primary store.
pub trait CatalogStore: BooksStore + AuthorsStore + PagesStore {}

impl<T: BooksStore + AuthorsStore + PagesStore> CatalogStore for T {}
