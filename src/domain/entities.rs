//! Domain entities mirrored from persistent storage.
//!
//! Optional fields are genuinely tri-state here (`Option<_>`); the lossy
//! zero-as-absent convention only exists at the cache encoding boundary.

use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BookRecord {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub publication_year: Option<i32>,
    pub page_count: i32,
    pub file: Option<String>,
    pub source: Option<String>,
    pub author_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AuthorRecord {
    pub id: Uuid,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PageRecord {
    pub id: Uuid,
    pub page_number: i32,
    pub body: String,
    /// Null only transiently, before the page is associated with a book.
    pub book_id: Option<Uuid>,
}

/// A book together with its pages, assembled by query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookWithPages {
    pub book: BookRecord,
    pub pages: Vec<PageRecord>,
}

/// An author together with their books, assembled by query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuthorWithBooks {
    pub author: AuthorRecord,
    pub books: Vec<BookRecord>,
}
