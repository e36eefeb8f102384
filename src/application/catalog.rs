//! Read-through composition of the lookup cache and the primary store.
//!
//! The discipline, in one place so resolvers do not reinvent it: try the
//! cache, fall back to the store on a miss or an unavailable cache, then
//! fill the cache best-effort. Cache failures never fail a read; fill
//! errors are logged and discarded.

use async_trait::async_trait;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::{CacheError, LookupCache};
use crate::domain::entities::{
    AuthorRecord, AuthorWithBooks, BookRecord, BookWithPages, PageRecord,
};

use super::repos::{CatalogStore, ListWindow, StoreError};

/// The subset of cache operations the read-through layer needs.
///
/// [`LookupCache`] implements this; tests substitute in-memory doubles.
#[async_trait]
pub trait EntityCache: Send + Sync {
    async fn book_by_id(&self, id: Uuid) -> Result<BookRecord, CacheError>;

    async fn book_by_slug(&self, slug: &str) -> Result<BookRecord, CacheError>;

    async fn author_by_id(&self, id: Uuid) -> Result<AuthorRecord, CacheError>;

    async fn author_by_slug(&self, slug: &str) -> Result<AuthorRecord, CacheError>;

    async fn page_by_id(&self, id: Uuid) -> Result<PageRecord, CacheError>;

    async fn page_by_book_and_number(
        &self,
        book_id: Uuid,
        number: i32,
    ) -> Result<PageRecord, CacheError>;

    async fn insert_book(&self, book: &BookRecord) -> Result<(), CacheError>;

    async fn insert_author(&self, author: &AuthorRecord) -> Result<(), CacheError>;

    async fn insert_page(&self, page: &PageRecord) -> Result<(), CacheError>;
}

#[async_trait]
impl EntityCache for LookupCache {
    async fn book_by_id(&self, id: Uuid) -> Result<BookRecord, CacheError> {
        LookupCache::book_by_id(self, id, &[]).await
    }

    async fn book_by_slug(&self, slug: &str) -> Result<BookRecord, CacheError> {
        LookupCache::book_by_slug(self, slug, &[]).await
    }

    async fn author_by_id(&self, id: Uuid) -> Result<AuthorRecord, CacheError> {
        LookupCache::author_by_id(self, id, &[]).await
    }

    async fn author_by_slug(&self, slug: &str) -> Result<AuthorRecord, CacheError> {
        LookupCache::author_by_slug(self, slug, &[]).await
    }

    async fn page_by_id(&self, id: Uuid) -> Result<PageRecord, CacheError> {
        LookupCache::page_by_id(self, id, &[]).await
    }

    async fn page_by_book_and_number(
        &self,
        book_id: Uuid,
        number: i32,
    ) -> Result<PageRecord, CacheError> {
        LookupCache::page_by_book_and_number(self, book_id, number).await
    }

    async fn insert_book(&self, book: &BookRecord) -> Result<(), CacheError> {
        LookupCache::insert_book(self, book).await
    }

    async fn insert_author(&self, author: &AuthorRecord) -> Result<(), CacheError> {
        LookupCache::insert_author(self, author).await
    }

    async fn insert_page(&self, page: &PageRecord) -> Result<(), CacheError> {
        LookupCache::insert_page(self, page).await
    }
}

/// Cache-first reads over a primary store.
pub struct CatalogReader<S, C> {
    store: S,
    cache: C,
}

impl<S, C> CatalogReader<S, C>
where
    S: CatalogStore,
    C: EntityCache,
{
    pub fn new(store: S, cache: C) -> Self {
        Self { store, cache }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    // ------------------------------------------------------------------
    // Cached single-entity reads
    // ------------------------------------------------------------------

    pub async fn book_by_id(&self, id: Uuid) -> Result<BookRecord, StoreError> {
        if let Some(book) = cache_read(self.cache.book_by_id(id).await, "book_by_id") {
            return Ok(book);
        }
        let book = self.store.book_by_id(id).await?;
        fill("book", self.cache.insert_book(&book).await);
        Ok(book)
    }

    pub async fn book_by_slug(&self, slug: &str) -> Result<BookRecord, StoreError> {
        if let Some(book) = cache_read(self.cache.book_by_slug(slug).await, "book_by_slug") {
            return Ok(book);
        }
        let book = self.store.book_by_slug(slug).await?;
        fill("book", self.cache.insert_book(&book).await);
        Ok(book)
    }

    pub async fn author_by_id(&self, id: Uuid) -> Result<AuthorRecord, StoreError> {
        if let Some(author) = cache_read(self.cache.author_by_id(id).await, "author_by_id") {
            return Ok(author);
        }
        let author = self.store.author_by_id(id).await?;
        fill("author", self.cache.insert_author(&author).await);
        Ok(author)
    }

    pub async fn author_by_slug(&self, slug: &str) -> Result<AuthorRecord, StoreError> {
        if let Some(author) = cache_read(self.cache.author_by_slug(slug).await, "author_by_slug")
        {
            return Ok(author);
        }
        let author = self.store.author_by_slug(slug).await?;
        fill("author", self.cache.insert_author(&author).await);
        Ok(author)
    }

    pub async fn page_by_id(&self, id: Uuid) -> Result<PageRecord, StoreError> {
        if let Some(page) = cache_read(self.cache.page_by_id(id).await, "page_by_id") {
            return Ok(page);
        }
        let page = self.store.page_by_id(id).await?;
        fill("page", self.cache.insert_page(&page).await);
        Ok(page)
    }

    pub async fn page_by_book_and_number(
        &self,
        book_id: Uuid,
        number: i32,
    ) -> Result<PageRecord, StoreError> {
        if let Some(page) = cache_read(
            self.cache.page_by_book_and_number(book_id, number).await,
            "page_by_book_and_number",
        ) {
            return Ok(page);
        }
        let page = self.store.page_by_book_and_number(book_id, number).await?;
        fill("page", self.cache.insert_page(&page).await);
        Ok(page)
    }

    // ------------------------------------------------------------------
    // Store pass-throughs (query results are not cached)
    // ------------------------------------------------------------------

    pub async fn list_books(&self, window: ListWindow) -> Result<Vec<BookRecord>, StoreError> {
        self.store.list_books(window).await
    }

    pub async fn list_authors(&self, window: ListWindow) -> Result<Vec<AuthorRecord>, StoreError> {
        self.store.list_authors(window).await
    }

    pub async fn list_pages(&self, window: ListWindow) -> Result<Vec<PageRecord>, StoreError> {
        self.store.list_pages(window).await
    }

    pub async fn books_by_author(
        &self,
        author_name: &str,
    ) -> Result<Vec<BookRecord>, StoreError> {
        self.store.books_by_author(author_name).await
    }

    // ------------------------------------------------------------------
    // Query-assembled aggregates
    // ------------------------------------------------------------------

    pub async fn book_with_pages(&self, id: Uuid) -> Result<BookWithPages, StoreError> {
        let book = self.book_by_id(id).await?;
        let pages = self.store.pages_for_book(book.id).await?;
        Ok(BookWithPages { book, pages })
    }

    pub async fn author_with_books(&self, id: Uuid) -> Result<AuthorWithBooks, StoreError> {
        let author = self.author_by_id(id).await?;
        let books = self.store.books_by_author(&author.name).await?;
        Ok(AuthorWithBooks { author, books })
    }
}

/// Unwrap a cache lookup, downgrading every failure to a miss.
///
/// Misses and unavailability are the expected fall-through cases; anything
/// else still falls through (the cache is never required for correctness)
/// but is worth a warning.
fn cache_read<T>(result: Result<T, CacheError>, op: &'static str) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(CacheError::Miss | CacheError::Unavailable) => {
            debug!(op, "lookup cache miss");
            None
        }
        Err(err) => {
            warn!(op, error = %err, "lookup cache error, falling back to store");
            None
        }
    }
}

fn fill(entity: &'static str, result: Result<(), CacheError>) {
    match result {
        Ok(()) | Err(CacheError::Unavailable) => {}
        Err(err) => warn!(entity, error = %err, "failed to fill lookup cache"),
    }
}
