//! Read-through orchestration tests with in-memory doubles.
//!
//! The store double keeps entities in plain vectors and does not enforce
//! the (book, page number) unique constraint; that invariant belongs to the
//! Postgres schema. The cache double can be switched into failure modes to
//! exercise the fall-through discipline.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use uuid::Uuid;

use stacks::application::catalog::{CatalogReader, EntityCache};
use stacks::application::repos::{
    AuthorsStore, BooksStore, ListWindow, NewAuthor, NewBook, NewPage, PagesStore, StoreError,
};
use stacks::cache::CacheError;
use stacks::domain::entities::{AuthorRecord, BookRecord, PageRecord};
use stacks::domain::slug::slugify;

// ============================================================================
// Doubles
// ============================================================================

#[derive(Default)]
struct MemoryStore {
    books: Mutex<Vec<BookRecord>>,
    authors: Mutex<Vec<AuthorRecord>>,
    pages: Mutex<Vec<PageRecord>>,
    reads: AtomicU64,
}

impl MemoryStore {
    fn seed_book(&self, book: BookRecord) {
        self.books.lock().unwrap().push(book);
    }

    fn seed_author(&self, author: AuthorRecord) {
        self.authors.lock().unwrap().push(author);
    }

    fn seed_page(&self, page: PageRecord) {
        self.pages.lock().unwrap().push(page);
    }

    fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    fn touch(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }
}

fn window_slice<T: Clone>(items: &[T], window: ListWindow) -> Vec<T> {
    items
        .iter()
        .skip(window.offset() as usize)
        .take(window.limit() as usize)
        .cloned()
        .collect()
}

#[async_trait]
impl BooksStore for MemoryStore {
    async fn list_books(&self, window: ListWindow) -> Result<Vec<BookRecord>, StoreError> {
        self.touch();
        let mut books = self.books.lock().unwrap().clone();
        books.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(window_slice(&books, window))
    }

    async fn book_by_id(&self, id: Uuid) -> Result<BookRecord, StoreError> {
        self.touch();
        self.books
            .lock()
            .unwrap()
            .iter()
            .find(|book| book.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("book", id))
    }

    async fn book_by_slug(&self, slug: &str) -> Result<BookRecord, StoreError> {
        self.touch();
        self.books
            .lock()
            .unwrap()
            .iter()
            .find(|book| book.slug == slug)
            .cloned()
            .ok_or_else(|| StoreError::not_found("book", slug))
    }

    async fn books_by_author(&self, author_name: &str) -> Result<Vec<BookRecord>, StoreError> {
        self.touch();
        let author_id = self
            .authors
            .lock()
            .unwrap()
            .iter()
            .find(|author| author.name == author_name)
            .map(|author| author.id);
        let mut books: Vec<BookRecord> = self
            .books
            .lock()
            .unwrap()
            .iter()
            .filter(|book| book.author_id.is_some() && book.author_id == author_id)
            .cloned()
            .collect();
        books.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(books)
    }

    async fn create_book(&self, params: NewBook) -> Result<BookRecord, StoreError> {
        let book = BookRecord {
            id: Uuid::new_v4(),
            slug: slugify(&params.title),
            title: params.title,
            publication_year: params.publication_year,
            page_count: params.page_count,
            file: params.file,
            source: params.source,
            author_id: params.author_id,
        };
        self.seed_book(book.clone());
        Ok(book)
    }
}

#[async_trait]
impl AuthorsStore for MemoryStore {
    async fn list_authors(&self, window: ListWindow) -> Result<Vec<AuthorRecord>, StoreError> {
        self.touch();
        let mut authors = self.authors.lock().unwrap().clone();
        authors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(window_slice(&authors, window))
    }

    async fn author_by_id(&self, id: Uuid) -> Result<AuthorRecord, StoreError> {
        self.touch();
        self.authors
            .lock()
            .unwrap()
            .iter()
            .find(|author| author.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("author", id))
    }

    async fn author_by_slug(&self, slug: &str) -> Result<AuthorRecord, StoreError> {
        self.touch();
        self.authors
            .lock()
            .unwrap()
            .iter()
            .find(|author| author.slug == slug)
            .cloned()
            .ok_or_else(|| StoreError::not_found("author", slug))
    }

    async fn create_author(&self, params: NewAuthor) -> Result<AuthorRecord, StoreError> {
        let author = AuthorRecord {
            id: Uuid::new_v4(),
            slug: slugify(&params.name),
            name: params.name,
        };
        self.seed_author(author.clone());
        Ok(author)
    }
}

#[async_trait]
impl PagesStore for MemoryStore {
    async fn list_pages(&self, window: ListWindow) -> Result<Vec<PageRecord>, StoreError> {
        self.touch();
        let mut pages = self.pages.lock().unwrap().clone();
        pages.sort_by_key(|page| (page.book_id, page.page_number));
        Ok(window_slice(&pages, window))
    }

    async fn page_by_id(&self, id: Uuid) -> Result<PageRecord, StoreError> {
        self.touch();
        self.pages
            .lock()
            .unwrap()
            .iter()
            .find(|page| page.id == id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("page", id))
    }

    async fn page_by_book_and_number(
        &self,
        book_id: Uuid,
        number: i32,
    ) -> Result<PageRecord, StoreError> {
        self.touch();
        self.pages
            .lock()
            .unwrap()
            .iter()
            .find(|page| page.book_id == Some(book_id) && page.page_number == number)
            .cloned()
            .ok_or_else(|| StoreError::not_found("page", format!("{book_id}#{number}")))
    }

    async fn pages_for_book(&self, book_id: Uuid) -> Result<Vec<PageRecord>, StoreError> {
        self.touch();
        let mut pages: Vec<PageRecord> = self
            .pages
            .lock()
            .unwrap()
            .iter()
            .filter(|page| page.book_id == Some(book_id))
            .cloned()
            .collect();
        pages.sort_by_key(|page| page.page_number);
        Ok(pages)
    }

    async fn create_page(&self, params: NewPage) -> Result<PageRecord, StoreError> {
        // No (book, page number) uniqueness here; the schema enforces that.
        let page = PageRecord {
            id: Uuid::new_v4(),
            page_number: params.page_number,
            body: params.body,
            book_id: params.book_id,
        };
        self.seed_page(page.clone());
        Ok(page)
    }
}

#[derive(Default)]
struct MemoryCache {
    unavailable: bool,
    ambiguous_reads: bool,
    reject_fills: bool,
    books: Mutex<HashMap<Uuid, BookRecord>>,
    authors: Mutex<HashMap<Uuid, AuthorRecord>>,
    pages: Mutex<HashMap<Uuid, PageRecord>>,
}

impl MemoryCache {
    fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Default::default()
        }
    }

    fn ambiguous() -> Self {
        Self {
            ambiguous_reads: true,
            ..Default::default()
        }
    }

    fn rejecting_fills() -> Self {
        Self {
            reject_fills: true,
            ..Default::default()
        }
    }

    fn gate(&self) -> Result<(), CacheError> {
        if self.unavailable {
            return Err(CacheError::Unavailable);
        }
        Ok(())
    }

    fn read_gate(&self, pattern: &str) -> Result<(), CacheError> {
        self.gate()?;
        if self.ambiguous_reads {
            return Err(CacheError::Ambiguous {
                pattern: pattern.to_string(),
                count: 2,
            });
        }
        Ok(())
    }

    fn cached_books(&self) -> usize {
        self.books.lock().unwrap().len()
    }

    fn cached_pages(&self) -> usize {
        self.pages.lock().unwrap().len()
    }
}

#[async_trait]
impl EntityCache for MemoryCache {
    async fn book_by_id(&self, id: Uuid) -> Result<BookRecord, CacheError> {
        self.read_gate("book:*:<id>")?;
        self.books
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(CacheError::Miss)
    }

    async fn book_by_slug(&self, slug: &str) -> Result<BookRecord, CacheError> {
        self.read_gate("book:<slug>:*")?;
        self.books
            .lock()
            .unwrap()
            .values()
            .find(|book| book.slug == slug)
            .cloned()
            .ok_or(CacheError::Miss)
    }

    async fn author_by_id(&self, id: Uuid) -> Result<AuthorRecord, CacheError> {
        self.read_gate("author:*:<id>")?;
        self.authors
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(CacheError::Miss)
    }

    async fn author_by_slug(&self, slug: &str) -> Result<AuthorRecord, CacheError> {
        self.read_gate("author:<slug>:*")?;
        self.authors
            .lock()
            .unwrap()
            .values()
            .find(|author| author.slug == slug)
            .cloned()
            .ok_or(CacheError::Miss)
    }

    async fn page_by_id(&self, id: Uuid) -> Result<PageRecord, CacheError> {
        self.read_gate("page:<id>")?;
        self.pages
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(CacheError::Miss)
    }

    async fn page_by_book_and_number(
        &self,
        book_id: Uuid,
        number: i32,
    ) -> Result<PageRecord, CacheError> {
        self.read_gate("page:*")?;
        self.pages
            .lock()
            .unwrap()
            .values()
            .find(|page| page.book_id == Some(book_id) && page.page_number == number)
            .cloned()
            .ok_or(CacheError::Miss)
    }

    async fn insert_book(&self, book: &BookRecord) -> Result<(), CacheError> {
        self.gate()?;
        if self.reject_fills {
            return Err(CacheError::Timeout);
        }
        self.books.lock().unwrap().insert(book.id, book.clone());
        Ok(())
    }

    async fn insert_author(&self, author: &AuthorRecord) -> Result<(), CacheError> {
        self.gate()?;
        if self.reject_fills {
            return Err(CacheError::Timeout);
        }
        self.authors
            .lock()
            .unwrap()
            .insert(author.id, author.clone());
        Ok(())
    }

    async fn insert_page(&self, page: &PageRecord) -> Result<(), CacheError> {
        self.gate()?;
        if self.reject_fills {
            return Err(CacheError::Timeout);
        }
        self.pages.lock().unwrap().insert(page.id, page.clone());
        Ok(())
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn book(title: &str) -> BookRecord {
    BookRecord {
        id: Uuid::new_v4(),
        slug: slugify(title),
        title: title.to_string(),
        publication_year: None,
        page_count: 0,
        file: None,
        source: None,
        author_id: None,
    }
}

fn reader_with_book(
    cache: MemoryCache,
    title: &str,
) -> (CatalogReader<MemoryStore, MemoryCache>, BookRecord) {
    let store = MemoryStore::default();
    let entry = book(title);
    store.seed_book(entry.clone());
    (CatalogReader::new(store, cache), entry)
}

// ============================================================================
// Read-through behavior
// ============================================================================

#[tokio::test]
async fn cache_hit_short_circuits_the_store() {
    let cache = MemoryCache::default();
    let entry = book("The Colour out of Space");
    cache.books.lock().unwrap().insert(entry.id, entry.clone());

    let reader = CatalogReader::new(MemoryStore::default(), cache);
    let found = reader.book_by_id(entry.id).await.expect("cached book");

    assert_eq!(found, entry);
    assert_eq!(reader.store().reads(), 0);
}

#[tokio::test]
async fn miss_falls_through_and_fills_the_cache() {
    let (reader, entry) = reader_with_book(MemoryCache::default(), "The Silver Key");

    let found = reader.book_by_id(entry.id).await.expect("stored book");
    assert_eq!(found, entry);
    assert_eq!(reader.store().reads(), 1);
    assert_eq!(reader.cache().cached_books(), 1);

    // The second read is served by the fill.
    let again = reader.book_by_id(entry.id).await.expect("cached book");
    assert_eq!(again, entry);
    assert_eq!(reader.store().reads(), 1);
}

#[tokio::test]
async fn slug_lookup_fill_also_serves_id_lookups() {
    let (reader, entry) = reader_with_book(MemoryCache::default(), "The Dunwich Horror");

    let by_slug = reader
        .book_by_slug("the-dunwich-horror")
        .await
        .expect("stored book");
    assert_eq!(by_slug.id, entry.id);
    assert_eq!(reader.store().reads(), 1);

    let by_id = reader.book_by_id(entry.id).await.expect("cached book");
    assert_eq!(by_id, entry);
    assert_eq!(reader.store().reads(), 1);
}

#[tokio::test]
async fn unavailable_cache_reads_come_from_the_store() {
    let (reader, entry) = reader_with_book(MemoryCache::unavailable(), "The Outsider");

    for expected_reads in 1..=2u64 {
        let found = reader.book_by_id(entry.id).await.expect("stored book");
        assert_eq!(found, entry);
        assert_eq!(reader.store().reads(), expected_reads);
    }
    assert_eq!(reader.cache().cached_books(), 0);
}

#[tokio::test]
async fn fill_failure_does_not_fail_the_read() {
    let (reader, entry) = reader_with_book(MemoryCache::rejecting_fills(), "Celephais");

    let found = reader.book_by_id(entry.id).await.expect("stored book");
    assert_eq!(found, entry);
    assert_eq!(reader.cache().cached_books(), 0);
}

#[tokio::test]
async fn ambiguous_cache_answer_falls_back_to_the_store() {
    let (reader, entry) = reader_with_book(MemoryCache::ambiguous(), "The Festival");

    let found = reader.book_by_id(entry.id).await.expect("stored book");
    assert_eq!(found, entry);
    assert_eq!(reader.store().reads(), 1);
}

#[tokio::test]
async fn store_not_found_propagates() {
    let reader = CatalogReader::new(MemoryStore::default(), MemoryCache::default());

    let result = reader.book_by_id(Uuid::new_v4()).await;
    assert!(matches!(result, Err(StoreError::NotFound { .. })));
}

#[tokio::test]
async fn page_by_book_and_number_reads_through() {
    let store = MemoryStore::default();
    let owner = book("The Rats in the Walls");
    let page = PageRecord {
        id: Uuid::new_v4(),
        page_number: 3,
        body: "The cats surged wildly ahead.".to_string(),
        book_id: Some(owner.id),
    };
    store.seed_book(owner.clone());
    store.seed_page(page.clone());

    let reader = CatalogReader::new(store, MemoryCache::default());
    let found = reader
        .page_by_book_and_number(owner.id, 3)
        .await
        .expect("stored page");
    assert_eq!(found, page);
    assert_eq!(reader.cache().cached_pages(), 1);

    let again = reader
        .page_by_book_and_number(owner.id, 3)
        .await
        .expect("cached page");
    assert_eq!(again, page);
    assert_eq!(reader.store().reads(), 1);
}

// ============================================================================
// Pagination and assembly
// ============================================================================

#[tokio::test]
async fn list_books_returns_the_requested_window_in_title_order() {
    let store = MemoryStore::default();
    for n in (1..=10).rev() {
        store.seed_book(book(&format!("Volume {n:02}")));
    }

    let reader = CatalogReader::new(store, MemoryCache::default());
    let first = reader
        .list_books(ListWindow::new(3, 0))
        .await
        .expect("listing");

    let titles: Vec<&str> = first.iter().map(|book| book.title.as_str()).collect();
    assert_eq!(titles, ["Volume 01", "Volume 02", "Volume 03"]);
}

#[tokio::test]
async fn list_offset_beyond_the_collection_is_empty_not_an_error() {
    let store = MemoryStore::default();
    for n in 1..=10 {
        store.seed_book(book(&format!("Volume {n:02}")));
    }

    let reader = CatalogReader::new(store, MemoryCache::default());
    let listing = reader
        .list_books(ListWindow::new(3, 50))
        .await
        .expect("listing");
    assert!(listing.is_empty());
}

#[tokio::test]
async fn author_with_books_assembles_from_the_store() {
    let store = MemoryStore::default();
    let author = AuthorRecord {
        id: Uuid::new_v4(),
        name: "H. P. Lovecraft".to_string(),
        slug: "h-p-lovecraft".to_string(),
    };
    store.seed_author(author.clone());
    for title in ["Dagon", "Azathoth"] {
        let mut entry = book(title);
        entry.author_id = Some(author.id);
        store.seed_book(entry);
    }

    let reader = CatalogReader::new(store, MemoryCache::default());
    let assembled = reader
        .author_with_books(author.id)
        .await
        .expect("assembled author");

    assert_eq!(assembled.author, author);
    let titles: Vec<&str> = assembled
        .books
        .iter()
        .map(|book| book.title.as_str())
        .collect();
    assert_eq!(titles, ["Azathoth", "Dagon"]);
}

#[tokio::test]
async fn book_with_pages_orders_pages_by_number() {
    let store = MemoryStore::default();
    let owner = book("The Nameless City");
    store.seed_book(owner.clone());
    for number in [2, 1, 3] {
        store.seed_page(PageRecord {
            id: Uuid::new_v4(),
            page_number: number,
            body: format!("page {number}"),
            book_id: Some(owner.id),
        });
    }

    let reader = CatalogReader::new(store, MemoryCache::default());
    let assembled = reader
        .book_with_pages(owner.id)
        .await
        .expect("assembled book");

    assert_eq!(assembled.book, owner);
    let numbers: Vec<i32> = assembled
        .pages
        .iter()
        .map(|page| page.page_number)
        .collect();
    assert_eq!(numbers, [1, 2, 3]);
}
