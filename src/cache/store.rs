//! The Redis-backed lookup cache.
//!
//! Construction never fails: an instance whose backing connection could not
//! be established is permanently unavailable and answers every operation
//! with [`CacheError::Unavailable`] without touching the network, leaving
//! the fallback decision to the caller.

use std::collections::{BTreeSet, HashMap};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::CacheSettings;
use crate::domain::entities::{AuthorRecord, BookRecord, PageRecord};

use super::{CacheError, codec, keys};

/// Per-entity lookup counters, incremented on every successful read.
///
/// Instrumentation and test support only: nothing consults these for
/// eviction or admission.
#[derive(Debug, Default)]
pub struct CallCounters {
    books: AtomicU64,
    authors: AtomicU64,
    pages: AtomicU64,
}

impl CallCounters {
    pub fn books(&self) -> u64 {
        self.books.load(Ordering::Relaxed)
    }

    pub fn authors(&self) -> u64 {
        self.authors.load(Ordering::Relaxed)
    }

    pub fn pages(&self) -> u64 {
        self.pages.load(Ordering::Relaxed)
    }

    fn record_book(&self) {
        self.books.fetch_add(1, Ordering::Relaxed);
    }

    fn record_author(&self) {
        self.authors.fetch_add(1, Ordering::Relaxed);
    }

    fn record_page(&self) {
        self.pages.fetch_add(1, Ordering::Relaxed);
    }
}

pub struct LookupCache {
    conn: Option<ConnectionManager>,
    connect_error: Option<String>,
    scan_count: u32,
    op_timeout: Duration,
    counters: CallCounters,
}

impl LookupCache {
    /// Establish the backing connection described by `settings`.
    ///
    /// When the connection cannot be established, or no URL is configured,
    /// the returned instance is unavailable for its whole lifetime; the
    /// underlying cause stays readable via [`LookupCache::connect_error`].
    pub async fn connect(settings: &CacheSettings) -> Self {
        let (conn, connect_error) = match settings.url.as_deref() {
            None => (None, Some("no cache url configured".to_string())),
            Some(url) => match Self::open(url).await {
                Ok(manager) => {
                    info!("lookup cache connected");
                    (Some(manager), None)
                }
                Err(err) => {
                    warn!(error = %err, "lookup cache connection failed, lookups will fall through");
                    (None, Some(err.to_string()))
                }
            },
        };

        Self {
            conn,
            connect_error,
            scan_count: settings.scan_count.get(),
            op_timeout: settings.op_timeout,
            counters: CallCounters::default(),
        }
    }

    async fn open(url: &str) -> Result<ConnectionManager, redis::RedisError> {
        let client = redis::Client::open(url)?;
        client.get_connection_manager().await
    }

    pub fn is_available(&self) -> bool {
        self.conn.is_some()
    }

    /// The construction-time failure, if any. `None` on available instances.
    pub fn connect_error(&self) -> Option<&str> {
        self.connect_error.as_deref()
    }

    pub fn counters(&self) -> &CallCounters {
        &self.counters
    }

    fn connection(&self) -> Result<ConnectionManager, CacheError> {
        self.conn.clone().ok_or(CacheError::Unavailable)
    }

    async fn deadline<T, F>(&self, fut: F) -> Result<T, CacheError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(CacheError::from),
            Err(_) => Err(CacheError::Timeout),
        }
    }

    // ------------------------------------------------------------------
    // Inserts
    // ------------------------------------------------------------------

    /// Idempotent overwrite of the book's hash under its composite key.
    pub async fn insert_book(&self, book: &BookRecord) -> Result<(), CacheError> {
        let conn = self.connection()?;
        if book.id.is_nil() {
            return Err(CacheError::InvalidEntity { entity: "book" });
        }
        let key = keys::book_key(&book.slug, book.id);
        self.overwrite_hash(conn, key, codec::encode_book(book)).await
    }

    pub async fn insert_author(&self, author: &AuthorRecord) -> Result<(), CacheError> {
        let conn = self.connection()?;
        if author.id.is_nil() {
            return Err(CacheError::InvalidEntity { entity: "author" });
        }
        let key = keys::author_key(&author.slug, author.id);
        self.overwrite_hash(conn, key, codec::encode_author(author))
            .await
    }

    pub async fn insert_page(&self, page: &PageRecord) -> Result<(), CacheError> {
        let conn = self.connection()?;
        if page.id.is_nil() {
            return Err(CacheError::InvalidEntity { entity: "page" });
        }
        let key = keys::page_key(page.id);
        self.overwrite_hash(conn, key, codec::encode_page(page)).await
    }

    async fn overwrite_hash(
        &self,
        mut conn: ConnectionManager,
        key: String,
        fields: Vec<(&'static str, String)>,
    ) -> Result<(), CacheError> {
        // Delete first so fields dropped by a newer encoding do not linger.
        self.deadline(async {
            let _: () = conn.del(&key).await?;
            let _: () = conn.hset_multiple(&key, &fields).await?;
            Ok(())
        })
        .await
    }

    // ------------------------------------------------------------------
    // Lookups
    // ------------------------------------------------------------------

    /// Fetch a book knowing only its id.
    ///
    /// `fields` selects a subset of hash fields; an empty selection fetches
    /// the whole record.
    pub async fn book_by_id(&self, id: Uuid, fields: &[&str]) -> Result<BookRecord, CacheError> {
        let pattern = keys::book_pattern_by_id(id);
        let map = self.fetch_single(&pattern, fields).await?;
        let book = codec::decode_book(&map)?;
        self.counters.record_book();
        Ok(book)
    }

    pub async fn book_by_slug(
        &self,
        slug: &str,
        fields: &[&str],
    ) -> Result<BookRecord, CacheError> {
        let pattern = keys::book_pattern_by_slug(slug);
        let map = self.fetch_single(&pattern, fields).await?;
        let book = codec::decode_book(&map)?;
        self.counters.record_book();
        Ok(book)
    }

    pub async fn author_by_id(
        &self,
        id: Uuid,
        fields: &[&str],
    ) -> Result<AuthorRecord, CacheError> {
        let pattern = keys::author_pattern_by_id(id);
        let map = self.fetch_single(&pattern, fields).await?;
        let author = codec::decode_author(&map)?;
        self.counters.record_author();
        Ok(author)
    }

    pub async fn author_by_slug(
        &self,
        slug: &str,
        fields: &[&str],
    ) -> Result<AuthorRecord, CacheError> {
        let pattern = keys::author_pattern_by_slug(slug);
        let map = self.fetch_single(&pattern, fields).await?;
        let author = codec::decode_author(&map)?;
        self.counters.record_author();
        Ok(author)
    }

    /// Page keys are flat, so this is a direct hash fetch without a scan.
    pub async fn page_by_id(&self, id: Uuid, fields: &[&str]) -> Result<PageRecord, CacheError> {
        let key = keys::page_key(id);
        let map = self.fetch_hash(key, fields).await?;
        let page = codec::decode_page(&map)?;
        self.counters.record_page();
        Ok(page)
    }

    /// Scan every page entry and return the first one owned by `book_id`
    /// with the requested number.
    pub async fn page_by_book_and_number(
        &self,
        book_id: Uuid,
        number: i32,
    ) -> Result<PageRecord, CacheError> {
        let candidates = self.scan_keys(&keys::page_pattern_all()).await?;
        for key in candidates {
            let map = match self.fetch_hash(key, &[]).await {
                Ok(map) => map,
                // The entry vanished between scan and fetch.
                Err(CacheError::Miss) => continue,
                Err(err) => return Err(err),
            };
            let page = codec::decode_page(&map)?;
            if page.book_id == Some(book_id) && page.page_number == number {
                self.counters.record_page();
                return Ok(page);
            }
        }
        Err(CacheError::Miss)
    }

    // ------------------------------------------------------------------
    // Scan plumbing
    // ------------------------------------------------------------------

    /// Resolve a wildcard pattern to its single key, then fetch the hash.
    async fn fetch_single(
        &self,
        pattern: &str,
        fields: &[&str],
    ) -> Result<HashMap<String, String>, CacheError> {
        let matches = self.scan_keys(pattern).await?;
        let key = keys::resolve_single(matches, pattern)?;
        self.fetch_hash(key, fields).await
    }

    /// Cursor-based SCAN, accumulating matches until the cursor returns to
    /// its start value.
    ///
    /// SCAN may hand back the same key on more than one cursor page, so
    /// matches are collected as a set; only distinct keys count toward the
    /// ambiguity guard.
    async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>, CacheError> {
        let mut conn = self.connection()?;
        let mut matches = BTreeSet::new();
        let mut cursor: u64 = 0;
        loop {
            let (next, page): (u64, Vec<String>) = self
                .deadline(
                    redis::cmd("SCAN")
                        .arg(cursor)
                        .arg("MATCH")
                        .arg(pattern)
                        .arg("COUNT")
                        .arg(self.scan_count)
                        .query_async(&mut conn),
                )
                .await?;
            matches.extend(page);
            cursor = next;
            if cursor == 0 {
                break;
            }
        }
        Ok(matches.into_iter().collect())
    }

    async fn fetch_hash(
        &self,
        key: String,
        fields: &[&str],
    ) -> Result<HashMap<String, String>, CacheError> {
        let mut conn = self.connection()?;
        let map: HashMap<String, String> = if fields.is_empty() {
            self.deadline(conn.hgetall(&key)).await?
        } else {
            let values: Vec<Option<String>> = self
                .deadline(
                    redis::cmd("HMGET")
                        .arg(&key)
                        .arg(fields)
                        .query_async(&mut conn),
                )
                .await?;
            fields
                .iter()
                .zip(values)
                .filter_map(|(field, value)| value.map(|value| (field.to_string(), value)))
                .collect()
        };
        if map.is_empty() {
            return Err(CacheError::Miss);
        }
        Ok(map)
    }
}
