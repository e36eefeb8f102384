use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{
    BooksStore, DEFAULT_LIST_CAP, ListWindow, NewBook, StoreError,
};
use crate::domain::entities::BookRecord;
use crate::domain::slug::slugify_with;

use super::{PostgresCatalog, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct BookRow {
    id: Uuid,
    title: String,
    slug: String,
    publication_year: Option<i32>,
    page_count: i32,
    file: Option<String>,
    source: Option<String>,
    author_id: Option<Uuid>,
}

impl From<BookRow> for BookRecord {
    fn from(row: BookRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            slug: row.slug,
            publication_year: row.publication_year,
            page_count: row.page_count,
            file: row.file,
            source: row.source,
            author_id: row.author_id,
        }
    }
}

#[async_trait]
impl BooksStore for PostgresCatalog {
    async fn list_books(&self, window: ListWindow) -> Result<Vec<BookRecord>, StoreError> {
        let rows: Vec<BookRow> = sqlx::query_as(
            "SELECT id, title, slug, publication_year, page_count, file, source, author_id \
             FROM books ORDER BY title ASC LIMIT $1 OFFSET $2",
        )
        .bind(window.limit())
        .bind(window.offset())
        .fetch_all(self.pool())
        .await
        .map_err(|err| map_sqlx_error("list_books", err))?;

        Ok(rows.into_iter().map(BookRecord::from).collect())
    }

    async fn book_by_id(&self, id: Uuid) -> Result<BookRecord, StoreError> {
        let row: Option<BookRow> = sqlx::query_as(
            "SELECT id, title, slug, publication_year, page_count, file, source, author_id \
             FROM books WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(|err| map_sqlx_error("book_by_id", err))?;

        row.map(BookRecord::from)
            .ok_or_else(|| StoreError::not_found("book", id))
    }

    async fn book_by_slug(&self, slug: &str) -> Result<BookRecord, StoreError> {
        let row: Option<BookRow> = sqlx::query_as(
            "SELECT id, title, slug, publication_year, page_count, file, source, author_id \
             FROM books WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(self.pool())
        .await
        .map_err(|err| map_sqlx_error("book_by_slug", err))?;

        row.map(BookRecord::from)
            .ok_or_else(|| StoreError::not_found("book", slug))
    }

    async fn books_by_author(&self, author_name: &str) -> Result<Vec<BookRecord>, StoreError> {
        let rows: Vec<BookRow> = sqlx::query_as(
            "SELECT b.id, b.title, b.slug, b.publication_year, b.page_count, b.file, b.source, \
                    b.author_id \
             FROM books b \
             INNER JOIN authors a ON a.id = b.author_id \
             WHERE a.name = $1 \
             ORDER BY b.title ASC LIMIT $2",
        )
        .bind(author_name)
        .bind(DEFAULT_LIST_CAP)
        .fetch_all(self.pool())
        .await
        .map_err(|err| map_sqlx_error("books_by_author", err))?;

        Ok(rows.into_iter().map(BookRecord::from).collect())
    }

    async fn create_book(&self, params: NewBook) -> Result<BookRecord, StoreError> {
        let id = Uuid::new_v4();
        let slug = slugify_with(&params.title, self.slug_separator());

        let row: BookRow = sqlx::query_as(
            "INSERT INTO books (id, title, slug, publication_year, page_count, file, source, \
                                author_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING id, title, slug, publication_year, page_count, file, source, author_id",
        )
        .bind(id)
        .bind(&params.title)
        .bind(&slug)
        .bind(params.publication_year)
        .bind(params.page_count)
        .bind(&params.file)
        .bind(&params.source)
        .bind(params.author_id)
        .fetch_one(self.pool())
        .await
        .map_err(|err| map_sqlx_error("create_book", err))?;

        Ok(BookRecord::from(row))
    }
}
