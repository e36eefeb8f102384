use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{ListWindow, NewPage, PagesStore, StoreError};
use crate::domain::entities::PageRecord;

use super::{PostgresCatalog, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct PageRow {
    id: Uuid,
    page_number: i32,
    body: String,
    book_id: Option<Uuid>,
}

impl From<PageRow> for PageRecord {
    fn from(row: PageRow) -> Self {
        Self {
            id: row.id,
            page_number: row.page_number,
            body: row.body,
            book_id: row.book_id,
        }
    }
}

#[async_trait]
impl PagesStore for PostgresCatalog {
    async fn list_pages(&self, window: ListWindow) -> Result<Vec<PageRecord>, StoreError> {
        let rows: Vec<PageRow> = sqlx::query_as(
            "SELECT id, page_number, body, book_id FROM pages \
             ORDER BY book_id, page_number ASC LIMIT $1 OFFSET $2",
        )
        .bind(window.limit())
        .bind(window.offset())
        .fetch_all(self.pool())
        .await
        .map_err(|err| map_sqlx_error("list_pages", err))?;

        Ok(rows.into_iter().map(PageRecord::from).collect())
    }

    async fn page_by_id(&self, id: Uuid) -> Result<PageRecord, StoreError> {
        let row: Option<PageRow> =
            sqlx::query_as("SELECT id, page_number, body, book_id FROM pages WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool())
                .await
                .map_err(|err| map_sqlx_error("page_by_id", err))?;

        row.map(PageRecord::from)
            .ok_or_else(|| StoreError::not_found("page", id))
    }

    async fn page_by_book_and_number(
        &self,
        book_id: Uuid,
        number: i32,
    ) -> Result<PageRecord, StoreError> {
        let row: Option<PageRow> = sqlx::query_as(
            "SELECT id, page_number, body, book_id FROM pages \
             WHERE book_id = $1 AND page_number = $2",
        )
        .bind(book_id)
        .bind(number)
        .fetch_optional(self.pool())
        .await
        .map_err(|err| map_sqlx_error("page_by_book_and_number", err))?;

        row.map(PageRecord::from)
            .ok_or_else(|| StoreError::not_found("page", format!("{book_id}#{number}")))
    }

    async fn pages_for_book(&self, book_id: Uuid) -> Result<Vec<PageRecord>, StoreError> {
        let rows: Vec<PageRow> = sqlx::query_as(
            "SELECT id, page_number, body, book_id FROM pages \
             WHERE book_id = $1 ORDER BY page_number ASC",
        )
        .bind(book_id)
        .fetch_all(self.pool())
        .await
        .map_err(|err| map_sqlx_error("pages_for_book", err))?;

        Ok(rows.into_iter().map(PageRecord::from).collect())
    }

    async fn create_page(&self, params: NewPage) -> Result<PageRecord, StoreError> {
        let id = Uuid::new_v4();

        let row: PageRow = sqlx::query_as(
            "INSERT INTO pages (id, page_number, body, book_id) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, page_number, body, book_id",
        )
        .bind(id)
        .bind(params.page_number)
        .bind(&params.body)
        .bind(params.book_id)
        .fetch_one(self.pool())
        .await
        .map_err(|err| map_sqlx_error("create_page", err))?;

        Ok(PageRecord::from(row))
    }
}
