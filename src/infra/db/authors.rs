use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{AuthorsStore, ListWindow, NewAuthor, StoreError};
use crate::domain::entities::AuthorRecord;
use crate::domain::slug::slugify_with;

use super::{PostgresCatalog, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct AuthorRow {
    id: Uuid,
    name: String,
    slug: String,
}

impl From<AuthorRow> for AuthorRecord {
    fn from(row: AuthorRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            slug: row.slug,
        }
    }
}

#[async_trait]
impl AuthorsStore for PostgresCatalog {
    async fn list_authors(&self, window: ListWindow) -> Result<Vec<AuthorRecord>, StoreError> {
        let rows: Vec<AuthorRow> = sqlx::query_as(
            "SELECT id, name, slug FROM authors ORDER BY name ASC LIMIT $1 OFFSET $2",
        )
        .bind(window.limit())
        .bind(window.offset())
        .fetch_all(self.pool())
        .await
        .map_err(|err| map_sqlx_error("list_authors", err))?;

        Ok(rows.into_iter().map(AuthorRecord::from).collect())
    }

    async fn author_by_id(&self, id: Uuid) -> Result<AuthorRecord, StoreError> {
        let row: Option<AuthorRow> =
            sqlx::query_as("SELECT id, name, slug FROM authors WHERE id = $1")
                .bind(id)
                .fetch_optional(self.pool())
                .await
                .map_err(|err| map_sqlx_error("author_by_id", err))?;

        row.map(AuthorRecord::from)
            .ok_or_else(|| StoreError::not_found("author", id))
    }

    async fn author_by_slug(&self, slug: &str) -> Result<AuthorRecord, StoreError> {
        let row: Option<AuthorRow> =
            sqlx::query_as("SELECT id, name, slug FROM authors WHERE slug = $1")
                .bind(slug)
                .fetch_optional(self.pool())
                .await
                .map_err(|err| map_sqlx_error("author_by_slug", err))?;

        row.map(AuthorRecord::from)
            .ok_or_else(|| StoreError::not_found("author", slug))
    }

    async fn create_author(&self, params: NewAuthor) -> Result<AuthorRecord, StoreError> {
        let id = Uuid::new_v4();
        let slug = slugify_with(&params.name, self.slug_separator());

        let row: AuthorRow = sqlx::query_as(
            "INSERT INTO authors (id, name, slug) VALUES ($1, $2, $3) \
             RETURNING id, name, slug",
        )
        .bind(id)
        .bind(&params.name)
        .bind(&slug)
        .fetch_one(self.pool())
        .await
        .map_err(|err| map_sqlx_error("create_author", err))?;

        Ok(AuthorRecord::from(row))
    }
}
