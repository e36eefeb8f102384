//! Postgres-backed catalog store.

mod authors;
mod books;
mod pages;

use std::sync::Arc;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::application::repos::StoreError;
use crate::config::DatabaseSettings;
use crate::domain::slug::DEFAULT_SEPARATOR;

#[derive(Clone)]
pub struct PostgresCatalog {
    pool: Arc<PgPool>,
    slug_separator: char,
}

impl PostgresCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self::with_slug_separator(pool, DEFAULT_SEPARATOR)
    }

    /// Use the configured separator when deriving slugs on insert.
    pub fn with_slug_separator(pool: PgPool, slug_separator: char) -> Self {
        Self {
            pool: Arc::new(pool),
            slug_separator,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub(crate) fn slug_separator(&self) -> char {
        self.slug_separator
    }

    /// Open a connection pool using the validated database settings.
    pub async fn connect(settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections.get())
            .acquire_timeout(settings.acquire_timeout)
            .connect(&settings.url)
            .await?;
        info!(
            max_connections = settings.max_connections.get(),
            "catalog database pool established"
        );
        Ok(pool)
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }
}

pub(crate) fn map_sqlx_error(op: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::Decode(_) => StoreError::scan(op, err),
        sqlx::Error::Database(db) if db.message().contains("duplicate key") => {
            StoreError::Duplicate {
                constraint: db.constraint().unwrap_or("unknown").to_string(),
            }
        }
        sqlx::Error::Database(db)
            if db.message().contains("violates foreign key constraint")
                || db.message().contains("violates check constraint")
                || db.message().contains("invalid input syntax") =>
        {
            StoreError::InvalidInput {
                op,
                message: db.message().to_string(),
            }
        }
        other => StoreError::query(op, other),
    }
}
