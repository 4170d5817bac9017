//! Layout document repository
//!
//! One row per page key holding the whole document as JSONB. Writes are a
//! single upsert statement: there is no version column and no lock, the last
//! successful write is authoritative.

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value as JsonValue;
use sqlx::{PgPool, Row};
use std::sync::Arc;
use tracing::debug;

use crate::{models::PageKey, Result};

/// Persistence for raw layout documents
///
/// Documents are returned untyped so that callers can coerce malformed
/// stored data instead of failing the read.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LayoutRepository: Send + Sync {
    /// Stored document for a page, if any
    async fn load(&self, page: &PageKey) -> Result<Option<JsonValue>>;

    /// Replace the whole document for a page
    async fn store(&self, page: &PageKey, document: &JsonValue) -> Result<()>;

    /// Page keys that have a stored document, sorted
    async fn list_pages(&self) -> Result<Vec<PageKey>>;
}

/// Postgres-backed layout repository
#[derive(Clone)]
pub struct PgLayoutRepository {
    pool: PgPool,
}

impl PgLayoutRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LayoutRepository for PgLayoutRepository {
    async fn load(&self, page: &PageKey) -> Result<Option<JsonValue>> {
        let row = sqlx::query(
            r"
            SELECT document
            FROM layouts
            WHERE page_key = $1
            ",
        )
        .bind(page.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let document: JsonValue = row.try_get("document")?;
                Ok(Some(document))
            }
            None => Ok(None),
        }
    }

    async fn store(&self, page: &PageKey, document: &JsonValue) -> Result<()> {
        sqlx::query(
            r"
            INSERT INTO layouts (page_key, document, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (page_key)
            DO UPDATE SET document = EXCLUDED.document, updated_at = NOW()
            ",
        )
        .bind(page.as_str())
        .bind(sqlx::types::Json(document))
        .execute(&self.pool)
        .await?;

        debug!(page = %page, "Stored layout document");
        Ok(())
    }

    async fn list_pages(&self) -> Result<Vec<PageKey>> {
        let rows = sqlx::query(
            r"
            SELECT page_key
            FROM layouts
            ORDER BY page_key
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut pages = Vec::with_capacity(rows.len());
        for row in rows {
            let key: String = row.try_get("page_key")?;
            pages.push(PageKey::parse(&key)?);
        }
        Ok(pages)
    }
}

/// In-process layout repository
///
/// Used by tests and by the `memory` storage backend. Contents are lost on
/// restart.
#[derive(Clone, Default)]
pub struct MemoryLayoutRepository {
    documents: Arc<DashMap<PageKey, JsonValue>>,
}

impl MemoryLayoutRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw document, bypassing any validation
    pub fn insert_raw(&self, page: PageKey, document: JsonValue) {
        self.documents.insert(page, document);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[async_trait]
impl LayoutRepository for MemoryLayoutRepository {
    async fn load(&self, page: &PageKey) -> Result<Option<JsonValue>> {
        Ok(self.documents.get(page).map(|doc| doc.value().clone()))
    }

    async fn store(&self, page: &PageKey, document: &JsonValue) -> Result<()> {
        self.documents.insert(page.clone(), document.clone());
        Ok(())
    }

    async fn list_pages(&self) -> Result<Vec<PageKey>> {
        let mut pages: Vec<PageKey> = self.documents.iter().map(|e| e.key().clone()).collect();
        pages.sort();
        Ok(pages)
    }
}
