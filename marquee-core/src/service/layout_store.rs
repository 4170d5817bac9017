//! Authoritative layout documents
//!
//! `get` never fails on a missing page: an unsaved page reads as the empty
//! layout. `put` replaces the whole document (no field-level patch, no
//! optimistic lock, last writer wins) and then announces the change.

use futures::future::join_all;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    models::{CoercionReport, Layout, PageKey},
    repository::LayoutRepository,
    service::{
        catalog::{ContentResolver, SearchQuery},
        publisher::LayoutPublisher,
    },
    Result,
};

/// Default number of catalog items fetched per automatic section
pub const DEFAULT_RESOLVE_LIMIT: usize = 20;

#[derive(Clone)]
pub struct LayoutStore {
    repository: Arc<dyn LayoutRepository>,
    publisher: Arc<dyn LayoutPublisher>,
    resolver: Option<Arc<dyn ContentResolver>>,
    resolve_limit: usize,
}

impl std::fmt::Debug for LayoutStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LayoutStore")
            .field("catalog_enabled", &self.resolver.is_some())
            .field("resolve_limit", &self.resolve_limit)
            .finish_non_exhaustive()
    }
}

impl LayoutStore {
    pub fn new(repository: Arc<dyn LayoutRepository>, publisher: Arc<dyn LayoutPublisher>) -> Self {
        Self {
            repository,
            publisher,
            resolver: None,
            resolve_limit: DEFAULT_RESOLVE_LIMIT,
        }
    }

    /// Enable read-time resolution of automatic sections
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn ContentResolver>, resolve_limit: usize) -> Self {
        self.resolver = Some(resolver);
        self.resolve_limit = resolve_limit;
        self
    }

    #[must_use]
    pub fn resolver(&self) -> Option<&Arc<dyn ContentResolver>> {
        self.resolver.as_ref()
    }

    /// Stored layout for a page, or the empty layout if none was saved
    pub async fn get(&self, page: &PageKey) -> Result<Layout> {
        let Some(document) = self.repository.load(page).await? else {
            debug!(page = %page, "No stored layout, returning empty layout");
            return Ok(Layout::empty());
        };

        let (layout, report) = Layout::from_value(document);
        log_coercion(page, "read", &report);
        Ok(layout)
    }

    /// Replace the layout of a page and announce the change
    ///
    /// Returns the persisted document after normalization.
    pub async fn put(&self, page: &PageKey, mut layout: Layout) -> Result<Layout> {
        let removed = layout.normalize();
        if removed > 0 {
            warn!(page = %page, duplicates_removed = removed, "Dropped duplicate ids from layout");
        }
        self.persist(page, layout).await
    }

    /// Replace the layout of a page from an untyped body
    ///
    /// Malformed list fields are coerced to empty lists instead of rejected.
    pub async fn put_raw(&self, page: &PageKey, document: JsonValue) -> Result<Layout> {
        let (layout, report) = Layout::from_value(document);
        log_coercion(page, "write", &report);
        self.persist(page, layout).await
    }

    /// Pages that have a stored document
    pub async fn list_pages(&self) -> Result<Vec<PageKey>> {
        self.repository.list_pages().await
    }

    /// Stored layout with empty automatic sections filled from the catalog
    ///
    /// Resolution is best effort and never persisted: a catalog failure
    /// leaves the placeholder empty.
    pub async fn get_resolved(&self, page: &PageKey) -> Result<Layout> {
        let mut layout = self.get(page).await?;
        let Some(resolver) = &self.resolver else {
            return Ok(layout);
        };

        let pending: Vec<(usize, SearchQuery)> = layout
            .sections
            .iter()
            .enumerate()
            .filter(|(_, section)| section.needs_resolution())
            .filter_map(|(index, section)| {
                SearchQuery::for_section(section, self.resolve_limit).map(|q| (index, q))
            })
            .collect();

        let results = join_all(pending.iter().map(|(_, query)| resolver.search(query))).await;

        for ((index, _), result) in pending.iter().zip(results) {
            let section = &mut layout.sections[*index];
            match result {
                Ok(mut refs) => {
                    refs.truncate(self.resolve_limit);
                    section.content_refs = refs;
                    crate::models::content::dedup_by_id(&mut section.content_refs);
                }
                Err(e) => {
                    warn!(
                        page = %page,
                        section_id = %section.id,
                        error = %e,
                        "Failed to resolve section from catalog, leaving placeholder"
                    );
                }
            }
        }

        Ok(layout)
    }

    async fn persist(&self, page: &PageKey, layout: Layout) -> Result<Layout> {
        layout.validate()?;

        let document = layout.to_value()?;
        self.repository.store(page, &document).await?;

        info!(
            page = %page,
            hero_items = layout.hero_content.len(),
            sections = layout.sections.len(),
            "Layout saved"
        );

        match self.publisher.publish(page).await {
            Ok(sessions) => debug!(page = %page, sessions, "Published layout invalidation"),
            Err(e) => warn!(page = %page, error = %e, "Failed to publish layout invalidation"),
        }

        Ok(layout)
    }
}

fn log_coercion(page: &PageKey, direction: &str, report: &CoercionReport) {
    if !report.is_clean() {
        warn!(
            page = %page,
            direction,
            coerced_fields = ?report.coerced_fields,
            dropped_elements = report.dropped_elements,
            duplicates_removed = report.duplicates_removed,
            "Coerced malformed layout document"
        );
    }
}
