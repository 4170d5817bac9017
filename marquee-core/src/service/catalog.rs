//! External content catalog
//!
//! The catalog owns titles, artwork and search. Layouts only keep
//! denormalized [`ContentRef`] snapshots of it, so the integration here is a
//! thin HTTP client used by the content picker and by read-time resolution
//! of automatic sections.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::{
    config::CatalogConfig,
    models::{ContentRef, Section, SectionType},
    Error, Result,
};

/// Catalog search parameters, also used as the query string
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub query: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
    /// `trending` or `newest`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl SearchQuery {
    #[must_use]
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Catalog query that fills an automatic section, if it can be resolved
    /// without a viewer. `continue_watching` is per-viewer and `curated` is
    /// authoritative, so neither resolves.
    #[must_use]
    pub fn for_section(section: &Section, limit: usize) -> Option<Self> {
        let base = Self {
            limit: Some(limit),
            ..Self::default()
        };
        match section.section_type {
            SectionType::Trending => Some(Self {
                sort: Some("trending".to_string()),
                ..base
            }),
            SectionType::NewArrivals => Some(Self {
                sort: Some("newest".to_string()),
                ..base
            }),
            SectionType::GenreRow => section.genre.clone().map(|genre| Self {
                genre: Some(genre),
                ..base
            }),
            SectionType::Curated | SectionType::ContinueWatching => None,
        }
    }
}

/// Source of catalog content summaries
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentResolver: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<ContentRef>>;
}

/// HTTP client for the catalog's `content/search` endpoint
#[derive(Clone)]
pub struct CatalogClient {
    base_url: Url,
    client: Client,
}

impl std::fmt::Debug for CatalogClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl CatalogClient {
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| Error::InvalidInput(format!("Invalid catalog URL: {e}")))?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.timeout_seconds))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| Error::Internal(format!("Failed to build catalog HTTP client: {e}")))?;

        Ok(Self { base_url, client })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn search_url(&self) -> Result<Url> {
        self.base_url
            .join("content/search")
            .map_err(|e| Error::Internal(format!("Failed to build catalog URL: {e}")))
    }
}

#[async_trait]
impl ContentResolver for CatalogClient {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<ContentRef>> {
        let url = self.search_url()?;
        let response = self.client.get(url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Catalog(format!("HTTP {status} from catalog search")));
        }

        // Lenient like stored layouts: a non-array body yields no results
        let body: JsonValue = response.json().await?;
        let JsonValue::Array(items) = body else {
            warn!("Catalog search returned a non-array body");
            return Ok(Vec::new());
        };

        let (refs, skipped) = ContentRef::from_values(items);
        if skipped > 0 {
            warn!(skipped, "Skipped unreadable catalog results");
        }
        debug!(query = %query.query, results = refs.len(), "Catalog search completed");
        Ok(refs)
    }
}
