//! Per-screen layout cache
//!
//! A screen shows the last layout it managed to read. Invalidation events
//! for its page and focus changes trigger a full re-read; a failed read never
//! blanks a screen that already has content.

use marquee_cluster::LayoutEvent;
use marquee_core::models::{Layout, PageKey};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::source::LayoutSource;

/// Freshness of the cached layout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Nothing loaded yet
    Loading,
    Ready,
    /// Known to be outdated; a refetch is pending or failed
    Stale,
    /// Nothing could ever be loaded
    Error,
}

pub struct ClientLayoutCache {
    page: PageKey,
    source: Arc<dyn LayoutSource>,
    layout: Option<Layout>,
    status: CacheStatus,
    last_error: Option<String>,
}

impl ClientLayoutCache {
    #[must_use]
    pub fn new(page: PageKey, source: Arc<dyn LayoutSource>) -> Self {
        Self {
            page,
            source,
            layout: None,
            status: CacheStatus::Loading,
            last_error: None,
        }
    }

    #[must_use]
    pub fn page(&self) -> &PageKey {
        &self.page
    }

    #[must_use]
    pub fn layout(&self) -> Option<&Layout> {
        self.layout.as_ref()
    }

    #[must_use]
    pub fn status(&self) -> CacheStatus {
        self.status
    }

    /// Message of the most recent failed read, cleared by a successful one
    #[must_use]
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// First read when the screen appears
    pub async fn mount(&mut self) -> CacheStatus {
        self.refresh().await
    }

    /// React to an invalidation event. Returns false if it was for another page.
    pub async fn on_event(&mut self, event: &LayoutEvent) -> bool {
        if !event.concerns(&self.page) {
            return false;
        }

        debug!(page = %self.page, "Layout invalidated, refetching");
        self.mark_stale();
        self.refresh().await;
        true
    }

    /// Opportunistic re-read on focus or foreground, whatever the status
    pub async fn on_focus(&mut self) -> CacheStatus {
        self.refresh().await
    }

    /// The push channel came back; anything sent meanwhile was lost
    pub async fn on_reconnect(&mut self) -> CacheStatus {
        self.mark_stale();
        self.refresh().await
    }

    fn mark_stale(&mut self) {
        if self.layout.is_some() {
            self.status = CacheStatus::Stale;
        }
    }

    async fn refresh(&mut self) -> CacheStatus {
        match self.source.fetch(&self.page).await {
            Ok(layout) => {
                self.layout = Some(layout);
                self.status = CacheStatus::Ready;
                self.last_error = None;
            }
            Err(e) => {
                warn!(page = %self.page, error = %e, "Failed to fetch layout, keeping last good copy");
                self.last_error = Some(e.to_string());
                if self.layout.is_none() {
                    self.status = CacheStatus::Error;
                }
            }
        }
        self.status
    }
}

impl std::fmt::Debug for ClientLayoutCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientLayoutCache")
            .field("page", &self.page)
            .field("status", &self.status)
            .field("loaded", &self.layout.is_some())
            .finish_non_exhaustive()
    }
}
