//! Seam between the layout store and the invalidation bus

use async_trait::async_trait;

use crate::{models::PageKey, Result};

/// Announces that the layout of a page changed
///
/// Implementations deliver at most once per connected session and never
/// replay; a failed publish must not undo the write that triggered it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LayoutPublisher: Send + Sync {
    /// Returns the number of local sessions the event was handed to
    async fn publish(&self, page: &PageKey) -> Result<usize>;
}

/// Publisher for deployments without live sessions
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPublisher;

#[async_trait]
impl LayoutPublisher for NoopPublisher {
    async fn publish(&self, _page: &PageKey) -> Result<usize> {
        Ok(0)
    }
}
