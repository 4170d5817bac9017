use marquee_core::models::PageKey;
use serde::{Deserialize, Serialize};

/// Events carried by the layout invalidation channel
///
/// On the wire: `{"event":"layout_updated","page":"home"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LayoutEvent {
    /// The stored layout of `page` was replaced
    LayoutUpdated { page: PageKey },
}

impl LayoutEvent {
    #[must_use]
    pub fn updated(page: PageKey) -> Self {
        Self::LayoutUpdated { page }
    }

    #[must_use]
    pub fn page(&self) -> &PageKey {
        match self {
            Self::LayoutUpdated { page } => page,
        }
    }

    /// Whether the event concerns `page`
    #[must_use]
    pub fn concerns(&self, page: &PageKey) -> bool {
        self.page() == page
    }

    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::LayoutUpdated { .. } => "layout_updated",
        }
    }
}
