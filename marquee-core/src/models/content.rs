//! Denormalized catalog snapshots stored inside layouts

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

use super::id::ContentId;

/// Snapshot of a catalog item taken when it was added to a layout.
///
/// Not live-synced: later catalog edits do not change stored refs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentRef {
    pub id: ContentId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
    /// Older catalog name for the artwork; kept as sent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_url: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

impl ContentRef {
    #[must_use]
    pub fn new(id: impl Into<ContentId>, title: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            thumbnail_url: None,
            poster_url: None,
            content_type: content_type.into(),
            year: None,
        }
    }

    #[must_use]
    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail_url = Some(url.into());
        self
    }

    /// Artwork to render: `thumbnailUrl`, else `posterUrl`
    #[must_use]
    pub fn thumbnail(&self) -> Option<&str> {
        self.thumbnail_url.as_deref().or(self.poster_url.as_deref())
    }

    #[must_use]
    pub const fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Read a list of refs leniently: elements that cannot be read are skipped.
    ///
    /// Returns the parsed refs and the number of skipped elements.
    pub fn from_values(values: Vec<JsonValue>) -> (Vec<Self>, usize) {
        let total = values.len();
        let refs: Vec<Self> = values
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect();
        let skipped = total - refs.len();
        (refs, skipped)
    }
}

/// `null` reads like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Append `incoming` refs whose id is not already present, keeping order.
///
/// Returns the number of refs actually appended.
pub fn union_by_id(target: &mut Vec<ContentRef>, incoming: impl IntoIterator<Item = ContentRef>) -> usize {
    let before = target.len();
    for item in incoming {
        if !target.iter().any(|existing| existing.id == item.id) {
            target.push(item);
        }
    }
    target.len() - before
}

/// Drop refs whose id already appeared earlier in the list
pub fn dedup_by_id(refs: &mut Vec<ContentRef>) -> usize {
    let before = refs.len();
    let mut seen = std::collections::HashSet::new();
    refs.retain(|item| seen.insert(item.id.clone()));
    before - refs.len()
}
