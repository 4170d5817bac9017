use serde::{Deserialize, Serialize};

use super::content::ContentRef;
use super::id::{ContentId, SectionId};
use crate::{Error, Result};

/// Shelf kind
///
/// Only `Curated` sections carry authoritative refs; the others may hold
/// empty placeholders that are filled from the catalog at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionType {
    Trending,
    NewArrivals,
    GenreRow,
    Curated,
    ContinueWatching,
}

impl SectionType {
    pub const ALL: [Self; 5] = [
        Self::Trending,
        Self::NewArrivals,
        Self::GenreRow,
        Self::Curated,
        Self::ContinueWatching,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Trending => "trending",
            Self::NewArrivals => "new_arrivals",
            Self::GenreRow => "genre_row",
            Self::Curated => "curated",
            Self::ContinueWatching => "continue_watching",
        }
    }

    /// Default title for a freshly added section
    #[must_use]
    pub const fn display_label(self) -> &'static str {
        match self {
            Self::Trending => "Trending Now",
            Self::NewArrivals => "New Arrivals",
            Self::GenreRow => "Genre",
            Self::Curated => "Curated Collection",
            Self::ContinueWatching => "Continue Watching",
        }
    }

    #[must_use]
    pub const fn is_curated(self) -> bool {
        matches!(self, Self::Curated)
    }
}

impl std::fmt::Display for SectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SectionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::InvalidInput(format!("Unknown section type: {s}")))
    }
}

/// A named, ordered shelf of content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: SectionId,
    #[serde(rename = "type")]
    pub section_type: SectionType,
    #[serde(default)]
    pub title: String,
    /// Mirrors the array position; rewritten on every normalization
    #[serde(default)]
    pub order: usize,
    #[serde(default)]
    pub content_refs: Vec<ContentRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,
}

impl Section {
    /// New empty section titled with the type's display label
    #[must_use]
    pub fn new(section_type: SectionType) -> Self {
        Self::with_id(SectionId::new(), section_type)
    }

    #[must_use]
    pub fn with_id(id: SectionId, section_type: SectionType) -> Self {
        Self {
            id,
            section_type,
            title: section_type.display_label().to_string(),
            order: 0,
            content_refs: Vec::new(),
            genre: None,
        }
    }

    #[must_use]
    pub fn contains(&self, content_id: &ContentId) -> bool {
        self.content_refs.iter().any(|c| &c.id == content_id)
    }

    /// `genre_row` sections need a non-blank genre
    pub fn validate(&self) -> Result<()> {
        if self.section_type == SectionType::GenreRow
            && self.genre.as_deref().map_or(true, |g| g.trim().is_empty())
        {
            return Err(Error::InvalidInput(format!(
                "Section {} is a genre_row without a genre",
                self.id
            )));
        }
        Ok(())
    }

    /// Whether the section should be filled from the catalog at read time
    #[must_use]
    pub fn needs_resolution(&self) -> bool {
        !self.section_type.is_curated() && self.content_refs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_type_round_trip_names() {
        for t in SectionType::ALL {
            let parsed: SectionType = t.as_str().parse().unwrap();
            assert_eq!(parsed, t);
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{}\"", t.as_str()));
        }
        assert!("carousel".parse::<SectionType>().is_err());
    }

    #[test]
    fn test_new_section_defaults() {
        let section = Section::new(SectionType::NewArrivals);
        assert_eq!(section.title, "New Arrivals");
        assert!(section.content_refs.is_empty());
        assert!(section.genre.is_none());
        assert!(section.needs_resolution());
    }

    #[test]
    fn test_genre_row_requires_genre() {
        let mut section = Section::new(SectionType::GenreRow);
        assert!(section.validate().is_err());
        section.genre = Some("   ".to_string());
        assert!(section.validate().is_err());
        section.genre = Some("Horror".to_string());
        assert!(section.validate().is_ok());
    }

    #[test]
    fn test_curated_never_needs_resolution() {
        let section = Section::new(SectionType::Curated);
        assert!(!section.needs_resolution());
    }
}
