//! Layout document: ordered hero content plus shelves for one page key
//!
//! Documents are read leniently. Any list field that is not a JSON array
//! (`null`, a string, a number, an object) is coerced to an empty list
//! instead of failing the read, and list elements that cannot be read are
//! skipped. This keeps screens available even when a stored document was
//! corrupted upstream; the [`CoercionReport`] says what was masked.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::collections::HashSet;

use super::content::{dedup_by_id, ContentRef};
use super::id::SectionId;
use super::section::Section;
use crate::Result;

const HERO_FIELD: &str = "heroContent";
const SECTIONS_FIELD: &str = "sections";
const CONTENT_REFS_FIELD: &str = "contentRefs";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Layout {
    pub hero_content: Vec<ContentRef>,
    pub sections: Vec<Section>,
}

/// What lenient reading had to fix in a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoercionReport {
    /// Fields present with a non-array value, replaced by `[]`
    pub coerced_fields: Vec<String>,
    /// Elements skipped because they could not be read
    pub dropped_elements: usize,
    /// Elements removed because their id appeared earlier in the same list
    pub duplicates_removed: usize,
}

impl CoercionReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.coerced_fields.is_empty() && self.dropped_elements == 0 && self.duplicates_removed == 0
    }
}

impl Layout {
    /// The implicit document of a page nobody has saved yet
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hero_content.is_empty() && self.sections.is_empty()
    }

    /// Read an untyped document, coercing malformed fields and normalizing
    #[must_use]
    pub fn from_value(value: JsonValue) -> (Self, CoercionReport) {
        let mut report = CoercionReport::default();

        let mut root = match value {
            JsonValue::Object(map) => map,
            JsonValue::Null => Map::new(),
            _ => {
                report.coerced_fields.push("$".to_string());
                Map::new()
            }
        };

        let hero_values = take_array(&mut root, HERO_FIELD, HERO_FIELD, &mut report);
        let (hero_content, skipped) = ContentRef::from_values(hero_values);
        report.dropped_elements += skipped;

        let section_values = take_array(&mut root, SECTIONS_FIELD, SECTIONS_FIELD, &mut report);
        let sections = section_values
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| read_section(index, value, &mut report))
            .collect();

        let mut layout = Self {
            hero_content,
            sections,
        };
        report.duplicates_removed += layout.normalize();
        (layout, report)
    }

    /// Enforce the structural invariants in place.
    ///
    /// Duplicate ids are dropped (first occurrence wins) in the hero list,
    /// in each section's refs and across sections; `order` is rewritten
    /// from array position. Returns the number of removed duplicates.
    pub fn normalize(&mut self) -> usize {
        let mut removed = dedup_by_id(&mut self.hero_content);

        let before = self.sections.len();
        let mut seen = HashSet::new();
        self.sections.retain(|s| seen.insert(s.id.clone()));
        removed += before - self.sections.len();

        for (position, section) in self.sections.iter_mut().enumerate() {
            section.order = position;
            removed += dedup_by_id(&mut section.content_refs);
        }
        removed
    }

    /// Semantic checks that coercion cannot repair
    pub fn validate(&self) -> Result<()> {
        self.sections.iter().try_for_each(Section::validate)
    }

    pub fn to_value(&self) -> Result<JsonValue> {
        Ok(serde_json::to_value(self)?)
    }

    #[must_use]
    pub fn section(&self, id: &SectionId) -> Option<&Section> {
        self.sections.iter().find(|s| &s.id == id)
    }

    pub fn section_mut(&mut self, id: &SectionId) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| &s.id == id)
    }

    #[must_use]
    pub fn section_index(&self, id: &SectionId) -> Option<usize> {
        self.sections.iter().position(|s| &s.id == id)
    }
}

/// Remove `key` from `object` and return it as a list, coercing non-arrays
fn take_array(
    object: &mut Map<String, JsonValue>,
    key: &str,
    path: &str,
    report: &mut CoercionReport,
) -> Vec<JsonValue> {
    match object.remove(key) {
        Some(JsonValue::Array(items)) => items,
        None => Vec::new(),
        Some(_) => {
            report.coerced_fields.push(path.to_string());
            Vec::new()
        }
    }
}

fn read_section(index: usize, value: JsonValue, report: &mut CoercionReport) -> Option<Section> {
    let JsonValue::Object(mut object) = value else {
        report.dropped_elements += 1;
        return None;
    };

    // position is order; a stored value is never trusted
    object.remove("order");

    let path = format!("{SECTIONS_FIELD}[{index}].{CONTENT_REFS_FIELD}");
    let ref_values = take_array(&mut object, CONTENT_REFS_FIELD, &path, report);

    match serde_json::from_value::<Section>(JsonValue::Object(object)) {
        Ok(mut section) => {
            let (refs, skipped) = ContentRef::from_values(ref_values);
            report.dropped_elements += skipped;
            section.content_refs = refs;
            Some(section)
        }
        Err(_) => {
            report.dropped_elements += 1;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SectionType;
    use serde_json::json;

    #[test]
    fn test_null_sections_coerced_to_empty() {
        let (layout, report) = Layout::from_value(json!({
            "heroContent": [{"id": "a", "title": "A"}],
            "sections": null
        }));
        assert!(layout.sections.is_empty());
        assert_eq!(layout.hero_content.len(), 1);
        assert_eq!(report.coerced_fields, vec!["sections".to_string()]);
    }

    #[test]
    fn test_string_fields_coerced_to_empty() {
        let (layout, report) = Layout::from_value(json!({
            "heroContent": "[{\"id\":\"a\"}]",
            "sections": "oops"
        }));
        assert!(layout.is_empty());
        assert_eq!(report.coerced_fields.len(), 2);
    }

    #[test]
    fn test_missing_fields_default_silently() {
        let (layout, report) = Layout::from_value(json!({}));
        assert_eq!(layout, Layout::empty());
        assert!(report.is_clean());

        let (layout, report) = Layout::from_value(JsonValue::Null);
        assert_eq!(layout, Layout::empty());
        assert!(report.is_clean());
    }

    #[test]
    fn test_non_object_document() {
        let (layout, report) = Layout::from_value(json!("garbage"));
        assert!(layout.is_empty());
        assert_eq!(report.coerced_fields, vec!["$".to_string()]);
    }

    #[test]
    fn test_section_content_refs_coerced_and_order_rewritten() {
        let (layout, report) = Layout::from_value(json!({
            "sections": [
                {"id": "s1", "type": "curated", "title": "Picks", "order": 7, "contentRefs": null},
                {"id": "s2", "type": "trending", "title": "Hot", "order": -3}
            ]
        }));
        assert_eq!(layout.sections.len(), 2);
        assert_eq!(layout.sections[0].order, 0);
        assert_eq!(layout.sections[1].order, 1);
        assert!(layout.sections[0].content_refs.is_empty());
        assert_eq!(report.coerced_fields, vec!["sections[0].contentRefs".to_string()]);
    }

    #[test]
    fn test_unreadable_elements_dropped() {
        let (layout, report) = Layout::from_value(json!({
            "heroContent": [42, {"id": "ok"}],
            "sections": [
                "nope",
                {"id": "s1", "type": "unknown_type"},
                {"id": "s2", "type": "curated", "contentRefs": [{"id": 1}, true]}
            ]
        }));
        assert_eq!(layout.hero_content.len(), 1);
        assert_eq!(layout.sections.len(), 1);
        assert_eq!(layout.sections[0].content_refs.len(), 1);
        assert_eq!(report.dropped_elements, 4);
    }

    #[test]
    fn test_normalize_removes_duplicates() {
        let mut layout = Layout {
            hero_content: vec![
                ContentRef::new("1", "one", "movie"),
                ContentRef::new("1", "dup", "movie"),
            ],
            sections: vec![
                Section::with_id("s".into(), SectionType::Curated),
                Section::with_id("s".into(), SectionType::Trending),
            ],
        };
        assert_eq!(layout.normalize(), 2);
        assert_eq!(layout.hero_content.len(), 1);
        assert_eq!(layout.sections.len(), 1);
        assert_eq!(layout.sections[0].section_type, SectionType::Curated);
    }

    #[test]
    fn test_serialized_shape_is_camel_case() {
        let mut layout = Layout::empty();
        layout.sections.push(Section::with_id("s1".into(), SectionType::NewArrivals));
        let value = layout.to_value().unwrap();
        assert!(value.get("heroContent").is_some());
        assert_eq!(value["sections"][0]["type"], "new_arrivals");
        assert!(value["sections"][0]["contentRefs"].is_array());
    }

    #[test]
    fn test_typed_round_trip_through_lenient_reader() {
        let mut layout = Layout::empty();
        layout.hero_content.push(ContentRef::new("h1", "Hero", "movie").with_year(2024));
        let mut section = Section::with_id("g".into(), SectionType::GenreRow);
        section.genre = Some("Drama".to_string());
        layout.sections.push(section);

        let (read, report) = Layout::from_value(layout.to_value().unwrap());
        assert_eq!(read, layout);
        assert!(report.is_clean());
    }

    #[test]
    fn test_artwork_variants_and_null_strings_survive() {
        let (layout, report) = Layout::from_value(json!({
            "heroContent": [
                {"id": "a", "title": "A", "type": "movie", "thumbnailUrl": "t.jpg", "posterUrl": "p.jpg"},
                {"id": "b", "title": null, "type": "movie"}
            ]
        }));

        assert_eq!(layout.hero_content.len(), 2);
        assert_eq!(report.dropped_elements, 0);
        assert_eq!(layout.hero_content[0].poster_url.as_deref(), Some("p.jpg"));
        assert_eq!(layout.hero_content[1].title, "");
    }
}
