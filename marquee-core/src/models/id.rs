use nanoid::nanoid;
use serde::{Deserialize, Deserializer, Serialize};

use crate::{Error, Result};

/// Generate a 12-character nanoid for entity IDs
pub fn generate_id() -> String {
    nanoid!(12)
}

/// Section ID type (12-character nanoid for editor-created sections)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SectionId(pub String);

impl SectionId {
    #[must_use]
    pub fn new() -> Self {
        Self(generate_id())
    }

    #[must_use]
    pub const fn from_string(id: String) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Catalog content ID
///
/// Always a string on the wire. Numeric ids found in stored documents or
/// request bodies are accepted and stringified.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ContentId(pub String);

impl ContentId {
    #[must_use]
    pub const fn from_string(id: String) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for ContentId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Signed(i64),
            Unsigned(u64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Self(s),
            RawId::Signed(n) => Self(n.to_string()),
            RawId::Unsigned(n) => Self(n.to_string()),
        })
    }
}

impl std::fmt::Display for ContentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ContentId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ContentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Maximum length of a page key
pub const MAX_PAGE_KEY_LEN: usize = 64;

/// Layout page identifier (`home`, `shorts`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageKey(String);

impl PageKey {
    pub const HOME: &'static str = "home";
    pub const SHORTS: &'static str = "shorts";

    /// Parse and validate a page key: 1-64 chars of `[A-Za-z0-9_-]`
    pub fn parse(key: &str) -> Result<Self> {
        if key.is_empty() || key.len() > MAX_PAGE_KEY_LEN {
            return Err(Error::InvalidInput(format!(
                "Page key must be between 1 and {MAX_PAGE_KEY_LEN} characters"
            )));
        }
        if !key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(Error::InvalidInput(format!(
                "Page key contains invalid characters: {key}"
            )));
        }
        Ok(Self(key.to_string()))
    }

    #[must_use]
    pub fn home() -> Self {
        Self(Self::HOME.to_string())
    }

    #[must_use]
    pub fn shorts() -> Self {
        Self(Self::SHORTS.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PageKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id() {
        let id = generate_id();
        assert_eq!(id.len(), 12);
    }

    #[test]
    fn test_section_id() {
        let id1 = SectionId::new();
        let id2 = SectionId::new();
        assert_ne!(id1, id2);
        assert_eq!(id1.as_str().len(), 12);
    }

    #[test]
    fn test_content_id_accepts_numbers() {
        let id: ContentId = serde_json::from_str("5").unwrap();
        assert_eq!(id.as_str(), "5");
        let id: ContentId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(id.as_str(), "abc");
        assert!(serde_json::from_str::<ContentId>("null").is_err());

        // serialized back as a string
        assert_eq!(serde_json::to_string(&ContentId::from("5")).unwrap(), "\"5\"");
    }

    #[test]
    fn test_page_key_validation() {
        assert!(PageKey::parse("home").is_ok());
        assert!(PageKey::parse("kids_home-2").is_ok());
        assert!(PageKey::parse("").is_err());
        assert!(PageKey::parse("../etc").is_err());
        assert!(PageKey::parse("with space").is_err());
        assert!(PageKey::parse(&"x".repeat(MAX_PAGE_KEY_LEN + 1)).is_err());
        assert_eq!(PageKey::home().as_str(), "home");
    }
}
