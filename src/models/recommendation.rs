use serde::{Deserialize, Serialize};

use super::Movie;

/// Kind of feed section, used by clients to pick a presentation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SectionType {
    Recommended,
    Trending,
    GenreBased,
    Similar,
    Watched,
}

/// A titled, ordered group of movies shown together in the feed
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationSection {
    pub title: String,
    pub movies: Vec<Movie>,
    #[serde(rename = "type")]
    pub section_type: SectionType,
}

impl RecommendationSection {
    pub fn new(title: impl Into<String>, movies: Vec<Movie>, section_type: SectionType) -> Self {
        Self {
            title: title.into(),
            movies,
            section_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_section_type_serialization() {
        assert_eq!(
            serde_json::to_string(&SectionType::GenreBased).unwrap(),
            "\"genre-based\""
        );
        assert_eq!(
            serde_json::to_string(&SectionType::Trending).unwrap(),
            "\"trending\""
        );
    }

    #[test]
    fn test_section_serializes_type_tag() {
        let section = RecommendationSection::new("Trending Now", vec![], SectionType::Trending);
        let json = serde_json::to_value(&section).unwrap();
        assert_eq!(json["title"], "Trending Now");
        assert_eq!(json["type"], "trending");
        assert!(json["movies"].as_array().unwrap().is_empty());
    }
}
