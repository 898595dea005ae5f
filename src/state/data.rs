//! Shared data structures for the application state
//!
//! These structs represent the data model that flows between
//! the API layer, the coordinators and the gallery projection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Represents a single catalog image known to the registry
///
/// `url` stays optional so that a partial record from the server survives
/// parsing and is rendered as a placeholder instead of vanishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord {
    /// Filename, unique within a user's registry
    pub identity: String,
    /// Server-relative path (e.g. "/data/3f2a.jpg") or absolute URL
    pub url: Option<String>,
    /// Label shown under the card
    pub display_name: String,
}

impl ImageRecord {
    pub fn new(identity: impl Into<String>, url: impl Into<String>) -> Self {
        let identity = identity.into();
        Self {
            display_name: identity.clone(),
            url: Some(url.into()),
            identity,
        }
    }
}

/// One image entry as the server sends it
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ImageWire {
    #[serde(default)]
    pub filename: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
}

impl From<ImageWire> for ImageRecord {
    fn from(wire: ImageWire) -> Self {
        let identity = wire
            .filename
            .clone()
            .or_else(|| wire.id.map(|id| format!("#{id}")))
            .unwrap_or_default();
        // Fall back to the last URL segment when the filename is missing.
        let display_name = match (&wire.filename, &wire.url) {
            (Some(name), _) => name.clone(),
            (None, Some(url)) => url.rsplit('/').next().unwrap_or_default().to_string(),
            (None, None) => String::new(),
        };
        Self {
            identity,
            url: wire.url.filter(|url| !url.trim().is_empty()),
            display_name,
        }
    }
}

/// Style filter offered next to the free-text query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleFilter {
    #[default]
    Casual,
    Formal,
}

impl StyleFilter {
    pub const ALL: [StyleFilter; 2] = [StyleFilter::Casual, StyleFilter::Formal];

    pub fn as_str(self) -> &'static str {
        match self {
            StyleFilter::Casual => "casual",
            StyleFilter::Formal => "formal",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            StyleFilter::Casual => "Casual",
            StyleFilter::Formal => "Formal",
        }
    }
}

impl fmt::Display for StyleFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A style + free-text query
///
/// `free_text` may join several garment terms ("blue jacket and black
/// skirt"); splitting them is the server's job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub style_filter: StyleFilter,
    pub free_text: String,
}

impl SearchQuery {
    /// Body of `POST /api/search`
    ///
    /// The style is prefixed to the query text to sharpen matching and is
    /// also sent on its own.
    pub fn to_payload(&self) -> SearchRequest {
        SearchRequest {
            query: format!("{} {}", self.style_filter.as_str(), self.free_text.trim())
                .trim()
                .to_string(),
            style: self.style_filter.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub style: String,
}

/// One ranked match returned by the search service
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub url: Option<String>,
    /// Server-side score in [0, 1]; `None` when the server sent none
    pub score: Option<f32>,
    /// Sub-query this match answers, when the server split the query
    pub matched_query: Option<String>,
}

impl SearchResult {
    /// Score as a whole percentage for display; no re-ranking happens here
    ///
    /// `None` for a missing or non-finite score.
    pub fn percent(&self) -> Option<i64> {
        self.score
            .filter(|score| score.is_finite())
            .map(|score| (score * 100.0).round() as i64)
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchResultWire {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub score: Option<f32>,
    #[serde(default)]
    pub query: Option<String>,
}

impl From<SearchResultWire> for SearchResult {
    fn from(wire: SearchResultWire) -> Self {
        Self {
            url: wire.url.filter(|url| !url.trim().is_empty()),
            score: wire.score,
            matched_query: wire.query.filter(|query| !query.is_empty()),
        }
    }
}

/// Response of `POST /api/upload`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default, rename = "allImages")]
    pub all_images: Option<Vec<ImageWire>>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Body of `POST /api/login` and `POST /api/register`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

/// Response of `POST /api/login` and `POST /api/register`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuthResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub user: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn wire_record_without_url_keeps_identity() {
        let wire: ImageWire = serde_json::from_str(r#"{"filename": "a.jpg", "id": 3}"#).unwrap();
        let record = ImageRecord::from(wire);
        assert_eq!(record.identity, "a.jpg");
        assert_eq!(record.url, None);
    }

    #[test]
    fn display_name_falls_back_to_url_segment() {
        let wire: ImageWire = serde_json::from_str(r#"{"url": "/data/b.png"}"#).unwrap();
        let record = ImageRecord::from(wire);
        assert_eq!(record.display_name, "b.png");
    }

    #[test]
    fn query_payload_prefixes_style() {
        let query = SearchQuery {
            style_filter: StyleFilter::Formal,
            free_text: "  blue jacket and black skirt ".to_string(),
        };
        assert_eq!(
            query.to_payload(),
            SearchRequest {
                query: "formal blue jacket and black skirt".to_string(),
                style: "formal".to_string(),
            }
        );
    }

    #[test]
    fn score_percent_rounds() {
        let result = SearchResult {
            url: None,
            score: Some(0.876),
            matched_query: None,
        };
        assert_eq!(result.percent(), Some(88));
    }

    #[test]
    fn missing_or_nan_score_has_no_percent() {
        let wire: SearchResultWire = serde_json::from_str(r#"{"url": "/data/a.jpg"}"#).unwrap();
        let missing = SearchResult::from(wire);
        assert_eq!(missing.score, None);
        assert_eq!(missing.percent(), None);

        let nan = SearchResult {
            score: Some(f32::NAN),
            ..missing
        };
        assert_eq!(nan.percent(), None);
    }

    #[test]
    fn upload_response_reads_camel_case_list() {
        let response: UploadResponse = serde_json::from_str(
            r#"{"success": true, "allImages": [{"filename": "x.jpg", "url": "/data/x.jpg"}]}"#,
        )
        .unwrap();
        assert!(response.success);
        assert_eq!(response.all_images.map(|list| list.len()), Some(1));
    }
}
