//! Gallery projection
//!
//! Pure mapping from registry and search state to the cards the wardrobe
//! screen draws. Nothing here performs I/O or mutates state.
//!
//! A record whose URL cannot be resolved becomes an explicit placeholder
//! card at its original position, so counts and indices stay meaningful.

use url::Url;

use crate::error::SyncError;
use crate::state::registry::{RegistryState, RegistryStatus};
use crate::state::search::{SearchState, SearchStatus};

/// Query parameter appended to URLs of freshly mutated images
pub const CACHE_BUST_PARAM: &str = "t";

/// What a card shows in place of its picture
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardContent {
    Image { url: String },
    /// The record could not be rendered; carries the reason
    Invalid { reason: String },
}

impl CardContent {
    pub fn url(&self) -> Option<&str> {
        match self {
            CardContent::Image { url } => Some(url),
            CardContent::Invalid { .. } => None,
        }
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, CardContent::Invalid { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageCard {
    pub index: usize,
    pub title: String,
    pub content: CardContent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchCard {
    pub index: usize,
    pub content: CardContent,
    /// `round(score * 100)`; `None` when the result carried no usable score
    pub percent: Option<i64>,
    pub matched_query: Option<String>,
}

/// Everything the wardrobe screen renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GalleryView {
    pub image_heading: String,
    pub images: Vec<ImageCard>,
    /// Shown instead of the grid when `images` is empty
    pub images_empty_text: Option<&'static str>,
    pub registry_error: Option<String>,
    pub loading: bool,
    pub matches: Vec<MatchCard>,
    pub matches_empty_text: Option<&'static str>,
    pub search_error: Option<String>,
    pub searching: bool,
}

impl GalleryView {
    pub fn placeholder_count(&self) -> usize {
        self.images
            .iter()
            .filter(|card| card.content.is_invalid())
            .count()
            + self
                .matches
                .iter()
                .filter(|card| card.content.is_invalid())
                .count()
    }
}

/// Resolve a record URL for display
///
/// Absolute URLs pass through unchanged. Relative paths are joined onto the
/// backend origin and, when `cache_stamp` is set, get `?t=<stamp>`.
pub fn resolve_url(origin: &Url, path: &str, cache_stamp: Option<i64>) -> Result<String, SyncError> {
    let path = path.trim();
    if path.is_empty() {
        return Err(SyncError::Data("image has no url".to_string()));
    }
    if path.starts_with("http://") || path.starts_with("https://") {
        return Ok(path.to_string());
    }
    let joined = format!(
        "{}/{}",
        origin.as_str().trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    let mut url = Url::parse(&joined)
        .map_err(|e| SyncError::Data(format!("cannot resolve {path:?}: {e}")))?;
    if let Some(stamp) = cache_stamp {
        url.query_pairs_mut()
            .append_pair(CACHE_BUST_PARAM, &stamp.to_string());
    }
    Ok(url.into())
}

fn card_content(origin: &Url, url: Option<&str>, cache_stamp: Option<i64>) -> CardContent {
    let resolved = url
        .ok_or_else(|| SyncError::Data("image has no url".to_string()))
        .and_then(|url| resolve_url(origin, url, cache_stamp));
    match resolved {
        Ok(url) => CardContent::Image { url },
        Err(err) => CardContent::Invalid {
            reason: err.user_message(),
        },
    }
}

/// Project registry and search state into renderable cards
pub fn project(registry: &RegistryState, search: &SearchState, origin: &Url) -> GalleryView {
    let images: Vec<ImageCard> = registry
        .images
        .iter()
        .enumerate()
        .map(|(index, record)| ImageCard {
            index,
            title: record.display_name.clone(),
            content: card_content(origin, record.url.as_deref(), registry.cache_stamp),
        })
        .collect();

    let matches: Vec<MatchCard> = search
        .results
        .iter()
        .enumerate()
        .map(|(index, result)| {
            let percent = result.percent();
            let content = match percent {
                Some(_) => card_content(origin, result.url.as_deref(), None),
                None => CardContent::Invalid {
                    reason: SyncError::Data("result has no score".to_string()).user_message(),
                },
            };
            MatchCard {
                index,
                content,
                percent,
                matched_query: result.matched_query.clone(),
            }
        })
        .collect();

    let image_heading = if images.is_empty() {
        "Uploaded Images".to_string()
    } else {
        format!("Uploaded Images ({})", images.len())
    };
    let images_empty_text = match (images.is_empty(), registry.status) {
        (false, _) => None,
        (true, RegistryStatus::Error) => Some("Images could not be loaded."),
        (true, RegistryStatus::Loading) => Some("Loading images..."),
        (true, _) => Some("No photos yet."),
    };
    let searching = search.status == SearchStatus::Searching;
    let matches_empty_text = match (matches.is_empty(), searching) {
        (false, _) => None,
        (true, true) => Some("Searching..."),
        (true, false) => Some("Search results will appear here"),
    };

    GalleryView {
        image_heading,
        images,
        images_empty_text,
        registry_error: registry.last_error.clone(),
        loading: registry.status == RegistryStatus::Loading,
        matches,
        matches_empty_text,
        search_error: search.error.clone(),
        searching,
    }
}
