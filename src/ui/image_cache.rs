//! Image handles for the gallery and the upload previews
//!
//! Remote images are keyed by resolved URL. Each entry is fetched once per
//! screen; a failed fetch or an undecodable payload marks the entry broken and
//! the card shows the broken-image fallback instead of the picture.

use iced::widget::image::Handle;
use std::collections::{HashMap, HashSet};

use codress::error::SyncError;
use codress::state::upload::{PreviewId, UploadCoordinator};

#[derive(Debug, Clone)]
pub enum CachedImage {
    Pending,
    Ready(Handle),
    Broken,
}

#[derive(Debug, Default)]
pub struct ImageCache {
    entries: HashMap<String, CachedImage>,
}

impl ImageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<&CachedImage> {
        self.entries.get(url)
    }

    /// Make the cache mirror `urls`, the full set the gallery shows now
    ///
    /// Entries no longer referenced are dropped; unknown URLs become pending
    /// and are returned for fetching.
    pub fn request<'a>(&mut self, urls: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let wanted: HashSet<&str> = urls.into_iter().collect();
        self.entries.retain(|url, _| wanted.contains(url.as_str()));

        let mut to_fetch = Vec::new();
        for url in wanted {
            if !self.entries.contains_key(url) {
                self.entries.insert(url.to_string(), CachedImage::Pending);
                to_fetch.push(url.to_string());
            }
        }
        to_fetch.sort();
        to_fetch
    }

    /// Store the outcome of a fetch; URLs dropped meanwhile stay dropped
    pub fn resolve(&mut self, url: String, outcome: Result<Vec<u8>, SyncError>) {
        if !self.entries.contains_key(&url) {
            tracing::debug!(%url, "discarding image no longer shown");
            return;
        }
        let entry = match outcome {
            Ok(bytes) if looks_like_image(&bytes) => CachedImage::Ready(Handle::from_bytes(bytes)),
            Ok(_) => {
                tracing::warn!(%url, "image payload is not a picture");
                CachedImage::Broken
            }
            Err(err) => {
                tracing::warn!(%url, error = %err, "error loading image");
                CachedImage::Broken
            }
        };
        self.entries.insert(url, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// GPU handles for the upload previews of one coordinator
///
/// Handles are created once per preview so the renderer keeps its texture,
/// and dropped as soon as the coordinator revokes the preview.
#[derive(Debug, Default)]
pub struct PreviewCache {
    handles: HashMap<PreviewId, Handle>,
}

impl PreviewCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sync(&mut self, upload: &UploadCoordinator) {
        let live: HashSet<PreviewId> = upload.previews().iter().map(|p| p.id).collect();
        self.handles.retain(|id, _| live.contains(id));

        for preview in upload.previews() {
            if let Some(pixels) = &preview.pixels {
                self.handles.entry(preview.id).or_insert_with(|| {
                    Handle::from_rgba(pixels.width, pixels.height, pixels.rgba.as_ref().clone())
                });
            }
        }
    }

    pub fn get(&self, id: PreviewId) -> Option<&Handle> {
        self.handles.get(&id)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }
}

/// Cheap format sniff so an HTML error page is not handed to the decoder
fn looks_like_image(bytes: &[u8]) -> bool {
    image::guess_format(bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use codress::preview::PreviewPixels;
    use codress::state::upload::LocalFile;
    use std::sync::Arc;

    const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn urls_are_requested_once() {
        let mut cache = ImageCache::new();
        assert_eq!(cache.request(["http://a/1.jpg", "http://a/2.jpg"]).len(), 2);
        assert!(cache.request(["http://a/2.jpg", "http://a/1.jpg"]).is_empty());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn superseded_urls_are_dropped() {
        let mut cache = ImageCache::new();
        cache.request(["http://a/1.jpg?t=1", "http://a/2.jpg?t=1"]);
        cache.resolve("http://a/1.jpg?t=1".to_string(), Ok(PNG_MAGIC.to_vec()));

        let to_fetch = cache.request(["http://a/1.jpg?t=2", "http://a/2.jpg?t=2"]);
        assert_eq!(to_fetch, vec!["http://a/1.jpg?t=2", "http://a/2.jpg?t=2"]);
        assert_eq!(cache.len(), 2);
        assert!(cache.get("http://a/1.jpg?t=1").is_none());

        // A late response for a dropped URL does not come back.
        cache.resolve("http://a/2.jpg?t=1".to_string(), Ok(PNG_MAGIC.to_vec()));
        assert!(cache.get("http://a/2.jpg?t=1").is_none());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn failures_and_non_images_are_broken() {
        let mut cache = ImageCache::new();
        cache.request(["http://a/1.jpg", "http://a/2.jpg", "http://a/3.png"]);
        cache.resolve(
            "http://a/1.jpg".to_string(),
            Err(SyncError::Transport("refused".to_string())),
        );
        cache.resolve("http://a/2.jpg".to_string(), Ok(b"<html>".to_vec()));
        cache.resolve("http://a/3.png".to_string(), Ok(PNG_MAGIC.to_vec()));

        assert!(matches!(cache.get("http://a/1.jpg"), Some(CachedImage::Broken)));
        assert!(matches!(cache.get("http://a/2.jpg"), Some(CachedImage::Broken)));
        assert!(matches!(cache.get("http://a/3.png"), Some(CachedImage::Ready(_))));
    }

    #[test]
    fn preview_handles_follow_the_coordinator() {
        let mut upload = UploadCoordinator::new();
        let requests = upload.select_files(vec![
            LocalFile::from_path("/photos/a.jpg").unwrap(),
            LocalFile::from_path("/photos/b.jpg").unwrap(),
        ]);
        let pixels = PreviewPixels {
            width: 1,
            height: 1,
            rgba: Arc::new(vec![0, 0, 0, 255]),
        };
        assert!(upload.attach_preview(requests[0].id, pixels));

        let mut thumbnails = PreviewCache::new();
        thumbnails.sync(&upload);
        assert_eq!(thumbnails.len(), 1);
        assert!(thumbnails.get(requests[0].id).is_some());
        assert!(thumbnails.get(requests[1].id).is_none());

        assert!(upload.cancel());
        thumbnails.sync(&upload);
        assert_eq!(thumbnails.len(), 0);
    }
}
