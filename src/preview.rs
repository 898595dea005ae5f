//! Local thumbnails for files picked for upload
//!
//! Decoding a full-size photo is CPU-bound, so it runs on the blocking pool
//! and the UI only ever receives small RGBA buffers.

use image::imageops::FilterType;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::SyncError;

/// Longest edge of a generated preview
pub const PREVIEW_SIZE: u32 = 160;

/// Decoded RGBA pixels of a preview
#[derive(Clone, PartialEq, Eq)]
pub struct PreviewPixels {
    pub width: u32,
    pub height: u32,
    pub rgba: Arc<Vec<u8>>,
}

impl std::fmt::Debug for PreviewPixels {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewPixels")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.rgba.len())
            .finish()
    }
}

/// Render a preview for `path` off the UI thread
pub async fn render_preview(path: PathBuf) -> Result<PreviewPixels, SyncError> {
    tokio::task::spawn_blocking(move || render_preview_blocking(&path))
        .await
        .map_err(|e| SyncError::Data(format!("preview task failed: {e}")))?
}

/// Blocking version of preview generation
pub fn render_preview_blocking(path: &Path) -> Result<PreviewPixels, SyncError> {
    let img = image::open(path)
        .map_err(|e| SyncError::Data(format!("cannot decode {}: {e}", path.display())))?;

    // Resize maintaining aspect ratio
    let thumbnail = img.resize(PREVIEW_SIZE, PREVIEW_SIZE, FilterType::Triangle);
    let rgba = thumbnail.to_rgba8();
    let (width, height) = rgba.dimensions();

    tracing::debug!(path = %path.display(), width, height, "rendered upload preview");
    Ok(PreviewPixels {
        width,
        height,
        rgba: Arc::new(rgba.into_raw()),
    })
}
