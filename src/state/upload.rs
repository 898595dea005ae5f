//! Upload coordinator
//!
//! Turns a local file selection into one multipart upload. On success the
//! registry is replaced with the server's full post-upload list; on failure
//! nothing outside this coordinator changes. Only one upload may be in flight.
//!
//! Preview handles are cosmetic: they are issued per selected file, filled in
//! asynchronously, and revoked whenever they stop being displayed.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::data::ImageRecord;
use super::registry::{Applied, Generation, ImageRegistry};
use crate::error::SyncError;
use crate::preview::PreviewPixels;

/// Extensions the catalog server accepts
pub const ACCEPTED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// A file picked on the local machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub path: PathBuf,
    pub file_name: String,
}

impl LocalFile {
    /// Build from a path; `None` when the path has no usable file name
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let file_name = path.file_name()?.to_string_lossy().to_string();
        Some(Self { path, file_name })
    }

    pub fn has_accepted_extension(&self) -> bool {
        has_accepted_extension(&self.path)
    }
}

fn has_accepted_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| ACCEPTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Recursively collect every accepted image under `folder`, sorted by path
pub fn collect_folder(folder: &Path) -> Vec<LocalFile> {
    let mut files: Vec<LocalFile> = WalkDir::new(folder)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file() && has_accepted_extension(entry.path()))
        .filter_map(|entry| LocalFile::from_path(entry.into_path()))
        .collect();
    files.sort_by(|a, b| a.path.cmp(&b.path));
    tracing::debug!(folder = %folder.display(), count = files.len(), "collected folder images");
    files
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PreviewId(u64);

/// Local preview of one selected file
#[derive(Debug, Clone)]
pub struct PreviewHandle {
    pub id: PreviewId,
    pub file_name: String,
    pub path: PathBuf,
    /// Filled in once the thumbnail has been rendered off the UI thread
    pub pixels: Option<PreviewPixels>,
}

/// Preview the host should render for a freshly issued handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewRequest {
    pub id: PreviewId,
    pub path: PathBuf,
}

/// The I/O the host must perform for a submitted upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTicket {
    pub generation: Generation,
    pub files: Vec<LocalFile>,
}

/// Result handed back to the caller after a successful upload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadDone {
    pub image_count: usize,
    pub applied: Applied,
}

#[derive(Debug, Default)]
pub struct UploadCoordinator {
    selected: Vec<LocalFile>,
    previews: Vec<PreviewHandle>,
    next_preview: u64,
    in_flight: Option<Generation>,
    last_error: Option<String>,
}

impl UploadCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> &[LocalFile] {
        &self.selected
    }

    pub fn previews(&self) -> &[PreviewHandle] {
        &self.previews
    }

    /// Number of preview handles that have not been revoked
    pub fn live_previews(&self) -> usize {
        self.previews.len()
    }

    pub fn is_uploading(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Generation of the submitted upload still awaiting its response
    pub fn in_flight(&self) -> Option<Generation> {
        self.in_flight
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn can_submit(&self) -> bool {
        !self.selected.is_empty() && !self.is_uploading()
    }

    /// Replace the selection
    ///
    /// An empty selection is a no-op. Previous previews are revoked and a new
    /// handle is issued per file; the returned requests tell the host which
    /// thumbnails to render.
    pub fn select_files(&mut self, files: Vec<LocalFile>) -> Vec<PreviewRequest> {
        if files.is_empty() {
            return Vec::new();
        }
        if self.is_uploading() {
            tracing::debug!("selection change ignored while an upload is in flight");
            return Vec::new();
        }
        self.revoke_previews();
        self.last_error = None;

        let mut requests = Vec::with_capacity(files.len());
        for file in &files {
            self.next_preview += 1;
            let id = PreviewId(self.next_preview);
            self.previews.push(PreviewHandle {
                id,
                file_name: file.file_name.clone(),
                path: file.path.clone(),
                pixels: None,
            });
            requests.push(PreviewRequest {
                id,
                path: file.path.clone(),
            });
        }
        tracing::info!(count = files.len(), "upload selection changed");
        self.selected = files;
        requests
    }

    /// Attach rendered pixels to a live handle; revoked handles drop them
    pub fn attach_preview(&mut self, id: PreviewId, pixels: PreviewPixels) -> bool {
        match self.previews.iter_mut().find(|preview| preview.id == id) {
            Some(preview) => {
                preview.pixels = Some(pixels);
                true
            }
            None => {
                tracing::debug!(preview = id.0, "dropping pixels for revoked preview");
                false
            }
        }
    }

    /// Release every outstanding preview handle
    pub fn revoke_previews(&mut self) -> usize {
        let revoked = self.previews.len();
        self.previews.clear();
        if revoked > 0 {
            tracing::debug!(revoked, "revoked upload previews");
        }
        revoked
    }

    /// Dismiss the upload UI
    ///
    /// Refused while an upload is in flight so its completion still has a
    /// place to land.
    pub fn cancel(&mut self) -> bool {
        if self.is_uploading() {
            return false;
        }
        self.revoke_previews();
        self.selected.clear();
        self.last_error = None;
        true
    }

    /// Start the upload of the current selection
    ///
    /// Fails with a validation error when nothing is selected or another
    /// upload is still running; neither case reaches the server.
    pub fn submit(&mut self, registry: &mut ImageRegistry) -> Result<UploadTicket, SyncError> {
        if let Some(pending) = self.in_flight {
            tracing::warn!(pending = pending.value(), "upload rejected, one is already in flight");
            return Err(SyncError::Validation(
                "An upload is already in progress.".to_string(),
            ));
        }
        if self.selected.is_empty() {
            let err = SyncError::Validation("Please select images to upload.".to_string());
            self.last_error = Some(err.user_message());
            return Err(err);
        }
        let generation = registry.begin_upload();
        self.in_flight = Some(generation);
        self.last_error = None;
        tracing::info!(
            generation = generation.value(),
            count = self.selected.len(),
            "upload started"
        );
        Ok(UploadTicket {
            generation,
            files: self.selected.clone(),
        })
    }

    /// Apply the outcome of a submitted upload
    ///
    /// Success replaces the registry with `all_images` as returned and clears
    /// the selection. Failure leaves the registry untouched and keeps the
    /// selection for a retry.
    pub fn complete(
        &mut self,
        generation: Generation,
        outcome: Result<Vec<ImageRecord>, SyncError>,
        registry: &mut ImageRegistry,
    ) -> Result<UploadDone, SyncError> {
        if self.in_flight != Some(generation) {
            tracing::debug!(generation = generation.value(), "ignoring unknown upload completion");
            return Err(SyncError::Validation(
                "No matching upload is in progress.".to_string(),
            ));
        }
        self.in_flight = None;
        match outcome {
            Ok(all_images) => {
                let image_count = all_images.len();
                let applied = registry.replace_from(generation, all_images);
                tracing::info!(generation = generation.value(), image_count, "upload succeeded");
                self.revoke_previews();
                self.selected.clear();
                self.last_error = None;
                Ok(UploadDone {
                    image_count,
                    applied,
                })
            }
            Err(err) => {
                registry.abandon_upload(generation);
                tracing::warn!(generation = generation.value(), error = %err, "upload failed");
                self.last_error = Some(err.user_message());
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn files(names: &[&str]) -> Vec<LocalFile> {
        names
            .iter()
            .filter_map(|name| LocalFile::from_path(format!("/photos/{name}")))
            .collect()
    }

    fn pixels() -> PreviewPixels {
        PreviewPixels {
            width: 1,
            height: 1,
            rgba: Arc::new(vec![0, 0, 0, 255]),
        }
    }

    #[test]
    fn empty_selection_is_a_no_op() {
        let mut upload = UploadCoordinator::new();
        upload.select_files(files(&["a.jpg"]));
        assert!(upload.select_files(Vec::new()).is_empty());
        assert_eq!(upload.selected().len(), 1);
        assert_eq!(upload.live_previews(), 1);
    }

    #[test]
    fn reselecting_revokes_previous_previews() {
        let mut upload = UploadCoordinator::new();
        let first = upload.select_files(files(&["a.jpg", "b.jpg"]));
        let second = upload.select_files(files(&["c.jpg"]));
        assert_eq!(upload.live_previews(), 1);
        assert!(!upload.attach_preview(first[0].id, pixels()));
        assert!(upload.attach_preview(second[0].id, pixels()));
        assert!(upload.previews()[0].pixels.is_some());
    }

    #[test]
    fn submit_without_selection_is_a_validation_error() {
        let mut upload = UploadCoordinator::new();
        let mut registry = ImageRegistry::new();
        let err = upload.submit(&mut registry).unwrap_err();
        assert!(err.is_validation());
        assert!(!upload.is_uploading());
    }

    #[test]
    fn second_submit_while_in_flight_is_rejected() {
        let mut upload = UploadCoordinator::new();
        let mut registry = ImageRegistry::new();
        upload.select_files(files(&["a.jpg"]));
        let ticket = upload.submit(&mut registry).unwrap();
        assert_eq!(ticket.files, files(&["a.jpg"]));

        assert!(upload.submit(&mut registry).unwrap_err().is_validation());
        assert!(upload.is_uploading());
    }

    #[test]
    fn success_replaces_registry_and_releases_previews() {
        let mut upload = UploadCoordinator::new();
        let mut registry = ImageRegistry::new();
        let load = registry.begin_load().unwrap();
        registry.complete_load(load, Ok(vec![ImageRecord::new("old.jpg", "/data/old.jpg")]));

        upload.select_files(files(&["a.jpg", "b.jpg"]));
        let ticket = upload.submit(&mut registry).unwrap();
        let canonical = vec![
            ImageRecord::new("a.jpg", "/data/a.jpg"),
            ImageRecord::new("b.jpg", "/data/b.jpg"),
        ];
        let done = upload
            .complete(ticket.generation, Ok(canonical.clone()), &mut registry)
            .unwrap();

        assert_eq!(done.image_count, 2);
        assert_eq!(done.applied, Applied::Yes);
        assert_eq!(registry.images(), canonical.as_slice());
        assert_eq!(upload.live_previews(), 0);
        assert!(upload.selected().is_empty());
        assert!(!upload.is_uploading());
    }

    #[test]
    fn failure_leaves_registry_untouched_and_keeps_selection() {
        let mut upload = UploadCoordinator::new();
        let mut registry = ImageRegistry::new();
        let load = registry.begin_load().unwrap();
        let before = vec![ImageRecord::new("old.jpg", "/data/old.jpg")];
        registry.complete_load(load, Ok(before.clone()));

        upload.select_files(files(&["a.jpg"]));
        let ticket = upload.submit(&mut registry).unwrap();
        let err = upload
            .complete(
                ticket.generation,
                Err(SyncError::Server {
                    status: 400,
                    message: "File type not allowed".to_string(),
                }),
                &mut registry,
            )
            .unwrap_err();

        assert!(matches!(err, SyncError::Server { status: 400, .. }));
        assert_eq!(registry.images(), before.as_slice());
        assert_eq!(upload.selected().len(), 1);
        assert_eq!(
            upload.last_error(),
            Some("Server error: 400 (File type not allowed)")
        );
        // Retry is allowed after a failure.
        assert!(upload.submit(&mut registry).is_ok());
    }

    #[test]
    fn refresh_during_upload_cannot_outrank_server_list() {
        let mut upload = UploadCoordinator::new();
        let mut registry = ImageRegistry::new();
        let mount = registry.begin_load().unwrap();
        registry.complete_load(mount, Ok(vec![ImageRecord::new("old.jpg", "/data/old.jpg")]));

        upload.select_files(files(&["new.jpg"]));
        let ticket = upload.submit(&mut registry).unwrap();
        assert_eq!(upload.in_flight(), Some(ticket.generation));
        assert_eq!(registry.begin_load(), None);

        let canonical = vec![
            ImageRecord::new("old.jpg", "/data/old.jpg"),
            ImageRecord::new("new.jpg", "/data/new.jpg"),
        ];
        let done = upload
            .complete(ticket.generation, Ok(canonical.clone()), &mut registry)
            .unwrap();
        assert_eq!(done.applied, Applied::Yes);
        assert_eq!(registry.images(), canonical.as_slice());
        assert!(registry.begin_load().is_some());
    }

    #[test]
    fn failed_upload_releases_refresh() {
        let mut upload = UploadCoordinator::new();
        let mut registry = ImageRegistry::new();
        upload.select_files(files(&["a.jpg"]));
        let ticket = upload.submit(&mut registry).unwrap();
        let _ = upload.complete(
            ticket.generation,
            Err(SyncError::Transport("refused".to_string())),
            &mut registry,
        );
        assert!(registry.begin_load().is_some());
    }

    #[test]
    fn cancel_is_refused_while_uploading() {
        let mut upload = UploadCoordinator::new();
        let mut registry = ImageRegistry::new();
        upload.select_files(files(&["a.jpg"]));
        upload.submit(&mut registry).unwrap();
        assert!(!upload.cancel());
        assert_eq!(upload.live_previews(), 1);
    }

    #[test]
    fn cancel_releases_everything() {
        let mut upload = UploadCoordinator::new();
        upload.select_files(files(&["a.jpg", "b.png"]));
        assert!(upload.cancel());
        assert_eq!(upload.live_previews(), 0);
        assert!(upload.selected().is_empty());
    }

    #[test]
    fn folder_collection_filters_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        for name in ["a.JPG", "notes.txt", "nested/b.webp", "raw.nef"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let found: Vec<String> = collect_folder(dir.path())
            .into_iter()
            .map(|file| file.file_name)
            .collect();
        assert_eq!(found, vec!["a.JPG".to_string(), "b.webp".to_string()]);
    }
}
