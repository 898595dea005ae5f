//! The image registry: the client's current belief about a user's catalog
//!
//! The registry is only ever replaced wholesale with a list the server
//! confirmed. Every mutation path (mount/refresh loads, upload replacement,
//! handoff seeding) draws a number from one monotonic generation counter and
//! a completion is applied only if its generation is not older than the one
//! already applied. A load that started before an upload and resolves after
//! it is therefore discarded instead of overwriting the fresher set.

use chrono::Utc;

use super::data::ImageRecord;
use crate::error::SyncError;

/// Monotonic sequence number attached to every asynchronous mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// Lifecycle of the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistryStatus {
    #[default]
    Uninitialized,
    Loading,
    Ready,
    Error,
}

/// Observable registry state the gallery renders from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistryState {
    pub images: Vec<ImageRecord>,
    pub status: RegistryStatus,
    pub last_error: Option<String>,
    /// Set when the list came from a fresh mutation (upload or handoff);
    /// image URLs then get a cache-defeating suffix
    pub cache_stamp: Option<i64>,
}

/// Whether a completion changed the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Yes,
    /// An equal or newer generation had already been applied
    Stale,
}

impl Applied {
    pub fn is_applied(self) -> bool {
        self == Applied::Yes
    }
}

#[derive(Debug, Default)]
pub struct ImageRegistry {
    state: RegistryState,
    /// Last generation handed out
    issued: u64,
    /// Generation of the list currently shown
    applied: u64,
    /// Mount/refresh load currently in flight
    pending_load: Option<Generation>,
    /// Upload whose replacement has not landed yet; loads wait for it
    pending_upload: Option<Generation>,
}

impl ImageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &RegistryState {
        &self.state
    }

    pub fn images(&self) -> &[ImageRecord] {
        &self.state.images
    }

    pub fn status(&self) -> RegistryStatus {
        self.state.status
    }

    pub fn is_loading(&self) -> bool {
        self.pending_load.is_some()
    }

    /// Generation of the mount/refresh load in flight, if any
    pub fn pending_load(&self) -> Option<Generation> {
        self.pending_load
    }

    pub fn is_awaiting_upload(&self) -> bool {
        self.pending_upload.is_some()
    }

    /// Reserve a generation for a mutation that will complete later
    pub fn next_generation(&mut self) -> Generation {
        self.issued += 1;
        Generation(self.issued)
    }

    /// Reserve the generation of an upload
    ///
    /// Until `replace_from` or `abandon_upload` settles it, `begin_load`
    /// refuses, so no later load can outrank the upload's list.
    pub fn begin_upload(&mut self) -> Generation {
        let generation = self.next_generation();
        self.pending_upload = Some(generation);
        generation
    }

    /// Release an upload generation that will never replace the list
    pub fn abandon_upload(&mut self, generation: Generation) {
        if self.pending_upload == Some(generation) {
            self.pending_upload = None;
        }
    }

    fn accepts(&self, generation: Generation) -> bool {
        generation.0 >= self.applied
    }

    /// Put a known list in place without contacting the server
    ///
    /// Later `load` calls remain allowed and fully override the seeded set.
    pub fn seed(&mut self, images: Vec<ImageRecord>) {
        let generation = self.next_generation();
        self.applied = generation.0;
        tracing::info!(
            generation = generation.0,
            count = images.len(),
            "registry seeded from handoff"
        );
        self.state = RegistryState {
            images,
            status: RegistryStatus::Ready,
            last_error: None,
            cache_stamp: Some(Utc::now().timestamp_millis()),
        };
    }

    /// Start a mount or refresh load
    ///
    /// Returns `None` while another load is already in flight; at most one
    /// load runs at a time.
    pub fn begin_load(&mut self) -> Option<Generation> {
        if let Some(pending) = self.pending_load {
            tracing::debug!(
                pending = pending.0,
                "registry load already in flight, ignoring request"
            );
            return None;
        }
        if let Some(upload) = self.pending_upload {
            tracing::debug!(upload = upload.0, "upload in flight, registry load deferred");
            return None;
        }
        let generation = self.next_generation();
        self.pending_load = Some(generation);
        self.state.status = RegistryStatus::Loading;
        tracing::info!(generation = generation.0, "registry load started");
        Some(generation)
    }

    /// Apply the outcome of a load
    ///
    /// On failure the list is cleared so the screen never shows data the
    /// server did not just confirm.
    pub fn complete_load(
        &mut self,
        generation: Generation,
        outcome: Result<Vec<ImageRecord>, SyncError>,
    ) -> Applied {
        if self.pending_load == Some(generation) {
            self.pending_load = None;
        }
        if !self.accepts(generation) {
            tracing::debug!(
                generation = generation.0,
                applied = self.applied,
                "discarding stale registry load"
            );
            return Applied::Stale;
        }
        self.applied = generation.0;
        match outcome {
            Ok(images) => {
                tracing::info!(
                    generation = generation.0,
                    count = images.len(),
                    "registry load succeeded"
                );
                self.state = RegistryState {
                    images,
                    status: RegistryStatus::Ready,
                    last_error: None,
                    cache_stamp: None,
                };
            }
            Err(err) => {
                tracing::warn!(generation = generation.0, error = %err, "registry load failed");
                self.state = RegistryState {
                    images: Vec::new(),
                    status: RegistryStatus::Error,
                    last_error: Some(err.user_message()),
                    cache_stamp: None,
                };
            }
        }
        Applied::Yes
    }

    /// Replace the list with the server's canonical post-upload set
    ///
    /// Never merges with the current entries.
    pub fn replace_from(&mut self, generation: Generation, images: Vec<ImageRecord>) -> Applied {
        self.abandon_upload(generation);
        if !self.accepts(generation) {
            tracing::debug!(
                generation = generation.0,
                applied = self.applied,
                "discarding stale registry replacement"
            );
            return Applied::Stale;
        }
        self.applied = generation.0;
        tracing::info!(
            generation = generation.0,
            count = images.len(),
            "registry replaced from upload"
        );
        self.state = RegistryState {
            images,
            status: RegistryStatus::Ready,
            last_error: None,
            cache_stamp: Some(Utc::now().timestamp_millis()),
        };
        Applied::Yes
    }
}
