//! Navigation handoff between the upload screen and the wardrobe screen
//!
//! After a full-page upload the canonical image list is already known, so it
//! travels with the navigation instead of being fetched again. A handoff is
//! consumed at most once: the ledger remembers the newest marker it accepted
//! and any handoff that is not newer falls back to a normal load.

use chrono::Utc;

use super::data::ImageRecord;
use super::registry::{Generation, ImageRegistry};

#[derive(Debug, Clone, PartialEq)]
pub struct NavigationHandoff {
    pub images: Vec<ImageRecord>,
    /// Milliseconds since the epoch when the list was produced
    pub marker: i64,
}

impl NavigationHandoff {
    pub fn new(images: Vec<ImageRecord>) -> Self {
        Self {
            images,
            marker: Utc::now().timestamp_millis(),
        }
    }

    pub fn with_marker(images: Vec<ImageRecord>, marker: i64) -> Self {
        Self { images, marker }
    }
}

/// Remembers which handoff was consumed last; outlives individual screens
#[derive(Debug, Default)]
pub struct HandoffLedger {
    last_consumed: Option<i64>,
}

impl HandoffLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_consumed(&self) -> Option<i64> {
        self.last_consumed
    }

    fn is_fresh(&self, marker: i64) -> bool {
        self.last_consumed.map_or(true, |last| marker > last)
    }
}

/// What a screen entry decided to do with the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountPlan {
    /// Seeded from a fresh handoff; no listing request is needed
    Seeded { count: usize },
    /// The host must fetch the list and complete this generation
    Load(Generation),
    /// A load is already running for this registry
    AlreadyLoading,
}

/// Decide how the registry gets its first list on screen entry
pub fn enter_screen(
    handoff: Option<NavigationHandoff>,
    ledger: &mut HandoffLedger,
    registry: &mut ImageRegistry,
) -> MountPlan {
    if let Some(handoff) = handoff {
        if ledger.is_fresh(handoff.marker) {
            ledger.last_consumed = Some(handoff.marker);
            let count = handoff.images.len();
            registry.seed(handoff.images);
            return MountPlan::Seeded { count };
        }
        tracing::debug!(
            marker = handoff.marker,
            last = ledger.last_consumed,
            "ignoring handoff that is not newer than the last one consumed"
        );
    }
    match registry.begin_load() {
        Some(generation) => MountPlan::Load(generation),
        None => MountPlan::AlreadyLoading,
    }
}
