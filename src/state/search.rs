//! Search coordinator
//!
//! Owns the ephemeral ranked-result list. It is independent of the image
//! registry: results are never merged into it, and each completed search
//! replaces the whole result list.
//!
//! State machine: `Idle -> Searching -> {Succeeded, Failed}`, re-entering
//! `Searching` on the next query. While searching, previously displayed
//! results stay visible until the new outcome is known. Only the most
//! recently issued search may land; overlapping older responses are dropped.

use super::data::{SearchQuery, SearchResult, StyleFilter};
use crate::error::SyncError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchStatus {
    #[default]
    Idle,
    Searching,
    Succeeded,
    Failed,
}

/// Observable search state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchState {
    pub status: SearchStatus,
    pub results: Vec<SearchResult>,
    pub error: Option<String>,
}

/// A search the host must send to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub sequence: u64,
    pub query: SearchQuery,
}

#[derive(Debug, Default)]
pub struct SearchCoordinator {
    state: SearchState,
    issued: u64,
}

impl SearchCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SearchState {
        &self.state
    }

    pub fn status(&self) -> SearchStatus {
        self.state.status
    }

    pub fn results(&self) -> &[SearchResult] {
        &self.state.results
    }

    pub fn is_searching(&self) -> bool {
        self.state.status == SearchStatus::Searching
    }

    /// Start a search
    ///
    /// Whitespace-only text fails fast with a validation error and never
    /// reaches the network.
    pub fn search(
        &mut self,
        style_filter: StyleFilter,
        free_text: &str,
    ) -> Result<SearchTicket, SyncError> {
        let free_text = free_text.trim();
        if free_text.is_empty() {
            let err = SyncError::Validation("Please enter a search term".to_string());
            self.state.error = Some(err.user_message());
            tracing::debug!("search rejected: empty query");
            return Err(err);
        }
        self.issued += 1;
        self.state.status = SearchStatus::Searching;
        self.state.error = None;
        tracing::info!(
            sequence = self.issued,
            style = style_filter.as_str(),
            "search started"
        );
        Ok(SearchTicket {
            sequence: self.issued,
            query: SearchQuery {
                style_filter,
                free_text: free_text.to_string(),
            },
        })
    }

    /// Apply a search response; returns `false` when it was superseded
    pub fn complete(
        &mut self,
        sequence: u64,
        outcome: Result<Vec<SearchResult>, SyncError>,
    ) -> bool {
        if sequence != self.issued {
            tracing::debug!(sequence, latest = self.issued, "discarding stale search response");
            return false;
        }
        match outcome {
            Ok(results) => {
                tracing::info!(sequence, count = results.len(), "search succeeded");
                self.state = SearchState {
                    status: SearchStatus::Succeeded,
                    results,
                    error: None,
                };
            }
            Err(err) => {
                tracing::warn!(sequence, error = %err, "search failed");
                self.state = SearchState {
                    status: SearchStatus::Failed,
                    results: Vec::new(),
                    error: Some(format!("Search failed: {}", err.user_message())),
                };
            }
        }
        true
    }

    /// Return to `Idle`, dropping results and any in-flight response
    pub fn reset(&mut self) {
        self.issued += 1;
        self.state = SearchState::default();
    }
}
