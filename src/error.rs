//! Error types shared by the synchronization engine and its collaborators
//!
//! Every failure the engine can observe falls into one of four kinds:
//! - `Validation`: rejected locally, never sent to the server
//! - `Transport`: the request never produced an HTTP response
//! - `Server`: the server answered with a non-success status or payload
//! - `Data`: a payload or record was malformed
//!
//! Coordinators catch these at their boundary and turn them into a state
//! transition plus a displayable message.

use thiserror::Error;

/// Failure kinds surfaced by registry, upload and search operations
///
/// The variants carry owned strings so the error can travel inside UI
/// messages, which must be `Clone`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("connection error: {0}")]
    Transport(String),

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("invalid data: {0}")]
    Data(String),
}

impl SyncError {
    /// Text shown to the user next to the affected panel
    pub fn user_message(&self) -> String {
        match self {
            SyncError::Validation(reason) => reason.clone(),
            SyncError::Transport(reason) => format!("Connection error: {reason}"),
            SyncError::Server { status, message } if message.is_empty() => {
                format!("Server error: {status}")
            }
            SyncError::Server { status, message } => format!("Server error: {status} ({message})"),
            SyncError::Data(reason) => format!("Invalid data: {reason}"),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, SyncError::Validation(_))
    }
}

impl From<reqwest::Error> for SyncError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return SyncError::Data(err.to_string());
        }
        match err.status() {
            Some(status) => SyncError::Server {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => SyncError::Transport(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        SyncError::Data(err.to_string())
    }
}

/// Errors raised while loading the client configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid backend origin {origin:?}: {reason}")]
    Origin { origin: String, reason: String },
}

/// Errors raised by the local session store
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("session payload error: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("failed to prepare session directory: {0}")]
    Io(#[from] std::io::Error),
}
