use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{SessionError, SyncError};
use super::data::Credentials;

/// The logged-in user as the server described it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub username: String,
    /// The server's `user` object, kept verbatim
    pub profile: serde_json::Value,
}

/// Explicit session passed into screens instead of ambient storage
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user: Option<UserProfile>,
}

impl Session {
    pub fn is_logged_in(&self) -> bool {
        self.user.is_some()
    }

    pub fn username(&self) -> Option<&str> {
        self.user.as_ref().map(|user| user.username.as_str())
    }
}

/// The SessionStore persists the logged-in user in a small SQLite file.
/// It holds at most one row.
pub struct SessionStore {
    conn: Connection,
    db_path: Option<PathBuf>,
}

impl SessionStore {
    /// Open or create the session database at `db_path`
    pub fn open(db_path: &Path) -> Result<Self, SessionError> {
        // Ensure the parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        tracing::debug!(path = %db_path.display(), "session database opened");

        let store = SessionStore {
            conn,
            db_path: Some(db_path.to_path_buf()),
        };
        store.init_schema()?;
        Ok(store)
    }

    /// Session store that forgets everything on exit
    pub fn open_in_memory() -> Result<Self, SessionError> {
        let store = SessionStore {
            conn: Connection::open_in_memory()?,
            db_path: None,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), SessionError> {
        // The CHECK keeps the table to a single row
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS session (
                id              INTEGER PRIMARY KEY CHECK (id = 1),
                username        TEXT NOT NULL,
                profile_json    TEXT NOT NULL,
                saved_at        INTEGER NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Read the persisted session; an empty table means logged out
    pub fn load(&self) -> Result<Session, SessionError> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT username, profile_json FROM session WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let user = match row {
            Some((username, profile_json)) => Some(UserProfile {
                username,
                profile: serde_json::from_str(&profile_json)?,
            }),
            None => None,
        };
        tracing::info!(logged_in = user.is_some(), "session loaded");
        Ok(Session { user })
    }

    pub fn save(&self, user: &UserProfile) -> Result<(), SessionError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO session (id, username, profile_json, saved_at)
             VALUES (1, ?1, ?2, ?3)",
            params![
                user.username,
                serde_json::to_string(&user.profile)?,
                chrono::Utc::now().timestamp(),
            ],
        )?;
        tracing::info!(username = %user.username, "session saved");
        Ok(())
    }

    pub fn clear(&self) -> Result<(), SessionError> {
        self.conn.execute("DELETE FROM session", [])?;
        tracing::info!("session cleared");
        Ok(())
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("db_path", &self.db_path)
            .finish()
    }
}

/// Local checks before a login request is sent
pub fn validate_login(username: &str, password: &str) -> Result<Credentials, SyncError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(SyncError::Validation(
            "Username and password are required.".to_string(),
        ));
    }
    Ok(Credentials {
        username: username.to_string(),
        password: password.to_string(),
    })
}

/// Local checks before a registration request is sent
pub fn validate_registration(
    username: &str,
    password: &str,
    confirmation: &str,
) -> Result<Credentials, SyncError> {
    let credentials = validate_login(username, password)?;
    if password != confirmation {
        return Err(SyncError::Validation("Passwords do not match.".to_string()));
    }
    Ok(credentials)
}
