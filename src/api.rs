//! HTTP client for the catalog backend
//!
//! ```rust,ignore
//! let api = ApiClient::new(&config)?;
//! let images = api.list_images().await?;
//! let results = api.search(&query).await?;
//! ```
//!
//! Every method maps failures onto [`SyncError`]: connection problems and
//! timeouts become `Transport`, non-success statuses become `Server` with
//! the server's `error` text when it sent one, undecodable bodies become
//! `Data`.

use chrono::Utc;
use reqwest::header::{CACHE_CONTROL, PRAGMA};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::config::Config;
use crate::error::SyncError;
use crate::state::data::{
    AuthResponse, Credentials, ImageRecord, ImageWire, SearchQuery, SearchResult,
    SearchResultWire, UploadResponse,
};
use crate::state::session::UserProfile;
use crate::state::upload::LocalFile;

/// Query parameter that makes every listing URL unique
const LIST_NONCE_PARAM: &str = "_ts";

/// Error body shape used by the backend
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Client for the catalog REST API
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    origin: Url,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self, SyncError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| SyncError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            origin: config.backend_origin.clone(),
        })
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    fn endpoint(&self, path: &str) -> Result<Url, SyncError> {
        let joined = format!(
            "{}/{}",
            self.origin.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| SyncError::Data(format!("bad endpoint {path}: {e}")))
    }

    /// `GET /api/images`, bypassing every cache on the way
    pub async fn list_images(&self) -> Result<Vec<ImageRecord>, SyncError> {
        let mut url = self.endpoint("/api/images")?;
        url.query_pairs_mut().append_pair(
            LIST_NONCE_PARAM,
            &Utc::now().timestamp_millis().to_string(),
        );
        tracing::debug!(%url, "listing images");

        let response = self
            .client
            .get(url)
            .header(CACHE_CONTROL, "no-cache, no-store, max-age=0")
            .header(PRAGMA, "no-cache")
            .send()
            .await?;
        let wire: Vec<ImageWire> = read_json(response).await?;
        Ok(wire.into_iter().map(ImageRecord::from).collect())
    }

    /// `POST /api/upload` with one `images` part per file
    ///
    /// Returns the full post-upload list the server reports.
    pub async fn upload_images(&self, files: &[LocalFile]) -> Result<Vec<ImageRecord>, SyncError> {
        let mut form = Form::new();
        for file in files {
            let bytes = tokio::fs::read(&file.path).await.map_err(|e| {
                SyncError::Data(format!("cannot read {}: {e}", file.file_name))
            })?;
            let mime = mime_guess::from_path(&file.path).first_or_octet_stream();
            let part = Part::bytes(bytes)
                .file_name(file.file_name.clone())
                .mime_str(mime.essence_str())
                .map_err(|e| SyncError::Data(e.to_string()))?;
            form = form.part("images", part);
        }
        tracing::debug!(count = files.len(), "uploading images");

        let response = self
            .client
            .post(self.endpoint("/api/upload")?)
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        let body: UploadResponse = read_json(response).await?;
        match body {
            UploadResponse {
                success: true,
                all_images: Some(all_images),
                ..
            } => Ok(all_images.into_iter().map(ImageRecord::from).collect()),
            UploadResponse { error, .. } => Err(SyncError::Server {
                status: status.as_u16(),
                message: error.unwrap_or_else(|| "upload was not accepted".to_string()),
            }),
        }
    }

    /// `POST /api/search`
    pub async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>, SyncError> {
        let response = self
            .client
            .post(self.endpoint("/api/search")?)
            .json(&query.to_payload())
            .send()
            .await?;
        let wire: Vec<SearchResultWire> = read_json(response).await?;
        Ok(wire.into_iter().map(SearchResult::from).collect())
    }

    /// `POST /api/login`
    pub async fn login(&self, credentials: &Credentials) -> Result<UserProfile, SyncError> {
        let body = self.auth_request("/api/login", credentials).await?;
        Ok(UserProfile {
            username: credentials.username.clone(),
            profile: body.user.unwrap_or(serde_json::Value::Null),
        })
    }

    /// `POST /api/register`; returns the server's confirmation message
    pub async fn register(&self, credentials: &Credentials) -> Result<String, SyncError> {
        let body = self.auth_request("/api/register", credentials).await?;
        Ok(body
            .message
            .unwrap_or_else(|| "Registration successful.".to_string()))
    }

    async fn auth_request(
        &self,
        path: &str,
        credentials: &Credentials,
    ) -> Result<AuthResponse, SyncError> {
        let response = self
            .client
            .post(self.endpoint(path)?)
            .json(credentials)
            .send()
            .await?;
        let status = response.status();
        let body: AuthResponse = read_json(response).await?;
        if body.success {
            Ok(body)
        } else {
            Err(SyncError::Server {
                status: status.as_u16(),
                message: body.error.unwrap_or_default(),
            })
        }
    }

    /// Download the bytes behind a resolved image URL
    pub async fn fetch_image_bytes(&self, url: &str) -> Result<Vec<u8>, SyncError> {
        let response = self.client.get(url).send().await?;
        let response = ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}

/// Turn a non-2xx response into a `Server` error carrying the best message
async fn ensure_success(response: Response) -> Result<Response, SyncError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorBody>(&text) {
        Ok(ErrorBody {
            error: Some(error), ..
        }) => error,
        Ok(ErrorBody {
            message: Some(message),
            ..
        }) => message,
        _ => text.trim().to_string(),
    };
    Err(SyncError::Server {
        status: status.as_u16(),
        message,
    })
}

/// Decode a JSON body, after rejecting non-success statuses
///
/// Upload and auth failures still carry a JSON body with an `error` field;
/// the caller sees it through the `Server` message.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, SyncError> {
    let response = ensure_success(response).await?;
    let text = response.text().await?;
    serde_json::from_str(&text).map_err(|e| SyncError::Data(format!("malformed response: {e}")))
}
