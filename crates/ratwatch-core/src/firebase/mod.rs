//! Firebase REST backends.
//!
//! [`RealtimeDatabase`] implements [`PushChannel`](crate::PushChannel) on top
//! of the Realtime Database REST streaming protocol, and [`Firestore`]
//! implements [`DocumentStore`](crate::DocumentStore) with the Firestore
//! `runQuery` endpoint. Both share one [`FirebaseConfig`].
//!
//! # Example
//!
//! ```no_run
//! use ratwatch_core::firebase::{FirebaseConfig, Firestore, RealtimeDatabase};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = FirebaseConfig::new(
//!     "https://example-default-rtdb.firebaseio.com",
//!     "example-project",
//! );
//! let database = RealtimeDatabase::new(&config)?;
//! let firestore = Firestore::new(&config)?;
//! # Ok(())
//! # }
//! ```

mod firestore;
mod realtime;
mod sse;

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

pub use firestore::{Firestore, decode_value};
pub use realtime::{RealtimeDatabase, ValueTree};
pub use sse::{SseDecoder, SseEvent};

/// Default Firestore REST endpoint.
pub const DEFAULT_FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com/v1";

/// Default timeout for non-streaming requests.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Connection settings for a Firebase project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirebaseConfig {
    /// Realtime Database URL, e.g. `https://<db>.firebaseio.com`.
    pub database_url: String,
    /// Project id, used for Firestore.
    pub project_id: String,
    /// Web API key, sent to Firestore as `key`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// ID token or database secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Firestore database id.
    #[serde(default = "default_database_id")]
    pub database_id: String,
    /// Firestore REST endpoint.
    #[serde(default = "default_firestore_endpoint")]
    pub firestore_endpoint: String,
}

fn default_database_id() -> String {
    "(default)".to_string()
}

fn default_firestore_endpoint() -> String {
    DEFAULT_FIRESTORE_ENDPOINT.to_string()
}

impl FirebaseConfig {
    /// Settings for a project with public rules.
    pub fn new(database_url: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            project_id: project_id.into(),
            api_key: None,
            auth_token: None,
            database_id: default_database_id(),
            firestore_endpoint: default_firestore_endpoint(),
        }
    }

    /// Set the web API key.
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the auth token.
    #[must_use]
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }
}

/// Errors from the Firebase REST APIs.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FirebaseError {
    /// The server could not be reached.
    #[error("Firebase not reachable at {url}: {source}")]
    NotReachable {
        /// Request URL (without credentials).
        url: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The API answered with an error status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message from the body, or the status text.
        message: String,
    },

    /// The server closed or revoked an event stream.
    #[error("Event stream closed: {0}")]
    Stream(String),

    /// A response could not be decoded.
    #[error("Unexpected response: {0}")]
    Decode(String),
}

/// Result type for Firebase operations.
pub type FirebaseResult<T> = std::result::Result<T, FirebaseError>;

fn normalize_base_url(url: &str) -> FirebaseResult<String> {
    let base = url.trim_end_matches('/').to_string();
    if !base.starts_with("http://") && !base.starts_with("https://") {
        return Err(FirebaseError::InvalidUrl(format!(
            "URL must start with http:// or https://, got: {url}"
        )));
    }
    Ok(base)
}

fn build_client(timeout: Option<Duration>) -> FirebaseResult<Client> {
    let mut builder = Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().map_err(FirebaseError::Request)
}

async fn error_from_response(response: reqwest::Response) -> FirebaseError {
    let status = response.status();
    let message = response
        .json::<serde_json::Value>()
        .await
        .ok()
        .and_then(|v| match v.get("error") {
            Some(serde_json::Value::String(s)) => Some(s.clone()),
            Some(obj) => obj.get("message").and_then(|m| m.as_str()).map(String::from),
            None => None,
        })
        .unwrap_or_else(|| status.to_string());

    FirebaseError::Api {
        status: status.as_u16(),
        message,
    }
}
