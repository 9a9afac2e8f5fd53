//! Realtime Database over the REST streaming protocol.
//!
//! A subscription is a long-lived `GET {path}.json` with
//! `Accept: text/event-stream`. The server first sends a `put` with the
//! whole value at the path, then `put`/`patch` events for every change
//! below it, and `keep-alive` events while idle. `cancel` and
//! `auth_revoked` end the stream. Dropped streams are reopened with
//! backoff for as long as the subscription lives.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::sse::{SseDecoder, SseEvent};
use super::{
    DEFAULT_REQUEST_TIMEOUT, FirebaseConfig, FirebaseError, FirebaseResult, build_client,
    error_from_response, normalize_base_url,
};
use crate::error::{Error, Result};
use crate::retry::{Backoff, RetryConfig};
use crate::subscription::{DEFAULT_BUFFER, Snapshot, SnapshotResult, Subscription};
use crate::traits::PushChannel;

/// Client for one Realtime Database.
#[derive(Debug, Clone)]
pub struct RealtimeDatabase {
    stream_client: Client,
    request_client: Client,
    base_url: String,
    auth_token: Option<String>,
    reconnect: RetryConfig,
}

impl RealtimeDatabase {
    /// Create a client for the database in `config`.
    pub fn new(config: &FirebaseConfig) -> FirebaseResult<Self> {
        Ok(Self {
            stream_client: build_client(None)?,
            request_client: build_client(Some(DEFAULT_REQUEST_TIMEOUT))?,
            base_url: normalize_base_url(&config.database_url)?,
            auth_token: config.auth_token.clone(),
            reconnect: RetryConfig::for_reconnect(),
        })
    }

    /// Set the backoff used between stream reconnects.
    #[must_use]
    pub fn with_reconnect(mut self, reconnect: RetryConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    /// The database URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// REST URL of `path`, without credentials.
    pub fn url_for(&self, path: &str) -> String {
        format!("{}/{}.json", self.base_url, path.trim_matches('/'))
    }

    fn auth_query(&self) -> Vec<(&'static str, String)> {
        self.auth_token
            .iter()
            .map(|t| ("auth", t.clone()))
            .collect()
    }

    async fn open_stream(&self, path: &str) -> FirebaseResult<reqwest::Response> {
        let url = self.url_for(path);
        let response = self
            .stream_client
            .get(&url)
            .query(&self.auth_query())
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| FirebaseError::NotReachable { url, source: e })?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }

    async fn put_string(&self, path: &str, value: &str) -> FirebaseResult<()> {
        let url = self.url_for(path);
        let response = self
            .request_client
            .put(&url)
            .query(&self.auth_query())
            .json(&Value::String(value.to_string()))
            .send()
            .await
            .map_err(|e| FirebaseError::NotReachable { url, source: e })?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }

    async fn stream_path(
        self,
        path: String,
        tx: mpsc::Sender<SnapshotResult>,
        cancel: CancellationToken,
    ) {
        let mut backoff = Backoff::new(self.reconnect.clone());

        loop {
            let opened = tokio::select! {
                _ = cancel.cancelled() => return,
                opened = self.open_stream(&path) => opened,
            };

            let failure = match opened {
                Ok(response) => {
                    info!(%path, "Event stream opened");
                    let mut tree = ValueTree::default();
                    let mut decoder = SseDecoder::new();
                    let mut body = response.bytes_stream();

                    'stream: loop {
                        let chunk = tokio::select! {
                            _ = cancel.cancelled() => return,
                            chunk = body.next() => chunk,
                        };
                        match chunk {
                            Some(Ok(bytes)) => {
                                for event in decoder.push(&bytes) {
                                    match apply_event(&mut tree, &event) {
                                        Ok(Some(value)) => {
                                            backoff.reset();
                                            let snapshot = Snapshot::new(path.clone(), value);
                                            if tx.send(Ok(snapshot)).await.is_err() {
                                                return;
                                            }
                                        }
                                        Ok(None) => {}
                                        Err(e) => break 'stream e,
                                    }
                                }
                            }
                            Some(Err(e)) => break 'stream FirebaseError::Request(e),
                            None => {
                                break 'stream FirebaseError::Stream(
                                    "server closed the connection".into(),
                                );
                            }
                        }
                    }
                }
                Err(e) => e,
            };

            warn!(%path, error = %failure, "Event stream failed");
            if tx
                .send(Err(Error::channel(&path, failure.to_string())))
                .await
                .is_err()
            {
                return;
            }

            let delay = backoff.next_delay();
            debug!(%path, ?delay, "Reconnecting event stream");
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = sleep(delay) => {}
            }
        }
    }
}

#[async_trait]
impl PushChannel for RealtimeDatabase {
    async fn subscribe(&self, path: &str) -> Result<Subscription> {
        let db = self.clone();
        let owned = path.to_string();
        Ok(Subscription::spawn(path, DEFAULT_BUFFER, move |tx, cancel| {
            db.stream_path(owned, tx, cancel)
        }))
    }

    async fn write(&self, path: &str, value: &str) -> Result<()> {
        self.put_string(path, value)
            .await
            .map_err(|e| Error::channel(path, e.to_string()))?;
        debug!(path, value, "Wrote value");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct StreamPayload {
    path: String,
    data: Value,
}

/// Apply one stream event. Returns the new scalar when the value changed.
fn apply_event(
    tree: &mut ValueTree,
    event: &SseEvent,
) -> FirebaseResult<Option<Option<String>>> {
    match event.event.as_str() {
        "put" | "patch" => {
            let payload: StreamPayload = serde_json::from_str(&event.data)
                .map_err(|e| FirebaseError::Decode(format!("{} event: {e}", event.event)))?;
            if event.event == "put" {
                tree.put(&payload.path, payload.data);
            } else {
                tree.patch(&payload.path, payload.data);
            }
            Ok(Some(tree.scalar()))
        }
        "keep-alive" => Ok(None),
        "cancel" => Err(FirebaseError::Stream(format!(
            "cancelled by server: {}",
            event.data
        ))),
        "auth_revoked" => Err(FirebaseError::Stream("auth token revoked".into())),
        other => {
            debug!(event = other, "Ignoring unknown stream event");
            Ok(None)
        }
    }
}

/// Local mirror of the value below a streamed path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValueTree {
    root: Value,
}

impl ValueTree {
    /// The mirrored value.
    pub fn value(&self) -> &Value {
        &self.root
    }

    /// The value as a scalar string; `None` when empty.
    pub fn scalar(&self) -> Option<String> {
        match &self.root {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Replace the value at `path` (relative, `/` is the root).
    pub fn put(&mut self, path: &str, data: Value) {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let Some((last, parents)) = segments.split_last() else {
            self.root = data;
            return;
        };

        let mut node = &mut self.root;
        for segment in parents {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            let Value::Object(map) = node else { return };
            node = map.entry(segment.to_string()).or_insert(Value::Null);
        }
        if !node.is_object() {
            if data.is_null() {
                return;
            }
            *node = Value::Object(Map::new());
        }
        if let Value::Object(map) = node {
            if data.is_null() {
                map.remove(*last);
            } else {
                map.insert(last.to_string(), data);
            }
        }
    }

    /// Merge the children of `data` into the value at `path`.
    pub fn patch(&mut self, path: &str, data: Value) {
        let base = path.trim_end_matches('/');
        match data {
            Value::Object(children) => {
                for (key, value) in children {
                    self.put(&format!("{base}/{key}"), value);
                }
            }
            other => self.put(path, other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(name: &str, data: &str) -> SseEvent {
        SseEvent {
            event: name.into(),
            data: data.into(),
        }
    }

    #[test]
    fn test_put_root_scalar() {
        let mut tree = ValueTree::default();
        let value = apply_event(&mut tree, &event("put", r#"{"path":"/","data":"Rat seen"}"#))
            .unwrap();
        assert_eq!(value, Some(Some("Rat seen".to_string())));
    }

    #[test]
    fn test_put_null_reads_as_empty() {
        let mut tree = ValueTree::default();
        let value =
            apply_event(&mut tree, &event("put", r#"{"path":"/","data":null}"#)).unwrap();
        assert_eq!(value, Some(None));
    }

    #[test]
    fn test_keep_alive_is_ignored() {
        let mut tree = ValueTree::default();
        assert_eq!(apply_event(&mut tree, &event("keep-alive", "null")).unwrap(), None);
    }

    #[test]
    fn test_cancel_and_revoke_end_stream() {
        let mut tree = ValueTree::default();
        assert!(apply_event(&mut tree, &event("cancel", "null")).is_err());
        assert!(apply_event(&mut tree, &event("auth_revoked", "null")).is_err());
    }

    #[test]
    fn test_malformed_payload() {
        let mut tree = ValueTree::default();
        assert!(matches!(
            apply_event(&mut tree, &event("put", "not json")),
            Err(FirebaseError::Decode(_))
        ));
    }

    #[test]
    fn test_nested_put_and_patch() {
        let mut tree = ValueTree::default();
        tree.put("/", json!({"a": 1}));
        tree.put("/b/c", json!("x"));
        assert_eq!(tree.value(), &json!({"a": 1, "b": {"c": "x"}}));

        tree.patch("/b", json!({"d": 2, "c": null}));
        assert_eq!(tree.value(), &json!({"a": 1, "b": {"d": 2}}));

        tree.put("/a", Value::Null);
        assert_eq!(tree.value(), &json!({"b": {"d": 2}}));
    }

    #[test]
    fn test_non_string_scalar() {
        let mut tree = ValueTree::default();
        tree.put("/", json!(42));
        assert_eq!(tree.scalar().as_deref(), Some("42"));
    }

    #[test]
    fn test_url_for() {
        let db = RealtimeDatabase::new(&FirebaseConfig::new("https://db.firebaseio.com/", "p"))
            .unwrap();
        assert_eq!(
            db.url_for("/SensorStatus/message"),
            "https://db.firebaseio.com/SensorStatus/message.json"
        );
    }
}
