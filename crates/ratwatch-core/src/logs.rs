//! Sensor log fetching.
//!
//! The rig appends a record to a document collection for every event. The
//! dashboard shows the newest few, refreshed on a fixed interval, replacing
//! the whole list each time.

use std::cmp::Ordering;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;
use tracing::{debug, warn};

use ratwatch_types::{LogEntry, from_epoch, parse_rfc3339};

use crate::error::{Error, Result};
use crate::traits::DocumentStore;

/// Default collection holding sensor logs.
pub const DEFAULT_COLLECTION: &str = "SensorLogs";
/// Default field used for ordering.
pub const DEFAULT_ORDER_BY: &str = "timestamp";
/// Default number of entries shown.
pub const DEFAULT_LIMIT: usize = 10;
/// Default log refresh interval.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);
/// Default upper bound on a single fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// A collection query: no filter, ordered by one field, limited.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogQuery {
    /// Collection to scan.
    pub collection: String,
    /// Field to order by.
    pub order_by: String,
    /// Order descending (newest first).
    pub descending: bool,
    /// Maximum number of documents.
    pub limit: usize,
}

impl Default for LogQuery {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            order_by: DEFAULT_ORDER_BY.to_string(),
            descending: true,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl LogQuery {
    /// Query the newest `limit` documents of `collection` by `timestamp`.
    pub fn latest(collection: impl Into<String>, limit: usize) -> Self {
        Self {
            collection: collection.into(),
            limit,
            ..Default::default()
        }
    }

    /// Validate the query.
    pub fn validate(&self) -> Result<()> {
        if self.collection.is_empty() {
            return Err(Error::invalid_config("log collection must not be empty"));
        }
        if self.order_by.is_empty() {
            return Err(Error::invalid_config("log order field must not be empty"));
        }
        if self.limit == 0 {
            return Err(Error::invalid_config("log limit must be > 0"));
        }
        Ok(())
    }
}

/// A document as returned by the store: an id and an arbitrary field map.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    /// Document identifier.
    pub id: String,
    /// Field values.
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl Document {
    /// Create a document from an id and a field map.
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Convert into a log entry.
    ///
    /// Missing `sensor` and `message` fields read as empty strings. A
    /// `timestamp` that cannot be interpreted is dropped rather than failing
    /// the whole record.
    pub fn to_log_entry(&self) -> LogEntry {
        let timestamp = match self.fields.get("timestamp") {
            None | Some(Value::Null) => None,
            Some(value) => match timestamp_from_value(value) {
                Ok(ts) => Some(ts),
                Err(e) => {
                    warn!(id = %self.id, error = %e, "Ignoring unreadable log timestamp");
                    None
                }
            },
        };

        LogEntry {
            id: self.id.clone(),
            sensor: text_field(&self.fields, "sensor"),
            message: text_field(&self.fields, "message"),
            timestamp,
        }
    }
}

fn text_field(fields: &Map<String, Value>, name: &str) -> String {
    match fields.get(name) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Interpret a timestamp field.
///
/// Accepts RFC 3339 strings, epoch seconds or milliseconds, and
/// `{seconds, nanoseconds}` objects (with or without leading underscores).
pub fn timestamp_from_value(value: &Value) -> Result<OffsetDateTime> {
    match value {
        Value::String(s) => Ok(parse_rfc3339(s)?),
        Value::Number(n) => {
            let epoch = n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .ok_or_else(|| Error::InvalidData(format!("timestamp out of range: {n}")))?;
            Ok(from_epoch(epoch)?)
        }
        Value::Object(map) => {
            let seconds = map
                .get("seconds")
                .or_else(|| map.get("_seconds"))
                .and_then(Value::as_i64)
                .ok_or_else(|| Error::InvalidData("timestamp object without seconds".into()))?;
            let nanos = map
                .get("nanoseconds")
                .or_else(|| map.get("_nanoseconds"))
                .and_then(Value::as_i64)
                .unwrap_or(0);
            OffsetDateTime::from_unix_timestamp_nanos(
                i128::from(seconds) * 1_000_000_000 + i128::from(nanos),
            )
            .map_err(|e| Error::InvalidData(format!("timestamp out of range: {e}")))
        }
        other => Err(Error::InvalidData(format!(
            "unsupported timestamp value: {other}"
        ))),
    }
}

/// Order entries newest first and cap them at `limit`.
///
/// Entries without a timestamp sort last; ties keep their original order.
pub fn normalize(mut entries: Vec<LogEntry>, limit: usize) -> Vec<LogEntry> {
    entries.sort_by(|a, b| match (a.timestamp, b.timestamp) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    entries.truncate(limit);
    entries
}

/// Fetches the newest log entries from a document store.
#[derive(Debug, Clone)]
pub struct LogFetcher<S> {
    store: S,
    query: LogQuery,
    timeout: Duration,
}

impl<S: DocumentStore> LogFetcher<S> {
    /// Create a fetcher for `query`.
    pub fn new(store: S, query: LogQuery) -> Self {
        Self {
            store,
            query,
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    /// Set the per-fetch timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The query this fetcher runs.
    pub fn query(&self) -> &LogQuery {
        &self.query
    }

    /// Run the query once.
    ///
    /// On success the result holds at most `limit` entries, newest first.
    pub async fn fetch(&self) -> Result<Vec<LogEntry>> {
        let documents = tokio::time::timeout(self.timeout, self.store.query(&self.query))
            .await
            .map_err(|_| Error::timeout("log_fetch", self.timeout))??;

        debug!(
            collection = %self.query.collection,
            count = documents.len(),
            "Fetched log documents"
        );

        let entries = documents.iter().map(Document::to_log_entry).collect();
        Ok(normalize(entries, self.query.limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::datetime;

    fn doc(id: &str, fields: Value) -> Document {
        match fields {
            Value::Object(map) => Document::new(id, map),
            _ => unreachable!(),
        }
    }

    fn entry(id: &str, ts: Option<OffsetDateTime>) -> LogEntry {
        LogEntry {
            id: id.to_string(),
            sensor: "motion".to_string(),
            message: "x".to_string(),
            timestamp: ts,
        }
    }

    #[test]
    fn test_default_query() {
        let q = LogQuery::default();
        assert_eq!(q.collection, "SensorLogs");
        assert_eq!(q.order_by, "timestamp");
        assert!(q.descending);
        assert_eq!(q.limit, 10);
        assert!(q.validate().is_ok());
    }

    #[test]
    fn test_query_validation() {
        assert!(LogQuery::latest("", 10).validate().is_err());
        assert!(LogQuery::latest("SensorLogs", 0).validate().is_err());
    }

    #[test]
    fn test_document_to_log_entry() {
        let d = doc(
            "abc",
            json!({
                "sensor": "motion",
                "message": "Rat seen",
                "timestamp": "2024-05-01T12:00:00Z"
            }),
        );
        let e = d.to_log_entry();
        assert_eq!(e.id, "abc");
        assert_eq!(e.sensor, "motion");
        assert_eq!(e.message, "Rat seen");
        assert_eq!(e.timestamp, Some(datetime!(2024-05-01 12:00 UTC)));
    }

    #[test]
    fn test_document_missing_fields() {
        let e = doc("abc", json!({})).to_log_entry();
        assert_eq!(e.sensor, "");
        assert_eq!(e.message, "");
        assert!(e.timestamp.is_none());
    }

    #[test]
    fn test_document_non_string_message() {
        let e = doc("abc", json!({"message": 42, "sensor": null})).to_log_entry();
        assert_eq!(e.message, "42");
        assert_eq!(e.sensor, "");
    }

    #[test]
    fn test_document_bad_timestamp_is_dropped() {
        let e = doc("abc", json!({"timestamp": "soon"})).to_log_entry();
        assert!(e.timestamp.is_none());
    }

    #[test]
    fn test_timestamp_forms() {
        let expected = datetime!(2024-05-01 12:00 UTC);
        assert_eq!(timestamp_from_value(&json!(1_714_564_800)).unwrap(), expected);
        assert_eq!(
            timestamp_from_value(&json!(1_714_564_800_000i64)).unwrap(),
            expected
        );
        assert_eq!(
            timestamp_from_value(&json!({"seconds": 1_714_564_800, "nanoseconds": 0})).unwrap(),
            expected
        );
        assert_eq!(
            timestamp_from_value(&json!({"_seconds": 1_714_564_800})).unwrap(),
            expected
        );
        assert!(timestamp_from_value(&json!(true)).is_err());
    }

    #[test]
    fn test_extreme_numeric_timestamps_are_errors() {
        assert!(timestamp_from_value(&json!(i64::MIN)).is_err());
        assert!(timestamp_from_value(&json!(-1e30)).is_err());
        let e = doc("abc", json!({"timestamp": i64::MIN})).to_log_entry();
        assert!(e.timestamp.is_none());
    }

    #[test]
    fn test_normalize_orders_newest_first() {
        let t0 = datetime!(2024-05-01 12:00 UTC);
        let entries = vec![
            entry("old", Some(t0)),
            entry("none", None),
            entry("new", Some(t0 + std::time::Duration::from_secs(60))),
        ];
        let out = normalize(entries, 10);
        let ids: Vec<_> = out.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["new", "old", "none"]);
    }

    #[test]
    fn test_normalize_truncates() {
        let t0 = datetime!(2024-05-01 12:00 UTC);
        let entries: Vec<_> = (0..15)
            .map(|i| entry(&i.to_string(), Some(t0 + std::time::Duration::from_secs(i))))
            .collect();
        let out = normalize(entries, 10);
        assert_eq!(out.len(), 10);
        assert_eq!(out[0].id, "14");
        assert_eq!(out[9].id, "5");
    }
}
