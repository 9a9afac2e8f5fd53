//! Firestore over the REST `runQuery` endpoint.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Number, Value, json};
use tracing::debug;

use super::{
    DEFAULT_REQUEST_TIMEOUT, FirebaseConfig, FirebaseError, FirebaseResult, build_client,
    error_from_response, normalize_base_url,
};
use crate::error::{Error, Result};
use crate::logs::{Document, LogQuery};
use crate::traits::DocumentStore;

/// Client for one Firestore database.
#[derive(Debug, Clone)]
pub struct Firestore {
    client: Client,
    documents_url: String,
    api_key: Option<String>,
    auth_token: Option<String>,
}

impl Firestore {
    /// Create a client for the project in `config`.
    pub fn new(config: &FirebaseConfig) -> FirebaseResult<Self> {
        if config.project_id.is_empty() {
            return Err(FirebaseError::InvalidUrl("project id is empty".into()));
        }
        let endpoint = normalize_base_url(&config.firestore_endpoint)?;
        Ok(Self {
            client: build_client(Some(DEFAULT_REQUEST_TIMEOUT))?,
            documents_url: format!(
                "{endpoint}/projects/{}/databases/{}/documents",
                config.project_id, config.database_id
            ),
            api_key: config.api_key.clone(),
            auth_token: config.auth_token.clone(),
        })
    }

    /// URL of the `runQuery` endpoint.
    pub fn run_query_url(&self) -> String {
        format!("{}:runQuery", self.documents_url)
    }

    async fn run_query(&self, query: &LogQuery) -> FirebaseResult<Vec<Document>> {
        let url = self.run_query_url();
        let mut request = self.client.post(&url).json(&structured_query(query));
        if let Some(key) = &self.api_key {
            request = request.query(&[("key", key)]);
        }
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FirebaseError::NotReachable { url, source: e })?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let rows: Vec<QueryRow> = response.json().await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| row.document)
            .map(RawDocument::into_document)
            .collect())
    }
}

#[async_trait]
impl DocumentStore for Firestore {
    async fn query(&self, query: &LogQuery) -> Result<Vec<Document>> {
        let documents = self
            .run_query(query)
            .await
            .map_err(|e| Error::query(&query.collection, e.to_string()))?;
        debug!(collection = %query.collection, count = documents.len(), "Query complete");
        Ok(documents)
    }
}

/// Request body for a collection query.
fn structured_query(query: &LogQuery) -> Value {
    let direction = if query.descending {
        "DESCENDING"
    } else {
        "ASCENDING"
    };
    json!({
        "structuredQuery": {
            "from": [{ "collectionId": query.collection }],
            "orderBy": [{
                "field": { "fieldPath": query.order_by },
                "direction": direction,
            }],
            "limit": query.limit,
        }
    })
}

#[derive(Debug, Deserialize)]
struct QueryRow {
    #[serde(default)]
    document: Option<RawDocument>,
}

#[derive(Debug, Deserialize)]
struct RawDocument {
    name: String,
    #[serde(default)]
    fields: Map<String, Value>,
}

impl RawDocument {
    fn into_document(self) -> Document {
        let id = self
            .name
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        let fields = self
            .fields
            .into_iter()
            .map(|(k, v)| (k, decode_value(&v)))
            .collect();
        Document::new(id, fields)
    }
}

/// Convert a typed Firestore value into plain JSON.
///
/// Timestamps become RFC 3339 strings and integers become numbers; unknown
/// shapes are passed through unchanged.
pub fn decode_value(value: &Value) -> Value {
    let Some(map) = value.as_object() else {
        return value.clone();
    };
    let Some((kind, inner)) = map.iter().next() else {
        return Value::Null;
    };

    match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" | "doubleValue" => inner.clone(),
        "integerValue" => match inner {
            Value::String(s) => s
                .parse::<i64>()
                .map(|n| Value::Number(Number::from(n)))
                .unwrap_or_else(|_| inner.clone()),
            other => other.clone(),
        },
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "geoPointValue" => inner.clone(),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|values| values.iter().map(decode_value).collect())
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(
            inner
                .get("fields")
                .and_then(Value::as_object)
                .map(|fields| {
                    fields
                        .iter()
                        .map(|(k, v)| (k.clone(), decode_value(v)))
                        .collect()
                })
                .unwrap_or_default(),
        ),
        _ => value.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structured_query() {
        let body = structured_query(&LogQuery::default());
        let q = &body["structuredQuery"];
        assert_eq!(q["from"][0]["collectionId"], "SensorLogs");
        assert_eq!(q["orderBy"][0]["field"]["fieldPath"], "timestamp");
        assert_eq!(q["orderBy"][0]["direction"], "DESCENDING");
        assert_eq!(q["limit"], 10);
    }

    #[test]
    fn test_decode_scalars() {
        assert_eq!(decode_value(&json!({"stringValue": "motion"})), json!("motion"));
        assert_eq!(decode_value(&json!({"integerValue": "42"})), json!(42));
        assert_eq!(decode_value(&json!({"doubleValue": 1.5})), json!(1.5));
        assert_eq!(decode_value(&json!({"booleanValue": true})), json!(true));
        assert_eq!(decode_value(&json!({"nullValue": null})), Value::Null);
        assert_eq!(
            decode_value(&json!({"timestampValue": "2024-05-01T12:00:00.123Z"})),
            json!("2024-05-01T12:00:00.123Z")
        );
    }

    #[test]
    fn test_decode_nested() {
        let value = json!({"mapValue": {"fields": {
            "tags": {"arrayValue": {"values": [{"stringValue": "a"}, {"integerValue": "1"}]}}
        }}});
        assert_eq!(decode_value(&value), json!({"tags": ["a", 1]}));
        assert_eq!(decode_value(&json!({"arrayValue": {}})), json!([]));
    }

    #[test]
    fn test_query_rows_to_documents() {
        let rows: Vec<QueryRow> = serde_json::from_value(json!([
            {
                "document": {
                    "name": "projects/p/databases/(default)/documents/SensorLogs/abc",
                    "fields": {
                        "sensor": {"stringValue": "motion"},
                        "message": {"stringValue": "Rat seen"},
                        "timestamp": {"timestampValue": "2024-05-01T12:00:00Z"}
                    }
                },
                "readTime": "2024-05-01T12:00:01Z"
            },
            {"readTime": "2024-05-01T12:00:01Z"}
        ]))
        .unwrap();

        let docs: Vec<Document> = rows
            .into_iter()
            .filter_map(|r| r.document)
            .map(RawDocument::into_document)
            .collect();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "abc");

        let entry = docs[0].to_log_entry();
        assert_eq!(entry.sensor, "motion");
        assert_eq!(entry.message, "Rat seen");
        assert!(entry.timestamp.is_some());
    }

    #[test]
    fn test_run_query_url() {
        let store = Firestore::new(&FirebaseConfig::new("https://db.firebaseio.com", "proj"))
            .unwrap();
        assert_eq!(
            store.run_query_url(),
            "https://firestore.googleapis.com/v1/projects/proj/databases/(default)/documents:runQuery"
        );
    }
}
