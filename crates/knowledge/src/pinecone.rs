//! Pinecone data-plane client.
//!
//! Talks to an existing serverless index over its REST API. Index creation
//! and deletion are managed outside this crate.

use crate::types::{rank, ScoredMatch, VectorRecord};
use crate::vector_index::VectorIndex;
use async_trait::async_trait;
use ragchat_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const API_VERSION: &str = "2024-10";

/// Client for one Pinecone index namespace.
#[derive(Clone)]
pub struct PineconeIndex {
    client: Client,
    host: String,
    api_key: String,
    index_name: String,
    namespace: Option<String>,
}

impl std::fmt::Debug for PineconeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PineconeIndex")
            .field("host", &self.host)
            .field("index_name", &self.index_name)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Debug, Deserialize)]
struct QueryMatch {
    id: String,
    #[serde(default)]
    score: f32,
    #[serde(default)]
    metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

impl PineconeIndex {
    pub fn new(
        host: &str,
        api_key: &str,
        index_name: &str,
        namespace: Option<&str>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::VectorStore(format!("Failed to create HTTP client for Pinecone: {}", e))
        })?;

        Ok(Self {
            client,
            host: normalize_host(host),
            api_key: api_key.to_string(),
            index_name: index_name.to_string(),
            namespace: namespace.filter(|n| !n.is_empty()).map(str::to_string),
        })
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> AppResult<R>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let url = format!("{}{}", self.host, path);
        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                AppError::VectorStore(format!(
                    "Failed to reach Pinecone index '{}': {}",
                    self.index_name, e
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::VectorStore(format!(
                "Pinecone API error ({}): {}",
                status, error_text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::VectorStore(format!("Failed to parse Pinecone response: {}", e)))
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    fn name(&self) -> &str {
        "pinecone"
    }

    #[instrument(skip(self, query), fields(index = %self.index_name, top_k))]
    async fn search(&self, query: &[f32], top_k: usize) -> AppResult<Vec<ScoredMatch>> {
        let request = QueryRequest {
            vector: query,
            top_k,
            include_metadata: true,
            include_values: false,
            namespace: self.namespace.as_deref(),
        };

        let response: QueryResponse = self.post("/query", &request).await?;
        debug!("Pinecone returned {} matches", response.matches.len());

        let matches = response
            .matches
            .into_iter()
            .map(|m| ScoredMatch::new(m.id, m.score, m.metadata.unwrap_or_default()))
            .collect();
        Ok(rank(matches, top_k))
    }

    #[instrument(skip(self, records), fields(index = %self.index_name, count = records.len()))]
    async fn upsert(&self, records: &[VectorRecord]) -> AppResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let request = UpsertRequest {
            vectors: records,
            namespace: self.namespace.as_deref(),
        };
        let response: UpsertResponse = self.post("/vectors/upsert", &request).await?;
        Ok(response.upserted_count)
    }
}

/// Prefix `https://` when the host has no scheme and drop trailing slashes.
fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{}", host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host() {
        assert_eq!(
            normalize_host("company-data-abc.svc.pinecone.io"),
            "https://company-data-abc.svc.pinecone.io"
        );
        assert_eq!(normalize_host("http://localhost:5080/"), "http://localhost:5080");
    }

    #[test]
    fn test_query_request_shape() {
        let request = QueryRequest {
            vector: &[0.1, 0.2],
            top_k: 3,
            include_metadata: true,
            include_values: false,
            namespace: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["topK"], 3);
        assert_eq!(value["includeMetadata"], true);
        assert!(value.get("namespace").is_none());
    }

    #[test]
    fn test_query_response_without_metadata() {
        let response: QueryResponse =
            serde_json::from_str(r#"{"matches":[{"id":"x","score":0.5}],"namespace":""}"#)
                .unwrap();
        assert_eq!(response.matches.len(), 1);
        assert!(response.matches[0].metadata.is_none());
    }

    #[test]
    fn test_debug_hides_api_key() {
        let index = PineconeIndex::new(
            "host.pinecone.io",
            "pc-secret",
            "company-data",
            Some(""),
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(index.namespace.is_none());
        assert!(!format!("{:?}", index).contains("pc-secret"));
    }

    #[tokio::test]
    async fn test_unreachable_host_is_vector_store_error() {
        let index = PineconeIndex::new(
            "http://127.0.0.1:9",
            "key",
            "company-data",
            None,
            Duration::from_secs(1),
        )
        .unwrap();
        let err = index.search(&[0.1, 0.2], 3).await.unwrap_err();
        assert!(matches!(err, AppError::VectorStore(_)));
    }
}
