//! Knowledge type definitions.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Where a record came from inside the data folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    /// File name the record was read from (e.g. "company_type.json")
    pub source: String,

    /// Object key holding the value, when the value came from an object
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,

    /// Position in the top-level list, when the file holds a list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

/// One indexed unit of company data.
///
/// `text` is always trimmed and non-empty; use [`Record::new`] to build one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub text: String,
    pub metadata: RecordMetadata,
}

impl Record {
    /// Build a record, or `None` when `text` is blank.
    pub fn new(text: &str, metadata: RecordMetadata) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        Some(Self {
            text: text.to_string(),
            metadata,
        })
    }

    /// Stable vector id derived from the record's origin and content.
    pub fn vector_id(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.metadata.source.as_bytes());
        hasher.update([0u8]);
        if let Some(ref key) = self.metadata.key {
            hasher.update(key.as_bytes());
        }
        hasher.update([0u8]);
        if let Some(index) = self.metadata.index {
            hasher.update(index.to_le_bytes());
        }
        hasher.update([0u8]);
        hasher.update(self.text.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    /// Metadata as stored next to the vector: origin fields plus the text.
    pub fn index_metadata(&self) -> serde_json::Map<String, serde_json::Value> {
        let mut map = serde_json::Map::new();
        map.insert("source".to_string(), self.metadata.source.clone().into());
        if let Some(ref key) = self.metadata.key {
            map.insert("key".to_string(), key.clone().into());
        }
        if let Some(index) = self.metadata.index {
            map.insert("index".to_string(), index.into());
        }
        map.insert("text".to_string(), self.text.clone().into());
        map
    }
}

/// A vector with its id and metadata, as written to an index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// One retrieval hit. Result lists are ordered by descending `score`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredMatch {
    pub id: String,
    pub score: f32,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// The `text` metadata field; empty when the index stored none
    pub text: String,
}

impl ScoredMatch {
    /// Build a match, lifting `text` out of the metadata.
    pub fn new(
        id: impl Into<String>,
        score: f32,
        metadata: serde_json::Map<String, serde_json::Value>,
    ) -> Self {
        let text = metadata
            .get("text")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        Self {
            id: id.into(),
            score,
            metadata,
            text,
        }
    }

    /// Source file of the match, or `"unknown_source"`.
    pub fn source(&self) -> &str {
        self.metadata
            .get("source")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown_source")
    }

    /// Object key of the match, if recorded.
    pub fn key(&self) -> Option<&str> {
        self.metadata.get("key").and_then(|v| v.as_str())
    }
}

/// Order matches by descending score and keep at most `top_k`.
pub(crate) fn rank(mut matches: Vec<ScoredMatch>, top_k: usize) -> Vec<ScoredMatch> {
    matches.sort_by(|a, b| b.score.total_cmp(&a.score));
    matches.truncate(top_k);
    matches
}
