//! Vector index seam.

use crate::memory_index::MemoryIndex;
use crate::pinecone::PineconeIndex;
use crate::types::{ScoredMatch, VectorRecord};
use async_trait::async_trait;
use ragchat_core::config::VectorSettings;
use ragchat_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// A nearest-neighbour index over record embeddings.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    /// Return up to `top_k` matches, highest score first.
    async fn search(&self, query: &[f32], top_k: usize) -> AppResult<Vec<ScoredMatch>>;

    /// Insert or replace vectors by id. Returns the number written.
    async fn upsert(&self, records: &[VectorRecord]) -> AppResult<usize>;
}

/// Build the configured index backend.
pub fn create_index(
    settings: &VectorSettings,
    api_key: Option<&str>,
    timeout: Duration,
) -> AppResult<Arc<dyn VectorIndex>> {
    match settings.backend.as_str() {
        "pinecone" => {
            let host = settings.index_host.as_deref().ok_or_else(|| {
                AppError::Config(
                    "PINECONE_INDEX_HOST is required for the pinecone backend".to_string(),
                )
            })?;
            let api_key = api_key.ok_or_else(|| {
                AppError::Config("PINECONE_API_KEY is required for the pinecone backend".to_string())
            })?;
            let index = PineconeIndex::new(
                host,
                api_key,
                &settings.index_name,
                settings.namespace.as_deref(),
                timeout,
            )?;
            Ok(Arc::new(index))
        }
        "memory" => Ok(Arc::new(MemoryIndex::new())),
        other => Err(AppError::Config(format!(
            "Unknown vector backend: {}. Supported: pinecone, memory",
            other
        ))),
    }
}
