//! Embed records and write them to a vector index.

use crate::embeddings::EmbeddingProvider;
use crate::types::{Record, VectorRecord};
use crate::vector_index::VectorIndex;
use ragchat_core::{AppError, AppResult};
use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info};

/// Outcome of an ingestion run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestStats {
    pub records: usize,
    pub batches: usize,
    pub duration_secs: f64,
}

/// Embed `records` in batches of `batch_size` and upsert each batch.
///
/// The first failing batch aborts the run.
pub async fn ingest(
    records: &[Record],
    embedder: &dyn EmbeddingProvider,
    index: &dyn VectorIndex,
    batch_size: usize,
) -> AppResult<IngestStats> {
    if batch_size == 0 {
        return Err(AppError::Knowledge(
            "Batch size must be greater than zero".to_string(),
        ));
    }

    let start = Instant::now();
    let mut batches = 0;

    for chunk in records.chunks(batch_size) {
        let texts: Vec<String> = chunk.iter().map(|r| r.text.clone()).collect();
        let embeddings = embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunk.len() {
            return Err(AppError::Embedding(format!(
                "Expected {} embeddings, got {}",
                chunk.len(),
                embeddings.len()
            )));
        }

        let vectors: Vec<VectorRecord> = chunk
            .iter()
            .zip(embeddings)
            .map(|(record, values)| VectorRecord {
                id: record.vector_id(),
                values,
                metadata: record.index_metadata(),
            })
            .collect();

        let written = index.upsert(&vectors).await?;
        batches += 1;
        debug!(batch = batches, written, "Upserted batch into {}", index.name());
    }

    let stats = IngestStats {
        records: records.len(),
        batches,
        duration_secs: start.elapsed().as_secs_f64(),
    };
    info!(
        records = stats.records,
        batches = stats.batches,
        "Ingested records in {:.2}s",
        stats.duration_secs
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::mock::MockProvider;
    use crate::memory_index::MemoryIndex;
    use crate::types::RecordMetadata;

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .filter_map(|i| {
                Record::new(
                    &format!("Company number {}", i),
                    RecordMetadata {
                        source: "companies.json".to_string(),
                        key: Some("name".to_string()),
                        index: Some(i),
                    },
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn test_ingest_batches_and_stores() {
        let embedder = MockProvider::new(32);
        let index = MemoryIndex::new();

        let stats = ingest(&records(5), &embedder, &index, 2).await.unwrap();
        assert_eq!(stats.records, 5);
        assert_eq!(stats.batches, 3);
        assert_eq!(index.len(), 5);

        let query = embedder.embed("Company number 3").await.unwrap();
        let matches = index.search(&query, 1).await.unwrap();
        assert_eq!(matches[0].text, "Company number 3");
        assert_eq!(matches[0].source(), "companies.json");
        assert_eq!(matches[0].key(), Some("name"));
    }

    #[tokio::test]
    async fn test_reingest_overwrites() {
        let embedder = MockProvider::new(32);
        let index = MemoryIndex::new();

        ingest(&records(3), &embedder, &index, 10).await.unwrap();
        ingest(&records(3), &embedder, &index, 10).await.unwrap();
        assert_eq!(index.len(), 3);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let embedder = MockProvider::new(8);
        let index = MemoryIndex::new();
        let stats = ingest(&[], &embedder, &index, 4).await.unwrap();
        assert_eq!(stats.records, 0);
        assert_eq!(stats.batches, 0);
    }

    #[tokio::test]
    async fn test_zero_batch_size_rejected() {
        let embedder = MockProvider::new(8);
        let index = MemoryIndex::new();
        assert!(ingest(&records(1), &embedder, &index, 0).await.is_err());
    }
}
