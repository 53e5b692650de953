//! In-process vector index using brute-force cosine similarity.

use crate::types::{rank, ScoredMatch, VectorRecord};
use crate::vector_index::VectorIndex;
use async_trait::async_trait;
use ragchat_core::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::RwLock;

/// Vectors held in memory. Lost on restart.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    entries: RwLock<Entries>,
}

#[derive(Debug, Default)]
struct Entries {
    records: Vec<VectorRecord>,
    /// Record id to its position in `records`
    slots: HashMap<String, usize>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    fn name(&self) -> &str {
        "memory"
    }

    async fn search(&self, query: &[f32], top_k: usize) -> AppResult<Vec<ScoredMatch>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| AppError::VectorStore("Memory index lock poisoned".to_string()))?;

        let matches = entries
            .records
            .iter()
            .map(|r| ScoredMatch::new(&r.id, cosine_similarity(query, &r.values), r.metadata.clone()))
            .collect();

        Ok(rank(matches, top_k))
    }

    async fn upsert(&self, batch: &[VectorRecord]) -> AppResult<usize> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| AppError::VectorStore("Memory index lock poisoned".to_string()))?;
        let Entries { records, slots } = &mut *entries;

        for record in batch {
            match slots.get(&record.id) {
                Some(&slot) => records[slot] = record.clone(),
                None => {
                    slots.insert(record.id.clone(), records.len());
                    records.push(record.clone());
                }
            }
        }
        Ok(batch.len())
    }
}

/// Calculate cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
