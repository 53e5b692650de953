//! Ingest command handler.
//!
//! Loads a folder of JSON record files and upserts their embeddings into the
//! configured vector index.

use crate::services::{build_embedder, build_index};
use clap::Args;
use ragchat_core::{config::AppConfig, AppResult};
use ragchat_knowledge::{ingest, load_json_records};
use std::path::PathBuf;

/// Embed JSON records and upload them to the vector index
#[derive(Args, Debug)]
pub struct IngestCommand {
    /// Folder containing `.json` record files
    pub dir: PathBuf,

    /// Records per embedding/upsert batch
    #[arg(long, default_value_t = 100)]
    pub batch_size: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl IngestCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Ingesting records from {:?}", self.dir);

        let records = load_json_records(&self.dir)?;
        if records.is_empty() {
            tracing::warn!("No records found in {:?}", self.dir);
        }

        let embedder = build_embedder(config)?;
        let index = build_index(config)?;
        let stats = ingest(&records, embedder.as_ref(), index.as_ref(), self.batch_size).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!(
                "Ingested {} records in {} batches into '{}' ({:.2}s)",
                stats.records, stats.batches, config.vector.index_name, stats.duration_secs
            );
        }

        Ok(())
    }
}
