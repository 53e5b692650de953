//! Construction of the long-lived service handles from configuration.

use ragchat_chat::{ChatPrompts, ChatService, ChatSettings, SqliteHistoryStore};
use ragchat_core::{AppConfig, AppError, AppResult};
use ragchat_knowledge::{
    create_index, create_provider, ingest, load_json_records, EmbeddingProvider, VectorIndex,
};
use ragchat_llm::{create_client, LlmClient};
use std::sync::Arc;
use std::time::Duration;

/// Records per embedding batch when seeding the in-memory index.
const SEED_BATCH_SIZE: usize = 64;

fn request_timeout(config: &AppConfig) -> Duration {
    Duration::from_secs(config.llm.request_timeout_secs)
}

pub fn build_embedder(config: &AppConfig) -> AppResult<Arc<dyn EmbeddingProvider>> {
    create_provider(
        &config.embedding,
        config.secrets.hf_api_token.as_deref(),
        request_timeout(config),
    )
}

pub fn build_index(config: &AppConfig) -> AppResult<Arc<dyn VectorIndex>> {
    create_index(
        &config.vector,
        config.secrets.pinecone_api_key.as_deref(),
        request_timeout(config),
    )
}

pub fn build_llm(config: &AppConfig) -> AppResult<Arc<dyn LlmClient>> {
    create_client(
        &config.llm.provider,
        config.llm.resolved_endpoint(),
        config.secrets.groq_api_key.as_deref(),
        request_timeout(config),
    )
    .map_err(AppError::Llm)
}

pub fn build_history(config: &AppConfig) -> AppResult<Arc<SqliteHistoryStore>> {
    Ok(Arc::new(SqliteHistoryStore::open(&config.history_path())?))
}

/// Build the chat pipeline. The memory backend is seeded from `vector.dataDir`.
pub async fn build_chat_service(config: &AppConfig) -> AppResult<ChatService> {
    config.validate()?;

    let embedder = build_embedder(config)?;
    let index = build_index(config)?;

    if config.vector.backend == "memory" {
        if let Some(ref dir) = config.vector.data_dir {
            let records = load_json_records(dir)?;
            let stats = ingest(&records, embedder.as_ref(), index.as_ref(), SEED_BATCH_SIZE).await?;
            tracing::info!("Seeded memory index with {} records from {:?}", stats.records, dir);
        }
    }

    Ok(ChatService::new(
        embedder,
        index,
        build_llm(config)?,
        build_history(config)?,
        ChatPrompts::resolve(&config.workspace)?,
        ChatSettings::from_config(config),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dev_config(dir: &TempDir) -> AppConfig {
        let mut config = AppConfig::default();
        config.workspace = dir.path().to_path_buf();
        config.llm.provider = "ollama".to_string();
        config.embedding.provider = "mock".to_string();
        config.vector.backend = "memory".to_string();
        config
    }

    #[tokio::test]
    async fn test_build_chat_service_seeds_memory_index() {
        let dir = TempDir::new().unwrap();
        let data = dir.path().join("data");
        std::fs::create_dir(&data).unwrap();
        std::fs::write(data.join("industry.json"), r#"["Fintech", "Retail"]"#).unwrap();

        let mut config = dev_config(&dir);
        config.vector.data_dir = Some(data);

        let service = build_chat_service(&config).await.unwrap();
        assert_eq!(service.settings().model, "phi3:mini");
        assert!(service.recent(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_build_chat_service_validates() {
        let dir = TempDir::new().unwrap();
        let mut config = dev_config(&dir);
        config.llm.provider = "groq".to_string();
        assert!(build_chat_service(&config).await.is_err());
    }
}
