//! Embedding provider trait and factory.

use super::providers::{huggingface::HuggingFaceProvider, mock::MockProvider, ollama::OllamaProvider};
use ragchat_core::config::EmbeddingSettings;
use ragchat_core::{AppError, AppResult};
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "mock", "huggingface", "ollama")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in a batch.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text (convenience method).
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

/// Create an embedding provider based on configuration.
///
/// `api_token` is only used by the hosted HuggingFace provider.
pub fn create_provider(
    settings: &EmbeddingSettings,
    api_token: Option<&str>,
    timeout: Duration,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match settings.provider.as_str() {
        "mock" => Ok(Arc::new(MockProvider::new(settings.dimensions))),

        "huggingface" => {
            let provider = HuggingFaceProvider::new(
                settings.endpoint.as_deref(),
                &settings.model,
                settings.dimensions,
                api_token,
                timeout,
            )?;
            Ok(Arc::new(provider))
        }

        "ollama" => {
            let provider = OllamaProvider::new(
                settings.endpoint.as_deref(),
                &settings.model,
                settings.dimensions,
                timeout,
            )?;
            Ok(Arc::new(provider))
        }

        _ => Err(AppError::Embedding(format!(
            "Unknown embedding provider: '{}'. Supported providers: huggingface, ollama, mock",
            settings.provider
        ))),
    }
}

/// Check that a provider returned one vector of the expected length per input.
pub(crate) fn check_shape(
    provider: &str,
    embeddings: &[Vec<f32>],
    expected_count: usize,
    dimensions: usize,
) -> AppResult<()> {
    if embeddings.len() != expected_count {
        return Err(AppError::Embedding(format!(
            "{} returned {} embeddings for {} inputs",
            provider,
            embeddings.len(),
            expected_count
        )));
    }
    if let Some(bad) = embeddings.iter().find(|e| e.len() != dimensions) {
        return Err(AppError::Embedding(format!(
            "Unexpected embedding dimensions from {}: got {}, expected {}",
            provider,
            bad.len(),
            dimensions
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(provider: &str) -> EmbeddingSettings {
        EmbeddingSettings {
            provider: provider.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_mock_provider() {
        let provider = create_provider(&settings("mock"), None, Duration::from_secs(5)).unwrap();
        assert_eq!(provider.provider_name(), "mock");
        assert_eq!(provider.dimensions(), 384);
    }

    #[test]
    fn test_create_hosted_providers() {
        let hf = create_provider(&settings("huggingface"), Some("hf_x"), Duration::from_secs(5))
            .unwrap();
        assert_eq!(hf.provider_name(), "huggingface");
        assert_eq!(hf.model_name(), "sentence-transformers/all-MiniLM-L6-v2");

        let ollama = create_provider(&settings("ollama"), None, Duration::from_secs(5)).unwrap();
        assert_eq!(ollama.provider_name(), "ollama");
    }

    #[test]
    fn test_create_unknown_provider() {
        let result = create_provider(&settings("unknown"), None, Duration::from_secs(5));
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Unknown embedding provider"));
    }

    #[test]
    fn test_check_shape() {
        let good = vec![vec![0.0; 4], vec![1.0; 4]];
        assert!(check_shape("test", &good, 2, 4).is_ok());
        assert!(check_shape("test", &good, 3, 4).is_err());
        assert!(check_shape("test", &good, 2, 8).is_err());
    }

    #[tokio::test]
    async fn test_provider_embed_single() {
        let provider = create_provider(&settings("mock"), None, Duration::from_secs(5)).unwrap();
        let embedding = provider.embed("test text").await.unwrap();
        assert_eq!(embedding.len(), 384);
    }
}
