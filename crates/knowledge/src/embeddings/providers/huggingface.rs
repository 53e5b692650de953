//! HuggingFace Inference embedding provider.
//!
//! Uses the hosted `feature-extraction` pipeline, which accepts a list of
//! inputs and returns one pooled vector per input for sentence-transformers
//! models.

use crate::embeddings::provider::{check_shape, EmbeddingProvider};
use async_trait::async_trait;
use ragchat_core::{AppError, AppResult};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// Hosted inference router.
pub const DEFAULT_HF_ENDPOINT: &str = "https://router.huggingface.co/hf-inference/models";

/// Embedding provider backed by the HuggingFace Inference API.
#[derive(Clone)]
pub struct HuggingFaceProvider {
    client: Client,
    url: String,
    model: String,
    dimensions: usize,
    api_token: Option<String>,
}

impl std::fmt::Debug for HuggingFaceProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HuggingFaceProvider")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .field("api_token", &self.api_token.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct FeatureExtractionRequest<'a> {
    inputs: &'a [String],
}

impl HuggingFaceProvider {
    pub fn new(
        endpoint: Option<&str>,
        model: &str,
        dimensions: usize,
        api_token: Option<&str>,
        timeout: Duration,
    ) -> AppResult<Self> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::Embedding(format!("Failed to create HTTP client for HuggingFace: {}", e))
        })?;

        let base = endpoint.unwrap_or(DEFAULT_HF_ENDPOINT).trim_end_matches('/');
        Ok(Self {
            client,
            url: format!("{}/{}/pipeline/feature-extraction", base, model),
            model: model.to_string(),
            dimensions,
            api_token: api_token.map(str::to_string),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HuggingFaceProvider {
    fn provider_name(&self) -> &str {
        "huggingface"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let mut request = self
            .client
            .post(&self.url)
            .json(&FeatureExtractionRequest { inputs: texts });
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await.map_err(|e| {
            AppError::Embedding(format!("Failed to send request to HuggingFace: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Embedding(format!(
                "HuggingFace API error ({}): {}",
                status, error_text
            )));
        }

        let embeddings: Vec<Vec<f32>> = response.json().await.map_err(|e| {
            AppError::Embedding(format!("Failed to parse HuggingFace response: {}", e))
        })?;

        check_shape("huggingface", &embeddings, texts.len(), self.dimensions)?;
        debug!("Generated {} embeddings", embeddings.len());
        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_url() {
        let provider = HuggingFaceProvider::new(
            None,
            "sentence-transformers/all-MiniLM-L6-v2",
            384,
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            provider.url,
            "https://router.huggingface.co/hf-inference/models/sentence-transformers/all-MiniLM-L6-v2/pipeline/feature-extraction"
        );
    }

    #[test]
    fn test_debug_redacts_token() {
        let provider = HuggingFaceProvider::new(
            Some("http://localhost:8000/"),
            "m",
            4,
            Some("hf_secret"),
            Duration::from_secs(5),
        )
        .unwrap();
        let debug = format!("{:?}", provider);
        assert!(!debug.contains("hf_secret"));
        assert!(debug.contains("http://localhost:8000/m/pipeline/feature-extraction"));
    }
}
