//! Ollama answer generator.
//!
//! Uses the non-streaming `/api/generate` endpoint:
//! https://github.com/ollama/ollama/blob/main/docs/api.md

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use ragchat_core::config::DEFAULT_OLLAMA_ENDPOINT;
use ragchat_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    options: GenerateOptions,
    stream: bool,
}

/// Decoding parameters, nested under `options` in the generate API.
#[derive(Debug, Serialize)]
struct GenerateOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    model: String,
    response: String,
    #[serde(default)]
    prompt_eval_count: u32,
    #[serde(default)]
    eval_count: u32,
}

impl<'a> From<&'a LlmRequest> for GenerateRequest<'a> {
    fn from(request: &'a LlmRequest) -> Self {
        Self {
            model: &request.model,
            prompt: &request.prompt,
            system: request.system.as_deref(),
            options: GenerateOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            },
            stream: false,
        }
    }
}

impl From<GenerateResponse> for LlmResponse {
    fn from(response: GenerateResponse) -> Self {
        Self {
            content: response.response,
            model: response.model,
            usage: LlmUsage::new(response.prompt_eval_count, response.eval_count),
        }
    }
}

/// Client for a local or remote Ollama server.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    client: reqwest::Client,
}

impl OllamaClient {
    /// Client for the default local endpoint.
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_OLLAMA_ENDPOINT)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// Apply a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        match reqwest::Client::builder().timeout(timeout).build() {
            Ok(client) => self.client = client,
            Err(e) => tracing::warn!("Keeping default HTTP client, timeout not applied: {}", e),
        }
        self
    }
}

impl Default for OllamaClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for OllamaClient {
    fn provider_name(&self) -> &str {
        "ollama"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        let url = format!("{}/api/generate", self.base_url);
        debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(&GenerateRequest::from(request))
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to reach Ollama at {}: {}", self.base_url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Llm(format!("Ollama API error ({}): {}", status, body)));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to parse Ollama response: {}", e)))?;

        debug!(tokens = generated.eval_count, "Ollama completion received");
        Ok(generated.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalized() {
        let client = OllamaClient::with_base_url("http://ollama:11434/");
        assert_eq!(client.base_url, "http://ollama:11434");
        assert_eq!(OllamaClient::new().base_url, DEFAULT_OLLAMA_ENDPOINT);
    }

    #[test]
    fn test_generate_request_body() {
        let request = LlmRequest::new("Context and query", "phi3:mini")
            .with_temperature(0.3)
            .with_max_tokens(500)
            .with_system("Answer briefly");

        let body = serde_json::to_value(GenerateRequest::from(&request)).unwrap();
        assert_eq!(body["model"], "phi3:mini");
        assert_eq!(body["system"], "Answer briefly");
        assert_eq!(body["options"]["num_predict"], 500);
        assert_eq!(body["stream"], false);
        assert!((body["options"]["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_generate_response_usage() {
        let raw = r#"{"model":"phi3:mini","response":"Fintech firms.","done":true,"prompt_eval_count":5,"eval_count":3}"#;
        let response: LlmResponse = serde_json::from_str::<GenerateResponse>(raw).unwrap().into();
        assert_eq!(response.content, "Fintech firms.");
        assert_eq!(response.usage.total_tokens, 8);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_llm_error() {
        let client = OllamaClient::with_base_url("http://127.0.0.1:9")
            .with_timeout(Duration::from_secs(1));
        let err = client
            .complete(&LlmRequest::new("hi", "phi3:mini"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Llm(_)));
    }
}
