//! LLM provider factory.
//!
//! Creates the answer-generator client named in configuration, resolving the
//! endpoint and checking that required secrets are present.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiCompatClient};
use crate::types::ProviderType;
use std::sync::Arc;
use std::time::Duration;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("groq", "ollama")
/// * `endpoint` - Base URL of the provider API
/// * `api_key` - API key (for providers that require it)
/// * `timeout` - Per-request timeout applied by the HTTP client
///
/// # Errors
/// Returns error if the provider is unknown or a required secret is missing.
pub fn create_client(
    provider: &str,
    endpoint: &str,
    api_key: Option<&str>,
    timeout: Duration,
) -> Result<Arc<dyn LlmClient>, String> {
    let provider_type =
        ProviderType::parse(provider).ok_or_else(|| format!("Unknown provider: {}", provider))?;

    if provider_type.requires_api_key() && api_key.is_none() {
        return Err(format!("{} provider requires API key", provider_type.as_str()));
    }

    match provider_type {
        ProviderType::Ollama => {
            let client = OllamaClient::with_base_url(endpoint).with_timeout(timeout);
            Ok(Arc::new(client))
        }
        ProviderType::Groq => {
            let client = OpenAiCompatClient::new(
                provider_type.as_str(),
                endpoint,
                api_key.unwrap_or_default(),
            )
            .with_timeout(timeout);
            Ok(Arc::new(client))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", "http://localhost:11434", None, TIMEOUT);
        assert!(client.is_ok());
    }

    #[test]
    fn test_create_groq_client() {
        let client = create_client(
            "groq",
            "https://api.groq.com/openai/v1",
            Some("gsk_test"),
            TIMEOUT,
        );
        assert_eq!(client.unwrap().provider_name(), "groq");
    }

    #[test]
    fn test_groq_requires_api_key() {
        match create_client("groq", "https://api.groq.com/openai/v1", None, TIMEOUT) {
            Err(err) => assert!(err.contains("requires API key")),
            Ok(_) => panic!("Expected error for Groq without API key"),
        }
    }

    #[test]
    fn test_unknown_provider() {
        match create_client("unknown", "http://localhost", None, TIMEOUT) {
            Err(err) => assert!(err.contains("Unknown provider")),
            Ok(_) => panic!("Expected error for unknown provider"),
        }
    }
}
