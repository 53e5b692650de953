//! Error types for ragchat.
//!
//! This module defines a unified error enum that covers all error categories
//! in the application: configuration, I/O, the external services (language
//! model, embedding model, vector store, history store), prompts, document
//! loading, and model-output extraction.

use thiserror::Error;

/// Unified error type for ragchat.
///
/// Library functions return `Result<T, AppError>`. Upstream service failures
/// are represented here and converted into degraded responses at the call site.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Language model provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Embedding provider errors
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Vector index errors
    #[error("Vector store error: {0}")]
    VectorStore(String),

    /// Chat history store errors
    #[error("History store error: {0}")]
    History(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Document loading and ingestion errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Structured output could not be recovered from model text
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_prefixes() {
        let err = AppError::VectorStore("timeout".to_string());
        assert_eq!(err.to_string(), "Vector store error: timeout");

        let err = AppError::History("database is locked".to_string());
        assert_eq!(err.to_string(), "History store error: database is locked");
    }

    #[test]
    fn test_from_serde_json_error() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: AppError = parse_err.into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
