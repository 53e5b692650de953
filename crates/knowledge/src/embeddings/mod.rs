//! Sentence-embedding providers.
//!
//! The query path embeds exactly one text per request; ingestion embeds in
//! batches. Providers are stateless and not cached.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
