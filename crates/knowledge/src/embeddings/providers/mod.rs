//! Concrete embedding providers.

pub mod huggingface;
pub mod mock;
pub mod ollama;
