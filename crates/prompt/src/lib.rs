//! Prompt composition for ragchat.
//!
//! This crate turns retrieved context and a user query into the text sent to
//! the answer generator:
//! - YAML-based prompt definitions (built-in, overridable per workspace)
//! - Handlebars template rendering
//! - Context serialization

pub mod builder;
pub mod defaults;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{build_prompt, compose};
pub use defaults::{builtin_prompt, CHAT_FILTERS_PROMPT, CHAT_STRUCTURED_PROMPT};
pub use loader::{load_prompt, resolve_prompt};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
