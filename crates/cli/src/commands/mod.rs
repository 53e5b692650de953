//! Command handlers for the ragchat CLI.

pub mod ask;
pub mod history;
pub mod ingest;
pub mod serve;

// Re-export command types for convenience
pub use ask::AskCommand;
pub use history::HistoryCommand;
pub use ingest::IngestCommand;
pub use serve::ServeCommand;
