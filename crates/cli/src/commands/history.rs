//! History command handler.

use crate::services::build_history;
use clap::Args;
use ragchat_chat::HistoryStore;
use ragchat_core::{config::AppConfig, AppResult};

/// Show recent chat exchanges
#[derive(Args, Debug)]
pub struct HistoryCommand {
    /// Number of entries (newest first, capped at 100)
    #[arg(short, long, default_value_t = 10)]
    pub limit: usize,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl HistoryCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let store = build_history(config)?;
        let entries = store.recent(self.limit).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
            return Ok(());
        }

        if entries.is_empty() {
            println!("No chat history yet.");
            return Ok(());
        }

        for entry in entries {
            println!("[{}] {}", entry.timestamp, entry.user_input);
            println!("  {}", entry.answer.replace('\n', "\n  "));
            if !entry.filters.is_empty() {
                println!("  filters: {}", serde_json::Value::Object(entry.filters));
            }
        }

        Ok(())
    }
}
