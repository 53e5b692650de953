//! Ask command handler.
//!
//! Runs one query through the same pipeline as `POST /get`.

use crate::services::build_chat_service;
use clap::Args;
use ragchat_core::{config::AppConfig, AppError, AppResult};

/// Ask a question against the company-data index
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub query: String,

    /// Output the full reply as JSON
    #[arg(long)]
    pub json: bool,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        if self.query.trim().is_empty() {
            return Err(AppError::Config("No message provided".to_string()));
        }

        let service = build_chat_service(config).await?;
        let reply = service.answer(&self.query).await;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&reply)?);
            return Ok(());
        }

        if let Some(ref error) = reply.retrieval_error {
            eprintln!("warning: retrieval failed: {}", error);
        }
        println!("{}", reply.entry.answer);
        if !reply.entry.filters.is_empty() {
            println!();
            println!("{}", serde_json::to_string_pretty(&reply.entry.filters)?);
        }

        Ok(())
    }
}
