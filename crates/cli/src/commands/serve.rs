//! Serve command handler.

use crate::services::build_chat_service;
use clap::Args;
use ragchat_core::{config::AppConfig, AppError, AppResult};
use ragchat_server::AppState;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Run the HTTP chat server
#[derive(Args, Debug)]
pub struct ServeCommand {
    /// Bind address (overrides HOST)
    #[arg(long)]
    pub host: Option<String>,

    /// Port (overrides PORT)
    #[arg(long)]
    pub port: Option<u16>,
}

impl ServeCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let host = self.host.as_deref().unwrap_or(&config.server.host);
        let port = self.port.unwrap_or(config.server.port);

        let chat = build_chat_service(config).await?;
        let state = Arc::new(AppState::new(chat, config.history.recent_limit));

        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| AppError::Config(format!("Failed to bind {}: {}", bind_addr, e)))?;

        ragchat_server::serve(listener, state).await
    }
}
