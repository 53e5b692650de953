//! HTTP surface for ragchat.
//!
//! Routes:
//! - `GET /`: chat page
//! - `POST /get`: answer a form-encoded `msg`
//! - `GET /history`: recent exchanges
//! - `POST /structured`: validated records, summary and search query
//! - `GET /health`: liveness

pub mod error;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::router;
pub use state::AppState;

use ragchat_core::AppResult;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Serve the router on `listener` until Ctrl-C.
pub async fn serve(listener: TcpListener, state: Arc<AppState>) -> AppResult<()> {
    let addr = listener.local_addr()?;
    tracing::info!("Listening on http://{}", addr);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutdown signal received");
}
