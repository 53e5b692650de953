use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use ragchat_chat::{ChatEntry, HISTORY_PAGE_LIMIT};

use crate::error::ApiError;
use crate::state::AppState;

/// Most recent exchanges, newest first, without store ids.
pub async fn recent_history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ChatEntry>>, ApiError> {
    let mut entries = state
        .chat
        .recent(state.recent_limit.min(HISTORY_PAGE_LIMIT))
        .await
        .map_err(ApiError::internal)?;

    for entry in &mut entries {
        entry.id = None;
    }
    Ok(Json(entries))
}
