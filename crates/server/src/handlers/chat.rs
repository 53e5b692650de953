use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::{Form, Json};
use ragchat_chat::ChatReply;

use super::{message, MessageForm};
use crate::error::ApiError;
use crate::state::AppState;

/// Answer the form-encoded `msg` with a summary and extracted filters.
pub async fn get_answer(
    State(state): State<Arc<AppState>>,
    form: Result<Form<MessageForm>, FormRejection>,
) -> Result<Json<ChatReply>, ApiError> {
    let msg = message(form).ok_or_else(|| ApiError::BadRequest("No message provided".to_string()))?;
    Ok(Json(state.chat.answer(&msg).await))
}
