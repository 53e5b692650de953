use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::State;
use axum::{Form, Json};
use ragchat_chat::StructuredAnswer;

use super::{message, MessageForm};
use crate::state::AppState;

/// Validate retrieved records for `msg` and propose a search query.
///
/// A missing or blank `msg` is answered in-band rather than with a 400.
pub async fn structured_query(
    State(state): State<Arc<AppState>>,
    form: Result<Form<MessageForm>, FormRejection>,
) -> Json<StructuredAnswer> {
    let msg = message(form).unwrap_or_default();
    Json(state.chat.structured(&msg).await)
}
