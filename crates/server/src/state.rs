use ragchat_chat::ChatService;

/// Shared handler state.
pub struct AppState {
    pub chat: ChatService,
    /// Entries returned by `GET /history`, capped at `HISTORY_PAGE_LIMIT`
    pub recent_limit: usize,
}

impl AppState {
    pub fn new(chat: ChatService, recent_limit: usize) -> Self {
        Self { chat, recent_limit }
    }
}
