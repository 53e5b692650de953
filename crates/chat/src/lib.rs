//! Retrieval-augmented chat pipeline.
//!
//! - [`extract`]: splits a model reply into prose and a filters object
//! - [`repair`]: best-effort fixes for almost-JSON model output
//! - [`history`]: persisted chat entries
//! - [`service`]: the per-request pipeline tying retrieval, prompting,
//!   generation, extraction and history together

pub mod extract;
pub mod history;
pub mod repair;
pub mod service;

pub use extract::{extract, ExtractMode, ExtractedAnswer};
pub use history::{
    ChatEntry, HistoryStore, SqliteHistoryStore, HISTORY_PAGE_LIMIT, MAX_RECENT_LIMIT,
};
pub use repair::{parse_json_blob, repair_json};
pub use service::{ChatPrompts, ChatReply, ChatService, ChatSettings, StructuredAnswer};
