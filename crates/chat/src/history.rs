//! Chat history persistence.

use async_trait::async_trait;
use ragchat_core::{AppError, AppResult};
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Upper bound on entries returned by one `recent` call.
pub const MAX_RECENT_LIMIT: usize = 100;

/// Entries shown by one history page.
pub const HISTORY_PAGE_LIMIT: usize = 10;

/// Timestamp format used for stored entries (local time).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One question/answer exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub user_input: String,
    pub answer: String,
    pub filters: Map<String, Value>,
    pub timestamp: String,
    /// Store-assigned id, present once persisted.
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ChatEntry {
    /// Create an entry stamped with the current local time.
    pub fn new(user_input: &str, answer: &str, filters: Map<String, Value>) -> Self {
        Self {
            user_input: user_input.to_string(),
            answer: answer.to_string(),
            filters,
            timestamp: chrono::Local::now().format(TIMESTAMP_FORMAT).to_string(),
            id: None,
        }
    }
}

/// Append-only store of chat entries.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Persist an entry and return its id.
    async fn append(&self, entry: &ChatEntry) -> AppResult<String>;

    /// Newest entries first, at most `min(limit, MAX_RECENT_LIMIT)`.
    async fn recent(&self, limit: usize) -> AppResult<Vec<ChatEntry>>;
}

/// SQLite-backed history. Opens one connection per operation.
#[derive(Debug, Clone)]
pub struct SqliteHistoryStore {
    path: PathBuf,
}

impl SqliteHistoryStore {
    /// Open (creating if needed) the database at `path` and its table.
    pub fn open(path: &Path) -> AppResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    AppError::History(format!("Failed to create history directory: {}", e))
                })?;
            }
        }

        let conn = connect(path)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS chat_history (
                id TEXT PRIMARY KEY,
                user_input TEXT NOT NULL,
                answer TEXT NOT NULL,
                filters TEXT NOT NULL,
                timestamp TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_chat_history_timestamp ON chat_history(timestamp);
            "#,
        )
        .map_err(|e| AppError::History(format!("Failed to create history table: {}", e)))?;

        debug!("Initialized chat history at {:?}", path);
        Ok(Self {
            path: path.to_path_buf(),
        })
    }
}

fn connect(path: &Path) -> AppResult<Connection> {
    Connection::open(path)
        .map_err(|e| AppError::History(format!("Failed to open history database: {}", e)))
}

fn insert_entry(path: &Path, entry: &ChatEntry) -> AppResult<String> {
    let conn = connect(path)?;
    let id = uuid::Uuid::new_v4().to_string();
    let filters = serde_json::to_string(&entry.filters)?;

    conn.execute(
        "INSERT INTO chat_history (id, user_input, answer, filters, timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![id, entry.user_input, entry.answer, filters, entry.timestamp],
    )
    .map_err(|e| AppError::History(format!("Failed to insert chat entry: {}", e)))?;

    Ok(id)
}

fn select_recent(path: &Path, limit: usize) -> AppResult<Vec<ChatEntry>> {
    let conn = connect(path)?;
    let mut stmt = conn
        .prepare(
            "SELECT id, user_input, answer, filters, timestamp FROM chat_history
             ORDER BY timestamp DESC, rowid DESC LIMIT ?1",
        )
        .map_err(|e| AppError::History(format!("Failed to prepare history query: {}", e)))?;

    let rows = stmt
        .query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })
        .map_err(|e| AppError::History(format!("Failed to query history: {}", e)))?;

    let mut entries = Vec::new();
    for row in rows {
        let (id, user_input, answer, filters, timestamp) =
            row.map_err(|e| AppError::History(format!("Failed to read history row: {}", e)))?;
        let filters = serde_json::from_str(&filters).unwrap_or_else(|e| {
            warn!("Discarding unreadable filters for history entry {}: {}", id, e);
            Map::new()
        });
        entries.push(ChatEntry {
            user_input,
            answer,
            filters,
            timestamp,
            id: Some(id),
        });
    }
    Ok(entries)
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn append(&self, entry: &ChatEntry) -> AppResult<String> {
        let path = self.path.clone();
        let entry = entry.clone();
        tokio::task::spawn_blocking(move || insert_entry(&path, &entry))
            .await
            .map_err(|e| AppError::History(format!("History task failed: {}", e)))?
    }

    async fn recent(&self, limit: usize) -> AppResult<Vec<ChatEntry>> {
        let path = self.path.clone();
        let limit = limit.min(MAX_RECENT_LIMIT);
        tokio::task::spawn_blocking(move || select_recent(&path, limit))
            .await
            .map_err(|e| AppError::History(format!("History task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn entry(input: &str, timestamp: &str) -> ChatEntry {
        ChatEntry {
            user_input: input.to_string(),
            answer: format!("answer to {}", input),
            filters: json!({"industry": ["Tech"]}).as_object().cloned().unwrap(),
            timestamp: timestamp.to_string(),
            id: None,
        }
    }

    fn store(dir: &TempDir) -> SqliteHistoryStore {
        SqliteHistoryStore::open(&dir.path().join("nested").join("history.db")).unwrap()
    }

    #[test]
    fn test_entry_timestamp_format() {
        let entry = ChatEntry::new("q", "a", Map::new());
        assert!(chrono::NaiveDateTime::parse_from_str(&entry.timestamp, TIMESTAMP_FORMAT).is_ok());
        assert!(entry.id.is_none());
    }

    #[test]
    fn test_entry_serializes_id_as_underscore_id() {
        let mut entry = entry("q", "2024-05-01 10:00:00");
        let value = serde_json::to_value(&entry).unwrap();
        assert!(value.get("_id").is_none());

        entry.id = Some("abc".to_string());
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["_id"], "abc");
    }

    #[tokio::test]
    async fn test_append_and_recent_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        let id = store.append(&entry("fintech", "2024-05-01 10:00:00")).await.unwrap();
        assert!(uuid::Uuid::parse_str(&id).is_ok());

        let recent = store.recent(10).await.unwrap();
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].id.as_deref(), Some(id.as_str()));
        assert_eq!(recent[0].user_input, "fintech");
        assert_eq!(recent[0].filters["industry"], json!(["Tech"]));
    }

    #[tokio::test]
    async fn test_recent_is_newest_first_with_ties_by_insertion() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        store.append(&entry("old", "2024-05-01 09:00:00")).await.unwrap();
        store.append(&entry("tie-first", "2024-05-01 10:00:00")).await.unwrap();
        store.append(&entry("tie-second", "2024-05-01 10:00:00")).await.unwrap();
        store.append(&entry("older", "2024-04-30 23:59:59")).await.unwrap();

        let inputs: Vec<String> = store
            .recent(10)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.user_input)
            .collect();
        assert_eq!(inputs, vec!["tie-second", "tie-first", "old", "older"]);
    }

    #[tokio::test]
    async fn test_recent_limit_and_clamp() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);

        for i in 0..12 {
            store
                .append(&entry(&format!("q{}", i), &format!("2024-05-01 10:00:{:02}", i)))
                .await
                .unwrap();
        }

        let recent = store.recent(10).await.unwrap();
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].user_input, "q11");

        assert_eq!(store.recent(usize::MAX).await.unwrap().len(), 12);
        assert!(store.recent(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reopen_keeps_entries() {
        let dir = TempDir::new().unwrap();
        store(&dir)
            .append(&entry("persisted", "2024-05-01 10:00:00"))
            .await
            .unwrap();

        let reopened = store(&dir);
        assert_eq!(reopened.recent(5).await.unwrap()[0].user_input, "persisted");
    }
}
