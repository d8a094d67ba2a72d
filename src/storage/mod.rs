use crate::config::StorageConfig;
use crate::error::{Result, TownchatError};
use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub mod types;
pub use types::{
    ChatLogEntry, Chatbot, ChatbotUpdate, GeoPoint, HistoryPage, Location, NewChatLog,
    NewChatbot, PageRequest, Pagination, UserFeedback,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS chatbots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    store_id TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    knowledge_base TEXT NOT NULL DEFAULT '',
    greeting_message TEXT NOT NULL DEFAULT '',
    model TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    assistant_id TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS chat_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    chatbot_id INTEGER NOT NULL REFERENCES chatbots(id) ON DELETE CASCADE,
    user_id TEXT,
    session_id TEXT NOT NULL,
    message TEXT NOT NULL CHECK (length(message) > 0),
    response TEXT NOT NULL CHECK (length(response) > 0),
    thread_id TEXT,
    user_feedback TEXT NOT NULL DEFAULT 'none',
    latitude REAL,
    longitude REAL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_chat_logs_session
    ON chat_logs (session_id, created_at);
CREATE INDEX IF NOT EXISTS idx_chat_logs_chatbot_session
    ON chat_logs (chatbot_id, session_id, created_at);
";

const CHATBOT_COLUMNS: &str = "id, store_id, name, knowledge_base, greeting_message, model, \
     is_active, assistant_id, created_at, updated_at";

const LOG_COLUMNS: &str = "id, chatbot_id, user_id, session_id, message, response, thread_id, \
     user_feedback, latitude, longitude, created_at";

/// Persistence of chat turns
///
/// This is the only shared mutable resource on the chat path; rows are
/// appended once per turn and only their feedback column is ever updated.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatLogStore: Send + Sync {
    /// Thread id of the most recent row for the session that has one
    async fn latest_thread_for_session(&self, session_id: &str) -> Result<Option<String>>;

    /// Append a chat turn, returning its row id
    async fn insert_log(&self, entry: NewChatLog) -> Result<i64>;

    /// One page of a session transcript, oldest first
    async fn list_logs(
        &self,
        chatbot_id: i64,
        session_id: &str,
        page: PageRequest,
    ) -> Result<HistoryPage>;

    /// Record feedback on a row; `false` if the row does not exist
    async fn set_feedback(&self, log_id: i64, feedback: UserFeedback) -> Result<bool>;
}

/// Persistence of chatbots
#[async_trait]
pub trait ChatbotStore: Send + Sync {
    async fn get_chatbot(&self, id: i64) -> Result<Option<Chatbot>>;

    async fn list_chatbots(&self) -> Result<Vec<Chatbot>>;

    /// Insert a chatbot; a second chatbot for the same store is a conflict
    async fn insert_chatbot(
        &self,
        chatbot: NewChatbot,
        model: String,
        assistant_id: Option<String>,
    ) -> Result<Chatbot>;

    /// Apply a partial update, returning the new row or `None` if absent
    async fn update_chatbot(&self, id: i64, update: ChatbotUpdate) -> Result<Option<Chatbot>>;

    async fn set_assistant_id(&self, id: i64, assistant_id: Option<String>) -> Result<()>;

    /// Delete a chatbot and its logs, returning the deleted row
    async fn delete_chatbot(&self, id: i64) -> Result<Option<Chatbot>>;
}

/// SQLite storage backend for chatbots and chat logs
pub struct SqliteStorage {
    db_path: PathBuf,
}

impl SqliteStorage {
    /// Create a storage instance from configuration
    ///
    /// Uses `config.path` when set, otherwise `townchat.db` in the user's
    /// data directory.
    pub fn new(config: &StorageConfig) -> Result<Self> {
        if let Some(path) = &config.path {
            return Self::new_with_path(path);
        }

        let proj_dirs = ProjectDirs::from("com", "townchat", "townchat")
            .ok_or_else(|| TownchatError::Storage("Could not determine data directory".into()))?;

        Self::new_with_path(proj_dirs.data_dir().join("townchat.db"))
    }

    /// Create a storage instance that uses the specified database path.
    ///
    /// # Examples
    ///
    /// ```
    /// use townchat::storage::SqliteStorage;
    ///
    /// let dir = std::env::temp_dir().join("townchat-doc");
    /// let storage = SqliteStorage::new_with_path(dir.join("townchat.db")).unwrap();
    /// ```
    pub fn new_with_path<P: Into<PathBuf>>(db_path: P) -> Result<Self> {
        let db_path = db_path.into();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .context("Failed to create parent directory for database")
                .map_err(|e| TownchatError::Storage(e.to_string()))?;
        }

        let storage = Self { db_path };
        storage.init()?;
        Ok(storage)
    }

    /// Path of the database file
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn open(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)
            .context("Failed to open database")
            .map_err(|e| TownchatError::Storage(e.to_string()))?;
        conn.busy_timeout(Duration::from_secs(5))
            .map_err(|e| TownchatError::Storage(e.to_string()))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| TownchatError::Storage(e.to_string()))?;
        Ok(conn)
    }

    fn init(&self) -> Result<()> {
        let conn = self.open()?;
        conn.execute_batch(SCHEMA)
            .context("Failed to create tables")
            .map_err(|e| TownchatError::Storage(e.to_string()))?;
        Ok(())
    }

    /// Insert a chat turn with an explicit creation time
    pub fn insert_log_at(&self, entry: &NewChatLog, created_at: DateTime<Utc>) -> Result<i64> {
        if entry.message.is_empty() || entry.response.is_empty() {
            return Err(TownchatError::Storage(
                "chat log message and response must not be empty".to_string(),
            )
            .into());
        }

        let conn = self.open()?;
        conn.execute(
            "INSERT INTO chat_logs (chatbot_id, user_id, session_id, message, response, \
             thread_id, user_feedback, latitude, longitude, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                entry.chatbot_id,
                entry.user_id,
                entry.session_id,
                entry.message,
                entry.response,
                entry.thread_id,
                UserFeedback::None.as_str(),
                entry.location.map(|p| p.latitude),
                entry.location.map(|p| p.longitude),
                format_timestamp(created_at),
            ],
        )
        .context("Failed to insert chat log")
        .map_err(|e| TownchatError::Storage(e.to_string()))?;

        Ok(conn.last_insert_rowid())
    }

    fn fetch_chatbot(conn: &Connection, id: i64) -> Result<Option<Chatbot>> {
        conn.query_row(
            &format!("SELECT {} FROM chatbots WHERE id = ?", CHATBOT_COLUMNS),
            params![id],
            chatbot_from_row,
        )
        .optional()
        .context("Failed to query chatbot")
        .map_err(|e| TownchatError::Storage(e.to_string()).into())
    }
}

#[async_trait]
impl ChatLogStore for SqliteStorage {
    async fn latest_thread_for_session(&self, session_id: &str) -> Result<Option<String>> {
        let conn = self.open()?;
        conn.query_row(
            "SELECT thread_id FROM chat_logs
             WHERE session_id = ? AND thread_id IS NOT NULL AND thread_id <> ''
             ORDER BY created_at DESC, id DESC
             LIMIT 1",
            params![session_id],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .context("Failed to query latest thread")
        .map_err(|e| TownchatError::Storage(e.to_string()).into())
    }

    async fn insert_log(&self, entry: NewChatLog) -> Result<i64> {
        self.insert_log_at(&entry, Utc::now())
    }

    async fn list_logs(
        &self,
        chatbot_id: i64,
        session_id: &str,
        page: PageRequest,
    ) -> Result<HistoryPage> {
        let conn = self.open()?;

        let total: i64 = conn
            .query_row(
                "SELECT count(*) FROM chat_logs WHERE chatbot_id = ? AND session_id = ?",
                params![chatbot_id, session_id],
                |row| row.get(0),
            )
            .context("Failed to count chat logs")
            .map_err(|e| TownchatError::Storage(e.to_string()))?;

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM chat_logs
                 WHERE chatbot_id = ? AND session_id = ?
                 ORDER BY created_at ASC, id ASC
                 LIMIT ? OFFSET ?",
                LOG_COLUMNS
            ))
            .context("Failed to prepare statement")
            .map_err(|e| TownchatError::Storage(e.to_string()))?;

        let entries = stmt
            .query_map(
                params![
                    chatbot_id,
                    session_id,
                    i64::from(page.limit),
                    page.offset() as i64
                ],
                log_from_row,
            )
            .context("Failed to query chat logs")
            .map_err(|e| TownchatError::Storage(e.to_string()))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| TownchatError::Storage(e.to_string()))?;

        Ok(HistoryPage {
            entries,
            pagination: Pagination::new(page, total.max(0) as u64),
        })
    }

    async fn set_feedback(&self, log_id: i64, feedback: UserFeedback) -> Result<bool> {
        let conn = self.open()?;
        let changed = conn
            .execute(
                "UPDATE chat_logs SET user_feedback = ? WHERE id = ?",
                params![feedback.as_str(), log_id],
            )
            .context("Failed to update feedback")
            .map_err(|e| TownchatError::Storage(e.to_string()))?;
        Ok(changed > 0)
    }
}

#[async_trait]
impl ChatbotStore for SqliteStorage {
    async fn get_chatbot(&self, id: i64) -> Result<Option<Chatbot>> {
        let conn = self.open()?;
        Self::fetch_chatbot(&conn, id)
    }

    async fn list_chatbots(&self) -> Result<Vec<Chatbot>> {
        let conn = self.open()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {} FROM chatbots ORDER BY id ASC", CHATBOT_COLUMNS))
            .context("Failed to prepare statement")
            .map_err(|e| TownchatError::Storage(e.to_string()))?;

        let chatbots = stmt
            .query_map([], chatbot_from_row)
            .context("Failed to query chatbots")
            .map_err(|e| TownchatError::Storage(e.to_string()))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| TownchatError::Storage(e.to_string()))?;

        Ok(chatbots)
    }

    async fn insert_chatbot(
        &self,
        chatbot: NewChatbot,
        model: String,
        assistant_id: Option<String>,
    ) -> Result<Chatbot> {
        let conn = self.open()?;

        let store_id = chatbot.store_id.clone();
        let now = format_timestamp(Utc::now());
        conn.execute(
            "INSERT INTO chatbots (store_id, name, knowledge_base, greeting_message, model, \
             is_active, assistant_id, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, 1, ?, ?, ?)",
            params![
                chatbot.store_id,
                chatbot.name,
                chatbot.knowledge_base.unwrap_or_default(),
                chatbot.greeting_message.unwrap_or_default(),
                model,
                assistant_id,
                now,
                now,
            ],
        )
        .map_err(|e| {
            if is_constraint_violation(&e) {
                TownchatError::Conflict(format!("store {} already has a chatbot", store_id))
            } else {
                TownchatError::Storage(format!("Failed to insert chatbot: {}", e))
            }
        })?;

        let id = conn.last_insert_rowid();
        Self::fetch_chatbot(&conn, id)?
            .ok_or_else(|| TownchatError::Storage(format!("chatbot {} vanished after insert", id)).into())
    }

    async fn update_chatbot(&self, id: i64, update: ChatbotUpdate) -> Result<Option<Chatbot>> {
        let mut conn = self.open()?;
        let tx = conn
            .transaction()
            .context("Failed to start transaction")
            .map_err(|e| TownchatError::Storage(e.to_string()))?;

        let Some(current) = Self::fetch_chatbot(&tx, id)? else {
            return Ok(None);
        };

        tx.execute(
            "UPDATE chatbots SET
                name = ?,
                knowledge_base = ?,
                greeting_message = ?,
                model = ?,
                is_active = ?,
                updated_at = ?
            WHERE id = ?",
            params![
                update.name.unwrap_or(current.name),
                update.knowledge_base.unwrap_or(current.knowledge_base),
                update.greeting_message.unwrap_or(current.greeting_message),
                update.model.unwrap_or(current.model),
                update.is_active.unwrap_or(current.is_active),
                format_timestamp(Utc::now()),
                id,
            ],
        )
        .context("Failed to update chatbot")
        .map_err(|e| TownchatError::Storage(e.to_string()))?;

        let updated = Self::fetch_chatbot(&tx, id)?;
        tx.commit()
            .context("Failed to commit transaction")
            .map_err(|e| TownchatError::Storage(e.to_string()))?;

        Ok(updated)
    }

    async fn set_assistant_id(&self, id: i64, assistant_id: Option<String>) -> Result<()> {
        let conn = self.open()?;
        conn.execute(
            "UPDATE chatbots SET assistant_id = ?, updated_at = ? WHERE id = ?",
            params![assistant_id, format_timestamp(Utc::now()), id],
        )
        .context("Failed to update assistant id")
        .map_err(|e| TownchatError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn delete_chatbot(&self, id: i64) -> Result<Option<Chatbot>> {
        let conn = self.open()?;
        let Some(chatbot) = Self::fetch_chatbot(&conn, id)? else {
            return Ok(None);
        };
        conn.execute("DELETE FROM chatbots WHERE id = ?", params![id])
            .context("Failed to delete chatbot")
            .map_err(|e| TownchatError::Storage(e.to_string()))?;
        Ok(Some(chatbot))
    }
}

/// Fixed-width RFC 3339 so lexical order matches time order
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            tracing::warn!(raw = %raw, error = %e, "failed to parse timestamp; using now");
            Utc::now()
        })
}

fn chatbot_from_row(row: &Row<'_>) -> rusqlite::Result<Chatbot> {
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;
    Ok(Chatbot {
        id: row.get(0)?,
        store_id: row.get(1)?,
        name: row.get(2)?,
        knowledge_base: row.get(3)?,
        greeting_message: row.get(4)?,
        model: row.get(5)?,
        is_active: row.get(6)?,
        assistant_id: row.get(7)?,
        created_at: parse_timestamp(&created_at),
        updated_at: parse_timestamp(&updated_at),
    })
}

/// Whether `err` is a SQLite constraint violation such as a duplicate store id
fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn log_from_row(row: &Row<'_>) -> rusqlite::Result<ChatLogEntry> {
    let feedback: String = row.get(7)?;
    let latitude: Option<f64> = row.get(8)?;
    let longitude: Option<f64> = row.get(9)?;
    let created_at: String = row.get(10)?;
    Ok(ChatLogEntry {
        id: row.get(0)?,
        chatbot_id: row.get(1)?,
        user_id: row.get(2)?,
        session_id: row.get(3)?,
        message: row.get(4)?,
        response: row.get(5)?,
        thread_id: row.get(6)?,
        user_feedback: feedback.parse().unwrap_or_default(),
        location: latitude
            .zip(longitude)
            .map(|(latitude, longitude)| GeoPoint {
                longitude,
                latitude,
            }),
        timestamp: parse_timestamp(&created_at),
    })
}
