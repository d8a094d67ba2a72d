//! Best-effort persistence of completed chat turns

use crate::storage::{ChatLogStore, GeoPoint, Location, NewChatLog};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// A completed turn to record
#[derive(Debug, Clone, PartialEq)]
pub struct ChatTurn {
    pub chatbot_id: i64,
    pub user_id: Option<String>,
    pub session_id: String,
    pub message: String,
    pub response: String,
    pub thread_id: String,
    pub location: Option<Location>,
}

/// Outcome of recording a turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutcome {
    /// Row id of the new log entry
    Recorded(i64),
    /// The write failed and the error was swallowed
    Suppressed(String),
}

/// Writes chat turns to the log store without ever failing the caller
pub struct ChatLogWriter {
    store: Arc<dyn ChatLogStore>,
}

impl ChatLogWriter {
    pub fn new(store: Arc<dyn ChatLogStore>) -> Self {
        Self { store }
    }

    pub async fn record_turn(&self, turn: ChatTurn) -> LogOutcome {
        let location = turn.location.and_then(|loc| {
            let point = GeoPoint::from_location(loc);
            if point.is_none() {
                warn!(
                    latitude = loc.latitude,
                    longitude = loc.longitude,
                    "Dropping out-of-range location"
                );
            }
            point
        });

        let entry = NewChatLog {
            chatbot_id: turn.chatbot_id,
            user_id: turn.user_id,
            session_id: turn.session_id,
            message: turn.message,
            response: turn.response,
            thread_id: Some(turn.thread_id),
            location,
        };
        let session_id = entry.session_id.clone();

        match self.store.insert_log(entry).await {
            Ok(id) => {
                debug!(log_id = id, session_id = %session_id, "Recorded chat turn");
                LogOutcome::Recorded(id)
            }
            Err(e) => {
                error!(session_id = %session_id, error = %e, "Failed to record chat turn");
                LogOutcome::Suppressed(e.to_string())
            }
        }
    }
}
