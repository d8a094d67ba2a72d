//! Base provider trait and wire types for hosted assistants
//!
//! The types here are the explicit shapes of threads, runs, messages and
//! assistants exchanged with the provider. Everything the orchestrator reads
//! from the provider goes through these types; nothing is trusted as raw JSON.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Provider-side conversation context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    /// Thread identifier (e.g. `thread_abc123`)
    #[serde(default)]
    pub id: String,
}

/// Lifecycle state of a run as reported by the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    /// A status this crate does not know about; treated as still running
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// Whether polling can stop at this status
    ///
    /// `requires_action` counts as terminal: no tools are registered on
    /// TownChat assistants, so such a run never progresses on its own.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunStatus::Completed
                | RunStatus::Failed
                | RunStatus::Cancelled
                | RunStatus::Expired
                | RunStatus::Incomplete
                | RunStatus::RequiresAction
        )
    }

    /// Wire name of the status
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Expired => "expired",
            RunStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error details attached to a failed run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLastError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

/// One asynchronous execution of an assistant against a thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub thread_id: Option<String>,
    #[serde(default)]
    pub last_error: Option<RunLastError>,
}

impl Run {
    /// Human-readable reason for a non-completed terminal state
    pub fn failure_reason(&self) -> String {
        match &self.last_error {
            Some(err) if !err.message.is_empty() => err.message.clone(),
            _ => self.status.as_str().to_string(),
        }
    }
}

/// Author of a thread message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Assistant,
    #[serde(other)]
    Other,
}

/// Text payload of a content fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TextContent {
    /// Missing when the provider sends a fragment without a value
    #[serde(default)]
    pub value: Option<String>,
}

/// One content fragment of a thread message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text {
        #[serde(default)]
        text: TextContent,
    },
    /// Images, files and anything else that is not text
    #[serde(other)]
    Other,
}

impl MessageContent {
    /// Build a text fragment
    pub fn text(value: impl Into<String>) -> Self {
        MessageContent::Text {
            text: TextContent {
                value: Some(value.into()),
            },
        }
    }

    /// Build a text fragment whose value is missing
    pub fn missing_text() -> Self {
        MessageContent::Text {
            text: TextContent { value: None },
        }
    }
}

/// A message stored on a provider thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMessage {
    pub id: String,
    pub role: MessageRole,
    /// Unix timestamp (seconds)
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

/// Settings used to create or update a remote assistant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssistantSpec {
    pub name: String,
    pub instructions: String,
    pub model: String,
}

/// A remote assistant as returned by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assistant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
}

/// Hosted assistant provider
///
/// The run lifecycle operations are what a chat turn needs; the assistant
/// management operations back the chatbot lifecycle. Implementations map
/// a missing assistant on [`AssistantApi::start_run`] to
/// [`crate::error::TownchatError::AssistantNotFound`].
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// Prefix every thread id issued by this provider starts with
    fn thread_prefix(&self) -> &str;

    /// Create an empty thread
    async fn create_thread(&self) -> Result<Thread>;

    /// Append a `user` message to a thread
    async fn post_user_message(&self, thread_id: &str, content: &str) -> Result<()>;

    /// Start a run of an assistant against a thread
    async fn start_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run>;

    /// Fetch the current state of a run
    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    /// List the messages of a thread, newest first
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<ThreadMessage>>;

    /// Create a remote assistant
    async fn create_assistant(&self, spec: &AssistantSpec) -> Result<Assistant>;

    /// Replace name, instructions and model of a remote assistant
    async fn update_assistant(&self, assistant_id: &str, spec: &AssistantSpec)
        -> Result<Assistant>;

    /// Delete a remote assistant; deleting one that is already gone succeeds
    async fn delete_assistant(&self, assistant_id: &str) -> Result<()>;
}
