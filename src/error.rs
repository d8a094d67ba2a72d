//! Error types for TownChat
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for TownChat operations
///
/// Covers chatbot state errors, every failure mode of an assistant run,
/// and the ambient configuration, storage and transport errors. Callers that
/// need to branch on the kind of failure downcast an `anyhow::Error` to this
/// type.
#[derive(Error, Debug)]
pub enum TownchatError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider-related errors (client setup, assistant management)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Referenced resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Malformed or empty caller input
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Resource already exists (e.g. a second chatbot for one store)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Chatbot exists but is switched off
    #[error("Chatbot {0} is not active")]
    ChatbotInactive(i64),

    /// Chatbot has no remote assistant attached
    #[error("Chatbot {0} has no assistant configured")]
    ChatbotMisconfigured(i64),

    /// The provider did not return a usable thread id
    #[error("Thread creation failed: {0}")]
    ThreadCreation(String),

    /// Thread id does not carry the provider prefix
    #[error("Invalid thread id: {0}")]
    InvalidThread(String),

    /// Posting the user message into the thread failed
    #[error("Failed to send message: {0}")]
    MessageSend(String),

    /// The assistant referenced by the chatbot does not exist remotely
    #[error("Assistant not found: {0}")]
    AssistantNotFound(String),

    /// Starting the run failed for a reason other than a missing assistant
    #[error("Failed to start run: {0}")]
    RunCreation(String),

    /// Fetching run status failed
    #[error("Failed to fetch run status: {0}")]
    RunStatus(String),

    /// The run reached a failing terminal state
    #[error("Run {run_id} failed: {reason}")]
    RunFailed {
        /// Provider run id
        run_id: String,
        /// Provider error message or terminal status
        reason: String,
    },

    /// The run did not finish within the polling ceiling
    #[error("Run {run_id} did not complete after {attempts} status checks")]
    RunTimeout {
        /// Provider run id
        run_id: String,
        /// Number of status polls performed
        attempts: u32,
    },

    /// Listing thread messages failed
    #[error("Failed to list messages: {0}")]
    MessageList(String),

    /// The run completed but produced no assistant message
    #[error("Assistant returned no response on thread {0}")]
    EmptyResponse(String),

    /// Coarse user-facing wrapper for any assistant run failure
    #[error("Failed to generate a response: {0}")]
    ResponseGeneration(String),

    /// Storage errors (database operations)
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl TownchatError {
    /// Whether this error is one of the assistant run failures that the chat
    /// service folds into [`TownchatError::ResponseGeneration`].
    pub fn is_run_failure(&self) -> bool {
        matches!(
            self,
            TownchatError::ThreadCreation(_)
                | TownchatError::InvalidThread(_)
                | TownchatError::MessageSend(_)
                | TownchatError::AssistantNotFound(_)
                | TownchatError::RunCreation(_)
                | TownchatError::RunStatus(_)
                | TownchatError::RunFailed { .. }
                | TownchatError::RunTimeout { .. }
                | TownchatError::MessageList(_)
                | TownchatError::EmptyResponse(_)
        )
    }
}

/// Result type alias for TownChat operations
///
/// Uses `anyhow::Error` so context can be attached while the underlying
/// [`TownchatError`] stays reachable through `downcast_ref`.
pub type Result<T> = anyhow::Result<T>;
