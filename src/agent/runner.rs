//! Assistant run orchestration
//!
//! One call to [`AssistantRunner::run_assistant`] drives a single chat turn
//! through the provider: acquire a thread, append the user message, start a
//! run, poll it to a terminal state and pull the reply text out of the
//! thread. Every step maps its failure onto a distinct [`TownchatError`].

use crate::chat::session::generate_session_id;
use crate::config::PollingConfig;
use crate::error::{Result, TownchatError};
use crate::providers::{AssistantApi, MessageContent, MessageRole, RunStatus, ThreadMessage};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Waits between run status checks
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// [`Sleeper`] backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Polling cadence for run status checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl From<&PollingConfig> for PollSettings {
    fn from(config: &PollingConfig) -> Self {
        Self {
            interval: Duration::from_millis(config.interval_ms),
            max_attempts: config.max_attempts,
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self::from(&PollingConfig::default())
    }
}

/// Result of a completed assistant run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutput {
    pub response: String,
    pub thread_id: String,
    pub session_id: String,
}

/// Drives assistant runs against a provider
pub struct AssistantRunner {
    api: Arc<dyn AssistantApi>,
    sleeper: Arc<dyn Sleeper>,
    settings: PollSettings,
}

impl AssistantRunner {
    /// Create a runner that sleeps on the tokio timer
    pub fn new(api: Arc<dyn AssistantApi>, settings: PollSettings) -> Self {
        Self::with_sleeper(api, Arc::new(TokioSleeper), settings)
    }

    /// Create a runner with a custom sleeper
    pub fn with_sleeper(
        api: Arc<dyn AssistantApi>,
        sleeper: Arc<dyn Sleeper>,
        settings: PollSettings,
    ) -> Self {
        Self {
            api,
            sleeper,
            settings,
        }
    }

    /// Run the assistant on `message` and return its reply
    ///
    /// When `existing_thread_id` is `None` or empty a new thread is created.
    /// An empty `session_id` is replaced with a freshly generated one.
    ///
    /// # Errors
    ///
    /// Returns one of the run failure variants of [`TownchatError`]; see
    /// [`TownchatError::is_run_failure`].
    pub async fn run_assistant(
        &self,
        assistant_id: &str,
        message: &str,
        session_id: &str,
        existing_thread_id: Option<&str>,
    ) -> Result<RunOutput> {
        let session_id = if session_id.is_empty() {
            generate_session_id()
        } else {
            session_id.to_string()
        };

        let thread_id = match existing_thread_id.filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => {
                let thread = self
                    .api
                    .create_thread()
                    .await
                    .map_err(|e| TownchatError::ThreadCreation(e.to_string()))?;
                if thread.id.is_empty() {
                    return Err(TownchatError::ThreadCreation(
                        "provider returned an empty thread id".to_string(),
                    )
                    .into());
                }
                debug!(thread_id = %thread.id, session_id = %session_id, "Created thread");
                thread.id
            }
        };

        if !thread_id.starts_with(self.api.thread_prefix()) {
            return Err(TownchatError::InvalidThread(thread_id).into());
        }

        self.api
            .post_user_message(&thread_id, message)
            .await
            .map_err(|e| TownchatError::MessageSend(e.to_string()))?;

        let run = self
            .api
            .start_run(&thread_id, assistant_id)
            .await
            .map_err(|e| match e.downcast::<TownchatError>() {
                Ok(err @ TownchatError::AssistantNotFound(_)) => err,
                Ok(other) => TownchatError::RunCreation(other.to_string()),
                Err(other) => TownchatError::RunCreation(other.to_string()),
            })?;
        info!(run_id = %run.id, thread_id = %thread_id, "Started assistant run");

        self.wait_for_completion(&thread_id, &run.id).await?;

        let messages = self
            .api
            .list_messages(&thread_id)
            .await
            .map_err(|e| TownchatError::MessageList(e.to_string()))?;

        let response = extract_response(&messages)
            .ok_or_else(|| TownchatError::EmptyResponse(thread_id.clone()))?;

        Ok(RunOutput {
            response,
            thread_id,
            session_id,
        })
    }

    /// Poll until the run completes, fails or the attempt ceiling is reached
    async fn wait_for_completion(&self, thread_id: &str, run_id: &str) -> Result<()> {
        for attempt in 1..=self.settings.max_attempts {
            self.sleeper.sleep(self.settings.interval).await;

            let run = self
                .api
                .get_run(thread_id, run_id)
                .await
                .map_err(|e| TownchatError::RunStatus(e.to_string()))?;
            debug!(run_id = %run_id, attempt, status = %run.status, "Polled run status");

            match run.status {
                RunStatus::Completed => return Ok(()),
                status if status.is_terminal() => {
                    let reason = run.failure_reason();
                    warn!(run_id = %run_id, status = %status, reason = %reason, "Run ended without completing");
                    return Err(TownchatError::RunFailed {
                        run_id: run_id.to_string(),
                        reason,
                    }
                    .into());
                }
                _ => {}
            }
        }

        warn!(
            run_id = %run_id,
            attempts = self.settings.max_attempts,
            "Run did not complete in time"
        );
        Err(TownchatError::RunTimeout {
            run_id: run_id.to_string(),
            attempts: self.settings.max_attempts,
        }
        .into())
    }
}

/// Pull the reply text out of a thread listing
///
/// Takes the assistant message with the greatest `created_at` (the first one
/// in list order on ties) and joins its text fragments. A fragment without a
/// value renders as `undefined`, and every `undefined` is then stripped from
/// the joined text. Returns `None` when no assistant message exists or the
/// result is blank.
pub fn extract_response(messages: &[ThreadMessage]) -> Option<String> {
    let latest = messages
        .iter()
        .filter(|m| m.role == MessageRole::Assistant)
        .fold(None::<&ThreadMessage>, |best, m| match best {
            Some(b) if b.created_at >= m.created_at => Some(b),
            _ => Some(m),
        })?;

    let joined: String = latest
        .content
        .iter()
        .filter_map(|fragment| match fragment {
            MessageContent::Text { text } => Some(text.value.as_deref().unwrap_or("undefined")),
            MessageContent::Other => None,
        })
        .collect();

    let cleaned = joined.replace("undefined", "");
    let trimmed = cleaned.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
