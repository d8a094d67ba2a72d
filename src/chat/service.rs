//! Chat façade
//!
//! Composes thread resolution, the assistant run and turn logging into the
//! single `chat` operation the HTTP layer and CLI call, plus transcript and
//! feedback access.

use super::locks::SessionLocks;
use super::log_writer::{ChatLogWriter, ChatTurn};
use super::registry::ThreadRegistry;
use super::session::generate_session_id;
use crate::agent::{AssistantRunner, PollSettings};
use crate::error::{Result, TownchatError};
use crate::providers::AssistantApi;
use crate::storage::{ChatLogStore, ChatbotStore, HistoryPage, Location, PageRequest, UserFeedback};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

/// Optional inputs of a chat turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatOptions {
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub location: Option<Location>,
}

/// Result of a chat turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub response: String,
    pub session_id: String,
    pub thread_id: String,
}

/// Entry point for chat turns against a store's chatbot
pub struct ChatService {
    chatbots: Arc<dyn ChatbotStore>,
    logs: Arc<dyn ChatLogStore>,
    registry: ThreadRegistry,
    runner: AssistantRunner,
    writer: ChatLogWriter,
    locks: SessionLocks,
}

impl ChatService {
    pub fn new(
        api: Arc<dyn AssistantApi>,
        chatbots: Arc<dyn ChatbotStore>,
        logs: Arc<dyn ChatLogStore>,
        settings: PollSettings,
    ) -> Self {
        Self::with_runner(AssistantRunner::new(api, settings), chatbots, logs)
    }

    /// Build the service around an already configured runner
    pub fn with_runner(
        runner: AssistantRunner,
        chatbots: Arc<dyn ChatbotStore>,
        logs: Arc<dyn ChatLogStore>,
    ) -> Self {
        Self {
            registry: ThreadRegistry::new(Arc::clone(&logs)),
            writer: ChatLogWriter::new(Arc::clone(&logs)),
            chatbots,
            logs,
            runner,
            locks: SessionLocks::new(),
        }
    }

    /// Send `message` to a chatbot and return the assistant's reply
    ///
    /// # Errors
    ///
    /// - [`TownchatError::BadRequest`] for a blank message
    /// - [`TownchatError::NotFound`] when the chatbot does not exist
    /// - [`TownchatError::ChatbotInactive`] / [`TownchatError::ChatbotMisconfigured`]
    ///   when it cannot take turns
    /// - [`TownchatError::ResponseGeneration`] when the assistant run fails
    pub async fn chat(
        &self,
        chatbot_id: i64,
        message: &str,
        options: ChatOptions,
    ) -> Result<ChatReply> {
        if message.trim().is_empty() {
            return Err(TownchatError::BadRequest("message must not be empty".to_string()).into());
        }

        let chatbot = self
            .chatbots
            .get_chatbot(chatbot_id)
            .await?
            .ok_or_else(|| TownchatError::NotFound(format!("chatbot {}", chatbot_id)))?;
        if !chatbot.is_active {
            return Err(TownchatError::ChatbotInactive(chatbot_id).into());
        }
        let assistant_id = chatbot
            .assistant_id
            .filter(|id| !id.is_empty())
            .ok_or(TownchatError::ChatbotMisconfigured(chatbot_id))?;

        let session_id = options
            .session_id
            .filter(|s| !s.is_empty())
            .unwrap_or_else(generate_session_id);

        let _turn = self.locks.acquire(&session_id).await;

        let lookup = self.registry.resolve(&session_id).await;

        let output = self
            .runner
            .run_assistant(&assistant_id, message, &session_id, lookup.thread_id())
            .await
            .map_err(|e| {
                error!(
                    chatbot_id,
                    session_id = %session_id,
                    error = %e,
                    "Assistant run failed"
                );
                match e.downcast_ref::<TownchatError>() {
                    Some(kind) if kind.is_run_failure() => {
                        TownchatError::ResponseGeneration(e.to_string()).into()
                    }
                    _ => e,
                }
            })?;

        info!(
            chatbot_id,
            session_id = %output.session_id,
            thread_id = %output.thread_id,
            "Chat turn completed"
        );

        self.writer
            .record_turn(ChatTurn {
                chatbot_id,
                user_id: options.user_id,
                session_id: output.session_id.clone(),
                message: message.to_string(),
                response: output.response.clone(),
                thread_id: output.thread_id.clone(),
                location: options.location,
            })
            .await;

        Ok(ChatReply {
            response: output.response,
            session_id: output.session_id,
            thread_id: output.thread_id,
        })
    }

    /// Run a chat turn on its own task
    ///
    /// Polling and turn logging continue even if the returned future is
    /// dropped, e.g. when an HTTP client disconnects mid-turn.
    pub async fn chat_detached(
        self: Arc<Self>,
        chatbot_id: i64,
        message: String,
        options: ChatOptions,
    ) -> Result<ChatReply> {
        tokio::spawn(async move { self.chat(chatbot_id, &message, options).await })
            .await
            .map_err(|e| anyhow::anyhow!("Chat turn task failed: {}", e))?
    }

    /// One page of a session's transcript, oldest first
    pub async fn get_history(
        &self,
        chatbot_id: i64,
        session_id: &str,
        page: PageRequest,
    ) -> Result<HistoryPage> {
        if session_id.is_empty() {
            return Err(TownchatError::BadRequest("sessionId is required".to_string()).into());
        }
        if self.chatbots.get_chatbot(chatbot_id).await?.is_none() {
            return Err(TownchatError::NotFound(format!("chatbot {}", chatbot_id)).into());
        }
        self.logs.list_logs(chatbot_id, session_id, page).await
    }

    /// Record the customer's reaction to a logged response
    pub async fn set_feedback(&self, log_id: i64, feedback: UserFeedback) -> Result<()> {
        if self.logs.set_feedback(log_id, feedback).await? {
            Ok(())
        } else {
            Err(TownchatError::NotFound(format!("chat log {}", log_id)).into())
        }
    }
}
