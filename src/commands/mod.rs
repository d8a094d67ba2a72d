/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `serve`   Run the HTTP API
- `chat`    Send one message to a chatbot
- `history` Print a session transcript
- `chatbot` List, create and delete chatbots

Handlers build the services they need from [`Config`] and keep their own
logic to formatting output.
*/

use crate::agent::{AssistantRunner, PollSettings};
use crate::chat::ChatService;
use crate::chatbot::ChatbotService;
use crate::config::Config;
use crate::error::Result;
use crate::providers::{create_provider, AssistantApi};
use crate::server::AppState;
use crate::storage::SqliteStorage;
use std::sync::Arc;

pub mod chat;
pub mod chatbot;
pub mod history;
pub mod serve;

/// Open the configured SQLite database
pub fn open_storage(config: &Config) -> Result<Arc<SqliteStorage>> {
    let storage = SqliteStorage::new(&config.storage)?;
    tracing::debug!(path = %storage.db_path().display(), "Opened storage");
    Ok(Arc::new(storage))
}

/// Build the chat and chatbot services over one provider and one database
pub fn build_state(config: &Config) -> Result<AppState> {
    let api = create_provider(&config.provider)?;
    let storage = open_storage(config)?;
    Ok(build_state_with(config, api, storage))
}

/// Build the services around an existing provider and storage
pub fn build_state_with(
    config: &Config,
    api: Arc<dyn AssistantApi>,
    storage: Arc<SqliteStorage>,
) -> AppState {
    let runner = AssistantRunner::new(Arc::clone(&api), PollSettings::from(&config.polling));
    AppState::new(
        ChatService::with_runner(runner, storage.clone(), storage.clone()),
        ChatbotService::new(api, storage, config.provider.openai.default_model.clone()),
    )
}
