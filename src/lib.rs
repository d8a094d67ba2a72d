//! TownChat - store chatbot backend library
//!
//! This library provides the chat core behind TownChat store chatbots:
//! resolving a conversation session to a hosted-assistant thread, running
//! the assistant on that thread, polling the run to completion, and logging
//! every turn.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `providers`: Hosted assistant abstraction and the OpenAI Assistants client
//! - `storage`: SQLite persistence of chatbots and chat logs
//! - `agent`: Assistant run orchestration and reply extraction
//! - `chat`: Session ids, thread resolution, turn logging and the chat façade
//! - `chatbot`: Chatbot provisioning and remote assistant lifecycle
//! - `server`: REST API over the chat and chatbot services
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli` / `commands`: Command-line interface
//!
//! # Example
//!
//! ```no_run
//! use townchat::chat::ChatOptions;
//! use townchat::cli::{Cli, Commands};
//! use townchat::{commands, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cli = Cli {
//!         config: None,
//!         verbose: false,
//!         storage_path: None,
//!         json_logs: false,
//!         command: Commands::Serve { bind: None },
//!     };
//!     let config = Config::load("config/config.yaml", &cli)?;
//!     config.validate()?;
//!
//!     let state = commands::build_state(&config)?;
//!     let reply = state.chat.chat(1, "Are you open today?", ChatOptions::default()).await?;
//!     println!("{} ({})", reply.response, reply.session_id);
//!     Ok(())
//! }
//! ```

pub mod agent;
pub mod chat;
pub mod chatbot;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod providers;
pub mod server;
pub mod storage;

// Re-export commonly used types
pub use agent::{AssistantRunner, PollSettings};
pub use chat::{ChatOptions, ChatReply, ChatService};
pub use chatbot::ChatbotService;
pub use config::Config;
pub use error::{Result, TownchatError};

#[cfg(test)]
pub mod test_utils;
