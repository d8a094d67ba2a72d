//! Command-line interface definition for TownChat
//!
//! This module defines the CLI structure using clap's derive API,
//! providing commands for serving the HTTP API, sending a chat turn,
//! reading session history and managing chatbots.

use clap::{Parser, Subcommand};

/// TownChat - hosted assistant chatbots for local stores
#[derive(Parser, Debug, Clone)]
#[command(name = "townchat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Override the SQLite database path
    #[arg(long, env = "TOWNCHAT_DB")]
    pub storage_path: Option<String>,

    /// Emit logs as newline-delimited JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for TownChat
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Override the bind address from config
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Send one message to a chatbot and print the reply
    Chat {
        /// Chatbot id
        #[arg(long)]
        chatbot: i64,

        /// Continue an existing session
        #[arg(short, long)]
        session: Option<String>,

        /// Attribute the turn to a user id
        #[arg(short, long)]
        user: Option<String>,

        /// Message text
        message: String,
    },

    /// Show the transcript of a chat session
    History {
        /// Chatbot id
        #[arg(long)]
        chatbot: i64,

        /// Session id
        #[arg(short, long)]
        session: String,

        /// Page number (1-based)
        #[arg(long, default_value_t = 1)]
        page: u32,

        /// Entries per page
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },

    /// Manage chatbots
    Chatbot {
        /// Chatbot management subcommand
        #[command(subcommand)]
        command: ChatbotCommand,
    },
}

/// Chatbot management subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ChatbotCommand {
    /// List all chatbots
    List,

    /// Register a chatbot for a store and provision its assistant
    Create {
        /// Owning store id
        #[arg(long)]
        store: String,

        /// Display name
        #[arg(long)]
        name: String,

        /// Free-text knowledge base
        #[arg(long)]
        knowledge_base: Option<String>,

        /// Greeting shown to customers
        #[arg(long)]
        greeting: Option<String>,

        /// Model identifier
        #[arg(long)]
        model: Option<String>,
    },

    /// Delete a chatbot, its logs and its remote assistant
    Delete {
        /// Chatbot id
        id: i64,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
