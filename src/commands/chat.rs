//! `chat` command

use super::build_state;
use crate::chat::ChatOptions;
use crate::config::Config;
use crate::error::Result;
use colored::Colorize;

/// Send a single message and print the reply with its session id
pub async fn run_chat(
    config: Config,
    chatbot_id: i64,
    session_id: Option<String>,
    user_id: Option<String>,
    message: String,
) -> Result<()> {
    let state = build_state(&config)?;
    let reply = state
        .chat
        .chat(
            chatbot_id,
            &message,
            ChatOptions {
                user_id,
                session_id,
                location: None,
            },
        )
        .await?;

    println!("{}", reply.response);
    println!();
    println!("{} {}", "session:".dimmed(), reply.session_id.cyan());
    println!("{} {}", "thread: ".dimmed(), reply.thread_id.dimmed());
    println!(
        "Continue with {}",
        format!(
            "townchat chat --chatbot {} --session {} <message>",
            chatbot_id, reply.session_id
        )
        .cyan()
    );
    Ok(())
}
