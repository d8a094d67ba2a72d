//! `chatbot` command

use super::{build_state, open_storage};
use crate::cli::ChatbotCommand;
use crate::config::Config;
use crate::error::Result;
use crate::storage::{Chatbot, ChatbotStore, NewChatbot};
use colored::Colorize;
use prettytable::{format, Table};

/// Render chatbots as a table
pub fn chatbot_table(chatbots: &[Chatbot]) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "ID".bold(),
        "Store".bold(),
        "Name".bold(),
        "Model".bold(),
        "Active".bold(),
        "Assistant".bold()
    ]);

    for chatbot in chatbots {
        let active = if chatbot.is_active {
            "yes".green()
        } else {
            "no".red()
        };
        let assistant = match &chatbot.assistant_id {
            Some(id) => id.normal(),
            None => "missing".yellow(),
        };
        table.add_row(prettytable::row![
            chatbot.id.to_string().cyan(),
            chatbot.store_id,
            chatbot.name,
            chatbot.model,
            active,
            assistant
        ]);
    }

    table
}

/// Handle chatbot management commands
pub async fn handle_chatbot(config: Config, command: ChatbotCommand) -> Result<()> {
    match command {
        ChatbotCommand::List => {
            // Listing needs no provider credentials.
            let chatbots = open_storage(&config)?.list_chatbots().await?;
            if chatbots.is_empty() {
                println!("{}", "No chatbots registered.".yellow());
                return Ok(());
            }
            println!("\nChatbots:");
            chatbot_table(&chatbots).printstd();
            println!();
        }
        ChatbotCommand::Create {
            store,
            name,
            knowledge_base,
            greeting,
            model,
        } => {
            let state = build_state(&config)?;
            let chatbot = state
                .chatbots
                .provision(NewChatbot {
                    store_id: store,
                    name,
                    knowledge_base,
                    greeting_message: greeting,
                    model,
                })
                .await?;
            println!(
                "{}",
                format!("Created chatbot {} for store {}", chatbot.id, chatbot.store_id).green()
            );
            if chatbot.assistant_id.is_none() {
                println!(
                    "{}",
                    "Assistant provisioning failed; update the chatbot to retry.".yellow()
                );
            }
        }
        ChatbotCommand::Delete { id } => {
            let state = build_state(&config)?;
            let chatbot = state.chatbots.delete(id).await?;
            println!(
                "{}",
                format!("Deleted chatbot {} ({})", chatbot.id, chatbot.name).green()
            );
        }
    }

    Ok(())
}
