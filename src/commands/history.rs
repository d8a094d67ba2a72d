//! `history` command

use super::open_storage;
use crate::config::Config;
use crate::error::{Result, TownchatError};
use crate::storage::{ChatLogStore, ChatbotStore, HistoryPage, PageRequest, UserFeedback};
use colored::Colorize;
use prettytable::{format, Table};

const MAX_CELL_CHARS: usize = 60;

fn shorten(text: &str) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() > MAX_CELL_CHARS {
        let head: String = single_line.chars().take(MAX_CELL_CHARS - 3).collect();
        format!("{}...", head)
    } else {
        single_line
    }
}

/// Render a history page as a table
pub fn history_table(page: &HistoryPage) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "ID".bold(),
        "Time".bold(),
        "Message".bold(),
        "Response".bold(),
        "Feedback".bold()
    ]);

    for entry in &page.entries {
        let feedback = match entry.user_feedback {
            UserFeedback::Positive => "positive".green(),
            UserFeedback::Negative => "negative".red(),
            UserFeedback::None => "-".normal(),
        };
        table.add_row(prettytable::row![
            entry.id.to_string().cyan(),
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            shorten(&entry.message),
            shorten(&entry.response),
            feedback
        ]);
    }

    table
}

/// Print one page of a session transcript
pub async fn run_history(
    config: Config,
    chatbot_id: i64,
    session_id: String,
    page: u32,
    limit: u32,
) -> Result<()> {
    let storage = open_storage(&config)?;
    if storage.get_chatbot(chatbot_id).await?.is_none() {
        return Err(TownchatError::NotFound(format!("chatbot {}", chatbot_id)).into());
    }

    let history = storage
        .list_logs(chatbot_id, &session_id, PageRequest::new(Some(page), Some(limit)))
        .await?;

    if history.entries.is_empty() {
        println!("{}", "No chat history found for this session.".yellow());
        return Ok(());
    }

    println!("\nSession {}:", session_id.cyan());
    history_table(&history).printstd();
    println!(
        "Page {} of {} ({} entries)",
        history.pagination.page, history.pagination.total_pages, history.pagination.total
    );
    println!();
    Ok(())
}
