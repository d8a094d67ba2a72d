//! TownChat - store chatbot backend
//!
#![doc = "Main entry point for the TownChat server and CLI."]

use anyhow::Result;

use tracing::Subscriber;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use townchat::cli::{Cli, Commands};
use townchat::commands;
use townchat::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_tracing(cli.verbose, cli.json_logs);

    // Load configuration
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;

    // Validate configuration
    config.validate()?;

    match cli.command {
        Commands::Serve { .. } => {
            commands::serve::run_serve(config).await?;
        }
        Commands::Chat {
            chatbot,
            session,
            user,
            message,
        } => {
            tracing::debug!(chatbot, session = ?session, "Sending chat turn");
            commands::chat::run_chat(config, chatbot, session, user, message).await?;
        }
        Commands::History {
            chatbot,
            session,
            page,
            limit,
        } => {
            commands::history::run_history(config, chatbot, session, page, limit).await?;
        }
        Commands::Chatbot { command } => {
            commands::chatbot::handle_chatbot(config, command).await?;
        }
    }

    Ok(())
}

/// Initialize tracing
///
/// `RUST_LOG` wins when set; otherwise `townchat=info`, or `townchat=debug`
/// with `--verbose`. Text and JSON output both go to stderr.
fn init_tracing(verbose: bool, json: bool) {
    build_subscriber(verbose, json, std::io::stderr).init();
}

fn build_subscriber<W>(verbose: bool, json: bool, writer: W) -> Box<dyn Subscriber + Send + Sync>
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let default_directive = if verbose {
        "townchat=debug"
    } else {
        "townchat=info"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        Box::new(
            registry.with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(writer),
            ),
        )
    } else {
        Box::new(registry.with(tracing_subscriber::fmt::layer().with_writer(writer)))
    }
}
