//! `serve` command

use super::build_state;
use crate::config::Config;
use crate::error::Result;
use crate::server;

/// Run the HTTP API until interrupted
pub async fn run_serve(config: Config) -> Result<()> {
    let state = build_state(&config)?;
    tracing::info!(
        bind = %config.server.bind_address,
        poll_interval_ms = config.polling.interval_ms,
        poll_max_attempts = config.polling.max_attempts,
        "Starting TownChat server"
    );
    server::serve(state, &config.server.bind_address).await
}
