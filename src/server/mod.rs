//! HTTP server for TownChat
//!
//! [`build`] assembles the router with request logging; [`serve`] binds it
//! and runs until SIGINT or SIGTERM.

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

use crate::error::{Result, TownchatError};
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::Router;
use std::time::Instant;
use tracing::{info, info_span, warn, Instrument};

/// Build the complete application router
pub fn build(state: AppState) -> Router {
    routes::router()
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

async fn log_requests(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let span = info_span!(
        "http_request",
        method = %req.method(),
        path = %req.uri().path(),
    );

    async move {
        let response = next.run(req).await;
        info!(
            status = response.status().as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "Request finished"
        );
        response
    }
    .instrument(span)
    .await
}

/// Bind `bind_address` and serve the API until a shutdown signal arrives
pub async fn serve(state: AppState, bind_address: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .map_err(|e| TownchatError::Config(format!("Cannot bind {}: {}", bind_address, e)))?;
    let addr = listener.local_addr()?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, build(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut s) => {
                s.recv().await;
            }
            Err(e) => warn!(error = %e, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    info!("Shutdown signal received");
}
