//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the application context from validated configuration
//! - Start the metrics exporter when enabled
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently

use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::context::{AppContext, ContextError};
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to build application context: {0}")]
    Context(#[from] ContextError),
    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Run the backend until `shutdown` fires.
pub async fn run(config: AppConfig, shutdown: &Shutdown) -> Result<(), StartupError> {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        push_enabled = config.push.is_configured(),
        webhook_enabled = config.webhook.url.is_some(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    if config.admin.api_key.is_empty() {
        tracing::warn!("admin.api_key is empty; admin routes will reject every request");
    }

    let address = config.listener.bind_address.clone();
    let context = AppContext::from_config(config)?;

    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address: address.clone(), source })?;

    HttpServer::new(context)
        .run(listener, shutdown.subscribe())
        .await
        .map_err(StartupError::Serve)
}
