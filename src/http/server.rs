//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with all subsystem routes
//! - Wire up middleware (request ID, tracing, CORS, limits, timeout, metrics)
//! - Bind server to listener and stop on shutdown signal

use std::ops::Deref;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{DefaultBodyLimit, MatchedPath},
    http::Request,
    middleware::{self, Next},
    response::Response,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::context::AppContext;
use crate::http::request::{make_request_span, MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use crate::observability::metrics;
use crate::routing;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppContext>,
}

impl AppState {
    pub fn new(context: AppContext) -> Self {
        Self { inner: Arc::new(context) }
    }
}

impl Deref for AppState {
    type Target = AppContext;

    fn deref(&self) -> &AppContext {
        &self.inner
    }
}

/// HTTP server for the platform backend.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(context: AppContext) -> Self {
        let state = AppState::new(context);
        let router = Self::build_router(state);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(state: AppState) -> Router {
        let security = &state.config.security;
        let cors = if security.permissive_cors {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
        };
        let body_limit = security.max_body_size;
        let request_timeout = Duration::from_secs(state.config.timeouts.request_secs);

        routing::build_routes(state)
            .layer(DefaultBodyLimit::max(body_limit))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(make_request_span))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(middleware::from_fn(track_metrics))
                    .layer(cors)
                    .layer(TimeoutLayer::new(request_timeout)),
            )
    }

    /// The router with all layers, for in-process callers.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until a shutdown signal arrives.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn track_metrics(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let response = next.run(request).await;
    metrics::record_request(&method, response.status().as_u16(), &route, start);
    response
}
