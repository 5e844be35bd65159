//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! /healthz                              → health
//! /api/indique_e_ganhe
//!     /check-cep-viability              → viability
//!     /test-profiles                    → diagnostics (nio_afiliados)
//!     /webhook/send-indicador-to-n8n    → webhook
//!     /admin/create-user                → admin (Bearer admin key)
//!     /push/send-notification           → push
//!     /security/verify-recaptcha        → security
//! /api/sistema_ura
//!     /test-data                        → diagnostics (painel_ura)
//! anything else (path or method)       → 404 {error}
//! ```
//!
//! # Design Decisions
//! - Static prefixes only, assembled once at startup
//! - Each subsystem owns its sub-router; this module only mounts them

use axum::{http::StatusCode, response::Response, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::http::{json_response, AppState};
use crate::{admin, diagnostics, push, security, viability, webhook};

pub const INDIQUE_PREFIX: &str = "/api/indique_e_ganhe";
pub const URA_PREFIX: &str = "/api/sistema_ura";

/// Mount every subsystem router and bind the state.
pub fn build_routes(state: AppState) -> Router {
    let indique = Router::new()
        .merge(viability::router())
        .merge(diagnostics::indique_router())
        .nest("/webhook", webhook::router())
        .nest("/admin", admin::router(state.clone()))
        .nest("/push", push::router())
        .nest("/security", security::router());

    Router::new()
        .route("/healthz", get(healthz))
        .nest(INDIQUE_PREFIX, indique)
        .nest(URA_PREFIX, diagnostics::ura_router())
        .method_not_allowed_fallback(not_found)
        .fallback(not_found)
        .with_state(state)
}

async fn healthz() -> Json<Value> {
    Json(json!({ "ok": true, "message": "Backend plataforma running" }))
}

async fn not_found() -> Response {
    json_response(StatusCode::NOT_FOUND, json!({ "error": "Route not found" }))
}
