//! Read-only connectivity checks against each backend project.
//!
//! Both endpoints return a small sample of rows so operators can confirm the
//! service key and project URL are wired correctly.

use axum::{extract::State, routing::get, Json, Router};
use serde_json::{json, Value};

use crate::http::{ApiError, AppState};
use crate::store::{DataStore, Query};

pub fn indique_router() -> Router<AppState> {
    Router::new().route("/test-profiles", get(test_profiles))
}

pub fn ura_router() -> Router<AppState> {
    Router::new().route("/test-data", get(test_data))
}

async fn sample(store: &dyn DataStore, query: Query, project: &'static str) -> Result<Json<Value>, ApiError> {
    match store.select(&query).await {
        Ok(rows) => Ok(Json(json!({ "data": rows }))),
        Err(e) => {
            tracing::error!(project, table = %query.table, error = %e, "Diagnostic query failed");
            Err(ApiError::upstream(format!("Failed to query {project}")))
        }
    }
}

pub async fn test_profiles(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let query = Query::table("profiles").select("id, full_name, email").limit(10);
    sample(state.stores.nio_afiliados.as_ref(), query, "indique_e_ganhe").await
}

pub async fn test_data(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let query = Query::table("users").limit(5);
    sample(state.stores.painel_ura.as_ref(), query, "sistema_ura").await
}
