use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::http::{ApiError, ApiJson, AppState};
use crate::webhook::SignupLead;

pub async fn send_indicador(
    State(state): State<AppState>,
    ApiJson(lead): ApiJson<SignupLead>,
) -> Result<Json<Value>, ApiError> {
    state
        .webhook
        .forward_signup(&lead)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    Ok(Json(json!({ "success": true })))
}
