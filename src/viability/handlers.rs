use axum::{extract::State, Json};
use serde::Deserialize;
use serde_json::Value;

use crate::http::{ApiError, ApiJson, AppState};
use crate::viability::validate;

/// Raw body; fields stay untyped so type errors get their own message.
#[derive(Debug, Deserialize)]
pub struct CepViabilityRequest {
    pub estado: Option<Value>,
    pub cep: Option<Value>,
}

pub async fn check_cep_viability(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CepViabilityRequest>,
) -> Result<Json<Value>, ApiError> {
    let query = validate(request.estado.as_ref(), request.cep.as_ref())
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    Ok(Json(state.viability.lookup(&query).await))
}
