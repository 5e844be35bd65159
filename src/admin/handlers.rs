use axum::{extract::State, http::StatusCode, response::Response};
use serde::Deserialize;
use serde_json::json;

use crate::admin::provisioner::{NewAccount, ProvisionError};
use crate::http::{json_response, ApiError, ApiJson, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub full_name: Option<String>,
    pub whatsapp: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub role: Option<String>,
}

pub async fn create_user(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<CreateUserRequest>,
) -> Result<Response, ApiError> {
    let account = NewAccount {
        email: request.email.unwrap_or_default(),
        password: request.password.unwrap_or_default(),
        full_name: request.full_name,
        whatsapp: request.whatsapp,
        city: request.city,
        state: request.state,
        role: request.role,
    };

    match state.provisioner.create_user(account).await {
        Ok(user) => Ok(json_response(
            StatusCode::CREATED,
            json!({
                "message": "User created",
                "user_id": user.user_id,
                "role": user.role,
            }),
        )),
        Err(ProvisionError::MissingCredentials) => {
            Err(ApiError::bad_request("Missing required fields (email, password)"))
        }
        Err(ProvisionError::AuthCreate(e)) => {
            tracing::error!(error = %e, "Auth user creation failed");
            Err(ApiError::upstream("Failed to create auth user"))
        }
        Err(ProvisionError::RoleAssignment { user_id, source }) => {
            tracing::error!(%user_id, error = %source, "Role assignment failed");
            Ok(json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({
                    "error": "User created, but role assignment failed",
                    "user_id": user_id,
                }),
            ))
        }
    }
}
