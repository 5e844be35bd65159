use axum::{extract::State, http::StatusCode, response::Response};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::http::request::non_blank;
use crate::http::{json_response, ApiError, ApiJson, AppState};

#[derive(Debug, Deserialize)]
pub struct SendNotificationRequest {
    pub user_id: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

pub async fn send_notification(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SendNotificationRequest>,
) -> Result<Response, ApiError> {
    let (Some(user_id), Some(title), Some(body)) = (
        non_blank(&request.user_id),
        non_blank(&request.title),
        non_blank(&request.body),
    ) else {
        return Err(ApiError::bad_request("user_id, title and body are required"));
    };

    let Some(dispatcher) = state.push.as_ref() else {
        tracing::error!("Push notification requested but VAPID keys are not configured");
        return Ok(json_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            json!({"error": "Push notifications are not configured"}),
        ));
    };

    match dispatcher.dispatch(user_id, title, body, request.data).await {
        Ok(report) if report.sent == 0 && report.failed == 0 => Ok(json_response(
            StatusCode::OK,
            json!({"success": true, "message": "No subscriptions found for user", "sent": 0, "failed": 0}),
        )),
        Ok(report) => Ok(json_response(
            StatusCode::OK,
            json!({"success": true, "sent": report.sent, "failed": report.failed}),
        )),
        Err(e) => {
            tracing::error!(user_id, error = %e, "Failed to load push subscriptions");
            Ok(json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "Failed to send push notification"}),
            ))
        }
    }
}
