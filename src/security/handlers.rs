use axum::{extract::State, http::StatusCode, response::Response};
use chrono::SecondsFormat;
use serde::Deserialize;
use serde_json::json;

use crate::http::request::non_blank;
use crate::http::{json_response, ApiJson, AppState};
use crate::security::captcha::CaptchaError;

const TOO_MANY_ATTEMPTS: &str = "Too many attempts. Try again later.";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRecaptchaRequest {
    pub recaptcha_token: Option<String>,
    pub identifier: Option<String>,
    pub action_type: Option<String>,
}

fn internal_error() -> Response {
    json_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        json!({"verified": false, "rateLimitOk": false, "error": "Internal server error"}),
    )
}

/// Verify a CAPTCHA token, then count the attempt when an identifier is given.
pub async fn verify_recaptcha(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<VerifyRecaptchaRequest>,
) -> Response {
    let Some(token) = non_blank(&request.recaptcha_token) else {
        return json_response(
            StatusCode::BAD_REQUEST,
            json!({"success": false, "error": "reCAPTCHA token is required"}),
        );
    };

    let verdict = match state.captcha.verify(token).await {
        Ok(verdict) => verdict,
        Err(CaptchaError::NotConfigured) => {
            tracing::error!("Captcha secret key is not configured");
            return json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"success": false, "error": "reCAPTCHA is not configured"}),
            );
        }
        Err(e) => {
            tracing::error!(error = %e, "Captcha verification failed");
            return internal_error();
        }
    };

    if !verdict.success {
        tracing::info!(errors = ?verdict.error_codes, "Captcha token rejected");
        return json_response(
            StatusCode::BAD_REQUEST,
            json!({
                "verified": false,
                "rateLimitOk": false,
                "error": "reCAPTCHA verification failed",
                "errors": verdict.error_codes,
            }),
        );
    }

    if let Some(identifier) = non_blank(&request.identifier) {
        let action_type = non_blank(&request.action_type).unwrap_or("default");
        match state.abuse.check_and_record(identifier, action_type).await {
            Ok(check) if !check.rate_limit_ok => {
                return json_response(
                    StatusCode::TOO_MANY_REQUESTS,
                    json!({
                        "verified": true,
                        "rateLimitOk": false,
                        "error": TOO_MANY_ATTEMPTS,
                        "blockedUntil": check
                            .blocked_until
                            .map(|until| until.to_rfc3339_opts(SecondsFormat::Millis, true)),
                    }),
                );
            }
            Ok(_) => {}
            Err(e) => {
                tracing::error!(action_type, error = %e, "Abuse check failed");
                return internal_error();
            }
        }
    }

    json_response(
        StatusCode::OK,
        json!({
            "verified": true,
            "rateLimitOk": true,
            "score": verdict.score,
            "action": verdict.action,
        }),
    )
}
